use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::TokenRegistry;

/// Default slippage tolerance (percent) applied at execution time.
pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.1;

/// Execution intent of a build pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    Estimate,
    EstimateReversed,
    Execute,
    CallStatic,
    EstimateGas,
}

impl RunMode {
    /// `EstimateReversed` walks generators back-to-front; every other mode walks forward.
    pub fn is_forward(self) -> bool {
        !matches!(self, RunMode::EstimateReversed)
    }

    /// Modes that determine a transaction for the chain. `only_execute` generators
    /// participate only in these.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            RunMode::Execute | RunMode::CallStatic | RunMode::EstimateGas
        )
    }

    pub fn direction(self) -> &'static str {
        if self.is_forward() {
            "forward"
        } else {
            "reverse"
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Estimate => "estimate",
            RunMode::EstimateReversed => "estimate_reversed",
            RunMode::Execute => "execute",
            RunMode::CallStatic => "call_static",
            RunMode::EstimateGas => "estimate_gas",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied data for a build pass.
#[derive(Debug, Clone, Default)]
pub struct RunData {
    /// Slippage tolerance in percent; falls back to the SDK default.
    pub slippage: Option<f64>,
    /// Sender of the resulting transaction.
    pub account: Option<Address>,
}

impl RunData {
    pub fn with_slippage(mut self, slippage_pct: f64) -> Self {
        self.slippage = Some(slippage_pct);
        self
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }
}

/// Shared configuration every workflow and generator resolves against: which chain,
/// which farm contract, which tokens.
#[derive(Debug, Clone)]
pub struct SdkContext {
    pub chain_id: u64,
    /// Address of the Beanstalk diamond receiving `farm(bytes[])`.
    pub beanstalk: Address,
    pub tokens: TokenRegistry,
    pub default_slippage_pct: f64,
}

impl SdkContext {
    pub fn new(chain_id: u64, beanstalk: Address, tokens: TokenRegistry) -> Self {
        Self {
            chain_id,
            beanstalk,
            tokens,
            default_slippage_pct: DEFAULT_SLIPPAGE_PCT,
        }
    }

    pub fn with_default_slippage(mut self, slippage_pct: f64) -> Self {
        self.default_slippage_pct = slippage_pct;
        self
    }
}

/// Context handed to every generator invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_mode: RunMode,
    pub data: RunData,
    pub sdk: Arc<SdkContext>,
    /// Index of the generator being run within its workflow.
    pub step_index: usize,
    tags: HashMap<String, U256>,
}

impl RunContext {
    pub fn new(sdk: Arc<SdkContext>, run_mode: RunMode, data: RunData) -> Self {
        Self {
            run_mode,
            data,
            sdk,
            step_index: 0,
            tags: HashMap::new(),
        }
    }

    pub fn is_forward(&self) -> bool {
        self.run_mode.is_forward()
    }

    pub fn slippage(&self) -> f64 {
        self.data.slippage.unwrap_or(self.sdk.default_slippage_pct)
    }

    /// Amount recorded by an earlier tagged step of the current pass.
    pub fn find_tag(&self, tag: &str) -> Option<U256> {
        self.tags.get(tag).copied()
    }

    pub(crate) fn for_step(&self, step_index: usize, tags: &HashMap<String, U256>) -> Self {
        Self {
            run_mode: self.run_mode,
            data: self.data.clone(),
            sdk: Arc::clone(&self.sdk),
            step_index,
            tags: tags.clone(),
        }
    }
}
