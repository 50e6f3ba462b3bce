use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::U256;

use crate::farm::{decode_call, encode_call, FarmFromMode, FarmToMode};
use crate::workflow::{RunContext, SdkContext, Step, StepClass};

const WRAP_ETH: &str = "wrapEth(uint256,uint8)";
const UNWRAP_ETH: &str = "unwrapEth(uint256,uint8)";

fn require_weth(sdk: &SdkContext) -> Result<()> {
    if !sdk.tokens.contains("WETH") {
        anyhow::bail!("WETH is not in the token whitelist for chain {}", sdk.chain_id);
    }
    Ok(())
}

/// Wraps native ETH into WETH 1:1. The call carries the wrapped amount as native value.
#[derive(Debug, Clone, Copy)]
pub struct WrapEth {
    pub to_mode: FarmToMode,
}

impl WrapEth {
    pub fn new(to_mode: FarmToMode) -> Self {
        Self { to_mode }
    }
}

#[async_trait]
impl StepClass for WrapEth {
    fn name(&self) -> &str {
        "wrapEth"
    }

    fn bind(&self, sdk: &SdkContext) -> Result<()> {
        require_weth(sdk)
    }

    async fn run(&self, amount_in: U256, _ctx: &RunContext) -> Result<Step> {
        let to_mode = self.to_mode;
        Ok(Step::new("wrapEth", amount_in, move || {
            encode_call(WRAP_ETH, &[Token::Uint(amount_in), to_mode.token()])
        })
        .with_value(amount_in)
        .with_decoder(|data| decode_call(WRAP_ETH, &[ParamType::Uint(256), ParamType::Uint(8)], data)))
    }
}

/// Unwraps WETH into native ETH 1:1.
#[derive(Debug, Clone, Copy)]
pub struct UnwrapEth {
    pub from_mode: FarmFromMode,
}

impl UnwrapEth {
    pub fn new(from_mode: FarmFromMode) -> Self {
        Self { from_mode }
    }
}

#[async_trait]
impl StepClass for UnwrapEth {
    fn name(&self) -> &str {
        "unwrapEth"
    }

    fn bind(&self, sdk: &SdkContext) -> Result<()> {
        require_weth(sdk)
    }

    async fn run(&self, amount_in: U256, _ctx: &RunContext) -> Result<Step> {
        let from_mode = self.from_mode;
        Ok(Step::new("unwrapEth", amount_in, move || {
            encode_call(UNWRAP_ETH, &[Token::Uint(amount_in), from_mode.token()])
        })
        .with_decoder(|data| decode_call(UNWRAP_ETH, &[ParamType::Uint(256), ParamType::Uint(8)], data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Token as Instrument, TokenRegistry};
    use crate::workflow::{RunData, RunMode};
    use ethers::types::Address;
    use std::sync::Arc;

    fn sdk(with_weth: bool) -> Arc<SdkContext> {
        let mut tokens = TokenRegistry::new();
        if with_weth {
            tokens.insert(Instrument::new("WETH", Address::repeat_byte(0x0e), 18));
        }
        Arc::new(SdkContext::new(1, Address::repeat_byte(0xfa), tokens))
    }

    #[tokio::test]
    async fn wrap_requires_value_equal_to_amount() {
        let sdk = sdk(true);
        let ctx = RunContext::new(Arc::clone(&sdk), RunMode::Estimate, RunData::default());
        let step = WrapEth::new(FarmToMode::Internal)
            .run(U256::exp10(18), &ctx)
            .await
            .unwrap();

        assert_eq!(step.amount_out, U256::exp10(18));
        assert_eq!(step.value, Some(U256::exp10(18)));
        let args = step.decode(&step.encode()).unwrap();
        assert_eq!(args, vec![Token::Uint(U256::exp10(18)), Token::Uint(U256::one())]);
    }

    #[tokio::test]
    async fn unwrap_carries_no_value() {
        let sdk = sdk(true);
        let ctx = RunContext::new(Arc::clone(&sdk), RunMode::Execute, RunData::default());
        let step = UnwrapEth::new(FarmFromMode::InternalTolerant)
            .run(U256::from(5u64), &ctx)
            .await
            .unwrap();

        assert_eq!(step.value, None);
        let args = step.decode(&step.encode()).unwrap();
        assert_eq!(args[1], Token::Uint(U256::from(3u64)));
    }

    #[test]
    fn binding_requires_weth() {
        assert!(WrapEth::new(FarmToMode::External).bind(&sdk(false)).is_err());
        assert!(UnwrapEth::new(FarmFromMode::External).bind(&sdk(true)).is_ok());
    }
}
