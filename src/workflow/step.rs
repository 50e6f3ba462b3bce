use ethers::abi::Token as AbiToken;
use ethers::types::{Bytes, U256};
use std::fmt;
use std::sync::Arc;

/// One encoded on-chain call.
pub type Encoded = Bytes;
/// Decoded call arguments or return values.
pub type Fields = Vec<AbiToken>;

type Encoder = Arc<dyn Fn() -> Encoded + Send + Sync>;
type Decoder = Arc<dyn Fn(&[u8]) -> Option<Fields> + Send + Sync>;

/// A resolved, encodable unit of a workflow.
///
/// `encode` works only from state captured when the step was run, so it needs no
/// network access and returns the same bytes on every call.
#[derive(Clone)]
pub struct Step {
    pub name: String,
    pub amount_out: U256,
    /// Native value (wei) the call requires, if any.
    pub value: Option<U256>,
    encoder: Encoder,
    decoder: Option<Decoder>,
    result_decoder: Option<Decoder>,
}

impl Step {
    pub fn new<F>(name: impl Into<String>, amount_out: U256, encoder: F) -> Self
    where
        F: Fn() -> Encoded + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            amount_out,
            value: None,
            encoder: Arc::new(encoder),
            decoder: None,
            result_decoder: None,
        }
    }

    /// A step whose payload is already known.
    pub fn encoded(name: impl Into<String>, amount_out: U256, data: Encoded) -> Self {
        Self::new(name, amount_out, move || data.clone())
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Fields> + Send + Sync + 'static,
    {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn with_result_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Fields> + Send + Sync + 'static,
    {
        self.result_decoder = Some(Arc::new(decoder));
        self
    }

    pub fn encode(&self) -> Encoded {
        (self.encoder)()
    }

    /// Decodes this step's own calldata.
    pub fn decode(&self, data: &[u8]) -> Option<Fields> {
        self.decoder.as_ref().and_then(|decode| decode(data))
    }

    /// Decodes the value this step's call returned inside the farm results.
    pub fn decode_result(&self, result: &[u8]) -> Option<Fields> {
        self.result_decoder.as_ref().and_then(|decode| decode(result))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("amount_out", &self.amount_out)
            .field("value", &self.value)
            .field("data", &format_args!("0x{}", hex::encode(self.encode())))
            .finish()
    }
}

/// What a function generator may hand back: a full step, or a raw encoded call that
/// passes its input amount through unchanged.
#[derive(Debug)]
pub enum StepOutput {
    Step(Step),
    Encoded(Encoded),
}

impl From<Step> for StepOutput {
    fn from(step: Step) -> Self {
        StepOutput::Step(step)
    }
}

impl From<Encoded> for StepOutput {
    fn from(data: Encoded) -> Self {
        StepOutput::Encoded(data)
    }
}

/// Name and resolved output of a step, for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    pub name: String,
    pub amount_out: U256,
}

impl From<&Step> for StepSummary {
    fn from(step: &Step) -> Self {
        Self {
            name: step.name.clone(),
            amount_out: step.amount_out,
        }
    }
}
