use ethers::types::U256;

use crate::types::ConversionError;

/// Errors surfaced by workflows, routes and operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// `add()` received an item it cannot bind to the workflow's context.
    #[error("Unsupported input type '{name}': {reason}")]
    UnsupportedInputType { name: String, reason: String },

    /// A generator's `run`/function failed. `source` is the generator's own error.
    #[error("Step '{name}' failed ({direction}, amount_in={amount_in}): {source}")]
    GeneratorExecution {
        name: String,
        amount_in: U256,
        direction: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("No steps built: estimate or execute the workflow before encoding")]
    NoStepsBuilt,

    #[error("No route available from {from} to {to}")]
    UnreachableRoute { from: String, to: String },

    /// An amount could not be expressed in the instrument's decimals.
    #[error("Amount conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl WorkflowError {
    /// Name of the failing generator, when the error came from one.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            WorkflowError::GeneratorExecution { name, .. } => Some(name),
            WorkflowError::UnsupportedInputType { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<ethers::abi::Error> for WorkflowError {
    fn from(e: ethers::abi::Error) -> Self {
        WorkflowError::Encoding(e.to_string())
    }
}
