use async_trait::async_trait;
use ethers::types::U256;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::context::{RunContext, SdkContext};
use super::step::{Step, StepOutput};
use super::Workflow;

pub type StepFuture = BoxFuture<'static, anyhow::Result<StepOutput>>;
pub type StepFn = dyn Fn(U256, &RunContext) -> StepFuture + Send + Sync;

/// A stateful step producer, e.g. an action holding a pool address and a quoter.
///
/// In [`RunMode::EstimateReversed`](super::RunMode) `amount_in` is the desired output
/// of this step and the returned `amount_out` is the input it requires.
#[async_trait]
pub trait StepClass: Send + Sync {
    fn name(&self) -> &str;

    /// Called when the generator is added to a workflow. Rejecting the context makes
    /// `add()` fail with `UnsupportedInputType`.
    fn bind(&self, _sdk: &SdkContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run(&self, amount_in: U256, ctx: &RunContext) -> anyhow::Result<Step>;
}

/// An unresolved producer of a [`Step`].
pub enum StepGenerator {
    Function { name: String, func: Arc<StepFn> },
    Class(Arc<dyn StepClass>),
    Workflow(Box<Workflow>),
}

impl StepGenerator {
    /// Wraps an async closure. The closure receives its own copy of the run context.
    pub fn function<F, Fut, O>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(U256, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<StepOutput>,
    {
        let func: Arc<StepFn> = Arc::new(move |amount_in: U256, ctx: &RunContext| {
            func(amount_in, ctx.clone())
                .map(|result| result.map(Into::into))
                .boxed()
        });
        StepGenerator::Function {
            name: name.into(),
            func,
        }
    }

    pub fn class<C: StepClass + 'static>(class: C) -> Self {
        StepGenerator::Class(Arc::new(class))
    }

    pub fn workflow(workflow: Workflow) -> Self {
        StepGenerator::Workflow(Box::new(workflow))
    }

    pub fn name(&self) -> &str {
        match self {
            StepGenerator::Function { name, .. } => name,
            StepGenerator::Class(class) => class.name(),
            StepGenerator::Workflow(workflow) => workflow.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepGenerator::Function { .. } => "function",
            StepGenerator::Class(_) => "class",
            StepGenerator::Workflow(_) => "workflow",
        }
    }
}

impl Clone for StepGenerator {
    fn clone(&self) -> Self {
        match self {
            StepGenerator::Function { name, func } => StepGenerator::Function {
                name: name.clone(),
                func: Arc::clone(func),
            },
            StepGenerator::Class(class) => StepGenerator::Class(Arc::clone(class)),
            StepGenerator::Workflow(workflow) => StepGenerator::Workflow(Box::new(workflow.copy())),
        }
    }
}

impl fmt::Debug for StepGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepGenerator::{}({})", self.kind(), self.name())
    }
}

impl From<Workflow> for StepGenerator {
    fn from(workflow: Workflow) -> Self {
        StepGenerator::workflow(workflow)
    }
}

/// Per-generator options.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Run only when the pass determines a real transaction (execute, call static,
    /// gas estimate).
    pub only_execute: bool,
    /// Record this generator's `amount_out` under a name readable by later steps.
    pub tag: Option<String>,
}

impl StepOptions {
    pub fn only_execute() -> Self {
        Self {
            only_execute: true,
            tag: None,
        }
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            only_execute: false,
            tag: Some(tag.into()),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Input to `Workflow::add`: one generator or an arbitrarily nested list of them.
#[derive(Debug, Clone)]
pub enum GeneratorInput {
    One(StepGenerator),
    Many(Vec<GeneratorInput>),
}

impl GeneratorInput {
    /// Depth-first flattening preserving order.
    pub fn flatten(self) -> Vec<StepGenerator> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<StepGenerator>) {
        match self {
            GeneratorInput::One(generator) => out.push(generator),
            GeneratorInput::Many(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }
}

impl From<StepGenerator> for GeneratorInput {
    fn from(generator: StepGenerator) -> Self {
        GeneratorInput::One(generator)
    }
}

impl From<Workflow> for GeneratorInput {
    fn from(workflow: Workflow) -> Self {
        GeneratorInput::One(StepGenerator::workflow(workflow))
    }
}

impl<T: Into<GeneratorInput>> From<Vec<T>> for GeneratorInput {
    fn from(items: Vec<T>) -> Self {
        GeneratorInput::Many(items.into_iter().map(Into::into).collect())
    }
}
