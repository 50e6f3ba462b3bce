//! # Workflow Engine
//!
//! A [`Workflow`] is an ordered chain of [`StepGenerator`]s that is resolved against a
//! running amount and collapsed into one `farm(bytes[])` transaction.
//!
//! ## Build passes
//!
//! Every entry point (`estimate`, `estimate_reversed`, `execute`, `call_static`,
//! `estimate_gas`) runs a build pass:
//!
//! 1. Resolved steps, tags and the native value total are cleared.
//! 2. Generators run one at a time, front-to-back (back-to-front for
//!    `EstimateReversed`), each receiving the previous step's `amount_out`.
//! 3. Generators flagged `only_execute` are skipped unless the pass is static
//!    (`Execute`, `CallStatic`, `EstimateGas`).
//!
//! A failing generator aborts the pass. Steps from a failed pass are left as they are
//! and must not be encoded; the next entry point call rebuilds from scratch.
//!
//! A workflow takes `&mut self` for every pass, so one instance cannot be driven
//! concurrently. Use [`Workflow::copy`] to get an independent instance.

pub mod context;
pub mod generator;
pub mod step;

pub use context::{RunContext, RunData, RunMode, SdkContext};
pub use generator::{GeneratorInput, StepClass, StepGenerator, StepOptions};
pub use step::{Encoded, Fields, Step, StepOutput, StepSummary};

use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, TransactionRequest, TxHash, U256};
use futures::future::{BoxFuture, FutureExt};
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::farm;
use crate::metrics;

pub struct Workflow {
    name: String,
    sdk: Arc<SdkContext>,
    generators: Vec<StepGenerator>,
    options: Vec<StepOptions>,
    steps: Vec<Step>,
    value: U256,
    tags: HashMap<String, U256>,
}

impl Workflow {
    pub fn new(sdk: Arc<SdkContext>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sdk,
            generators: Vec::new(),
            options: Vec::new(),
            steps: Vec::new(),
            value: U256::zero(),
            tags: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sdk(&self) -> &Arc<SdkContext> {
        &self.sdk
    }

    pub fn generators(&self) -> &[StepGenerator] {
        &self.generators
    }

    pub fn options(&self) -> &[StepOptions] {
        &self.options
    }

    /// Number of generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Steps resolved by the last build pass, in forward order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Native value the last build pass requires.
    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn find_tag(&self, tag: &str) -> Option<U256> {
        self.tags.get(tag).copied()
    }

    pub fn summarize_steps(&self) -> Vec<StepSummary> {
        self.steps.iter().map(StepSummary::from).collect()
    }

    /// Adds a generator, a nested workflow, or a nested list of them.
    pub fn add(&mut self, input: impl Into<GeneratorInput>) -> Result<&mut Self, WorkflowError> {
        self.add_with(input, StepOptions::default())
    }

    /// Like [`add`](Self::add); every flattened item gets a copy of `options`.
    ///
    /// All items are bound before any is stored: a rejected item leaves the workflow
    /// unchanged.
    pub fn add_with(
        &mut self,
        input: impl Into<GeneratorInput>,
        options: StepOptions,
    ) -> Result<&mut Self, WorkflowError> {
        let generators = input.into().flatten();
        for generator in &generators {
            self.bind(generator)?;
        }

        for generator in generators {
            debug!(
                "[{}] add #{} {} '{}'",
                self.name,
                self.generators.len(),
                generator.kind(),
                generator.name()
            );
            self.generators.push(generator);
            self.options.push(options.clone());
        }
        Ok(self)
    }

    fn bind(&self, generator: &StepGenerator) -> Result<(), WorkflowError> {
        match generator {
            StepGenerator::Function { .. } => Ok(()),
            StepGenerator::Class(class) => {
                class
                    .bind(&self.sdk)
                    .map_err(|e| WorkflowError::UnsupportedInputType {
                        name: class.name().to_string(),
                        reason: e.to_string(),
                    })
            }
            StepGenerator::Workflow(nested) => {
                if nested.sdk.chain_id != self.sdk.chain_id
                    || nested.sdk.beanstalk != self.sdk.beanstalk
                {
                    return Err(WorkflowError::UnsupportedInputType {
                        name: nested.name.clone(),
                        reason: format!(
                            "nested workflow targets chain {} at {:?}, expected chain {} at {:?}",
                            nested.sdk.chain_id,
                            nested.sdk.beanstalk,
                            self.sdk.chain_id,
                            self.sdk.beanstalk
                        ),
                    });
                }
                Ok(())
            }
        }
    }

    /// Fresh instance with the same generators and options and no resolved state.
    pub fn copy(&self) -> Workflow {
        Workflow {
            name: self.name.clone(),
            sdk: Arc::clone(&self.sdk),
            generators: self.generators.clone(),
            options: self.options.clone(),
            steps: Vec::new(),
            value: U256::zero(),
            tags: HashMap::new(),
        }
    }

    pub fn clear_steps(&mut self) {
        self.steps.clear();
        self.value = U256::zero();
        self.tags.clear();
    }

    /// Forward estimate: the amount produced by the whole chain for `amount_in`.
    pub async fn estimate(&mut self, amount_in: U256) -> Result<U256, WorkflowError> {
        let ctx = RunContext::new(Arc::clone(&self.sdk), RunMode::Estimate, RunData::default());
        self.build_steps(amount_in, ctx).await
    }

    /// Reverse estimate: the input the chain needs to produce `desired_amount_out`.
    pub async fn estimate_reversed(
        &mut self,
        desired_amount_out: U256,
    ) -> Result<U256, WorkflowError> {
        let ctx = RunContext::new(
            Arc::clone(&self.sdk),
            RunMode::EstimateReversed,
            RunData::default(),
        );
        self.build_steps(desired_amount_out, ctx).await
    }

    /// Runs one build pass under `ctx` and returns the final propagated amount.
    pub fn build_steps(
        &mut self,
        amount_in: U256,
        ctx: RunContext,
    ) -> BoxFuture<'_, Result<U256, WorkflowError>> {
        async move {
            self.clear_steps();

            let count = self.generators.len();
            let order: Vec<usize> = if ctx.is_forward() {
                (0..count).collect()
            } else {
                (0..count).rev().collect()
            };

            let mut amount = amount_in;
            for index in order {
                if self.options[index].only_execute && !ctx.run_mode.is_static() {
                    debug!(
                        "[{}] skip #{} '{}' (only_execute, mode={})",
                        self.name,
                        index,
                        self.generators[index].name(),
                        ctx.run_mode
                    );
                    continue;
                }

                let step_ctx = ctx.for_step(index, &self.tags);
                let step = build_step(&mut self.generators[index], amount, &step_ctx).await?;

                debug!(
                    "[{}] #{} '{}' {} -> {}",
                    self.name, index, step.name, amount, step.amount_out
                );
                amount = step.amount_out;

                if let Some(tag) = &self.options[index].tag {
                    self.tags.insert(tag.clone(), amount);
                }
                if let Some(value) = step.value {
                    if !value.is_zero() {
                        self.value = self.value.saturating_add(value);
                    }
                }

                if ctx.is_forward() {
                    self.steps.push(step);
                } else {
                    self.steps.insert(0, step);
                }
            }

            metrics::record_steps_built(ctx.run_mode.as_str(), self.steps.len());
            Ok(amount)
        }
        .boxed()
    }

    /// Encodes the resolved steps as one `farm(bytes[])` call.
    pub fn encode(&self) -> Result<Bytes, WorkflowError> {
        Ok(farm::encode_farm_call(&self.encode_steps()?))
    }

    /// Encodes every resolved step, in forward order.
    pub fn encode_steps(&self) -> Result<Vec<Encoded>, WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::NoStepsBuilt);
        }
        Ok(self.steps.iter().map(Step::encode).collect())
    }

    pub async fn estimate_and_encode_steps(
        &mut self,
        amount_in: U256,
        run_mode: RunMode,
        data: RunData,
    ) -> Result<Vec<Encoded>, WorkflowError> {
        let ctx = RunContext::new(Arc::clone(&self.sdk), run_mode, data);
        self.build_steps(amount_in, ctx).await?;
        self.encode_steps()
    }

    /// Index-aligned decode of per-step farm results. Steps without result decoding
    /// yield an empty field list.
    pub fn decode_result(&self, raw_results: &[Bytes]) -> Vec<Fields> {
        self.steps
            .iter()
            .zip(raw_results)
            .map(|(step, raw)| step.decode_result(raw).unwrap_or_default())
            .collect()
    }

    async fn prepare(
        &mut self,
        amount_in: U256,
        run_mode: RunMode,
        data: &RunData,
    ) -> Result<TypedTransaction, WorkflowError> {
        let calls = self
            .estimate_and_encode_steps(amount_in, run_mode, data.clone())
            .await?;
        let mut tx = TransactionRequest::new()
            .to(self.sdk.beanstalk)
            .data(farm::encode_farm_call(&calls))
            .value(self.value);
        if let Some(account) = data.account {
            tx = tx.from(account);
        }
        Ok(tx.into())
    }

    /// Builds in `Execute` mode and submits the farm transaction.
    pub async fn execute<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: U256,
        data: RunData,
    ) -> Result<TxHash, WorkflowError> {
        let tx = self.prepare(amount_in, RunMode::Execute, &data).await?;
        let pending = provider
            .send_transaction(tx, None)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))?;
        let hash = pending.tx_hash();
        info!(
            "🚜 [{}] submitted farm with {} steps, value={}, tx={:?}",
            self.name,
            self.steps.len(),
            self.value,
            hash
        );
        Ok(hash)
    }

    /// Builds in `CallStatic` mode, simulates the farm call and returns the raw
    /// per-step results.
    pub async fn call_static<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: U256,
        data: RunData,
    ) -> Result<Vec<Bytes>, WorkflowError> {
        let tx = self.prepare(amount_in, RunMode::CallStatic, &data).await?;
        let response = provider
            .call(&tx, None)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))?;
        farm::decode_farm_results(&response)
    }

    pub async fn estimate_gas<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: U256,
        data: RunData,
    ) -> Result<U256, WorkflowError> {
        let tx = self.prepare(amount_in, RunMode::EstimateGas, &data).await?;
        provider
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| WorkflowError::Provider(e.to_string()))
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("generators", &self.generators)
            .field("steps", &self.steps.len())
            .field("value", &self.value)
            .finish()
    }
}

async fn build_step(
    generator: &mut StepGenerator,
    amount_in: U256,
    ctx: &RunContext,
) -> Result<Step, WorkflowError> {
    let name = generator.name().to_string();

    let result = match generator {
        StepGenerator::Workflow(nested) => {
            let amount_out = match nested.build_steps(amount_in, ctx.clone()).await {
                Ok(amount_out) => amount_out,
                Err(e) => {
                    error!(
                        "❌ nested workflow '{}' failed: amount_in={}, direction={}, error={}",
                        name,
                        amount_in,
                        ctx.run_mode.direction(),
                        e
                    );
                    return Err(e);
                }
            };
            let calls = nested.steps.iter().map(Step::encode).collect::<Vec<_>>();
            let mut step = Step::new(name.clone(), amount_out, move || {
                farm::encode_farm_call(&calls)
            });
            if !nested.value.is_zero() {
                step = step.with_value(nested.value);
            }
            Ok(step)
        }
        StepGenerator::Class(class) => class.run(amount_in, ctx).await,
        StepGenerator::Function { func, .. } => {
            (**func)(amount_in, ctx).await.map(|output| match output {
                StepOutput::Step(step) => step,
                StepOutput::Encoded(data) => Step::encoded(name.clone(), amount_in, data),
            })
        }
    };

    result.map_err(|source| {
        error!(
            "❌ step '{}' failed: amount_in={}, direction={}, error={:#}",
            name,
            amount_in,
            ctx.run_mode.direction(),
            source
        );
        metrics::increment_step_failures(&name);
        WorkflowError::GeneratorExecution {
            name,
            amount_in,
            direction: ctx.run_mode.direction(),
            source,
        }
    })
}
