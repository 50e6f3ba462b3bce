//! # Operation
//!
//! Binds one route to one workflow. The route is resolved once at construction, each hop
//! is turned into a generator with transfer modes chosen by its position, and the
//! resulting workflow is reused for every estimate or execution.
//!
//! Amounts cross this boundary as [`TokenValue`]s and are converted to raw `U256`
//! fixed-point integers in the decimals of the instrument they denominate.

use ethers::providers::Middleware;
use ethers::types::{Address, Bytes, TxHash, U256};
use log::{debug, info};
use std::sync::Arc;
use tracing::{info_span, Instrument};

use crate::error::WorkflowError;
use crate::farm::{FarmFromMode, FarmToMode};
use crate::router::{silo_node, Router, RouterResult};
use crate::types::{Token, TokenValue};
use crate::workflow::{RunData, SdkContext, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Swap,
    Deposit,
}

/// Transfer modes for the hop at `index` of a `len`-hop route.
///
/// Only the outer ends of the route touch the caller's chosen balances. Everything in
/// between settles through the internal balance, read tolerantly.
pub fn modes_for(
    index: usize,
    len: usize,
    from_mode: FarmFromMode,
    to_mode: FarmToMode,
) -> (FarmFromMode, FarmToMode) {
    let first = index == 0;
    let last = index + 1 == len;
    match (first, last) {
        (true, true) => (from_mode, to_mode),
        (true, false) => (from_mode, FarmToMode::Internal),
        (false, true) => (FarmFromMode::InternalTolerant, to_mode),
        (false, false) => (FarmFromMode::InternalTolerant, FarmToMode::Internal),
    }
}

pub struct Operation {
    kind: OperationKind,
    token_in: Token,
    token_out: Token,
    target: String,
    account: Address,
    route: Vec<RouterResult>,
    workflow: Workflow,
}

impl Operation {
    /// Swap `token_in` into `token_out` along the router's shortest path.
    pub fn swap(
        router: &Router,
        sdk: Arc<SdkContext>,
        token_in: Token,
        token_out: Token,
        account: Address,
        from_mode: FarmFromMode,
        to_mode: FarmToMode,
    ) -> Result<Self, WorkflowError> {
        let target = token_out.symbol.clone();
        Self::bind(
            OperationKind::Swap,
            router,
            sdk,
            token_in,
            token_out,
            target,
            account,
            from_mode,
            to_mode,
        )
    }

    /// Route `token_in` to the Silo deposit of `token`, swapping first when they differ.
    pub fn deposit(
        router: &Router,
        sdk: Arc<SdkContext>,
        token_in: Token,
        token: Token,
        account: Address,
        from_mode: FarmFromMode,
    ) -> Result<Self, WorkflowError> {
        let target = silo_node(&token.symbol);
        Self::bind(
            OperationKind::Deposit,
            router,
            sdk,
            token_in,
            token,
            target,
            account,
            from_mode,
            FarmToMode::Internal,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn bind(
        kind: OperationKind,
        router: &Router,
        sdk: Arc<SdkContext>,
        token_in: Token,
        token_out: Token,
        target: String,
        account: Address,
        from_mode: FarmFromMode,
        to_mode: FarmToMode,
    ) -> Result<Self, WorkflowError> {
        let route = router.find_path(&token_in.symbol, &target);
        let name = format!("{} {} -> {}", kind.as_str(), token_in.symbol, target);
        let mut workflow = Workflow::new(sdk, name);

        let len = route.len();
        for (index, hop) in route.iter().enumerate() {
            let (from, to) = modes_for(index, len, from_mode, to_mode);
            debug!("{:?}: hop #{} {:?} from={} to={}", kind, index, hop, from, to);
            workflow.add(hop.step(account, from, to))?;
        }

        if route.is_empty() {
            info!("⚠️ {} has no route; operation is invalid", workflow.name());
        }

        Ok(Self {
            kind,
            token_in,
            token_out,
            target,
            account,
            route,
            workflow,
        })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn token_in(&self) -> &Token {
        &self.token_in
    }

    pub fn token_out(&self) -> &Token {
        &self.token_out
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// False when the router found no route.
    pub fn is_valid(&self) -> bool {
        !self.route.is_empty()
    }

    pub fn route(&self) -> &[RouterResult] {
        &self.route
    }

    /// Node sequence of the route, e.g. `["ETH", "WETH", "USDT", "BEAN"]`.
    pub fn path(&self) -> Vec<String> {
        let mut nodes = Vec::with_capacity(self.route.len() + 1);
        if let Some(first) = self.route.first() {
            nodes.push(first.from.clone());
        }
        for hop in &self.route {
            if !hop.is_self_edge() {
                nodes.push(hop.to.clone());
            }
        }
        nodes
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }

    fn ensure_valid(&self) -> Result<(), WorkflowError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(WorkflowError::UnreachableRoute {
                from: self.token_in.symbol.clone(),
                to: self.target.clone(),
            })
        }
    }

    fn raw_in(&self, amount_in: TokenValue) -> Result<U256, WorkflowError> {
        Ok(amount_in.with_decimals(self.token_in.decimals)?.raw())
    }

    fn run_data(&self, slippage_pct: f64) -> RunData {
        RunData::default()
            .with_account(self.account)
            .with_slippage(slippage_pct)
    }

    /// Amount of `token_out` received for `amount_in` of `token_in`.
    pub async fn estimate(&mut self, amount_in: TokenValue) -> Result<TokenValue, WorkflowError> {
        self.ensure_valid()?;
        let raw = self.raw_in(amount_in)?;
        let span = info_span!("operation.estimate", operation = %self.workflow.name(), amount_in = %raw);
        let out = self.workflow.estimate(raw).instrument(span).await?;
        Ok(self.token_out.from_raw(out))
    }

    /// Amount of `token_in` required to receive `desired_out` of `token_out`.
    pub async fn estimate_reversed(&mut self, desired_out: TokenValue) -> Result<TokenValue, WorkflowError> {
        self.ensure_valid()?;
        let raw = desired_out.with_decimals(self.token_out.decimals)?.raw();
        let span = info_span!("operation.estimate_reversed", operation = %self.workflow.name(), desired_out = %raw);
        let needed = self.workflow.estimate_reversed(raw).instrument(span).await?;
        Ok(self.token_in.from_raw(needed))
    }

    /// Builds with slippage applied and submits the farm transaction from the account.
    pub async fn execute<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: TokenValue,
        slippage_pct: f64,
    ) -> Result<TxHash, WorkflowError> {
        self.ensure_valid()?;
        let raw = self.raw_in(amount_in)?;
        let data = self.run_data(slippage_pct);
        let span = info_span!("operation.execute", operation = %self.workflow.name(), amount_in = %raw);
        self.workflow.execute(provider, raw, data).instrument(span).await
    }

    /// Simulates the farm transaction and returns the raw per-step results.
    pub async fn call_static<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: TokenValue,
        slippage_pct: f64,
    ) -> Result<Vec<Bytes>, WorkflowError> {
        self.ensure_valid()?;
        let raw = self.raw_in(amount_in)?;
        let data = self.run_data(slippage_pct);
        let span = info_span!("operation.call_static", operation = %self.workflow.name(), amount_in = %raw);
        self.workflow.call_static(provider, raw, data).instrument(span).await
    }

    pub async fn estimate_gas<M: Middleware>(
        &mut self,
        provider: &M,
        amount_in: TokenValue,
        slippage_pct: f64,
    ) -> Result<U256, WorkflowError> {
        self.ensure_valid()?;
        let raw = self.raw_in(amount_in)?;
        let data = self.run_data(slippage_pct);
        let span = info_span!("operation.estimate_gas", operation = %self.workflow.name(), amount_in = %raw);
        self.workflow.estimate_gas(provider, raw, data).instrument(span).await
    }
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Swap => "swap",
            OperationKind::Deposit => "deposit",
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("route", &self.route)
            .field("workflow", &self.workflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Graph;
    use crate::types::TokenRegistry;
    use crate::workflow::{RunContext, Step, StepGenerator};

    #[test]
    fn modes_bind_by_edge_position() {
        use FarmFromMode::*;
        use FarmToMode::External as ToExternal;
        use FarmToMode::Internal as ToInternal;

        assert_eq!(modes_for(0, 1, External, ToExternal), (External, ToExternal));
        assert_eq!(modes_for(0, 3, External, ToExternal), (External, ToInternal));
        assert_eq!(modes_for(1, 3, External, ToExternal), (InternalTolerant, ToInternal));
        assert_eq!(modes_for(2, 3, External, ToExternal), (InternalTolerant, ToExternal));
        assert_eq!(modes_for(0, 2, Internal, ToInternal), (Internal, ToInternal));
        assert_eq!(modes_for(1, 2, Internal, ToExternal), (InternalTolerant, ToExternal));
    }

    /// Every hop records the modes it was bound with in its step name.
    fn recording_router() -> Router {
        let hop = |from: FarmFromMode, to: FarmToMode| {
            let name = format!("{}/{}", from.as_u8(), to.as_u8());
            StepGenerator::function(name.clone(), move |amount: U256, _ctx: RunContext| {
                let name = name.clone();
                async move { Ok::<_, anyhow::Error>(Step::encoded(name, amount * 10, Bytes::default())) }
            })
        };
        let graph = Graph::builder()
            .nodes(["A", "B", "C", "D", "Z"])
            .edge("A", "B", move |_, f, t| hop(f, t))
            .edge("B", "C", move |_, f, t| hop(f, t))
            .edge("C", "D", move |_, f, t| hop(f, t))
            .build();
        Router::new(graph, move |node: &str| RouterResult::new(node, node, move |_, f, t| hop(f, t)))
    }

    fn sdk() -> Arc<SdkContext> {
        Arc::new(SdkContext::new(1, Address::repeat_byte(0xfa), TokenRegistry::new()))
    }

    fn token(symbol: &str, decimals: u8) -> Token {
        Token::new(symbol, Address::repeat_byte(symbol.as_bytes()[0]), decimals)
    }

    #[tokio::test]
    async fn swap_binds_modes_and_converts_decimals() {
        let mut op = Operation::swap(
            &recording_router(),
            sdk(),
            token("A", 6),
            token("D", 18),
            Address::zero(),
            FarmFromMode::External,
            FarmToMode::External,
        )
        .unwrap();

        assert!(op.is_valid());
        assert_eq!(op.path(), vec!["A", "B", "C", "D"]);

        let out = op.estimate(TokenValue::from_raw(U256::from(2u64), 6)).await.unwrap();
        assert_eq!(out, TokenValue::from_raw(U256::from(2_000u64), 18));

        let names: Vec<String> = op.workflow().summarize_steps().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["0/1", "3/1", "3/0"]);
    }

    #[tokio::test]
    async fn self_route_is_single_edge_with_caller_modes() {
        let mut op = Operation::swap(
            &recording_router(),
            sdk(),
            token("B", 6),
            token("B", 6),
            Address::zero(),
            FarmFromMode::Internal,
            FarmToMode::External,
        )
        .unwrap();

        assert_eq!(op.route().len(), 1);
        assert_eq!(op.path(), vec!["B"]);
        op.estimate(TokenValue::from_raw(U256::one(), 6)).await.unwrap();
        assert_eq!(op.workflow().steps()[0].name, "1/0");
    }

    #[tokio::test]
    async fn unreachable_operation_is_invalid_and_refuses_to_estimate() {
        let mut op = Operation::swap(
            &recording_router(),
            sdk(),
            token("A", 6),
            token("Z", 6),
            Address::zero(),
            FarmFromMode::External,
            FarmToMode::External,
        )
        .unwrap();

        assert!(!op.is_valid());
        assert!(op.workflow().is_empty());
        let err = op.estimate(TokenValue::zero(6)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnreachableRoute { ref from, ref to } if from == "A" && to == "Z"));
    }

    #[tokio::test]
    async fn amounts_that_do_not_fit_the_input_decimals_are_rejected() {
        let mut op = Operation::swap(
            &recording_router(),
            sdk(),
            token("A", 6),
            token("B", 6),
            Address::zero(),
            FarmFromMode::External,
            FarmToMode::External,
        )
        .unwrap();

        let err = op
            .estimate(TokenValue::from_raw(U256::MAX, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conversion(_)));
        assert!(op.workflow().steps().is_empty());
    }

    #[tokio::test]
    async fn reverse_estimate_reports_input_token_decimals() {
        let mut op = Operation::swap(
            &recording_router(),
            sdk(),
            token("A", 6),
            token("B", 6),
            Address::zero(),
            FarmFromMode::External,
            FarmToMode::External,
        )
        .unwrap();

        let needed = op
            .estimate_reversed(TokenValue::from_raw(U256::from(7u64), 6))
            .await
            .unwrap();
        assert_eq!(needed.decimals(), 6);
        assert_eq!(needed.raw(), U256::from(70u64));
    }
}
