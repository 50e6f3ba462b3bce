// src/router/graph.rs

use ethers::types::{Address, U256};
use log::{debug, warn};
use std::sync::Arc;

use super::{Graph, RouterResult};
use crate::actions::{Deposit, Exchange, Quoter, TransferToken, UnwrapEth, WrapEth};
use crate::farm::{FarmFromMode, FarmToMode};
use crate::types::TokenRegistry;
use crate::workflow::{RunContext, Step, StepGenerator};

const NATIVE_SYMBOL: &str = "ETH";
const WRAPPED_SYMBOL: &str = "WETH";

/// Synthetic node for deposits of `symbol` into the Silo.
pub fn silo_node(symbol: &str) -> String {
    format!("{}:SILO", symbol)
}

/// One pool connecting two whitelisted tokens. Each direction has its own quoter.
#[derive(Clone)]
pub struct PoolEdge {
    pub pool: Address,
    pub token_a: String,
    pub token_b: String,
    pub quote_a_to_b: Arc<dyn Quoter>,
    pub quote_b_to_a: Arc<dyn Quoter>,
}

impl PoolEdge {
    pub fn new(
        pool: Address,
        token_a: impl Into<String>,
        token_b: impl Into<String>,
        quote_a_to_b: Arc<dyn Quoter>,
        quote_b_to_a: Arc<dyn Quoter>,
    ) -> Self {
        Self {
            pool,
            token_a: token_a.into(),
            token_b: token_b.into(),
            quote_a_to_b,
            quote_b_to_a,
        }
    }
}

/// Builds the swap graph over a token whitelist.
///
/// - `ETH <-> WETH` through wrap/unwrap, when both are whitelisted
/// - both directions of every pool whose tokens are whitelisted
/// - `TOKEN -> TOKEN:SILO` for every deposit target
///
/// Pools or deposit targets naming unknown tokens are skipped with a warning.
pub fn build_swap_graph(tokens: &TokenRegistry, pools: &[PoolEdge], deposit_targets: &[&str]) -> Graph {
    let mut builder = Graph::builder().nodes(tokens.symbols().map(str::to_string));

    if tokens.contains(NATIVE_SYMBOL) && tokens.contains(WRAPPED_SYMBOL) {
        builder = builder.bidirectional(
            NATIVE_SYMBOL,
            WRAPPED_SYMBOL,
            |_account, _from, to| StepGenerator::class(WrapEth::new(to)),
            |_account, from, _to| StepGenerator::class(UnwrapEth::new(from)),
        );
    }

    for edge in pools {
        let (Some(a), Some(b)) = (tokens.get(&edge.token_a), tokens.get(&edge.token_b)) else {
            warn!(
                "⚠️ Skipping pool {:?}: {}/{} not whitelisted",
                edge.pool, edge.token_a, edge.token_b
            );
            continue;
        };
        let pool = edge.pool;
        let (a_fwd, b_fwd) = (a.clone(), b.clone());
        let (a_back, b_back) = (a.clone(), b.clone());
        let quote_ab = Arc::clone(&edge.quote_a_to_b);
        let quote_ba = Arc::clone(&edge.quote_b_to_a);
        builder = builder.bidirectional(
            a.symbol.clone(),
            b.symbol.clone(),
            move |_account, from, to| {
                StepGenerator::class(Exchange::new(
                    pool,
                    a_fwd.clone(),
                    b_fwd.clone(),
                    Arc::clone(&quote_ab),
                    from,
                    to,
                ))
            },
            move |_account, from, to| {
                StepGenerator::class(Exchange::new(
                    pool,
                    b_back.clone(),
                    a_back.clone(),
                    Arc::clone(&quote_ba),
                    from,
                    to,
                ))
            },
        );
    }

    for symbol in deposit_targets {
        let Some(token) = tokens.get(symbol) else {
            warn!("⚠️ Skipping deposit target {}: not whitelisted", symbol);
            continue;
        };
        let token = token.clone();
        builder = builder.edge(token.symbol.clone(), silo_node(&token.symbol), move |_account, from, _to| {
            StepGenerator::class(Deposit::new(token.clone(), from))
        });
    }

    let graph = builder.build();
    debug!("Swap graph nodes: {:?}", graph.nodes().collect::<Vec<_>>());
    graph
}

/// Self-edge factory: a `transferToken` of the instrument to the account.
///
/// Unknown instruments still produce exactly one edge; its generator fails when run so
/// the error surfaces at estimate time with the instrument in the message.
pub fn transfer_self_edge(tokens: TokenRegistry) -> impl Fn(&str) -> RouterResult + Send + Sync + 'static {
    move |node: &str| {
        let token = tokens.get(node).map(|t| t.address);
        let symbol = node.to_string();
        RouterResult::new(node, node, move |account, from, to| match token {
            Some(address) => StepGenerator::class(TransferToken::new(address, account, from, to)),
            None => {
                let symbol = symbol.clone();
                StepGenerator::function(
                    format!("transferToken {}", symbol),
                    move |_amount: U256, _ctx: RunContext| {
                        let symbol = symbol.clone();
                        async move { Err::<Step, _>(anyhow::anyhow!("{} is not a transferable token", symbol)) }
                    },
                )
            }
        })
    }
}
