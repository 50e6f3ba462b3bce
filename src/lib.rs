//! # Farm Workflow SDK
//!
//! Compose many on-chain actions into one atomic `farm(bytes[])` call, estimate the
//! chain off-chain in either direction, and route between tokens over a fixed graph.
//!
//! ## Overview
//!
//! - **Workflow**: an ordered chain of step generators. Each generator resolves to a
//!   [`Step`](workflow::Step) carrying an `amount_out` and its calldata; the amount feeds
//!   the next generator. Workflows nest, and a nested workflow collapses into one step.
//! - **Router**: breadth-first shortest path over instrument symbols; each edge builds a
//!   generator once the account and transfer modes are known.
//! - **Operation**: binds one route to one workflow and exposes `estimate`,
//!   `estimate_reversed`, `execute`, `call_static` and `estimate_gas`.
//!
//! ## Architecture
//!
//! ### Engine Layer
//! [`workflow`] holds the composition engine, [`farm`] the calldata envelope and transfer
//! modes, [`error`] the error taxonomy.
//!
//! ### Action Layer
//! [`actions`] provides the built-in farm functions (wrap, transfer, exchange, deposit).
//! Exchange pricing is injected through the [`actions::Quoter`] trait.
//!
//! ### Routing Layer
//! [`router`] builds the graph and finds paths; [`operation`] turns a path into a
//! runnable workflow.
//!
//! ## Example
//!
//! ```no_run
//! use farm_workflow_sdk::{Operation, Router, Settings};
//! use farm_workflow_sdk::farm::{FarmFromMode, FarmToMode};
//! use farm_workflow_sdk::router::{build_swap_graph, transfer_self_edge};
//! use ethers::types::Address;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let sdk = Settings::new()?.sdk_context()?;
//! let graph = build_swap_graph(&sdk.tokens, &[], &[]);
//! let router = Router::new(graph, transfer_self_edge(sdk.tokens.clone()));
//!
//! let eth = sdk.tokens.get("ETH").cloned().ok_or_else(|| anyhow::anyhow!("no ETH"))?;
//! let weth = sdk.tokens.get("WETH").cloned().ok_or_else(|| anyhow::anyhow!("no WETH"))?;
//! let mut op = Operation::swap(
//!     &router,
//!     sdk,
//!     eth.clone(),
//!     weth,
//!     Address::zero(),
//!     FarmFromMode::External,
//!     FarmToMode::External,
//! )?;
//! let out = op.estimate(eth.amount("1.5")?).await?;
//! println!("1.5 ETH -> {} WETH", out);
//! # Ok(())
//! # }
//! ```

// Engine
/// Workflow composition engine (generators, steps, run modes)
pub mod workflow;
/// `farm(bytes[])` encoding and transfer modes
pub mod farm;
/// Error taxonomy
pub mod error;
/// Token metadata and fixed-point conversions
pub mod types;

// Actions & Routing
/// Built-in farm actions
pub mod actions;
/// Graph routing between instruments
pub mod router;
/// Route-bound workflows
pub mod operation;

// Infrastructure
/// Metrics and observability
pub mod metrics;
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use error::WorkflowError;
pub use operation::{Operation, OperationKind};
pub use router::{Graph, Router, RouterResult};
pub use settings::Settings;
pub use types::{Token, TokenRegistry, TokenValue};
pub use workflow::{RunContext, RunData, RunMode, SdkContext, Step, StepClass, StepGenerator, Workflow};
