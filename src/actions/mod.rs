//! # Farm Actions
//!
//! Built-in [`StepClass`](crate::workflow::StepClass) implementations for the farm
//! functions the router composes: wrapping and unwrapping ETH, internal/external token
//! transfers, pool exchanges and Silo deposits.
//!
//! Actions only encode calls. Pricing an exchange is delegated to a [`Quoter`]
//! supplied by the embedding application (an on-chain `get_dy` read, an off-chain pool
//! model, ...), so the SDK itself performs no network reads.
//!
//! ## Adding an action
//!
//! 1. Implement `StepClass` for a struct holding the call's fixed parameters
//! 2. Compute `amount_out` in `run`, honouring `ctx.is_forward()`
//! 3. Capture everything `encode` needs in the returned `Step`
//! 4. Wire it into the graph (see `router::graph`)

pub mod deposit;
pub mod exchange;
pub mod transfer_token;
pub mod wrap_eth;

pub use deposit::Deposit;
pub use exchange::Exchange;
pub use transfer_token::TransferToken;
pub use wrap_eth::{UnwrapEth, WrapEth};

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::U256;

/// Prices one direction of a pool.
///
/// `forward == true`: how much of the output token `amount` of the input token buys.
/// `forward == false`: how much of the input token is needed to receive `amount` of the
/// output token.
#[async_trait]
pub trait Quoter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn quote(&self, amount: U256, forward: bool) -> Result<U256>;
}
