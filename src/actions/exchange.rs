use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};
use log::debug;
use std::sync::Arc;

use super::Quoter;
use crate::farm::{decode_call, encode_call, FarmFromMode, FarmToMode};
use crate::types::conversions::apply_slippage;
use crate::types::Token as Instrument;
use crate::workflow::{RunContext, Step, StepClass};

const EXCHANGE: &str = "exchange(address,address,address,uint256,uint256,uint8,uint8)";

/// Swaps `token_in` for `token_out` through one pool.
///
/// The minimum output encoded into the call is the quoted output lowered by the run's
/// slippage, and only for passes that build a real transaction. Estimates encode the
/// exact quote.
#[derive(Clone)]
pub struct Exchange {
    pub pool: Address,
    pub token_in: Instrument,
    pub token_out: Instrument,
    pub from_mode: FarmFromMode,
    pub to_mode: FarmToMode,
    name: String,
    quoter: Arc<dyn Quoter>,
}

impl Exchange {
    pub fn new(
        pool: Address,
        token_in: Instrument,
        token_out: Instrument,
        quoter: Arc<dyn Quoter>,
        from_mode: FarmFromMode,
        to_mode: FarmToMode,
    ) -> Self {
        let name = format!("exchange {}->{}", token_in.symbol, token_out.symbol);
        Self {
            pool,
            token_in,
            token_out,
            from_mode,
            to_mode,
            name,
            quoter,
        }
    }
}

#[async_trait]
impl StepClass for Exchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, sdk: &crate::workflow::SdkContext) -> Result<()> {
        for token in [&self.token_in, &self.token_out] {
            if token.is_native() {
                anyhow::bail!("{} is native; wrap it before exchanging", token.symbol);
            }
            if !sdk.tokens.contains(&token.symbol) {
                anyhow::bail!("{} is not in the token whitelist", token.symbol);
            }
        }
        Ok(())
    }

    async fn run(&self, amount_in: U256, ctx: &RunContext) -> Result<Step> {
        let forward = ctx.is_forward();
        let quoted = self
            .quoter
            .quote(amount_in, forward)
            .await
            .with_context(|| format!("{} quote failed for {}", self.quoter.name(), amount_in))?;

        // (amount sold, amount bought)
        let (sell, buy) = if forward {
            (amount_in, quoted)
        } else {
            (quoted, amount_in)
        };
        let min_out = if ctx.run_mode.is_static() {
            apply_slippage(buy, ctx.slippage())
        } else {
            buy
        };
        debug!(
            "{}: sell={} buy={} min_out={} mode={}",
            self.name, sell, buy, min_out, ctx.run_mode
        );

        let args = vec![
            Token::Address(self.pool),
            Token::Address(self.token_in.address),
            Token::Address(self.token_out.address),
            Token::Uint(sell),
            Token::Uint(min_out),
            self.from_mode.token(),
            self.to_mode.token(),
        ];
        Ok(Step::new(self.name.clone(), quoted, move || encode_call(EXCHANGE, &args))
            .with_decoder(|data| {
                decode_call(
                    EXCHANGE,
                    &[
                        ParamType::Address,
                        ParamType::Address,
                        ParamType::Address,
                        ParamType::Uint(256),
                        ParamType::Uint(256),
                        ParamType::Uint(8),
                        ParamType::Uint(8),
                    ],
                    data,
                )
            })
            .with_result_decoder(|raw| ethers::abi::decode(&[ParamType::Uint(256)], raw).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenRegistry;
    use crate::workflow::{RunData, RunMode, SdkContext};

    /// 1 in -> 2 out.
    struct Double;

    #[async_trait]
    impl Quoter for Double {
        fn name(&self) -> &'static str {
            "double"
        }

        async fn quote(&self, amount: U256, forward: bool) -> Result<U256> {
            Ok(if forward { amount * 2 } else { amount / 2 })
        }
    }

    struct Broken;

    #[async_trait]
    impl Quoter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn quote(&self, _amount: U256, _forward: bool) -> Result<U256> {
            anyhow::bail!("pool paused")
        }
    }

    fn tokens() -> (Instrument, Instrument) {
        (
            Instrument::new("WETH", Address::repeat_byte(0x0e), 18),
            Instrument::new("USDT", Address::repeat_byte(0x0d), 6),
        )
    }

    fn ctx(mode: RunMode, slippage: f64) -> RunContext {
        let (weth, usdt) = tokens();
        let registry: TokenRegistry = vec![weth, usdt].into_iter().collect();
        let sdk = Arc::new(SdkContext::new(1, Address::repeat_byte(0xfa), registry));
        RunContext::new(sdk, mode, RunData::default().with_slippage(slippage))
    }

    fn exchange(quoter: Arc<dyn Quoter>) -> Exchange {
        let (weth, usdt) = tokens();
        Exchange::new(
            Address::repeat_byte(0x99),
            weth,
            usdt,
            quoter,
            FarmFromMode::External,
            FarmToMode::Internal,
        )
    }

    #[tokio::test]
    async fn slippage_only_applies_when_executing() {
        let action = exchange(Arc::new(Double));

        let estimate = action.run(U256::from(1_000u64), &ctx(RunMode::Estimate, 1.0)).await.unwrap();
        assert_eq!(estimate.amount_out, U256::from(2_000u64));
        let args = estimate.decode(&estimate.encode()).unwrap();
        assert_eq!(args[4], Token::Uint(U256::from(2_000u64)));

        let execute = action.run(U256::from(1_000u64), &ctx(RunMode::Execute, 1.0)).await.unwrap();
        assert_eq!(execute.amount_out, U256::from(2_000u64));
        let args = execute.decode(&execute.encode()).unwrap();
        assert_eq!(args[3], Token::Uint(U256::from(1_000u64)));
        assert_eq!(args[4], Token::Uint(U256::from(1_980u64)));
    }

    #[tokio::test]
    async fn reverse_run_returns_required_input() {
        let action = exchange(Arc::new(Double));
        let step = action
            .run(U256::from(2_000u64), &ctx(RunMode::EstimateReversed, 0.0))
            .await
            .unwrap();

        assert_eq!(step.amount_out, U256::from(1_000u64));
        let args = step.decode(&step.encode()).unwrap();
        assert_eq!(args[3], Token::Uint(U256::from(1_000u64)));
        assert_eq!(args[4], Token::Uint(U256::from(2_000u64)));
    }

    #[tokio::test]
    async fn quoter_errors_keep_their_cause() {
        let action = exchange(Arc::new(Broken));
        let err = action
            .run(U256::one(), &ctx(RunMode::Estimate, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.root_cause().to_string(), "pool paused");
    }

    #[test]
    fn native_tokens_cannot_be_exchanged() {
        let (_, usdt) = tokens();
        let eth = Instrument::new("ETH", Address::zero(), 18);
        let action = Exchange::new(
            Address::zero(),
            eth,
            usdt,
            Arc::new(Double),
            FarmFromMode::External,
            FarmToMode::External,
        );
        let sdk = ctx(RunMode::Estimate, 0.0).sdk;
        assert!(action.bind(&sdk).is_err());
        assert!(exchange(Arc::new(Double)).bind(&sdk).is_ok());
    }
}
