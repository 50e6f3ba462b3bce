use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::U256;

use crate::farm::{decode_call, encode_call, FarmFromMode};
use crate::types::Token as Instrument;
use crate::workflow::{RunContext, SdkContext, Step, StepClass};

const DEPOSIT: &str = "deposit(address,uint256,uint8)";

/// Deposits a whitelisted token into the Silo. The deposited amount is passed through.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub token: Instrument,
    pub from_mode: FarmFromMode,
    name: String,
}

impl Deposit {
    pub fn new(token: Instrument, from_mode: FarmFromMode) -> Self {
        let name = format!("deposit {}", token.symbol);
        Self {
            token,
            from_mode,
            name,
        }
    }
}

#[async_trait]
impl StepClass for Deposit {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, sdk: &SdkContext) -> Result<()> {
        if self.token.is_native() || !sdk.tokens.contains(&self.token.symbol) {
            anyhow::bail!("{} cannot be deposited", self.token.symbol);
        }
        Ok(())
    }

    async fn run(&self, amount_in: U256, _ctx: &RunContext) -> Result<Step> {
        let args = vec![
            Token::Address(self.token.address),
            Token::Uint(amount_in),
            self.from_mode.token(),
        ];
        Ok(Step::new(self.name.clone(), amount_in, move || encode_call(DEPOSIT, &args))
            .with_decoder(|data| {
                decode_call(
                    DEPOSIT,
                    &[ParamType::Address, ParamType::Uint(256), ParamType::Uint(8)],
                    data,
                )
            }))
    }
}
