use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::{ParamType, Token};
use ethers::types::{Address, U256};

use crate::farm::{decode_call, encode_call, FarmFromMode, FarmToMode};
use crate::workflow::{RunContext, SdkContext, Step, StepClass};

const TRANSFER_TOKEN: &str = "transferToken(address,address,uint256,uint8,uint8)";

/// Moves a token balance between custody modes (or to another account) without
/// converting it. This is the router's self-edge.
#[derive(Debug, Clone)]
pub struct TransferToken {
    pub token: Address,
    pub recipient: Address,
    pub from_mode: FarmFromMode,
    pub to_mode: FarmToMode,
}

impl TransferToken {
    pub fn new(token: Address, recipient: Address, from_mode: FarmFromMode, to_mode: FarmToMode) -> Self {
        Self {
            token,
            recipient,
            from_mode,
            to_mode,
        }
    }
}

#[async_trait]
impl StepClass for TransferToken {
    fn name(&self) -> &str {
        "transferToken"
    }

    fn bind(&self, sdk: &SdkContext) -> Result<()> {
        if self.token.is_zero() {
            anyhow::bail!("native ETH cannot be moved with transferToken");
        }
        if !sdk.tokens.iter().any(|t| t.address == self.token) {
            anyhow::bail!("token {:?} is not in the whitelist", self.token);
        }
        Ok(())
    }

    async fn run(&self, amount_in: U256, _ctx: &RunContext) -> Result<Step> {
        let args = vec![
            Token::Address(self.token),
            Token::Address(self.recipient),
            Token::Uint(amount_in),
            self.from_mode.token(),
            self.to_mode.token(),
        ];
        Ok(Step::new("transferToken", amount_in, move || encode_call(TRANSFER_TOKEN, &args))
            .with_decoder(|data| {
                decode_call(
                    TRANSFER_TOKEN,
                    &[
                        ParamType::Address,
                        ParamType::Address,
                        ParamType::Uint(256),
                        ParamType::Uint(8),
                        ParamType::Uint(8),
                    ],
                    data,
                )
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Token as Instrument, TokenRegistry};
    use crate::workflow::{RunData, RunMode};
    use std::sync::Arc;

    #[tokio::test]
    async fn transfer_is_pass_through_and_encodes_modes() {
        let bean = Address::repeat_byte(0xbe);
        let account = Address::repeat_byte(0xaa);
        let tokens: TokenRegistry = vec![Instrument::new("BEAN", bean, 6)].into_iter().collect();
        let sdk = Arc::new(SdkContext::new(1, Address::repeat_byte(0xfa), tokens));
        let ctx = RunContext::new(Arc::clone(&sdk), RunMode::Estimate, RunData::default());

        let action = TransferToken::new(bean, account, FarmFromMode::Internal, FarmToMode::External);
        assert!(action.bind(&sdk).is_ok());
        let step = action.run(U256::from(1_000u64), &ctx).await.unwrap();

        assert_eq!(step.amount_out, U256::from(1_000u64));
        let args = step.decode(&step.encode()).unwrap();
        assert_eq!(args[0], Token::Address(bean));
        assert_eq!(args[1], Token::Address(account));
        assert_eq!(args[3], Token::Uint(U256::one()));
        assert_eq!(args[4], Token::Uint(U256::zero()));
    }

    #[test]
    fn native_and_unknown_tokens_do_not_bind() {
        let sdk = SdkContext::new(1, Address::zero(), TokenRegistry::new());
        let native = TransferToken::new(Address::zero(), Address::zero(), FarmFromMode::External, FarmToMode::External);
        let unknown = TransferToken::new(Address::repeat_byte(1), Address::zero(), FarmFromMode::External, FarmToMode::External);
        assert!(native.bind(&sdk).is_err());
        assert!(unknown.bind(&sdk).is_err());
    }
}
