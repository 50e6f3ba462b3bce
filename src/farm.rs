//! # Farm Call Encoding
//!
//! Every workflow is submitted as a single `farm(bytes[] data)` call on the Beanstalk
//! diamond, which delegate-calls each entry in order and returns `bytes[] results`.
//! This module holds the ABI plumbing for that envelope and for the individual farm
//! functions used by the built-in actions, plus the transfer-mode enums shared by them.
//!
//! Encoding is done with `ethers::abi` tokens directly; no contract binding is required.

use ethers::abi::{ParamType, Token};
use ethers::types::Bytes;
use ethers::utils::id;
use log::debug;
use std::fmt;

use crate::error::WorkflowError;

/// Signature of the batched entry point.
pub const FARM_SIGNATURE: &str = "farm(bytes[])";

/// Where a farm function pulls its input balance from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FarmFromMode {
    /// The caller's wallet.
    #[default]
    External,
    /// The caller's internal (farm) balance.
    Internal,
    /// Internal balance first, topped up from the wallet.
    ExternalInternal,
    /// Internal balance, using whatever is available up to the amount.
    InternalTolerant,
}

impl FarmFromMode {
    pub fn as_u8(self) -> u8 {
        match self {
            FarmFromMode::External => 0,
            FarmFromMode::Internal => 1,
            FarmFromMode::ExternalInternal => 2,
            FarmFromMode::InternalTolerant => 3,
        }
    }

    pub fn token(self) -> Token {
        Token::Uint(self.as_u8().into())
    }
}

impl fmt::Display for FarmFromMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarmFromMode::External => write!(f, "EXTERNAL"),
            FarmFromMode::Internal => write!(f, "INTERNAL"),
            FarmFromMode::ExternalInternal => write!(f, "EXTERNAL_INTERNAL"),
            FarmFromMode::InternalTolerant => write!(f, "INTERNAL_TOLERANT"),
        }
    }
}

/// Where a farm function delivers its output balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FarmToMode {
    #[default]
    External,
    Internal,
}

impl FarmToMode {
    pub fn as_u8(self) -> u8 {
        match self {
            FarmToMode::External => 0,
            FarmToMode::Internal => 1,
        }
    }

    pub fn token(self) -> Token {
        Token::Uint(self.as_u8().into())
    }
}

impl fmt::Display for FarmToMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FarmToMode::External => write!(f, "EXTERNAL"),
            FarmToMode::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Selector-prefixed ABI encoding of `signature(args...)`.
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(ethers::abi::encode(args));
    Bytes::from(data)
}

/// Decodes the arguments of a call produced by [`encode_call`]. Returns `None` when the
/// selector does not match `signature` or the body does not fit `params`.
pub fn decode_call(signature: &str, params: &[ParamType], data: &[u8]) -> Option<Vec<Token>> {
    if data.len() < 4 || data[..4] != id(signature) {
        return None;
    }
    ethers::abi::decode(params, &data[4..]).ok()
}

/// Encodes the `farm(bytes[])` envelope around already-encoded step calls.
pub fn encode_farm_call(calls: &[Bytes]) -> Bytes {
    let call_tokens = calls
        .iter()
        .map(|call| Token::Bytes(call.to_vec()))
        .collect::<Vec<_>>();
    debug!("Encoding farm call with {} steps", call_tokens.len());
    encode_call(FARM_SIGNATURE, &[Token::Array(call_tokens)])
}

/// Splits a `farm(bytes[])` calldata back into its step calls.
pub fn decode_farm_call(data: &[u8]) -> Option<Vec<Bytes>> {
    let tokens = decode_call(
        FARM_SIGNATURE,
        &[ParamType::Array(Box::new(ParamType::Bytes))],
        data,
    )?;
    bytes_array(tokens)
}

/// Decodes the `bytes[] results` returned by `farm`.
pub fn decode_farm_results(response: &[u8]) -> Result<Vec<Bytes>, WorkflowError> {
    let decoded = ethers::abi::decode(
        &[ParamType::Array(Box::new(ParamType::Bytes))],
        response,
    )?;

    bytes_array(decoded)
        .ok_or_else(|| WorkflowError::Encoding("Invalid farm response format".to_string()))
}

fn bytes_array(tokens: Vec<Token>) -> Option<Vec<Bytes>> {
    let items = tokens.into_iter().next()?.into_array()?;
    items
        .into_iter()
        .map(|item| item.into_bytes().map(Bytes::from))
        .collect()
}
