use ethers::types::{Address, U256};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::conversions::{decimal_to_u256, u256_to_decimal, ConversionError};

/// Largest power of ten a `U256` holds.
const MAX_U256_EXP10: u8 = 77;

/// A whitelisted instrument.
///
/// The native asset (ETH) is represented with the zero address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }

    /// Parses a human amount ("1.25") into this token's fixed-point representation.
    pub fn amount(&self, human: &str) -> Result<TokenValue, ConversionError> {
        TokenValue::from_human(human, self.decimals)
    }

    pub fn from_raw(&self, raw: U256) -> TokenValue {
        TokenValue::from_raw(raw, self.decimals)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Caller-facing amount: a raw fixed-point integer plus the decimals it is scaled by.
///
/// The workflow engine only ever sees the raw `U256`; conversion happens at the
/// operation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenValue {
    raw: U256,
    decimals: u8,
}

impl TokenValue {
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn from_human(human: &str, decimals: u8) -> Result<Self, ConversionError> {
        let value = Decimal::from_str(human.trim())
            .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;
        Ok(Self {
            raw: decimal_to_u256(value, decimals)?,
            decimals,
        })
    }

    pub fn zero(decimals: u8) -> Self {
        Self::from_raw(U256::zero(), decimals)
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn to_decimal(&self) -> Result<Decimal, ConversionError> {
        u256_to_decimal(self.raw, self.decimals)
    }

    /// Re-expresses the value with different decimals. Scaling down truncates; scaling up
    /// fails with `Overflow` when the result does not fit a `U256`.
    pub fn with_decimals(&self, decimals: u8) -> Result<Self, ConversionError> {
        let raw = match decimals.cmp(&self.decimals) {
            Ordering::Equal => self.raw,
            Ordering::Greater => {
                let shift = decimals - self.decimals;
                if self.raw.is_zero() {
                    U256::zero()
                } else if shift > MAX_U256_EXP10 {
                    return Err(ConversionError::Overflow);
                } else {
                    self.raw
                        .checked_mul(U256::exp10(shift as usize))
                        .ok_or(ConversionError::Overflow)?
                }
            }
            Ordering::Less => {
                let shift = self.decimals - decimals;
                // 10^78 exceeds U256::MAX, so every raw value truncates to zero
                if shift > MAX_U256_EXP10 {
                    U256::zero()
                } else {
                    self.raw / U256::exp10(shift as usize)
                }
            }
        };
        Ok(Self { raw, decimals })
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(f, "{}", d.normalize()),
            Err(_) => write!(f, "{}e-{}", self.raw, self.decimals),
        }
    }
}

/// Symbol-keyed token whitelist, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: IndexMap<String, Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Token) -> Option<Token> {
        self.tokens.insert(token.symbol.clone(), token)
    }

    pub fn with(mut self, token: Token) -> Self {
        self.insert(token);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&Token> {
        self.tokens.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<Token> for TokenRegistry {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        let mut registry = Self::new();
        for token in iter {
            registry.insert(token);
        }
        registry
    }
}
