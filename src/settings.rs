use config::{Config, ConfigError, File, FileFormat};
use log::warn;
use serde::Deserialize;
use std::env;
use std::sync::Arc;

use crate::types::conversions::string_to_address;
use crate::types::{ConversionError, Token, TokenRegistry};
use crate::workflow::context::DEFAULT_SLIPPAGE_PCT;
use crate::workflow::SdkContext;

#[derive(Debug, Deserialize, Clone)]
pub struct Chain {
    #[serde(default = "default_chain_id")]
    pub id: u64,
}

fn default_chain_id() -> u64 {
    1 // Ethereum mainnet
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            id: default_chain_id(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    /// Farm entry point (`farm(bytes[])`).
    pub beanstalk: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowSettings {
    /// Percent, e.g. `0.1` for 0.1%.
    #[serde(default = "default_slippage_pct")]
    pub default_slippage_pct: f64,
}

fn default_slippage_pct() -> f64 {
    DEFAULT_SLIPPAGE_PCT
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_slippage_pct: default_slippage_pct(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub chain: Chain,
    pub contracts: Contracts,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl Settings {
    /// Loads `Config.toml` from the working directory, then applies `SDK_*` environment
    /// overrides (a `.env` file is read first when present).
    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let s = Config::builder()
            .add_source(File::with_name("Config.toml"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Parses settings from TOML text. No environment overrides are applied.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Applies overrides read through `lookup`. Empty or unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = var("SDK_CHAIN_ID") {
            match raw.parse() {
                Ok(id) => self.chain.id = id,
                Err(e) => warn!("Ignoring SDK_CHAIN_ID={}: {}", raw, e),
            }
        }

        if let Some(raw) = var("SDK_BEANSTALK_ADDRESS") {
            self.contracts.beanstalk = raw;
        }

        if let Some(raw) = var("SDK_DEFAULT_SLIPPAGE_PCT") {
            match raw.parse::<f64>() {
                Ok(pct) if pct.is_finite() && pct >= 0.0 => self.workflow.default_slippage_pct = pct,
                _ => warn!("Ignoring SDK_DEFAULT_SLIPPAGE_PCT={}", raw),
            }
        }

        // Optional: full token whitelist as JSON ([{ "symbol", "address", "decimals" }])
        if let Some(raw) = var("SDK_TOKENS") {
            match serde_json::from_str::<Vec<TokenConfig>>(&raw) {
                Ok(tokens) => self.tokens = tokens,
                Err(e) => warn!("Failed to parse SDK_TOKENS as JSON: {}", e),
            }
        }
    }

    pub fn token_registry(&self) -> Result<TokenRegistry, ConversionError> {
        self.tokens
            .iter()
            .map(|t| Ok(Token::new(t.symbol.clone(), string_to_address(&t.address)?, t.decimals)))
            .collect()
    }

    /// Shared context for workflows built from these settings.
    pub fn sdk_context(&self) -> Result<Arc<SdkContext>, ConversionError> {
        let beanstalk = string_to_address(&self.contracts.beanstalk)?;
        Ok(Arc::new(
            SdkContext::new(self.chain.id, beanstalk, self.token_registry()?)
                .with_default_slippage(self.workflow.default_slippage_pct),
        ))
    }
}
