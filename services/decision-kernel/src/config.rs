//! Kernel Configuration
//!
//! Risk policy, prompt settings and validation settings. Values are layered:
//! built-in defaults, then an optional config file, then `KERNEL__*`
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prompt::{Language, PromptVariant};

/// Environment variable prefix for overrides, e.g. `KERNEL__RISK__MAX_POSITIONS=5`
pub const ENV_PREFIX: &str = "KERNEL";

/// Top-level configuration consumed read-only by the pipeline
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct KernelConfig {
    #[serde(default)]
    pub risk: RiskPolicy,
    #[serde(default)]
    pub prompt: PromptSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
}

impl KernelConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to read kernel config: {}", e))?;

        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid kernel config: {}", e))
    }
}

/// Risk limits. CODE ENFORCED values are checked by the validator; AI GUIDED
/// values only appear in the system prompt.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RiskPolicy {
    /// Max number of coins held simultaneously (CODE ENFORCED)
    #[serde(default = "default_max_positions")]
    pub max_positions: u32,
    /// Leverage cap for major symbols (AI GUIDED, clamped by validator)
    #[serde(default = "default_major_max_leverage")]
    pub major_max_leverage: u32,
    /// Leverage cap for everything else
    #[serde(default = "default_altcoin_max_leverage")]
    pub altcoin_max_leverage: u32,
    /// Single position max value = equity x ratio, majors (CODE ENFORCED)
    #[serde(default = "default_major_max_position_value_ratio")]
    pub major_max_position_value_ratio: f64,
    /// Single position max value = equity x ratio, altcoins (CODE ENFORCED)
    #[serde(default = "default_altcoin_max_position_value_ratio")]
    pub altcoin_max_position_value_ratio: f64,
    /// Max margin utilization as a fraction (0.9 = 90%)
    #[serde(default = "default_max_margin_usage")]
    pub max_margin_usage: f64,
    /// Min position size in USDT for altcoins
    #[serde(default = "default_min_position_size")]
    pub min_position_size: f64,
    /// Min position size in USDT for majors
    #[serde(default = "default_major_min_position_size")]
    pub major_min_position_size: f64,
    /// Min reward/risk ratio (CODE ENFORCED)
    #[serde(default = "default_min_risk_reward_ratio")]
    pub min_risk_reward_ratio: f64,
    /// Min confidence to open (AI GUIDED)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u32,
    /// Symbols treated as majors
    #[serde(default = "default_major_symbols")]
    pub major_symbols: Vec<String>,
    /// Allowed overshoot of the position value cap (0.01 = 1%)
    #[serde(default = "default_position_value_tolerance")]
    pub position_value_tolerance: f64,
    /// Fraction of the stop-to-target distance used for the assumed entry
    #[serde(default = "default_entry_interpolation")]
    pub entry_interpolation: f64,
}

impl RiskPolicy {
    pub fn is_major(&self, symbol: &str) -> bool {
        self.major_symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Effective major position value ratio (unset or non-positive falls back to 5x)
    pub fn major_position_value_ratio(&self) -> f64 {
        positive_or(self.major_max_position_value_ratio, 5.0)
    }

    /// Effective altcoin position value ratio (unset or non-positive falls back to 1x)
    pub fn altcoin_position_value_ratio(&self) -> f64 {
        positive_or(self.altcoin_max_position_value_ratio, 1.0)
    }

    /// Limits that apply to `symbol`
    pub fn limits_for(&self, symbol: &str) -> AssetLimits {
        if self.is_major(symbol) {
            AssetLimits {
                class: AssetClass::Major,
                max_leverage: self.major_max_leverage,
                position_value_ratio: self.major_position_value_ratio(),
                min_position_size: self.major_min_position_size,
            }
        } else {
            AssetLimits {
                class: AssetClass::Altcoin,
                max_leverage: self.altcoin_max_leverage,
                position_value_ratio: self.altcoin_position_value_ratio(),
                min_position_size: self.min_position_size,
            }
        }
    }
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            max_positions: default_max_positions(),
            major_max_leverage: default_major_max_leverage(),
            altcoin_max_leverage: default_altcoin_max_leverage(),
            major_max_position_value_ratio: default_major_max_position_value_ratio(),
            altcoin_max_position_value_ratio: default_altcoin_max_position_value_ratio(),
            max_margin_usage: default_max_margin_usage(),
            min_position_size: default_min_position_size(),
            major_min_position_size: default_major_min_position_size(),
            min_risk_reward_ratio: default_min_risk_reward_ratio(),
            min_confidence: default_min_confidence(),
            major_symbols: default_major_symbols(),
            position_value_tolerance: default_position_value_tolerance(),
            entry_interpolation: default_entry_interpolation(),
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        fallback
    }
}

fn default_max_positions() -> u32 { 3 }
fn default_major_max_leverage() -> u32 { 5 }
fn default_altcoin_max_leverage() -> u32 { 5 }
fn default_major_max_position_value_ratio() -> f64 { 5.0 }
fn default_altcoin_max_position_value_ratio() -> f64 { 1.0 }
fn default_max_margin_usage() -> f64 { 0.9 }
fn default_min_position_size() -> f64 { 12.0 }
fn default_major_min_position_size() -> f64 { 60.0 }
fn default_min_risk_reward_ratio() -> f64 { 3.0 }
fn default_min_confidence() -> u32 { 75 }
fn default_major_symbols() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}
fn default_position_value_tolerance() -> f64 { 0.01 }
fn default_entry_interpolation() -> f64 { 0.2 }

/// Asset class used to pick per-symbol limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Major,
    Altcoin,
}

impl AssetClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            AssetClass::Major => "BTC/ETH",
            AssetClass::Altcoin => "altcoin",
        }
    }
}

/// Resolved limits for one symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetLimits {
    pub class: AssetClass,
    pub max_leverage: u32,
    pub position_value_ratio: f64,
    pub min_position_size: f64,
}

/// How the validator treats a batch with failing decisions
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// First failure rejects the whole batch
    #[default]
    AbortOnFirst,
    /// Drop failing decisions, keep the rest
    KeepValid,
}

/// Where the validator gets the entry price for risk/reward
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryPriceSource {
    /// Interpolate between stop loss and take profit
    #[default]
    Interpolated,
    /// Use the context's current price for the symbol, interpolate otherwise
    MarketWhenAvailable,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationSettings {
    #[serde(default)]
    pub batch_policy: BatchPolicy,
    #[serde(default)]
    pub entry_price_source: EntryPriceSource,
}

/// Prompt rendering settings
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PromptSettings {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub variant: PromptVariant,
    /// Extra strategy text appended to the system prompt
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub sections: PromptSections,
    #[serde(default)]
    pub indicators: IndicatorSelection,
}

/// Editable system prompt sections; `None` renders the built-in text
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PromptSections {
    #[serde(default)]
    pub role_definition: Option<String>,
    #[serde(default)]
    pub trading_frequency: Option<String>,
    #[serde(default)]
    pub entry_standards: Option<String>,
    #[serde(default)]
    pub decision_process: Option<String>,
}

/// Which market fields the caller computed and wants rendered
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IndicatorSelection {
    #[serde(default = "default_primary_timeframe")]
    pub primary_timeframe: String,
    #[serde(default)]
    pub longer_timeframe: Option<String>,
    #[serde(default = "default_true")]
    pub ema: bool,
    #[serde(default)]
    pub ema_periods: Vec<u32>,
    #[serde(default = "default_true")]
    pub macd: bool,
    #[serde(default = "default_true")]
    pub rsi: bool,
    #[serde(default)]
    pub rsi_periods: Vec<u32>,
    #[serde(default = "default_true")]
    pub atr: bool,
    #[serde(default)]
    pub atr_periods: Vec<u32>,
    #[serde(default)]
    pub boll: bool,
    #[serde(default = "default_true")]
    pub volume: bool,
    #[serde(default = "default_true")]
    pub open_interest: bool,
    #[serde(default = "default_true")]
    pub funding_rate: bool,
    #[serde(default = "default_true")]
    pub quant_oi: bool,
    #[serde(default = "default_true")]
    pub quant_netflow: bool,
    /// Mention coin-pool tags in the system prompt
    #[serde(default = "default_true")]
    pub coin_source_tags: bool,
}

impl Default for IndicatorSelection {
    fn default() -> Self {
        Self {
            primary_timeframe: default_primary_timeframe(),
            longer_timeframe: Some("4h".to_string()),
            ema: true,
            ema_periods: vec![20, 50],
            macd: true,
            rsi: true,
            rsi_periods: vec![7, 14],
            atr: true,
            atr_periods: vec![14],
            boll: false,
            volume: true,
            open_interest: true,
            funding_rate: true,
            quant_oi: true,
            quant_netflow: true,
            coin_source_tags: true,
        }
    }
}

impl IndicatorSelection {
    pub fn quant_enabled(&self) -> bool {
        self.quant_oi || self.quant_netflow
    }
}

fn default_primary_timeframe() -> String { "5m".to_string() }
fn default_true() -> bool { true }
