//! Error types for the decision pipeline

use crate::types::FullDecision;

/// Failures while recovering decisions from raw model text.
///
/// A missing decision payload is not an error; see [`crate::extract`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Cheap syntactic pre-check rejected the payload
    #[error("decision payload failed sanity check: {reason} (near: {fragment})")]
    Sanity { reason: String, fragment: String },

    /// Payload passed sanity checks but is not a valid decision array
    #[error("decision payload is not valid JSON: {source}")]
    Parse {
        /// Reasoning trace recovered before the failure
        cot_trace: String,
        /// The JSON text that was handed to the parser
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Policy violations raised by the decision validator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("{symbol}: missing required field `{field}`")]
    MissingField { symbol: String, field: &'static str },

    #[error("{symbol}: leverage must be greater than 0: {leverage}")]
    NonPositiveLeverage { symbol: String, leverage: i64 },

    #[error("{symbol}: position size must be greater than 0: {size:.2}")]
    NonPositiveSize { symbol: String, size: f64 },

    #[error("{symbol} opening amount too small ({size:.2} USDT), must be >= {minimum:.2} USDT")]
    PositionTooSmall { symbol: String, size: f64, minimum: f64 },

    #[error(
        "{symbol} position value cannot exceed {cap:.0} USDT ({ratio:.1}x account equity), requested: {requested:.0}"
    )]
    PositionTooLarge {
        symbol: String,
        cap: f64,
        ratio: f64,
        requested: f64,
    },

    #[error("{symbol}: stop loss and take profit must be greater than 0")]
    NonPositivePrice { symbol: String },

    #[error("{symbol}: for long positions, stop loss ({stop_loss}) must be below take profit ({take_profit})")]
    LongPriceOrder {
        symbol: String,
        stop_loss: f64,
        take_profit: f64,
    },

    #[error("{symbol}: for short positions, stop loss ({stop_loss}) must be above take profit ({take_profit})")]
    ShortPriceOrder {
        symbol: String,
        stop_loss: f64,
        take_profit: f64,
    },

    #[error(
        "{symbol}: risk/reward ratio too low ({ratio:.2}:1), must be >= {minimum:.1}:1 [risk: {risk_pct:.2}% reward: {reward_pct:.2}%] [stop loss: {stop_loss:.2} take profit: {take_profit:.2}]"
    )]
    RiskRewardTooLow {
        symbol: String,
        ratio: f64,
        minimum: f64,
        risk_pct: f64,
        reward_pct: f64,
        stop_loss: f64,
        take_profit: f64,
    },

    #[error("{symbol}: confidence must be within 0-100, got {confidence}")]
    ConfidenceOutOfRange { symbol: String, confidence: u32 },

    #[error("{symbol}: price {value} cannot be represented exactly")]
    UnrepresentablePrice { symbol: String, value: f64 },
}

/// Batch-level validation failure under [`crate::config::BatchPolicy::AbortOnFirst`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("decision #{position} validation failed: {source}", position = .index + 1)]
pub struct BatchError {
    /// Zero-based position of the failing decision
    pub index: usize,
    #[source]
    pub source: ValidationError,
}

/// Errors surfaced by a full decision cycle.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("model call failed: {0}")]
    Model(#[source] anyhow::Error),

    /// Extraction failed; `partial` keeps prompts, trace, raw text and timing
    #[error("failed to extract decisions: {source}")]
    Extract {
        partial: Box<FullDecision>,
        #[source]
        source: ExtractError,
    },

    /// Validation aborted the batch; `partial` holds the unvalidated decisions
    #[error("decision validation failed: {source}")]
    Validation {
        partial: Box<FullDecision>,
        #[source]
        source: BatchError,
    },
}

impl PipelineError {
    /// Partial record for failures that happened after the model replied
    pub fn partial(&self) -> Option<&FullDecision> {
        match self {
            PipelineError::Model(_) => None,
            PipelineError::Extract { partial, .. } | PipelineError::Validation { partial, .. } => {
                Some(&**partial)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
