//! Decision Kernel Library
//!
//! Turns a trading context snapshot into validated trading decisions:
//! prompt rendering, model reply extraction and risk validation.

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod types;
pub mod validate;


// Re-export main types for convenience
pub use config::{BatchPolicy, EntryPriceSource, KernelConfig, RiskPolicy, ValidationSettings};
pub use context::TradingContext;
pub use error::{BatchError, ExtractError, PipelineError, ValidationError};
pub use extract::{extract, Extraction};
pub use pipeline::{DecisionModel, DecisionPipeline};
pub use prompt::{Language, PromptBuilder, PromptVariant, RenderedPrompt};
pub use types::{Action, Decision, FullDecision, Rejection};
pub use validate::{validate, validate_batch, BatchOutcome, RiskReward};
