//! Prompt construction
//!
//! Renders a [`TradingContext`] into the system and user prompts sent to the
//! model. Rendering is pure: the same context and settings always produce the
//! same text, and no wall clock is read.

mod lang;
pub mod market;
mod system;
mod user;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PromptSettings, RiskPolicy};
use crate::context::TradingContext;

pub use lang::Language;

/// Trading style section added to the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    #[default]
    Balanced,
    Aggressive,
    Conservative,
    Scalping,
}

impl PromptVariant {
    /// Lenient parse: trimmed, case-insensitive, unknown names fall back to balanced
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "aggressive" => PromptVariant::Aggressive,
            "conservative" => PromptVariant::Conservative,
            "scalping" => PromptVariant::Scalping,
            _ => PromptVariant::Balanced,
        }
    }
}

impl std::str::FromStr for PromptVariant {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PromptVariant::parse(s))
    }
}

/// Rendered prompt pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts from a fixed policy and prompt settings
pub struct PromptBuilder<'a> {
    policy: &'a RiskPolicy,
    settings: &'a PromptSettings,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(policy: &'a RiskPolicy, settings: &'a PromptSettings) -> Self {
        Self { policy, settings }
    }

    /// System prompt for the given account equity
    pub fn system_prompt(&self, equity: f64) -> String {
        system::build_system_prompt(equity, self.policy, self.settings)
    }

    pub fn user_prompt(&self, context: &TradingContext) -> String {
        user::build_user_prompt(
            context,
            &self.settings.indicators,
            self.settings.language.labels(),
        )
    }

    pub fn render(&self, context: &TradingContext) -> RenderedPrompt {
        let rendered = RenderedPrompt {
            system: self.system_prompt(context.account.total_equity),
            user: self.user_prompt(context),
        };
        debug!(
            "Rendered {} prompts: system {} chars, user {} chars",
            self.settings.language.code(),
            rendered.system.chars().count(),
            rendered.user.chars().count()
        );
        rendered
    }
}

/// Render with default prompt settings for `language` and `variant`
pub fn render(
    context: &TradingContext,
    policy: &RiskPolicy,
    language: Language,
    variant: PromptVariant,
) -> RenderedPrompt {
    let settings = PromptSettings {
        language,
        variant,
        ..PromptSettings::default()
    };
    PromptBuilder::new(policy, &settings).render(context)
}
