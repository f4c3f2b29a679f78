//! Decision cycle orchestration
//!
//! One cycle: render prompts, call the model once, extract decisions from the
//! reply and validate them against the risk policy.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::KernelConfig;
use crate::context::TradingContext;
use crate::error::{PipelineError, Result};
use crate::extract;
use crate::prompt::PromptBuilder;
use crate::types::FullDecision;
use crate::validate;

/// The language model behind a decision cycle
#[async_trait]
pub trait DecisionModel: Send + Sync {
    /// Send the prompt pair and return the raw reply text
    async fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Runs decision cycles against a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct DecisionPipeline {
    config: KernelConfig,
}

impl DecisionPipeline {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Run one full decision cycle.
    ///
    /// Extraction and validation failures carry the partial [`FullDecision`]
    /// so prompts, raw reply and timing are never lost.
    pub async fn run_cycle(
        &self,
        context: &TradingContext,
        model: &dyn DecisionModel,
    ) -> Result<FullDecision> {
        let cycle_id = Uuid::new_v4();
        let timestamp = Utc::now();

        let prompts = PromptBuilder::new(&self.config.risk, &self.config.prompt).render(context);

        let started = Instant::now();
        let raw_response = match model.complete(&prompts.system, &prompts.user).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Cycle {} model call failed: {}", cycle_id, e);
                return Err(PipelineError::Model(e));
            }
        };
        let ai_request_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut record = FullDecision {
            cycle_id,
            system_prompt: prompts.system,
            user_prompt: prompts.user,
            cot_trace: String::new(),
            decisions: Vec::new(),
            raw_response,
            timestamp,
            ai_request_duration_ms,
            rejections: Vec::new(),
        };

        let extraction = match extract::extract(&record.raw_response) {
            Ok(extraction) => extraction,
            Err(source) => {
                record.cot_trace = extract::extract_cot_trace(&record.raw_response);
                return Err(PipelineError::Extract {
                    partial: Box::new(record),
                    source,
                });
            }
        };
        record.cot_trace = extraction.cot_trace;

        let outcome = match validate::validate_batch(
            &extraction.decisions,
            context.account.total_equity,
            &self.config.risk,
            &self.config.validation,
            Some(context),
        ) {
            Ok(outcome) => outcome,
            Err(source) => {
                record.decisions = extraction.decisions;
                return Err(PipelineError::Validation {
                    partial: Box::new(record),
                    source,
                });
            }
        };

        record.decisions = outcome.decisions;
        record.rejections = outcome.rejections;

        info!(
            "Cycle {} complete: {} decisions, {} rejected, model took {}ms",
            cycle_id,
            record.decisions.len(),
            record.rejections.len(),
            record.ai_request_duration_ms
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchPolicy;
    use crate::context::AccountInfo;
    use crate::error::ValidationError;
    use crate::types::Action;

    struct FixedModel(&'static str);

    #[async_trait]
    impl DecisionModel for FixedModel {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl DecisionModel for FailingModel {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            anyhow::bail!("upstream timeout")
        }
    }

    fn context() -> TradingContext {
        TradingContext {
            current_time: "2026-05-04 10:00:00".to_string(),
            account: AccountInfo::new(1000.0, 900.0, 0.0, 0.0, 0.0, 100.0, 0),
            ..TradingContext::default()
        }
    }

    const GOOD: &str = "<reasoning>trend up</reasoning><decision>```json\n[{\"symbol\":\"SOLUSDT\",\"action\":\"open_long\",\"leverage\":8,\"position_size_usd\":500,\"stop_loss\":100,\"take_profit\":130,\"reasoning\":\"breakout\"}]\n```</decision>";

    #[tokio::test]
    async fn test_cycle_produces_full_decision() {
        let pipeline = DecisionPipeline::default();
        let record = pipeline.run_cycle(&context(), &FixedModel(GOOD)).await.unwrap();

        assert_eq!(record.cot_trace, "trend up");
        assert_eq!(record.decisions.len(), 1);
        assert_eq!(record.decisions[0].action, Action::OpenLong);
        assert_eq!(record.decisions[0].leverage, Some(5));
        assert_eq!(record.raw_response, GOOD);
        assert!(record.system_prompt.contains("1000"));
        assert!(record.user_prompt.contains("2026-05-04 10:00:00"));
        assert!(record.rejections.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let pipeline = DecisionPipeline::default();
        let err = pipeline.run_cycle(&context(), &FailingModel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
        assert!(err.partial().is_none());
        assert_eq!(err.to_string(), "model call failed: upstream timeout");
    }

    #[tokio::test]
    async fn test_extract_failure_keeps_partial() {
        let raw = "<reasoning>hmm</reasoning>[{\"symbol\":\"BTCUSDT\",\"action\":\"open_long\",\"position_size_usd\":1,000,\"reasoning\":\"x\"}]";
        let err = DecisionPipeline::default()
            .run_cycle(&context(), &FixedModel(raw))
            .await
            .unwrap_err();
        let partial = err.partial().unwrap();
        assert_eq!(partial.cot_trace, "hmm");
        assert_eq!(partial.raw_response, raw);
        assert!(partial.decisions.is_empty());
        assert!(!partial.system_prompt.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_keeps_unvalidated_decisions() {
        let raw = "[{\"symbol\":\"SOLUSDT\",\"action\":\"open_long\",\"leverage\":3,\"position_size_usd\":5000,\"stop_loss\":100,\"take_profit\":130,\"reasoning\":\"all in\"}]";
        let err = DecisionPipeline::default()
            .run_cycle(&context(), &FixedModel(raw))
            .await
            .unwrap_err();
        match &err {
            PipelineError::Validation { partial, source } => {
                assert_eq!(partial.decisions.len(), 1);
                assert_eq!(partial.decisions[0].position_size_usd, Some(5000.0));
                assert_eq!(source.index, 0);
                assert!(matches!(source.source, ValidationError::PositionTooLarge { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keep_valid_records_rejections() {
        let mut config = KernelConfig::default();
        config.validation.batch_policy = BatchPolicy::KeepValid;
        let raw = "[{\"symbol\":\"SOLUSDT\",\"action\":\"yolo\",\"reasoning\":\"x\"},{\"symbol\":\"ETHUSDT\",\"action\":\"close_long\",\"reasoning\":\"done\"}]";

        let record = DecisionPipeline::new(config)
            .run_cycle(&context(), &FixedModel(raw))
            .await
            .unwrap();
        assert_eq!(record.decisions.len(), 1);
        assert_eq!(record.decisions[0].symbol, "ETHUSDT");
        assert_eq!(record.rejections.len(), 1);
        assert_eq!(record.rejections[0].action, "yolo");
    }
}
