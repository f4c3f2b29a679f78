//! End-to-end decision cycle harness
//!
//! Validates the full cycle:
//! context → prompts → model (mock) → extraction → validation → FullDecision


use decision_kernel::{
    config::{BatchPolicy, EntryPriceSource, KernelConfig},
    context::TradingContext,
    error::{ExtractError, PipelineError, ValidationError},
    prompt::Language,
    types::{Action, ALL_SYMBOLS},
    DecisionPipeline,
};
use mock_model::MockModel;

/// Context as a caller would hand it over: one ETH long, two candidates
fn load_context() -> TradingContext {
    serde_json::from_str(
        r#"{
            "current_time": "2026-05-04 10:00:00",
            "now_ms": 1777888800000,
            "runtime_minutes": 120,
            "call_count": 24,
            "account": {
                "total_equity": 1000.0,
                "available_balance": 700.0,
                "unrealized_pnl": 12.5,
                "margin_used": 300.0,
                "margin_used_pct": 30.0,
                "position_count": 1
            },
            "positions": [{
                "symbol": "ETHUSDT",
                "side": "long",
                "entry_price": 3000.0,
                "mark_price": 3100.0,
                "quantity": 0.5,
                "leverage": 5,
                "unrealized_pnl_pct": 3.3,
                "peak_pnl_pct": 4.0,
                "update_time_ms": 1777885200000
            }],
            "candidate_coins": [
                {"symbol": "ETHUSDT", "sources": ["ai500"]},
                {"symbol": "SOLUSDT", "sources": ["ai500", "oi_top"]}
            ],
            "market_data": {
                "ETHUSDT": {"symbol": "ETHUSDT", "current_price": 3100.0},
                "SOLUSDT": {"symbol": "SOLUSDT", "current_price": 101.5},
                "BTCUSDT": {"symbol": "BTCUSDT", "current_price": 95000.0}
            }
        }"#,
    )
    .unwrap()
}

const REPLY: &str = "<reasoning>\nSOL breaking out with OI confirmation. ETH stalling below resistance.\n</reasoning>\n<decision>\n```json\n[\n  {\"symbol\": \"SOLUSDT\", \"action\": \"open_long\", \"leverage\": 20, \"position_size_usd\": 800, \"stop_loss\": 100, \"take_profit\": 130, \"confidence\": 82, \"reasoning\": \"breakout\"},\n  {\"symbol\": \"ETHUSDT\", \"action\": \"close_long\", \"reasoning\": \"stalling\"}\n]\n```\n</decision>";

/// Test: a clean reply becomes a validated FullDecision
#[tokio::test]
async fn test_cycle_end_to_end() {
    let model = MockModel::new().with_reply(REPLY);
    let pipeline = DecisionPipeline::new(KernelConfig::default());

    let record = pipeline.run_cycle(&load_context(), &model).await.unwrap();

    assert_eq!(record.cot_trace, "SOL breaking out with OI confirmation. ETH stalling below resistance.");
    assert_eq!(record.decisions.len(), 2);
    assert_eq!(record.decisions[0].action, Action::OpenLong);
    assert_eq!(record.decisions[0].leverage, Some(5));
    assert_eq!(record.decisions[1].action, Action::CloseLong);
    assert_eq!(record.raw_response, REPLY);

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, record.system_prompt);
    assert_eq!(calls[0].user, record.user_prompt);
    assert!(record.user_prompt.contains("## Current Positions"));
    assert!(record.user_prompt.contains("### 1. SOLUSDT"));
    assert!(!record.user_prompt.contains("### 2."));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["decisions"][0]["leverage"], 5);
    assert!(json.get("rejections").is_none());
}

/// Test: market-price entry turns a passing reply into a rejection
#[tokio::test]
async fn test_market_entry_rejects_tight_target() {
    let reply = "[{\"symbol\": \"SOLUSDT\", \"action\": \"open_long\", \"leverage\": 3, \"position_size_usd\": 500, \"stop_loss\": 100, \"take_profit\": 102, \"reasoning\": \"scalp\"}]";

    let interpolated = DecisionPipeline::new(KernelConfig::default())
        .run_cycle(&load_context(), &MockModel::new().with_reply(reply))
        .await
        .unwrap();
    assert_eq!(interpolated.decisions.len(), 1);

    let mut config = KernelConfig::default();
    config.validation.entry_price_source = EntryPriceSource::MarketWhenAvailable;
    let err = DecisionPipeline::new(config)
        .run_cycle(&load_context(), &MockModel::new().with_reply(reply))
        .await
        .unwrap_err();

    match err {
        PipelineError::Validation { partial, source } => {
            assert_eq!(source.index, 0);
            assert!(matches!(source.source, ValidationError::RiskRewardTooLow { .. }));
            assert_eq!(partial.decisions.len(), 1);
            assert_eq!(partial.raw_response, reply);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

/// Test: keep-valid drops the bad decision and records why
#[tokio::test]
async fn test_keep_valid_batch() {
    let reply = "[{\"symbol\": \"SOLUSDT\", \"action\": \"open_long\", \"leverage\": 3, \"position_size_usd\": 5, \"stop_loss\": 100, \"take_profit\": 130, \"reasoning\": \"tiny\"}, {\"symbol\": \"ETHUSDT\", \"action\": \"hold\", \"reasoning\": \"trend intact\"}]";
    let mut config = KernelConfig::default();
    config.validation.batch_policy = BatchPolicy::KeepValid;

    let record = DecisionPipeline::new(config)
        .run_cycle(&load_context(), &MockModel::new().with_reply(reply))
        .await
        .unwrap();

    assert_eq!(record.decisions.len(), 1);
    assert_eq!(record.decisions[0].action, Action::Hold);
    assert_eq!(record.rejections.len(), 1);
    assert_eq!(record.rejections[0].symbol, "SOLUSDT");
    assert_eq!(
        record.rejections[0].reason,
        "SOLUSDT opening amount too small (5.00 USDT), must be >= 12.00 USDT"
    );
}

/// Test: prose-only reply degrades to a safe wait
#[tokio::test]
async fn test_prose_reply_is_safe_wait() {
    let record = DecisionPipeline::default()
        .run_cycle(
            &load_context(),
            &MockModel::new().with_reply("Nothing compelling, staying flat this cycle."),
        )
        .await
        .unwrap();

    assert_eq!(record.decisions.len(), 1);
    assert_eq!(record.decisions[0].symbol, ALL_SYMBOLS);
    assert_eq!(record.decisions[0].action, Action::Wait);
    assert!(record.decisions[0].reasoning.ends_with("Nothing compelling, staying flat this cycle."));
}

/// Test: sanity failure keeps the partial record
#[tokio::test]
async fn test_range_value_fails_extraction() {
    let reply = "<reasoning>wide stop</reasoning>[{\"symbol\": \"SOLUSDT\", \"action\": \"open_long\", \"stop_loss\": 95~97}]";
    let err = DecisionPipeline::default()
        .run_cycle(&load_context(), &MockModel::new().with_reply(reply))
        .await
        .unwrap_err();

    match &err {
        PipelineError::Extract { partial, source } => {
            assert!(matches!(source, ExtractError::Sanity { .. }));
            assert_eq!(partial.cot_trace, "wide stop");
            assert!(partial.decisions.is_empty());
        }
        other => panic!("expected extraction failure, got {:?}", other),
    }
}

/// Test: model errors surface without a partial record
#[tokio::test]
async fn test_model_failure() {
    let model = MockModel::new().with_failure("rate limited");
    let err = DecisionPipeline::default()
        .run_cycle(&load_context(), &model)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Model(_)));
    assert!(err.partial().is_none());
    assert_eq!(model.calls().len(), 1);
}

/// Test: Chinese prompts from config, same decisions
#[tokio::test]
async fn test_chinese_prompts() {
    let mut config = KernelConfig::default();
    config.prompt.language = Language::Chinese;
    let model = MockModel::new().with_reply(REPLY);

    let record = DecisionPipeline::new(config)
        .run_cycle(&load_context(), &model)
        .await
        .unwrap();

    assert!(record.user_prompt.contains("## 当前持仓"));
    assert_eq!(record.decisions.len(), 2);
}
