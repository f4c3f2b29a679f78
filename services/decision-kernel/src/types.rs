//! Decision types
//!
//! `Decision` serializes to the wire schema the model is asked to emit: a JSON
//! array of objects with `symbol`, `action`, `reasoning` and, for opening
//! actions, `leverage`, `position_size_usd`, `stop_loss`, `take_profit`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Symbol used by the safe-wait fallback to mean "applies to all"
pub const ALL_SYMBOLS: &str = "ALL";

/// Trade action requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    Hold,
    Wait,
    /// Anything outside the six-member set; rejected by the validator
    Unrecognized(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::OpenLong => "open_long",
            Action::OpenShort => "open_short",
            Action::CloseLong => "close_long",
            Action::CloseShort => "close_short",
            Action::Hold => "hold",
            Action::Wait => "wait",
            Action::Unrecognized(other) => other,
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, Action::OpenLong | Action::OpenShort)
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        match value.as_str() {
            "open_long" => Action::OpenLong,
            "open_short" => Action::OpenShort,
            "close_long" => Action::CloseLong,
            "close_short" => Action::CloseShort,
            "hold" => Action::Hold,
            "wait" => Action::Wait,
            _ => Action::Unrecognized(value),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One trading decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub symbol: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_size_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    /// 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u32>,
    /// Max USD at risk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_usd: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

impl Decision {
    /// Non-opening decision (close, hold or wait)
    pub fn new(symbol: impl Into<String>, action: Action, reasoning: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            action,
            leverage: None,
            position_size_usd: None,
            stop_loss: None,
            take_profit: None,
            confidence: None,
            risk_usd: None,
            reasoning: reasoning.into(),
        }
    }

    /// Opening decision with all required fields
    pub fn open(
        symbol: impl Into<String>,
        action: Action,
        leverage: i64,
        position_size_usd: f64,
        stop_loss: f64,
        take_profit: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            leverage: Some(leverage),
            position_size_usd: Some(position_size_usd),
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            ..Self::new(symbol, action, reasoning)
        }
    }

    pub fn with_confidence(mut self, confidence: u32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_risk_usd(mut self, risk_usd: f64) -> Self {
        self.risk_usd = Some(risk_usd);
        self
    }
}

/// A decision dropped under the keep-valid batch policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// Zero-based index in the extracted batch
    pub index: usize,
    pub symbol: String,
    pub action: String,
    pub reason: String,
}

impl Rejection {
    pub fn new(index: usize, decision: &Decision, error: &ValidationError) -> Self {
        Self {
            index,
            symbol: decision.symbol.clone(),
            action: decision.action.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Complete record of one decision cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullDecision {
    /// Correlation id for logs and journals
    pub cycle_id: Uuid,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Reasoning recovered from the model reply
    pub cot_trace: String,
    pub decisions: Vec<Decision>,
    pub raw_response: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ai_request_duration_ms: u64,
    /// Decisions dropped by validation (keep-valid policy only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<Rejection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip_strings() {
        for name in ["open_long", "open_short", "close_long", "close_short", "hold", "wait"] {
            let action = Action::from(name.to_string());
            assert!(!matches!(action, Action::Unrecognized(_)), "{} should be known", name);
            assert_eq!(action.to_string(), name);
        }
    }

    #[test]
    fn test_unknown_action_is_kept() {
        let action: Action = serde_json::from_str("\"buy_the_dip\"").unwrap();
        assert_eq!(action, Action::Unrecognized("buy_the_dip".to_string()));
        assert_eq!(serde_json::to_string(&action).unwrap(), "\"buy_the_dip\"");
    }

    #[test]
    fn test_opening_actions() {
        assert!(Action::OpenLong.is_opening());
        assert!(Action::OpenShort.is_opening());
        assert!(!Action::CloseLong.is_opening());
        assert!(!Action::Wait.is_opening());
    }

    #[test]
    fn test_close_decision_omits_open_fields() {
        let decision = Decision::new("ETHUSDT", Action::CloseLong, "take profit");
        let json = serde_json::to_string(&decision).unwrap();
        assert_eq!(
            json,
            r#"{"symbol":"ETHUSDT","action":"close_long","reasoning":"take profit"}"#
        );
    }

    #[test]
    fn test_open_decision_wire_fields() {
        let decision = Decision::open("BTCUSDT", Action::OpenShort, 5, 5000.0, 97000.0, 91000.0, "breakdown")
            .with_confidence(85)
            .with_risk_usd(300.0);
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["action"], "open_short");
        assert_eq!(value["leverage"], 5);
        assert_eq!(value["position_size_usd"], 5000.0);
        assert_eq!(value["stop_loss"], 97000.0);
        assert_eq!(value["take_profit"], 91000.0);
        assert_eq!(value["confidence"], 85);
        assert_eq!(value["risk_usd"], 300.0);
    }
}
