//! Decision extraction from raw model text
//!
//! Models wrap the decision array in prose, XML-style tags, code fences, smart
//! quotes and full-width punctuation. Extraction normalizes that noise, runs a
//! cheap syntactic sanity check, then parses the array with serde.
//!
//! A reply with no decision array is not an error: it becomes a single
//! safe-wait decision so the caller never acts on a missing answer.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::error::ExtractError;
use crate::types::{Action, Decision, ALL_SYMBOLS};

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(\[\s*\{.*?\}\s*\])\s*```").expect("valid regex"));
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[\s*\{.*?\}\s*\]").expect("valid regex"));
static ARRAY_HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[\s*\{").expect("valid regex"));
static ARRAY_OPEN_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\s+\{").expect("valid regex"));
static INVISIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{200B}\u{200C}\u{200D}\u{FEFF}]").expect("valid regex"));
static REASONING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<reasoning>(.*?)</reasoning>").expect("valid regex"));
static DECISION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<decision>(.*?)</decision>").expect("valid regex"));

/// Smart, full-width and CJK punctuation mapped to ASCII
const PUNCTUATION: [(char, char); 16] = [
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
    ('［', '['),
    ('］', ']'),
    ('｛', '{'),
    ('｝', '}'),
    ('：', ':'),
    ('，', ','),
    ('【', '['),
    ('】', ']'),
    ('〔', '['),
    ('〕', ']'),
    ('、', ','),
    ('\u{3000}', ' '),
];

const FALLBACK_PREFIX: &str =
    "Model didn't output structured JSON decision, entering safe wait; summary: ";
const FALLBACK_SUMMARY_CHARS: usize = 240;

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub cot_trace: String,
    pub decisions: Vec<Decision>,
}

/// Recover the reasoning trace and the decision array from a model reply
pub fn extract(raw: &str) -> Result<Extraction, ExtractError> {
    let cot_trace = extract_cot_trace(raw);
    let decisions = extract_decisions(raw, &cot_trace).map_err(|e| match e {
        ExtractError::Parse { payload, source, .. } => ExtractError::Parse {
            cot_trace: cot_trace.clone(),
            payload,
            source,
        },
        other => other,
    })?;
    Ok(Extraction { cot_trace, decisions })
}

/// Reasoning trace; first match wins:
/// `<reasoning>` body, text before `<decision>`, text before the first `[`,
/// then the whole reply.
pub fn extract_cot_trace(raw: &str) -> String {
    if let Some(body) = REASONING_TAG.captures(raw).and_then(|c| c.get(1)) {
        info!("Extracted reasoning from <reasoning> tag");
        return body.as_str().trim().to_string();
    }

    if let Some(idx) = raw.find("<decision>").filter(|i| *i > 0) {
        info!("Extracted reasoning from text before <decision> tag");
        return raw[..idx].trim().to_string();
    }

    if let Some(idx) = raw.find('[').filter(|i| *i > 0) {
        info!("Extracted reasoning from text before first '['");
        return raw[..idx].trim().to_string();
    }

    raw.trim().to_string()
}

/// Strip zero-width characters and map smart punctuation to ASCII
pub fn normalize(text: &str) -> String {
    let stripped = INVISIBLE.replace_all(text, "");
    stripped
        .chars()
        .map(|c| {
            PUNCTUATION
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

fn compact_array_open(payload: &str) -> String {
    ARRAY_OPEN_SPACE.replace(payload.trim(), "[{").into_owned()
}

fn extract_decisions(raw: &str, cot_trace: &str) -> Result<Vec<Decision>, ExtractError> {
    let normalized = normalize(raw.trim());

    let scoped = match DECISION_TAG.captures(&normalized).and_then(|c| c.get(1)) {
        Some(body) => {
            info!("Extracted decision payload from <decision> tag");
            body.as_str().trim()
        }
        None => {
            info!("<decision> tag not found, searching full reply for JSON");
            normalized.as_str()
        }
    };

    let payload = if let Some(fenced) = JSON_FENCE.captures(scoped).and_then(|c| c.get(1)) {
        info!("Found fenced ```json decision array");
        compact_array_open(fenced.as_str())
    } else {
        match JSON_ARRAY.find(scoped) {
            Some(found) => compact_array_open(found.as_str()),
            None => {
                warn!("Model returned no decision array, entering safe wait");
                return Ok(vec![safe_wait(cot_trace, scoped)]);
            }
        }
    };

    sanity_check(&payload)?;

    serde_json::from_str(&payload).map_err(|source| ExtractError::Parse {
        cot_trace: String::new(),
        payload,
        source,
    })
}

fn safe_wait(cot_trace: &str, scoped: &str) -> Decision {
    let summary_source = if cot_trace.is_empty() { scoped } else { cot_trace };
    let mut summary: String = summary_source.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    if summary_source.chars().count() > FALLBACK_SUMMARY_CHARS {
        summary.push_str("...");
    }
    Decision::new(ALL_SYMBOLS, Action::Wait, format!("{}{}", FALLBACK_PREFIX, summary))
}

fn head(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

/// Cheap syntactic checks before the structural parse
pub fn sanity_check(payload: &str) -> Result<(), ExtractError> {
    let trimmed = payload.trim();

    if !ARRAY_HEAD.is_match(trimmed) {
        if trimmed.starts_with('[') && !head(trimmed, 20).contains('{') {
            return Err(ExtractError::Sanity {
                reason: "not a valid decision array (must contain objects {})".to_string(),
                fragment: head(trimmed, 50),
            });
        }
        return Err(ExtractError::Sanity {
            reason: "JSON must start with [{ (whitespace allowed)".to_string(),
            fragment: head(trimmed, 20),
        });
    }

    if let Some(idx) = payload.find('~') {
        return Err(ExtractError::Sanity {
            reason: "JSON cannot contain range symbol ~, all numbers must be precise single values"
                .to_string(),
            fragment: head(&payload[idx..], 10),
        });
    }

    let bytes = payload.as_bytes();
    let thousands = bytes.windows(5).position(|w| {
        w[0].is_ascii_digit()
            && w[1] == b','
            && w[2].is_ascii_digit()
            && w[3].is_ascii_digit()
            && w[4].is_ascii_digit()
    });
    if let Some(i) = thousands {
        let end = (i + 10).min(bytes.len());
        return Err(ExtractError::Sanity {
            reason: "JSON numbers cannot contain thousand separator comma".to_string(),
            fragment: String::from_utf8_lossy(&bytes[i..end]).into_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FENCED: &str = "<reasoning>\nBTC breaking down, ETH target reached.\n</reasoning>\n\n<decision>\n```json\n[\n  {\"symbol\": \"BTCUSDT\", \"action\": \"open_short\", \"leverage\": 5, \"position_size_usd\": 5000, \"stop_loss\": 97000, \"take_profit\": 91000, \"confidence\": 85, \"reasoning\": \"breakdown\"},\n  {\"symbol\": \"ETHUSDT\", \"action\": \"close_long\", \"reasoning\": \"target hit\"}\n]\n```\n</decision>";

    #[test]
    fn test_fenced_json_inside_decision_tag() {
        let extraction = extract(FENCED).unwrap();
        assert_eq!(extraction.cot_trace, "BTC breaking down, ETH target reached.");
        assert_eq!(extraction.decisions.len(), 2);
        assert_eq!(extraction.decisions[0].action, Action::OpenShort);
        assert_eq!(extraction.decisions[0].leverage, Some(5));
        assert_eq!(extraction.decisions[0].stop_loss, Some(97000.0));
        assert_eq!(extraction.decisions[1].action, Action::CloseLong);
    }

    #[test]
    fn test_smart_punctuation_matches_ascii() {
        let ascii = "[{\"symbol\": \"SOLUSDT\", \"action\": \"hold\", \"reasoning\": \"trend intact\"}]";
        let smart = "［｛\u{201C}symbol\u{201D}： \u{201C}SOLUSDT\u{201D}， \u{201C}action\u{201D}： \u{201C}hold\u{201D}， \u{201C}reasoning\u{201D}： \u{201C}trend intact\u{201D}｝］";
        assert_eq!(extract(ascii).unwrap().decisions, extract(smart).unwrap().decisions);
    }

    #[test]
    fn test_invisible_characters_are_stripped() {
        let raw = "\u{FEFF}[\u{200B}{\"symbol\": \"BTCUSDT\", \"action\": \"wait\", \"reasoning\": \"chop\"}]";
        let extraction = extract(raw).unwrap();
        assert_eq!(extraction.decisions[0].symbol, "BTCUSDT");
        assert_eq!(extraction.decisions[0].action, Action::Wait);
    }

    #[test]
    fn test_bare_array_after_prose() {
        let raw = "Market is ranging, no edge.\n[ {\"symbol\": \"ETHUSDT\", \"action\": \"wait\", \"reasoning\": \"range\"} ]";
        let extraction = extract(raw).unwrap();
        assert_eq!(extraction.cot_trace, "Market is ranging, no edge.");
        assert_eq!(extraction.decisions.len(), 1);
    }

    #[test]
    fn test_missing_array_falls_back_to_safe_wait() {
        let raw = "<reasoning>Nothing worth trading right now.</reasoning>";
        let extraction = extract(raw).unwrap();
        assert_eq!(extraction.decisions.len(), 1);
        let decision = &extraction.decisions[0];
        assert_eq!(decision.symbol, ALL_SYMBOLS);
        assert_eq!(decision.action, Action::Wait);
        assert_eq!(
            decision.reasoning,
            "Model didn't output structured JSON decision, entering safe wait; summary: Nothing worth trading right now."
        );
    }

    #[test]
    fn test_safe_wait_summary_is_truncated() {
        let raw = "é".repeat(300);
        let extraction = extract(&raw).unwrap();
        let reasoning = &extraction.decisions[0].reasoning;
        assert!(reasoning.ends_with("..."));
        let summary = reasoning.trim_start_matches(FALLBACK_PREFIX).trim_end_matches("...");
        assert_eq!(summary.chars().count(), 240);
    }

    #[test]
    fn test_cot_trace_cascade() {
        assert_eq!(extract_cot_trace("  <reasoning> a </reasoning> rest"), "a");
        assert_eq!(extract_cot_trace("think first <decision>[]</decision>"), "think first");
        assert_eq!(extract_cot_trace("before [1]"), "before");
        assert_eq!(extract_cot_trace("[{\"a\":1}]"), "[{\"a\":1}]");
        assert_eq!(extract_cot_trace("  just text  "), "just text");
    }

    #[test]
    fn test_range_symbol_rejected() {
        let raw = "[{\"symbol\": \"BTCUSDT\", \"action\": \"open_long\", \"stop_loss\": 90000~91000}]";
        match extract(raw) {
            Err(ExtractError::Sanity { reason, fragment }) => {
                assert!(reason.contains("range symbol ~"));
                assert!(fragment.starts_with('~'));
            }
            other => panic!("expected sanity error, got {:?}", other),
        }
    }

    #[test]
    fn test_thousands_separator_rejected() {
        let raw = "[{\"symbol\": \"BTCUSDT\", \"action\": \"open_long\", \"stop_loss\": 98,000}]";
        match extract(raw) {
            Err(ExtractError::Sanity { reason, fragment }) => {
                assert!(reason.contains("thousand separator"));
                assert_eq!(fragment, "8,000}]");
            }
            other => panic!("expected sanity error, got {:?}", other),
        }
    }

    #[test]
    fn test_sanity_head_messages() {
        match sanity_check("[1, 2, 3]") {
            Err(ExtractError::Sanity { reason, .. }) => {
                assert!(reason.starts_with("not a valid decision array"))
            }
            other => panic!("unexpected {:?}", other),
        }
        match sanity_check("{\"symbol\": \"BTCUSDT\"}") {
            Err(ExtractError::Sanity { reason, fragment }) => {
                assert!(reason.starts_with("JSON must start with [{"));
                assert_eq!(fragment, "{\"symbol\": \"BTCUSDT\"");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(sanity_check("[ \n {\"a\": 1}]").is_ok());
    }

    #[test]
    fn test_parse_error_keeps_trace() {
        let raw = "<reasoning>looks good</reasoning><decision>[{\"symbol\": \"BTCUSDT\", \"action\": 5}]</decision>";
        match extract(raw) {
            Err(ExtractError::Parse { cot_trace, payload, .. }) => {
                assert_eq!(cot_trace, "looks good");
                assert!(payload.starts_with("[{"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_action_survives_extraction() {
        let raw = "[{\"symbol\": \"BTCUSDT\", \"action\": \"buy\", \"reasoning\": \"x\"}]";
        let extraction = extract(raw).unwrap();
        assert_eq!(extraction.decisions[0].action, Action::Unrecognized("buy".to_string()));
    }
}
