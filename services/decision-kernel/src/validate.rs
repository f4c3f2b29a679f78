//! Decision validation against the risk policy
//!
//! Validation returns a normalized copy of the decision. The only correction
//! applied is the leverage clamp; every other violation rejects the decision
//! with an error carrying the computed numbers.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::{BatchPolicy, EntryPriceSource, RiskPolicy, ValidationSettings};
use crate::context::TradingContext;
use crate::error::{BatchError, ValidationError};
use crate::types::{Action, Decision, Rejection};

const MAX_CONFIDENCE: u32 = 100;

/// Risk/reward figures for an opening decision, percentages relative to entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskReward {
    pub entry: f64,
    pub risk_pct: f64,
    pub reward_pct: f64,
    /// reward / risk, 0 when the entry is already past the stop
    pub ratio: f64,
}

impl RiskReward {
    /// Compute risk/reward for a long or short.
    ///
    /// Without a reference price the entry is interpolated from the stop
    /// towards the target by `interpolation` of the distance.
    pub fn compute(
        symbol: &str,
        is_long: bool,
        stop_loss: f64,
        take_profit: f64,
        interpolation: f64,
        reference_price: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let sl = to_decimal(symbol, stop_loss)?;
        let tp = to_decimal(symbol, take_profit)?;

        let entry = match reference_price {
            Some(price) => to_decimal(symbol, price)?,
            None => {
                let k = to_decimal(symbol, interpolation)?;
                let distance = if is_long { tp.checked_sub(sl) } else { sl.checked_sub(tp) };
                let distance = checked(symbol, take_profit, distance)?;
                let offset = checked(symbol, stop_loss, distance.checked_mul(k))?;
                let entry = if is_long { sl.checked_add(offset) } else { sl.checked_sub(offset) };
                checked(symbol, stop_loss, entry)?
            }
        };

        let (risk, reward) = if is_long {
            (entry.checked_sub(sl), tp.checked_sub(entry))
        } else {
            (sl.checked_sub(entry), entry.checked_sub(tp))
        };
        let risk = checked(symbol, stop_loss, risk)?;
        let reward = checked(symbol, take_profit, reward)?;

        if entry <= Decimal::ZERO {
            return Err(ValidationError::UnrepresentablePrice {
                symbol: symbol.to_string(),
                value: entry.to_f64().unwrap_or(f64::NAN),
            });
        }

        let hundred = Decimal::ONE_HUNDRED;
        let risk_pct = checked(
            symbol,
            stop_loss,
            risk.checked_div(entry).and_then(|v| v.checked_mul(hundred)),
        )?;
        let reward_pct = checked(
            symbol,
            take_profit,
            reward.checked_div(entry).and_then(|v| v.checked_mul(hundred)),
        )?;
        let ratio = if risk > Decimal::ZERO {
            checked(symbol, take_profit, reward.checked_div(risk))?
        } else {
            Decimal::ZERO
        };

        Ok(Self {
            entry: entry.to_f64().unwrap_or(f64::NAN),
            risk_pct: risk_pct.to_f64().unwrap_or(f64::NAN),
            reward_pct: reward_pct.to_f64().unwrap_or(f64::NAN),
            ratio: ratio.to_f64().unwrap_or(0.0),
        })
    }
}

fn to_decimal(symbol: &str, value: f64) -> Result<Decimal, ValidationError> {
    Decimal::from_f64(value).ok_or_else(|| ValidationError::UnrepresentablePrice {
        symbol: symbol.to_string(),
        value,
    })
}

fn checked(symbol: &str, value: f64, result: Option<Decimal>) -> Result<Decimal, ValidationError> {
    result.ok_or_else(|| ValidationError::UnrepresentablePrice {
        symbol: symbol.to_string(),
        value,
    })
}

fn required<T: Copy>(decision: &Decision, value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField {
        symbol: decision.symbol.clone(),
        field,
    })
}

/// Validate one decision with an interpolated entry
pub fn validate(decision: &Decision, equity: f64, policy: &RiskPolicy) -> Result<Decision, ValidationError> {
    validate_with_reference(decision, equity, policy, None)
}

/// Validate one decision, using `reference_price` as the entry when given
pub fn validate_with_reference(
    decision: &Decision,
    equity: f64,
    policy: &RiskPolicy,
    reference_price: Option<f64>,
) -> Result<Decision, ValidationError> {
    if let Action::Unrecognized(action) = &decision.action {
        return Err(ValidationError::InvalidAction(action.clone()));
    }
    if decision.symbol.trim().is_empty() {
        return Err(ValidationError::MissingField {
            symbol: String::new(),
            field: "symbol",
        });
    }
    if decision.reasoning.trim().is_empty() {
        return Err(ValidationError::MissingField {
            symbol: decision.symbol.clone(),
            field: "reasoning",
        });
    }
    if let Some(confidence) = decision.confidence.filter(|c| *c > MAX_CONFIDENCE) {
        return Err(ValidationError::ConfidenceOutOfRange {
            symbol: decision.symbol.clone(),
            confidence,
        });
    }

    if !decision.action.is_opening() {
        return Ok(decision.clone());
    }

    let symbol = decision.symbol.as_str();
    let limits = policy.limits_for(symbol);
    let mut normalized = decision.clone();

    let leverage = required(decision, decision.leverage, "leverage")?;
    if leverage <= 0 {
        return Err(ValidationError::NonPositiveLeverage {
            symbol: symbol.to_string(),
            leverage,
        });
    }
    let max_leverage = i64::from(limits.max_leverage);
    if leverage > max_leverage {
        warn!(
            "{} leverage exceeded ({}x > {}x), clamping to {} limit {}x",
            symbol,
            leverage,
            max_leverage,
            limits.class.display_name(),
            max_leverage
        );
        normalized.leverage = Some(max_leverage);
    }

    let size = required(decision, decision.position_size_usd, "position_size_usd")?;
    if size <= 0.0 {
        return Err(ValidationError::NonPositiveSize {
            symbol: symbol.to_string(),
            size,
        });
    }
    if size < limits.min_position_size {
        return Err(ValidationError::PositionTooSmall {
            symbol: symbol.to_string(),
            size,
            minimum: limits.min_position_size,
        });
    }
    let cap = equity * limits.position_value_ratio;
    if size > cap + cap * policy.position_value_tolerance {
        return Err(ValidationError::PositionTooLarge {
            symbol: symbol.to_string(),
            cap,
            ratio: limits.position_value_ratio,
            requested: size,
        });
    }

    let stop_loss = required(decision, decision.stop_loss, "stop_loss")?;
    let take_profit = required(decision, decision.take_profit, "take_profit")?;
    if stop_loss <= 0.0 || take_profit <= 0.0 {
        return Err(ValidationError::NonPositivePrice {
            symbol: symbol.to_string(),
        });
    }

    let is_long = decision.action == Action::OpenLong;
    if is_long && stop_loss >= take_profit {
        return Err(ValidationError::LongPriceOrder {
            symbol: symbol.to_string(),
            stop_loss,
            take_profit,
        });
    }
    if !is_long && stop_loss <= take_profit {
        return Err(ValidationError::ShortPriceOrder {
            symbol: symbol.to_string(),
            stop_loss,
            take_profit,
        });
    }

    let rr = RiskReward::compute(
        symbol,
        is_long,
        stop_loss,
        take_profit,
        policy.entry_interpolation,
        reference_price,
    )?;
    if rr.ratio < policy.min_risk_reward_ratio {
        return Err(ValidationError::RiskRewardTooLow {
            symbol: symbol.to_string(),
            ratio: rr.ratio,
            minimum: policy.min_risk_reward_ratio,
            risk_pct: rr.risk_pct,
            reward_pct: rr.reward_pct,
            stop_loss,
            take_profit,
        });
    }

    Ok(normalized)
}

/// Validated batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub decisions: Vec<Decision>,
    /// Dropped decisions, only populated under [`BatchPolicy::KeepValid`]
    pub rejections: Vec<Rejection>,
}

/// Validate every decision in order.
///
/// `context` supplies reference prices when `settings.entry_price_source` is
/// [`EntryPriceSource::MarketWhenAvailable`].
pub fn validate_batch(
    decisions: &[Decision],
    equity: f64,
    policy: &RiskPolicy,
    settings: &ValidationSettings,
    context: Option<&TradingContext>,
) -> Result<BatchOutcome, BatchError> {
    let mut outcome = BatchOutcome::default();

    for (index, decision) in decisions.iter().enumerate() {
        let reference_price = match settings.entry_price_source {
            EntryPriceSource::Interpolated => None,
            EntryPriceSource::MarketWhenAvailable => {
                context.and_then(|ctx| ctx.current_price(&decision.symbol))
            }
        };

        match validate_with_reference(decision, equity, policy, reference_price) {
            Ok(valid) => outcome.decisions.push(valid),
            Err(source) => match settings.batch_policy {
                BatchPolicy::AbortOnFirst => return Err(BatchError { index, source }),
                BatchPolicy::KeepValid => {
                    warn!("Dropping decision #{} ({}): {}", index + 1, decision.symbol, source);
                    outcome.rejections.push(Rejection::new(index, decision, &source));
                }
            },
        }
    }

    info!(
        "Validated {} decisions ({} kept, {} rejected)",
        decisions.len(),
        outcome.decisions.len(),
        outcome.rejections.len()
    );
    Ok(outcome)
}
