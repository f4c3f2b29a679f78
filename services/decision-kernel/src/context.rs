//! Trading context snapshot
//!
//! Point-in-time account and market state rendered into prompts. The caller
//! assembles it; the pipeline only reads it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Complete input for one decision cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingContext {
    /// Caller-formatted wall time shown in the prompt header
    pub current_time: String,
    /// Cycle clock in unix milliseconds, used for holding durations
    #[serde(default)]
    pub now_ms: i64,
    #[serde(default)]
    pub runtime_minutes: u64,
    /// Decision cycle counter
    #[serde(default)]
    pub call_count: u64,
    pub account: AccountInfo,
    #[serde(default)]
    pub positions: Vec<PositionInfo>,
    #[serde(default)]
    pub candidate_coins: Vec<CandidateCoin>,
    #[serde(default)]
    pub trading_stats: Option<TradingStats>,
    #[serde(default)]
    pub recent_orders: Vec<RecentOrder>,
    /// Market snapshot per symbol
    #[serde(default)]
    pub market_data: BTreeMap<String, MarketSnapshot>,
    /// Fund flow / OI quant data per symbol
    #[serde(default)]
    pub quant_data: BTreeMap<String, QuantData>,
    /// OI growth ranking per candidate symbol
    #[serde(default)]
    pub oi_top: BTreeMap<String, OiTopEntry>,
    #[serde(default)]
    pub oi_ranking: Option<OiRanking>,
    #[serde(default)]
    pub netflow_ranking: Option<NetFlowRanking>,
    #[serde(default)]
    pub price_ranking: Option<PriceRanking>,
}

impl TradingContext {
    /// Current price for `symbol`, if the caller supplied market data for it
    pub fn current_price(&self, symbol: &str) -> Option<f64> {
        self.market_data
            .get(symbol)
            .map(|m| m.current_price)
            .filter(|p| *p > 0.0)
    }

    /// Whether `symbol` is already held (ETH and ETHUSDT are the same coin)
    pub fn holds(&self, symbol: &str) -> bool {
        let wanted = normalize_symbol(symbol);
        self.positions
            .iter()
            .any(|p| normalize_symbol(&p.symbol) == wanted)
    }
}

/// Upper-case a symbol and append the USDT quote if missing
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with("USDT") {
        upper
    } else {
        format!("{}USDT", upper)
    }
}

/// Account summary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    /// Available balance + unrealized PnL
    pub total_equity: f64,
    pub available_balance: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub total_pnl_pct: f64,
    #[serde(default)]
    pub margin_used: f64,
    /// margin_used / total_equity x 100
    #[serde(default)]
    pub margin_used_pct: f64,
    #[serde(default)]
    pub position_count: usize,
}

impl AccountInfo {
    /// Build an account snapshot, deriving margin usage % from equity
    pub fn new(
        total_equity: f64,
        available_balance: f64,
        unrealized_pnl: f64,
        total_pnl: f64,
        total_pnl_pct: f64,
        margin_used: f64,
        position_count: usize,
    ) -> Self {
        let margin_used_pct = if total_equity > 0.0 {
            margin_used / total_equity * 100.0
        } else {
            0.0
        };

        Self {
            total_equity,
            available_balance,
            unrealized_pnl,
            total_pnl,
            total_pnl_pct,
            margin_used,
            margin_used_pct,
            position_count,
        }
    }

    /// Available balance as % of equity (0 when equity is not positive)
    pub fn available_ratio_pct(&self) -> f64 {
        if self.total_equity > 0.0 {
            self.available_balance / self.total_equity * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Open position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionInfo {
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: f64,
    pub mark_price: f64,
    pub quantity: f64,
    pub leverage: u32,
    #[serde(default)]
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub unrealized_pnl_pct: f64,
    /// Highest unrealized PnL % since open
    #[serde(default)]
    pub peak_pnl_pct: f64,
    /// 0 means no liquidation risk
    #[serde(default)]
    pub liquidation_price: f64,
    #[serde(default)]
    pub margin_used: f64,
    /// Unix milliseconds of the last position update, 0 if unknown
    #[serde(default)]
    pub update_time_ms: i64,
}

impl PositionInfo {
    /// Current PnL % minus peak PnL %
    pub fn drawdown_pct(&self) -> f64 {
        self.unrealized_pnl_pct - self.peak_pnl_pct
    }

    pub fn position_value(&self) -> f64 {
        (self.quantity * self.mark_price).abs()
    }

    /// Minutes since the last update, measured against the cycle clock
    pub fn holding_minutes(&self, now_ms: i64) -> Option<i64> {
        if self.update_time_ms <= 0 || now_ms < self.update_time_ms {
            return None;
        }
        Some((now_ms - self.update_time_ms) / 60_000)
    }
}

/// Where a candidate coin came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSource {
    /// Manually configured watchlist
    Static,
    /// Rank-based coin pool
    Ai500,
    /// Open-interest growth ranking
    OiTop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateCoin {
    pub symbol: String,
    #[serde(default)]
    pub sources: BTreeSet<CoinSource>,
}

impl CandidateCoin {
    pub fn new(symbol: impl Into<String>, sources: impl IntoIterator<Item = CoinSource>) -> Self {
        Self {
            symbol: symbol.into(),
            sources: sources.into_iter().collect(),
        }
    }

    /// Included by more than one source
    pub fn is_dual_signal(&self) -> bool {
        self.sources.len() > 1
    }
}

/// Closed-trade statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradingStats {
    pub total_trades: u32,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub profit_factor: f64,
    #[serde(default)]
    pub sharpe_ratio: f64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub avg_win: f64,
    #[serde(default)]
    pub avg_loss: f64,
    #[serde(default)]
    pub max_drawdown_pct: f64,
}

impl TradingStats {
    /// Average win / average loss, 0 when there are no losses
    pub fn win_loss_ratio(&self) -> f64 {
        if self.avg_loss > 0.0 {
            self.avg_win / self.avg_loss
        } else {
            0.0
        }
    }
}

/// Recently closed trade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentOrder {
    pub symbol: String,
    pub side: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub realized_pnl: f64,
    pub pnl_pct: f64,
    pub entry_time: String,
    pub exit_time: String,
    /// e.g. "2h30m"
    pub hold_duration: String,
}

/// Per-symbol market snapshot with precomputed indicators
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub current_price: f64,
    #[serde(default)]
    pub price_change_1h: f64,
    #[serde(default)]
    pub price_change_4h: f64,
    #[serde(default)]
    pub current_ema20: f64,
    #[serde(default)]
    pub current_macd: f64,
    #[serde(default)]
    pub current_rsi7: f64,
    #[serde(default)]
    pub open_interest: Option<OpenInterest>,
    #[serde(default)]
    pub funding_rate: f64,
    /// Series keyed by timeframe ("5m", "1h", ...)
    #[serde(default)]
    pub timeframes: BTreeMap<String, TimeframeSeries>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OpenInterest {
    pub latest: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Kline {
    /// Open time, unix milliseconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Series for one timeframe, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeframeSeries {
    #[serde(default)]
    pub klines: Vec<Kline>,
    #[serde(default)]
    pub ema20: Vec<f64>,
    #[serde(default)]
    pub ema50: Vec<f64>,
    #[serde(default)]
    pub macd: Vec<f64>,
    #[serde(default)]
    pub rsi7: Vec<f64>,
    #[serde(default)]
    pub rsi14: Vec<f64>,
    #[serde(default)]
    pub atr14: f64,
    #[serde(default)]
    pub boll_upper: Vec<f64>,
    #[serde(default)]
    pub boll_middle: Vec<f64>,
    #[serde(default)]
    pub boll_lower: Vec<f64>,
}

/// Fund flow, OI and price change data for one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuantData {
    pub symbol: String,
    #[serde(default)]
    pub price: f64,
    /// Fractional change per window (0.0123 = 1.23%)
    #[serde(default)]
    pub price_change: BTreeMap<String, f64>,
    #[serde(default)]
    pub netflow: Option<Netflow>,
    /// Per-exchange open interest
    #[serde(default)]
    pub open_interest: BTreeMap<String, ExchangeOpenInterest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Netflow {
    #[serde(default)]
    pub institution: Option<FlowByMarket>,
    #[serde(default)]
    pub personal: Option<FlowByMarket>,
}

/// USDT flow per window, split by market type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowByMarket {
    #[serde(default)]
    pub future: BTreeMap<String, f64>,
    #[serde(default)]
    pub spot: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExchangeOpenInterest {
    #[serde(default)]
    pub current_oi: f64,
    #[serde(default)]
    pub delta: BTreeMap<String, OiDelta>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OiDelta {
    #[serde(default)]
    pub oi_delta: f64,
    /// USDT value of the change
    #[serde(default)]
    pub oi_delta_value: f64,
    /// Already x100 (5.0 = 5%)
    #[serde(default)]
    pub oi_delta_percent: f64,
}

/// Where a candidate sits in the OI growth ranking
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OiTopEntry {
    pub rank: u32,
    /// Already x100
    #[serde(default)]
    pub oi_delta_percent: f64,
    /// USDT value of the change
    #[serde(default)]
    pub oi_delta_value: f64,
    /// Already x100
    #[serde(default)]
    pub price_delta_percent: f64,
}

impl OiTopEntry {
    pub fn oi_rising(&self) -> bool {
        self.oi_delta_percent >= 0.0
    }

    pub fn price_rising(&self) -> bool {
        self.price_delta_percent >= 0.0
    }
}

/// Market-wide open interest change ranking
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OiRanking {
    pub duration: String,
    #[serde(default)]
    pub top: Vec<OiRankEntry>,
    #[serde(default)]
    pub low: Vec<OiRankEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OiRankEntry {
    pub rank: u32,
    pub symbol: String,
    #[serde(default)]
    pub oi_delta_value: f64,
    /// Already x100
    #[serde(default)]
    pub oi_delta_percent: f64,
    /// Already x100
    #[serde(default)]
    pub price_delta_percent: f64,
}

/// Market-wide fund flow ranking
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetFlowRanking {
    pub duration: String,
    #[serde(default)]
    pub institution_inflow: Vec<FlowRankEntry>,
    #[serde(default)]
    pub institution_outflow: Vec<FlowRankEntry>,
    #[serde(default)]
    pub retail_inflow: Vec<FlowRankEntry>,
    #[serde(default)]
    pub retail_outflow: Vec<FlowRankEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowRankEntry {
    pub rank: u32,
    pub symbol: String,
    /// USDT, positive = inflow
    pub amount: f64,
    #[serde(default)]
    pub price: f64,
}

/// Gainers and losers per window
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceRanking {
    /// Keyed by window ("1h", "4h", "24h")
    #[serde(default)]
    pub windows: BTreeMap<String, PriceRankWindow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceRankWindow {
    #[serde(default)]
    pub gainers: Vec<PriceRankEntry>,
    #[serde(default)]
    pub losers: Vec<PriceRankEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceRankEntry {
    pub symbol: String,
    /// Fractional (0.0723 = 7.23%)
    pub price_delta: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub future_flow: f64,
    #[serde(default)]
    pub oi_delta_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(symbol: &str) -> PositionInfo {
        PositionInfo {
            symbol: symbol.to_string(),
            side: PositionSide::Long,
            entry_price: 100.0,
            mark_price: 104.0,
            quantity: -2.0,
            leverage: 3,
            unrealized_pnl: 8.0,
            unrealized_pnl_pct: 3.5,
            peak_pnl_pct: 5.0,
            liquidation_price: 0.0,
            margin_used: 66.0,
            update_time_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_account_margin_pct_derived() {
        let account = AccountInfo::new(2000.0, 1500.0, 10.0, 50.0, 2.5, 500.0, 1);
        assert_eq!(account.margin_used_pct, 25.0);
        assert_eq!(account.available_ratio_pct(), 75.0);
    }

    #[test]
    fn test_account_zero_equity() {
        let account = AccountInfo::new(0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0);
        assert_eq!(account.margin_used_pct, 0.0);
        assert_eq!(account.available_ratio_pct(), 0.0);
    }

    #[test]
    fn test_position_helpers() {
        let pos = position("SOLUSDT");
        assert_eq!(pos.drawdown_pct(), -1.5);
        assert_eq!(pos.position_value(), 208.0);
        assert_eq!(pos.holding_minutes(1_700_000_000_000 + 95 * 60_000), Some(95));
        assert_eq!(pos.holding_minutes(0), None);
    }

    #[test]
    fn test_holds_normalizes_symbols() {
        let ctx = TradingContext {
            positions: vec![position("ETH")],
            ..TradingContext::default()
        };
        assert!(ctx.holds("ETHUSDT"));
        assert!(ctx.holds("eth"));
        assert!(!ctx.holds("BTCUSDT"));
    }

    #[test]
    fn test_candidate_sources_dedup() {
        let coin = CandidateCoin::new("PEPEUSDT", [CoinSource::OiTop, CoinSource::Ai500, CoinSource::Ai500]);
        assert_eq!(coin.sources.len(), 2);
        assert!(coin.is_dual_signal());
    }

    #[test]
    fn test_context_deserializes_with_defaults() {
        let ctx: TradingContext = serde_json::from_str(
            r#"{"current_time": "2026-01-01 00:00:00", "account": {"total_equity": 1000, "available_balance": 900}}"#,
        )
        .unwrap();
        assert!(ctx.positions.is_empty());
        assert!(ctx.oi_top.is_empty());
        assert!(ctx.trading_stats.is_none());
        assert_eq!(ctx.account.total_equity, 1000.0);
        assert_eq!(ctx.current_price("BTCUSDT"), None);
    }

    #[test]
    fn test_oi_top_entry_direction() {
        let ctx: TradingContext = serde_json::from_str(
            r#"{"current_time": "", "account": {"total_equity": 1, "available_balance": 1},
                "oi_top": {"PEPEUSDT": {"rank": 2, "oi_delta_percent": -3.5, "price_delta_percent": 1.2}}}"#,
        )
        .unwrap();
        let entry = ctx.oi_top["PEPEUSDT"];
        assert_eq!(entry.rank, 2);
        assert_eq!(entry.oi_delta_value, 0.0);
        assert!(!entry.oi_rising());
        assert!(entry.price_rising());
    }
}
