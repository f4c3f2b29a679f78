//! Market snapshot, quant data and ranking sections of the user prompt

use std::collections::BTreeMap;

use chrono::DateTime;

use super::lang::Labels;
use crate::config::IndicatorSelection;
use crate::context::{
    FlowByMarket, Kline, MarketSnapshot, NetFlowRanking, OiRanking, PriceRankWindow, PriceRanking,
    QuantData, TimeframeSeries,
};

/// Display order for timeframe series
const TIMEFRAME_ORDER: [&str; 14] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
];

/// Windows shown for quant price change, fund flow and OI deltas
const QUANT_WINDOWS: [&str; 6] = ["5m", "15m", "1h", "4h", "12h", "24h"];

const PRICE_RANK_WINDOWS: [&str; 3] = ["1h", "4h", "24h"];

/// Retail flow lists are summarized to this many symbols
const RETAIL_FLOW_LIMIT: usize = 3;

/// Keys of `map` in `order` first, then any remaining keys in sorted order
fn ordered_keys<'a, V>(map: &'a BTreeMap<String, V>, order: &[&str]) -> Vec<&'a str> {
    let mut keys: Vec<&str> = order
        .iter()
        .filter_map(|k| map.get_key_value(*k).map(|(key, _)| key.as_str()))
        .collect();
    keys.extend(
        map.keys()
            .map(String::as_str)
            .filter(|k| !order.contains(k)),
    );
    keys
}

/// Signed USDT amount with B/M/K suffix, e.g. `+1.25M`, `-830.00K`
pub fn format_flow_value(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{}{:.2}B", sign, value / 1e9)
    } else if abs >= 1e6 {
        format!("{}{:.2}M", sign, value / 1e6)
    } else if abs >= 1e3 {
        format!("{}{:.2}K", sign, value / 1e3)
    } else {
        format!("{}{:.2}", sign, value)
    }
}

/// `[1.0000, 2.5000]`
pub fn format_float_slice(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
    format!("[{}]", parts.join(", "))
}

/// Scientific notation with a signed two-digit exponent, e.g. `1.25e-04`
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.2e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}

fn format_kline_time(time_ms: i64) -> String {
    DateTime::from_timestamp_millis(time_ms)
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_market_snapshot(
    data: &MarketSnapshot,
    indicators: &IndicatorSelection,
    labels: &Labels,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} {} ===\n\n", data.symbol, labels.market_data));
    out.push_str(&format!("current_price = {:.4}", data.current_price));
    if indicators.ema {
        out.push_str(&format!(", current_ema20 = {:.3}", data.current_ema20));
    }
    if indicators.macd {
        out.push_str(&format!(", current_macd = {:.3}", data.current_macd));
    }
    if indicators.rsi {
        out.push_str(&format!(", current_rsi7 = {:.3}", data.current_rsi7));
    }
    out.push_str("\n\n");

    if indicators.open_interest || indicators.funding_rate {
        out.push_str(&format!("{} {}:\n\n", labels.additional_data, data.symbol));

        if let Some(oi) = data.open_interest.filter(|_| indicators.open_interest) {
            out.push_str(&format!(
                "{}: {}: {:.2} {}: {:.2}\n\n",
                labels.open_interest, labels.latest, oi.latest, labels.average, oi.average
            ));
        }

        if indicators.funding_rate {
            out.push_str(&format!(
                "{}: {}\n\n",
                labels.funding_rate,
                format_scientific(data.funding_rate)
            ));
        }
    }

    for timeframe in ordered_keys(&data.timeframes, &TIMEFRAME_ORDER) {
        if let Some(series) = data.timeframes.get(timeframe) {
            out.push_str(&format!(
                "=== {} {} ({}) ===\n\n",
                timeframe.to_uppercase(),
                labels.timeframe,
                labels.oldest_to_latest
            ));
            format_timeframe_series(&mut out, series, indicators, labels);
        }
    }

    out
}

fn format_kline_table(out: &mut String, klines: &[Kline], labels: &Labels) {
    out.push_str(labels.kline_header);
    out.push('\n');
    let last = klines.len().saturating_sub(1);
    for (i, k) in klines.iter().enumerate() {
        let marker = if i == last {
            format!("  {}", labels.current_marker)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{:<14} {:<9.4} {:<9.4} {:<9.4} {:<9.4} {:<12.2}{}\n",
            format_kline_time(k.time),
            k.open,
            k.high,
            k.low,
            k.close,
            k.volume,
            marker
        ));
    }
    out.push('\n');
}

fn push_series(out: &mut String, name: &str, values: &[f64]) {
    if !values.is_empty() {
        out.push_str(&format!("{}: {}\n", name, format_float_slice(values)));
    }
}

fn format_timeframe_series(
    out: &mut String,
    series: &TimeframeSeries,
    indicators: &IndicatorSelection,
    labels: &Labels,
) {
    if !series.klines.is_empty() {
        format_kline_table(out, &series.klines, labels);
    }

    if indicators.ema {
        push_series(out, "EMA20", &series.ema20);
        push_series(out, "EMA50", &series.ema50);
    }
    if indicators.macd {
        push_series(out, "MACD", &series.macd);
    }
    if indicators.rsi {
        push_series(out, "RSI7", &series.rsi7);
        push_series(out, "RSI14", &series.rsi14);
    }
    if indicators.atr && series.atr14 > 0.0 {
        out.push_str(&format!("ATR14: {:.4}\n", series.atr14));
    }
    if indicators.boll && !series.boll_upper.is_empty() {
        push_series(out, "BOLL Upper", &series.boll_upper);
        push_series(out, "BOLL Middle", &series.boll_middle);
        push_series(out, "BOLL Lower", &series.boll_lower);
    }

    out.push('\n');
}

fn format_flow_windows(out: &mut String, title: &str, flows: &BTreeMap<String, f64>) {
    if flows.is_empty() {
        return;
    }
    out.push_str(&format!("  {}:\n", title));
    for window in ordered_keys(flows, &QUANT_WINDOWS) {
        if let Some(value) = flows.get(window) {
            out.push_str(&format!("    {}: {}\n", window, format_flow_value(*value)));
        }
    }
}

fn format_market_split(out: &mut String, flow: &FlowByMarket, futures: &str, spot: &str) {
    format_flow_windows(out, futures, &flow.future);
    format_flow_windows(out, spot, &flow.spot);
}

/// Quant block for one symbol; empty when both quant sources are disabled or
/// there is nothing to show
pub(crate) fn format_quant_data(
    data: &QuantData,
    indicators: &IndicatorSelection,
    labels: &Labels,
) -> String {
    if !indicators.quant_enabled() {
        return String::new();
    }

    let mut body = String::new();

    if !data.price_change.is_empty() {
        let parts: Vec<String> = ordered_keys(&data.price_change, &QUANT_WINDOWS)
            .into_iter()
            .filter_map(|w| {
                data.price_change
                    .get(w)
                    .map(|v| format!("{}: {:+.4}%", w, v * 100.0))
            })
            .collect();
        body.push_str(&format!("{}: {}\n", labels.price_change, parts.join(" | ")));
    }

    if let Some(netflow) = data.netflow.as_ref().filter(|_| indicators.quant_netflow) {
        let mut flows = String::new();
        if let Some(institution) = &netflow.institution {
            format_market_split(
                &mut flows,
                institution,
                labels.institution_futures,
                labels.institution_spot,
            );
        }
        if let Some(personal) = &netflow.personal {
            format_market_split(&mut flows, personal, labels.retail_futures, labels.retail_spot);
        }
        if !flows.is_empty() {
            body.push_str(&format!("{}:\n", labels.fund_flow));
            body.push_str(&flows);
        }
    }

    if indicators.quant_oi {
        for (exchange, oi) in &data.open_interest {
            if oi.delta.is_empty() {
                continue;
            }
            body.push_str(&format!("{} ({}):\n", labels.open_interest, exchange));
            for window in ordered_keys(&oi.delta, &QUANT_WINDOWS) {
                if let Some(delta) = oi.delta.get(window) {
                    body.push_str(&format!(
                        "    {}: {:+.4}% ({})\n",
                        window,
                        delta.oi_delta_percent,
                        format_flow_value(delta.oi_delta_value)
                    ));
                }
            }
        }
    }

    if body.is_empty() {
        return String::new();
    }
    format!("📊 {} {}:\n{}", data.symbol, labels.quant_title, body)
}

pub(crate) fn format_oi_ranking(ranking: &OiRanking, labels: &Labels) -> String {
    if ranking.top.is_empty() && ranking.low.is_empty() {
        return String::new();
    }

    let mut out = format!("{} ({})\n\n", labels.oi_ranking_title, ranking.duration);

    let tables = [
        (&ranking.top, labels.oi_increase, labels.oi_increase_hint),
        (&ranking.low, labels.oi_decrease, labels.oi_decrease_hint),
    ];
    for (entries, title, hint) in tables {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("{}\n{}\n\n{}\n", title, hint, labels.oi_table_header));
        for entry in entries {
            out.push_str(&format!(
                "| {} | {} | {} | {:+.2}% | {:+.2}% |\n",
                entry.rank,
                entry.symbol,
                format_flow_value(entry.oi_delta_value),
                entry.oi_delta_percent,
                entry.price_delta_percent
            ));
        }
        out.push('\n');
    }

    out.push_str(labels.oi_key);
    out.push_str("\n\n");
    out
}

pub(crate) fn format_netflow_ranking(ranking: &NetFlowRanking, labels: &Labels) -> String {
    let all_empty = ranking.institution_inflow.is_empty()
        && ranking.institution_outflow.is_empty()
        && ranking.retail_inflow.is_empty()
        && ranking.retail_outflow.is_empty();
    if all_empty {
        return String::new();
    }

    let mut out = format!("{} ({})\n\n", labels.netflow_title, ranking.duration);

    let tables = [
        (
            &ranking.institution_inflow,
            labels.institution_inflow,
            labels.institution_inflow_hint,
            labels.inflow_table_header,
        ),
        (
            &ranking.institution_outflow,
            labels.institution_outflow,
            labels.institution_outflow_hint,
            labels.outflow_table_header,
        ),
    ];
    for (entries, title, hint, header) in tables {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("{}\n{}\n\n{}\n", title, hint, header));
        for entry in entries {
            out.push_str(&format!(
                "| {} | {} | {} | ${:.4} |\n",
                entry.rank,
                entry.symbol,
                format_flow_value(entry.amount),
                entry.price
            ));
        }
        out.push('\n');
    }

    if !ranking.retail_inflow.is_empty() || !ranking.retail_outflow.is_empty() {
        out.push_str(labels.retail_flow);
        out.push('\n');
        for (entries, label) in [
            (&ranking.retail_inflow, labels.retail_buying),
            (&ranking.retail_outflow, labels.retail_selling),
        ] {
            if entries.is_empty() {
                continue;
            }
            let summary: Vec<String> = entries
                .iter()
                .take(RETAIL_FLOW_LIMIT)
                .map(|e| format!("{}({})", e.symbol, format_flow_value(e.amount)))
                .collect();
            out.push_str(&format!("{}: {}\n", label, summary.join(", ")));
        }
        out.push('\n');
    }

    out.push_str(labels.netflow_key);
    out.push_str("\n\n");
    out
}

pub(crate) fn format_price_ranking(ranking: &PriceRanking, labels: &Labels) -> String {
    let has_entries =
        |w: &PriceRankWindow| !w.gainers.is_empty() || !w.losers.is_empty();
    if !ranking.windows.values().any(has_entries) {
        return String::new();
    }

    let mut out = format!("{}\n\n", labels.price_ranking_title);

    for window in ordered_keys(&ranking.windows, &PRICE_RANK_WINDOWS) {
        let Some(data) = ranking.windows.get(window).filter(|w| has_entries(w)) else {
            continue;
        };
        out.push_str(&format!("### {} {}\n\n", window, labels.price_window));

        for (entries, title, signed) in [
            (&data.gainers, labels.gainers, true),
            (&data.losers, labels.losers, false),
        ] {
            if entries.is_empty() {
                continue;
            }
            out.push_str(&format!("{}\n{}\n", title, labels.price_table_header));
            for entry in entries {
                let change = if signed {
                    format!("{:+.2}%", entry.price_delta * 100.0)
                } else {
                    format!("{:.2}%", entry.price_delta * 100.0)
                };
                out.push_str(&format!(
                    "| {} | {} | ${:.4} | {} | {} |\n",
                    entry.symbol,
                    change,
                    entry.price,
                    format_flow_value(entry.future_flow),
                    format_flow_value(entry.oi_delta_value)
                ));
            }
            out.push('\n');
        }
    }

    out.push_str(labels.price_key);
    out.push_str("\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{
        ExchangeOpenInterest, FlowRankEntry, Netflow, OiDelta, OpenInterest, PriceRankEntry,
    };
    use crate::prompt::Language;

    fn en() -> &'static Labels {
        Language::English.labels()
    }

    #[test]
    fn test_format_flow_value_suffixes() {
        assert_eq!(format_flow_value(1_250_000.0), "+1.25M");
        assert_eq!(format_flow_value(-830_000.0), "-830.00K");
        assert_eq!(format_flow_value(2.5e9), "+2.50B");
        assert_eq!(format_flow_value(0.0), "+0.00");
        assert_eq!(format_flow_value(-12.5), "-12.50");
    }

    #[test]
    fn test_format_scientific_matches_two_digit_exponent() {
        assert_eq!(format_scientific(0.0001), "1.00e-04");
        assert_eq!(format_scientific(-0.00025), "-2.50e-04");
        assert_eq!(format_scientific(0.0), "0.00e+00");
        assert_eq!(format_scientific(12000.0), "1.20e+04");
    }

    #[test]
    fn test_format_float_slice() {
        assert_eq!(format_float_slice(&[1.0, 2.5]), "[1.0000, 2.5000]");
        assert_eq!(format_float_slice(&[]), "[]");
    }

    #[test]
    fn test_market_snapshot_timeframe_order_and_marker() {
        let mut snapshot = MarketSnapshot {
            symbol: "SOLUSDT".to_string(),
            current_price: 142.5,
            funding_rate: 0.0001,
            open_interest: Some(OpenInterest { latest: 1000.0, average: 900.0 }),
            ..MarketSnapshot::default()
        };
        let kline = Kline { time: 0, open: 1.0, high: 2.0, low: 0.5, close: 1.5, volume: 10.0 };
        for tf in ["4h", "5m", "1h"] {
            snapshot.timeframes.insert(
                tf.to_string(),
                TimeframeSeries { klines: vec![kline, kline], ema20: vec![1.0], ..Default::default() },
            );
        }

        let text = format_market_snapshot(&snapshot, &IndicatorSelection::default(), en());
        let five = text.find("=== 5M Timeframe").unwrap();
        let hour = text.find("=== 1H Timeframe").unwrap();
        let four = text.find("=== 4H Timeframe").unwrap();
        assert!(five < hour && hour < four);
        assert!(text.contains("current_price = 142.5000, current_ema20 = 0.000"));
        assert!(text.contains("Open Interest: Latest: 1000.00 Average: 900.00"));
        assert!(text.contains("Funding Rate: 1.00e-04"));
        assert!(text.contains("01-01 00:00"));
        assert_eq!(text.matches("<- current").count(), 3);
        assert!(text.contains("EMA20: [1.0000]"));
    }

    #[test]
    fn test_market_snapshot_respects_indicator_selection() {
        let snapshot = MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            current_price: 100.0,
            ..MarketSnapshot::default()
        };
        let indicators = IndicatorSelection {
            ema: false,
            macd: false,
            rsi: false,
            open_interest: false,
            funding_rate: false,
            ..IndicatorSelection::default()
        };
        let text = format_market_snapshot(&snapshot, &indicators, en());
        assert!(text.contains("current_price = 100.0000\n"));
        assert!(!text.contains("current_ema20"));
        assert!(!text.contains("Funding Rate"));
        assert!(!text.contains("Additional data"));
    }

    #[test]
    fn test_quant_data_sections() {
        let mut quant = QuantData {
            symbol: "BTCUSDT".to_string(),
            ..QuantData::default()
        };
        quant.price_change.insert("1h".to_string(), 0.0123);
        quant.price_change.insert("5m".to_string(), -0.001);
        let mut institution = FlowByMarket::default();
        institution.future.insert("1h".to_string(), 2_000_000.0);
        quant.netflow = Some(Netflow { institution: Some(institution), personal: None });
        let mut oi = ExchangeOpenInterest::default();
        oi.delta.insert(
            "1h".to_string(),
            OiDelta { oi_delta: 1.0, oi_delta_value: 5_000.0, oi_delta_percent: 1.5 },
        );
        quant.open_interest.insert("binance".to_string(), oi);

        let text = format_quant_data(&quant, &IndicatorSelection::default(), en());
        assert!(text.starts_with("📊 BTCUSDT Quantitative Data:\n"));
        assert!(text.contains("Price Change: 5m: -0.1000% | 1h: +1.2300%"));
        assert!(text.contains("  Institutional Futures:\n    1h: +2.00M\n"));
        assert!(text.contains("Open Interest (binance):\n    1h: +1.5000% (+5.00K)\n"));

        let disabled = IndicatorSelection {
            quant_oi: false,
            quant_netflow: false,
            ..IndicatorSelection::default()
        };
        assert!(format_quant_data(&quant, &disabled, en()).is_empty());
    }

    #[test]
    fn test_netflow_retail_summary_is_capped() {
        let entry = |rank: u32, symbol: &str| FlowRankEntry {
            rank,
            symbol: symbol.to_string(),
            amount: 1000.0,
            price: 1.0,
        };
        let ranking = NetFlowRanking {
            duration: "1h".to_string(),
            retail_inflow: vec![entry(1, "A"), entry(2, "B"), entry(3, "C"), entry(4, "D")],
            ..NetFlowRanking::default()
        };
        let text = format_netflow_ranking(&ranking, en());
        assert!(text.starts_with("## Fund Flow Ranking (1h)"));
        assert!(text.contains("Retail buying: A(+1.00K), B(+1.00K), C(+1.00K)\n"));
        assert!(!text.contains("D(+1.00K)"));
        assert!(!text.contains("Institution Inflow"));
    }

    #[test]
    fn test_quant_data_without_values_is_omitted() {
        let mut quant = QuantData {
            symbol: "DOGEUSDT".to_string(),
            netflow: Some(Netflow {
                institution: Some(FlowByMarket::default()),
                personal: None,
            }),
            ..QuantData::default()
        };
        quant.open_interest.insert("binance".to_string(), ExchangeOpenInterest::default());

        assert_eq!(format_quant_data(&quant, &IndicatorSelection::default(), en()), "");
    }

    #[test]
    fn test_empty_rankings_render_nothing() {
        let oi = OiRanking { duration: "1h".to_string(), ..OiRanking::default() };
        let netflow = NetFlowRanking { duration: "1h".to_string(), ..NetFlowRanking::default() };
        let mut price = PriceRanking::default();
        price.windows.insert("1h".to_string(), PriceRankWindow::default());

        for labels in [Language::English.labels(), Language::Chinese.labels()] {
            assert_eq!(format_oi_ranking(&oi, labels), "");
            assert_eq!(format_netflow_ranking(&netflow, labels), "");
            assert_eq!(format_price_ranking(&price, labels), "");
            assert_eq!(format_price_ranking(&PriceRanking::default(), labels), "");
        }
    }

    #[test]
    fn test_price_ranking_skips_empty_windows() {
        let mut ranking = PriceRanking::default();
        ranking.windows.insert("1h".to_string(), PriceRankWindow::default());
        ranking.windows.insert(
            "4h".to_string(),
            PriceRankWindow {
                gainers: vec![PriceRankEntry {
                    symbol: "PEPEUSDT".to_string(),
                    price_delta: 0.2,
                    ..PriceRankEntry::default()
                }],
                losers: Vec::new(),
            },
        );

        let text = format_price_ranking(&ranking, en());
        assert!(text.contains("### 4h"));
        assert!(!text.contains("### 1h"));
        assert!(text.contains("| PEPEUSDT | +20.00% |"));
    }
}
