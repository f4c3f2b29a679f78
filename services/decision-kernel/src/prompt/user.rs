//! User prompt: the per-cycle market and account snapshot

use super::lang::Labels;
use super::market;
use crate::config::IndicatorSelection;
use crate::context::{
    AccountInfo, CandidateCoin, CoinSource, PositionInfo, RecentOrder, TradingContext,
    TradingStats,
};

/// Symbol used for the market-wide BTC summary line
const BTC_SYMBOL: &str = "BTCUSDT";

const MARGIN_ALERT_PCT: f64 = 70.0;
const MARGIN_NOTICE_PCT: f64 = 50.0;

/// Drawdown from peak, as a fraction of the peak, that triggers the take-profit hint
const PEAK_GIVEBACK: f64 = 0.30;
/// Peak PnL % below which the take-profit hint is not shown
const MIN_PEAK_PNL_PCT: f64 = 0.02;
/// Unrealized PnL % below which the stop-loss hint is shown
const STOP_LOSS_HINT_PCT: f64 = -4.0;

pub(crate) fn build_user_prompt(
    ctx: &TradingContext,
    indicators: &IndicatorSelection,
    labels: &Labels,
) -> String {
    let mut out = format!(
        "{}: {} | {}: #{} | {}: {} {}\n\n",
        labels.time,
        ctx.current_time,
        labels.period,
        ctx.call_count,
        labels.runtime,
        ctx.runtime_minutes,
        labels.minutes
    );

    if let Some(btc) = ctx.market_data.get(BTC_SYMBOL) {
        out.push_str(&format!(
            "BTC: {:.2} (1h: {:+.2}%, 4h: {:+.2}%) | MACD: {:.4} | RSI: {:.2}\n\n",
            btc.current_price, btc.price_change_1h, btc.price_change_4h, btc.current_macd, btc.current_rsi7
        ));
    }

    out.push_str(&format_account(&ctx.account, labels));

    if let Some(stats) = ctx.trading_stats.as_ref().filter(|s| s.total_trades > 0) {
        out.push_str(&format_trading_stats(stats, labels));
    }

    if !ctx.recent_orders.is_empty() {
        out.push_str(&format_recent_orders(&ctx.recent_orders, labels));
    }

    if ctx.positions.is_empty() {
        out.push_str(labels.positions_none);
        out.push_str("\n\n");
    } else {
        out.push_str(labels.positions_heading);
        out.push('\n');
        for (i, position) in ctx.positions.iter().enumerate() {
            out.push_str(&format_position(i + 1, position, ctx, indicators, labels));
        }
    }

    out.push_str(&format_candidates(ctx, indicators, labels));

    if let Some(ranking) = &ctx.oi_ranking {
        out.push_str(&market::format_oi_ranking(ranking, labels));
    }
    if let Some(ranking) = &ctx.netflow_ranking {
        out.push_str(&market::format_netflow_ranking(ranking, labels));
    }
    if let Some(ranking) = &ctx.price_ranking {
        out.push_str(&market::format_price_ranking(ranking, labels));
    }

    out.push_str("---\n\n");
    out.push_str(labels.closing);
    out.push('\n');
    out
}

fn format_account(account: &AccountInfo, labels: &Labels) -> String {
    let mut out = format!(
        "{}: {} {:.2} | {} {:.2} ({:.1}%) | {} {:+.2}% | {} {:.1}% | {} {}\n\n",
        labels.account,
        labels.equity,
        account.total_equity,
        labels.balance,
        account.available_balance,
        account.available_ratio_pct(),
        labels.pnl,
        account.total_pnl_pct,
        labels.margin_usage,
        account.margin_used_pct,
        labels.positions,
        account.position_count
    );

    if account.margin_used_pct > MARGIN_ALERT_PCT {
        out.push_str(labels.margin_alert_high);
        out.push_str("\n\n");
    } else if account.margin_used_pct > MARGIN_NOTICE_PCT {
        out.push_str(labels.margin_alert_notice);
        out.push_str("\n\n");
    }

    out
}

fn format_recent_orders(orders: &[RecentOrder], labels: &Labels) -> String {
    let mut out = format!("{}\n", labels.trades_heading);
    for (i, order) in orders.iter().enumerate() {
        let result = if order.realized_pnl < 0.0 {
            labels.loss
        } else {
            labels.profit
        };
        out.push_str(&format!(
            "{}. {} {} | {} {:.4} {} {:.4} | {}: {:+.2} USDT ({:+.2}%) | {}→{} ({})\n",
            i + 1,
            order.symbol,
            order.side,
            labels.entry,
            order.entry_price,
            labels.exit,
            order.exit_price,
            result,
            order.realized_pnl,
            order.pnl_pct,
            order.entry_time,
            order.exit_time,
            order.hold_duration
        ));
    }
    out.push('\n');
    out
}

fn performance_hint<'a>(stats: &TradingStats, labels: &'a Labels) -> &'a str {
    if stats.profit_factor >= 1.5 && stats.sharpe_ratio >= 1.0 {
        labels.perf_good
    } else if stats.profit_factor < 1.0 {
        labels.perf_needs_improvement
    } else if stats.max_drawdown_pct > 30.0 {
        labels.perf_high_risk
    } else {
        labels.perf_normal
    }
}

fn format_trading_stats(stats: &TradingStats, labels: &Labels) -> String {
    format!(
        "{}\n{}: {}{} | {}: {:.2} | {}: {:.2} | {}: {:.2}\n{}: {:+.2} USDT | {}: +{:.2} | {}: -{:.2} | {}: {:.1}%\n{}: {}\n\n",
        labels.stats_heading,
        labels.total_trades,
        stats.total_trades,
        labels.trades_unit,
        labels.profit_factor,
        stats.profit_factor,
        labels.sharpe,
        stats.sharpe_ratio,
        labels.win_loss_ratio,
        stats.win_loss_ratio(),
        labels.total_pnl,
        stats.total_pnl,
        labels.avg_win,
        stats.avg_win,
        labels.avg_loss,
        stats.avg_loss,
        labels.max_drawdown,
        stats.max_drawdown_pct,
        labels.performance,
        performance_hint(stats, labels)
    )
}

fn format_holding(minutes: i64, labels: &Labels) -> String {
    if minutes < 60 {
        format!(" | {} {} {}", labels.holding_duration, minutes, labels.minute_unit)
    } else {
        format!(" | {} {}h {}m", labels.holding_duration, minutes / 60, minutes % 60)
    }
}

fn format_position(
    index: usize,
    pos: &PositionInfo,
    ctx: &TradingContext,
    indicators: &IndicatorSelection,
    labels: &Labels,
) -> String {
    let holding = pos
        .holding_minutes(ctx.now_ms)
        .map(|m| format_holding(m, labels))
        .unwrap_or_default();

    let mut out = format!(
        "{}. {} {} | {} {:.4} {} {:.4} | {} {:.4} | {} {:.2} USDT | {}{:+.2}% | {}{:+.2} USDT | {}{:.2}% | {} {}x | {} {:.0} | {} {:.4}{}\n",
        index,
        pos.symbol,
        pos.side,
        labels.entry,
        pos.entry_price,
        labels.current,
        pos.mark_price,
        labels.qty,
        pos.quantity,
        labels.position_value,
        pos.position_value(),
        labels.pnl,
        pos.unrealized_pnl_pct,
        labels.pnl_amount,
        pos.unrealized_pnl,
        labels.peak_pnl,
        pos.peak_pnl_pct,
        labels.leverage,
        pos.leverage,
        labels.margin,
        pos.margin_used,
        labels.liq_price,
        pos.liquidation_price,
        holding
    );

    let drawdown = pos.drawdown_pct();
    if drawdown < -PEAK_GIVEBACK * pos.peak_pnl_pct && pos.peak_pnl_pct > MIN_PEAK_PNL_PCT {
        out.push_str("   ");
        out.push_str(&(labels.take_profit_alert)(
            pos.peak_pnl_pct,
            pos.unrealized_pnl_pct,
            drawdown / pos.peak_pnl_pct * 100.0,
        ));
        out.push('\n');
    }
    if pos.unrealized_pnl_pct < STOP_LOSS_HINT_PCT {
        out.push_str("   ");
        out.push_str(labels.stop_loss_alert);
        out.push('\n');
    }
    out.push('\n');

    if let Some(snapshot) = ctx.market_data.get(&pos.symbol) {
        out.push_str(&market::format_market_snapshot(snapshot, indicators, labels));
        if let Some(quant) = ctx.quant_data.get(&pos.symbol) {
            out.push_str(&market::format_quant_data(quant, indicators, labels));
        }
        out.push('\n');
    }

    out
}

fn source_tag<'a>(coin: &CandidateCoin, labels: &'a Labels) -> &'a str {
    if coin.is_dual_signal() {
        return labels.tag_dual;
    }
    match coin.sources.iter().next() {
        Some(CoinSource::Ai500) => labels.tag_ai500,
        Some(CoinSource::OiTop) => labels.tag_oi_top,
        Some(CoinSource::Static) => labels.tag_static,
        None => "",
    }
}

fn format_candidates(ctx: &TradingContext, indicators: &IndicatorSelection, labels: &Labels) -> String {
    let shown: Vec<_> = ctx
        .candidate_coins
        .iter()
        .filter(|coin| !ctx.holds(&coin.symbol))
        .filter_map(|coin| ctx.market_data.get(&coin.symbol).map(|data| (coin, data)))
        .collect();

    if shown.is_empty() {
        return format!("{}\n\n", labels.candidates_none);
    }

    let mut out = format!(
        "{} ({} {})\n\n",
        labels.candidates_heading,
        shown.len(),
        labels.coins_unit
    );
    for (i, (coin, data)) in shown.into_iter().enumerate() {
        out.push_str(&format!("### {}. {}{}\n\n", i + 1, coin.symbol, source_tag(coin, labels)));
        out.push_str(&market::format_market_snapshot(data, indicators, labels));
        if let Some(oi_top) = ctx.oi_top.get(&coin.symbol) {
            out.push_str(&(labels.oi_top_change)(oi_top));
        }
        if let Some(quant) = ctx.quant_data.get(&coin.symbol) {
            out.push_str(&market::format_quant_data(quant, indicators, labels));
        }
        out.push('\n');
    }
    out.push('\n');
    out
}
