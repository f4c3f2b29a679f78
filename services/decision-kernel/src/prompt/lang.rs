//! Prompt languages and their label tables

use serde::{Deserialize, Serialize};

use crate::context::OiTopEntry;

/// Prompt language. Each variant has its own fully written text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "en-US", alias = "english")]
    English,
    #[serde(rename = "zh", alias = "zh-CN", alias = "chinese")]
    Chinese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    pub(crate) fn labels(&self) -> &'static Labels {
        match self {
            Language::English => &EN,
            Language::Chinese => &ZH,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Language::English),
            "zh" | "zh-cn" | "chinese" => Ok(Language::Chinese),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Static text for the user prompt and market sections
pub(crate) struct Labels {
    // header
    pub time: &'static str,
    pub period: &'static str,
    pub runtime: &'static str,
    pub minutes: &'static str,

    // account
    pub account: &'static str,
    pub equity: &'static str,
    pub balance: &'static str,
    pub pnl: &'static str,
    pub margin_usage: &'static str,
    pub positions: &'static str,
    pub margin_alert_high: &'static str,
    pub margin_alert_notice: &'static str,

    // trading stats
    pub stats_heading: &'static str,
    pub total_trades: &'static str,
    pub trades_unit: &'static str,
    pub profit_factor: &'static str,
    pub sharpe: &'static str,
    pub win_loss_ratio: &'static str,
    pub total_pnl: &'static str,
    pub avg_win: &'static str,
    pub avg_loss: &'static str,
    pub max_drawdown: &'static str,
    pub performance: &'static str,
    pub perf_good: &'static str,
    pub perf_needs_improvement: &'static str,
    pub perf_high_risk: &'static str,
    pub perf_normal: &'static str,

    // recent trades
    pub trades_heading: &'static str,
    pub entry: &'static str,
    pub exit: &'static str,
    pub profit: &'static str,
    pub loss: &'static str,

    // positions
    pub positions_heading: &'static str,
    pub positions_none: &'static str,
    pub current: &'static str,
    pub qty: &'static str,
    pub position_value: &'static str,
    pub pnl_amount: &'static str,
    pub peak_pnl: &'static str,
    pub leverage: &'static str,
    pub margin: &'static str,
    pub liq_price: &'static str,
    pub holding_duration: &'static str,
    pub minute_unit: &'static str,
    /// (peak %, current %, drawdown relative to peak %)
    pub take_profit_alert: fn(f64, f64, f64) -> String,
    pub stop_loss_alert: &'static str,

    // candidates
    pub candidates_heading: &'static str,
    pub coins_unit: &'static str,
    pub candidates_none: &'static str,
    pub tag_dual: &'static str,
    pub tag_ai500: &'static str,
    pub tag_oi_top: &'static str,
    pub tag_static: &'static str,
    /// Rank/change line plus market reading for a candidate in the OI growth ranking
    pub oi_top_change: fn(&OiTopEntry) -> String,

    // market snapshot
    pub market_data: &'static str,
    pub additional_data: &'static str,
    pub open_interest: &'static str,
    pub latest: &'static str,
    pub average: &'static str,
    pub funding_rate: &'static str,
    pub timeframe: &'static str,
    pub oldest_to_latest: &'static str,
    pub kline_header: &'static str,
    pub current_marker: &'static str,

    // quant data
    pub quant_title: &'static str,
    pub price_change: &'static str,
    pub fund_flow: &'static str,
    pub institution_futures: &'static str,
    pub institution_spot: &'static str,
    pub retail_futures: &'static str,
    pub retail_spot: &'static str,

    // rankings
    pub oi_ranking_title: &'static str,
    pub oi_increase: &'static str,
    pub oi_increase_hint: &'static str,
    pub oi_decrease: &'static str,
    pub oi_decrease_hint: &'static str,
    pub oi_table_header: &'static str,
    pub oi_key: &'static str,
    pub netflow_title: &'static str,
    pub institution_inflow: &'static str,
    pub institution_inflow_hint: &'static str,
    pub inflow_table_header: &'static str,
    pub institution_outflow: &'static str,
    pub institution_outflow_hint: &'static str,
    pub outflow_table_header: &'static str,
    pub retail_flow: &'static str,
    pub retail_buying: &'static str,
    pub retail_selling: &'static str,
    pub netflow_key: &'static str,
    pub price_ranking_title: &'static str,
    pub price_window: &'static str,
    pub gainers: &'static str,
    pub losers: &'static str,
    pub price_table_header: &'static str,
    pub price_key: &'static str,

    pub closing: &'static str,
}

fn take_profit_alert_en(peak: f64, current: f64, drawdown: f64) -> String {
    format!(
        "⚠️ **Take Profit Alert**: PnL dropped from peak {:.2}% to {:.2}%, drawdown {:.2}%, consider taking profit",
        peak, current, drawdown
    )
}

fn take_profit_alert_zh(peak: f64, current: f64, drawdown: f64) -> String {
    format!(
        "⚠️ **止盈提示**: 当前盈亏从峰值 {:.2}% 回撤到 {:.2}%，回撤幅度 {:.2}%，建议考虑止盈",
        peak, current, drawdown
    )
}

fn oi_top_change_en(entry: &OiTopEntry) -> String {
    let reading = match (entry.oi_rising(), entry.price_rising()) {
        (true, true) => "Strong bullish trend (new longs opening, capital flowing into long positions)",
        (true, false) => "Strong bearish trend (new shorts opening, capital flowing into short positions)",
        (false, true) => "Shorts covering (shorts stopped out, potential reversal)",
        (false, false) => "Longs closing (longs stopped out, potential reversal)",
    };
    format!(
        "**OI Change**: Rank #{} | Change {:+.2}% ({:+.2}M USDT) | Price Change {:+.2}%\n\n**Market Interpretation**: {}\n\n",
        entry.rank,
        entry.oi_delta_percent,
        entry.oi_delta_value / 1_000_000.0,
        entry.price_delta_percent,
        reading
    )
}

fn oi_top_change_zh(entry: &OiTopEntry) -> String {
    let reading = match (entry.oi_rising(), entry.price_rising()) {
        (true, true) => "强多头趋势（新多单开仓，资金流入做多）",
        (true, false) => "强空头趋势（新空单开仓，资金流入做空）",
        (false, true) => "空头平仓（空头止损离场，可能出现反转）",
        (false, false) => "多头平仓（多头止损离场，可能出现反转）",
    };
    format!(
        "**持仓量变化**: OI排名 #{} | 变化 {:+.2}% ({:+.2}M USDT) | 价格变化 {:+.2}%\n\n**市场解读**: {}\n\n",
        entry.rank,
        entry.oi_delta_percent,
        entry.oi_delta_value / 1_000_000.0,
        entry.price_delta_percent,
        reading
    )
}

static EN: Labels = Labels {
    time: "Time",
    period: "Period",
    runtime: "Runtime",
    minutes: "minutes",

    account: "Account",
    equity: "Equity",
    balance: "Balance",
    pnl: "PnL",
    margin_usage: "Margin",
    positions: "Positions",
    margin_alert_high: "⚠️ **Risk Alert**: Margin usage > 70%, high risk!",
    margin_alert_notice: "⚠️ **Risk Notice**: Margin usage > 50%, be cautious with new positions",

    stats_heading: "## Historical Trading Statistics",
    total_trades: "Total Trades",
    trades_unit: "",
    profit_factor: "Profit Factor",
    sharpe: "Sharpe",
    win_loss_ratio: "Win/Loss Ratio",
    total_pnl: "Total PnL",
    avg_win: "Avg Win",
    avg_loss: "Avg Loss",
    max_drawdown: "Max Drawdown",
    performance: "Performance",
    perf_good: "GOOD - maintain current strategy",
    perf_needs_improvement: "NEEDS IMPROVEMENT - improve win/loss ratio, optimize TP/SL",
    perf_high_risk: "HIGH RISK - reduce position size, control drawdown",
    perf_normal: "NORMAL - room for optimization",

    trades_heading: "## Recent Completed Trades",
    entry: "Entry",
    exit: "Exit",
    profit: "Profit",
    loss: "Loss",

    positions_heading: "## Current Positions",
    positions_none: "Current Positions: None",
    current: "Current",
    qty: "Qty",
    position_value: "Position Value",
    pnl_amount: "PnL Amount",
    peak_pnl: "Peak PnL",
    leverage: "Leverage",
    margin: "Margin",
    liq_price: "Liq Price",
    holding_duration: "Holding Duration",
    minute_unit: "min",
    take_profit_alert: take_profit_alert_en,
    stop_loss_alert: "⚠️ **Stop Loss Alert**: Loss approaching -5% threshold, consider cutting loss",

    candidates_heading: "## Candidate Coins",
    coins_unit: "coins",
    candidates_none: "Candidate Coins: None",
    tag_dual: " (AI500+OI_Top dual signal)",
    tag_ai500: " (AI500)",
    tag_oi_top: " (OI_Top position growth)",
    tag_static: " (Manual selection)",
    oi_top_change: oi_top_change_en,

    market_data: "Market Data",
    additional_data: "Additional data for",
    open_interest: "Open Interest",
    latest: "Latest",
    average: "Average",
    funding_rate: "Funding Rate",
    timeframe: "Timeframe",
    oldest_to_latest: "oldest → latest",
    kline_header: "Time(UTC)      Open      High      Low       Close     Volume",
    current_marker: "<- current",

    quant_title: "Quantitative Data",
    price_change: "Price Change",
    fund_flow: "Fund Flow (Netflow)",
    institution_futures: "Institutional Futures",
    institution_spot: "Institutional Spot",
    retail_futures: "Retail Futures",
    retail_spot: "Retail Spot",

    oi_ranking_title: "## Open Interest Changes",
    oi_increase: "### OI Increase Ranking",
    oi_increase_hint: "Capital inflow signals - trend continuation or new positions:",
    oi_decrease: "### OI Decrease Ranking",
    oi_decrease_hint: "Capital outflow signals - trend reversal or position closing:",
    oi_table_header: "| Rank | Symbol | OI Change (USDT) | OI Change % | Price Change % |\n|------|--------|------------------|-------------|----------------|",
    oi_key: "**Key**: OI up + Price up = Bulls dominant | OI up + Price down = Bears dominant | OI down + Price up = Short covering | OI down + Price down = Long liquidation",
    netflow_title: "## Fund Flow Ranking",
    institution_inflow: "### Institution Inflow",
    institution_inflow_hint: "Smart Money buying signals:",
    inflow_table_header: "| Rank | Symbol | Inflow (USDT) | Price |\n|------|--------|---------------|-------|",
    institution_outflow: "### Institution Outflow",
    institution_outflow_hint: "Smart Money selling signals:",
    outflow_table_header: "| Rank | Symbol | Outflow (USDT) | Price |\n|------|--------|----------------|-------|",
    retail_flow: "### Retail Flow",
    retail_buying: "Retail buying",
    retail_selling: "Retail selling",
    netflow_key: "**Key**: Institution buy + Retail sell = Strong bullish | Institution sell + Retail buy = Strong bearish",
    price_ranking_title: "## Price Gainers/Losers",
    price_window: "Price Change",
    gainers: "**Top Gainers**",
    losers: "**Top Losers**",
    price_table_header: "| Symbol | Change | Price | Fund Flow | OI Change |\n|--------|--------|-------|-----------|-----------|",
    price_key: "**Key**: Big gain + Fund inflow + OI increase = Strong bullish | Big loss + Fund outflow + OI decrease = Strong bearish",

    closing: "Now please analyze and output your decision (Chain of Thought + JSON)",
};

static ZH: Labels = Labels {
    time: "时间",
    period: "周期",
    runtime: "运行时长",
    minutes: "分钟",

    account: "账户",
    equity: "总权益",
    balance: "可用余额",
    pnl: "总盈亏",
    margin_usage: "保证金使用率",
    positions: "持仓数",
    margin_alert_high: "⚠️ **风险警告**: 保证金使用率 > 70%，处于高风险状态！",
    margin_alert_notice: "⚠️ **风险提示**: 保证金使用率 > 50%，建议谨慎开仓",

    stats_heading: "## 历史交易统计",
    total_trades: "总交易",
    trades_unit: " 笔",
    profit_factor: "盈利因子",
    sharpe: "夏普比率",
    win_loss_ratio: "盈亏比",
    total_pnl: "总盈亏",
    avg_win: "平均盈利",
    avg_loss: "平均亏损",
    max_drawdown: "最大回撤",
    performance: "表现",
    perf_good: "良好 - 保持当前策略",
    perf_needs_improvement: "需改进 - 提高盈亏比，优化止盈止损",
    perf_high_risk: "风险偏高 - 减少仓位，控制回撤",
    perf_normal: "正常 - 有优化空间",

    trades_heading: "## 最近完成的交易",
    entry: "进场",
    exit: "出场",
    profit: "盈利",
    loss: "亏损",

    positions_heading: "## 当前持仓",
    positions_none: "当前持仓: 无",
    current: "当前",
    qty: "数量",
    position_value: "仓位价值",
    pnl_amount: "盈亏金额",
    peak_pnl: "峰值盈亏",
    leverage: "杠杆",
    margin: "保证金",
    liq_price: "强平价",
    holding_duration: "持仓时长",
    minute_unit: "分钟",
    take_profit_alert: take_profit_alert_zh,
    stop_loss_alert: "⚠️ **止损提示**: 亏损接近-5%止损线，建议考虑止损",

    candidates_heading: "## 候选币种",
    coins_unit: "个",
    candidates_none: "候选币种: 无",
    tag_dual: " (AI500+OI_Top 双重信号)",
    tag_ai500: " (AI500)",
    tag_oi_top: " (OI_Top 持仓增长)",
    tag_static: " (手动选择)",
    oi_top_change: oi_top_change_zh,

    market_data: "市场数据",
    additional_data: "附加数据",
    open_interest: "持仓量",
    latest: "最新",
    average: "平均",
    funding_rate: "资金费率",
    timeframe: "时间框架",
    oldest_to_latest: "从旧到新",
    kline_header: "时间(UTC)      开盘      最高      最低      收盘      成交量",
    current_marker: "<- 当前",

    quant_title: "量化数据",
    price_change: "价格变化",
    fund_flow: "资金流向 (Netflow)",
    institution_futures: "机构合约",
    institution_spot: "机构现货",
    retail_futures: "散户合约",
    retail_spot: "散户现货",

    oi_ranking_title: "## 持仓量变化排行",
    oi_increase: "### 持仓增加榜",
    oi_increase_hint: "资金流入，趋势延续或新仓建立信号:",
    oi_decrease: "### 持仓减少榜",
    oi_decrease_hint: "资金流出，趋势反转或仓位平仓信号:",
    oi_table_header: "| 排名 | 币种 | 持仓变化(USDT) | OI变化% | 价格变化% |\n|------|------|----------------|---------|----------|",
    oi_key: "**解读**: OI增+价涨=多头主导 | OI增+价跌=空头主导 | OI减+价涨=空头平仓 | OI减+价跌=多头平仓",
    netflow_title: "## 资金流向排行",
    institution_inflow: "### 机构资金流入榜",
    institution_inflow_hint: "Smart Money买入信号:",
    inflow_table_header: "| 排名 | 币种 | 流入金额(USDT) | 价格 |\n|------|------|----------------|------|",
    institution_outflow: "### 机构资金流出榜",
    institution_outflow_hint: "Smart Money卖出信号:",
    outflow_table_header: "| 排名 | 币种 | 流出金额(USDT) | 价格 |\n|------|------|----------------|------|",
    retail_flow: "### 散户资金动向",
    retail_buying: "散户买入",
    retail_selling: "散户卖出",
    netflow_key: "**解读**: 机构买入+散户卖出=强烈看多 | 机构卖出+散户买入=强烈看空",
    price_ranking_title: "## 涨跌幅排行",
    price_window: "涨跌幅",
    gainers: "**涨幅榜**",
    losers: "**跌幅榜**",
    price_table_header: "| 币种 | 涨跌幅 | 价格 | 资金流 | OI变化 |\n|------|--------|------|--------|--------|",
    price_key: "**解读**: 涨幅大+资金流入+OI增加=强势上涨 | 跌幅大+资金流出+OI减少=弱势下跌",

    closing: "现在请分析并输出你的决策（思维链 + JSON）",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
        assert_eq!("zh-CN".parse::<Language>().unwrap(), Language::Chinese);
        assert_eq!(" Chinese ".parse::<Language>().unwrap(), Language::Chinese);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_serde_codes() {
        assert_eq!(serde_json::to_string(&Language::Chinese).unwrap(), "\"zh\"");
        let lang: Language = serde_json::from_str("\"en-US\"").unwrap();
        assert_eq!(lang, Language::English);
    }

    #[test]
    fn test_label_tables_are_distinct() {
        let en = Language::English.labels();
        let zh = Language::Chinese.labels();
        assert_ne!(en.account, zh.account);
        assert_ne!(en.closing, zh.closing);
        assert!(en.positions_heading.starts_with("## "));
        assert!(zh.positions_heading.starts_with("## "));
        assert!((en.take_profit_alert)(5.0, 3.0, -40.0).contains("peak 5.00% to 3.00%"));
        assert!((zh.take_profit_alert)(5.0, 3.0, -40.0).contains("-40.00%"));
    }

    #[test]
    fn test_oi_top_change_readings() {
        let entry = |oi: f64, price: f64| OiTopEntry {
            rank: 3,
            oi_delta_percent: oi,
            oi_delta_value: 2_500_000.0,
            price_delta_percent: price,
        };
        let en = Language::English.labels();
        let zh = Language::Chinese.labels();

        let line = (en.oi_top_change)(&entry(4.2, 1.5));
        assert!(line.starts_with(
            "**OI Change**: Rank #3 | Change +4.20% (+2.50M USDT) | Price Change +1.50%\n\n"
        ));
        assert!(line.contains("**Market Interpretation**: Strong bullish trend"));
        assert!((en.oi_top_change)(&entry(4.2, -1.5)).contains("Strong bearish trend"));
        assert!((en.oi_top_change)(&entry(-4.2, 1.5)).contains("Shorts covering"));
        assert!((en.oi_top_change)(&entry(-4.2, -1.5)).contains("Longs closing"));

        let line = (zh.oi_top_change)(&entry(-4.2, -1.5));
        assert!(line.starts_with("**持仓量变化**: OI排名 #3 | 变化 -4.20% (+2.50M USDT) | 价格变化 -1.50%"));
        assert!(line.contains("**市场解读**: 多头平仓"));
    }
}
