//! System prompt
//!
//! Two fully written bodies, one per language. Both carry the same sections
//! in the same order; hard limits are computed from the account equity so the
//! model sees concrete USDT numbers rather than ratios.

use super::{Language, PromptVariant};
use crate::config::{IndicatorSelection, PromptSettings, RiskPolicy};

/// Example values for the worked output example
const EXAMPLE_STOP_LOSS: f64 = 97000.0;
const EXAMPLE_TAKE_PROFIT: f64 = 91000.0;
const EXAMPLE_CONFIDENCE: u32 = 85;
const EXAMPLE_RISK_USD: f64 = 300.0;

struct FieldText {
    name: &'static str,
    formula: &'static str,
    desc: &'static str,
}

struct FieldDef {
    key: &'static str,
    unit: &'static str,
    en: FieldText,
    zh: FieldText,
}

impl FieldDef {
    fn text(&self, language: Language) -> &FieldText {
        match language {
            Language::English => &self.en,
            Language::Chinese => &self.zh,
        }
    }
}

macro_rules! field {
    ($key:literal, $unit:literal, en: ($en_name:literal, $en_formula:literal, $en_desc:literal), zh: ($zh_name:literal, $zh_formula:literal, $zh_desc:literal)) => {
        FieldDef {
            key: $key,
            unit: $unit,
            en: FieldText { name: $en_name, formula: $en_formula, desc: $en_desc },
            zh: FieldText { name: $zh_name, formula: $zh_formula, desc: $zh_desc },
        }
    };
}

static ACCOUNT_FIELDS: [FieldDef; 4] = [
    field!("Equity", "USDT",
        en: ("Total Equity", "Available Balance + Unrealized PnL", "Actual account value including all unrealized P&L from positions"),
        zh: ("总权益", "可用余额 + 未实现盈亏", "账户的实际净值，包含所有持仓的浮动盈亏")),
    field!("Balance", "USDT",
        en: ("Available Balance", "Initial Capital + Realized PnL", "Available funds for opening new positions, excluding used margin"),
        zh: ("可用余额", "初始资金 + 已实现盈亏", "可用于开新仓位的资金，不包括已用保证金")),
    field!("PnL", "%",
        en: ("Total PnL Percentage", "(Total Equity - Initial Capital) / Initial Capital × 100", "Total return since inception, +15.87% means 15.87% profit"),
        zh: ("总盈亏百分比", "(总权益 - 初始资金) / 初始资金 × 100", "自系统启动以来的总收益率，+15.87%表示盈利15.87%")),
    field!("Margin", "%",
        en: ("Margin Usage Rate", "Total Used Margin / Total Equity × 100", "Higher value = higher risk. Safe <30%, Dangerous >70%"),
        zh: ("保证金使用率", "已用保证金合计 / 总权益 × 100", "该值越高，账户风险越大。安全值<30%，危险值>70%")),
];

static TRADE_FIELDS: [FieldDef; 5] = [
    field!("Entry", "USDT",
        en: ("Entry Price", "", "Average price when opening position"),
        zh: ("进场价", "", "开仓时的平均价格")),
    field!("Exit", "USDT",
        en: ("Exit Price", "", "Average price when closing position"),
        zh: ("出场价", "", "平仓时的平均价格")),
    field!("Profit", "USDT",
        en: ("Realized PnL", "(Exit Price - Entry Price) / Entry Price × Leverage × Position Value", "Actual profit/loss of closed trades including fees. Positive=profit, Negative=loss"),
        zh: ("已实现盈亏", "(出场价 - 进场价) / 进场价 × 杠杆 × 仓位价值", "已平仓交易的实际盈亏，包含手续费。正值=盈利，负值=亏损")),
    field!("PnL%", "%",
        en: ("PnL Percentage", "(Exit - Entry) / Entry × Leverage × 100", "Return on closed trade, +6.71% means 6.71% profit"),
        zh: ("盈亏百分比", "(出场价 - 进场价) / 进场价 × 杠杆 × 100", "已平仓交易的收益率，+6.71%表示盈利6.71%")),
    field!("HoldDuration", "minutes",
        en: ("Holding Duration", "", "Time from open to close. <15min=scalping, 15min-4h=intraday, >4h=swing"),
        zh: ("持仓时长", "", "从开仓到平仓的时间。<15分钟=超短线，15分钟-4小时=日内，>4小时=波段")),
];

static POSITION_FIELDS: [FieldDef; 6] = [
    field!("UnrealizedPnL%", "%",
        en: ("Unrealized PnL Percentage", "(Current Price - Entry Price) / Entry Price × Leverage × 100", "Floating P&L of current position, not realized until closed"),
        zh: ("未实现盈亏百分比", "(当前价 - 进场价) / 进场价 × 杠杆 × 100", "当前持仓的浮动盈亏，未平仓前是浮动的")),
    field!("PeakPnL%", "%",
        en: ("Peak PnL Percentage", "", "Historical max unrealized PnL for this position. Used for take-profit decisions"),
        zh: ("峰值盈亏百分比", "", "该持仓曾经达到的最高未实现盈亏。用于判断是否需要止盈")),
    field!("Drawdown", "%",
        en: ("Drawdown from Peak", "Current PnL% - Peak PnL%", "Negative = pulling back. E.g., Peak +5%, Current +3%, Drawdown = -2%"),
        zh: ("从峰值回撤", "当前盈亏% - 峰值盈亏%", "负值表示正在回撤。例如：峰值+5%，当前+3%，回撤=-2%")),
    field!("Leverage", "x",
        en: ("Leverage", "", "3x means 1% price move = 3% position PnL. Higher leverage = higher risk"),
        zh: ("杠杆倍数", "", "3x表示价格变动1%，持仓盈亏变动3%。杠杆越高，风险越大")),
    field!("Margin", "USDT",
        en: ("Margin Used", "Position Value / Leverage", "Collateral locked for this position"),
        zh: ("占用保证金", "仓位价值 / 杠杆", "该仓位锁定的保证金金额")),
    field!("LiqPrice", "USDT",
        en: ("Liquidation Price", "", "Price at which position will be force-closed. 0.0000 = no liquidation risk"),
        zh: ("强平价格", "", "价格触及此值时会被强制平仓。0.0000表示无爆仓风险")),
];

static MARKET_FIELDS: [FieldDef; 3] = [
    field!("Volume", "base asset",
        en: ("Volume", "", "Trading volume in this period"),
        zh: ("成交量", "", "该时间段的交易量")),
    field!("OI", "USDT",
        en: ("Open Interest", "", "Total value of open contracts. Increasing OI = capital inflow, decreasing = outflow"),
        zh: ("持仓量", "", "未平仓合约的总价值。持仓量增加=资金流入，减少=资金流出")),
    field!("OIChange", "USDT & %",
        en: ("OI Change", "", "OI change in 1 hour. Used to determine real capital flow direction"),
        zh: ("持仓量变化", "", "1小时内持仓量的变化。用于判断市场真实资金流向")),
];

fn format_field(field: &FieldDef, language: Language) -> String {
    let text = field.text(language);
    let mut line = match language {
        Language::English => format!("- **{}** ({}): {}", field.key, text.name, text.desc),
        Language::Chinese => format!("- **{}**（{}）: {}", field.key, text.name, text.desc),
    };
    let (formula_label, unit_label) = match language {
        Language::English => ("Formula", "Unit"),
        Language::Chinese => ("公式", "单位"),
    };
    if !text.formula.is_empty() {
        line.push_str(&format!(" | {}: `{}`", formula_label, text.formula));
    }
    if !field.unit.is_empty() {
        line.push_str(&format!(" | {}: {}", unit_label, field.unit));
    }
    line.push('\n');
    line
}

fn data_dictionary(language: Language) -> String {
    let (title, subtitle, groups, oi_title, oi_lines) = match language {
        Language::English => (
            "# 📖 Data Dictionary & Trading Rules",
            "## 📊 Field Definitions",
            ["Account Metrics", "Trade Metrics", "Position Metrics", "Market Data"],
            "## 💹 Open Interest (OI) Change Interpretation",
            [
                "- **OI Up + Price Up**: Strong bullish trend (new longs opening, capital flowing into long positions)",
                "- **OI Up + Price Down**: Strong bearish trend (new shorts opening, capital flowing into short positions)",
                "- **OI Down + Price Up**: Shorts covering (shorts stopped out, potential reversal)",
                "- **OI Down + Price Down**: Longs closing (longs stopped out, potential reversal)",
            ],
        ),
        Language::Chinese => (
            "# 📖 数据字典与交易规则",
            "## 📊 字段含义说明",
            ["账户指标", "交易指标", "持仓指标", "市场数据"],
            "## 💹 持仓量(OI)变化解读",
            [
                "- **OI增加 + 价格上涨**: 强多头趋势（新多单开仓，资金流入做多）",
                "- **OI增加 + 价格下跌**: 强空头趋势（新空单开仓，资金流入做空）",
                "- **OI减少 + 价格上涨**: 空头平仓（空头止损离场，可能出现反转）",
                "- **OI减少 + 价格下跌**: 多头平仓（多头止损离场，可能出现反转）",
            ],
        ),
    };

    let tables: [&[FieldDef]; 4] = [&ACCOUNT_FIELDS, &TRADE_FIELDS, &POSITION_FIELDS, &MARKET_FIELDS];

    let mut out = format!("{}\n\n{}\n\n", title, subtitle);
    for (i, (group, fields)) in groups.iter().zip(tables).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("### {}\n", group));
        for field in fields {
            out.push_str(&format_field(field, language));
        }
    }
    out.push_str(&format!("\n{}\n\n", oi_title));
    for line in oi_lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn variant_section(variant: PromptVariant, language: Language) -> Option<&'static str> {
    match (variant, language) {
        (PromptVariant::Balanced, _) => None,
        (PromptVariant::Aggressive, Language::English) => Some(
            "## Mode: Aggressive\n- Prioritize capturing trend breakouts, can build positions in batches when confidence ≥ 70\n- Allow higher positions, but must strictly set stop-loss and explain risk-reward ratio\n\n",
        ),
        (PromptVariant::Conservative, Language::English) => Some(
            "## Mode: Conservative\n- Only open positions when multiple signals resonate\n- Prioritize cash preservation, must pause for multiple periods after consecutive losses\n\n",
        ),
        (PromptVariant::Scalping, Language::English) => Some(
            "## Mode: Scalping\n- Focus on short-term momentum, smaller profit targets but require quick action\n- If price doesn't move as expected within two bars, immediately reduce position or stop-loss\n\n",
        ),
        (PromptVariant::Aggressive, Language::Chinese) => Some(
            "## 模式：激进\n- 优先捕捉趋势突破，信心度 ≥ 70 时可分批建仓\n- 允许更高仓位，但必须严格设置止损并说明盈亏比\n\n",
        ),
        (PromptVariant::Conservative, Language::Chinese) => Some(
            "## 模式：稳健\n- 仅在多个信号共振时开仓\n- 优先保留现金，连续亏损后必须暂停多个周期\n\n",
        ),
        (PromptVariant::Scalping, Language::Chinese) => Some(
            "## 模式：剥头皮\n- 聚焦短线动量，盈利目标较小但要求快速行动\n- 若价格在两根K线内未按预期运行，立即减仓或止损\n\n",
        ),
    }
}

fn join_periods(periods: &[u32]) -> String {
    periods
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn available_indicators(indicators: &IndicatorSelection, language: Language) -> String {
    let mut out = String::new();
    let mut line = |en: String, zh: String| {
        out.push_str(match language {
            Language::English => &en,
            Language::Chinese => &zh,
        });
        out.push('\n');
    };
    let with_periods = |base: &str, label: &str, periods: &[u32]| {
        if periods.is_empty() {
            base.to_string()
        } else {
            format!("{} ({}: {})", base, label, join_periods(periods))
        }
    };

    let primary = &indicators.primary_timeframe;
    match &indicators.longer_timeframe {
        Some(longer) => line(
            format!("- {} price series + {} K-line series", primary, longer),
            format!("- {} 价格序列 + {} K线序列", primary, longer),
        ),
        None => line(
            format!("- {} price series", primary),
            format!("- {} 价格序列", primary),
        ),
    }
    if indicators.ema {
        line(
            with_periods("- EMA indicators", "periods", &indicators.ema_periods),
            with_periods("- EMA 指标", "周期", &indicators.ema_periods),
        );
    }
    if indicators.macd {
        line("- MACD indicators".into(), "- MACD 指标".into());
    }
    if indicators.rsi {
        line(
            with_periods("- RSI indicators", "periods", &indicators.rsi_periods),
            with_periods("- RSI 指标", "周期", &indicators.rsi_periods),
        );
    }
    if indicators.atr {
        line(
            with_periods("- ATR indicators", "periods", &indicators.atr_periods),
            with_periods("- ATR 指标", "周期", &indicators.atr_periods),
        );
    }
    if indicators.boll {
        line(
            "- Bollinger Bands (BOLL) - Upper/Middle/Lower bands".into(),
            "- 布林带 (BOLL) - 上轨/中轨/下轨".into(),
        );
    }
    if indicators.volume {
        line("- Volume data".into(), "- 成交量数据".into());
    }
    if indicators.open_interest {
        line("- Open Interest (OI) data".into(), "- 持仓量 (OI) 数据".into());
    }
    if indicators.funding_rate {
        line("- Funding rate".into(), "- 资金费率".into());
    }
    if indicators.coin_source_tags {
        line(
            "- AI500 / OI_Top filter tags (if available)".into(),
            "- AI500 / OI_Top 筛选标记（若有）".into(),
        );
    }
    if indicators.quant_enabled() {
        line(
            "- Quantitative data (institutional/retail fund flow, position changes, multi-period price changes)".into(),
            "- 量化数据（机构/散户资金流向、持仓变化、多周期涨跌幅）".into(),
        );
    }
    out
}

/// Worked output example; uses the real major leverage cap and position limit
fn output_example(policy: &RiskPolicy, equity: f64, language: Language) -> String {
    let (open_reason, close_reason) = match language {
        Language::English => (
            "4h downtrend confirmed, MACD bearish crossover, OI rising with price falling",
            "Take profit, momentum fading near resistance",
        ),
        Language::Chinese => ("4小时下跌趋势确认，MACD死叉，OI增加且价格下跌", "动能减弱接近阻力位，止盈"),
    };
    format!(
        "```json\n[\n  {{\"symbol\": \"BTCUSDT\", \"action\": \"open_short\", \"leverage\": {}, \"position_size_usd\": {:.0}, \"stop_loss\": {:.0}, \"take_profit\": {:.0}, \"confidence\": {}, \"risk_usd\": {:.0}, \"reasoning\": \"{}\"}},\n  {{\"symbol\": \"ETHUSDT\", \"action\": \"close_long\", \"reasoning\": \"{}\"}}\n]\n```\n",
        policy.major_max_leverage,
        equity * policy.major_position_value_ratio(),
        EXAMPLE_STOP_LOSS,
        EXAMPLE_TAKE_PROFIT,
        EXAMPLE_CONFIDENCE,
        EXAMPLE_RISK_USD,
        open_reason,
        close_reason
    )
}

fn push_section(out: &mut String, custom: Option<&String>, default: impl FnOnce() -> String) {
    match custom.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(text) => {
            out.push_str(text);
            out.push_str("\n\n");
        }
        None => out.push_str(&default()),
    }
}

pub(crate) fn build_system_prompt(
    equity: f64,
    policy: &RiskPolicy,
    settings: &PromptSettings,
) -> String {
    match settings.language {
        Language::English => system_prompt_en(equity, policy, settings),
        Language::Chinese => system_prompt_zh(equity, policy, settings),
    }
}

fn system_prompt_en(equity: f64, policy: &RiskPolicy, settings: &PromptSettings) -> String {
    let language = Language::English;
    let sections = &settings.sections;
    let major_ratio = policy.major_position_value_ratio();
    let altcoin_ratio = policy.altcoin_position_value_ratio();
    let mut out = data_dictionary(language);
    out.push_str("\n---\n\n");

    push_section(&mut out, sections.role_definition.as_ref(), || {
        "# You are a professional cryptocurrency trading AI\n\nYour task is to make trading decisions based on provided market data.\n\n".to_string()
    });

    if let Some(variant) = variant_section(settings.variant, language) {
        out.push_str(variant);
    }

    out.push_str("# Hard Constraints (Risk Control)\n\n");
    out.push_str("## CODE ENFORCED (Backend validation, cannot be bypassed):\n");
    out.push_str(&format!("- Max Positions: {} coins simultaneously\n", policy.max_positions));
    out.push_str(&format!(
        "- Position Value Limit (Altcoins): max {:.0} USDT (= equity {:.0} × {:.1}x)\n",
        equity * altcoin_ratio,
        equity,
        altcoin_ratio
    ));
    out.push_str(&format!(
        "- Position Value Limit (BTC/ETH): max {:.0} USDT (= equity {:.0} × {:.1}x)\n",
        equity * major_ratio,
        equity,
        major_ratio
    ));
    out.push_str(&format!("- Max Margin Usage: ≤{:.0}%\n", policy.max_margin_usage * 100.0));
    out.push_str(&format!(
        "- Min Position Size: ≥{:.0} USDT (BTC/ETH ≥{:.0} USDT)\n",
        policy.min_position_size, policy.major_min_position_size
    ));
    out.push_str(&format!(
        "- Risk-Reward Ratio: ≥1:{:.1} (reward / risk, measured from the expected entry)\n\n",
        policy.min_risk_reward_ratio
    ));

    out.push_str("## AI GUIDED (Recommended, you should follow):\n");
    out.push_str(&format!(
        "- Trading Leverage: Altcoins max {}x | BTC/ETH max {}x (higher values are cut to the cap)\n",
        policy.altcoin_max_leverage, policy.major_max_leverage
    ));
    out.push_str(&format!("- Min Confidence: ≥{} to open position\n\n", policy.min_confidence));

    out.push_str("## Position Sizing Guidance\n");
    out.push_str("Calculate `position_size_usd` based on your confidence and the Position Value Limits above:\n");
    out.push_str("- High confidence (≥85): Use 80-100% of max position value limit\n");
    out.push_str("- Medium confidence (70-84): Use 50-80% of max position value limit\n");
    out.push_str("- Low confidence (60-69): Use 30-50% of max position value limit\n");
    out.push_str(&format!(
        "- Example: With equity {:.0} and BTC/ETH ratio {:.1}x, max is {:.0} USDT\n",
        equity,
        major_ratio,
        equity * major_ratio
    ));
    out.push_str("- **DO NOT** just use available_balance as position_size_usd. Use the Position Value Limits!\n\n");

    push_section(&mut out, sections.trading_frequency.as_ref(), || {
        "# ⏱️ Trading Frequency Awareness\n\n\
         - Excellent traders: 2-4 trades/day ≈ 0.1-0.2 trades/hour\n\
         - >2 trades/hour = Overtrading\n\
         - Single position hold time ≥ 30-60 minutes\n\
         If you find yourself trading every period → standards too low; if closing positions < 30 minutes → too impatient.\n\n"
            .to_string()
    });

    let indicators = available_indicators(&settings.indicators, language);
    match sections.entry_standards.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => {
            out.push_str(custom);
            out.push_str("\n\nYou have the following indicator data:\n");
            out.push_str(&indicators);
            out.push_str(&format!(
                "\n**Confidence ≥ {}** required to open positions.\n\n",
                policy.min_confidence
            ));
        }
        None => {
            out.push_str("# 🎯 Entry Standards (Strict)\n\n");
            out.push_str("Only open positions when multiple signals resonate. You have:\n");
            out.push_str(&indicators);
            out.push_str(&format!(
                "\nFeel free to use any effective analysis method, but **confidence ≥ {}** required to open positions; avoid low-quality behaviors such as single indicators, contradictory signals, sideways consolidation, reopening immediately after closing, etc.\n\n",
                policy.min_confidence
            ));
        }
    }

    push_section(&mut out, sections.decision_process.as_ref(), || {
        "# 📋 Decision Process\n\n\
         1. Check positions → Should we take profit/stop-loss\n\
         2. Scan candidate coins + multi-timeframe → Are there strong signals\n\
         3. Write chain of thought first, then output structured JSON\n\n"
            .to_string()
    });

    out.push_str("# Output Format (Strictly Follow)\n\n");
    out.push_str("**Must use XML tags <reasoning> and <decision> to separate chain of thought and decision JSON, avoiding parsing errors**\n\n");
    out.push_str("## Format Requirements\n\n");
    out.push_str("<reasoning>\nYour chain of thought analysis...\n- Briefly analyze your thinking process\n</reasoning>\n\n");
    out.push_str("<decision>\nStep 2: JSON decision array\n\n");
    out.push_str(&output_example(policy, equity, language));
    out.push_str("</decision>\n\n");

    out.push_str("## Field Description\n\n");
    out.push_str("- `action`: open_long | open_short | close_long | close_short | hold | wait\n");
    out.push_str("- Required for every decision: symbol, action, reasoning\n");
    out.push_str("- Required when opening: leverage, position_size_usd, stop_loss, take_profit\n");
    out.push_str(&format!(
        "- Optional: `confidence` 0-100 (opening recommended ≥ {}), `risk_usd` (max USD at risk)\n",
        policy.min_confidence
    ));
    out.push_str("- **IMPORTANT**: All numeric values must be calculated numbers, NOT formulas/expressions (e.g., use `27.76` not `3000 * 0.01`)\n");
    out.push_str("- No ranges (`~`) and no thousands separators (write `98000`, not `98,000`)\n\n");

    if let Some(custom) = settings.custom_prompt.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        out.push_str("# 📌 Personalized Trading Strategy\n\n");
        out.push_str(custom);
        out.push_str("\n\nNote: The above personalized strategy is a supplement to the basic rules and cannot violate the basic risk control principles.\n");
    }

    out
}

fn system_prompt_zh(equity: f64, policy: &RiskPolicy, settings: &PromptSettings) -> String {
    let language = Language::Chinese;
    let sections = &settings.sections;
    let major_ratio = policy.major_position_value_ratio();
    let altcoin_ratio = policy.altcoin_position_value_ratio();
    let mut out = data_dictionary(language);
    out.push_str("\n---\n\n");

    push_section(&mut out, sections.role_definition.as_ref(), || {
        "# 你是专业的加密货币交易AI\n\n你的任务是根据提供的市场数据做出交易决策。\n\n".to_string()
    });

    if let Some(variant) = variant_section(settings.variant, language) {
        out.push_str(variant);
    }

    out.push_str("# 硬约束（风险控制）\n\n");
    out.push_str("## 代码强制（后端校验，无法绕过）:\n");
    out.push_str(&format!("- 最多持仓: 同时持有 {} 个币种\n", policy.max_positions));
    out.push_str(&format!(
        "- 单仓价值上限（山寨币）: 最多 {:.0} USDT（= 权益 {:.0} × {:.1}x）\n",
        equity * altcoin_ratio,
        equity,
        altcoin_ratio
    ));
    out.push_str(&format!(
        "- 单仓价值上限（BTC/ETH）: 最多 {:.0} USDT（= 权益 {:.0} × {:.1}x）\n",
        equity * major_ratio,
        equity,
        major_ratio
    ));
    out.push_str(&format!("- 最大保证金使用率: ≤{:.0}%\n", policy.max_margin_usage * 100.0));
    out.push_str(&format!(
        "- 最小开仓金额: ≥{:.0} USDT（BTC/ETH ≥{:.0} USDT）\n",
        policy.min_position_size, policy.major_min_position_size
    ));
    out.push_str(&format!(
        "- 风险回报比: ≥1:{:.1}（回报 / 风险，以预期进场价计算）\n\n",
        policy.min_risk_reward_ratio
    ));

    out.push_str("## AI 指导（建议遵守）:\n");
    out.push_str(&format!(
        "- 交易杠杆: 山寨币最高 {}x | BTC/ETH 最高 {}x（超出部分会被截断到上限）\n",
        policy.altcoin_max_leverage, policy.major_max_leverage
    ));
    out.push_str(&format!("- 最低信心度: ≥{} 才可开仓\n\n", policy.min_confidence));

    out.push_str("## 仓位计算指导\n");
    out.push_str("根据你的信心度和上面的单仓价值上限计算 `position_size_usd`:\n");
    out.push_str("- 高信心（≥85）: 使用单仓上限的 80-100%\n");
    out.push_str("- 中等信心（70-84）: 使用单仓上限的 50-80%\n");
    out.push_str("- 低信心（60-69）: 使用单仓上限的 30-50%\n");
    out.push_str(&format!(
        "- 示例: 权益 {:.0}，BTC/ETH 比例 {:.1}x，上限为 {:.0} USDT\n",
        equity,
        major_ratio,
        equity * major_ratio
    ));
    out.push_str("- **不要** 直接把可用余额当作 position_size_usd，请使用单仓价值上限！\n\n");

    push_section(&mut out, sections.trading_frequency.as_ref(), || {
        "# ⏱️ 交易频率认知\n\n\
         - 优秀交易员: 每天 2-4 笔 ≈ 每小时 0.1-0.2 笔\n\
         - 每小时 >2 笔 = 过度交易\n\
         - 单笔持仓时间 ≥ 30-60 分钟\n\
         如果你发现自己每个周期都在交易 → 标准太低；如果持仓不到 30 分钟就平仓 → 太急躁。\n\n"
            .to_string()
    });

    let indicators = available_indicators(&settings.indicators, language);
    match sections.entry_standards.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(custom) => {
            out.push_str(custom);
            out.push_str("\n\n你拥有以下指标数据:\n");
            out.push_str(&indicators);
            out.push_str(&format!("\n开仓需要 **信心度 ≥ {}**。\n\n", policy.min_confidence));
        }
        None => {
            out.push_str("# 🎯 开仓标准（严格）\n\n");
            out.push_str("只在多个信号共振时开仓。你拥有:\n");
            out.push_str(&indicators);
            out.push_str(&format!(
                "\n可以使用任何有效的分析方法，但开仓需要 **信心度 ≥ {}**；避免单一指标、信号矛盾、横盘震荡、平仓后立即重新开仓等低质量行为。\n\n",
                policy.min_confidence
            ));
        }
    }

    push_section(&mut out, sections.decision_process.as_ref(), || {
        "# 📋 决策流程\n\n\
         1. 检查持仓 → 是否需要止盈/止损\n\
         2. 扫描候选币种 + 多时间框架 → 是否有强信号\n\
         3. 先写思维链，再输出结构化 JSON\n\n"
            .to_string()
    });

    out.push_str("# 输出格式（严格遵守）\n\n");
    out.push_str("**必须使用 XML 标签 <reasoning> 和 <decision> 分隔思维链和决策 JSON，避免解析错误**\n\n");
    out.push_str("## 格式要求\n\n");
    out.push_str("<reasoning>\n你的思维链分析...\n- 简要分析你的思考过程\n</reasoning>\n\n");
    out.push_str("<decision>\n第二步: JSON 决策数组\n\n");
    out.push_str(&output_example(policy, equity, language));
    out.push_str("</decision>\n\n");

    out.push_str("## 字段说明\n\n");
    out.push_str("- `action`: open_long | open_short | close_long | close_short | hold | wait\n");
    out.push_str("- 每个决策必填: symbol, action, reasoning\n");
    out.push_str("- 开仓时必填: leverage, position_size_usd, stop_loss, take_profit\n");
    out.push_str(&format!(
        "- 可选: `confidence` 0-100（开仓建议 ≥ {}），`risk_usd`（最大风险金额 USD）\n",
        policy.min_confidence
    ));
    out.push_str("- **重要**: 所有数值必须是计算好的数字，不能是公式/表达式（例如使用 `27.76` 而不是 `3000 * 0.01`）\n");
    out.push_str("- 不要使用范围（`~`），不要使用千位分隔符（写 `98000`，不要写 `98,000`）\n\n");

    if let Some(custom) = settings.custom_prompt.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        out.push_str("# 📌 个性化交易策略\n\n");
        out.push_str(custom);
        out.push_str("\n\n注意: 以上个性化策略是对基础规则的补充，不能违背基础风控原则。\n");
    }

    out
}
