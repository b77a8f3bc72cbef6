//! Display formatting for resolved metric values.
//!
//! The display style of a metric is inferred from its name: a fixed table of
//! keyword rules is matched case-insensitively against the name and the first
//! matching rule renders the value. Two names get special treatment ahead of
//! the table: `"Debt to Equity"` (fixed two decimals) and the price metrics,
//! which show the change against the previous close when a [`MetricSet`] is
//! supplied as context.

use chrono::DateTime;
use kpi_core::{NOT_AVAILABLE, QuoteValue, Resolved, float_repr};
use serde::Serialize;
use std::fmt;

use crate::catalog::names;
use crate::engine::MetricSet;

/// Metrics rendered with a change indicator against the previous close.
pub const PRICE_METRICS: [&str; 2] = [names::CURRENT_PRICE, names::OPEN];

/// A metric ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormattedMetric {
    /// Canonical metric name.
    pub name: String,
    /// Rendered value; may contain inline HTML for price changes.
    pub display: String,
}

/// Direction of a price move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Above the reference price.
    Up,
    /// Below the reference price.
    Down,
    /// Unchanged.
    Flat,
}

impl Direction {
    fn of(difference: f64) -> Self {
        if difference > 0.0 {
            Self::Up
        } else if difference < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// CSS color name.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Up => "green",
            Self::Down => "red",
            Self::Flat => "gray",
        }
    }

    /// Arrow glyph.
    #[must_use]
    pub const fn arrow(&self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "►",
        }
    }
}

/// Change of a price relative to a reference price.
///
/// `Display` renders the colored change span, e.g.
/// `<span style='color:green'>▲ +5.0 (+5.00%)</span>`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PriceChange {
    /// Absolute change.
    pub difference: f64,
    /// Relative change in percent; zero when the reference is zero.
    pub percent: f64,
    /// Direction of the change.
    pub direction: Direction,
}

impl PriceChange {
    /// Computes the change of `price` against `reference`.
    #[must_use]
    pub fn new(price: f64, reference: f64) -> Self {
        let difference = price - reference;
        let percent = if reference == 0.0 {
            0.0
        } else {
            difference / reference * 100.0
        };
        Self {
            difference,
            percent,
            direction: Direction::of(difference),
        }
    }
}

impl fmt::Display for PriceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = self.direction;
        write!(
            f,
            "<span style='color:{}'>{} ",
            direction.color(),
            direction.arrow()
        )?;
        match direction {
            Direction::Flat => write!(f, "0 (0.00%)")?,
            Direction::Up => write!(
                f,
                "+{} ({:+.2}%)",
                float_repr(round_if_needed(self.difference)),
                self.percent
            )?,
            Direction::Down => write!(
                f,
                "{} ({:+.2}%)",
                float_repr(round_if_needed(self.difference)),
                self.percent
            )?,
        }
        write!(f, "</span>")
    }
}

type Render = fn(&QuoteValue, f64) -> String;

struct FormatRule {
    keywords: &'static [&'static str],
    render: Render,
}

impl FormatRule {
    fn matches(&self, name: &str) -> bool {
        self.keywords.iter().any(|keyword| name.contains(keyword))
    }
}

/// Ordered keyword rules; the first match wins.
static RULES: &[FormatRule] = &[
    FormatRule {
        keywords: &["percent", "yield", "margins"],
        render: render_percent,
    },
    FormatRule {
        keywords: &["ratio", "pe"],
        render: render_plain,
    },
    FormatRule {
        keywords: &["date", "epoch", "yearend"],
        render: render_epoch_date,
    },
];

fn render_percent(_: &QuoteValue, v: f64) -> String {
    let percent = if v.abs() < 1.0 { v * 100.0 } else { v };
    format!("{percent:.2}%")
}

fn render_plain(value: &QuoteValue, v: f64) -> String {
    match value {
        QuoteValue::Int(i) => i.to_string(),
        _ => float_repr(round_if_needed(v)),
    }
}

fn render_epoch_date(value: &QuoteValue, v: f64) -> String {
    DateTime::from_timestamp(v.trunc() as i64, 0)
        .map_or_else(|| value.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

fn render_grouped(value: &QuoteValue, v: f64) -> String {
    match value {
        QuoteValue::Int(i) => group_thousands(*i),
        _ => group_decimal(&float_repr(round_if_needed(v))),
    }
}

/// Thousands-grouped rendering of a numeric value; `None` for non-numbers.
pub(crate) fn format_grouped(value: &QuoteValue) -> Option<String> {
    value.as_f64().map(|v| render_grouped(value, v))
}

/// Renders a resolved value for display under `name`.
///
/// `context` supplies the other resolved metrics; it is only consulted for
/// the price metrics. Never fails: unavailable values render as
/// [`NOT_AVAILABLE`] and non-numeric values as their plain string form.
#[must_use]
pub fn format_value(name: &str, value: &Resolved, context: Option<&MetricSet>) -> String {
    let Resolved::Value(raw) = value else {
        return NOT_AVAILABLE.to_string();
    };
    let Some(v) = raw.as_f64() else {
        return raw.to_string();
    };

    if name == names::DEBT_TO_EQUITY {
        return format!("{v:.2}");
    }

    if PRICE_METRICS.contains(&name) {
        let reference = context.and_then(|set| set.value(names::PREVIOUS_CLOSE).as_f64());
        if let Some(reference) = reference {
            let change = PriceChange::new(v, reference);
            return format!("{}<br>{change}", render_plain(raw, v));
        }
    }

    let lowered = name.to_lowercase();
    let render = RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map_or(render_grouped as Render, |rule| rule.render);
    render(raw, v)
}

/// Formats every metric of a set, with the set itself as context.
#[must_use]
pub fn format_metrics(metrics: &MetricSet) -> Vec<FormattedMetric> {
    metrics
        .iter()
        .map(|metric| FormattedMetric {
            name: metric.name.clone(),
            display: format_value(&metric.name, &metric.value, Some(metrics)),
        })
        .collect()
}

/// Rounds to three decimals only when the shortest decimal form has more
/// than three fractional digits.
#[must_use]
pub fn round_if_needed(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let repr = value.to_string();
    let decimals = repr.split_once('.').map_or(0, |(_, frac)| frac.len());
    if decimals > 3 {
        (value * 1000.0).round() / 1000.0
    } else {
        value
    }
}

/// Formats an integer with `,` thousands separators.
#[must_use]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Groups the integer part of a plain decimal string.
fn group_decimal(repr: &str) -> String {
    let (sign, unsigned) = repr
        .strip_prefix('-')
        .map_or(("", repr), |rest| ("-", rest));
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let Ok(int_value) = int_part.parse::<i64>() else {
        return repr.to_string();
    };

    let mut out = String::from(sign);
    out.push_str(&group_thousands(int_value));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Formats a statement cell: whole units, thousands-grouped; blank when absent.
#[must_use]
pub fn format_statement_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v.abs() < i64::MAX as f64 => group_thousands(v.round() as i64),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MetricCatalog;
    use crate::engine::{MetricInputs, derive_all};
    use kpi_core::{QuoteRecord, StatementTable};

    fn num(v: f64) -> Resolved {
        Resolved::from_f64(v)
    }

    fn int(v: i64) -> Resolved {
        Resolved::Value(QuoteValue::Int(v))
    }

    fn derive(full_info: &QuoteRecord) -> MetricSet {
        let empty = StatementTable::new();
        let inputs = MetricInputs {
            full_info,
            fast_quote: &QuoteRecord::empty(),
            balance_sheet: &empty,
            income_statement: &empty,
            cashflow: &empty,
        };
        derive_all(&MetricCatalog::default(), &inputs)
    }

    #[test]
    fn test_unavailable_marker_for_any_name() {
        for name in ["Current Price", "profitMargins", "exDividendDate", "Volume", ""] {
            assert_eq!(format_value(name, &Resolved::Unavailable, None), NOT_AVAILABLE);
        }
    }

    #[test]
    fn test_percentages_branch_on_magnitude() {
        assert_eq!(format_value("profitMargins", &num(0.153), None), "15.30%");
        assert_eq!(format_value("profitMargins", &num(15.3), None), "15.30%");
        assert_eq!(format_value("Dividend Yield", &num(-0.02), None), "-2.00%");
        assert_eq!(format_value("heldPercentInsiders", &num(0.5012), None), "50.12%");
    }

    #[test]
    fn test_ratio_and_pe() {
        assert_eq!(format_value("Current Ratio", &num(1.23456), None), "1.235");
        assert_eq!(format_value("PE Ratio", &num(22.5), None), "22.5");
        assert_eq!(format_value("forwardPE", &int(18), None), "18");
        // "Operating Margin" has no "margins" but does contain "pe"
        assert_eq!(format_value("Operating Margin", &num(0.25), None), "0.25");
    }

    #[test]
    fn test_epoch_dates() {
        assert_eq!(
            format_value("exDividendDate", &int(1_700_000_000), None),
            "2023-11-14"
        );
        assert_eq!(
            format_value("lastFiscalYearEnd", &num(1_711_843_200.0), None),
            "2024-03-31"
        );
        let text = Resolved::Value("soon".into());
        assert_eq!(format_value("exDividendDate", &text, None), "soon");
        // out of chrono's range: raw string, no panic
        let far = format_value("exDividendDate", &num(1e300), None);
        assert!(far.starts_with("1000"));
    }

    #[test]
    fn test_default_grouping() {
        assert_eq!(format_value("Market Cap", &int(2_345_678_901), None), "2,345,678,901");
        assert_eq!(format_value("Volume", &num(1234.56789), None), "1,234.568");
        assert_eq!(format_value("EBITDA", &num(-1_500_000.0), None), "-1,500,000.0");
        assert_eq!(format_value("Beta", &num(1.2), None), "1.2");
    }

    #[test]
    fn test_debt_to_equity_two_decimals() {
        assert_eq!(format_value(names::DEBT_TO_EQUITY, &num(41.3), None), "41.30");
        assert_eq!(format_value(names::DEBT_TO_EQUITY, &int(2), None), "2.00");
    }

    #[test]
    fn test_non_numeric_passes_through() {
        let text = Resolved::Value("Technology".into());
        assert_eq!(format_value("Sector", &text, None), "Technology");
    }

    #[test]
    fn test_round_if_needed() {
        assert_eq!(round_if_needed(1.23456), 1.235);
        assert_eq!(round_if_needed(1.2), 1.2);
        assert_eq!(round_if_needed(1.234), 1.234);
        assert_eq!(round_if_needed(-0.00049), -0.0);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(-1_234_567), "-1,234,567");
    }

    #[test]
    fn test_price_change_up() {
        let full_info = QuoteRecord::empty()
            .with("currentPrice", 105.0)
            .with("previousClose", 100.0);
        let metrics = derive(&full_info);

        let display = format_value(
            names::CURRENT_PRICE,
            metrics.value(names::CURRENT_PRICE),
            Some(&metrics),
        );
        assert!(display.starts_with("105.0<br>"));
        assert!(display.contains('▲'));
        assert!(display.contains("+5.0"));
        assert!(display.contains("+5.00%"));
        assert!(display.contains("color:green"));
    }

    #[test]
    fn test_price_change_down_and_flat() {
        let down = PriceChange::new(95.5, 100.0).to_string();
        assert_eq!(down, "<span style='color:red'>▼ -4.5 (-4.50%)</span>");

        let flat = PriceChange::new(100.0, 100.0).to_string();
        assert_eq!(flat, "<span style='color:gray'>► 0 (0.00%)</span>");
    }

    #[test]
    fn test_price_change_zero_reference() {
        let change = PriceChange::new(5.0, 0.0);
        assert_eq!(change.percent, 0.0);
        assert_eq!(change.direction, Direction::Up);
    }

    #[test]
    fn test_price_without_context_is_plain() {
        assert_eq!(format_value(names::OPEN, &num(101.25), None), "101.25");

        let metrics = derive(&QuoteRecord::empty().with("open", 101.25));
        assert_eq!(
            format_value(names::OPEN, metrics.value(names::OPEN), Some(&metrics)),
            "101.25"
        );
    }

    #[test]
    fn test_debt_to_equity_end_to_end_unavailable() {
        let metrics = derive(&QuoteRecord::empty().with("currentPrice", 10.0));
        assert_eq!(
            format_value(
                names::DEBT_TO_EQUITY,
                metrics.value(names::DEBT_TO_EQUITY),
                Some(&metrics)
            ),
            NOT_AVAILABLE
        );
    }

    #[test]
    fn test_format_metrics_keeps_order() {
        let metrics = derive(&QuoteRecord::empty().with("marketCap", 1_000_000_i64));
        let formatted = format_metrics(&metrics);
        assert_eq!(formatted.len(), metrics.len());
        assert_eq!(formatted[0].name, names::CURRENT_PRICE);
        let market_cap = formatted.iter().find(|m| m.name == names::MARKET_CAP).unwrap();
        assert_eq!(market_cap.display, "1,000,000");
    }

    #[test]
    fn test_format_statement_value() {
        assert_eq!(format_statement_value(Some(1_234_567.6)), "1,234,568");
        assert_eq!(format_statement_value(Some(-250.0)), "-250");
        assert_eq!(format_statement_value(None), "");
        assert_eq!(format_statement_value(Some(f64::NAN)), "");
    }
}
