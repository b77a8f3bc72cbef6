//! Statement-derived fallback formulas.
//!
//! A [`Formula`] is plain data so that catalogs can be loaded from
//! configuration. Its inputs are [`Operand`]s, each an ordered list of
//! [`Source`]s: a provider field first, then a statement line item, and so on.
//!
//! Operand evaluation takes the first source that reports a non-zero value.
//! If every reporting source says zero, the operand is zero; if none reports
//! at all, the operand is absent and the formula resolves to
//! [`Resolved::Unavailable`].

use kpi_core::{Resolved, StatementKind, safe_val};
use serde::{Deserialize, Serialize};

use crate::engine::MetricInputs;

/// Where an operand value comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// A field of the full-info record.
    Info(String),
    /// A field of the fast-quote record.
    Fast(String),
    /// A line item of the latest balance sheet period.
    BalanceSheet(String),
    /// A line item of the latest income statement period.
    IncomeStatement(String),
    /// A line item of the latest cash-flow statement period.
    Cashflow(String),
}

impl Source {
    /// Full-info field source.
    #[must_use]
    pub fn info(key: impl Into<String>) -> Self {
        Self::Info(key.into())
    }

    /// Fast-quote field source.
    #[must_use]
    pub fn fast(key: impl Into<String>) -> Self {
        Self::Fast(key.into())
    }

    /// Statement line-item source.
    #[must_use]
    pub fn statement(kind: StatementKind, item: impl Into<String>) -> Self {
        match kind {
            StatementKind::BalanceSheet => Self::BalanceSheet(item.into()),
            StatementKind::IncomeStatement => Self::IncomeStatement(item.into()),
            StatementKind::Cashflow => Self::Cashflow(item.into()),
        }
    }

    fn value(&self, inputs: &MetricInputs<'_>) -> Option<f64> {
        let value = match self {
            Self::Info(key) => inputs.full_info.get(key).and_then(|v| v.as_f64()),
            Self::Fast(key) => inputs.fast_quote.get(key).and_then(|v| v.as_f64()),
            Self::BalanceSheet(item) => inputs.balance_sheet.latest(item),
            Self::IncomeStatement(item) => inputs.income_statement.latest(item),
            Self::Cashflow(item) => inputs.cashflow.latest(item),
        };
        value.filter(|v| v.is_finite())
    }
}

/// An ordered chain of sources for one formula input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operand(Vec<Source>);

impl Operand {
    /// Builds an operand from sources in priority order.
    #[must_use]
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        Self(sources.into_iter().collect())
    }

    /// The sources, in priority order.
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.0
    }

    /// First non-zero reported value, else a reported zero, else `None`.
    #[must_use]
    pub fn evaluate(&self, inputs: &MetricInputs<'_>) -> Option<f64> {
        let mut zero = None;
        for source in &self.0 {
            match source.value(inputs) {
                Some(v) if v != 0.0 => return Some(v),
                Some(v) => {
                    zero.get_or_insert(v);
                }
                None => {}
            }
        }
        zero
    }
}

impl From<Source> for Operand {
    fn from(source: Source) -> Self {
        Self(vec![source])
    }
}

/// A named arithmetic shape evaluated against the latest statement periods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// `numerator / denominator`.
    Ratio {
        /// Dividend.
        numerator: Operand,
        /// Divisor; zero makes the result unavailable.
        denominator: Operand,
    },
    /// `minuend - subtrahend`.
    Difference {
        /// Value subtracted from.
        minuend: Operand,
        /// Value subtracted.
        subtrahend: Operand,
    },
    /// `sum(add) - sum(subtract)`, each term coerced through [`safe_val`].
    SafeSum {
        /// Terms added.
        add: Vec<Operand>,
        /// Terms subtracted.
        #[serde(default)]
        subtract: Vec<Operand>,
    },
    /// `sum(numerator) / sum(denominator)`, each term coerced through [`safe_val`].
    SumRatio {
        /// Terms summed into the dividend.
        numerator: Vec<Operand>,
        /// Terms summed into the divisor.
        denominator: Vec<Operand>,
    },
}

impl Formula {
    /// Evaluates the formula. Missing inputs, zero divisors and non-finite
    /// results all yield [`Resolved::Unavailable`].
    #[must_use]
    pub fn evaluate(&self, inputs: &MetricInputs<'_>) -> Resolved {
        let value = match self {
            Self::Ratio {
                numerator,
                denominator,
            } => divide(numerator.evaluate(inputs), denominator.evaluate(inputs)),
            Self::Difference {
                minuend,
                subtrahend,
            } => match (minuend.evaluate(inputs), subtrahend.evaluate(inputs)) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            },
            Self::SafeSum { add, subtract } => safe_sum(add, subtract, inputs),
            Self::SumRatio {
                numerator,
                denominator,
            } => {
                let numerator = safe_sum(numerator, &[], inputs).filter(|v| *v != 0.0);
                divide(numerator, safe_sum(denominator, &[], inputs))
            }
        };
        value.map_or(Resolved::Unavailable, Resolved::from_f64)
    }
}

fn divide(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Signed sum of the terms, or `None` when no term is reported at all.
fn safe_sum(add: &[Operand], subtract: &[Operand], inputs: &MetricInputs<'_>) -> Option<f64> {
    let terms = add
        .iter()
        .map(|operand| (1.0, operand))
        .chain(subtract.iter().map(|operand| (-1.0, operand)));

    let mut reported = false;
    let mut total = 0.0;
    for (sign, operand) in terms {
        let value = operand.evaluate(inputs);
        reported |= value.is_some();
        total += sign * safe_val(value);
    }
    reported.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_core::{Period, QuoteRecord, StatementTable};

    struct Fixture {
        full_info: QuoteRecord,
        fast_quote: QuoteRecord,
        balance_sheet: StatementTable,
        income_statement: StatementTable,
        cashflow: StatementTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                full_info: QuoteRecord::empty(),
                fast_quote: QuoteRecord::empty(),
                balance_sheet: StatementTable::new(),
                income_statement: StatementTable::new(),
                cashflow: StatementTable::new(),
            }
        }

        fn inputs(&self) -> MetricInputs<'_> {
            MetricInputs {
                full_info: &self.full_info,
                fast_quote: &self.fast_quote,
                balance_sheet: &self.balance_sheet,
                income_statement: &self.income_statement,
                cashflow: &self.cashflow,
            }
        }
    }

    fn fy(year: i32) -> Period {
        Period::from_ymd(year, 3, 31).unwrap()
    }

    fn bs(item: &str) -> Operand {
        Source::statement(StatementKind::BalanceSheet, item).into()
    }

    #[test]
    fn test_operand_prefers_first_non_zero() {
        let mut fixture = Fixture::new();
        fixture.full_info = QuoteRecord::empty().with("netIncomeToCommon", 0_i64);
        fixture.income_statement = StatementTable::new().with_value(fy(2024), "Net Income", 42.0);

        let operand = Operand::new([
            Source::info("netIncomeToCommon"),
            Source::statement(StatementKind::IncomeStatement, "Net Income"),
        ]);
        assert_eq!(operand.evaluate(&fixture.inputs()), Some(42.0));
    }

    #[test]
    fn test_operand_reported_zero_is_kept() {
        let mut fixture = Fixture::new();
        fixture.balance_sheet = StatementTable::new().with_value(fy(2024), "Total Debt", 0.0);
        assert_eq!(bs("Total Debt").evaluate(&fixture.inputs()), Some(0.0));
        assert_eq!(bs("Total Assets").evaluate(&fixture.inputs()), None);
    }

    #[test]
    fn test_statement_sources_read_latest_period() {
        let mut fixture = Fixture::new();
        fixture.balance_sheet = StatementTable::new()
            .with_value(fy(2023), "Total Debt", 100.0)
            .with_value(fy(2024), "Total Debt", 300.0);
        assert_eq!(bs("Total Debt").evaluate(&fixture.inputs()), Some(300.0));
    }

    #[test]
    fn test_ratio_zero_denominator() {
        let mut fixture = Fixture::new();
        fixture.balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Total Debt", 500.0)
            .with_value(fy(2024), "Stockholders Equity", 0.0);

        let formula = Formula::Ratio {
            numerator: bs("Total Debt"),
            denominator: bs("Stockholders Equity"),
        };
        assert_eq!(formula.evaluate(&fixture.inputs()), Resolved::Unavailable);
    }

    #[test]
    fn test_difference_requires_both_operands() {
        let mut fixture = Fixture::new();
        fixture.full_info = QuoteRecord::empty().with("operatingCashflow", 1_000_i64);

        let formula = Formula::Difference {
            minuend: Source::info("operatingCashflow").into(),
            subtrahend: Source::info("capitalExpenditures").into(),
        };
        assert_eq!(formula.evaluate(&fixture.inputs()), Resolved::Unavailable);

        fixture.full_info.insert("capitalExpenditures", -250_i64);
        assert_eq!(formula.evaluate(&fixture.inputs()).as_f64(), Some(1_250.0));
    }

    #[test]
    fn test_safe_sum_coerces_missing_terms() {
        let mut fixture = Fixture::new();
        fixture.income_statement = StatementTable::new()
            .with_value(fy(2024), "Operating Revenue", 1_000.0)
            .with_value(fy(2024), "Selling General And Administration", 300.0);

        let formula = Formula::SafeSum {
            add: vec![
                Source::statement(StatementKind::IncomeStatement, "Operating Revenue").into(),
                Source::statement(StatementKind::IncomeStatement, "Depreciation").into(),
            ],
            subtract: vec![
                Source::statement(
                    StatementKind::IncomeStatement,
                    "Selling General And Administration",
                )
                .into(),
            ],
        };
        assert_eq!(formula.evaluate(&fixture.inputs()).as_f64(), Some(700.0));

        let empty = Fixture::new();
        assert_eq!(formula.evaluate(&empty.inputs()), Resolved::Unavailable);
    }

    #[test]
    fn test_sum_ratio_zero_sums() {
        let mut fixture = Fixture::new();
        fixture.balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Cash And Cash Equivalents", 300.0)
            .with_value(fy(2024), "Accounts Receivable", 100.0)
            .with_value(fy(2024), "Accounts Payable", 200.0);

        let formula = Formula::SumRatio {
            numerator: vec![bs("Cash And Cash Equivalents"), bs("Accounts Receivable")],
            denominator: vec![bs("Accounts Payable"), bs("Other Payable")],
        };
        assert_eq!(formula.evaluate(&fixture.inputs()).as_f64(), Some(2.0));

        let no_liabilities = Formula::SumRatio {
            numerator: vec![bs("Cash And Cash Equivalents")],
            denominator: vec![bs("Other Payable")],
        };
        assert_eq!(no_liabilities.evaluate(&fixture.inputs()), Resolved::Unavailable);
    }

    #[test]
    fn test_formula_json_shape() {
        let formula: Formula = serde_json::from_str(
            r#"{
                "kind": "ratio",
                "numerator": [{"info": "netIncomeToCommon"}, {"income_statement": "Net Income"}],
                "denominator": [{"income_statement": "Total Revenue"}]
            }"#,
        )
        .unwrap();

        let Formula::Ratio { numerator, .. } = &formula else {
            panic!("expected a ratio");
        };
        assert_eq!(numerator.sources().len(), 2);
        assert_eq!(numerator.sources()[0], Source::info("netIncomeToCommon"));
    }
}
