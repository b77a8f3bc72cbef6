//! Metric derivation engine.
//!
//! Each catalog metric is resolved through an ordered list of strategies:
//! the full-info record, then the fast quote, then the metric's statement
//! formula. The first strategy that yields a finite number wins; later ones
//! are never evaluated. Every catalog entry produces exactly one
//! [`ResolvedMetric`], which is either a number or
//! [`Resolved::Unavailable`].

use kpi_core::{QuoteRecord, Resolved, StatementKind, StatementTable, resolve_numeric};
use serde::Serialize;
use tracing::debug;

use crate::catalog::{MetricCatalog, MetricDefinition};
use crate::formula::Formula;

/// Everything a derivation pass reads, borrowed for the duration of one render.
#[derive(Clone, Copy, Debug)]
pub struct MetricInputs<'a> {
    /// The rich company/quote snapshot.
    pub full_info: &'a QuoteRecord,
    /// The cheap quote snapshot.
    pub fast_quote: &'a QuoteRecord,
    /// Normalized balance sheet.
    pub balance_sheet: &'a StatementTable,
    /// Normalized income statement.
    pub income_statement: &'a StatementTable,
    /// Normalized cash-flow statement.
    pub cashflow: &'a StatementTable,
}

impl<'a> MetricInputs<'a> {
    /// The normalized table for a statement kind.
    #[must_use]
    pub const fn statement(&self, kind: StatementKind) -> &'a StatementTable {
        match kind {
            StatementKind::BalanceSheet => self.balance_sheet,
            StatementKind::IncomeStatement => self.income_statement,
            StatementKind::Cashflow => self.cashflow,
        }
    }
}

/// Which strategy produced a metric's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// Read from the full-info record.
    FullInfo,
    /// Read from the fast-quote record.
    FastQuote,
    /// Computed from the latest statements.
    Derived,
    /// Nothing produced a value.
    Unavailable,
}

/// The final value chosen for one catalog metric.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedMetric {
    /// Canonical metric name.
    pub name: String,
    /// The number, or the unavailable sentinel.
    pub value: Resolved,
    /// Which strategy produced the value.
    pub source: MetricSource,
}

/// Resolved metrics in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricSet {
    metrics: Vec<ResolvedMetric>,
}

impl MetricSet {
    /// Looks up a metric by canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedMetric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// The resolved value of a metric; unknown names are unavailable.
    #[must_use]
    pub fn value(&self, name: &str) -> &Resolved {
        const UNAVAILABLE: &Resolved = &Resolved::Unavailable;
        self.get(name).map_or(UNAVAILABLE, |m| &m.value)
    }

    /// Iterates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedMetric> {
        self.metrics.iter()
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl FromIterator<ResolvedMetric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = ResolvedMetric>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MetricSet {
    type Item = &'a ResolvedMetric;
    type IntoIter = std::slice::Iter<'a, ResolvedMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}

/// One way of producing a metric value.
#[derive(Clone, Copy, Debug)]
enum Strategy<'c> {
    FullInfo,
    FastQuote,
    Formula(&'c Formula),
}

impl Strategy<'_> {
    fn attempt(&self, definition: &MetricDefinition, inputs: &MetricInputs<'_>) -> Resolved {
        let keys = definition.candidate_keys.as_slice();
        match self {
            Self::FullInfo => resolve_numeric(Some(inputs.full_info), keys),
            Self::FastQuote => resolve_numeric(Some(inputs.fast_quote), keys),
            Self::Formula(formula) => formula.evaluate(inputs),
        }
    }

    const fn source(&self) -> MetricSource {
        match self {
            Self::FullInfo => MetricSource::FullInfo,
            Self::FastQuote => MetricSource::FastQuote,
            Self::Formula(_) => MetricSource::Derived,
        }
    }
}

fn strategies(definition: &MetricDefinition) -> impl Iterator<Item = Strategy<'_>> {
    [Strategy::FullInfo, Strategy::FastQuote]
        .into_iter()
        .chain(definition.formula.as_ref().map(Strategy::Formula))
}

/// Resolves a single metric definition.
#[must_use]
pub fn derive_metric(definition: &MetricDefinition, inputs: &MetricInputs<'_>) -> ResolvedMetric {
    let (value, source) = strategies(definition)
        .find_map(|strategy| {
            let value = strategy.attempt(definition, inputs);
            value.is_available().then(|| (value, strategy.source()))
        })
        .unwrap_or((Resolved::Unavailable, MetricSource::Unavailable));

    debug!(metric = %definition.name, ?source, "Resolved metric");

    ResolvedMetric {
        name: definition.name.clone(),
        value,
        source,
    }
}

/// Resolves every key metric of the catalog, in catalog order.
#[must_use]
pub fn derive_all(catalog: &MetricCatalog, inputs: &MetricInputs<'_>) -> MetricSet {
    catalog
        .key_metrics()
        .iter()
        .map(|definition| derive_metric(definition, inputs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::names;
    use crate::formula::{Operand, Source};
    use kpi_core::{Period, QuoteValue};

    fn fy(year: i32) -> Period {
        Period::from_ymd(year, 3, 31).unwrap()
    }

    fn derive(
        full_info: &QuoteRecord,
        fast_quote: &QuoteRecord,
        balance_sheet: &StatementTable,
        income_statement: &StatementTable,
        cashflow: &StatementTable,
    ) -> MetricSet {
        let inputs = MetricInputs {
            full_info,
            fast_quote,
            balance_sheet,
            income_statement,
            cashflow,
        };
        derive_all(&MetricCatalog::default(), &inputs)
    }

    #[test]
    fn test_every_catalog_metric_resolves_once() {
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &QuoteRecord::empty(),
            &empty,
            &empty,
            &empty,
        );

        let catalog = MetricCatalog::default();
        assert_eq!(set.len(), catalog.key_metrics().len());
        for (metric, definition) in set.iter().zip(catalog.key_metrics()) {
            assert_eq!(metric.name, definition.name);
            assert_eq!(metric.value, Resolved::Unavailable);
            assert_eq!(metric.source, MetricSource::Unavailable);
        }
    }

    #[test]
    fn test_debt_to_equity_zero_equity_is_unavailable() {
        let balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Total Debt", 500.0)
            .with_value(fy(2024), "Stockholders Equity", 0.0);
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &QuoteRecord::empty(),
            &balance_sheet,
            &empty,
            &empty,
        );

        assert_eq!(set.value(names::DEBT_TO_EQUITY), &Resolved::Unavailable);
    }

    #[test]
    fn test_debt_to_equity_from_statements() {
        let balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Total Debt", 500.0)
            .with_value(fy(2024), "Stockholders Equity", 250.0);
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &QuoteRecord::empty(),
            &balance_sheet,
            &empty,
            &empty,
        );

        let metric = set.get(names::DEBT_TO_EQUITY).unwrap();
        assert_eq!(metric.value.as_f64(), Some(2.0));
        assert_eq!(metric.source, MetricSource::Derived);
    }

    #[test]
    fn test_full_info_wins_over_statements() {
        let full_info = QuoteRecord::empty().with("debtToEquity", 41.3);
        let balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Total Debt", 500.0)
            .with_value(fy(2024), "Stockholders Equity", 250.0);
        let empty = StatementTable::new();
        let set = derive(&full_info, &QuoteRecord::empty(), &balance_sheet, &empty, &empty);

        let metric = set.get(names::DEBT_TO_EQUITY).unwrap();
        assert_eq!(metric.value.as_f64(), Some(41.3));
        assert_eq!(metric.source, MetricSource::FullInfo);
    }

    #[test]
    fn test_formula_not_evaluated_when_record_supplies_value() {
        // A formula over inputs that do not exist anywhere; it would resolve
        // to Unavailable if it ever ran.
        let definition = MetricDefinition::new("Widget Ratio", ["widgetRatio"]).with_formula(
            Formula::Ratio {
                numerator: Operand::from(Source::info("missing")),
                denominator: Operand::from(Source::info("alsoMissing")),
            },
        );
        let full_info = QuoteRecord::empty().with("widgetRatio", 0_i64);
        let empty = StatementTable::new();
        let inputs = MetricInputs {
            full_info: &full_info,
            fast_quote: &QuoteRecord::empty(),
            balance_sheet: &empty,
            income_statement: &empty,
            cashflow: &empty,
        };

        let metric = derive_metric(&definition, &inputs);
        assert_eq!(metric.value, Resolved::Value(QuoteValue::Int(0)));
        assert_eq!(metric.source, MetricSource::FullInfo);
    }

    #[test]
    fn test_fast_quote_fallback() {
        let full_info = QuoteRecord::empty().with("previousClose", QuoteValue::Null);
        let fast_quote = QuoteRecord::empty().with("previousClose", 99.5);
        let empty = StatementTable::new();
        let set = derive(&full_info, &fast_quote, &empty, &empty, &empty);

        let metric = set.get(names::PREVIOUS_CLOSE).unwrap();
        assert_eq!(metric.value.as_f64(), Some(99.5));
        assert_eq!(metric.source, MetricSource::FastQuote);
    }

    #[test]
    fn test_text_values_are_not_metrics() {
        let full_info = QuoteRecord::empty().with("beta", "high");
        let empty = StatementTable::new();
        let set = derive(&full_info, &QuoteRecord::empty(), &empty, &empty, &empty);
        assert_eq!(set.value(names::BETA), &Resolved::Unavailable);
    }

    #[test]
    fn test_text_candidate_does_not_hide_later_number() {
        let full_info = QuoteRecord::empty()
            .with("trailingPE", "Infinity")
            .with("forwardPE", 18.2);
        let fast_quote = QuoteRecord::empty().with("trailingPE", 99.0);
        let empty = StatementTable::new();
        let set = derive(&full_info, &fast_quote, &empty, &empty, &empty);

        let pe = set.get(names::PE_RATIO).unwrap();
        assert_eq!(pe.value.as_f64(), Some(18.2));
        assert_eq!(pe.source, MetricSource::FullInfo);
    }

    #[test]
    fn test_statements_use_their_own_latest_period() {
        let income_statement = StatementTable::new()
            .with_value(fy(2024), "Net Income", 120.0)
            .with_value(fy(2023), "Net Income", 999.0);
        let balance_sheet = StatementTable::new()
            .with_value(fy(2023), "Total Assets", 1_200.0)
            .with_value(fy(2022), "Total Assets", 1.0);
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &QuoteRecord::empty(),
            &balance_sheet,
            &income_statement,
            &empty,
        );

        assert_eq!(set.value(names::RETURN_ON_ASSETS).as_f64(), Some(0.1));
    }

    #[test]
    fn test_ebitda_and_current_ratio_fallbacks() {
        let income_statement = StatementTable::new()
            .with_value(fy(2024), "Operating Revenue", 1_000.0)
            .with_value(fy(2024), "Selling General And Administration", 200.0)
            .with_value(fy(2024), "Other Non Interest Expense", 50.0)
            .with_value(fy(2024), "Occupancy And Equipment", 25.0)
            .with_value(fy(2024), "Depreciation And Amortization In Income Statement", 75.0);
        let balance_sheet = StatementTable::new()
            .with_value(fy(2024), "Cash And Cash Equivalents", 300.0)
            .with_value(fy(2024), "Accounts Receivable", 200.0)
            .with_value(fy(2024), "Accounts Payable", 250.0);
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &QuoteRecord::empty(),
            &balance_sheet,
            &income_statement,
            &empty,
        );

        assert_eq!(set.value(names::EBITDA).as_f64(), Some(800.0));
        assert_eq!(set.value(names::CURRENT_RATIO).as_f64(), Some(2.0));
    }

    #[test]
    fn test_free_cashflow_mixes_info_and_statement() {
        let full_info = QuoteRecord::empty().with("operatingCashflow", 900_i64);
        let cashflow = StatementTable::new().with_value(fy(2024), "Capital Expenditure", 150.0);
        let empty = StatementTable::new();
        let set = derive(&full_info, &QuoteRecord::empty(), &empty, &empty, &cashflow);

        assert_eq!(set.value(names::FREE_CASHFLOW).as_f64(), Some(750.0));
    }

    #[test]
    fn test_price_to_sales_uses_fast_market_cap() {
        let fast_quote = QuoteRecord::empty().with("marketCap", 5_000_i64);
        let income_statement = StatementTable::new().with_value(fy(2024), "Total Revenue", 1_000.0);
        let empty = StatementTable::new();
        let set = derive(
            &QuoteRecord::empty(),
            &fast_quote,
            &empty,
            &income_statement,
            &empty,
        );

        assert_eq!(set.value(names::PRICE_TO_SALES).as_f64(), Some(5.0));
    }

    #[test]
    fn test_unknown_metric_value_is_unavailable() {
        let set = MetricSet::default();
        assert_eq!(set.value("Nope"), &Resolved::Unavailable);
    }
}
