//! Key-metrics view: fetch, normalize, derive and format one company.

use std::sync::Arc;

use kpi_core::{
    MarketDataProvider, PeriodType, QuoteRecord, Result, StatementKind, StatementTable, Symbol,
    normalize, resolve,
};
use kpi_metrics::{
    CompanyProfile, MetricCatalog, MetricInputs, MetricSet, MetricSource, derive_all,
    format_metrics, format_value,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::grid::{StatementGrid, statement_grid};

/// Key metric cards per row.
pub const CARDS_PER_ROW: usize = 4;

/// Columns the secondary metrics are spread over.
pub const OTHER_METRIC_COLUMNS: usize = 3;

/// One key metric ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    /// Canonical metric name.
    pub name: String,
    /// Formatted value.
    pub display: String,
    /// Which strategy produced the value.
    pub source: MetricSource,
}

/// One secondary metric line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OtherMetricLine {
    /// Display label.
    pub label: String,
    /// Formatted value.
    pub display: String,
}

/// Everything the key-metrics page shows for one company.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsReport {
    /// Company symbol.
    pub symbol: Symbol,
    /// Resolved key metrics in catalog order.
    pub metrics: MetricSet,
    /// Key metric cards in rows of [`CARDS_PER_ROW`].
    pub key_metrics: Vec<Vec<MetricCard>>,
    /// Secondary metrics present in the full-info record, dealt round-robin
    /// over [`OTHER_METRIC_COLUMNS`] columns.
    pub other_metrics: [Vec<OtherMetricLine>; OTHER_METRIC_COLUMNS],
    /// Descriptive company details.
    pub profile: CompanyProfile,
    /// One grid per statement kind.
    pub statements: Vec<StatementGrid>,
    /// Sections whose fetch or normalization failed and were rendered empty.
    pub degraded: Vec<String>,
}

/// Renders key-metric reports from a market-data provider.
///
/// Provider failures never escape [`render`](Self::render): each failed
/// section is logged and replaced by an empty record or table, so affected
/// metrics show the unavailable marker while the rest of the report renders.
pub struct MetricsView {
    provider: Arc<dyn MarketDataProvider>,
    catalog: MetricCatalog,
    period_type: PeriodType,
}

impl std::fmt::Debug for MetricsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsView")
            .field("provider", &self.provider.name())
            .field("catalog_version", &self.catalog.version())
            .field("period_type", &self.period_type)
            .finish()
    }
}

impl MetricsView {
    /// Creates a view over `provider` with the built-in catalog and annual statements.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            catalog: MetricCatalog::default(),
            period_type: PeriodType::Annual,
        }
    }

    /// Creates a view backed by Yahoo Finance.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn yahoo() -> Self {
        Self::new(Arc::new(kpi_yahoo::YahooProvider::new()))
    }

    /// Replaces the metric catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: MetricCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Selects annual or quarterly statements.
    #[must_use]
    pub const fn with_period_type(mut self, period_type: PeriodType) -> Self {
        self.period_type = period_type;
        self
    }

    /// The catalog in use.
    #[must_use]
    pub const fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Fetches all sections concurrently and renders the report.
    #[instrument(skip(self), fields(provider = self.provider.name(), symbol = %symbol))]
    pub async fn render(&self, symbol: &Symbol) -> MetricsReport {
        let provider = &self.provider;
        let period_type = self.period_type;

        let (full_info, fast_quote, balance_sheet, income_statement, cashflow) = tokio::join!(
            provider.full_info(symbol),
            provider.fast_quote(symbol),
            provider.balance_sheet(symbol, period_type),
            provider.income_statement(symbol, period_type),
            provider.cashflow(symbol, period_type),
        );

        let mut degraded = Vec::new();
        let full_info = record_or_empty("full info", full_info, &mut degraded);
        let fast_quote = record_or_empty("fast quote", fast_quote, &mut degraded);
        let balance_sheet = table_or_empty(StatementKind::BalanceSheet, balance_sheet, &mut degraded);
        let income_statement =
            table_or_empty(StatementKind::IncomeStatement, income_statement, &mut degraded);
        let cashflow = table_or_empty(StatementKind::Cashflow, cashflow, &mut degraded);

        let inputs = MetricInputs {
            full_info: &full_info,
            fast_quote: &fast_quote,
            balance_sheet: &balance_sheet,
            income_statement: &income_statement,
            cashflow: &cashflow,
        };
        let metrics = derive_all(&self.catalog, &inputs);

        let key_metrics = key_metric_rows(&metrics);
        let other_metrics = self.other_metric_columns(&full_info);
        let statements = StatementKind::ALL
            .into_iter()
            .map(|kind| statement_grid(kind, inputs.statement(kind)))
            .collect();

        debug!(
            metrics = metrics.len(),
            available = metrics.iter().filter(|m| m.value.is_available()).count(),
            degraded = degraded.len(),
            "Rendered metrics report"
        );

        MetricsReport {
            symbol: symbol.clone(),
            profile: CompanyProfile::from_record(&full_info),
            metrics,
            key_metrics,
            other_metrics,
            statements,
            degraded,
        }
    }

    fn other_metric_columns(
        &self,
        full_info: &QuoteRecord,
    ) -> [Vec<OtherMetricLine>; OTHER_METRIC_COLUMNS] {
        let mut columns: [Vec<OtherMetricLine>; OTHER_METRIC_COLUMNS] = Default::default();
        let present = self.catalog.other_metrics().iter().filter_map(|metric| {
            let value = resolve(Some(full_info), &[metric.key.as_str()]);
            value.is_available().then(|| OtherMetricLine {
                label: metric.label.clone(),
                display: format_value(&metric.key, &value, None),
            })
        });
        for (i, line) in present.enumerate() {
            columns[i % OTHER_METRIC_COLUMNS].push(line);
        }
        columns
    }
}

fn key_metric_rows(metrics: &MetricSet) -> Vec<Vec<MetricCard>> {
    let cards: Vec<MetricCard> = format_metrics(metrics)
        .into_iter()
        .zip(metrics.iter())
        .map(|(formatted, metric)| MetricCard {
            name: formatted.name,
            display: formatted.display,
            source: metric.source,
        })
        .collect();
    cards.chunks(CARDS_PER_ROW).map(<[MetricCard]>::to_vec).collect()
}

fn record_or_empty(
    section: &str,
    result: Result<QuoteRecord>,
    degraded: &mut Vec<String>,
) -> QuoteRecord {
    result.unwrap_or_else(|e| {
        warn!(section, error = %e, "Section unavailable, continuing without it");
        degraded.push(section.to_string());
        QuoteRecord::empty()
    })
}

fn table_or_empty(
    kind: StatementKind,
    result: Result<DataFrame>,
    degraded: &mut Vec<String>,
) -> StatementTable {
    match result.and_then(|df| normalize(&df)) {
        Ok(table) => table,
        Err(e) => {
            warn!(section = %kind, error = %e, "Section unavailable, continuing without it");
            degraded.push(kind.to_string());
            StatementTable::new()
        }
    }
}
