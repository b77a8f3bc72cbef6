#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kpi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Company key metrics from market data.
//!
//! This crate ties the `kpi` workspace together. It re-exports the core types,
//! the metrics engine and the provider implementations, and provides
//! [`MetricsView`], which fetches one company's data, derives its key metrics
//! and lays them out for display.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance provider (enabled by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use kpi::{MetricsView, PeriodType, Symbol};
//!
//! #[tokio::main]
//! async fn main() {
//!     let view = MetricsView::yahoo().with_period_type(PeriodType::Quarterly);
//!     let report = view.render(&Symbol::new("RELIANCE.NS")).await;
//!
//!     for row in &report.key_metrics {
//!         for card in row {
//!             println!("{}: {}", card.name, card.display);
//!         }
//!     }
//! }
//! ```

// Core types and traits
pub use kpi_core::*;

// Metrics engine
pub use kpi_metrics::{
    CompanyProfile, Formula, FormattedMetric, MetricCatalog, MetricDefinition, MetricInputs,
    MetricSet, MetricSource, Officer, Operand, OtherMetric, ResolvedMetric, Source, derive_all,
    format_statement_value, format_value, names,
};

// Providers
#[cfg(feature = "yahoo")]
pub use kpi_yahoo::YahooProvider;

mod grid;
mod view;
pub use grid::{StatementGrid, StatementRow, statement_grid};
pub use view::{
    CARDS_PER_ROW, MetricCard, MetricsReport, MetricsView, OTHER_METRIC_COLUMNS, OtherMetricLine,
};
