#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kpi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Key-metric derivation and formatting.
//!
//! - [`MetricCatalog`](catalog::MetricCatalog) - Which metrics exist and how to find them
//! - [`derive_all`](engine::derive_all) - Resolves every catalog metric with first-success-wins fallback
//! - [`Formula`](formula::Formula) - Statement-derived fallbacks as data
//! - [`format_value`](format::format_value) - Name-driven display formatting
//! - [`CompanyProfile`](profile::CompanyProfile) - Descriptive company details

/// Metric catalog and built-in definitions.
pub mod catalog;
/// Metric derivation engine.
pub mod engine;
/// Value formatting.
pub mod format;
/// Statement-derived formulas.
pub mod formula;
/// Company profile extraction.
pub mod profile;

pub use catalog::{MetricCatalog, MetricDefinition, OtherMetric, names};
pub use engine::{MetricInputs, MetricSet, MetricSource, ResolvedMetric, derive_all, derive_metric};
pub use format::{
    Direction, FormattedMetric, PriceChange, format_metrics, format_statement_value, format_value,
    round_if_needed,
};
pub use formula::{Formula, Operand, Source};
pub use profile::{CompanyProfile, Officer};
