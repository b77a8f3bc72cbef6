#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kpi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and traits for company key-metric derivation.
//!
//! This crate provides the foundational pieces the metrics engine builds on:
//!
//! - [`QuoteRecord`](types::QuoteRecord) / [`Resolved`](types::Resolved) - Provider snapshots and the unavailable sentinel
//! - [`resolve`](resolver::resolve) - First-usable-value lookup over candidate field names
//! - [`normalize`](statement::normalize) - Raw statement frames to [`StatementTable`](statement::StatementTable)s
//! - [`QuoteDataProvider`](provider::QuoteDataProvider) / [`StatementDataProvider`](provider::StatementDataProvider) - Provider capabilities

/// Error types for provider and configuration failures.
pub mod error;
/// Price-history frequency and statement period definitions.
pub mod frequency;
/// Provider traits for fetching company data.
pub mod provider;
/// Field resolution over quote records.
pub mod resolver;
/// Statement tables and their normalizer.
pub mod statement;
/// Core data types (Symbol, QuoteValue, QuoteRecord, Resolved, ...).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{KpiError, Result};
pub use frequency::{DataFrequency, HistoryRange, PeriodType};
pub use provider::{
    DataProvider, MarketDataProvider, PriceDataProvider, QuoteDataProvider, StatementDataProvider,
};
pub use resolver::{resolve, resolve_first, resolve_numeric};
pub use statement::{LINE_ITEM_COLUMN, Period, StatementTable, normalize, safe_val};
pub use types::{
    NOT_AVAILABLE, QuoteRecord, QuoteValue, Resolved, StatementKind, Symbol, float_repr,
};
