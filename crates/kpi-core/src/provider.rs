//! Provider traits for fetching company data.
//!
//! This module defines the capability traits a market-data provider can
//! implement:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`QuoteDataProvider`] - Full-info and fast-quote snapshots
//! - [`StatementDataProvider`] - Raw financial statements
//! - [`PriceDataProvider`] - Price history for charting

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    error::Result,
    frequency::{DataFrequency, HistoryRange, PeriodType},
    types::{QuoteRecord, StatementKind, Symbol},
};

/// Base trait for all data providers.
///
/// All data providers must implement this trait to provide basic metadata
/// about the provider and its capabilities.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Returns the price-history frequencies supported by this provider.
    fn supported_frequencies(&self) -> &[DataFrequency];
}

/// Provider for quote snapshots.
#[async_trait]
pub trait QuoteDataProvider: DataProvider {
    /// Fetches the rich company/quote snapshot.
    ///
    /// Slower and broader than [`fast_quote`](Self::fast_quote); fields may
    /// be missing.
    async fn full_info(&self, symbol: &Symbol) -> Result<QuoteRecord>;

    /// Fetches the cheap, narrower quote snapshot.
    async fn fast_quote(&self, symbol: &Symbol) -> Result<QuoteRecord>;
}

/// Provider for raw financial statements.
///
/// Statements are returned as wide frames (see
/// [`LINE_ITEM_COLUMN`](crate::statement::LINE_ITEM_COLUMN)). A provider that
/// does not offer a statement kind keeps the default implementation, which
/// returns an empty frame rather than an error.
#[async_trait]
pub trait StatementDataProvider: DataProvider {
    /// Fetches the balance sheet.
    async fn balance_sheet(&self, _symbol: &Symbol, _period_type: PeriodType) -> Result<DataFrame> {
        Ok(DataFrame::empty())
    }

    /// Fetches the income statement.
    async fn income_statement(
        &self,
        _symbol: &Symbol,
        _period_type: PeriodType,
    ) -> Result<DataFrame> {
        Ok(DataFrame::empty())
    }

    /// Fetches the cash-flow statement.
    async fn cashflow(&self, _symbol: &Symbol, _period_type: PeriodType) -> Result<DataFrame> {
        Ok(DataFrame::empty())
    }

    /// Fetches a statement by kind.
    async fn statement(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<DataFrame> {
        match kind {
            StatementKind::BalanceSheet => self.balance_sheet(symbol, period_type).await,
            StatementKind::IncomeStatement => self.income_statement(symbol, period_type).await,
            StatementKind::Cashflow => self.cashflow(symbol, period_type).await,
        }
    }
}

/// Provider for price history.
///
/// Price history feeds charting and indicator collaborators; the metrics
/// engine itself never reads it.
#[async_trait]
pub trait PriceDataProvider: DataProvider {
    /// Fetches OHLCV bars for a symbol.
    ///
    /// Returns a DataFrame with columns: symbol, date, open, high, low, close, volume, adjusted_close.
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
        frequency: DataFrequency,
    ) -> Result<DataFrame>;
}

/// A provider offering everything the metrics view needs.
pub trait MarketDataProvider: QuoteDataProvider + StatementDataProvider {}

impl<T: QuoteDataProvider + StatementDataProvider> MarketDataProvider for T {}
