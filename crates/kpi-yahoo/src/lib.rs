#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kpi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance data provider that implements the
//! [`QuoteDataProvider`], [`StatementDataProvider`] and [`PriceDataProvider`]
//! traits from `kpi-core`.
//!
//! # Features
//!
//! - Full-info record flattened from the quote summary modules
//! - Fast quote from the chart endpoint
//! - Annual and quarterly statements from the fundamentals timeseries
//! - Price history using Yahoo Finance's chart API
//! - Built-in rate limiting (1 request per second by default)
//!
//! # Example
//!
//! ```no_run
//! use kpi_yahoo::YahooProvider;
//! use kpi_core::{QuoteDataProvider, Symbol};
//!
//! # async fn example() -> kpi_core::Result<()> {
//! let provider = YahooProvider::new();
//! let info = provider.full_info(&Symbol::new("RELIANCE.NS")).await?;
//! println!("Fetched {} fields", info.len());
//! # Ok(())
//! # }
//! ```

mod chart;
mod summary;
mod timeseries;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use kpi_core::{
    DataFrequency, DataProvider, HistoryRange, KpiError, PeriodType, PriceDataProvider,
    QuoteDataProvider, QuoteRecord, Result, StatementDataProvider, StatementKind, Symbol,
};
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::chart::{ChartResponse, build_chart_url, parse_fast_quote, parse_history};
use crate::summary::{QuoteSummaryResponse, build_summary_url, parse_full_info};
use crate::timeseries::{TimeseriesResponse, build_timeseries_url, parse_statement};

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance data provider.
///
/// Implements [`DataProvider`], [`QuoteDataProvider`], [`StatementDataProvider`]
/// and [`PriceDataProvider`].
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Rate-limited GET that maps HTTP failures and parses the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: &str, symbol: &Symbol) -> Result<T> {
        self.apply_rate_limit().await;
        debug!("Yahoo request: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KpiError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(KpiError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(KpiError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(KpiError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| KpiError::Parse(e.to_string()))
    }

    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<DataFrame> {
        let url = build_timeseries_url(symbol, kind, period_type, Utc::now().timestamp());
        let response: TimeseriesResponse = self.get(&url, symbol).await?;
        let df = parse_statement(symbol, kind, period_type, response)?;
        debug!(
            %symbol,
            %kind,
            line_items = df.height(),
            periods = df.width().saturating_sub(1),
            "Fetched statement"
        );
        Ok(df)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance quotes, financial statements and price history"
    }

    fn supported_frequencies(&self) -> &[DataFrequency] {
        &[
            DataFrequency::Minute,
            DataFrequency::FiveMinute,
            DataFrequency::FifteenMinute,
            DataFrequency::ThirtyMinute,
            DataFrequency::Hourly,
            DataFrequency::Daily,
            DataFrequency::Weekly,
            DataFrequency::Monthly,
        ]
    }
}

#[async_trait]
impl QuoteDataProvider for YahooProvider {
    async fn full_info(&self, symbol: &Symbol) -> Result<QuoteRecord> {
        let url = build_summary_url(symbol);
        let response: QuoteSummaryResponse = self.get(&url, symbol).await?;
        parse_full_info(symbol, response)
    }

    async fn fast_quote(&self, symbol: &Symbol) -> Result<QuoteRecord> {
        let url = build_chart_url(symbol, HistoryRange::OneYear, DataFrequency::Daily);
        let response: ChartResponse = self.get(&url, symbol).await?;
        parse_fast_quote(symbol, response)
    }
}

#[async_trait]
impl StatementDataProvider for YahooProvider {
    async fn balance_sheet(&self, symbol: &Symbol, period_type: PeriodType) -> Result<DataFrame> {
        self.fetch_statement(symbol, StatementKind::BalanceSheet, period_type)
            .await
    }

    async fn income_statement(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
    ) -> Result<DataFrame> {
        self.fetch_statement(symbol, StatementKind::IncomeStatement, period_type)
            .await
    }

    async fn cashflow(&self, symbol: &Symbol, period_type: PeriodType) -> Result<DataFrame> {
        self.fetch_statement(symbol, StatementKind::Cashflow, period_type)
            .await
    }
}

#[async_trait]
impl PriceDataProvider for YahooProvider {
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        range: HistoryRange,
        frequency: DataFrequency,
    ) -> Result<DataFrame> {
        if frequency.is_intraday()
            && !matches!(range, HistoryRange::OneDay | HistoryRange::FiveDays | HistoryRange::OneMonth)
        {
            return Err(KpiError::InvalidParameter(format!(
                "Intraday bars are only available for ranges up to 1mo, got {}",
                range.as_str()
            )));
        }

        let url = build_chart_url(symbol, range, frequency);
        let response: ChartResponse = self.get(&url, symbol).await?;
        parse_history(symbol, response)
    }
}
