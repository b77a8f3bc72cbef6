//! Price-history granularity, history range and statement period definitions.
//!
//! [`DataFrequency`] and [`HistoryRange`] describe the price history handed to
//! charting collaborators; [`PeriodType`] selects annual or quarterly
//! financial statements.

use serde::{Deserialize, Serialize};

/// Frequency/granularity of price history bars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFrequency {
    /// One-minute bars.
    Minute,
    /// Five-minute bars.
    FiveMinute,
    /// Fifteen-minute bars.
    FifteenMinute,
    /// Thirty-minute bars.
    ThirtyMinute,
    /// Hourly bars.
    Hourly,
    /// Daily bars.
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl DataFrequency {
    /// Returns true if this is an intraday frequency (minute through hourly).
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(
            self,
            Self::Minute | Self::FiveMinute | Self::FifteenMinute | Self::ThirtyMinute | Self::Hourly
        )
    }
}

/// Lookback window for price history, counted back from today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    /// The current trading day.
    OneDay,
    /// Five trading days.
    FiveDays,
    /// One month.
    OneMonth,
    /// Three months.
    ThreeMonths,
    /// Six months.
    SixMonths,
    /// One year.
    #[default]
    OneYear,
    /// Two years.
    TwoYears,
    /// Five years.
    FiveYears,
    /// Ten years.
    TenYears,
    /// Year to date.
    YearToDate,
    /// Everything the provider has.
    Max,
}

impl HistoryRange {
    /// Short provider-neutral label (`1d`, `1y`, `ytd`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }
}

/// Period type for financial statements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}
