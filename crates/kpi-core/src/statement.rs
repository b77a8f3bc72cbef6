//! Financial statement normalization.
//!
//! Providers hand statements over as wide [`DataFrame`]s: one `line_item`
//! string column plus one numeric column per fiscal period, with the period
//! label as the column name. [`normalize`] turns that into a
//! [`StatementTable`] keyed by [`Period`] and line item.
//!
//! Absent cells stay absent. Coercing them to zero is the job of [`safe_val`],
//! applied term by term inside formulas, so "not reported" and "reported as
//! zero" remain distinguishable until arithmetic happens.

use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{KpiError, Result};

/// Name of the column holding line-item labels in raw statement frames.
pub const LINE_ITEM_COLUMN: &str = "line_item";

/// A fiscal period, identified by its end date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period(NaiveDate);

impl Period {
    /// Creates a period ending on `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Creates a period from calendar parts.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses a provider period label.
    ///
    /// Accepts plain dates and timestamps whose first ten characters are an
    /// ISO date (`2024-09-30`, `2024-09-30 00:00:00`, `2024-09-30T00:00:00Z`).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let date = label.trim().get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(Self)
    }

    /// The period end date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A normalized financial statement: period → line item → value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    periods: BTreeMap<Period, BTreeMap<String, f64>>,
    #[serde(default)]
    line_items: Vec<String>,
}

impl StatementTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reported value, returning the table for chaining.
    #[must_use]
    pub fn with_value(mut self, period: Period, item: impl Into<String>, value: f64) -> Self {
        self.insert(period, item, value);
        self
    }

    /// Records a value. NaN is treated as "not reported" and only registers the period.
    pub fn insert(&mut self, period: Period, item: impl Into<String>, value: f64) {
        let cells = self.periods.entry(period).or_default();
        if value.is_nan() {
            return;
        }
        let item = item.into();
        if !self.line_items.contains(&item) {
            self.line_items.push(item.clone());
        }
        cells.insert(item, value);
    }

    /// Returns true if the table has no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// The most recent period present in this table.
    #[must_use]
    pub fn latest_period(&self) -> Option<Period> {
        self.periods.keys().next_back().copied()
    }

    /// Periods, most recent first.
    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.periods.keys().rev().copied()
    }

    /// All line items that appear in any period, in the order first reported.
    #[must_use]
    pub fn line_items(&self) -> Vec<&str> {
        self.line_items.iter().map(String::as_str).collect()
    }

    /// Value of `item` in `period`, if reported.
    #[must_use]
    pub fn get(&self, period: Period, item: &str) -> Option<f64> {
        self.periods.get(&period)?.get(item).copied()
    }

    /// Value of `item` in the latest period, if reported.
    #[must_use]
    pub fn latest(&self, item: &str) -> Option<f64> {
        self.get(self.latest_period()?, item)
    }
}

/// Returns 0 for an absent or NaN value, the value otherwise.
#[must_use]
pub fn safe_val(value: Option<f64>) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

/// Normalizes a raw wide statement frame into a [`StatementTable`].
///
/// An empty frame normalizes to an empty table. Period columns whose label
/// cannot be parsed are skipped. A non-empty frame without a
/// [`LINE_ITEM_COLUMN`] is a parse error.
pub fn normalize(raw: &DataFrame) -> Result<StatementTable> {
    if raw.width() == 0 || raw.height() == 0 {
        return Ok(StatementTable::new());
    }

    let items = raw.column(LINE_ITEM_COLUMN).map_err(|e| {
        KpiError::Parse(format!("statement has no `{LINE_ITEM_COLUMN}` column: {e}"))
    })?;
    let items = items.str()?;

    let mut table = StatementTable::new();
    for column in raw.get_columns() {
        let label = column.name().as_str();
        if label == LINE_ITEM_COLUMN {
            continue;
        }

        let Some(period) = Period::parse(label) else {
            warn!(label, "Skipping statement column with unparseable period");
            continue;
        };

        let values = column.cast(&DataType::Float64)?;
        let values = values.f64()?;

        table.periods.entry(period).or_default();
        for (item, value) in items.into_iter().zip(values.into_iter()) {
            if let (Some(item), Some(value)) = (item, value) {
                table.insert(period, item, value);
            }
        }
    }

    let rows: Vec<&str> = items.into_iter().flatten().collect();
    table
        .line_items
        .sort_by_key(|item| rows.iter().position(|row| row == item).unwrap_or(usize::MAX));

    debug!(
        periods = table.periods.len(),
        latest = ?table.latest_period(),
        "Normalized statement"
    );
    Ok(table)
}
