//! Core data types for quote records and resolved values.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`QuoteValue`] - A single field value from a provider snapshot
//! - [`QuoteRecord`] - A named-field snapshot (full info or fast quote)
//! - [`Resolved`] - A resolved value or the unavailable sentinel
//! - [`StatementKind`] - The three financial statements

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Display marker for a value that could not be resolved.
///
/// Providers sometimes ship this same text as a placeholder, so the resolver
/// treats a text field equal to it as absent.
pub const NOT_AVAILABLE: &str = "N/A";

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Renders a float the way a shortest round-trip repr does, keeping a
/// trailing `.0` on integral values (`105.0`, `1.235`, `-0.5`).
#[must_use]
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// A single field value in a provider snapshot.
///
/// Integers and floats are kept apart because display formatting differs
/// between them. Nested objects and arrays (e.g. company officers) are kept as
/// raw JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteValue {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Nested object or array.
    Json(serde_json::Value),
}

impl QuoteValue {
    /// Returns true for [`QuoteValue::Null`] and for NaN floats.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Returns true for the provider's "not available" placeholder text.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Text(s) if s == NOT_AVAILABLE)
    }

    /// Returns true for integers and floats.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric view of the value; `None` for non-numeric and NaN values.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for QuoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{}", float_repr(*v)),
            Self::Text(s) => write!(f, "{s}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<serde_json::Value> for QuoteValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Json(other),
        }
    }
}

impl From<i64> for QuoteValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for QuoteValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QuoteValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for QuoteValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A snapshot of named fields for one company at request time.
///
/// Two records exist per company: the rich "full info" record and the cheap
/// "fast quote" record. A failed or missing record is represented by
/// [`QuoteRecord::empty`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteRecord {
    fields: HashMap<String, QuoteValue>,
}

impl QuoteRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object. Non-object JSON yields an empty record.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, QuoteValue::from(v)))
                .collect(),
            _ => Self::empty(),
        }
    }

    /// Sets a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QuoteValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QuoteValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Looks up a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&QuoteValue> {
        self.fields.get(key)
    }

    /// Returns true if the record holds the key (even with a null value).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QuoteValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, QuoteValue)> for QuoteRecord {
    fn from_iter<I: IntoIterator<Item = (K, QuoteValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A resolved value, or the distinguished "unavailable" sentinel.
///
/// `Resolved::Value` never wraps a null or NaN value; zero is a perfectly
/// good value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Resolved {
    /// A usable value.
    Value(QuoteValue),
    /// No usable value was found.
    #[default]
    Unavailable,
}

impl Resolved {
    /// Wraps a raw value, mapping null, NaN and placeholder text to `Unavailable`.
    #[must_use]
    pub fn from_value(value: QuoteValue) -> Self {
        if value.is_null() || value.is_placeholder() {
            Self::Unavailable
        } else {
            Self::Value(value)
        }
    }

    /// Wraps a computed number; non-finite results are `Unavailable`.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(QuoteValue::Float(value))
        } else {
            Self::Unavailable
        }
    }

    /// Returns true unless this is the sentinel.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The resolved value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&QuoteValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    /// Numeric view of the resolved value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.value().and_then(QuoteValue::as_f64)
    }

    /// Keeps only finite numeric values.
    #[must_use]
    pub fn numeric(self) -> Self {
        match self {
            Self::Value(v) if v.as_f64().is_some_and(f64::is_finite) => Self::Value(v),
            _ => Self::Unavailable,
        }
    }

    /// Returns `self` if available, otherwise evaluates `f`.
    #[must_use]
    pub fn or_else(self, f: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Value(_) => self,
            Self::Unavailable => f(),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Unavailable => write!(f, "{NOT_AVAILABLE}"),
        }
    }
}

/// The three financial statements a company reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Balance sheet.
    BalanceSheet,
    /// Income statement ("financials").
    IncomeStatement,
    /// Cash-flow statement.
    Cashflow,
}

impl StatementKind {
    /// All statement kinds, in display order.
    pub const ALL: [Self; 3] = [Self::IncomeStatement, Self::BalanceSheet, Self::Cashflow];

    /// Human-readable title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::BalanceSheet => "Balance Sheet",
            Self::IncomeStatement => "Income Statement",
            Self::Cashflow => "Cashflow",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}
