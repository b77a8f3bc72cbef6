//! Company profile extraction from the full-info record.

use kpi_core::{NOT_AVAILABLE, QuoteRecord, QuoteValue};
use serde::Serialize;

use crate::format::format_grouped;

/// Description shown when the provider has none.
pub const DEFAULT_DESCRIPTION: &str = "Description not available.";

/// Maximum number of officers kept in a profile.
pub const MAX_OFFICERS: usize = 5;

/// A company officer with disclosed compensation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Officer {
    /// Full name as reported, e.g. `"Mr. Satya Nadella, B.Sc."`.
    pub name: String,
    /// Name up to the first comma.
    pub display_name: String,
    /// Job title.
    pub title: String,
    /// Age, when reported.
    pub age: Option<i64>,
    /// Total pay, thousands-grouped.
    pub total_pay: String,
}

impl Officer {
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        let name = non_empty(value.get("name")?.as_str()?)?;
        let title = non_empty(value.get("title")?.as_str()?)?;
        let pay = QuoteValue::from(value.get("totalPay")?.clone());
        if pay.as_f64().is_none_or(|v| v == 0.0) {
            return None;
        }

        let display_name = name.split(',').next().unwrap_or(&name).to_string();
        Some(Self {
            display_name,
            title,
            age: value.get("age").and_then(serde_json::Value::as_i64),
            total_pay: format_grouped(&pay)?,
            name,
        })
    }
}

/// Descriptive company details for the introduction view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompanyProfile {
    /// Long business summary.
    pub description: String,
    /// Street address, city, country and zip, comma-joined.
    pub address: String,
    /// City and country, comma-joined.
    pub location: String,
    /// Company website.
    pub website: Option<String>,
    /// Phone number or the unavailable marker.
    pub phone: String,
    /// Industry display name or the unavailable marker.
    pub industry: String,
    /// Sector display name or the unavailable marker.
    pub sector: String,
    /// Full-time employees, thousands-grouped, or the unavailable marker.
    pub employees: String,
    /// Up to [`MAX_OFFICERS`] officers with name, title and pay.
    pub officers: Vec<Officer>,
}

impl CompanyProfile {
    /// Extracts the profile; missing fields degrade to defaults.
    #[must_use]
    pub fn from_record(info: &QuoteRecord) -> Self {
        let officers = match info.get("companyOfficers") {
            Some(QuoteValue::Json(serde_json::Value::Array(items))) => items
                .iter()
                .filter_map(Officer::from_json)
                .take(MAX_OFFICERS)
                .collect(),
            _ => Vec::new(),
        };

        let employees = info
            .get("fullTimeEmployees")
            .filter(|v| v.as_f64().is_some_and(|n| n != 0.0))
            .and_then(format_grouped)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            description: text(info, "longBusinessSummary")
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            address: join(info, &["address1", "address2", "city", "country", "zip"]),
            location: join(info, &["city", "country"]),
            website: text(info, "website"),
            phone: text_or_marker(info, "phone"),
            industry: text_or_marker(info, "industryDisp"),
            sector: text_or_marker(info, "sectorDisp"),
            employees,
            officers,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Non-empty text field. Zip codes sometimes arrive as numbers.
fn text(info: &QuoteRecord, key: &str) -> Option<String> {
    match info.get(key)? {
        QuoteValue::Text(s) => non_empty(s),
        QuoteValue::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

fn text_or_marker(info: &QuoteRecord, key: &str) -> String {
    text(info, key).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn join(info: &QuoteRecord, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| text(info, key))
        .collect::<Vec<_>>()
        .join(", ")
}
