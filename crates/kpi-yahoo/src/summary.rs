//! Quote summary endpoint: the full-info record.

use kpi_core::{KpiError, QuoteRecord, QuoteValue, Result, Symbol};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::chart::ApiError;

/// Yahoo Finance quote summary API base URL.
pub(crate) const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Modules merged into the full-info record; earlier modules win on clashes.
pub(crate) const MODULES: [&str; 5] = [
    "assetProfile",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "price",
];

pub(crate) fn build_summary_url(symbol: &Symbol) -> String {
    format!(
        "{}/{}?modules={}",
        QUOTE_SUMMARY_URL,
        symbol.as_str(),
        MODULES.join(",")
    )
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<Map<String, Value>>>,
    error: Option<ApiError>,
}

/// Replaces `{"raw": .., "fmt": ..}` wrappers with the raw value, recursively.
/// An empty object is Yahoo's way of saying "no value".
fn unwrap_raw(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(raw) = map.remove("raw") {
                return raw;
            }
            if map.is_empty() {
                return Value::Null;
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, unwrap_raw(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_raw).collect()),
        other => other,
    }
}

/// Flattens the summary modules into one full-info record.
pub(crate) fn parse_full_info(
    symbol: &Symbol,
    response: QuoteSummaryResponse,
) -> Result<QuoteRecord> {
    let summary = response.quote_summary;
    if let Some(error) = summary.error {
        return Err(error.into_error(symbol));
    }
    let mut modules = summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| KpiError::SymbolNotFound(symbol.to_string()))?;

    let mut record = QuoteRecord::empty();
    for name in MODULES {
        let Some(Value::Object(fields)) = modules.remove(name) else {
            continue;
        };
        for (key, value) in fields {
            if key == "maxAge" || record.contains_key(&key) {
                continue;
            }
            record.insert(key, QuoteValue::from(unwrap_raw(value)));
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<QuoteRecord> {
        let response: QuoteSummaryResponse = serde_json::from_value(value).unwrap();
        parse_full_info(&Symbol::new("MSFT"), response)
    }

    #[test]
    fn test_summary_url() {
        let url = build_summary_url(&Symbol::new("msft"));
        assert!(url.starts_with(QUOTE_SUMMARY_URL));
        assert!(url.ends_with(
            "/MSFT?modules=assetProfile,summaryDetail,defaultKeyStatistics,financialData,price"
        ));
    }

    #[test]
    fn test_flatten_modules() {
        let record = parse(json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {
                        "city": "Redmond",
                        "fullTimeEmployees": 228000,
                        "companyOfficers": [
                            {"name": "Mr. Satya  Nadella", "totalPay": {"raw": 10066490, "fmt": "10.07M"}}
                        ],
                        "maxAge": 86400
                    },
                    "summaryDetail": {
                        "previousClose": {"raw": 410.5, "fmt": "410.50"},
                        "dividendYield": {"raw": 0.0072, "fmt": "0.72%"},
                        "trailingPE": {},
                        "currency": "USD"
                    },
                    "financialData": {
                        "currentPrice": {"raw": 415.25, "fmt": "415.25"},
                        "currency": "EUR"
                    }
                }],
                "error": null
            }
        }))
        .unwrap();

        assert_eq!(record.get("city"), Some(&QuoteValue::Text("Redmond".into())));
        assert_eq!(record.get("previousClose"), Some(&QuoteValue::Float(410.5)));
        assert_eq!(record.get("currentPrice"), Some(&QuoteValue::Float(415.25)));
        assert_eq!(record.get("trailingPE"), Some(&QuoteValue::Null));
        assert_eq!(record.get("currency"), Some(&QuoteValue::Text("USD".into())));
        assert!(!record.contains_key("maxAge"));

        let Some(QuoteValue::Json(Value::Array(officers))) = record.get("companyOfficers") else {
            panic!("officers should stay structured");
        };
        assert_eq!(officers[0]["totalPay"], json!(10066490));
    }

    #[test]
    fn test_api_error() {
        let result = parse(json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: MSFT"}
            }
        }));
        assert!(matches!(result, Err(KpiError::SymbolNotFound(_))));
    }

    #[test]
    fn test_empty_result() {
        let result = parse(json!({"quoteSummary": {"result": [], "error": null}}));
        assert!(matches!(result, Err(KpiError::SymbolNotFound(_))));
    }
}
