//! Chart endpoint: price history and the fast quote.

use kpi_core::{DataFrequency, HistoryRange, KpiError, QuoteRecord, QuoteValue, Result, Symbol};
use polars::prelude::*;
use serde::Deserialize;

/// Yahoo Finance chart API base URL.
pub(crate) const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const SECONDS_PER_DAY: i64 = 86_400;

pub(crate) fn interval(frequency: DataFrequency) -> &'static str {
    match frequency {
        DataFrequency::Minute => "1m",
        DataFrequency::FiveMinute => "5m",
        DataFrequency::FifteenMinute => "15m",
        DataFrequency::ThirtyMinute => "30m",
        DataFrequency::Hourly => "1h",
        DataFrequency::Daily => "1d",
        DataFrequency::Weekly => "1wk",
        DataFrequency::Monthly => "1mo",
    }
}

/// Build the chart API URL for a symbol, range and bar size.
pub(crate) fn build_chart_url(
    symbol: &Symbol,
    range: HistoryRange,
    frequency: DataFrequency,
) -> String {
    format!(
        "{}/{}?range={}&interval={}&includeAdjustedClose=true",
        CHART_API_URL,
        symbol.as_str(),
        range.as_str(),
        interval(frequency)
    )
}

/// Chart API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub(crate) code: String,
    pub(crate) description: String,
}

impl ApiError {
    pub(crate) fn into_error(self, symbol: &Symbol) -> KpiError {
        if self.code == "Not Found" {
            KpiError::SymbolNotFound(symbol.to_string())
        } else {
            KpiError::Other(format!("{}: {}", self.code, self.description))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<i64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_data(self, symbol: &Symbol) -> Result<ChartData> {
        if let Some(error) = self.chart.error {
            return Err(error.into_error(symbol));
        }
        self.chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| KpiError::SymbolNotFound(symbol.to_string()))
    }
}

/// Parse a chart response into an OHLCV DataFrame.
pub(crate) fn parse_history(symbol: &Symbol, response: ChartResponse) -> Result<DataFrame> {
    let data = response.into_data(symbol)?;
    let timestamps = data.timestamp.unwrap_or_default();

    if timestamps.is_empty() {
        return Err(KpiError::Other(format!("No price history for {symbol}")));
    }

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| KpiError::Parse("Missing quote data".to_string()))?;

    let adj_close = data
        .indicators
        .adjclose
        .and_then(|ac| ac.into_iter().next())
        .map(|ac| ac.adjclose)
        .unwrap_or_default();

    // Days since the Unix epoch, the physical representation of polars dates
    let dates: Vec<i32> = timestamps
        .iter()
        .map(|&ts| ts.div_euclid(SECONDS_PER_DAY) as i32)
        .collect();

    let symbols: Vec<&str> = vec![symbol.as_str(); dates.len()];

    let adj_closes: Vec<Option<f64>> = if adj_close.len() == dates.len() {
        adj_close
    } else {
        quote.close.clone()
    };

    let date_col = Column::new("date".into(), dates).cast(&DataType::Date)?;

    let df = DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        date_col,
        Column::new("open".into(), quote.open),
        Column::new("high".into(), quote.high),
        Column::new("low".into(), quote.low),
        Column::new("close".into(), quote.close),
        Column::new("volume".into(), quote.volume),
        Column::new("adjusted_close".into(), adj_closes),
    ])?;

    Ok(df)
}

fn last_present<T: Copy>(values: &[Option<T>]) -> Option<T> {
    values.iter().rev().find_map(|v| *v)
}

/// Build the fast quote from a daily one-year chart.
///
/// Meta fields are preferred; bars fill the gaps. Missing figures are simply
/// left out of the record.
pub(crate) fn parse_fast_quote(symbol: &Symbol, response: ChartResponse) -> Result<QuoteRecord> {
    let data = response.into_data(symbol)?;
    let meta = data.meta;
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let closes: Vec<f64> = quote.close.iter().flatten().copied().collect();
    let previous_close = meta
        .previous_close
        .or_else(|| closes.len().checked_sub(2).map(|i| closes[i]))
        .or(meta.chart_previous_close);

    let year_high = meta.fifty_two_week_high.or_else(|| {
        quote
            .high
            .iter()
            .flatten()
            .copied()
            .reduce(f64::max)
    });
    let year_low = meta
        .fifty_two_week_low
        .or_else(|| quote.low.iter().flatten().copied().reduce(f64::min));

    let fields: [(&str, Option<QuoteValue>); 9] = [
        (
            "lastPrice",
            meta.regular_market_price
                .or_else(|| closes.last().copied())
                .map(QuoteValue::from),
        ),
        ("previousClose", previous_close.map(QuoteValue::from)),
        ("open", last_present(&quote.open).map(QuoteValue::from)),
        (
            "dayHigh",
            meta.regular_market_day_high
                .or_else(|| last_present(&quote.high))
                .map(QuoteValue::from),
        ),
        (
            "dayLow",
            meta.regular_market_day_low
                .or_else(|| last_present(&quote.low))
                .map(QuoteValue::from),
        ),
        (
            "lastVolume",
            meta.regular_market_volume
                .or_else(|| last_present(&quote.volume).and_then(|v| i64::try_from(v).ok()))
                .map(QuoteValue::from),
        ),
        ("yearHigh", year_high.map(QuoteValue::from)),
        ("yearLow", year_low.map(QuoteValue::from)),
        ("currency", meta.currency.map(QuoteValue::from)),
    ];

    Ok(fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}
