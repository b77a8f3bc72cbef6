//! Fundamentals timeseries endpoint: financial statements.
//!
//! Yahoo reports each line item as its own series (`annualTotalDebt`,
//! `quarterlyNetIncome`, ...). The series are pivoted into the wide statement
//! layout: a `line_item` column plus one column per `asOfDate`.

use kpi_core::{LINE_ITEM_COLUMN, PeriodType, Result, StatementKind, Symbol};
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::chart::ApiError;

/// Yahoo Finance fundamentals timeseries base URL.
pub(crate) const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Start of the requested window (1985-08-23), early enough for any filing history.
const PERIOD_START: i64 = 493_590_046;

const BALANCE_SHEET_ITEMS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "OtherShortTermInvestments",
    "AccountsReceivable",
    "PrepaidAssets",
    "Inventory",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "CurrentDebtAndCapitalLeaseObligation",
    "AccountsPayable",
    "CurrentAccruedExpenses",
    "OtherPayable",
    "LongTermDebt",
    "TotalDebt",
    "NetDebt",
    "StockholdersEquity",
    "CommonStockEquity",
    "ShareIssued",
    "OrdinarySharesNumber",
];

const INCOME_STATEMENT_ITEMS: &[&str] = &[
    "TotalRevenue",
    "OperatingRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "SellingGeneralAndAdministration",
    "OtherNonInterestExpense",
    "OccupancyAndEquipment",
    "DepreciationAndAmortizationInIncomeStatement",
    "OperatingExpense",
    "OperatingIncome",
    "InterestExpense",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "BasicEPS",
    "DilutedEPS",
    "EBIT",
    "EBITDA",
];

const CASHFLOW_ITEMS: &[&str] = &[
    "OperatingCashFlow",
    "InvestingCashFlow",
    "FinancingCashFlow",
    "CapitalExpenditure",
    "FreeCashFlow",
    "CashDividendsPaid",
    "RepurchaseOfCapitalStock",
    "DepreciationAndAmortization",
    "ChangeInWorkingCapital",
    "EndCashPosition",
];

/// Yahoo series names reported for a statement kind.
pub(crate) const fn line_items(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::BalanceSheet => BALANCE_SHEET_ITEMS,
        StatementKind::IncomeStatement => INCOME_STATEMENT_ITEMS,
        StatementKind::Cashflow => CASHFLOW_ITEMS,
    }
}

const fn prefix(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::Annual => "annual",
        PeriodType::Quarterly => "quarterly",
    }
}

pub(crate) fn build_timeseries_url(
    symbol: &Symbol,
    kind: StatementKind,
    period_type: PeriodType,
    period_end: i64,
) -> String {
    let prefix = prefix(period_type);
    let types = line_items(kind)
        .iter()
        .map(|item| format!("{prefix}{item}"))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{TIMESERIES_URL}/{symbol}?symbol={symbol}&type={types}&period1={PERIOD_START}&period2={period_end}",
        symbol = symbol.as_str()
    )
}

/// Splits a CamelCase series name into words, keeping acronyms together:
/// `TotalDebt` → `Total Debt`, `DilutedEPS` → `Diluted EPS`, `EBITDA` → `EBITDA`.
pub(crate) fn humanize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    for (i, &ch) in chars.iter().enumerate() {
        if i > 0 && ch.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                out.push(' ');
            }
        }
        out.push(ch);
    }
    out
}

/// Timeseries API response.
#[derive(Debug, Deserialize)]
pub(crate) struct TimeseriesResponse {
    timeseries: TimeseriesResult,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    #[serde(default)]
    result: Option<Vec<Value>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Observation {
    as_of_date: String,
    reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: Option<f64>,
}

/// Pivots the series into a wide statement frame.
///
/// Rows follow the statement's line-item order. Series with no observations
/// are dropped; a response with no observations at all yields an empty frame.
pub(crate) fn parse_statement(
    symbol: &Symbol,
    kind: StatementKind,
    period_type: PeriodType,
    response: TimeseriesResponse,
) -> Result<DataFrame> {
    if let Some(error) = response.timeseries.error {
        return Err(error.into_error(symbol));
    }
    let prefix = prefix(period_type);

    let mut cells: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut periods: BTreeSet<String> = BTreeSet::new();

    for series in response.timeseries.result.unwrap_or_default() {
        let Some(series_type) = series
            .pointer("/meta/type/0")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            continue;
        };
        let Some(Value::Array(observations)) = series.get(&series_type) else {
            continue;
        };

        let item = series_type
            .strip_prefix(prefix)
            .unwrap_or(&series_type)
            .to_string();
        for observation in observations {
            let Ok(observation) = Observation::deserialize(observation) else {
                continue;
            };
            let Some(value) = observation.reported_value.and_then(|v| v.raw) else {
                continue;
            };
            periods.insert(observation.as_of_date.clone());
            cells
                .entry(item.clone())
                .or_default()
                .insert(observation.as_of_date, value);
        }
    }

    if cells.is_empty() {
        return Ok(DataFrame::empty());
    }

    let order = line_items(kind);
    let mut rows: Vec<(String, BTreeMap<String, f64>)> = cells.into_iter().collect();
    rows.sort_by_key(|(item, _)| {
        order
            .iter()
            .position(|known| known == item)
            .unwrap_or(usize::MAX)
    });

    let items: Vec<String> = rows.iter().map(|(item, _)| humanize(item)).collect();
    let mut columns = vec![Column::new(LINE_ITEM_COLUMN.into(), items)];
    for period in &periods {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|(_, by_period)| by_period.get(period).copied())
            .collect();
        columns.push(Column::new(period.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}
