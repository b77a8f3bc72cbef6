//! Metric catalog: what to resolve, under which names, and how to derive it.
//!
//! The catalog is configuration. [`MetricCatalog::default`] carries the
//! built-in set; [`MetricCatalog::from_json`] and [`MetricCatalog::from_path`]
//! load a versioned replacement so field lists and fallback formulas can
//! change without touching the engine.

use kpi_core::{KpiError, Result, StatementKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::formula::{Formula, Operand, Source};

/// Canonical names of the built-in key metrics.
pub mod names {
    #![allow(missing_docs)]

    pub const CURRENT_PRICE: &str = "Current Price";
    pub const PREVIOUS_CLOSE: &str = "Previous Close";
    pub const OPEN: &str = "Open";
    pub const DAY_HIGH: &str = "Day High";
    pub const DAY_LOW: &str = "Day Low";
    pub const YEAR_HIGH: &str = "52 Week High";
    pub const YEAR_LOW: &str = "52 Week Low";
    pub const VOLUME: &str = "Volume";
    pub const MARKET_CAP: &str = "Market Cap";
    pub const PE_RATIO: &str = "PE Ratio";
    pub const EPS_FORWARD: &str = "EPS Forward";
    pub const DIVIDEND_YIELD: &str = "Dividend Yield";
    pub const BETA: &str = "Beta";
    pub const PRICE_TO_SALES: &str = "Price to Sales";
    pub const DEBT_TO_EQUITY: &str = "Debt to Equity";
    pub const CURRENT_RATIO: &str = "Current Ratio";
    pub const RETURN_ON_EQUITY: &str = "Return on Equity";
    pub const RETURN_ON_ASSETS: &str = "Return on Assets";
    pub const GROSS_MARGIN: &str = "Gross Margin";
    pub const OPERATING_MARGIN: &str = "Operating Margin";
    pub const NET_PROFIT_MARGIN: &str = "Net Profit Margin";
    pub const EBITDA: &str = "EBITDA";
    pub const EBITDA_MARGIN: &str = "EBITDA Margin";
    pub const FREE_CASHFLOW: &str = "Free Cashflow";
}

/// Version of the built-in catalog.
pub const BUILTIN_VERSION: u32 = 3;

/// A key metric: canonical name, provider field candidates, optional fallback formula.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Canonical display name.
    pub name: String,
    /// Provider field names, in priority order.
    pub candidate_keys: Vec<String>,
    /// Statement-derived fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<Formula>,
}

impl MetricDefinition {
    /// Creates a definition without a fallback formula.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, candidate_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            candidate_keys: candidate_keys.into_iter().map(Into::into).collect(),
            formula: None,
        }
    }

    /// Attaches a fallback formula.
    #[must_use]
    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = Some(formula);
        self
    }
}

/// A secondary metric shown only when the full-info record has it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherMetric {
    /// Full-info field name; also drives formatting.
    pub key: String,
    /// Display label.
    pub label: String,
}

impl OtherMetric {
    /// Creates a secondary metric.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    version: u32,
    key_metrics: Vec<MetricDefinition>,
    #[serde(default)]
    other_metrics: Vec<OtherMetric>,
}

/// Ordered set of key metrics plus the secondary metric list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricCatalog {
    version: u32,
    key_metrics: Vec<MetricDefinition>,
    other_metrics: Vec<OtherMetric>,
}

impl MetricCatalog {
    /// Builds a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::Catalog`] if a metric name is empty or repeated, or
    /// if a metric has neither candidate keys nor a formula.
    pub fn new(
        version: u32,
        key_metrics: Vec<MetricDefinition>,
        other_metrics: Vec<OtherMetric>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for metric in &key_metrics {
            if metric.name.trim().is_empty() {
                return Err(KpiError::Catalog("metric with empty name".to_string()));
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(KpiError::Catalog(format!(
                    "duplicate metric '{}'",
                    metric.name
                )));
            }
            if metric.candidate_keys.is_empty() && metric.formula.is_none() {
                return Err(KpiError::Catalog(format!(
                    "metric '{}' has no candidate keys and no formula",
                    metric.name
                )));
            }
        }

        Ok(Self {
            version,
            key_metrics,
            other_metrics,
        })
    }

    /// Parses and validates a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::Parse`] for malformed JSON and
    /// [`KpiError::Catalog`] for an invalid catalog.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::new(raw.version, raw.key_metrics, raw.other_metrics)
    }

    /// Loads a JSON catalog from disk.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::Catalog`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| KpiError::Catalog(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            version = catalog.version,
            metrics = catalog.key_metrics.len(),
            "Loaded metric catalog"
        );
        Ok(catalog)
    }

    /// Serializes the catalog to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Catalog version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Key metrics, in display order.
    #[must_use]
    pub fn key_metrics(&self) -> &[MetricDefinition] {
        &self.key_metrics
    }

    /// Secondary metrics, in display order.
    #[must_use]
    pub fn other_metrics(&self) -> &[OtherMetric] {
        &self.other_metrics
    }

    /// Looks up a key metric by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.key_metrics.iter().find(|m| m.name == name)
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self {
            version: BUILTIN_VERSION,
            key_metrics: builtin_key_metrics(),
            other_metrics: builtin_other_metrics(),
        }
    }
}

fn info(key: &str) -> Source {
    Source::info(key)
}

fn bs(item: &str) -> Source {
    Source::statement(StatementKind::BalanceSheet, item)
}

fn is(item: &str) -> Source {
    Source::statement(StatementKind::IncomeStatement, item)
}

fn cf(item: &str) -> Source {
    Source::statement(StatementKind::Cashflow, item)
}

fn net_income() -> Operand {
    Operand::new([info("netIncomeToCommon"), is("Net Income")])
}

fn revenue() -> Operand {
    Operand::new([info("totalRevenue"), is("Total Revenue")])
}

fn over_revenue(numerator: Operand) -> Formula {
    Formula::Ratio {
        numerator,
        denominator: revenue(),
    }
}

fn builtin_key_metrics() -> Vec<MetricDefinition> {
    use names::*;

    vec![
        MetricDefinition::new(
            CURRENT_PRICE,
            ["currentPrice", "regularMarketPrice", "lastPrice"],
        ),
        MetricDefinition::new(
            PREVIOUS_CLOSE,
            ["previousClose", "regularMarketPreviousClose"],
        ),
        MetricDefinition::new(OPEN, ["open", "regularMarketOpen"]),
        MetricDefinition::new(DAY_HIGH, ["dayHigh", "regularMarketDayHigh"]),
        MetricDefinition::new(DAY_LOW, ["dayLow", "regularMarketDayLow"]),
        MetricDefinition::new(YEAR_HIGH, ["fiftyTwoWeekHigh", "yearHigh"]),
        MetricDefinition::new(YEAR_LOW, ["fiftyTwoWeekLow", "yearLow"]),
        MetricDefinition::new(VOLUME, ["volume", "regularMarketVolume", "lastVolume"]),
        MetricDefinition::new(MARKET_CAP, ["marketCap"]),
        MetricDefinition::new(PE_RATIO, ["trailingPE", "forwardPE"]),
        MetricDefinition::new(EPS_FORWARD, ["forwardEps", "epsForward"]).with_formula(
            Formula::Ratio {
                numerator: net_income(),
                denominator: Operand::new([
                    info("sharesOutstanding"),
                    bs("Shares Outstanding"),
                    bs("Ordinary Shares Number"),
                ]),
            },
        ),
        MetricDefinition::new(
            DIVIDEND_YIELD,
            ["dividendYield", "trailingAnnualDividendYield"],
        ),
        MetricDefinition::new(BETA, ["beta"]),
        // Chart quotes carry no share count, so a fast-quote market cap only
        // comes from providers that report one.
        MetricDefinition::new(PRICE_TO_SALES, ["priceToSalesTrailing12Months"]).with_formula(
            over_revenue(Operand::new([info("marketCap"), Source::fast("marketCap")])),
        ),
        MetricDefinition::new(DEBT_TO_EQUITY, ["debtToEquity"]).with_formula(Formula::Ratio {
            numerator: bs("Total Debt").into(),
            denominator: bs("Stockholders Equity").into(),
        }),
        MetricDefinition::new(CURRENT_RATIO, ["currentRatio"]).with_formula(Formula::SumRatio {
            numerator: vec![
                bs("Cash And Cash Equivalents").into(),
                bs("Accounts Receivable").into(),
                bs("Other Short Term Investments").into(),
                bs("Prepaid Assets").into(),
            ],
            denominator: vec![
                bs("Current Debt And Capital Lease Obligation").into(),
                bs("Accounts Payable").into(),
                bs("Current Accrued Expenses").into(),
                bs("Other Payable").into(),
            ],
        }),
        MetricDefinition::new(RETURN_ON_EQUITY, ["returnOnEquity"]).with_formula(
            Formula::Ratio {
                numerator: net_income(),
                denominator: Operand::new([
                    bs("Stockholders Equity"),
                    bs("Common Stock Equity"),
                ]),
            },
        ),
        MetricDefinition::new(RETURN_ON_ASSETS, ["returnOnAssets"]).with_formula(
            Formula::Ratio {
                numerator: net_income(),
                denominator: bs("Total Assets").into(),
            },
        ),
        MetricDefinition::new(GROSS_MARGIN, ["grossMargins"]).with_formula(over_revenue(
            Operand::new([info("grossProfits"), is("Gross Profit")]),
        )),
        MetricDefinition::new(OPERATING_MARGIN, ["operatingMargins"]).with_formula(
            over_revenue(Operand::new([info("operatingIncome"), is("Operating Income")])),
        ),
        MetricDefinition::new(NET_PROFIT_MARGIN, ["profitMargins"])
            .with_formula(over_revenue(net_income())),
        MetricDefinition::new(EBITDA, ["ebitda"]).with_formula(Formula::SafeSum {
            add: vec![
                is("Operating Revenue").into(),
                is("Depreciation And Amortization In Income Statement").into(),
            ],
            subtract: vec![
                is("Selling General And Administration").into(),
                is("Other Non Interest Expense").into(),
                is("Occupancy And Equipment").into(),
            ],
        }),
        MetricDefinition::new(EBITDA_MARGIN, ["ebitdaMargins"]).with_formula(over_revenue(
            Operand::new([info("ebitda"), is("EBITDA")]),
        )),
        MetricDefinition::new(FREE_CASHFLOW, ["freeCashflow"]).with_formula(
            Formula::Difference {
                minuend: Operand::new([info("operatingCashflow"), cf("Operating Cash Flow")]),
                subtrahend: Operand::new([
                    info("capitalExpenditures"),
                    cf("Capital Expenditure"),
                ]),
            },
        ),
    ]
}

fn builtin_other_metrics() -> Vec<OtherMetric> {
    [
        ("exDividendDate", "Ex-Dividend Date"),
        ("dividendRate", "Dividend Rate"),
        ("payoutRatio", "Payout Ratio"),
        ("fiveYearAvgDividendYield", "5Y Avg Dividend Yield"),
        ("forwardPE", "Forward PE"),
        ("trailingEps", "Trailing EPS"),
        ("bookValue", "Book Value"),
        ("priceToBook", "Price to Book"),
        ("enterpriseValue", "Enterprise Value"),
        ("enterpriseToRevenue", "EV / Revenue"),
        ("enterpriseToEbitda", "EV / EBITDA"),
        ("totalCash", "Total Cash"),
        ("totalDebt", "Total Debt"),
        ("totalRevenue", "Total Revenue"),
        ("revenueGrowth", "Revenue Growth"),
        ("earningsGrowth", "Earnings Growth"),
        ("sharesOutstanding", "Shares Outstanding"),
        ("floatShares", "Float Shares"),
        ("heldPercentInsiders", "Held by Insiders"),
        ("heldPercentInstitutions", "Held by Institutions"),
        ("fiftyDayAverage", "50 Day Average"),
        ("twoHundredDayAverage", "200 Day Average"),
        ("averageVolume", "Average Volume"),
        ("lastFiscalYearEnd", "Last Fiscal Year End"),
        ("mostRecentQuarter", "Most Recent Quarter"),
        ("lastSplitDate", "Last Split Date"),
    ]
    .into_iter()
    .map(|(key, label)| OtherMetric::new(key, label))
    .collect()
}
