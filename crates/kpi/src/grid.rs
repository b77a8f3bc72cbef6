//! Display grids for normalized financial statements.

use kpi_core::{StatementKind, StatementTable};
use kpi_metrics::format_statement_value;
use serde::Serialize;

/// One line item across all periods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    /// Line item label.
    pub line_item: String,
    /// Formatted cells aligned with [`StatementGrid::periods`]; blank when not reported.
    pub cells: Vec<String>,
}

/// A statement laid out for display: periods as columns, line items as rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementGrid {
    /// Which statement this is.
    pub kind: StatementKind,
    /// ISO period end dates, most recent first.
    pub periods: Vec<String>,
    /// Rows in the order the provider reported them.
    pub rows: Vec<StatementRow>,
}

impl StatementGrid {
    /// Returns true if the statement had no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Lays out a normalized statement for display.
#[must_use]
pub fn statement_grid(kind: StatementKind, table: &StatementTable) -> StatementGrid {
    let periods: Vec<_> = table.periods().collect();
    let rows = table
        .line_items()
        .into_iter()
        .map(|item| StatementRow {
            line_item: item.to_string(),
            cells: periods
                .iter()
                .map(|period| format_statement_value(table.get(*period, item)))
                .collect(),
        })
        .collect();

    StatementGrid {
        kind,
        periods: periods.iter().map(ToString::to_string).collect(),
        rows,
    }
}
