//! Visualization Classifier
//!
//! Deterministically picks a display shape for a table. The rules are
//! evaluated in a fixed order because the categories overlap: a two-column
//! table whose first column parses as dates is a time series, not a
//! category breakdown. Classification never fails.

use crate::table::{ColumnType, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayShape {
    Empty,
    Scalar,
    TimeSeries,
    CategoryBars,
    Scatter,
    RawTable,
}

impl DisplayShape {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayShape::Empty => "empty",
            DisplayShape::Scalar => "scalar",
            DisplayShape::TimeSeries => "time series",
            DisplayShape::CategoryBars => "category bars",
            DisplayShape::Scatter => "scatter",
            DisplayShape::RawTable => "table",
        }
    }
}

/// First matching rule wins:
/// 1. no rows or no columns        -> Empty
/// 2. exactly one cell             -> Scalar
/// 3. first column is datetime     -> TimeSeries
/// 4. two columns, first is text   -> CategoryBars
/// 5. two columns, both numeric    -> Scatter
/// 6. anything else                -> RawTable
pub fn classify(table: &Table) -> DisplayShape {
    if table.row_count() == 0 || table.column_count() == 0 {
        return DisplayShape::Empty;
    }
    if table.row_count() == 1 && table.column_count() == 1 {
        return DisplayShape::Scalar;
    }
    if table.columns[0].kind == ColumnType::Datetime {
        return DisplayShape::TimeSeries;
    }
    if table.column_count() == 2 && table.columns[0].kind == ColumnType::Text {
        return DisplayShape::CategoryBars;
    }
    if table.column_count() == 2
        && table.columns.iter().all(|c| c.kind == ColumnType::Numeric)
    {
        return DisplayShape::Scatter;
    }
    DisplayShape::RawTable
}
