//! Generic paginated, sortable, selectable table.
//!
//! The table never owns the data order or the page window. It renders what
//! the host gives it and reports user intent back as [`TableEvent`]s.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub mod column;
pub mod selection;
pub mod sort;
pub mod view;

pub use column::ColumnDefinition;
pub use selection::SelectionModel;
pub use sort::{page_slice, sort_rows};
pub use view::{
    render, DisplayColumn, DisplayRow, HeaderCell, PaginatorDisplay, RowAction, TableConfig,
    TableDisplay, TableEvent, TableView,
};

/// Direction of a requested sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Which slice of the host's data is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub page_index: usize,
    pub page_size: usize,
    pub total_items: usize,
}

impl PageWindow {
    pub fn new(page_index: usize, page_size: usize, total_items: usize) -> Self {
        Self {
            page_index,
            page_size,
            total_items,
        }
    }

    /// Number of pages needed for `total_items`
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(self.page_size)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(0, 10, 0)
    }
}

/// A single cell's raw value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl CellValue {
    /// Dates as `YYYY-MM-DD`, as date columns show them
    pub fn as_date_text(&self) -> String {
        match self {
            CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            CellValue::Text(text) => match parse_date(text) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => text.clone(),
            },
            other => other.to_string(),
        }
    }

    /// Order used when sorting by this value. Empty cells sort first;
    /// mixed kinds fall back to their text.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => Ordering::Equal,
            (CellValue::Empty, _) => Ordering::Less,
            (_, CellValue::Empty) => Ordering::Greater,
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(date) => write!(f, "{}", date.to_rfc3339()),
        }
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// A host row the table can read cells from.
///
/// Selection identity is the row's `PartialEq`.
pub trait TableRow: Clone + PartialEq {
    fn cell(&self, key: &str) -> CellValue;
}

impl TableRow for serde_json::Value {
    fn cell(&self, key: &str) -> CellValue {
        match self.get(key) {
            None | Some(serde_json::Value::Null) => CellValue::Empty,
            Some(serde_json::Value::String(text)) => CellValue::Text(text.clone()),
            Some(serde_json::Value::Number(n)) => {
                n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty)
            }
            Some(serde_json::Value::Bool(b)) => CellValue::Bool(*b),
            Some(other) => CellValue::Text(other.to_string()),
        }
    }
}
