//! Remote spreadsheet access.
//!
//! Everything above this module treats the spreadsheet as a set of named
//! tables made of string cells. The [`SheetsClient`] trait is the whole
//! contract the row store depends on; [`google::GoogleSheetsClient`] talks to
//! the real service and [`memory::MemorySheets`] keeps grids in process.

pub mod google;
pub mod memory;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use google::GoogleSheetsClient;
pub use memory::MemorySheets;

/// A raw 2-D block of cells. Rows may be ragged: missing trailing cells are
/// simply absent.
pub type Grid = Vec<Vec<String>>;

/// Column width used for full-table reads when no header width is known yet.
pub const DEFAULT_WIDTH: usize = 26;

/// Errors from the remote spreadsheet service
#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Sheet tab not found: {0}")]
    TableNotFound(String),

    #[error("Service account authentication failed: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from Sheets API: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Address of a block of cells inside one table (sheet tab).
///
/// `rows` is a 1-based inclusive span; `None` addresses every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub table: String,
    pub rows: Option<(usize, usize)>,
    pub width: usize,
}

impl RangeRef {
    /// Every row of the table, columns `A` through the default width.
    pub fn full(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: None,
            width: DEFAULT_WIDTH,
        }
    }

    /// Exactly one row, `width` columns wide.
    pub fn row(table: impl Into<String>, row: usize, width: usize) -> Self {
        Self {
            table: table.into(),
            rows: Some((row, row)),
            width: width.max(1),
        }
    }

    /// Row 1 of the table, `width` columns wide.
    pub fn header(table: impl Into<String>, width: usize) -> Self {
        Self::row(table, 1, width)
    }

    /// Last column letter covered by this range.
    pub fn last_column(&self) -> String {
        column_letter(self.width)
    }
}

impl fmt::Display for RangeRef {
    /// Renders A1 notation, e.g. `orders!A:Z` or `orders!A5:H5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.last_column();
        match self.rows {
            None => write!(f, "{}!A:{}", self.table, last),
            Some((start, end)) => write!(f, "{}!A{}:{}{}", self.table, start, last, end),
        }
    }
}

/// 1 -> A, 26 -> Z, 27 -> AA ...
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut out = Vec::new();
    while n > 0 {
        let m = (n - 1) % 26;
        out.push(b'A' + m as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// The remote spreadsheet contract the row store is written against.
///
/// No call is retried and none of them is atomic with respect to any other:
/// two writers interleaving read-modify-write cycles will clobber each other.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Returns every populated row in the range, or an empty grid.
    async fn read_range(&self, range: &RangeRef) -> Result<Grid, SheetsError>;

    /// Appends one row after the last populated row of the range.
    async fn append_row(&self, range: &RangeRef, row: Vec<String>) -> Result<(), SheetsError>;

    /// Overwrites exactly the addressed cells.
    async fn update_range(&self, range: &RangeRef, rows: Vec<Vec<String>>) -> Result<(), SheetsError>;

    /// Removes rows `[start, end)` (0-based) and shifts later rows up.
    async fn delete_rows(&self, table_id: i64, start: usize, end: usize) -> Result<(), SheetsError>;

    /// Resolves a tab name to the numeric id row deletion needs.
    async fn get_table_id(&self, table: &str) -> Result<i64, SheetsError>;
}
