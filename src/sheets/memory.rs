use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Grid, RangeRef, SheetsClient, SheetsError};

#[derive(Debug, Clone)]
struct MemoryTable {
    id: i64,
    grid: Grid,
}

/// In-process spreadsheet used for local development and tests.
///
/// Mirrors the remote service's observable behaviour: reads drop trailing
/// empty cells and rows, appends land after the last populated row, and row
/// deletion shifts every later row up by the number of rows removed.
#[derive(Debug, Default)]
pub struct MemorySheets {
    tables: RwLock<HashMap<String, MemoryTable>>,
    writes: AtomicUsize,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty tab.
    pub fn with_table(self, name: &str) -> Self {
        self.with_grid(name, Vec::new())
    }

    /// Registers a tab pre-filled with `grid`.
    pub fn with_grid(mut self, name: &str, grid: Grid) -> Self {
        let tables = self.tables.get_mut();
        let id = 1000 + tables.len() as i64;
        tables.insert(name.to_string(), MemoryTable { id, grid });
        self
    }

    /// Snapshot of a tab's cells, exactly as stored.
    pub async fn grid(&self, name: &str) -> Option<Grid> {
        self.tables.read().await.get(name).map(|t| t.grid.clone())
    }

    /// Number of mutating calls (append, update, delete) served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.is_empty())
}

/// Cuts a stored row to the range width and drops trailing empty cells.
fn visible(row: &[String], width: usize) -> Vec<String> {
    let mut out: Vec<String> = row.iter().take(width).cloned().collect();
    while out.last().is_some_and(|c| c.is_empty()) {
        out.pop();
    }
    out
}

#[async_trait]
impl SheetsClient for MemorySheets {
    async fn read_range(&self, range: &RangeRef) -> Result<Grid, SheetsError> {
        debug!("memory read {}", range);
        let tables = self.tables.read().await;
        let table = tables
            .get(&range.table)
            .ok_or_else(|| SheetsError::TableNotFound(range.table.clone()))?;

        let (start, end) = match range.rows {
            Some((s, e)) => (s.saturating_sub(1), e),
            None => (0, table.grid.len()),
        };

        let mut out: Grid = table
            .grid
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .map(|row| visible(row, range.width))
            .collect();

        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn append_row(&self, range: &RangeRef, row: Vec<String>) -> Result<(), SheetsError> {
        debug!("memory append {}", range);
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&range.table)
            .ok_or_else(|| SheetsError::TableNotFound(range.table.clone()))?;

        let position = table
            .grid
            .iter()
            .rposition(|r| !is_blank(r))
            .map(|i| i + 1)
            .unwrap_or(0);
        table.grid.insert(position, row);
        self.record_write();
        Ok(())
    }

    async fn update_range(&self, range: &RangeRef, rows: Vec<Vec<String>>) -> Result<(), SheetsError> {
        debug!("memory update {}", range);
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&range.table)
            .ok_or_else(|| SheetsError::TableNotFound(range.table.clone()))?;

        let first = range.rows.map(|(s, _)| s.max(1)).unwrap_or(1);
        for (offset, values) in rows.into_iter().enumerate() {
            let index = first - 1 + offset;
            if table.grid.len() <= index {
                table.grid.resize(index + 1, Vec::new());
            }
            let target = &mut table.grid[index];
            for (col, value) in values.into_iter().take(range.width).enumerate() {
                if target.len() <= col {
                    target.resize(col + 1, String::new());
                }
                target[col] = value;
            }
        }
        self.record_write();
        Ok(())
    }

    async fn delete_rows(&self, table_id: i64, start: usize, end: usize) -> Result<(), SheetsError> {
        debug!("memory delete rows [{}, {}) in tab {}", start, end, table_id);
        let mut tables = self.tables.write().await;
        let table = tables
            .values_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| SheetsError::TableNotFound(table_id.to_string()))?;

        let len = table.grid.len();
        let (start, end) = (start.min(len), end.min(len));
        if start < end {
            table.grid.drain(start..end);
        }
        self.record_write();
        Ok(())
    }

    async fn get_table_id(&self, table: &str) -> Result<i64, SheetsError> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.id)
            .ok_or_else(|| SheetsError::TableNotFound(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn read_drops_trailing_blanks() {
        let sheets = MemorySheets::new().with_grid(
            "t",
            vec![row(&["id", "name", ""]), row(&["1", "", ""]), row(&["", ""])],
        );
        let grid = sheets.read_range(&RangeRef::full("t")).await.unwrap();
        assert_eq!(grid, vec![row(&["id", "name"]), row(&["1"])]);
    }

    #[tokio::test]
    async fn append_goes_after_last_populated_row() {
        let sheets = MemorySheets::new().with_grid("t", vec![row(&["id"]), row(&["1"]), row(&[""])]);
        sheets.append_row(&RangeRef::full("t"), row(&["2"])).await.unwrap();
        let grid = sheets.grid("t").await.unwrap();
        assert_eq!(grid[2], row(&["2"]));
        assert_eq!(sheets.write_count(), 1);
    }

    #[tokio::test]
    async fn update_overwrites_single_row() {
        let sheets = MemorySheets::new().with_grid("t", vec![row(&["id", "s"]), row(&["1", "a"])]);
        sheets
            .update_range(&RangeRef::row("t", 2, 2), vec![row(&["1", "b"])])
            .await
            .unwrap();
        assert_eq!(sheets.grid("t").await.unwrap()[1], row(&["1", "b"]));
    }

    #[tokio::test]
    async fn delete_shifts_rows_up() {
        let sheets = MemorySheets::new().with_grid(
            "t",
            vec![row(&["id"]), row(&["1"]), row(&["2"]), row(&["3"])],
        );
        let id = sheets.get_table_id("t").await.unwrap();
        sheets.delete_rows(id, 2, 3).await.unwrap();
        let grid = sheets.grid("t").await.unwrap();
        assert_eq!(grid, vec![row(&["id"]), row(&["1"]), row(&["3"])]);
    }

    #[tokio::test]
    async fn unknown_table_is_reported() {
        let sheets = MemorySheets::new();
        let err = sheets.get_table_id("nope").await.unwrap_err();
        assert!(matches!(err, SheetsError::TableNotFound(name) if name == "nope"));
    }
}
