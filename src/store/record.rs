use std::collections::{BTreeMap, BTreeSet};

use super::schema::Schema;
use crate::sheets::Grid;

/// Column name to cell text.
pub type Fields = BTreeMap<String, String>;

/// Sheet row of the first data record: row 1 holds the header.
pub const FIRST_DATA_ROW: usize = 2;

/// One data row viewed through a [`Schema`].
///
/// `row_index` is the 1-based sheet row the record was read from. It is only
/// meaningful until the next row deletion on the same table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub row_index: usize,
    fields: Fields,
    changed: BTreeSet<String>,
}

impl Record {
    /// A record that has not been written yet.
    pub fn new(fields: Fields) -> Self {
        Self {
            row_index: 0,
            fields,
            changed: BTreeSet::new(),
        }
    }

    /// Maps the data row at 0-based `position` (header excluded). Cells past
    /// the end of a short row read as empty strings.
    pub fn from_row(row: &[String], schema: &Schema, position: usize) -> Self {
        let fields = schema
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect();
        Self {
            row_index: position + FIRST_DATA_ROW,
            fields,
            changed: BTreeSet::new(),
        }
    }

    /// Cells in header order. Fields the header does not name are dropped.
    pub fn to_row(&self, schema: &Schema) -> Vec<String> {
        schema
            .names()
            .iter()
            .map(|name| self.fields.get(name).cloned().unwrap_or_default())
            .collect()
    }

    /// Raw cell text, or `""` when the field is absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Trimmed cell text.
    pub fn text(&self, name: &str) -> String {
        self.get(name).trim().to_string()
    }

    pub fn id(&self) -> &str {
        self.get("id").trim()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.changed.insert(name.clone());
        self.fields.insert(name, value.into());
        self
    }

    /// Overwrites every field present in `changes`; everything else keeps its value.
    pub fn merge(&mut self, changes: Fields) -> &mut Self {
        for (name, value) in changes {
            self.set(name, value);
        }
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Names set since the record was read.
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// True when every cell trims to empty.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

/// Maps every data row of `grid` (row 0 is the header).
pub fn records_from_grid(grid: &Grid, schema: &Schema) -> Vec<Record> {
    grid.iter()
        .skip(1)
        .enumerate()
        .map(|(position, row)| Record::from_row(row, schema, position))
        .collect()
}

/// Drops fully blank records, e.g. cleared rows left inside the table.
pub fn filter_blank(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter(|r| !r.is_blank()).collect()
}

/// Builds a [`Fields`] map from pairs.
pub fn fields<K, V, I>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(["id", "name", "status"])
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let record = Record::from_row(&row(&["A1"]), &schema(), 0);
        assert_eq!(record.row_index, 2);
        assert_eq!(record.get("name"), "");
        assert_eq!(record.get("status"), "");
        assert_eq!(record.get("missing"), "");
    }

    #[test]
    fn row_round_trip_keeps_header_fields_only() {
        let original = Record::new(fields([("id", "A1"), ("name", "Nike"), ("extra", "dropped")]));
        let cells = original.to_row(&schema());
        assert_eq!(cells, row(&["A1", "Nike", ""]));

        let back = Record::from_row(&cells, &schema(), 3);
        assert_eq!(back.get("id"), "A1");
        assert_eq!(back.get("name"), "Nike");
        assert!(!back.fields().contains_key("extra"));
        assert_eq!(back.row_index, 5);
    }

    #[test]
    fn merge_leaves_untouched_fields() {
        let mut record = Record::from_row(&row(&["A1", "Nike", "pending"]), &schema(), 0);
        record.merge(fields([("status", "completed")]));
        assert_eq!(record.get("name"), "Nike");
        assert_eq!(record.get("status"), "completed");
        assert_eq!(record.changed().collect::<Vec<_>>(), vec!["status"]);
    }

    #[test]
    fn blank_records_are_filtered() {
        let grid = vec![row(&["id", "name", "status"]), row(&["A1"]), row(&["  ", ""]), row(&["A2", "x"])];
        let records = filter_blank(records_from_grid(&grid, &schema()));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].row_index, 4);
    }
}
