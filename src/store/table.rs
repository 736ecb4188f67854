use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::StoreError;
use super::ids::{IdStrategy, SequenceSpec};
use super::record::{filter_blank, records_from_grid, Fields, Record};
use super::schema::Schema;
use crate::sheets::{Grid, RangeRef, SheetsClient, DEFAULT_WIDTH};

/// How a soft-deleted row is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tombstone {
    /// Rows are only ever hard deleted.
    None,
    /// `deleted` is `1` / `true`.
    DeletedFlag,
    /// `status` equals the given value.
    Status(&'static str),
    /// `deleted` flag when the header has that column, otherwise `status`
    /// equal to the given value. Sheets created before the flag existed
    /// have no `deleted` column.
    FlagOrStatus(&'static str),
}

impl Tombstone {
    /// The convention that applies to a sheet with this header.
    pub fn resolve(self, schema: &Schema) -> Tombstone {
        match self {
            Tombstone::FlagOrStatus(value) if !schema.contains("deleted") => Tombstone::Status(value),
            Tombstone::FlagOrStatus(_) => Tombstone::DeletedFlag,
            other => other,
        }
    }

    pub fn is_tombstone(&self, record: &Record, schema: &Schema) -> bool {
        match self.resolve(schema) {
            Tombstone::DeletedFlag => {
                let flag = record.text("deleted");
                flag == "1" || flag.eq_ignore_ascii_case("true")
            }
            Tombstone::Status(value) => record.text("status") == value,
            Tombstone::None | Tombstone::FlagOrStatus(_) => false,
        }
    }

    /// Field values that turn a row of a sheet with this header into a
    /// tombstone.
    pub fn mark(&self, schema: &Schema) -> Fields {
        let mut fields = Fields::new();
        match self.resolve(schema) {
            Tombstone::DeletedFlag => {
                fields.insert("deleted".to_string(), "1".to_string());
            }
            Tombstone::Status(value) => {
                fields.insert("status".to_string(), value.to_string());
            }
            Tombstone::None | Tombstone::FlagOrStatus(_) => {}
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Remove the row; every later row moves up by one.
    Hard,
    /// Keep the row and mark it with the table's [`Tombstone`].
    Soft,
}

/// Static description of one sheet-backed table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Sheet tab name.
    pub name: &'static str,
    /// Used in not-found messages, e.g. `"Order"`.
    pub entity: &'static str,
    /// Header installed when the tab has none.
    pub default_header: &'static [&'static str],
    pub tombstone: Tombstone,
    pub id: IdStrategy,
    pub sequence: Option<SequenceSpec>,
    /// Fields that must be non-blank on create.
    pub required: &'static [&'static str],
}

/// Everything read from a table in one pass.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub schema: Schema,
    /// Non-blank data records, tombstones included.
    pub records: Vec<Record>,
    /// Number of populated rows including the header.
    pub populated_rows: usize,
}

/// A sheet tab used as a table of records.
///
/// Every operation re-reads the tab; there is no caching. Writes from this
/// process are serialised per table, so sequence numbers and row positions
/// stay consistent between requests served here. Nothing coordinates with
/// other processes writing the same spreadsheet: concurrent creators can
/// still mint the same sequence number, concurrent patches clobber whole
/// rows, and a hard delete elsewhere shifts the rows under a stale
/// `row_index`.
#[derive(Clone)]
pub struct Table {
    client: Arc<dyn SheetsClient>,
    spec: TableSpec,
    write_lock: Arc<Mutex<()>>,
}

impl Table {
    pub fn new(client: Arc<dyn SheetsClient>, spec: TableSpec) -> Self {
        Self {
            client,
            spec,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    fn not_found(&self) -> StoreError {
        StoreError::not_found(format!("{} not found", self.spec.entity))
    }

    /// Header of `grid`, installing the default header into row 1 when the
    /// tab has none. A tab that already has a header is never written.
    pub async fn resolve_schema(&self, grid: &Grid) -> Result<Schema, StoreError> {
        if let Some(schema) = Schema::from_grid(grid) {
            return Ok(schema);
        }

        let schema = Schema::new(self.spec.default_header.iter().copied());
        let range = RangeRef::header(self.spec.name, schema.width());
        self.client
            .update_range(&range, vec![schema.names().to_vec()])
            .await?;
        info!("Installed default header on {}", self.spec.name);
        Ok(schema)
    }

    /// Reads the whole tab once.
    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        let grid = self.client.read_range(&RangeRef::full(self.spec.name)).await?;
        let schema = self.resolve_schema(&grid).await?;
        let records = filter_blank(records_from_grid(&grid, &schema));
        debug!("Loaded {} records from {}", records.len(), self.spec.name);
        Ok(Snapshot {
            schema,
            records,
            populated_rows: grid.len().max(1),
        })
    }

    /// Every live record, in sheet order.
    pub async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let tombstone = self.spec.tombstone;
        let snapshot = self.load().await?;
        let schema = snapshot.schema;
        Ok(snapshot
            .records
            .into_iter()
            .filter(|r| !tombstone.is_tombstone(r, &schema))
            .collect())
    }

    /// Every non-blank record, tombstones included.
    pub async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.load().await?.records)
    }

    /// First live record whose trimmed `id` equals `id` exactly.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.find_by("id", id, false).await
    }

    /// First live record whose trimmed `field` equals `value`.
    pub async fn find_by(&self, field: &str, value: &str, ignore_case: bool) -> Result<Option<Record>, StoreError> {
        let value = value.trim();
        Ok(self.list().await?.into_iter().find(|r| {
            let cell = r.text(field);
            if ignore_case {
                cell.to_uppercase() == value.to_uppercase()
            } else {
                cell == value
            }
        }))
    }

    /// Appends a new row built from `fields`.
    ///
    /// Required fields are checked before anything is read. A blank `id` is
    /// generated; a supplied one must not already exist. A blank sequence
    /// field gets the next number after the largest one in the table,
    /// tombstones included.
    pub async fn create(&self, mut fields: Fields) -> Result<Record, StoreError> {
        let missing: Vec<String> = self
            .spec
            .required
            .iter()
            .filter(|name| fields.get(**name).map_or(true, |v| v.trim().is_empty()))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingFields(missing));
        }

        let _guard = self.write_lock.lock().await;
        let snapshot = self.load().await?;

        let supplied_id = fields.get("id").map(|v| v.trim().to_string()).unwrap_or_default();
        let taken = |candidate: &str| snapshot.records.iter().any(|r| r.id() == candidate);
        let id = if supplied_id.is_empty() {
            self.spec.id.generate_unique(taken)
        } else if taken(&supplied_id) {
            return Err(StoreError::invalid("id", format!("'{}' already exists", supplied_id)));
        } else {
            supplied_id
        };
        fields.insert("id".to_string(), id);

        if let Some(sequence) = self.spec.sequence {
            let current = fields.get(sequence.field).map(|v| v.trim().to_string()).unwrap_or_default();
            let value = if current.is_empty() {
                sequence.next(snapshot.records.iter().map(|r| r.get(sequence.field)))?
            } else {
                current
            };
            fields.insert(sequence.field.to_string(), value);
        }

        let mut record = Record::new(fields);
        let width = snapshot.schema.width().max(DEFAULT_WIDTH);
        let range = RangeRef {
            width,
            ..RangeRef::full(self.spec.name)
        };
        self.client.append_row(&range, record.to_row(&snapshot.schema)).await?;
        record.row_index = snapshot.populated_rows + 1;

        info!("Created {} {} in {}", self.spec.entity, record.id(), self.spec.name);
        Ok(record)
    }

    /// Merges `changes` into the live record with this id and rewrites its row.
    pub async fn patch(&self, id: &str, changes: Fields) -> Result<Record, StoreError> {
        let id = id.trim().to_string();
        self.modify_where(move |r| r.id() == id, move |_| Ok((changes, ())))
            .await
            .map(|(record, _)| record)
    }

    /// Reads the first live record matching `matches`, lets `change` compute
    /// the fields to overwrite from it, and rewrites that single row.
    ///
    /// `id` is never changed. An empty change set is a no-op and performs no
    /// write. Cells whose column the header does not name are dropped.
    pub async fn modify_where<P, F, R>(&self, matches: P, change: F) -> Result<(Record, R), StoreError>
    where
        P: Fn(&Record) -> bool + Send,
        F: FnOnce(&Record) -> Result<(Fields, R), StoreError> + Send,
        R: Send,
    {
        self.rewrite_where(matches, move |record, _| change(record)).await
    }

    async fn rewrite_where<P, F, R>(&self, matches: P, change: F) -> Result<(Record, R), StoreError>
    where
        P: Fn(&Record) -> bool + Send,
        F: FnOnce(&Record, &Schema) -> Result<(Fields, R), StoreError> + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.load().await?;
        let schema = snapshot.schema;
        let tombstone = self.spec.tombstone;

        let mut record = snapshot
            .records
            .into_iter()
            .find(|r| !tombstone.is_tombstone(r, &schema) && matches(r))
            .ok_or_else(|| self.not_found())?;

        let (mut changes, extra) = change(&record, &schema)?;
        changes.remove("id");
        if changes.is_empty() {
            return Ok((record, extra));
        }

        record.merge(changes);
        let range = RangeRef::row(self.spec.name, record.row_index, schema.width());
        self.client
            .update_range(&range, vec![record.to_row(&schema)])
            .await?;

        info!(
            "Updated {} {} in {} ({})",
            self.spec.entity,
            record.id(),
            self.spec.name,
            record.changed().collect::<Vec<_>>().join(", ")
        );
        Ok((record, extra))
    }

    /// Deletes the live record with this id.
    pub async fn delete(&self, id: &str, policy: DeletePolicy) -> Result<Record, StoreError> {
        let id = id.trim().to_string();
        self.delete_where(move |r| r.id() == id, policy).await
    }

    /// Deletes the first live record matching `matches`.
    ///
    /// Soft deletion writes the table's tombstone fields. Hard deletion
    /// removes exactly that row, which moves every later row up by one.
    pub async fn delete_where<P>(&self, matches: P, policy: DeletePolicy) -> Result<Record, StoreError>
    where
        P: Fn(&Record) -> bool + Send,
    {
        match policy {
            DeletePolicy::Soft => {
                let tombstone = self.spec.tombstone;
                let table = self.spec.name;
                self.rewrite_where(matches, move |_, schema| {
                    let mark = tombstone.mark(schema);
                    if mark.is_empty() {
                        return Err(StoreError::missing_column(table, "deleted"));
                    }
                    if let Some(column) = mark.keys().find(|c| !schema.contains(c.as_str())) {
                        return Err(StoreError::missing_column(table, column.as_str()));
                    }
                    Ok((mark, ()))
                })
                .await
                .map(|(record, _)| record)
            }
            DeletePolicy::Hard => {
                let _guard = self.write_lock.lock().await;
                let snapshot = self.load().await?;
                let tombstone = self.spec.tombstone;
                let schema = snapshot.schema;
                let record = snapshot
                    .records
                    .into_iter()
                    .find(|r| !tombstone.is_tombstone(r, &schema) && matches(r))
                    .ok_or_else(|| self.not_found())?;

                let table_id = self.client.get_table_id(self.spec.name).await?;
                let start = record.row_index - 1;
                self.client.delete_rows(table_id, start, start + 1).await?;

                info!(
                    "Deleted row {} ({} {}) from {}",
                    record.row_index,
                    self.spec.entity,
                    record.id(),
                    self.spec.name
                );
                Ok(record)
            }
        }
    }
}
