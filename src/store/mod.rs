//! Spreadsheet tabs used as tables of records.
//!
//! The first row of a tab is its header and names the columns; every other
//! non-blank row is a record. Nothing is cached: each operation reads the
//! tab again.

pub mod error;
pub mod ids;
pub mod nested;
pub mod record;
pub mod schema;
pub mod table;

pub use error::StoreError;
pub use ids::{IdStrategy, SequenceSpec};
pub use nested::{EmbeddedChildren, JoinedChildren};
pub use record::{fields, Fields, Record};
pub use schema::Schema;
pub use table::{DeletePolicy, Snapshot, Table, TableSpec, Tombstone};
