//! One-to-many child collections.
//!
//! Children are kept either as a JSON array inside one cell of the parent
//! row ([`EmbeddedChildren`]) or as rows of a second table carrying the
//! parent id in a foreign-key column ([`JoinedChildren`]).

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::StoreError;
use super::record::{Fields, Record};
use super::table::{DeletePolicy, Table};

/// Children stored in a cell. Blank text, malformed JSON and non-array JSON
/// all read as an empty collection.
pub fn parse_children(cell: &str) -> Vec<Value> {
    let raw = cell.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Cell text for `children`; always a JSON array.
pub fn serialize_children(children: &[Value]) -> String {
    serde_json::to_string(children).unwrap_or_else(|_| "[]".to_string())
}

/// Trimmed `id` of a child object; numbers are accepted too.
pub fn child_id(child: &Value) -> String {
    match child.get("id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Buckets `records` by the trimmed value of `foreign_key`.
pub fn group_by(records: Vec<Record>, foreign_key: &str) -> HashMap<String, Vec<Record>> {
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for record in records {
        groups.entry(record.text(foreign_key)).or_default().push(record);
    }
    groups
}

/// Children serialised into `field` of the parent row.
///
/// Every mutation rewrites the whole parent row from the snapshot read at the
/// start of the mutation.
#[derive(Clone)]
pub struct EmbeddedChildren {
    parent: Table,
    field: &'static str,
    entity: &'static str,
}

impl EmbeddedChildren {
    pub fn new(parent: Table, field: &'static str, entity: &'static str) -> Self {
        Self { parent, field, entity }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn children(&self, parent: &Record) -> Vec<Value> {
        parse_children(parent.get(self.field))
    }

    fn child_not_found(&self) -> StoreError {
        StoreError::not_found(format!("{} not found", self.entity))
    }

    /// Appends `child` to the parent's collection.
    pub async fn add(&self, parent_id: &str, child: Map<String, Value>) -> Result<Value, StoreError> {
        let parent_id = parent_id.trim().to_string();
        let field = self.field;
        let child = Value::Object(child);

        let (_, added) = self
            .parent
            .modify_where(
                move |r| r.id() == parent_id,
                move |record| {
                    let mut children = parse_children(record.get(field));
                    children.push(child.clone());
                    let mut changes = Fields::new();
                    changes.insert(field.to_string(), serialize_children(&children));
                    Ok((changes, child))
                },
            )
            .await?;
        Ok(added)
    }

    /// Applies `change` to the child with `child_id`.
    pub async fn update<F>(&self, parent_id: &str, child_id: &str, change: F) -> Result<Value, StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), StoreError> + Send,
    {
        let parent_id = parent_id.trim().to_string();
        let wanted = child_id.trim().to_string();
        let field = self.field;
        let missing = self.child_not_found();

        let (_, updated) = self
            .parent
            .modify_where(
                move |r| r.id() == parent_id,
                move |record| {
                    let mut children = parse_children(record.get(field));
                    let child = children
                        .iter_mut()
                        .find(|c| self::child_id(c) == wanted)
                        .ok_or(missing)?;
                    change(child)?;
                    let updated = child.clone();
                    let mut changes = Fields::new();
                    changes.insert(field.to_string(), serialize_children(&children));
                    Ok((changes, updated))
                },
            )
            .await?;
        Ok(updated)
    }

    /// Removes the child with `child_id` from the array.
    pub async fn remove(&self, parent_id: &str, child_id: &str) -> Result<Value, StoreError> {
        let parent_id = parent_id.trim().to_string();
        let wanted = child_id.trim().to_string();
        let field = self.field;
        let missing = self.child_not_found();

        let (_, removed) = self
            .parent
            .modify_where(
                move |r| r.id() == parent_id,
                move |record| {
                    let mut children = parse_children(record.get(field));
                    let position = children
                        .iter()
                        .position(|c| self::child_id(c) == wanted)
                        .ok_or(missing)?;
                    let removed = children.remove(position);
                    let mut changes = Fields::new();
                    changes.insert(field.to_string(), serialize_children(&children));
                    Ok((changes, removed))
                },
            )
            .await?;
        Ok(removed)
    }
}

/// Children stored as rows of their own table.
#[derive(Clone)]
pub struct JoinedChildren {
    table: Table,
    foreign_key: &'static str,
}

impl JoinedChildren {
    pub fn new(table: Table, foreign_key: &'static str) -> Self {
        Self { table, foreign_key }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Creates a child row attached to `parent_id`.
    pub async fn add(&self, parent_id: &str, mut fields: Fields) -> Result<Record, StoreError> {
        fields.insert(self.foreign_key.to_string(), parent_id.trim().to_string());
        self.table.create(fields).await
    }

    fn matcher(&self, parent_id: &str, child_id: &str) -> impl Fn(&Record) -> bool + Send + 'static {
        let foreign_key = self.foreign_key;
        let parent_id = parent_id.trim().to_string();
        let child_id = child_id.trim().to_string();
        move |r: &Record| r.id() == child_id && r.text(foreign_key) == parent_id
    }

    /// Patches a child; it must belong to `parent_id`.
    pub async fn update(&self, parent_id: &str, child_id: &str, mut changes: Fields) -> Result<Record, StoreError> {
        changes.remove(self.foreign_key);
        self.table
            .modify_where(self.matcher(parent_id, child_id), move |_| Ok((changes, ())))
            .await
            .map(|(record, _)| record)
    }

    pub async fn remove(&self, parent_id: &str, child_id: &str, policy: DeletePolicy) -> Result<Record, StoreError> {
        self.table.delete_where(self.matcher(parent_id, child_id), policy).await
    }

    /// Live children of every parent, read in one pass.
    pub async fn grouped(&self) -> Result<HashMap<String, Vec<Record>>, StoreError> {
        Ok(group_by(self.table.list().await?, self.foreign_key))
    }

    pub async fn for_parent(&self, parent_id: &str) -> Result<Vec<Record>, StoreError> {
        let parent_id = parent_id.trim();
        Ok(self
            .table
            .list()
            .await?
            .into_iter()
            .filter(|r| r.text(self.foreign_key) == parent_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemorySheets;
    use crate::store::ids::IdStrategy;
    use crate::store::record::fields;
    use crate::store::table::{TableSpec, Tombstone};
    use serde_json::json;
    use std::sync::Arc;

    const PARENTS: TableSpec = TableSpec {
        name: "parents",
        entity: "Parent",
        default_header: &["id", "title", "kids"],
        tombstone: Tombstone::None,
        id: IdStrategy::Timestamp("p"),
        sequence: None,
        required: &[],
    };

    const KIDS: TableSpec = TableSpec {
        name: "kids",
        entity: "Kid",
        default_header: &["id", "parentId", "name", "deleted"],
        tombstone: Tombstone::DeletedFlag,
        id: IdStrategy::RandomHex("K"),
        sequence: None,
        required: &["name"],
    };

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn malformed_cells_read_as_empty() {
        assert!(parse_children("").is_empty());
        assert!(parse_children("   ").is_empty());
        assert!(parse_children("{not json").is_empty());
        assert!(parse_children("{\"id\":1}").is_empty());
        assert_eq!(parse_children(" [{\"id\":\"a\"}] ").len(), 1);
        assert_eq!(serialize_children(&[]), "[]");
    }

    #[test]
    fn child_ids_accept_numbers() {
        assert_eq!(child_id(&json!({"id": " s1 "})), "s1");
        assert_eq!(child_id(&json!({"id": 7})), "7");
        assert_eq!(child_id(&json!({"name": "x"})), "");
    }

    #[tokio::test]
    async fn embedded_add_update_remove() {
        let sheets = Arc::new(MemorySheets::new().with_grid(
            "parents",
            vec![row(&["id", "title", "kids"]), row(&["P1", "First", ""])],
        ));
        let kids = EmbeddedChildren::new(Table::new(sheets.clone(), PARENTS), "kids", "Kid");

        kids.add("P1", object(json!({"id": "k1", "name": "Ann"}))).await.unwrap();
        kids.add("P1", object(json!({"id": "k2", "name": "Bo"}))).await.unwrap();

        let updated = kids
            .update("P1", "k2", |child| {
                child["name"] = json!("Bob");
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated["name"], "Bob");

        kids.remove("P1", "k1").await.unwrap();
        let cell = sheets.grid("parents").await.unwrap()[1][2].clone();
        assert_eq!(parse_children(&cell), vec![json!({"id": "k2", "name": "Bob"})]);
        assert_eq!(sheets.grid("parents").await.unwrap()[1][1], "First");

        let err = kids.remove("P1", "k1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(msg) if msg == "Kid not found"));
        let err = kids.add("P9", Map::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(msg) if msg == "Parent not found"));
    }

    #[tokio::test]
    async fn joined_children_are_scoped_to_their_parent() {
        let sheets = Arc::new(MemorySheets::new().with_table("kids"));
        let kids = JoinedChildren::new(Table::new(sheets.clone(), KIDS), "parentId");

        let ann = kids.add("P1", fields([("name", "Ann")])).await.unwrap();
        kids.add("P2", fields([("name", "Bo")])).await.unwrap();
        kids.add("P1", fields([("name", "Cy")])).await.unwrap();

        let groups = kids.grouped().await.unwrap();
        assert_eq!(groups["P1"].len(), 2);
        assert_eq!(groups["P2"].len(), 1);

        let err = kids.update("P2", ann.id(), fields([("name", "x")])).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let renamed = kids
            .update("P1", ann.id(), fields([("name", "Anna"), ("parentId", "P2")]))
            .await
            .unwrap();
        assert_eq!(renamed.get("parentId"), "P1");

        kids.remove("P1", ann.id(), DeletePolicy::Soft).await.unwrap();
        let left = kids.for_parent("P1").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].get("name"), "Cy");
    }
}
