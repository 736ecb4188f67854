//! Flat resources whose rows need no domain logic beyond field coercion.
//!
//! Each one is described by a [`ResourceDef`]; [`CatalogResource`] runs the
//! generic list/get/create/update/delete operations for it.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::normalize::{date_ms, now_iso, number_cell, scalar_text, to_number, today};
use crate::sheets::SheetsClient;
use crate::store::{DeletePolicy, Fields, IdStrategy, Record, StoreError, Table, TableSpec, Tombstone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Stored as text, returned as a JSON number (0 when blank).
    Number,
}

/// Value used on create when the caller leaves a field blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    None,
    /// Also shown when a stored cell is blank.
    Literal(&'static str),
    /// `YYYY-MM-DD`
    Today,
    /// RFC 3339 timestamp.
    Now,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
}

const fn text(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Text,
        default: FieldDefault::None,
    }
}

const fn number(name: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Number,
        default: FieldDefault::None,
    }
}

const fn defaulted(name: &'static str, default: FieldDefault) -> FieldDef {
    FieldDef {
        name,
        kind: FieldKind::Text,
        default,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceDef {
    /// Mounted at `/api/{path}`.
    pub path: &'static str,
    pub table: TableSpec,
    /// Every column except `id`, in header order.
    pub fields: &'static [FieldDef],
    /// Query parameters that filter the list by exact field value.
    pub filters: &'static [&'static str],
    /// Fields searched case-insensitively by `?q=`.
    pub search: &'static [&'static str],
    /// List order: newest value of this date field first.
    pub newest_first_by: Option<&'static str>,
    /// Reads need no admin credential.
    pub public_reads: bool,
    /// Creates need no admin credential.
    pub public_create: bool,
}

pub const PRODUCTS: ResourceDef = ResourceDef {
    path: "products",
    table: TableSpec {
        name: "products",
        entity: "Product",
        default_header: &["id", "name", "description", "price", "imageUrl", "category", "stock", "rating", "status"],
        tombstone: Tombstone::None,
        id: IdStrategy::Timestamp("prd"),
        sequence: None,
        required: &["name", "description", "imageUrl", "category"],
    },
    fields: &[
        text("name"),
        text("description"),
        number("price"),
        text("imageUrl"),
        text("category"),
        number("stock"),
        number("rating"),
        defaulted("status", FieldDefault::Literal("published")),
    ],
    filters: &["category", "status"],
    search: &[],
    newest_first_by: None,
    public_reads: true,
    public_create: false,
};

pub const NEWS: ResourceDef = ResourceDef {
    path: "news",
    table: TableSpec {
        name: "news",
        entity: "Article",
        default_header: &[
            "id",
            "title",
            "excerpt",
            "content",
            "imageUrl",
            "category",
            "author",
            "publishedDate",
            "status",
        ],
        tombstone: Tombstone::None,
        id: IdStrategy::Timestamp("news"),
        sequence: None,
        required: &["title", "excerpt", "content", "imageUrl"],
    },
    fields: &[
        text("title"),
        text("excerpt"),
        text("content"),
        text("imageUrl"),
        defaulted("category", FieldDefault::Literal("news")),
        defaulted("author", FieldDefault::Literal("Admin")),
        defaulted("publishedDate", FieldDefault::Today),
        defaulted("status", FieldDefault::Literal("published")),
    ],
    filters: &["category", "status"],
    search: &["title", "excerpt", "content"],
    newest_first_by: Some("publishedDate"),
    public_reads: true,
    public_create: false,
};

pub const MESSAGES: ResourceDef = ResourceDef {
    path: "messages",
    table: TableSpec {
        name: "messages",
        entity: "Message",
        default_header: &["id", "createdAt", "fullName", "phone", "email", "message", "status", "source"],
        tombstone: Tombstone::None,
        id: IdStrategy::Timestamp("msg"),
        sequence: None,
        required: &["fullName", "phone", "message"],
    },
    fields: &[
        defaulted("createdAt", FieldDefault::Now),
        text("fullName"),
        text("phone"),
        text("email"),
        text("message"),
        defaulted("status", FieldDefault::Literal("new")),
        defaulted("source", FieldDefault::Literal("contact-page")),
    ],
    filters: &["status"],
    search: &[],
    newest_first_by: Some("createdAt"),
    public_reads: false,
    public_create: true,
};

pub const CONTACT: ResourceDef = ResourceDef {
    path: "contact",
    table: TableSpec {
        name: "contact",
        entity: "Store",
        default_header: &["id", "name", "address", "phone", "email", "hours", "googleMapsUrl"],
        tombstone: Tombstone::None,
        id: IdStrategy::Timestamp("store"),
        sequence: None,
        required: &["name", "address", "phone", "email"],
    },
    fields: &[
        text("name"),
        text("address"),
        text("phone"),
        text("email"),
        text("hours"),
        text("googleMapsUrl"),
    ],
    filters: &[],
    search: &[],
    newest_first_by: None,
    public_reads: true,
    public_create: false,
};

pub const CATALOG: [ResourceDef; 4] = [PRODUCTS, NEWS, MESSAGES, CONTACT];

/// Cell text to store for `value`, or `None` when it is not a scalar.
fn cell_value(field: &FieldDef, value: &Value) -> Option<String> {
    let text = scalar_text(value)?;
    Some(match field.kind {
        FieldKind::Number if text.is_empty() => text,
        FieldKind::Number => number_cell(to_number(&text, 0.0)),
        FieldKind::Text => text,
    })
}

fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
pub struct CatalogResource {
    def: ResourceDef,
    table: Table,
}

impl CatalogResource {
    pub fn new(client: Arc<dyn SheetsClient>, def: ResourceDef) -> Self {
        Self {
            table: Table::new(client, def.table),
            def,
        }
    }

    pub fn def(&self) -> &ResourceDef {
        &self.def
    }

    fn to_json(&self, record: &Record) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), Value::String(record.id().to_string()));
        for field in self.def.fields {
            let cell = record.text(field.name);
            let value = match (field.kind, field.default) {
                (FieldKind::Number, _) => json_number(to_number(&cell, 0.0)),
                (FieldKind::Text, FieldDefault::Literal(default)) if cell.is_empty() => Value::String(default.into()),
                (FieldKind::Text, _) => Value::String(cell),
            };
            out.insert(field.name.into(), value);
        }
        Value::Object(out)
    }

    /// Every record matching the filters in `query`.
    pub async fn list(&self, query: &HashMap<String, String>) -> Result<Vec<Value>, StoreError> {
        let param = |name: &str| query.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());
        // `q` only means something for resources with searchable fields
        let needle = param("q")
            .filter(|_| !self.def.search.is_empty())
            .map(str::to_lowercase);

        let mut records: Vec<Record> = self
            .table
            .list()
            .await?
            .into_iter()
            .filter(|r| {
                self.def
                    .filters
                    .iter()
                    .all(|f| param(f).map_or(true, |wanted| self.shown(r, f) == wanted))
            })
            .filter(|r| match &needle {
                Some(needle) => self
                    .def
                    .search
                    .iter()
                    .any(|f| r.text(f).to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();

        if let Some(field) = self.def.newest_first_by {
            records.sort_by_key(|r| std::cmp::Reverse(date_ms(r.get(field))));
        }
        Ok(records.iter().map(|r| self.to_json(r)).collect())
    }

    /// Stored text of `field`, with a literal default standing in for blank.
    fn shown(&self, record: &Record, field: &str) -> String {
        let cell = record.text(field);
        match self.def.fields.iter().find(|f| f.name == field).map(|f| f.default) {
            Some(FieldDefault::Literal(default)) if cell.is_empty() => default.to_string(),
            _ => cell,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Value, StoreError> {
        let record = self
            .table
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("{} not found", self.def.table.entity)))?;
        Ok(self.to_json(&record))
    }

    pub async fn create(&self, body: &Map<String, Value>) -> Result<Value, StoreError> {
        let mut f = Fields::new();
        if let Some(id) = body.get("id").and_then(scalar_text).filter(|id| !id.is_empty()) {
            f.insert("id".into(), id);
        }
        for field in self.def.fields {
            let given = body.get(field.name).and_then(|v| cell_value(field, v)).filter(|v| !v.is_empty());
            let value = match (given, field.default) {
                (Some(value), _) => value,
                (None, FieldDefault::Literal(default)) => default.to_string(),
                (None, FieldDefault::Today) => today(),
                (None, FieldDefault::Now) => now_iso(),
                (None, FieldDefault::None) if field.kind == FieldKind::Number => "0".to_string(),
                (None, FieldDefault::None) => String::new(),
            };
            f.insert(field.name.into(), value);
        }

        let record = self.table.create(f).await?;
        Ok(self.to_json(&record))
    }

    /// Overwrites the fields present in `body`; `id` never changes.
    pub async fn update(&self, id: &str, body: &Map<String, Value>) -> Result<Value, StoreError> {
        let changes: Fields = self
            .def
            .fields
            .iter()
            .filter_map(|field| {
                let value = body.get(field.name)?;
                cell_value(field, value).map(|v| (field.name.to_string(), v))
            })
            .collect();

        let record = self.table.patch(id, changes).await?;
        Ok(self.to_json(&record))
    }

    /// Removes the row.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.table.delete(id, DeletePolicy::Hard).await?;
        Ok(())
    }
}

/// One [`CatalogResource`] per entry of [`CATALOG`].
pub fn catalog(client: Arc<dyn SheetsClient>) -> Vec<CatalogResource> {
    CATALOG
        .iter()
        .map(|def| CatalogResource::new(client.clone(), *def))
        .collect()
}
