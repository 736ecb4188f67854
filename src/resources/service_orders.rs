//! Service orders and the shoes handed in with them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::normalize::{date_ms, list_from_cell, list_to_cell, number_cell, opt_list, opt_text, scalar_text, string_list, to_number, today, StatusSet};
use crate::config::ShoeStorage;
use crate::sheets::SheetsClient;
use crate::store::nested::child_id;
use crate::store::{
    fields, DeletePolicy, EmbeddedChildren, Fields, IdStrategy, JoinedChildren, Record, SequenceSpec, StoreError, Table,
    TableSpec, Tombstone,
};

pub const ORDERS_TABLE: TableSpec = TableSpec {
    name: "service_orders",
    entity: "Order",
    default_header: &[
        "id",
        "orderNumber",
        "customerName",
        "customerPhone",
        "createdDate",
        "totalAmount",
        "status",
        "assignedTo",
        "shoesJson",
        "deleted",
    ],
    tombstone: Tombstone::FlagOrStatus("cancelled"),
    id: IdStrategy::Timestamp("ord"),
    sequence: Some(SequenceSpec {
        field: "orderNumber",
        prefix: "ORD",
        width: 3,
    }),
    required: &["customerName", "customerPhone"],
};

pub const SHOES_TABLE: TableSpec = TableSpec {
    name: "service_order_shoes",
    entity: "Shoe",
    default_header: &["id", "orderId", "name", "service", "status", "images", "notes", "deleted"],
    tombstone: Tombstone::DeletedFlag,
    id: SHOE_IDS,
    sequence: None,
    required: &["name", "service"],
};

/// Cell holding embedded shoes on the order row.
pub const SHOES_FIELD: &str = "shoesJson";
pub const ORDER_KEY: &str = "orderId";
const SHOE_IDS: IdStrategy = IdStrategy::RandomHex("SH");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl StatusSet for OrderStatus {
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[Self::Pending, Self::Processing, Self::Completed, Self::Cancelled];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoeStatus {
    #[default]
    Received,
    Processing,
    Completed,
}

impl StatusSet for ShoeStatus {
    const FIELD: &'static str = "status";
    const ALL: &'static [Self] = &[Self::Received, Self::Processing, Self::Completed];

    fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shoe {
    pub id: String,
    pub name: String,
    pub service: String,
    pub status: ShoeStatus,
    pub images: Vec<String>,
    pub notes: String,
}

impl Shoe {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id().to_string(),
            name: record.text("name"),
            service: record.text("service"),
            status: ShoeStatus::from_stored(record.get("status")),
            images: list_from_cell(record.get("images")),
            notes: record.text("notes"),
        }
    }

    fn from_value(value: &Value) -> Self {
        let text = |name: &str| value.get(name).and_then(scalar_text).unwrap_or_default();
        Self {
            id: child_id(value),
            name: text("name"),
            service: text("service"),
            status: ShoeStatus::from_stored(&text("status")),
            images: value.get("images").and_then(string_list).unwrap_or_default(),
            notes: text("notes"),
        }
    }

    fn to_object(&self) -> Map<String, Value> {
        let value = json!({
            "id": self.id,
            "name": self.name,
            "service": self.service,
            "status": self.status.as_str(),
            "images": self.images,
            "notes": self.notes,
        });
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn apply(&mut self, changes: &ShoeChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(service) = &changes.service {
            self.service = service.clone();
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(images) = &changes.images {
            self.images = images.clone();
        }
        if let Some(notes) = &changes.notes {
            self.notes = notes.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    pub id: String,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub created_date: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub assigned_to: String,
    pub shoes: Vec<Shoe>,
}

impl ServiceOrder {
    /// `joined` shoes come first, then any kept in the order's own cell.
    fn from_record(record: &Record, joined: Vec<Record>) -> Self {
        let mut shoes: Vec<Shoe> = joined.iter().map(Shoe::from_record).collect();
        shoes.extend(
            crate::store::nested::parse_children(record.get(SHOES_FIELD))
                .iter()
                .map(Shoe::from_value),
        );
        Self {
            id: record.id().to_string(),
            order_number: record.text("orderNumber"),
            customer_name: record.text("customerName"),
            customer_phone: record.text("customerPhone"),
            created_date: record.text("createdDate"),
            total_amount: to_number(record.get("totalAmount"), 0.0),
            status: OrderStatus::from_stored(record.get("status")),
            assigned_to: record.text("assignedTo"),
            shoes,
        }
    }
}

/// Newest `createdDate` first; ties by `orderNumber`, highest first.
fn newest_first(a: &ServiceOrder, b: &ServiceOrder) -> Ordering {
    let number = |o: &ServiceOrder| ORDERS_TABLE.sequence.and_then(|s| s.parse(&o.order_number));
    date_ms(&b.created_date)
        .cmp(&date_ms(&a.created_date))
        .then_with(|| number(b).cmp(&number(a)))
        .then_with(|| b.order_number.cmp(&a.order_number))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceOrder {
    #[serde(default, deserialize_with = "opt_text")]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub customer_phone: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub total_amount: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub assigned_to: Option<String>,
}

/// Fields a PATCH may change; absent fields keep their value.
pub type ServiceOrderPatch = NewServiceOrder;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewShoe {
    #[serde(default, deserialize_with = "opt_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_list")]
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "opt_text")]
    pub notes: Option<String>,
}

pub type ShoePatch = NewShoe;

/// A validated shoe patch.
#[derive(Debug, Clone, Default)]
struct ShoeChanges {
    name: Option<String>,
    service: Option<String>,
    status: Option<ShoeStatus>,
    images: Option<Vec<String>>,
    notes: Option<String>,
}

impl ShoeChanges {
    fn parse(patch: ShoePatch) -> Result<Self, StoreError> {
        Ok(Self {
            status: patch.status.as_deref().map(ShoeStatus::from_input).transpose()?,
            name: patch.name,
            service: patch.service,
            images: patch.images,
            notes: patch.notes,
        })
    }

    fn into_fields(self) -> Fields {
        let mut out = Fields::new();
        let mut put = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                out.insert(name.to_string(), value);
            }
        };
        put("name", self.name);
        put("service", self.service);
        put("status", self.status.map(|s| s.as_str().to_string()));
        put("images", self.images.map(|i| list_to_cell(&i)));
        put("notes", self.notes);
        out
    }
}

#[derive(Clone)]
enum ShoeStore {
    Joined(JoinedChildren),
    Embedded(EmbeddedChildren),
}

/// Service orders backed by the `service_orders` tab, with shoes kept where
/// [`ShoeStorage`] says.
///
/// In joined mode a non-empty `shoesJson` cell left over from embedded
/// storage is still read and listed after the joined shoes; those shoes
/// cannot be changed through this API any more.
#[derive(Clone)]
pub struct ServiceOrders {
    orders: Table,
    shoes: ShoeStore,
}

impl ServiceOrders {
    pub fn new(client: Arc<dyn SheetsClient>, storage: ShoeStorage) -> Self {
        let orders = Table::new(client.clone(), ORDERS_TABLE);
        let shoes = match storage {
            ShoeStorage::Joined => ShoeStore::Joined(JoinedChildren::new(Table::new(client, SHOES_TABLE), ORDER_KEY)),
            ShoeStorage::Embedded => ShoeStore::Embedded(EmbeddedChildren::new(orders.clone(), SHOES_FIELD, "Shoe")),
        };
        Self { orders, shoes }
    }

    pub fn storage(&self) -> ShoeStorage {
        match self.shoes {
            ShoeStore::Joined(_) => ShoeStorage::Joined,
            ShoeStore::Embedded(_) => ShoeStorage::Embedded,
        }
    }

    async fn with_shoes(&self, record: Record) -> Result<ServiceOrder, StoreError> {
        let joined = match &self.shoes {
            ShoeStore::Joined(shoes) => shoes.for_parent(record.id()).await?,
            ShoeStore::Embedded(_) => Vec::new(),
        };
        Ok(ServiceOrder::from_record(&record, joined))
    }

    async fn require_order(&self, id: &str) -> Result<Record, StoreError> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order not found"))
    }

    /// Every live order, newest first.
    pub async fn list(&self) -> Result<Vec<ServiceOrder>, StoreError> {
        let records = self.orders.list().await?;
        let mut grouped: HashMap<String, Vec<Record>> = match &self.shoes {
            ShoeStore::Joined(shoes) => shoes.grouped().await?,
            ShoeStore::Embedded(_) => HashMap::new(),
        };

        let mut orders: Vec<ServiceOrder> = records
            .iter()
            .map(|r| ServiceOrder::from_record(r, grouped.remove(r.id()).unwrap_or_default()))
            .collect();
        orders.sort_by(newest_first);
        Ok(orders)
    }

    pub async fn get(&self, id: &str) -> Result<ServiceOrder, StoreError> {
        let record = self.require_order(id).await?;
        self.with_shoes(record).await
    }

    /// Looks an order up by its order number, ignoring case.
    pub async fn track(&self, order_number: &str) -> Result<ServiceOrder, StoreError> {
        let record = self
            .orders
            .find_by("orderNumber", order_number, true)
            .await?
            .ok_or_else(|| StoreError::not_found("Order not found"))?;
        self.with_shoes(record).await
    }

    pub async fn create(&self, input: NewServiceOrder) -> Result<ServiceOrder, StoreError> {
        let status = OrderStatus::from_optional_input(input.status.as_deref())?;

        let mut f = fields([
            ("customerName", input.customer_name.unwrap_or_default()),
            ("customerPhone", input.customer_phone.unwrap_or_default()),
            ("createdDate", input.created_date.filter(|d| !d.is_empty()).unwrap_or_else(today)),
            ("totalAmount", number_cell(to_number(input.total_amount.as_deref().unwrap_or(""), 0.0))),
            ("status", status.as_str().to_string()),
            ("assignedTo", input.assigned_to.unwrap_or_default()),
            (SHOES_FIELD, "[]".to_string()),
            ("deleted", "0".to_string()),
        ]);
        if let Some(number) = input.order_number.filter(|n| !n.is_empty()) {
            f.insert("orderNumber".to_string(), number);
        }

        let record = self.orders.create(f).await?;
        Ok(ServiceOrder::from_record(&record, Vec::new()))
    }

    /// Changes the fields present in `input`. An invalid status is rejected
    /// before anything is written.
    pub async fn update(&self, id: &str, input: ServiceOrderPatch) -> Result<ServiceOrder, StoreError> {
        let mut changes = Fields::new();
        if let Some(status) = input.status.as_deref() {
            changes.insert("status".into(), OrderStatus::from_input(status)?.as_str().into());
        }
        if let Some(amount) = input.total_amount.as_deref() {
            changes.insert("totalAmount".into(), number_cell(to_number(amount, 0.0)));
        }
        let text_fields = [
            ("customerName", input.customer_name),
            ("customerPhone", input.customer_phone),
            ("createdDate", input.created_date),
            ("assignedTo", input.assigned_to),
            ("orderNumber", input.order_number),
        ];
        for (name, value) in text_fields {
            if let Some(value) = value {
                changes.insert(name.to_string(), value);
            }
        }

        let record = self.orders.patch(id, changes).await?;
        self.with_shoes(record).await
    }

    /// Soft delete: the row is kept, flagged deleted and cancelled. On sheets
    /// without a `deleted` column the cancelled status alone hides it. Its shoes
    /// are left alone.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.orders
            .patch(id, fields([("deleted", "1"), ("status", OrderStatus::Cancelled.as_str())]))
            .await?;
        Ok(())
    }

    pub async fn add_shoe(&self, order_id: &str, input: NewShoe) -> Result<Shoe, StoreError> {
        let status = ShoeStatus::from_optional_input(input.status.as_deref())?;
        let name = input.name.unwrap_or_default();
        let service = input.service.unwrap_or_default();
        let missing: Vec<String> = [("name", &name), ("service", &service)]
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingFields(missing));
        }

        let shoe = Shoe {
            id: input.id.filter(|id| !id.is_empty()).unwrap_or_default(),
            name,
            service,
            status,
            images: input.images.unwrap_or_default(),
            notes: input.notes.unwrap_or_default(),
        };

        match &self.shoes {
            ShoeStore::Joined(shoes) => {
                self.require_order(order_id).await?;
                let mut f = fields([
                    ("name", shoe.name.clone()),
                    ("service", shoe.service.clone()),
                    ("status", shoe.status.as_str().to_string()),
                    ("images", list_to_cell(&shoe.images)),
                    ("notes", shoe.notes.clone()),
                    ("deleted", "0".to_string()),
                ]);
                if !shoe.id.is_empty() {
                    f.insert("id".into(), shoe.id.clone());
                }
                let record = shoes.add(order_id, f).await?;
                Ok(Shoe::from_record(&record))
            }
            ShoeStore::Embedded(shoes) => {
                let shoe = Shoe {
                    id: if shoe.id.is_empty() { SHOE_IDS.generate() } else { shoe.id.clone() },
                    ..shoe
                };
                shoes.add(order_id, shoe.to_object()).await?;
                Ok(shoe)
            }
        }
    }

    pub async fn update_shoe(&self, order_id: &str, shoe_id: &str, input: ShoePatch) -> Result<Shoe, StoreError> {
        let changes = ShoeChanges::parse(input)?;

        match &self.shoes {
            ShoeStore::Joined(shoes) => {
                self.require_order(order_id).await?;
                let record = shoes.update(order_id, shoe_id, changes.into_fields()).await?;
                Ok(Shoe::from_record(&record))
            }
            ShoeStore::Embedded(shoes) => {
                let updated = shoes
                    .update(order_id, shoe_id, move |value| {
                        let mut shoe = Shoe::from_value(value);
                        shoe.apply(&changes);
                        *value = Value::Object(shoe.to_object());
                        Ok(())
                    })
                    .await?;
                Ok(Shoe::from_value(&updated))
            }
        }
    }

    /// Soft delete in joined mode, removal from the array in embedded mode.
    pub async fn remove_shoe(&self, order_id: &str, shoe_id: &str) -> Result<(), StoreError> {
        match &self.shoes {
            ShoeStore::Joined(shoes) => {
                self.require_order(order_id).await?;
                shoes.remove(order_id, shoe_id, DeletePolicy::Soft).await?;
            }
            ShoeStore::Embedded(shoes) => {
                shoes.remove(order_id, shoe_id).await?;
            }
        }
        Ok(())
    }
}
