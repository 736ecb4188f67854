//! Shop orders placed from the storefront checkout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use super::normalize::{date_ms, now_iso, number_cell, opt_text, to_number, StatusSet};
use super::service_orders::OrderStatus;
use crate::sheets::SheetsClient;
use crate::store::{fields, IdStrategy, JoinedChildren, Record, StoreError, Table, TableSpec, Tombstone};

pub const ORDERS_TABLE: TableSpec = TableSpec {
    name: "orders",
    entity: "Order",
    default_header: &[
        "id",
        "customerName",
        "customerPhone",
        "customerAddress",
        "notes",
        "totalAmount",
        "status",
        "createdAt",
    ],
    tombstone: Tombstone::Status("cancelled"),
    id: IdStrategy::RandomHex("ORD"),
    sequence: None,
    required: &["customerName", "customerPhone", "customerAddress"],
};

pub const ITEMS_TABLE: TableSpec = TableSpec {
    name: "order_items",
    entity: "Order item",
    default_header: &["id", "orderId", "productId", "productName", "quantity", "price", "deleted"],
    tombstone: Tombstone::DeletedFlag,
    id: IdStrategy::RandomHex("ITM"),
    sequence: None,
    required: &["productName"],
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: f64,
    pub price: f64,
}

impl OrderItem {
    fn from_record(record: &Record) -> Self {
        Self {
            product_id: record.text("productId"),
            product_name: record.text("productName"),
            quantity: to_number(record.get("quantity"), 0.0),
            price: to_number(record.get("price"), 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopOrder {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub notes: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: String,
    pub items: Vec<OrderItem>,
}

impl ShopOrder {
    fn from_record(record: &Record, items: &[Record]) -> Self {
        Self {
            id: record.id().to_string(),
            customer_name: record.text("customerName"),
            customer_phone: record.text("customerPhone"),
            customer_address: record.text("customerAddress"),
            notes: record.text("notes"),
            total_amount: to_number(record.get("totalAmount"), 0.0),
            status: OrderStatus::from_stored(record.get("status")),
            created_at: record.text("createdAt"),
            items: items.iter().map(OrderItem::from_record).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[serde(default, deserialize_with = "opt_text")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    #[serde(default, deserialize_with = "opt_text")]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub customer_phone: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub customer_address: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewItem>,
}

/// Items worth ordering: named, positive quantity, non-negative price.
fn valid_items(items: Vec<NewItem>) -> Vec<OrderItem> {
    items
        .into_iter()
        .map(|item| OrderItem {
            product_id: item.product_id.unwrap_or_default(),
            product_name: item.product_name.unwrap_or_default(),
            quantity: to_number(item.quantity.as_deref().unwrap_or(""), 0.0),
            price: to_number(item.price.as_deref().unwrap_or(""), 0.0),
        })
        .filter(|item| !item.product_name.is_empty() && item.quantity > 0.0 && item.price >= 0.0)
        .collect()
}

#[derive(Clone)]
pub struct ShopOrders {
    orders: Table,
    items: JoinedChildren,
}

impl ShopOrders {
    pub fn new(client: Arc<dyn SheetsClient>) -> Self {
        Self {
            orders: Table::new(client.clone(), ORDERS_TABLE),
            items: JoinedChildren::new(Table::new(client, ITEMS_TABLE), "orderId"),
        }
    }

    /// Live orders with their items, newest first.
    pub async fn list(&self) -> Result<Vec<ShopOrder>, StoreError> {
        let records = self.orders.list().await?;
        let grouped: HashMap<String, Vec<Record>> = self.items.grouped().await?;

        let mut orders: Vec<ShopOrder> = records
            .iter()
            .map(|r| ShopOrder::from_record(r, grouped.get(r.id()).map(Vec::as_slice).unwrap_or(&[])))
            .collect();
        orders.sort_by(|a, b| date_ms(&b.created_at).cmp(&date_ms(&a.created_at)));
        Ok(orders)
    }

    pub async fn get(&self, id: &str) -> Result<ShopOrder, StoreError> {
        let record = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Order not found"))?;
        let items = self.items.for_parent(record.id()).await?;
        Ok(ShopOrder::from_record(&record, &items))
    }

    /// Appends the order row, then one row per item.
    ///
    /// Nothing is undone when an item append fails after the order row was
    /// written; the order is left with the items appended so far.
    pub async fn checkout(&self, input: Checkout) -> Result<ShopOrder, StoreError> {
        let items = valid_items(input.items);
        let total: f64 = items.iter().map(|i| i.quantity * i.price).sum();

        let f = fields([
            ("customerName", input.customer_name.unwrap_or_default()),
            ("customerPhone", input.customer_phone.unwrap_or_default()),
            ("customerAddress", input.customer_address.unwrap_or_default()),
            ("notes", input.notes.unwrap_or_default()),
            ("totalAmount", number_cell(total)),
            ("status", OrderStatus::Pending.as_str().to_string()),
            ("createdAt", now_iso()),
        ]);
        let missing: Vec<String> = ORDERS_TABLE
            .required
            .iter()
            .filter(|name| f.get(**name).map_or(true, |v| v.is_empty()))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingFields(missing));
        }
        if items.is_empty() {
            return Err(StoreError::invalid("items", "at least one valid item is required"));
        }

        let order = self.orders.create(f).await?;
        for item in &items {
            let row = fields([
                ("productId", item.product_id.clone()),
                ("productName", item.product_name.clone()),
                ("quantity", number_cell(item.quantity)),
                ("price", number_cell(item.price)),
                ("deleted", "0".to_string()),
            ]);
            if let Err(e) = self.items.add(order.id(), row).await {
                error!("Order {} written but item '{}' failed: {}", order.id(), item.product_name, e);
                return Err(e);
            }
        }

        let mut created = ShopOrder::from_record(&order, &[]);
        created.items = items;
        Ok(created)
    }

    /// Only the status can change.
    pub async fn set_status(&self, id: &str, status: Option<&str>) -> Result<ShopOrder, StoreError> {
        let status = OrderStatus::from_input(status.unwrap_or(""))?;
        self.orders.patch(id, fields([("status", status.as_str())])).await?;
        self.get_any(id).await
    }

    /// Soft delete: the order is marked cancelled and disappears from reads.
    pub async fn cancel(&self, id: &str) -> Result<(), StoreError> {
        self.orders
            .patch(id, fields([("status", OrderStatus::Cancelled.as_str())]))
            .await?;
        Ok(())
    }

    /// Like [`ShopOrders::get`], but also finds cancelled orders.
    async fn get_any(&self, id: &str) -> Result<ShopOrder, StoreError> {
        let id = id.trim();
        let record = self
            .orders
            .list_all()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found("Order not found"))?;
        let items = self.items.for_parent(id).await?;
        Ok(ShopOrder::from_record(&record, &items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::MemorySheets;

    fn shop() -> (Arc<MemorySheets>, ShopOrders) {
        let sheets = Arc::new(
            MemorySheets::new()
                .with_table(ORDERS_TABLE.name)
                .with_table(ITEMS_TABLE.name),
        );
        (sheets.clone(), ShopOrders::new(sheets))
    }

    fn item(name: &str, quantity: &str, price: &str) -> NewItem {
        NewItem {
            product_id: Some("prd_1".into()),
            product_name: Some(name.into()),
            quantity: Some(quantity.into()),
            price: Some(price.into()),
        }
    }

    fn checkout(items: Vec<NewItem>) -> Checkout {
        Checkout {
            customer_name: Some("Nguyen Van A".into()),
            customer_phone: Some("0900000000".into()),
            customer_address: Some("1 Le Loi".into()),
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn checkout_totals_valid_items() {
        let (_, shop) = shop();
        let order = shop
            .checkout(checkout(vec![item("Cleaner", "2", "30000"), item("Brush", "0", "10"), item("", "1", "5")]))
            .await
            .unwrap();

        assert!(order.id.starts_with("ORD-"));
        assert_eq!(order.total_amount, 60000.0);
        assert_eq!(order.items.len(), 1);

        let listed = shop.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].items, order.items);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_writing() {
        let (sheets, shop) = shop();
        let err = shop.checkout(checkout(vec![item("Brush", "0", "10")])).await.unwrap_err();
        assert_eq!(err.fields(), vec!["items".to_string()]);

        let mut input = checkout(vec![item("Cleaner", "1", "1")]);
        input.customer_address = None;
        let err = shop.checkout(input).await.unwrap_err();
        assert_eq!(err.fields(), vec!["customerAddress".to_string()]);
        assert_eq!(sheets.write_count(), 0);
    }

    #[tokio::test]
    async fn status_changes_and_cancellation() {
        let (_, shop) = shop();
        let order = shop.checkout(checkout(vec![item("Cleaner", "1", "1")])).await.unwrap();

        let err = shop.set_status(&order.id, Some("bogus")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(shop.set_status(&order.id, None).await.unwrap_err().is_validation());

        let shipped = shop.set_status(&order.id, Some("processing")).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Processing);

        shop.cancel(&order.id).await.unwrap();
        assert!(shop.list().await.unwrap().is_empty());
        assert!(matches!(shop.get(&order.id).await, Err(StoreError::NotFound(_))));
    }
}
