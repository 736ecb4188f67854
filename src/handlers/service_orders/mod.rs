// handlers/service_orders/mod.rs - /api/service-orders and nested shoes

pub mod order;
pub mod shoes;

pub use order::{create as order_create, delete as order_delete, get as order_get, list as order_list};
pub use order::{patch as order_patch, track as order_track};
pub use shoes::{create as shoe_create, delete as shoe_delete, patch as shoe_patch};
