//! Business resources built on the row store.

pub mod catalog;
pub mod normalize;
pub mod orders;
pub mod service_orders;

pub use catalog::{CatalogResource, ResourceDef, CATALOG};
pub use orders::ShopOrders;
pub use service_orders::ServiceOrders;

use serde::Serialize;

/// Entry of the fixed service price list.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceOffer {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u32,
    pub description: &'static str,
    pub status: &'static str,
}

pub const SERVICE_OFFERS: [ServiceOffer; 2] = [
    ServiceOffer {
        id: "svc_1",
        name: "Vệ sinh giày cơ bản",
        price: 50_000,
        description: "Làm sạch bụi bẩn, đế và thân giày",
        status: "published",
    },
    ServiceOffer {
        id: "svc_2",
        name: "Vệ sinh giày cao cấp",
        price: 120_000,
        description: "Vệ sinh chi tiết + khử mùi",
        status: "published",
    },
];
