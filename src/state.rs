use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AdminGuard;
use crate::config::{AppConfig, SheetsBackend};
use crate::resources::catalog::catalog;
use crate::resources::{orders, service_orders, CatalogResource, ServiceOrders, ShopOrders, CATALOG};
use crate::sheets::{GoogleSheetsClient, MemorySheets, SheetsClient};

/// Shared by every handler; all fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub guard: AdminGuard,
    pub service_orders: ServiceOrders,
    pub orders: ShopOrders,
    pub catalog: Arc<[CatalogResource]>,
}

impl AppState {
    /// Wires every resource to `sheets`.
    pub fn new(config: AppConfig, sheets: Arc<dyn SheetsClient>) -> Self {
        let guard = AdminGuard::new(config.security.admin_secret.clone());
        if guard.is_open() {
            warn!("No admin secret configured; write endpoints are open");
        }

        Self {
            guard,
            service_orders: ServiceOrders::new(sheets.clone(), config.service_orders.shoe_storage),
            orders: ShopOrders::new(sheets.clone()),
            catalog: catalog(sheets).into(),
            config: Arc::new(config),
        }
    }

    /// Builds the spreadsheet client the configuration asks for.
    pub fn from_config(config: AppConfig) -> Self {
        let sheets: Arc<dyn SheetsClient> = match config.sheets.backend {
            SheetsBackend::Google => Arc::new(GoogleSheetsClient::new(config.sheets.clone())),
            SheetsBackend::Memory => {
                info!("Using in-memory spreadsheet; data is lost on exit");
                Arc::new(memory_sheets())
            }
        };
        Self::new(config, sheets)
    }

    pub fn catalog_resource(&self, path: &str) -> Option<&CatalogResource> {
        self.catalog.iter().find(|r| r.def().path == path)
    }
}

/// Every tab the service reads or writes.
pub fn table_names() -> Vec<&'static str> {
    let mut names = vec![
        service_orders::ORDERS_TABLE.name,
        service_orders::SHOES_TABLE.name,
        orders::ORDERS_TABLE.name,
        orders::ITEMS_TABLE.name,
    ];
    names.extend(CATALOG.iter().map(|def| def.table.name));
    names
}

/// An in-memory spreadsheet with every tab created and empty.
pub fn memory_sheets() -> MemorySheets {
    table_names()
        .into_iter()
        .fold(MemorySheets::new(), |sheets, name| sheets.with_table(name))
}
