use serde_json::json;

use crate::cli::OutputFormat;
use crate::resources::{orders, service_orders, CATALOG};

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let mut specs = vec![
        service_orders::ORDERS_TABLE,
        service_orders::SHOES_TABLE,
        orders::ORDERS_TABLE,
        orders::ITEMS_TABLE,
    ];
    specs.extend(CATALOG.iter().map(|def| def.table));

    match output_format {
        OutputFormat::Json => {
            let listing: Vec<_> = specs
                .iter()
                .map(|t| json!({ "name": t.name, "header": t.default_header }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            for t in &specs {
                println!("{:<22} {}", t.name, t.default_header.join(", "));
            }
        }
    }
    Ok(())
}
