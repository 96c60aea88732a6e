use std::sync::Arc;

use anyhow::Result;

use super::ui;
use crate::config::AppConfig;
use crate::providers::ApiClient;

pub async fn run(config: &AppConfig, api: &Arc<ApiClient>) -> Result<()> {
    println!(
        "API: {}",
        ui::style_text(&config.api.base_url, ui::StyleType::Label)
    );

    let spinner = ui::new_spinner("Checking API health...");
    let health = api.health().await;
    spinner.finish_and_clear();

    match health {
        Ok(body) => {
            let status = body["status"].as_str().unwrap_or("unknown");
            println!(
                "Health: {}",
                ui::style_text(status, ui::StyleType::Value)
            );
        }
        Err(error) => {
            println!(
                "Health: {}",
                ui::style_text(&format!("unreachable ({error:#})"), ui::StyleType::Error)
            );
            return Ok(());
        }
    }

    let spinner = ui::new_spinner("Fetching filter catalog...");
    let catalog = api.fetch_catalog().await;
    spinner.finish_and_clear();
    let catalog = catalog?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Macrosectors"),
        ui::header_cell("Modalities"),
        ui::header_cell("Countries"),
        ui::header_cell("MDBs"),
        ui::header_cell("Ticket range"),
        ui::header_cell("Years"),
    ]);

    let ticket_range = match (catalog.ticket_min, catalog.ticket_max) {
        (Some(min), Some(max)) => format!("{min:.0}\u{2013}{max:.0}"),
        _ => "N/A".to_string(),
    };
    let years = match (catalog.year_min, catalog.year_max) {
        (Some(from), Some(to)) => format!("{from}\u{2013}{to}"),
        _ => "N/A".to_string(),
    };
    table.add_row(vec![
        catalog.macrosectors.len().to_string(),
        catalog.modalities.len().to_string(),
        catalog.countries.len().to_string(),
        catalog.mdbs.len().to_string(),
        ticket_range,
        years,
    ]);
    println!("\n{table}");

    Ok(())
}
