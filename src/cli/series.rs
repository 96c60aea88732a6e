use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

use super::ui;
use crate::config::AppConfig;
use crate::labels::{macrosector_label, modality_label};
use crate::providers::ApiClient;
use crate::series::{SeriesCache, SeriesService, YearWindow};

pub async fn run(config: &AppConfig, api: &Arc<ApiClient>, identifier: &str) -> Result<()> {
    let cache = SeriesCache::new(Arc::clone(api) as Arc<dyn SeriesService>);
    let window = YearWindow {
        year_from: config.filters.year_from,
        year_to: config.filters.year_to,
    };

    let spinner = ui::new_spinner("Fetching project timeseries...");
    let payload = cache.get(identifier, window).await;
    spinner.finish_and_clear();

    println!(
        "Project: {}",
        ui::style_text(&payload.project.iati_identifier, ui::StyleType::Title)
    );
    let macrosector = payload
        .project
        .macrosector_id
        .and_then(macrosector_label)
        .unwrap_or("Unknown");
    let modality = payload
        .project
        .modality_id
        .and_then(modality_label)
        .unwrap_or("Unknown");
    println!(
        "{}",
        ui::style_text(
            &format!("{macrosector} \u{b7} {modality} \u{b7} {}\u{2013}{}", window.year_from, window.year_to),
            ui::StyleType::Subtle
        )
    );

    if payload.series.is_empty() {
        println!(
            "\n{}",
            ui::style_text(
                "No timeseries available (the fetch failed or the project has no disbursements)",
                ui::StyleType::Error
            )
        );
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Month"), ui::header_cell("Disbursed")]);
    for point in &payload.series {
        table.add_row(vec![
            Cell::new(format!("{:.0}", point.k)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", point.d)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{table}");

    println!(
        "\n{} {}",
        ui::style_text("Observations:", ui::StyleType::Label),
        payload.series.len()
    );

    Ok(())
}
