use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

use super::ui;
use crate::bands::{BandQuery, BandService, BandTable, normalize_bands};
use crate::config::AppConfig;
use crate::providers::ApiClient;

pub async fn run(config: &AppConfig, api: &Arc<ApiClient>) -> Result<()> {
    let query = BandQuery {
        filters: config.filters.clone(),
        method: config.bands.method,
        level: config.bands.level,
        smooth: config.bands.smooth,
        exclude_project: None,
    };

    let spinner = ui::new_spinner("Fetching prediction bands...");
    let raw = api.fetch_bands(&query).await;
    spinner.finish_and_clear();
    let table = normalize_bands(&raw?);

    if table.is_empty() {
        println!(
            "{}",
            ui::style_text("No band data for the current filters", ui::StyleType::Error)
        );
        return Ok(());
    }

    println!(
        "Bands: {} (level {}, {} rows)\n",
        ui::style_text(query.method.as_str(), ui::StyleType::Title),
        query.level,
        table.len()
    );
    println!("{}", band_table(&table));

    Ok(())
}

fn quantile_cell(value: Option<f64>) -> Cell {
    ui::format_optional_cell(value, |v| format!("{v:.3}"))
}

fn band_table(table: &BandTable) -> String {
    let mut out = ui::new_styled_table();
    out.set_header(vec![
        ui::header_cell("k"),
        ui::header_cell("p2.5"),
        ui::header_cell("p10"),
        ui::header_cell("p50"),
        ui::header_cell("p90"),
        ui::header_cell("p97.5"),
        ui::header_cell("low"),
        ui::header_cell("high"),
        ui::header_cell("n"),
        ui::header_cell("Flags"),
    ]);

    for index in 0..table.len() {
        let mut flags = Vec::new();
        if table.low_sample_p80[index].is_some_and(|flag| flag != 0.0) {
            flags.push("low80");
        }
        if table.low_sample_p95[index].is_some_and(|flag| flag != 0.0) {
            flags.push("low95");
        }
        out.add_row(vec![
            Cell::new(format!("{:.0}", table.k[index])).set_alignment(CellAlignment::Right),
            quantile_cell(table.p2_5[index]),
            quantile_cell(table.p10[index]),
            quantile_cell(table.p50[index]),
            quantile_cell(table.p90[index]),
            quantile_cell(table.p97_5[index]),
            quantile_cell(table.p_low[index]),
            quantile_cell(table.p_high[index]),
            ui::format_optional_cell(table.n[index], |v| format!("{v:.0}")),
            Cell::new(flags.join(" ")),
        ]);
    }
    out.to_string()
}
