use std::sync::Arc;

use anyhow::Result;
use comfy_table::Cell;
use tracing::warn;

use super::ui;
use crate::compare::default_label;
use crate::config::AppConfig;
use crate::fit::{CurveFitService, FitResult};
use crate::providers::ApiClient;
use crate::workbench::{Workbench, sampled_curve, shared_k_max};

pub async fn run(config: &AppConfig, api: &Arc<ApiClient>) -> Result<()> {
    let service: Arc<dyn CurveFitService> = Arc::clone(api) as _;
    let workbench = Workbench::new(service);

    for comparison in &config.comparisons {
        if !workbench.can_add_comparison().await {
            warn!("Comparison set is full, skipping the remaining configured entries");
            break;
        }
        workbench.add_comparison(comparison).await;
    }

    let spinner = ui::new_spinner("Fitting curves...");
    let primary = api.fit_curve(&config.filters).await;
    let batch = workbench.refresh().await;
    spinner.finish_and_clear();
    let primary = primary?;

    if batch.is_empty() && !config.comparisons.is_empty() {
        println!(
            "{}\n",
            ui::style_text(
                "Comparison fits failed or were discarded; showing the primary curve only",
                ui::StyleType::Error
            )
        );
    }

    let k_max = shared_k_max(
        std::iter::once(&primary).chain(batch.iter().map(|fit| &fit.result)),
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Curve"),
        ui::header_cell("k30"),
        ui::header_cell("k50"),
        ui::header_cell("k80"),
        ui::header_cell("R\u{b2}"),
        ui::header_cell("Projects"),
        ui::header_cell("Months"),
    ]);

    // The primary row is left out when an entry pins the same filters.
    if !workbench.contains_filters(&config.filters).await {
        table.add_row(curve_row(&default_label(&config.filters), &primary, k_max));
    }
    for fit in &batch {
        table.add_row(curve_row(&fit.label, &fit.result, k_max));
    }
    println!("{table}");

    println!(
        "\n{} {}",
        ui::style_text("Shared axis:", ui::StyleType::Label),
        ui::style_text(&format!("0\u{2013}{k_max:.0} months"), ui::StyleType::Value),
    );

    Ok(())
}

fn curve_row(label: &str, result: &FitResult, k_max: f64) -> Vec<Cell> {
    let months = sampled_curve(result, k_max).len().saturating_sub(1);
    let params = result.params.as_ref();
    vec![
        Cell::new(label),
        ui::format_optional_cell(params.and_then(|p| p.k30), |v| format!("{v:.1}")),
        ui::format_optional_cell(params.and_then(|p| p.k50), |v| format!("{v:.1}")),
        ui::format_optional_cell(params.and_then(|p| p.k80), |v| format!("{v:.1}")),
        ui::format_optional_cell(params.and_then(|p| p.r2), |v| format!("{v:.3}")),
        ui::format_optional_cell(params.and_then(|p| p.n_projects), |v| v.to_string()),
        ui::format_optional_cell((months > 0).then_some(months), |v| v.to_string()),
    ]
}
