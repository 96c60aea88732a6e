use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

use super::ui;
use crate::compare::default_label;
use crate::config::AppConfig;
use crate::fit::{CurveFitService, FitParams, FitResult};
use crate::providers::ApiClient;
use crate::workbench::{sampled_curve, shared_k_max};

pub async fn run(config: &AppConfig, api: &Arc<ApiClient>) -> Result<()> {
    let spinner = ui::new_spinner("Fitting disbursement curve...");
    let result = api.fit_curve(&config.filters).await;
    spinner.finish_and_clear();
    let result = result?;

    println!(
        "Curve: {}\n",
        ui::style_text(&default_label(&config.filters), ui::StyleType::Title)
    );

    match &result.params {
        Some(params) => {
            println!("{}", fit_table(params));
            println!("\n{}", portfolio_table(params));
            ui::print_separator();
            print_trajectory(&result);
        }
        None => println!(
            "{}",
            ui::style_text(
                "No curve could be fitted for the current filters",
                ui::StyleType::Error
            )
        ),
    }

    println!(
        "\n{} {}   {} {}",
        ui::style_text("Active points:", ui::StyleType::Label),
        result.active_points.len(),
        ui::style_text("Snapshot points:", ui::StyleType::Label),
        result.points.len(),
    );

    Ok(())
}

fn metric_cell(value: f64, decimals: usize) -> Cell {
    Cell::new(format!("{value:.decimals$}")).set_alignment(CellAlignment::Right)
}

fn fit_table(params: &FitParams) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

    table.add_row(vec![Cell::new("b0"), metric_cell(params.b0, 4)]);
    table.add_row(vec![Cell::new("b1"), metric_cell(params.b1, 4)]);
    table.add_row(vec![Cell::new("b2"), metric_cell(params.b2, 6)]);
    table.add_row(vec![
        Cell::new("k30 (months)"),
        ui::format_optional_cell(params.k30, |v| format!("{v:.1}")),
    ]);
    table.add_row(vec![
        Cell::new("k50 (months)"),
        ui::format_optional_cell(params.k50, |v| format!("{v:.1}")),
    ]);
    table.add_row(vec![
        Cell::new("k80 (months)"),
        ui::format_optional_cell(params.k80, |v| format!("{v:.1}")),
    ]);
    table.add_row(vec![
        Cell::new("R\u{b2}"),
        ui::format_optional_cell(params.r2, |v| format!("{v:.3}")),
    ]);
    table.add_row(vec![
        Cell::new("Var(y)"),
        ui::format_optional_cell(params.var_y, |v| format!("{v:.4}")),
    ]);
    table.add_row(vec![
        Cell::new("Sigma"),
        ui::format_optional_cell(params.sigma, |v| format!("{v:.4}")),
    ]);
    table.to_string()
}

fn portfolio_table(params: &FitParams) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Projects"),
        ui::header_cell("Disbursements"),
        ui::header_cell("Avg approved"),
        ui::header_cell("Portfolio share"),
        ui::header_cell("Mean y"),
        ui::header_cell("Median y"),
    ]);
    table.add_row(vec![
        ui::format_optional_cell(params.n_projects, |v| v.to_string()),
        ui::format_optional_cell(params.disb_count, |v| v.to_string()),
        ui::format_optional_cell(params.approved_avg, |v| format!("{v:.0}")),
        ui::format_optional_cell(params.portfolio_share, |v| format!("{:.2}%", v * 100.0)),
        ui::format_optional_cell(params.mean_y, |v| format!("{v:.4}")),
        ui::format_optional_cell(params.median_y, |v| format!("{v:.4}")),
    ]);
    table.to_string()
}

// Samples the curve on the shared axis and prints yearly milestones.
fn print_trajectory(result: &FitResult) {
    let k_max = shared_k_max([result]);
    let points = sampled_curve(result, k_max);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Month"), ui::header_cell("HD (%)")]);
    for point in points.iter().filter(|point| point.k as u64 % 12 == 0) {
        table.add_row(vec![
            Cell::new(format!("{:.0}", point.k)).set_alignment(CellAlignment::Right),
            metric_cell(point.hd * 100.0, 1),
        ]);
    }
    println!("{table}");
    println!(
        "\n{} 0\u{2013}{:.0} months",
        ui::style_text("Fit domain:", ui::StyleType::Label),
        k_max
    );
}
