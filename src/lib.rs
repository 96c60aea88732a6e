pub mod bands;
pub mod cli;
pub mod compare;
pub mod config;
pub mod domain;
pub mod filters;
pub mod fit;
pub mod labels;
pub mod log;
pub mod providers;
pub mod series;
pub mod workbench;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::providers::ApiClient;

pub enum AppCommand {
    Fit,
    Compare,
    Bands,
    Series { identifier: String },
    Status,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Curve explorer starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let api = Arc::new(ApiClient::new(&config.api.base_url)?);

    match command {
        AppCommand::Fit => cli::fit::run(&config, &api).await,
        AppCommand::Compare => cli::compare::run(&config, &api).await,
        AppCommand::Bands => cli::bands::run(&config, &api).await,
        AppCommand::Series { identifier } => cli::series::run(&config, &api, &identifier).await,
        AppCommand::Status => cli::status::run(&config, &api).await,
    }
}
