//! PACA Energy Report - Provence-Alpes-Côte d'Azur Electricity Analysis
//!
//! Loads regional production, consumption and withdrawal datasets, prints the
//! intermediate tables and renders a three-panel figure.

mod charts;
mod config;
mod data;
mod report;
mod stats;

use anyhow::Context;
use charts::ReportRenderer;
use config::ReportConfig;
use env_logger::Env;
use log::info;
use report::ReportData;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ReportConfig::default();
    info!("Building report for '{}'", config.region);

    let report = ReportData::build(&config).context("Failed to build report data")?;
    report
        .print_summary()
        .context("Failed to print summary tables")?;

    ReportRenderer::render(&report, &config.chart).context("Failed to render figure")?;
    Ok(())
}
