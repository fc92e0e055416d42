//! Command-line interface
//!
//! `kobe [--config file.json] [prepare|train|apply|dashboard]`; with no
//! subcommand the three batch stages run in order.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::*;

use crate::config::{DashboardConfig, PipelineConfig};
use crate::pipeline::{run_apply, run_prepare, run_train, ApplySummary, PrepareSummary, TrainSummary};
use crate::tracking::ExperimentTracker;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(253, 185, 39)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    println!("  {} {}", accent("›"), msg);
}

fn step_ok(msg: &str, detail: &str) {
    println!("  {} {} {}", ok("✓"), msg, dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shot-outcome experiment pipeline")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON file overriding the default configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, filter and split the raw shot logs
    Prepare,

    /// Train the classification and regression models
    Train,

    /// Score the production shot log with the latest models
    Apply,

    /// Serve the monitoring dashboard
    Dashboard {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Resolve the pipeline configuration from an optional JSON file
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_prepare(summary: &PrepareSummary) {
    kv("Filtered rows", &summary.filtered_rows.to_string());
    kv("base_train", &summary.train_rows.to_string());
    kv("base_test", &summary.test_rows.to_string());
}

fn print_train(summary: &TrainSummary) {
    kv("Classifier", "DecisionTreeClassifier");
    kv("  log_loss", &format!("{:.4}", summary.classification.log_loss));
    kv("  f1_score", &format!("{:.4}", summary.classification.f1_score));
    kv("Regressor", summary.regression_algorithm.name());
    kv("  rmse", &format!("{:.4}", summary.regression.rmse));
    kv("  r2", &format!("{:.4}", summary.regression.r2));
}

fn print_apply(summary: &ApplySummary) {
    kv("Scored rows", &summary.rows.to_string());
    kv("log_loss_producao", &format!("{:.4}", summary.classification.log_loss));
    kv("f1_score_producao", &format!("{:.4}", summary.classification.f1_score));
    kv("rmse_producao", &format!("{:.4}", summary.regression.rmse));
    kv("r2_score_producao", &format!("{:.4}", summary.regression.r2));
}

pub fn cmd_prepare(config: &PipelineConfig, tracker: &ExperimentTracker) -> anyhow::Result<()> {
    section("Prepare");
    step_run(&format!("Reading {} shot logs", config.raw_paths().len()));
    let start = Instant::now();
    let summary = run_prepare(config, tracker)?;
    step_ok("Datasets written", &format!("{:?}", start.elapsed()));
    print_prepare(&summary);
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig, tracker: &ExperimentTracker) -> anyhow::Result<()> {
    section("Train");
    step_run(&format!(
        "Tuning decision tree ({} draws, {} folds) and comparing linear models",
        config.tune_iterations, config.cv_folds
    ));
    let start = Instant::now();
    let summary = run_train(config, tracker)?;
    step_ok("Models saved", &format!("{:?}", start.elapsed()));
    print_train(&summary);
    Ok(())
}

pub fn cmd_apply(config: &PipelineConfig, tracker: &ExperimentTracker) -> anyhow::Result<()> {
    section("Apply");
    step_run(&format!("Scoring {}", config.prod_path.display()));
    let start = Instant::now();
    let summary = run_apply(config, tracker)?;
    step_ok("Predictions written", &format!("{:?}", start.elapsed()));
    print_apply(&summary);
    Ok(())
}

/// prepare → train → apply
pub fn cmd_all(config: &PipelineConfig) -> anyhow::Result<()> {
    let tracker = ExperimentTracker::from_config(config);
    kv("Experiment", tracker.experiment());
    kv("Tracking", &config.tracking_dir.display().to_string());
    cmd_prepare(config, &tracker)?;
    cmd_train(config, &tracker)?;
    cmd_apply(config, &tracker)?;
    println!();
    Ok(())
}

pub async fn cmd_dashboard(config: &PipelineConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::dashboard::run_dashboard;

    let defaults = DashboardConfig::from_pipeline(config);
    let dashboard = DashboardConfig {
        host: host.unwrap_or(defaults.host.clone()),
        port: port.unwrap_or(defaults.port),
        ..defaults
    };

    section("Dashboard");
    kv("URL", &format!("http://{}:{}", dashboard.host, dashboard.port));
    kv("Health", &format!("http://{}:{}/api/health", dashboard.host, dashboard.port));
    kv("Predictions", &dashboard.processed_dir.display().to_string());
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_dashboard(dashboard).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_runs_everything() {
        let cli = Cli::parse_from(["kobe"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["kobe", "train", "--config", "pipeline.json"]);
        assert!(matches!(cli.command, Some(Commands::Train)));
        assert_eq!(cli.config, Some(PathBuf::from("pipeline.json")));
    }

    #[test]
    fn test_dashboard_port() {
        let cli = Cli::parse_from(["kobe", "dashboard", "--port", "9000"]);
        match cli.command {
            Some(Commands::Dashboard { port, host }) => {
                assert_eq!(port, Some(9000));
                assert!(host.is_none());
            }
            _ => panic!("expected dashboard"),
        }
    }
}
