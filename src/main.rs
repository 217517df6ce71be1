use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use vsme_disclosures::charts::{GraphicsRequest, build_recommendations};
use vsme_disclosures::config::{Config, RuntimeConfig};
use vsme_disclosures::ingest;
use vsme_disclosures::metrics::{DataKind, Metric};
use vsme_disclosures::server::{self, AppState};
use vsme_disclosures::summarizer;
use vsme_disclosures::synthesis::{self, DisclosureRequest};

#[derive(Parser)]
#[command(name = "vsme")]
#[command(about = "VSME disclosure drafting and chart recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Summarize a tabular JSON payload as prose
    Summarize {
        file: PathBuf,
        /// energy, gender, sites, emissions, safety or generic
        #[arg(long)]
        kind: Option<DataKind>,
    },
    /// Print chart recommendations for a metrics file
    Charts {
        file: PathBuf,
        #[arg(long)]
        disclosure: String,
    },
    /// Draft a disclosure from a metrics file
    Generate {
        file: PathBuf,
        #[arg(long)]
        disclosure: String,
    },
    /// Convert a CSV export into metrics JSON
    Import {
        file: PathBuf,
        /// Disclosure assigned to rows without one
        #[arg(long)]
        disclosure: Option<String>,
    },
}

fn init_tracing(log_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// A metrics file is either a bare array of metrics or a request body with `metrics`.
fn read_metrics(path: &Path) -> Result<(Vec<Metric>, Vec<Metric>, Value)> {
    let value = read_json(path)?;
    let (metrics, all) = match &value {
        Value::Array(_) => {
            let metrics: Vec<Metric> = serde_json::from_value(value.clone())?;
            (metrics.clone(), metrics)
        }
        Value::Object(map) => {
            let metrics: Vec<Metric> = match map.get("metrics") {
                Some(m) => serde_json::from_value(m.clone())?,
                None => Vec::new(),
            };
            let all: Vec<Metric> = match map.get("allMetrics") {
                Some(m) => serde_json::from_value(m.clone())?,
                None => metrics.clone(),
            };
            (metrics, all)
        }
        _ => anyhow::bail!("{} must hold a metrics array or object", path.display()),
    };
    Ok((metrics, all, value))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    Config::load_env_file();
    init_tracing(&RuntimeConfig::log_level_from(|key| std::env::var(key).ok()));
    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let state = AppState::from_config(config)?;
            server::serve(state).await
        }
        Commands::Summarize { file, kind } => {
            let value = read_json(&file)?;
            println!("{}", summarizer::summarize_as(&value, kind));
            Ok(())
        }
        Commands::Charts { file, disclosure } => {
            let (metrics, all, _) = read_metrics(&file)?;
            let request = GraphicsRequest {
                disclosure_id: disclosure,
                metrics,
                all_metrics: all,
                ..Default::default()
            };
            let recs = build_recommendations(
                &request.disclosure_id,
                &request.metrics,
                &request.all_metrics,
            );
            print_json(&recs)
        }
        Commands::Generate { file, disclosure } => {
            let (metrics, _, raw) = read_metrics(&file)?;
            let company_profile = match raw.get("companyProfile") {
                Some(p) if !p.is_null() => Some(serde_json::from_value(p.clone())?),
                _ => None,
            };
            let request = DisclosureRequest {
                disclosure_id: disclosure,
                metrics,
                company_profile,
                ..Default::default()
            };
            let params = config.model.params();
            let state = AppState::from_config(config)?;
            let text = synthesis::synthesize(state.generator(), &request, &params).await?;
            println!("{}", text);
            Ok(())
        }
        Commands::Import { file, disclosure } => {
            let report = ingest::import_csv_path(&file, disclosure.as_deref())?;
            if report.skipped_rows > 0 {
                tracing::warn!(rows = report.skipped_rows, "skipped rows without a reference");
            }
            print_json(&report.metrics)
        }
    }
}
