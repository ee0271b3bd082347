//! Pitchside CLI
//!
//! Command-line interface over the persisted diagnostics logs:
//! - Print or export error reports
//! - Tail recent events and API calls
//! - Clear the logs
//! - Probe dashboard endpoints through capture

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pitchside::capture::{
    ApiCallRecord, DiagnosticEvent, DiagnosticsService, ErrorCaptureLayer, EventKind, FileStore,
};
use pitchside::config::{generate_default_config, Config, LoggingConfig};
use pitchside::dashboard::{DashboardClient, LineupFilter, Resource};
use pitchside::http::{DiagnosticsInterceptor, ObservedClient, TracingInterceptor};
use pitchside::telemetry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pitchside")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnostics capture for the sports analytics dashboard")]
#[command(long_about = "Pitchside keeps the most recent client errors and API calls across restarts.\nInspect them, export an error report, or probe the dashboard API.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Show log output below WARN
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the full error report as JSON
    Report,

    /// Write the error report to error_report_<epoch-millis>.json
    Export {
        /// Output directory (default: configured export_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear the persisted logs
    Clear,

    /// Show the most recent persisted entries
    Tail {
        /// Show API calls instead of diagnostic events
        #[arg(long)]
        api_calls: bool,
        /// Number of entries
        #[arg(short = 'n', long, default_value = "20")]
        lines: usize,
    },

    /// Count persisted events by kind
    Summary,

    /// Call a dashboard resource or path, recording the call
    Probe {
        /// Resource (predictions, lineup, analytics, shap, settings) or a path like /health
        target: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    let store = Arc::new(FileStore::new(config.data_dir()));
    let service = Arc::new(DiagnosticsService::new(store, config.service_config()));

    let logging = LoggingConfig {
        level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        format: config.logging.format.clone(),
    };
    telemetry::init_tracing(&logging, Some(ErrorCaptureLayer::new(Arc::clone(&service))))
        .context("Failed to initialize logging")?;

    let json = cli.format == "json";

    match cli.command {
        Commands::Report => {
            let report = service.generate_report();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Export { output } => {
            let dir = output.unwrap_or_else(|| config.export_dir());
            let path = service.export_report(&dir)?;
            println!("Exported to {:?}", path);
        }

        Commands::Clear => {
            service.clear()?;
            println!("Cleared persisted logs in {:?}", config.data_dir());
        }

        Commands::Tail { api_calls, lines } => {
            let persisted = service.generate_report().persisted;
            if api_calls {
                let start = persisted.api_calls.len().saturating_sub(lines);
                let calls = &persisted.api_calls[start..];
                if json {
                    println!("{}", serde_json::to_string_pretty(calls)?);
                } else {
                    print_api_calls(calls);
                }
            } else {
                let start = persisted.errors.len().saturating_sub(lines);
                let events = &persisted.errors[start..];
                if json {
                    println!("{}", serde_json::to_string_pretty(events)?);
                } else {
                    print_events(events);
                }
            }
        }

        Commands::Summary => {
            let persisted = service.generate_report().persisted;
            let mut kinds: BTreeMap<&str, usize> =
                EventKind::all().iter().map(|k| (k.as_str(), 0)).collect();
            for event in &persisted.errors {
                *kinds.entry(event.kind.as_str()).or_default() += 1;
            }
            let failed = persisted.api_calls.iter().filter(|c| !c.ok).count();

            if json {
                let summary = serde_json::json!({
                    "events": persisted.errors.len(),
                    "kinds": kinds,
                    "apiCalls": persisted.api_calls.len(),
                    "failedApiCalls": failed,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Pitchside v{}", env!("CARGO_PKG_VERSION"));
                println!("Data directory: {:?}", config.data_dir());
                println!();
                println!("Events: {}", persisted.errors.len());
                for (kind, count) in &kinds {
                    println!("  {:<20} {}", kind, count);
                }
                println!();
                println!("API calls: {} ({} failed)", persisted.api_calls.len(), failed);
            }
        }

        Commands::Probe { target } => {
            let inner = reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(config.dashboard.request_timeout_ms))
                .user_agent(pitchside::capture::default_user_agent())
                .build()?;
            let http = ObservedClient::new(inner)
                .with(Arc::new(TracingInterceptor))
                .with(Arc::new(DiagnosticsInterceptor::new(Arc::clone(&service))));

            let outcome = probe(&config, http, &target).await;

            for call in service.api_calls() {
                println!(
                    "{} {} -> {} {} ({} ms)",
                    call.method, call.url, call.status, call.status_text, call.duration_ms
                );
            }
            for event in service.errors() {
                println!("captured {}: {}", event.kind, event.message);
            }

            outcome?;
        }

        // Written above, before any config is loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn probe(config: &Config, http: ObservedClient, target: &str) -> anyhow::Result<()> {
    if let Ok(resource) = target.parse::<Resource>() {
        let client = DashboardClient::with_client(config.dashboard_config(), http);
        let result = match resource {
            Resource::Predictions => client.predictions().await.map(|_| ()),
            Resource::Lineup => client.lineup(&LineupFilter::default()).await.map(|_| ()),
            Resource::Analytics => client.analytics().await.map(|_| ()),
            Resource::Shap => client.shap().await.map(|_| ()),
            Resource::Settings => client.settings().await.map(|_| ()),
        };
        return result.with_context(|| format!("Probe of {} failed", resource.as_str()));
    }

    if !target.starts_with('/') {
        bail!(
            "Unknown target {:?}: expected one of predictions, lineup, analytics, shap, settings or a path starting with /",
            target
        );
    }

    let url = format!("{}{}", config.dashboard.base_url.trim_end_matches('/'), target);
    let response = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    if !response.status().is_success() {
        bail!("{} returned {}", url, response.status());
    }
    Ok(())
}

fn print_events(events: &[DiagnosticEvent]) {
    if events.is_empty() {
        println!("No diagnostic events recorded.");
        return;
    }

    println!("{:<24} {:<20} {}", "Timestamp", "Kind", "Message");
    println!("{}", "-".repeat(80));
    for event in events {
        let location = match (&event.filename, event.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        };
        println!(
            "{:<24} {:<20} {}{}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            event.kind.as_str(),
            event.message,
            location
        );
    }
}

fn print_api_calls(calls: &[ApiCallRecord]) {
    if calls.is_empty() {
        println!("No API calls recorded.");
        return;
    }

    println!(
        "{:<24} {:<7} {:<6} {:>8}  {}",
        "Timestamp", "Method", "Status", "ms", "URL"
    );
    println!("{}", "-".repeat(80));
    for call in calls {
        println!(
            "{:<24} {:<7} {:<6} {:>8}  {}",
            call.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            call.method,
            call.status,
            call.duration_ms,
            call.url
        );
    }
}
