use analytics::{AnomalyReport, HealthAssessment, LoomSummary, QualityReport};
use analyzer::{AnalyticsFacade, InMemorySource};
use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use configuration::{Config, Log};
use core_types::MeasurementRecord;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The main entry point for the Kaldor loom analytics application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the environment itself.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => configuration::load_config_from(path)?,
        None => configuration::load_config()?,
    };
    let _log_guard = init_tracing(&config.log);

    // Execute the appropriate command
    match cli.command {
        Commands::Serve => web_server::run_server(config).await,
        Commands::Analyze(args) => handle_analyze(args, &config).await,
    }
}

/// Installs the global subscriber: stdout always, plus a daily file when configured.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log: &Log) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match &log.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "kaldor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Health analytics for BBW-instrumented looms.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the analytics HTTP API against the measurement database.
    Serve,
    /// Analyze an exported JSON array of measurements without a database.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// The loom the measurements belong to (e.g., "LOOM-001").
    #[arg(long)]
    loom_id: String,

    /// A JSON file holding an array of measurement records.
    #[arg(long)]
    input: PathBuf,

    /// Print the reports as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Analyze Command Logic
// ==============================================================================

/// Runs every analysis over an exported file, with "now" pinned to its newest record.
async fn handle_analyze(args: AnalyzeArgs, config: &Config) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let records: Vec<MeasurementRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of measurements", args.input.display()))?;
    let Some(start) = records.iter().map(|r| r.time).min() else {
        anyhow::bail!("{} contains no measurements", args.input.display());
    };

    let source = InMemorySource::anchored_at_latest(&args.loom_id, records)
        .with_context(|| format!("{} contains no measurements", args.input.display()))?;
    let facade = AnalyticsFacade::new(Arc::new(source), &config.analytics);

    tracing::info!(loom_id = %args.loom_id, input = %args.input.display(), "Analyzing exported measurements.");

    let anomalies = facade.detect_anomalies(&args.loom_id, None).await?;
    let health = facade.predict_maintenance(&args.loom_id).await?;
    let quality = facade.quality_report(&args.loom_id, start, None).await?;
    let summary = facade.summary(&args.loom_id).await?;

    if args.json {
        let combined = json!({
            "anomaly_detection": anomalies,
            "maintenance": health,
            "quality": quality,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&combined)?);
    } else {
        print_tables(&anomalies, &health, &quality, &summary);
    }

    Ok(())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_tables(
    anomalies: &AnomalyReport,
    health: &HealthAssessment,
    quality: &QualityReport,
    summary: &LoomSummary,
) {
    println!("\nMaintenance outlook for {}", health.loom_id);
    let mut table = new_table(vec!["Health", "Trend", "Urgency", "Maintenance", "Recommendation"]);
    table.add_row(vec![
        Cell::new(format!("{:.2}", health.health_score)),
        Cell::new(health.trend_direction),
        Cell::new(health.urgency),
        Cell::new(if health.maintenance_needed { "yes" } else { "no" }),
        Cell::new(&health.recommendation),
    ]);
    println!("{table}");

    println!(
        "\nAnomalies over the last {}h ({} of {} readings)",
        anomalies.period_hours, anomalies.anomaly_count, anomalies.total_measurements
    );
    let mut table = new_table(vec!["Time", "BBW avg", "BBW stddev", "Z-score"]);
    for point in &anomalies.anomalies {
        table.add_row(vec![
            Cell::new(point.time.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{:.2}", point.bbw_avg)),
            Cell::new(format!("{:.3}", point.bbw_stddev)),
            Cell::new(format!("{:.2}", point.z_score)),
        ]);
    }
    println!("{table}");
    println!(
        "mean {:.2}, std {:.2}, min {:.2}, max {:.2}",
        anomalies.statistics.mean,
        anomalies.statistics.std,
        anomalies.statistics.min,
        anomalies.statistics.max
    );

    let m = &quality.measurements;
    println!(
        "\nQuality from {} to {}",
        quality.period.start.format("%Y-%m-%d %H:%M"),
        quality.period.end.format("%Y-%m-%d %H:%M")
    );
    let mut table = new_table(vec!["Readings", "Avg BBW", "Std dev", "Min", "Max", "Quality"]);
    table.add_row(vec![
        Cell::new(m.total_count),
        Cell::new(format!("{:.2}", m.average_bbw)),
        Cell::new(format!("{:.2}", m.std_deviation)),
        Cell::new(format!("{:.2}", m.min_bbw)),
        Cell::new(format!("{:.2}", m.max_bbw)),
        Cell::new(format!("{:.2}", m.quality_score)),
    ]);
    println!("{table}");

    let s = &summary.summary;
    println!("\nLast {}h summary", summary.period_hours);
    let mut table = new_table(vec!["Readings", "Avg BBW", "Min", "Max", "Avg temp", "Avg vib", "Avg quality"]);
    table.add_row(vec![
        Cell::new(s.total_measurements),
        Cell::new(format!("{:.2}", s.avg_bbw)),
        Cell::new(format!("{:.2}", s.min_bbw)),
        Cell::new(format!("{:.2}", s.max_bbw)),
        Cell::new(format!("{:.2}", s.avg_temperature)),
        Cell::new(format!("{:.2}", s.avg_vibration)),
        Cell::new(format!("{:.2}", s.avg_quality)),
    ]);
    println!("{table}");
}
