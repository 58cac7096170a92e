//! pingwatch Binary Entry Point
//!
//! Records latency samples on a schedule and renders charts from the log.
//! Core functionality is provided by the `pingwatch` library crate.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pingwatch::{
    PingInvoker, ProbeCycle, ReportGenerator, Scheduler, TimeSeriesStore,
    config::AppConfig,
    scheduler::{RecordTask, ReportTask, Task},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pingwatch - Scheduled Latency Recorder
#[derive(Parser, Debug)]
#[command(name = "pingwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "PINGWATCH_CONFIG"
    )]
    config: String,

    /// Probe target host (overrides config file)
    #[arg(long, env = "PINGWATCH_TARGET")]
    target: Option<String>,

    /// Time-series log path (overrides config file)
    #[arg(long, env = "PINGWATCH_LOG_PATH")]
    log_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run one probe cycle now
    Record,
    /// Render the charts once
    Report {
        /// Print the report summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the scheduler until interrupted (default)
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pingwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!(path = %cli.config, "Loading configuration");
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    config.apply_overrides(cli.target, cli.log_path);
    config.validate()?;

    tracing::info!(
        host = %config.probe.target.host,
        log = %config.store.path.display(),
        "Configuration loaded"
    );

    let store = Arc::new(TimeSeriesStore::new(&config.store.path));

    match cli.command.unwrap_or(Command::Run) {
        Command::Record => {
            let cycle = build_cycle(&config, store);
            let sample = cycle.run(None, None).await?;
            println!("{}", sample.to_record());
        }
        Command::Report { json } => {
            let generator = build_generator(&config, store);
            let now = chrono::Local::now().naive_local();
            let outcome = tokio::task::spawn_blocking(move || generator.generate(now)).await??;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                for path in &outcome.artifacts {
                    println!("{}", path.display());
                }
            }
        }
        Command::Run => run_scheduler(&config, store).await?,
    }

    Ok(())
}

fn build_cycle(config: &AppConfig, store: Arc<TimeSeriesStore>) -> ProbeCycle {
    ProbeCycle::new(
        config.probe.target.clone(),
        PingInvoker::new(config.probe.binary.clone()),
        store,
    )
}

fn build_generator(config: &AppConfig, store: Arc<TimeSeriesStore>) -> ReportGenerator {
    ReportGenerator::new(store, &config.report.output_dir)
        .with_heatmap_days(config.report.heatmap_days)
        .with_histogram_bins(config.report.histogram_bins)
}

/// Register the record and report jobs and run until a shutdown signal.
async fn run_scheduler(
    config: &AppConfig,
    store: Arc<TimeSeriesStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let retry = config.schedule.retry;
    let record: Arc<dyn Task> = Arc::new(RecordTask::new(Arc::new(build_cycle(
        config,
        Arc::clone(&store),
    ))));
    let report: Arc<dyn Task> =
        Arc::new(ReportTask::new(Arc::new(build_generator(config, store))));

    let scheduler = Scheduler::new().await?;
    match config.report_schedule()? {
        Some(report_schedule) => {
            scheduler
                .add_job("ping", &config.record_schedule()?, vec![record], retry)
                .await?;
            scheduler
                .add_job("plot", &report_schedule, vec![report], retry)
                .await?;
        }
        None => {
            scheduler
                .add_job(
                    "ping",
                    &config.record_schedule()?,
                    vec![record, report],
                    retry,
                )
                .await?;
        }
    }

    scheduler.start().await?;
    tracing::info!("Press Ctrl+C to shutdown");

    shutdown_signal().await?;

    tracing::info!("Shutting down scheduler...");
    scheduler.shutdown().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Received Ctrl+C signal");
            }
            _ = terminate.recv() => {
                tracing::info!("Received terminate signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C signal");
    }

    Ok(())
}
