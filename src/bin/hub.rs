use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pagewatch::{
    actors::{messages::StatusEvent, scheduler::SchedulerHandle},
    config::{FileSettings, read_config_file},
    extract::MetricExtractor,
    fetch::HttpPageFetcher,
    retriever::StatusRetriever,
    util::get_config_path,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $PAGEWATCH_CONFIG or ./pagewatch.json)
    #[arg(short)]
    file: Option<PathBuf>,

    /// Run a single cycle, print all project statuses as JSON and exit
    #[arg(long)]
    once: bool,

    /// Log at trace level instead of info
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    dotenv::dotenv().ok();

    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new()
        .with_targets(vec![("pagewatch", level), ("pagewatch_hub", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let path = args.file.clone().unwrap_or_else(get_config_path);
    let config = read_config_file(&path)?;

    let extractor = MetricExtractor::from_config(&config.labels)?;
    let fetcher = HttpPageFetcher::new(Duration::from_secs(config.timeout))?;
    let settings = FileSettings::new(&path, config.clone());

    let retriever = Arc::new(
        StatusRetriever::new(Arc::new(settings), Arc::new(fetcher), extractor)
            .with_max_concurrent_fetches(config.max_concurrent_fetches),
    );

    if args.once {
        retriever.refresh().await;
        let snapshot = retriever.snapshot().await;
        let json = serde_json::to_string_pretty(snapshot.as_ref())
            .context("failed to serialize project statuses")?;
        println!("{json}");
        return Ok(());
    }

    let (event_tx, event_rx) = broadcast::channel(16);
    let scheduler = SchedulerHandle::spawn(
        retriever,
        Duration::from_secs(config.interval),
        event_tx,
    );
    debug!(
        "polling {} projects every {}s",
        config.projects.len(),
        config.interval
    );

    tokio::spawn(log_cycles(event_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    scheduler.shutdown().await?;

    Ok(())
}

async fn log_cycles(mut event_rx: broadcast::Receiver<StatusEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(StatusEvent::CycleCompleted { snapshot, timestamp }) => {
                for (project, status) in snapshot.iter() {
                    for alert in &status.alerts {
                        warn!(
                            "{project}: {} ({}, {} consecutive)",
                            alert.message(),
                            alert.color(),
                            alert.chain_len()
                        );
                    }
                }
                debug!("cycle completed at {timestamp}");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("cycle log lagging, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => {
                error!("cycle event channel closed");
                break;
            }
        }
    }
}
