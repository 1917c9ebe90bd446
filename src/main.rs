//! Configurator relay entry point.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tracing::{error, info, warn};

use configurator_relay::cli::Cli;
use configurator_relay::infrastructure::logging::LoggerImpl;
use configurator_relay::{
    Aggregator, ConfigLoader, EventFeed, EventStore, LifecycleConfig, LifecycleController,
    StatsStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    ConfigLoader::validate(&config)?;

    let _logger = LoggerImpl::init(&config.logging)?;

    let input: Box<dyn BufRead + Send> = match cli.input_path() {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open event stream {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let events = Arc::new(EventStore::new());
    let stats = Arc::new(StatsStore::new());
    let lifecycle = Arc::new(LifecycleController::new(
        LifecycleConfig::from(&config),
        events.clone(),
        stats.clone(),
    ));

    lifecycle
        .start()
        .await
        .context("Failed to start query server")?;

    let aggregator = Aggregator::new(events, stats).with_strict_items(cli.strict_items);
    let feed_lifecycle = lifecycle.clone();
    let producer = std::thread::Builder::new()
        .name("event-feed".to_string())
        .spawn(move || {
            let mut feed =
                EventFeed::new(aggregator, std::io::stdout()).with_lifecycle(feed_lifecycle.clone());
            let result = feed.run(input);
            if let Err(err) = &result {
                error!(error = %err, "event feed failed");
                feed_lifecycle.stop();
            }
            result
        })
        .context("Failed to spawn event feed thread")?;

    let switch = lifecycle.switch();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            switch.stop();
        }
    });

    lifecycle.wait().await.context("Query server failed")?;

    // The feed may still be blocked on an open stdin after a manual stop.
    if producer.is_finished() {
        let report = producer
            .join()
            .map_err(|_| anyhow!("event feed thread panicked"))??;
        info!(
            events = report.events,
            skipped = report.skipped_lines,
            run_ended = report.run_ended,
            "configurator relay finished"
        );
    } else {
        warn!("query server stopped before the event stream ended");
    }

    Ok(())
}
