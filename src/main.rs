//! AeroWx: keeps METAR/TAF data for a set of airports fresh and publishes it
//! to the home-automation platform.

mod trigger;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aerowx_core::Config;
use aerowx_publish::{DiscoverySink, MqttSink, PublishRouter, SupervisorClient};
use aerowx_sync::{
    Fetcher, MinSpacingGate, SyncEngine, SyncSettings, TriggerOutcome, WeatherCache,
};
use aerowx_weather::LocalZone;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use trigger::ManualTrigger;

#[derive(Parser)]
#[command(name = "aerowx", about = "Aviation weather sync for home automation")]
struct Cli {
    /// Config file (defaults to AEROWX_CONFIG or the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one sync cycle, print the cache as JSON and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, validation) = Config::load_validated(cli.config.as_deref())?;
    aerowx_core::init_logging(&config.log_level)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let zone = LocalZone::from_option(config.local_timezone()?);
    let cache = WeatherCache::load(config.effective_cache_path());
    let gate = Arc::new(MinSpacingGate::for_upstream(&config.upstream));
    let fetcher =
        Fetcher::new(&config.upstream, gate).context("Failed to build upstream client")?;

    // Keeps the MQTT event loop alive for the life of the process.
    let router = build_router(&config)?;

    let engine = SyncEngine::new(
        fetcher,
        cache,
        SyncSettings::from_config(&config, zone),
        router,
    );

    tracing::info!(
        "AeroWx started for {} airports ({})",
        config.airport_codes.len(),
        config.airport_codes.join(", ")
    );

    // Startup sync so readers never see an empty cache for long.
    engine.run_cycle().await;

    if cli.once {
        let snapshot = engine.reader().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let manual = ManualTrigger::install().context("Failed to install manual sync trigger")?;
    run_schedule(&engine, config.update_interval_minutes, manual).await;
    tracing::info!("AeroWx stopped");
    Ok(())
}

fn build_router(config: &Config) -> Result<Option<PublishRouter>> {
    let publish = &config.publish;
    if !publish.create_sensors {
        tracing::info!("Sensor publishing disabled");
        return Ok(None);
    }

    let registry =
        SupervisorClient::new(&publish.supervisor_url, publish.supervisor_token.as_deref())
            .context("Failed to build Supervisor client")?;

    let bus = publish.mqtt.as_ref().map(|mqtt| {
        tracing::info!("Publishing sensors over MQTT at {}:{}", mqtt.host, mqtt.port);
        Arc::new(MqttSink::connect(mqtt)) as Arc<dyn DiscoverySink>
    });

    Ok(Some(PublishRouter::new(
        bus,
        Arc::new(registry),
        publish.sensor_airport_choice(),
    )))
}

async fn run_schedule(engine: &SyncEngine, interval_minutes: u32, mut manual: ManualTrigger) {
    let period = Duration::from_secs(u64::from(interval_minutes.max(1)) * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the startup sync already covered it.
    ticker.tick().await;

    tracing::info!(
        "Syncing every {} minutes (SIGUSR1 for an immediate sync, Ctrl-C to stop)",
        interval_minutes.max(1)
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => request_sync(engine, "Scheduled"),
            Some(()) = manual.requested() => request_sync(engine, "Manual"),
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }
}

fn request_sync(engine: &SyncEngine, source: &str) {
    match engine.trigger() {
        TriggerOutcome::Started(_) => tracing::info!("{} sync started", source),
        TriggerOutcome::AlreadyRunning => {
            tracing::info!("{} sync skipped, previous cycle still running", source);
        }
    }
}
