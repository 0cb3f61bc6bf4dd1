//! Sync cycles.
//!
//! One cycle walks the configured airports in order, fetching the METAR and
//! then the TAF for each one through the rate-gated fetcher. Every
//! successful fetch is decoded, merged into the cache and persisted before
//! the next call. Once all airports are done, updated airports that are
//! publish targets are pushed to the router.
//!
//! Only one cycle runs at a time. `trigger` returns at once and does nothing
//! while a cycle is in flight.

use std::sync::Arc;

use aerowx_core::Config;
use aerowx_publish::{PublishReport, PublishRouter};
use aerowx_weather::{decode_observation, decode_taf, LocalZone};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cache::{CacheReader, WeatherCache};
use crate::error::UpstreamError;
use crate::fetcher::{Fetched, Fetcher};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub airports: Vec<String>,
    pub include_taf: bool,
    pub zone: LocalZone,
}

impl SyncSettings {
    pub fn from_config(config: &Config, zone: LocalZone) -> Self {
        Self {
            airports: config.airport_codes.clone(),
            include_taf: config.include_taf,
            zone,
        }
    }
}

/// Outcome of one fetch step for one airport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Updated,
    NoData,
    Failed(String),
    Skipped,
}

impl StepOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirportOutcome {
    pub icao: String,
    pub metar: StepOutcome,
    pub taf: StepOutcome,
    pub publish: Option<PublishReport>,
}

impl AirportOutcome {
    pub fn updated(&self) -> bool {
        self.metar.is_updated() || self.taf.is_updated()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub airports: Vec<AirportOutcome>,
    /// Cache writes that failed during the cycle.
    pub persist_failures: usize,
}

impl CycleReport {
    pub fn airport(&self, icao: &str) -> Option<&AirportOutcome> {
        self.airports.iter().find(|a| a.icao == icao)
    }

    pub fn updated_count(&self) -> usize {
        self.airports.iter().filter(|a| a.updated()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.airports
            .iter()
            .filter(|a| a.metar.is_failed() || a.taf.is_failed())
            .count()
    }
}

pub enum TriggerOutcome {
    /// A new cycle was spawned; the handle yields its report.
    Started(JoinHandle<CycleReport>),
    /// A cycle is already in flight and will refresh the cache.
    AlreadyRunning,
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

struct EngineInner {
    fetcher: Fetcher,
    cache: WeatherCache,
    router: Option<PublishRouter>,
    settings: SyncSettings,
    cycle_lock: Arc<Mutex<()>>,
    last_report: parking_lot::Mutex<Option<CycleReport>>,
}

/// Owns the cache writer and runs sync cycles. Cheap to clone.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(
        fetcher: Fetcher,
        cache: WeatherCache,
        settings: SyncSettings,
        router: Option<PublishRouter>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                fetcher,
                cache,
                router,
                settings,
                cycle_lock: Arc::new(Mutex::new(())),
                last_report: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn reader(&self) -> CacheReader {
        self.inner.cache.reader()
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.inner.last_report.lock().clone()
    }

    /// Request a sync without waiting for it. Must be called inside a tokio
    /// runtime.
    pub fn trigger(&self) -> TriggerOutcome {
        match self.inner.cycle_lock.clone().try_lock_owned() {
            Ok(guard) => {
                let inner = self.inner.clone();
                TriggerOutcome::Started(tokio::spawn(async move {
                    let _guard = guard;
                    inner.run().await
                }))
            }
            Err(_) => {
                tracing::info!("Sync already in progress, trigger ignored");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    /// Run a cycle to completion, waiting for any in-flight cycle first.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.inner.cycle_lock.lock().await;
        self.inner.run().await
    }
}

impl EngineInner {
    async fn run(&self) -> CycleReport {
        let started = Utc::now();
        tracing::info!("Starting sync for {} airports", self.settings.airports.len());

        let mut airports = Vec::with_capacity(self.settings.airports.len());
        let mut persist_failures = 0;
        for icao in &self.settings.airports {
            let (outcome, failures) = self.sync_airport(icao).await;
            persist_failures += failures;
            airports.push(outcome);
        }

        self.publish_updated(&mut airports).await;

        let report = CycleReport {
            started,
            finished: Utc::now(),
            airports,
            persist_failures,
        };
        tracing::info!(
            "Sync finished: {} updated, {} with errors, in {} ms",
            report.updated_count(),
            report.failed_count(),
            (report.finished - report.started).num_milliseconds()
        );

        *self.last_report.lock() = Some(report.clone());
        report
    }

    async fn sync_airport(&self, icao: &str) -> (AirportOutcome, usize) {
        let zone = self.settings.zone;
        let mut persist_failures = 0;

        let metar = match self.fetcher.fetch_metar(icao).await {
            Ok(Fetched::Data(raw)) => {
                let observation = decode_observation(icao, &raw, &zone);
                self.cache.upsert_observation(icao, observation, Utc::now());
                persist_failures += self.persist().await;
                tracing::info!("Updated METAR for {}", icao);
                StepOutcome::Updated
            }
            Ok(Fetched::NoData) => {
                tracing::warn!("No METAR available for {}", icao);
                StepOutcome::NoData
            }
            Err(e) => failed_step("METAR", icao, &e),
        };

        let taf = if !self.settings.include_taf {
            StepOutcome::Skipped
        } else {
            match self.fetcher.fetch_taf(icao).await {
                Ok(Fetched::Data(raw)) => {
                    let report = decode_taf(&raw, &zone);
                    tracing::debug!(
                        "Decoded {} forecast periods for {}",
                        report.periods.len(),
                        icao
                    );
                    self.cache.upsert_forecast(icao, report, Utc::now());
                    persist_failures += self.persist().await;
                    StepOutcome::Updated
                }
                Ok(Fetched::NoData) => {
                    tracing::warn!("No TAF available for {}", icao);
                    StepOutcome::NoData
                }
                Err(e) => failed_step("TAF", icao, &e),
            }
        };

        let outcome = AirportOutcome {
            icao: icao.to_string(),
            metar,
            taf,
            publish: None,
        };
        (outcome, persist_failures)
    }

    /// Returns the number of failed writes (0 or 1).
    async fn persist(&self) -> usize {
        match self.cache.persist().await {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("Cache not persisted, keeping it in memory only: {}", e);
                1
            }
        }
    }

    async fn publish_updated(&self, airports: &mut [AirportOutcome]) {
        let Some(router) = &self.router else {
            return;
        };
        if !airports.iter().any(AirportOutcome::updated) {
            return;
        }

        let targets = router
            .resolve_targets(&self.settings.airports, &self.cache.locations())
            .await;
        tracing::debug!("Publishing to {:?}", targets);

        for outcome in airports.iter_mut() {
            if !outcome.updated() || !targets.contains(&outcome.icao) {
                continue;
            }
            if let Some(record) = self.cache.get(&outcome.icao) {
                outcome.publish = Some(router.publish(&record).await);
            }
        }
    }
}

/// Log an upstream failure. The cached record stays as it was.
fn failed_step(report: &str, icao: &str, err: &UpstreamError) -> StepOutcome {
    if err.is_transient() {
        tracing::warn!("{} fetch failed for {}: {}; retrying next cycle", report, icao, err);
    } else {
        tracing::warn!(
            "{} for {} rejected by upstream: {}; keeping cached data",
            report,
            icao,
            err
        );
    }
    StepOutcome::Failed(err.to_string())
}
