//! Durable JSON cache of decoded airport weather.
//!
//! `WeatherCache` is the single writer, owned by the sync engine.
//! Collaborators get a `CacheReader`, which only hands out copies.
//! The document is rewritten whole through a temp file and a rename, so
//! a failed write leaves the previous file intact.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aerowx_weather::{AirportRecord, DecodedObservation, TafReport};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::PersistenceError;

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    #[serde(default)]
    pub airports: BTreeMap<String, AirportRecord>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

pub struct WeatherCache {
    document: Arc<RwLock<CacheDocument>>,
    path: PathBuf,
}

impl WeatherCache {
    /// Start with an empty cache that persists to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            document: Arc::new(RwLock::new(CacheDocument::default())),
            path: path.into(),
        }
    }

    /// Load the document at `path`. A missing file is normal; an unreadable
    /// one is logged and replaced by an empty cache on the next write.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = match read_document(&path) {
            Ok(Some(doc)) => {
                tracing::info!("Loaded {} airports from {}", doc.airports.len(), path.display());
                doc
            }
            Ok(None) => {
                tracing::info!("No cache at {}, starting empty", path.display());
                CacheDocument::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                CacheDocument::default()
            }
        };

        Self {
            document: Arc::new(RwLock::new(document)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reader(&self) -> CacheReader {
        CacheReader {
            document: self.document.clone(),
        }
    }

    pub fn snapshot(&self) -> CacheDocument {
        self.document.read().clone()
    }

    pub fn get(&self, icao: &str) -> Option<AirportRecord> {
        self.document.read().airports.get(icao).cloned()
    }

    /// Station coordinates for every airport with an observation.
    pub fn locations(&self) -> HashMap<String, (f64, f64)> {
        self.document
            .read()
            .airports
            .iter()
            .filter_map(|(icao, record)| record.location().map(|loc| (icao.clone(), loc)))
            .collect()
    }

    pub fn upsert_observation(
        &self,
        icao: &str,
        observation: DecodedObservation,
        now: DateTime<Utc>,
    ) {
        let mut doc = self.document.write();
        doc.airports
            .entry(icao.to_string())
            .or_insert_with(|| AirportRecord::new(icao, now))
            .apply_observation(observation, now);
        doc.last_update = Some(now);
    }

    pub fn upsert_forecast(&self, icao: &str, report: TafReport, now: DateTime<Utc>) {
        let mut doc = self.document.write();
        doc.airports
            .entry(icao.to_string())
            .or_insert_with(|| AirportRecord::new(icao, now))
            .apply_forecast(report, now);
        doc.last_update = Some(now);
    }

    /// Atomically replace the file on disk with the current document. The
    /// write runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` when the directory or temp file cannot be
    /// written or the rename fails. The in-memory document is unaffected.
    pub async fn persist(&self) -> Result<(), PersistenceError> {
        let json = {
            let doc = self.document.read();
            serde_json::to_vec_pretty(&*doc)?
        };
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| PersistenceError::Background(e.to_string()))??;

        tracing::debug!("Persisted cache to {}", self.path.display());
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| PersistenceError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;
    Ok(())
}

/// Read-only view of the cache for collaborators.
#[derive(Clone)]
pub struct CacheReader {
    document: Arc<RwLock<CacheDocument>>,
}

impl CacheReader {
    pub fn snapshot(&self) -> CacheDocument {
        self.document.read().clone()
    }

    pub fn get(&self, icao: &str) -> Option<AirportRecord> {
        self.document
            .read()
            .airports
            .get(&icao.to_ascii_uppercase())
            .cloned()
    }
}

fn read_document(path: &Path) -> Result<Option<CacheDocument>, String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    serde_json::from_str(&text).map(Some).map_err(|e| e.to_string())
}
