//! Cached per-airport record: the latest observation and forecast with update stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metar::DecodedObservation;
use crate::taf::{ForecastPeriod, TafHeader, TafReport};

/// Latest decoded weather for one airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub icao: String,
    pub observation: Option<DecodedObservation>,
    #[serde(default)]
    pub forecast: Vec<ForecastPeriod>,
    pub taf: Option<TafHeader>,
    pub last_updated: DateTime<Utc>,
}

impl AirportRecord {
    pub fn new(icao: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            icao: icao.into(),
            observation: None,
            forecast: Vec::new(),
            taf: None,
            last_updated: now,
        }
    }

    pub fn apply_observation(&mut self, observation: DecodedObservation, now: DateTime<Utc>) {
        self.observation = Some(observation);
        self.last_updated = now;
    }

    pub fn apply_forecast(&mut self, report: TafReport, now: DateTime<Utc>) {
        self.taf = Some(report.header);
        self.forecast = report.periods;
        self.last_updated = now;
    }

    /// Station coordinates from the latest observation.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.observation.as_ref()?.location()
    }
}
