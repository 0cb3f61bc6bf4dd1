//! Chooses the sink for each airport's sensors and weather entity.
//!
//! Sensors go to the message bus first and fall back to the registration
//! API. The weather entity always goes through registration. Failures are
//! logged and reported, never returned as errors.

use std::collections::HashMap;
use std::sync::Arc;

use aerowx_core::SensorAirport;
use aerowx_weather::AirportRecord;
use serde::Serialize;

use crate::entity::build_weather_entity;
use crate::sensors::{build_sensors, SensorState};
use crate::sinks::{DiscoverySink, RegistrationSink};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// How the sensor set reached the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorPath {
    MessageBus,
    RegistrationFallback,
    /// No message bus configured; registration was the first choice.
    Registration,
    Failed,
    /// Nothing to publish yet for this airport.
    NotPublished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub icao: String,
    pub sensors: SensorPath,
    pub sensor_count: usize,
    pub weather_registered: bool,
}

pub struct PublishRouter {
    bus: Option<Arc<dyn DiscoverySink>>,
    registry: Arc<dyn RegistrationSink>,
    selection: SensorAirport,
}

impl PublishRouter {
    pub fn new(
        bus: Option<Arc<dyn DiscoverySink>>,
        registry: Arc<dyn RegistrationSink>,
        selection: SensorAirport,
    ) -> Self {
        Self {
            bus,
            registry,
            selection,
        }
    }

    /// Airports to publish this cycle, given the configured list and the
    /// station coordinates currently known.
    pub async fn resolve_targets(
        &self,
        airports: &[String],
        locations: &HashMap<String, (f64, f64)>,
    ) -> Vec<String> {
        let home = match self.selection {
            SensorAirport::Auto if !airports.is_empty() => {
                match self.registry.home_location().await {
                    Ok(home) => home,
                    Err(e) => {
                        tracing::warn!("Could not read home location: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        select_targets(&self.selection, airports, home, locations)
    }

    /// Publish one airport's record. Never fails; the outcome is reported.
    pub async fn publish(&self, record: &AirportRecord) -> PublishReport {
        let icao = record.icao.clone();
        let Some(obs) = record.observation.as_ref() else {
            tracing::debug!("No observation for {} yet, nothing to publish", icao);
            return PublishReport {
                icao,
                sensors: SensorPath::NotPublished,
                sensor_count: 0,
                weather_registered: false,
            };
        };

        let sensors = build_sensors(obs);
        let path = self.publish_sensors(&icao, &sensors).await;

        let weather_registered = match build_weather_entity(record) {
            Some(entity) => match self.registry.register_weather(&entity).await {
                Ok(()) => {
                    tracing::info!("Updated weather entity {}", entity.entity_id);
                    true
                }
                Err(e) => {
                    tracing::warn!("Weather entity {} not registered: {}", entity.entity_id, e);
                    false
                }
            },
            None => false,
        };

        PublishReport {
            icao,
            sensors: path,
            sensor_count: sensors.len(),
            weather_registered,
        }
    }

    async fn publish_sensors(&self, icao: &str, sensors: &[SensorState]) -> SensorPath {
        let fallback = match &self.bus {
            Some(bus) => match bus.publish_sensors(icao, sensors).await {
                Ok(()) => {
                    tracing::info!(
                        "Published {} sensors for {} on the message bus",
                        sensors.len(),
                        icao
                    );
                    return SensorPath::MessageBus;
                }
                Err(e) if e.allows_fallback() => {
                    tracing::warn!(
                        "Message bus publish failed for {}: {}; falling back to registration",
                        icao,
                        e
                    );
                    SensorPath::RegistrationFallback
                }
                Err(e) => {
                    tracing::warn!("Sensors for {} not published: {}", icao, e);
                    return SensorPath::Failed;
                }
            },
            None => SensorPath::Registration,
        };

        match self.registry.register_sensors(sensors).await {
            Ok(count) => {
                tracing::info!("Registered {}/{} sensors for {}", count, sensors.len(), icao);
                fallback
            }
            Err(e) => {
                tracing::warn!("Sensor registration failed for {}: {}", icao, e);
                SensorPath::Failed
            }
        }
    }
}

/// Pick target airports.
///
/// `All` returns every airport. A code returns that airport when it is
/// configured. `Auto` returns the airport nearest to `home`. Anything
/// unresolvable falls back to the first configured airport.
pub fn select_targets(
    selection: &SensorAirport,
    airports: &[String],
    home: Option<(f64, f64)>,
    locations: &HashMap<String, (f64, f64)>,
) -> Vec<String> {
    let Some(first) = airports.first() else {
        return Vec::new();
    };

    let chosen = match selection {
        SensorAirport::All => return airports.to_vec(),
        SensorAirport::Code(code) => {
            let found = airports.iter().find(|a| a.eq_ignore_ascii_case(code));
            if found.is_none() {
                tracing::warn!("Sensor airport {} is not configured, using {}", code, first);
            }
            found
        }
        SensorAirport::Auto => home.and_then(|home| nearest_airport(home, airports, locations)),
    };

    vec![chosen.unwrap_or(first).clone()]
}

fn nearest_airport<'a>(
    home: (f64, f64),
    airports: &'a [String],
    locations: &HashMap<String, (f64, f64)>,
) -> Option<&'a String> {
    let (best, distance) = airports
        .iter()
        .filter_map(|a| locations.get(a).map(|loc| (a, haversine_km(home, *loc))))
        .min_by(|x, y| x.1.total_cmp(&y.1))?;
    tracing::info!("Nearest airport: {} ({:.2} km)", best, distance);
    Some(best)
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
