//! Sink seams used by the router.

use async_trait::async_trait;

use crate::entity::WeatherEntity;
use crate::error::PublishError;
use crate::sensors::SensorState;

/// Message-bus discovery transport for sensors.
#[async_trait]
pub trait DiscoverySink: Send + Sync {
    async fn publish_sensors(&self, icao: &str, sensors: &[SensorState])
        -> Result<(), PublishError>;
}

/// Platform registration API. Carries sensors as a fallback and is the
/// only path for weather entities.
#[async_trait]
pub trait RegistrationSink: Send + Sync {
    /// Returns how many sensors were accepted.
    async fn register_sensors(&self, sensors: &[SensorState]) -> Result<usize, PublishError>;

    async fn register_weather(&self, entity: &WeatherEntity) -> Result<(), PublishError>;

    /// Home coordinates configured on the platform, if any.
    async fn home_location(&self) -> Result<Option<(f64, f64)>, PublishError>;
}
