//! Publishing decoded airport weather to the home-automation platform.
//!
//! Builds the per-airport sensor set and weather entity, and routes them to
//! the MQTT discovery sink or the Supervisor registration API.

pub mod condition;
pub mod entity;
pub mod error;
pub mod mqtt;
pub mod router;
pub mod sensors;
pub mod sinks;
pub mod supervisor;

pub use condition::Condition;
pub use entity::{build_weather_entity, WeatherEntity};
pub use error::PublishError;
pub use mqtt::MqttSink;
pub use router::{select_targets, PublishReport, PublishRouter, SensorPath};
pub use sensors::{build_sensors, SensorState};
pub use sinks::{DiscoverySink, RegistrationSink};
pub use supervisor::SupervisorClient;
