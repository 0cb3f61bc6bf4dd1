//! Platform registration through the Supervisor core API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::entity::WeatherEntity;
use crate::error::PublishError;
use crate::sensors::SensorState;
use crate::sinks::RegistrationSink;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CoreConfig {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub struct SupervisorClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl SupervisorClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            token: token.map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> Result<String, PublishError> {
        self.token
            .as_deref()
            .map(|t| format!("Bearer {}", t))
            .ok_or(PublishError::MissingToken)
    }

    async fn post_state(
        &self,
        entity_id: &str,
        body: &serde_json::Value,
    ) -> Result<(), PublishError> {
        let url = format!("{}/states/{}", self.base_url, entity_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header()?)
            .json(body)
            .send()
            .await?;

        self.check_status(response).await
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<(), PublishError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RegistrationSink for SupervisorClient {
    #[instrument(skip(self, sensors), fields(count = sensors.len()), level = "info")]
    async fn register_sensors(&self, sensors: &[SensorState]) -> Result<usize, PublishError> {
        let mut accepted = 0;
        let mut last_error = None;

        for sensor in sensors {
            let body = json!({
                "state": sensor.state,
                "attributes": sensor.platform_attributes(),
            });
            match self.post_state(&sensor.entity_id(), &body).await {
                Ok(()) => {
                    accepted += 1;
                    tracing::debug!("Registered {}", sensor.entity_id());
                }
                Err(e) => {
                    tracing::warn!("Failed to register {}: {}", sensor.entity_id(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if accepted == 0 => Err(e),
            _ => Ok(accepted),
        }
    }

    #[instrument(skip(self, entity), fields(entity_id = %entity.entity_id), level = "info")]
    async fn register_weather(&self, entity: &WeatherEntity) -> Result<(), PublishError> {
        let body = serde_json::to_value(entity)?;
        self.post_state(&entity.entity_id, &body).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn home_location(&self) -> Result<Option<(f64, f64)>, PublishError> {
        let url = format!("{}/config", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let config: CoreConfig = response
            .json()
            .await
            .map_err(|e| PublishError::Rejected {
                status: status.as_u16(),
                message: format!("unreadable config: {}", e),
            })?;

        Ok(match (config.latitude, config.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::condition::Condition;
    use serde_json::{Map, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sensor(key: &'static str, state: Value) -> SensorState {
        SensorState {
            key,
            icao: "KJFK".into(),
            name: format!("KJFK {}", key),
            state,
            unit: None,
            device_class: None,
            icon: "mdi:test",
            attributes: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_register_sensors_posts_each_state() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/states/sensor.aviation_weather_kjfk_temperature"))
            .and(header("Authorization", "Bearer test_token"))
            .and(body_partial_json(json!({"state": 21.0})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/states/sensor.aviation_weather_kjfk_flight_category"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SupervisorClient::new(&mock_server.uri(), Some("test_token")).unwrap();
        let sensors = vec![
            sensor("temperature", json!(21.0)),
            sensor("flight_category", json!("VFR")),
        ];

        assert_eq!(client.register_sensors(&sensors).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_partial_rejection_still_counts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/states/sensor.aviation_weather_kjfk_temperature"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/states/sensor.aviation_weather_kjfk_dewpoint"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = SupervisorClient::new(&mock_server.uri(), Some("t")).unwrap();
        let sensors = vec![sensor("temperature", json!(1)), sensor("dewpoint", json!(0))];
        assert_eq!(client.register_sensors(&sensors).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_all_rejected_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&mock_server)
            .await;

        let client = SupervisorClient::new(&mock_server.uri(), Some("bad")).unwrap();
        let result = client.register_sensors(&[sensor("humidity", json!(50))]).await;

        assert!(matches!(result, Err(PublishError::Rejected { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = SupervisorClient::new(&mock_server.uri(), None).unwrap();
        let result = client.register_sensors(&[sensor("humidity", json!(50))]).await;
        assert!(matches!(result, Err(PublishError::MissingToken)));
    }

    #[tokio::test]
    async fn test_register_weather_entity() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/states/weather.aviation_weather_kjfk"))
            .and(body_partial_json(json!({"state": "rainy", "attributes": {"station": "KJFK"}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut attributes = Map::new();
        attributes.insert("station".into(), json!("KJFK"));
        let entity = WeatherEntity {
            entity_id: "weather.aviation_weather_kjfk".into(),
            state: Condition::Rainy,
            attributes,
        };

        let client = SupervisorClient::new(&mock_server.uri(), Some("t")).unwrap();
        client.register_weather(&entity).await.unwrap();
    }

    #[tokio::test]
    async fn test_home_location() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 40.7, "longitude": -74.0, "location_name": "Home"
            })))
            .mount(&mock_server)
            .await;

        let client = SupervisorClient::new(&mock_server.uri(), Some("t")).unwrap();
        assert_eq!(client.home_location().await.unwrap(), Some((40.7, -74.0)));
    }

    #[tokio::test]
    async fn test_unreachable_supervisor() {
        // Nothing listens on this port.
        let client = SupervisorClient::new("http://127.0.0.1:9", Some("t")).unwrap();
        let result = client.home_location().await;
        assert!(matches!(result, Err(PublishError::Unreachable(_))));
    }
}
