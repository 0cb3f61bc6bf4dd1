//! MQTT discovery sink.
//!
//! Each sensor gets a retained discovery config under
//! `<prefix>/sensor/<object_id>/config`; values go to
//! `aerowx/<icao>/<key>/state` and `.../attributes`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aerowx_core::MqttConfig;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::error::PublishError;
use crate::sensors::{object_base, SensorState};
use crate::sinks::DiscoverySink;

const STATE_ROOT: &str = "aerowx";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct MqttSink {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    discovery_prefix: String,
    poller: JoinHandle<()>,
}

impl MqttSink {
    /// Start the client and its event loop. Must be called inside a tokio
    /// runtime. The sink reports itself unreachable until the broker
    /// acknowledges the connection.
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();
        let host = format!("{}:{}", config.host, config.port);

        let poller = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Connected to MQTT broker {}", host);
                        flag.store(true, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if flag.swap(false, Ordering::SeqCst) {
                            tracing::warn!("MQTT connection to {} lost: {}", host, e);
                        } else {
                            tracing::debug!("MQTT broker {} unavailable: {}", host, e);
                        }
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Self {
            client,
            connected,
            discovery_prefix: config.discovery_prefix.clone(),
            poller,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for MqttSink {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[async_trait]
impl DiscoverySink for MqttSink {
    async fn publish_sensors(
        &self,
        icao: &str,
        sensors: &[SensorState],
    ) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::Unreachable("MQTT broker not connected".into()));
        }

        for sensor in sensors {
            let config = serde_json::to_vec(&discovery_payload(sensor))?;
            let attributes = serde_json::to_vec(&sensor.attributes)?;

            self.client.try_publish(
                discovery_topic(&self.discovery_prefix, sensor),
                QoS::AtLeastOnce,
                true,
                config,
            )?;
            let state = sensor.state_text();
            self.client.try_publish(state_topic(sensor), QoS::AtLeastOnce, true, state)?;
            self.client.try_publish(attributes_topic(sensor), QoS::AtLeastOnce, true, attributes)?;
        }

        tracing::debug!("Queued {} sensors for {} on MQTT", sensors.len(), icao);
        Ok(())
    }
}

pub fn discovery_topic(prefix: &str, sensor: &SensorState) -> String {
    format!("{}/sensor/{}/config", prefix, sensor.object_id())
}

pub fn state_topic(sensor: &SensorState) -> String {
    format!("{}/{}/{}/state", STATE_ROOT, sensor.icao.to_ascii_lowercase(), sensor.key)
}

pub fn attributes_topic(sensor: &SensorState) -> String {
    format!("{}/{}/{}/attributes", STATE_ROOT, sensor.icao.to_ascii_lowercase(), sensor.key)
}

pub fn discovery_payload(sensor: &SensorState) -> Value {
    let mut payload = json!({
        "name": sensor.name,
        "unique_id": sensor.object_id(),
        "object_id": sensor.object_id(),
        "state_topic": state_topic(sensor),
        "json_attributes_topic": attributes_topic(sensor),
        "icon": sensor.icon,
        "device": {
            "identifiers": [object_base(&sensor.icao)],
            "name": format!("{} Aviation Weather", sensor.icao),
            "manufacturer": "Aviation Weather Center",
            "model": "METAR/TAF",
        },
    });
    if let Some(unit) = sensor.unit {
        payload["unit_of_measurement"] = json!(unit);
    }
    if let Some(class) = sensor.device_class {
        payload["device_class"] = json!(class);
    }
    payload
}
