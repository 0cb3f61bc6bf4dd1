//! Per-airport sensor set built from a decoded observation.

use serde::Serialize;
use serde_json::{json, Map, Value};

use aerowx_weather::derived::{c_to_f, kt_to_kmh, sm_to_km};
use aerowx_weather::DecodedObservation;

/// Platform limit on the length of a state value.
pub const MAX_STATE_LEN: usize = 255;

/// One sensor value with its presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    /// Suffix identifying the sensor within an airport, e.g. `temperature`.
    pub key: &'static str,
    pub icao: String,
    pub name: String,
    pub state: Value,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub icon: &'static str,
    pub attributes: Map<String, Value>,
}

impl SensorState {
    fn new(icao: &str, key: &'static str, label: &str, state: Value, icon: &'static str) -> Self {
        Self {
            key,
            icao: icao.to_string(),
            name: format!("{} {}", icao, label),
            state,
            unit: None,
            device_class: None,
            icon,
            attributes: Map::new(),
        }
    }

    fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    fn class(mut self, class: &'static str) -> Self {
        self.device_class = Some(class);
        self
    }

    fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.attributes.insert(key.to_string(), value);
        }
        self
    }

    /// `aviation_weather_kjfk_temperature`
    pub fn object_id(&self) -> String {
        format!("{}_{}", object_base(&self.icao), self.key)
    }

    /// `sensor.aviation_weather_kjfk_temperature`
    pub fn entity_id(&self) -> String {
        format!("sensor.{}", self.object_id())
    }

    /// Attributes as sent to the platform, including presentation metadata.
    pub fn platform_attributes(&self) -> Map<String, Value> {
        let mut attrs = self.attributes.clone();
        attrs.insert("friendly_name".into(), json!(self.name));
        attrs.insert("icon".into(), json!(self.icon));
        if let Some(unit) = self.unit {
            attrs.insert("unit_of_measurement".into(), json!(unit));
        }
        if let Some(class) = self.device_class {
            attrs.insert("device_class".into(), json!(class));
        }
        attrs
    }

    /// State rendered as text for transports that carry a plain payload.
    pub fn state_text(&self) -> String {
        match &self.state {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// `aviation_weather_<icao>` in lower case.
pub fn object_base(icao: &str) -> String {
    format!("aviation_weather_{}", icao.to_ascii_lowercase())
}

/// Build every sensor the observation has a value for.
pub fn build_sensors(obs: &DecodedObservation) -> Vec<SensorState> {
    let icao = obs.icao.as_str();
    let mut sensors = Vec::new();

    if let Some(t) = obs.temperature_c {
        sensors.push(
            SensorState::new(icao, "temperature", "Temperature", json!(t), "mdi:thermometer")
                .unit("°C")
                .class("temperature")
                .attr("temp_f", c_to_f(t)),
        );
    }

    if let Some(d) = obs.dewpoint_c {
        sensors.push(
            SensorState::new(icao, "dewpoint", "Dewpoint", json!(d), "mdi:water-thermometer")
                .unit("°C")
                .class("temperature")
                .attr("dewp_f", c_to_f(d)),
        );
    }

    if let Some(h) = obs.humidity_pct {
        sensors.push(
            SensorState::new(icao, "humidity", "Humidity", json!(h), "mdi:water-percent")
                .unit("%")
                .class("humidity"),
        );
    }

    if let Some(speed) = obs.wind.speed_kt {
        sensors.push(
            SensorState::new(icao, "wind_speed", "Wind Speed", json!(speed), "mdi:weather-windy")
                .unit("kt")
                .attr("wind_gust", obs.wind.gust_kt)
                .attr("wind_speed_kmh", kt_to_kmh(speed))
                .attr("description", obs.wind.describe()),
        );
    }

    if let Some(bearing) = obs.wind.direction_deg.filter(|_| !obs.wind.variable) {
        sensors.push(
            SensorState::new(icao, "wind_bearing", "Wind Direction", json!(bearing), "mdi:compass")
                .unit("°")
                .attr("cardinal", obs.wind.cardinal()),
        );
    }

    if let Some(p) = &obs.pressure {
        sensors.push(
            SensorState::new(icao, "pressure", "Pressure", json!(p.hpa()), "mdi:gauge")
                .unit("hPa")
                .class("atmospheric_pressure")
                .attr("altimeter_inhg", p.inhg())
                .attr("source_value", p.source_value())
                .attr("source_unit", json!(p.source_unit())),
        );
    }

    if let Some(vis) = obs.visibility_sm {
        sensors.push(
            SensorState::new(icao, "visibility", "Visibility", json!(sm_to_km(vis)), "mdi:eye")
                .unit("km")
                .attr("visibility_sm", vis),
        );
    }

    sensors.push(
        SensorState::new(
            icao,
            "flight_category",
            "Flight Category",
            json!(obs.flight_category.value),
            "mdi:airplane",
        )
        .attr("source", json!(obs.flight_category.source))
        .attr("ceiling_ft", obs.clouds.ceiling_ft),
    );

    if obs.weather.is_significant() {
        sensors.push(
            SensorState::new(
                icao,
                "condition",
                "Weather Condition",
                json!(obs.weather.summary()),
                "mdi:weather-partly-cloudy",
            )
            .attr("raw_wx", obs.weather_raw.clone()),
        );
    }

    if let Some(raw) = &obs.raw_text {
        let truncated: String = raw.chars().take(MAX_STATE_LEN).collect();
        sensors.push(
            SensorState::new(icao, "raw_metar", "Raw METAR", json!(truncated), "mdi:text")
                .attr("full_metar", raw.clone())
                .attr(
                    "observation_time",
                    obs.observed.as_ref().map(|t| t.utc_display.clone()),
                ),
        );
    }

    sensors
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use aerowx_weather::{decode_observation, LocalZone, RawMetar};

    fn observation(value: Value) -> DecodedObservation {
        let raw: RawMetar = serde_json::from_value(value).unwrap();
        decode_observation("KJFK", &raw, &LocalZone::Named(chrono_tz::UTC))
    }

    fn find<'a>(sensors: &'a [SensorState], key: &str) -> &'a SensorState {
        sensors.iter().find(|s| s.key == key).expect("sensor present")
    }

    #[test]
    fn test_full_sensor_set() {
        let obs = observation(json!({
            "icaoId": "KJFK", "obsTime": 1717253760, "rawOb": "METAR KJFK ...",
            "temp": 20, "dewp": 10, "wdir": 270, "wspd": 15, "wgst": 25,
            "visib": "10+", "altim": 29.92, "wxString": "-RA", "fltCat": "VFR"
        }));
        let sensors = build_sensors(&obs);

        let keys: Vec<_> = sensors.iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![
                "temperature", "dewpoint", "humidity", "wind_speed", "wind_bearing",
                "pressure", "visibility", "flight_category", "condition", "raw_metar"
            ]
        );

        let temp = find(&sensors, "temperature");
        assert_eq!(temp.entity_id(), "sensor.aviation_weather_kjfk_temperature");
        assert_eq!(temp.attributes["temp_f"], json!(68.0));

        let pressure = find(&sensors, "pressure");
        assert_eq!(pressure.state, json!(1013.2));
        assert_eq!(pressure.attributes["altimeter_inhg"], json!(29.92));

        let vis = find(&sensors, "visibility");
        assert_eq!(vis.state, json!(16.1));
        assert_eq!(find(&sensors, "condition").state, json!("Light Rain"));
    }

    #[test]
    fn test_hpa_altimeter_is_not_reconverted() {
        let obs = observation(json!({"icaoId": "EGLL", "altim": 1013}));
        let pressure = build_sensors(&obs)
            .into_iter()
            .find(|s| s.key == "pressure")
            .unwrap();
        assert_eq!(pressure.state, json!(1013.0));
        assert_eq!(pressure.attributes["source_value"], json!(1013.0));
    }

    #[test]
    fn test_pressure_keeps_reported_reading() {
        let obs = observation(json!({"icaoId": "KJFK", "altim": 29.92}));
        let pressure = build_sensors(&obs)
            .into_iter()
            .find(|s| s.key == "pressure")
            .unwrap();
        assert_eq!(pressure.attributes["source_value"], json!(29.92));
        assert_eq!(pressure.attributes["source_unit"], json!("inhg"));
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let obs = observation(json!({"icaoId": "KJFK", "wdir": "VRB", "wspd": 3}));
        let sensors = build_sensors(&obs);
        assert!(sensors.iter().all(|s| s.key != "temperature"));
        assert!(sensors.iter().all(|s| s.key != "wind_bearing"));
        assert!(sensors.iter().all(|s| s.key != "condition"));
        assert_eq!(find(&sensors, "flight_category").state, json!("VFR"));
    }

    #[test]
    fn test_raw_metar_state_is_truncated() {
        let long = "X".repeat(400);
        let obs = observation(json!({"icaoId": "KJFK", "rawOb": long}));
        let sensors = build_sensors(&obs);
        let raw = find(&sensors, "raw_metar");
        assert_eq!(raw.state_text().len(), MAX_STATE_LEN);
        assert_eq!(raw.attributes["full_metar"].as_str().unwrap().len(), 400);
    }

    #[test]
    fn test_platform_attributes_carry_metadata() {
        let obs = observation(json!({"icaoId": "KJFK", "temp": 5}));
        let attrs = build_sensors(&obs)[0].platform_attributes();
        assert_eq!(attrs["unit_of_measurement"], json!("°C"));
        assert_eq!(attrs["friendly_name"], json!("KJFK Temperature"));
    }
}
