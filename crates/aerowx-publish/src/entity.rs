//! Weather entity payload: current conditions plus forecast.

use serde::Serialize;
use serde_json::{json, Map, Value};

use aerowx_weather::derived::{kt_to_kmh, sm_to_km};
use aerowx_weather::{AirportRecord, ForecastPeriod, MAX_FORECAST_PERIODS};

use crate::condition::Condition;
use crate::sensors::object_base;

const ATTRIBUTION: &str = "Data provided by Aviation Weather Center";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherEntity {
    #[serde(skip)]
    pub entity_id: String,
    pub state: Condition,
    pub attributes: Map<String, Value>,
}

/// Build the entity for an airport. Returns `None` until an observation
/// has been decoded for it.
pub fn build_weather_entity(record: &AirportRecord) -> Option<WeatherEntity> {
    let obs = record.observation.as_ref()?;
    let icao = obs.icao.as_str();
    let category = obs.flight_category.value.as_str();
    let state = Condition::from_metar(obs.weather_raw.as_deref(), Some(category));

    let mut attrs = Map::new();
    let mut put = |key: &str, value: Value| {
        if !value.is_null() {
            attrs.insert(key.to_string(), value);
        }
    };

    put("friendly_name", json!(format!("{} Aviation Weather", icao)));
    put("attribution", json!(ATTRIBUTION));
    put("station", json!(icao));
    put("station_name", json!(obs.station_name));

    if let Some(t) = obs.temperature_c {
        put("temperature", json!(t));
        put("temperature_unit", json!("°C"));
    }
    put("humidity", json!(obs.humidity_pct));
    if let Some(p) = &obs.pressure {
        put("pressure", json!(p.hpa()));
        put("pressure_unit", json!("hPa"));
    }
    if let Some(speed) = obs.wind.speed_kt {
        put("wind_speed", json!(kt_to_kmh(speed)));
        put("wind_speed_unit", json!("km/h"));
        put("wind_speed_kt", json!(speed));
    }
    put("wind_gust_speed", json!(obs.wind.gust_kt.map(kt_to_kmh)));
    if !obs.wind.variable {
        put("wind_bearing", json!(obs.wind.direction_deg));
    }
    if let Some(vis) = obs.visibility_sm {
        put("visibility", json!(sm_to_km(vis)));
        put("visibility_unit", json!("km"));
        put("visibility_sm", json!(vis));
    }
    put("cloud_coverage", json!(obs.clouds.coverage_percent()));
    put("dew_point", json!(obs.dewpoint_c));
    put("flight_category", json!(category));
    put("raw_metar", json!(obs.raw_text.clone().unwrap_or_default()));
    if obs.weather.is_significant() {
        put("weather_decoded", json!(obs.weather.summary()));
    }
    if !obs.clouds.is_empty() {
        put("cloud_layers", json!(obs.clouds.phrases()));
    }
    if let Some(t) = &obs.observed {
        put("observation_time", json!(t.utc_display));
        put("observation_time_local", json!(t.local));
    }
    if let Some(taf) = &record.taf {
        put("raw_taf", json!(taf.raw_text));
    }

    let forecast: Vec<Value> = record
        .forecast
        .iter()
        .take(MAX_FORECAST_PERIODS)
        .map(forecast_entry)
        .collect();
    if !forecast.is_empty() {
        put("forecast", Value::Array(forecast));
    }

    Some(WeatherEntity {
        entity_id: format!("weather.{}", object_base(icao)),
        state,
        attributes: attrs,
    })
}

fn forecast_entry(period: &ForecastPeriod) -> Value {
    let category = period.flight_category.map(|c| c.as_str());
    let mut entry = Map::new();

    entry.insert(
        "datetime".into(),
        json!(period.valid_from.as_ref().map(|t| t.utc.to_rfc3339())),
    );
    entry.insert(
        "condition".into(),
        json!(Condition::from_metar(period.weather_raw.as_deref(), category)),
    );
    entry.insert("change".into(), json!(period.change.label()));
    if let Some(speed) = period.wind.speed_kt {
        entry.insert("wind_speed".into(), json!(kt_to_kmh(speed)));
    }
    if let Some(gust) = period.wind.gust_kt {
        entry.insert("wind_gust_speed".into(), json!(kt_to_kmh(gust)));
    }
    if let Some(bearing) = period.wind.direction_deg.filter(|_| !period.wind.is_variable()) {
        entry.insert("wind_bearing".into(), json!(bearing));
    }
    if let Some(vis) = period.visibility_sm {
        entry.insert("visibility".into(), json!(sm_to_km(vis)));
    }
    entry.insert("summary".into(), json!(period.summary));

    Value::Object(entry)
}
