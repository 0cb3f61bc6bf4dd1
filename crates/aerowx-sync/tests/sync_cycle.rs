//! End-to-end sync cycles against a mock upstream.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use aerowx_core::{SensorAirport, UpstreamConfig};
use aerowx_publish::{
    PublishError, PublishRouter, RegistrationSink, SensorPath, SensorState, WeatherEntity,
};
use aerowx_sync::{
    Fetcher, MinSpacingGate, RateGate, StepOutcome, SyncEngine, SyncSettings, WeatherCache,
};
use aerowx_weather::LocalZone;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upstream(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        ..UpstreamConfig::default()
    }
}

fn settings(airports: &[&str], include_taf: bool) -> SyncSettings {
    SyncSettings {
        airports: airports.iter().map(|a| a.to_string()).collect(),
        include_taf,
        zone: LocalZone::System,
    }
}

fn metar_body(icao: &str, temp: i64) -> serde_json::Value {
    json!([{
        "icaoId": icao,
        "name": "Test Field",
        "lat": 40.64,
        "lon": -73.78,
        "obsTime": 1_718_204_400,
        "rawOb": format!("{} 121500Z 27015G25KT 10SM FEW250 {}/10 A3001", icao, temp),
        "temp": temp,
        "dewp": 10,
        "wdir": 270,
        "wspd": 15,
        "wgst": 25,
        "visib": "10+",
        "altim": 1016.3,
        "clouds": [{"cover": "FEW", "base": 25000}]
    }])
}

fn taf_body(icao: &str) -> serde_json::Value {
    json!([{
        "icaoId": icao,
        "issueTime": "2024-06-12T17:20:00Z",
        "validTimeFrom": 1_718_215_200,
        "validTimeTo": 1_718_323_200,
        "rawTAF": format!("TAF {} 121720Z 1218/1318 27012KT P6SM SCT250", icao),
        "fcsts": [
            {"timeFrom": 1_718_215_200, "timeTo": 1_718_240_400, "wdir": 270, "wspd": 12,
             "visib": "6+", "clouds": [{"cover": "SCT", "base": 25000}]},
            {"timeFrom": 1_718_226_000, "timeTo": 1_718_233_200, "fcstChange": "TEMPO",
             "visib": null, "wxString": "-SHRA", "clouds": [{"cover": "SKC", "base": null}]}
        ]
    }])
}

/// Records when each upstream call is let through.
struct RecordingGate {
    inner: MinSpacingGate,
    stamps: Mutex<Vec<Instant>>,
}

#[async_trait]
impl RateGate for RecordingGate {
    async fn acquire(&self) {
        self.inner.acquire().await;
        self.stamps.lock().push(Instant::now());
    }
}

#[derive(Default)]
struct FakeRegistry {
    sensors: Mutex<Vec<String>>,
    weather: Mutex<Vec<String>>,
}

#[async_trait]
impl RegistrationSink for FakeRegistry {
    async fn register_sensors(&self, sensors: &[SensorState]) -> Result<usize, PublishError> {
        self.sensors.lock().extend(sensors.iter().map(|s| s.entity_id()));
        Ok(sensors.len())
    }

    async fn register_weather(&self, entity: &WeatherEntity) -> Result<(), PublishError> {
        self.weather.lock().push(entity.entity_id.clone());
        Ok(())
    }

    async fn home_location(&self) -> Result<Option<(f64, f64)>, PublishError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_record() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metar_body("KJFK", 21)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/metar"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("weather_cache.json");
    let fetcher = Fetcher::new(
        &upstream(&mock_server.uri()),
        Arc::new(MinSpacingGate::from_millis(0)),
    )
    .unwrap();
    let cache = WeatherCache::empty(&cache_path);
    let engine = SyncEngine::new(fetcher, cache, settings(&["KJFK"], false), None);

    let first = engine.run_cycle().await;
    assert_eq!(first.airport("KJFK").unwrap().metar, StepOutcome::Updated);
    let after_first = engine.reader().get("KJFK").unwrap();
    let on_disk_first = std::fs::read_to_string(&cache_path).unwrap();

    let second = engine.run_cycle().await;
    assert!(second.airport("KJFK").unwrap().metar.is_failed());
    assert_eq!(engine.reader().get("KJFK").unwrap(), after_first);
    assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), on_disk_first);
}

#[tokio::test]
async fn test_calls_are_spaced_across_airports_and_reports() {
    let mock_server = MockServer::start().await;
    for icao in ["KJFK", "KLGA", "KEWR"] {
        Mock::given(method("GET"))
            .and(path("/metar"))
            .and(query_param("ids", icao))
            .respond_with(ResponseTemplate::new(200).set_body_json(metar_body(icao, 20)))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/taf"))
            .and(query_param("ids", icao))
            .respond_with(ResponseTemplate::new(200).set_body_json(taf_body(icao)))
            .mount(&mock_server)
            .await;
    }

    // A configured spacing below the floor is raised to 700 ms.
    let config = UpstreamConfig {
        min_request_spacing_ms: 100,
        ..upstream(&mock_server.uri())
    };
    let gate = Arc::new(RecordingGate {
        inner: MinSpacingGate::for_upstream(&config),
        stamps: Mutex::new(Vec::new()),
    });
    let fetcher = Fetcher::new(&config, gate.clone()).unwrap();
    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(
        fetcher,
        WeatherCache::empty(dir.path().join("cache.json")),
        settings(&["KJFK", "KLGA", "KEWR"], true),
        None,
    );

    let report = engine.run_cycle().await;
    assert_eq!(report.updated_count(), 3);

    let stamps = gate.stamps.lock().clone();
    assert_eq!(stamps.len(), 6);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(700));
    }
}

#[tokio::test]
async fn test_forecast_without_observation() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/taf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(taf_body("KSFO")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(
        &upstream(&mock_server.uri()),
        Arc::new(MinSpacingGate::from_millis(0)),
    )
    .unwrap();
    let engine = SyncEngine::new(
        fetcher,
        WeatherCache::empty(dir.path().join("cache.json")),
        settings(&["KSFO"], true),
        None,
    );

    let report = engine.run_cycle().await;
    let outcome = report.airport("KSFO").unwrap();
    assert_eq!(outcome.metar, StepOutcome::NoData);
    assert_eq!(outcome.taf, StepOutcome::Updated);

    let record = engine.reader().get("KSFO").unwrap();
    assert!(record.observation.is_none());
    assert_eq!(record.forecast.len(), 2);
    // The TEMPO period has no visibility and a clear sky with no base.
    assert!(!record.forecast[1].summary.contains("Vis"));
}

#[tokio::test]
async fn test_updated_target_airport_is_published() {
    let mock_server = MockServer::start().await;
    for icao in ["KJFK", "KBOS"] {
        Mock::given(method("GET"))
            .and(path("/metar"))
            .and(query_param("ids", icao))
            .respond_with(ResponseTemplate::new(200).set_body_json(metar_body(icao, 18)))
            .mount(&mock_server)
            .await;
    }

    let registry = Arc::new(FakeRegistry::default());
    let router = PublishRouter::new(
        None,
        registry.clone(),
        SensorAirport::Code("KBOS".into()),
    );

    let dir = TempDir::new().unwrap();
    let fetcher = Fetcher::new(
        &upstream(&mock_server.uri()),
        Arc::new(MinSpacingGate::from_millis(0)),
    )
    .unwrap();
    let engine = SyncEngine::new(
        fetcher,
        WeatherCache::empty(dir.path().join("cache.json")),
        settings(&["KJFK", "KBOS"], false),
        Some(router),
    );

    let report = engine.run_cycle().await;
    assert!(report.airport("KJFK").unwrap().publish.is_none());

    let published = report.airport("KBOS").unwrap().publish.clone().unwrap();
    assert_eq!(published.sensors, SensorPath::Registration);
    assert!(published.weather_registered);

    assert_eq!(
        registry.weather.lock().clone(),
        vec!["weather.aviation_weather_kbos".to_string()]
    );
    assert!(registry
        .sensors
        .lock()
        .iter()
        .all(|id| id.starts_with("sensor.aviation_weather_kbos_")));
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metar_body("KJFK", 23)))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("weather_cache.json");
    let fetcher = Fetcher::new(
        &upstream(&mock_server.uri()),
        Arc::new(MinSpacingGate::from_millis(0)),
    )
    .unwrap();
    let cache = WeatherCache::load(&cache_path);
    let engine = SyncEngine::new(fetcher, cache, settings(&["KJFK"], false), None);
    engine.run_cycle().await;

    let restarted = WeatherCache::load(&cache_path);
    let record = restarted.get("KJFK").unwrap();
    let observation = record.observation.unwrap();
    assert_eq!(observation.temperature_c, Some(23.0));
    assert_eq!(observation.pressure.unwrap().hpa(), 1016.3);
    assert!(restarted.snapshot().last_update.is_some());
}
