//! Assembly of a decoded observation from a raw METAR.

use serde::{Deserialize, Serialize};

use crate::category::{resolve_category, ResolvedCategory};
use crate::clouds::{decode_clouds, CloudLayers};
use crate::derived::{relative_humidity, round_to, Pressure};
use crate::field::{self, degrade};
use crate::raw::RawMetar;
use crate::time::{decode_epoch, LocalZone, ObservationTime};
use crate::visibility::decode_visibility;
use crate::wind::Wind;
use crate::wx::{decode_weather, WeatherPhenomena};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedObservation {
    pub icao: String,
    pub station_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_m: Option<f64>,
    pub raw_text: Option<String>,
    pub observed: Option<ObservationTime>,
    pub temperature_c: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind: Wind,
    pub visibility_sm: Option<f64>,
    pub pressure: Option<Pressure>,
    pub weather: WeatherPhenomena,
    pub weather_raw: Option<String>,
    pub clouds: CloudLayers,
    pub flight_category: ResolvedCategory,
}

/// Decode one METAR. Individual field failures leave that field empty.
pub fn decode_observation(icao: &str, raw: &RawMetar, zone: &LocalZone) -> DecodedObservation {
    let temperature_c = degrade(field::number("temp", raw.temp.as_ref()));
    let dewpoint_c = degrade(field::number("dewp", raw.dewp.as_ref()));
    let humidity_pct = match (temperature_c, dewpoint_c) {
        (Some(t), Some(d)) => relative_humidity(t, d),
        _ => None,
    };

    let visibility_sm = degrade(decode_visibility(raw.visib.as_ref()));
    let clouds = decode_clouds(raw.clouds.as_ref(), raw.cover.as_ref());
    let flight_category =
        resolve_category(raw.upstream_category(), visibility_sm, clouds.ceiling_ft);

    let pressure = degrade(field::number("altim", raw.altim.as_ref()))
        .map(Pressure::from_altimeter_reading)
        .or_else(|| degrade(field::number("press", raw.press.as_ref())).map(Pressure::from_hpa));

    let weather_raw = field::text(raw.wx_string.as_ref());

    DecodedObservation {
        icao: field::text(raw.icao_id.as_ref())
            .map(|s| s.to_ascii_uppercase())
            .unwrap_or_else(|| icao.to_ascii_uppercase()),
        station_name: field::text(raw.name.as_ref()),
        latitude: degrade(field::number("lat", raw.lat.as_ref())),
        longitude: degrade(field::number("lon", raw.lon.as_ref())),
        elevation_m: degrade(field::number("elev", raw.elev.as_ref())),
        raw_text: field::text(raw.raw_ob.as_ref()),
        observed: degrade(decode_epoch("obsTime", raw.obs_time.as_ref(), zone)),
        temperature_c: temperature_c.map(|t| round_to(t, 1)),
        dewpoint_c: dewpoint_c.map(|d| round_to(d, 1)),
        humidity_pct,
        wind: Wind::decode(raw.wdir.as_ref(), raw.wspd.as_ref(), raw.wgst.as_ref()),
        visibility_sm,
        pressure,
        weather: decode_weather(weather_raw.as_deref()),
        weather_raw,
        clouds,
        flight_category,
    }
}

impl DecodedObservation {
    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}
