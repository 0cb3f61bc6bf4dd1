//! TAF forecast decoding.

use serde::{Deserialize, Serialize};

use crate::category::FlightCategory;
use crate::clouds::{decode_clouds, CloudLayers};
use crate::field::{self, degrade};
use crate::raw::{RawForecastPeriod, RawTaf};
use crate::time::{parse_instant, LocalZone, ObservationTime};
use crate::visibility::decode_visibility;
use crate::wind::Wind;
use crate::wx::{decode_weather, WeatherPhenomena};

/// Upper bound on periods kept per forecast, earliest first.
pub const MAX_FORECAST_PERIODS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChangeType {
    Base,
    From,
    Becoming,
    Temporary,
    Probability(u8),
    ProbabilityTemporary(u8),
    Other(String),
}

impl ChangeType {
    fn decode(change: Option<String>, probability: Option<u8>) -> Self {
        let change = change.map(|c| c.to_ascii_uppercase());
        match (change.as_deref(), probability) {
            (None, None) => ChangeType::Base,
            (None, Some(p)) | (Some("PROB"), Some(p)) => ChangeType::Probability(p),
            (Some("FM" | "FROM"), _) => ChangeType::From,
            (Some("BECMG"), _) => ChangeType::Becoming,
            (Some("TEMPO"), Some(p)) => ChangeType::ProbabilityTemporary(p),
            (Some("TEMPO"), None) => ChangeType::Temporary,
            (Some(other), _) => ChangeType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ChangeType::Base => "Base".to_string(),
            ChangeType::From => "FROM".to_string(),
            ChangeType::Becoming => "BECMG".to_string(),
            ChangeType::Temporary => "TEMPO".to_string(),
            ChangeType::Probability(p) => format!("PROB{}", p),
            ChangeType::ProbabilityTemporary(p) => format!("PROB{} TEMPO", p),
            ChangeType::Other(code) => code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub change: ChangeType,
    pub valid_from: Option<ObservationTime>,
    pub valid_to: Option<ObservationTime>,
    pub wind: Wind,
    pub visibility_sm: Option<f64>,
    /// Visibility as reported, e.g. `6+ SM`.
    pub visibility_text: Option<String>,
    pub weather: WeatherPhenomena,
    pub weather_raw: Option<String>,
    pub clouds: CloudLayers,
    /// Category for this period alone. Absent when the period carries
    /// neither visibility nor clouds.
    pub flight_category: Option<FlightCategory>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TafHeader {
    pub raw_text: Option<String>,
    pub issued: Option<ObservationTime>,
    pub valid_from: Option<ObservationTime>,
    pub valid_to: Option<ObservationTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TafReport {
    pub header: TafHeader,
    pub periods: Vec<ForecastPeriod>,
}

/// Decode a TAF into a header and at most [`MAX_FORECAST_PERIODS`]
/// periods in ascending order of validity start.
pub fn decode_taf(raw: &RawTaf, zone: &LocalZone) -> TafReport {
    let header = TafHeader {
        raw_text: field::text(raw.raw_taf.as_ref()),
        issued: degrade(parse_instant("issueTime", raw.issue_time.as_ref(), zone)),
        valid_from: degrade(parse_instant("validTimeFrom", raw.valid_time_from.as_ref(), zone)),
        valid_to: degrade(parse_instant("validTimeTo", raw.valid_time_to.as_ref(), zone)),
    };

    let raw_periods = raw.periods();
    if raw_periods.is_empty() {
        tracing::debug!("TAF carries no forecast periods");
    }

    let mut periods: Vec<ForecastPeriod> = raw_periods
        .iter()
        .map(|p| decode_period(p, zone))
        .collect();

    // Stable sort, periods without a start keep their order after the rest.
    periods.sort_by_key(|p| (p.valid_from.is_none(), p.valid_from.as_ref().map(|t| t.epoch)));
    periods.truncate(MAX_FORECAST_PERIODS);

    TafReport { header, periods }
}

fn decode_period(raw: &RawForecastPeriod, zone: &LocalZone) -> ForecastPeriod {
    let valid_from = degrade(parse_instant(
        "timeFrom",
        raw.time_from.as_ref().or(raw.valid_time_from.as_ref()),
        zone,
    ));
    let valid_to = degrade(parse_instant(
        "timeTo",
        raw.time_to.as_ref().or(raw.valid_time_to.as_ref()),
        zone,
    ));

    let change_code =
        field::text(raw.fcst_change.as_ref()).or_else(|| field::text(raw.fcst_type.as_ref()));
    let probability = degrade(field::integer("probability", raw.probability.as_ref()))
        .and_then(|p| u8::try_from(p).ok())
        .filter(|p| *p <= 100);
    let change = ChangeType::decode(change_code, probability);

    let visibility_sm = degrade(decode_visibility(raw.visib.as_ref()));
    let visibility_text = field::text(raw.visib.as_ref()).map(|v| format!("{} SM", v));
    let weather_raw = field::text(raw.wx_string.as_ref());
    let clouds = decode_clouds(raw.clouds.as_ref(), None);
    let flight_category = (visibility_sm.is_some() || !clouds.is_empty())
        .then(|| FlightCategory::compute(visibility_sm, clouds.ceiling_ft));

    let mut period = ForecastPeriod {
        change,
        valid_from,
        valid_to,
        wind: Wind::decode(raw.wdir.as_ref(), raw.wspd.as_ref(), raw.wgst.as_ref()),
        visibility_sm,
        visibility_text,
        weather: decode_weather(weather_raw.as_deref()),
        weather_raw,
        clouds,
        flight_category,
        summary: String::new(),
    };
    period.summary = summarize(&period);
    period
}

/// One-line human summary. Clauses whose value is missing are left out.
fn summarize(period: &ForecastPeriod) -> String {
    let mut parts = Vec::new();

    if let (Some(from), Some(to)) = (&period.valid_from, &period.valid_to) {
        parts.push(format!("{}–{}", from.local_short, to.local_short));
    }
    parts.push(period.change.label());
    if let Some(wind) = period.wind.describe() {
        parts.push(format!("Wind {}", wind));
    }
    if let Some(vis) = &period.visibility_text {
        parts.push(format!("Vis {}", vis));
    }
    if period.weather.is_significant() {
        parts.push(period.weather.summary());
    }

    let clouds: Vec<String> = period
        .clouds
        .layers
        .iter()
        .take(2)
        .map(|layer| {
            let mut text = layer.cover_text.clone();
            if let Some(alt) = layer.altitude_agl() {
                text.push_str(&format!(" @ {}", alt));
            }
            if let Some(kind) = &layer.cloud_type {
                text.push_str(&format!(" ({})", kind));
            }
            text
        })
        .collect();
    if !clouds.is_empty() {
        parts.push(format!("Clouds: {}", clouds.join(", ")));
    }

    parts.join("; ")
}
