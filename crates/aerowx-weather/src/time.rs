//! Observation and forecast instants in UTC, local and short display form.

use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{self, MalformedField};

/// Zone used for the local representations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalZone {
    /// The host's local zone.
    #[default]
    System,
    Named(Tz),
}

impl LocalZone {
    pub fn from_option(tz: Option<Tz>) -> Self {
        tz.map_or(LocalZone::System, LocalZone::Named)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationTime {
    pub epoch: i64,
    pub utc: DateTime<Utc>,
    /// `2024-06-01 14:56 UTC`
    pub utc_display: String,
    /// `2024-06-01 10:56 EDT`
    pub local: String,
    /// `06/01 10:56`
    pub local_short: String,
    pub local_iso: String,
}

impl ObservationTime {
    pub fn from_utc(utc: DateTime<Utc>, zone: &LocalZone) -> Self {
        let (local, local_short, local_iso) = match zone {
            LocalZone::System => render(&utc.with_timezone(&Local)),
            LocalZone::Named(tz) => render(&utc.with_timezone(tz)),
        };

        Self {
            epoch: utc.timestamp(),
            utc,
            utc_display: utc.format("%Y-%m-%d %H:%M UTC").to_string(),
            local,
            local_short,
            local_iso,
        }
    }

    pub fn from_epoch(
        field: &'static str,
        epoch: i64,
        zone: &LocalZone,
    ) -> Result<Self, MalformedField> {
        let utc = Utc
            .timestamp_opt(epoch, 0)
            .single()
            .ok_or_else(|| MalformedField::new(field, format!("epoch out of range: {}", epoch)))?;
        Ok(Self::from_utc(utc, zone))
    }
}

fn render<Z: TimeZone>(dt: &DateTime<Z>) -> (String, String, String)
where
    Z::Offset: std::fmt::Display,
{
    (
        dt.format("%Y-%m-%d %H:%M %Z").to_string(),
        dt.format("%m/%d %H:%M").to_string(),
        dt.to_rfc3339(),
    )
}

/// Decode an integer epoch-seconds field. Fractional or non-numeric values
/// are malformed.
pub fn decode_epoch(
    field_name: &'static str,
    value: Option<&Value>,
    zone: &LocalZone,
) -> Result<ObservationTime, MalformedField> {
    let epoch = field::integer(field_name, value)?;
    ObservationTime::from_epoch(field_name, epoch, zone)
}

/// Decode an instant given either as epoch seconds or as an RFC 3339 string
/// (TAF issue times use the latter).
pub fn parse_instant(
    field_name: &'static str,
    value: Option<&Value>,
    zone: &LocalZone,
) -> Result<ObservationTime, MalformedField> {
    if let Ok(epoch) = field::integer(field_name, value) {
        return ObservationTime::from_epoch(field_name, epoch, zone);
    }

    let text = field::text(value).ok_or_else(|| match value {
        None | Some(Value::Null) => MalformedField::absent(field_name),
        Some(other) => MalformedField::new(field_name, format!("not a timestamp: {}", other)),
    })?;

    let parsed = DateTime::parse_from_rfc3339(&text)
        .or_else(|_| DateTime::parse_from_rfc3339(&text.replace(' ', "T")))
        .map_err(|e| MalformedField::new(field_name, format!("{:?}: {}", text, e)))?;

    Ok(ObservationTime::from_utc(parsed.with_timezone(&Utc), zone))
}
