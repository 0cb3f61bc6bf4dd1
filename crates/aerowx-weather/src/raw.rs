//! Upstream report shapes, as served by the aviation weather data API.
//!
//! Every field is kept as a loose JSON value; the decoders in this crate
//! decide what each one means. Alternate field names used by older API
//! versions are separate fields so that a report carrying both still parses.

use serde::Deserialize;
use serde_json::Value;

/// One METAR observation (`/metar?format=json` array element).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetar {
    pub icao_id: Option<Value>,
    pub name: Option<Value>,
    pub lat: Option<Value>,
    pub lon: Option<Value>,
    pub elev: Option<Value>,
    pub obs_time: Option<Value>,
    pub raw_ob: Option<Value>,
    pub temp: Option<Value>,
    pub dewp: Option<Value>,
    pub wdir: Option<Value>,
    pub wspd: Option<Value>,
    pub wgst: Option<Value>,
    pub visib: Option<Value>,
    pub altim: Option<Value>,
    pub press: Option<Value>,
    pub wx_string: Option<Value>,
    pub cover: Option<Value>,
    pub clouds: Option<Value>,
    pub flt_cat: Option<Value>,
    pub flight_category: Option<Value>,
}

/// One TAF bulletin (`/taf?format=json` array element).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaf {
    pub icao_id: Option<Value>,
    pub issue_time: Option<Value>,
    pub valid_time_from: Option<Value>,
    pub valid_time_to: Option<Value>,
    #[serde(rename = "rawTAF")]
    pub raw_taf: Option<Value>,
    pub fcsts: Option<Value>,
    pub forecast: Option<Value>,
}

/// One forecast period inside a TAF.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForecastPeriod {
    pub time_from: Option<Value>,
    pub time_to: Option<Value>,
    pub valid_time_from: Option<Value>,
    pub valid_time_to: Option<Value>,
    pub fcst_change: Option<Value>,
    pub fcst_type: Option<Value>,
    pub probability: Option<Value>,
    pub wdir: Option<Value>,
    pub wspd: Option<Value>,
    pub wgst: Option<Value>,
    pub visib: Option<Value>,
    pub wx_string: Option<Value>,
    pub clouds: Option<Value>,
}

/// One element of a detailed `clouds` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCloud {
    pub cover: Option<Value>,
    pub base: Option<Value>,
    #[serde(rename = "type")]
    pub cloud_type: Option<Value>,
}

impl RawMetar {
    /// Upstream flight category under either of its field names.
    pub fn upstream_category(&self) -> Option<&Value> {
        let present = |v: &&Value| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        };
        self.flt_cat
            .as_ref()
            .filter(present)
            .or(self.flight_category.as_ref())
    }
}

impl RawTaf {
    /// Forecast periods, tolerating either field name and skipping elements
    /// that are not objects.
    pub fn periods(&self) -> Vec<RawForecastPeriod> {
        let list = match (&self.fcsts, &self.forecast) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => return Vec::new(),
        };

        list.iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(period) => Some(period),
                Err(e) => {
                    tracing::debug!("Skipping unreadable TAF period: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Detailed cloud layers, or an empty list when the field is not an array.
pub fn raw_clouds(value: Option<&Value>) -> Vec<RawCloud> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metar_tolerates_mixed_types_and_nulls() {
        let raw: RawMetar = serde_json::from_value(json!({
            "icaoId": "KSFO",
            "temp": 14.4,
            "visib": "10+",
            "wdir": "VRB",
            "wgst": null,
            "fltCat": "VFR",
            "flightCategory": "IFR"
        }))
        .unwrap();

        assert_eq!(raw.visib, Some(json!("10+")));
        assert!(raw.wgst.is_none());
        assert_eq!(raw.upstream_category(), Some(&json!("VFR")));
    }

    #[test]
    fn test_blank_flt_cat_falls_back_to_flight_category() {
        for blank in [json!(""), json!("  "), Value::Null] {
            let raw: RawMetar = serde_json::from_value(json!({
                "icaoId": "KSFO",
                "fltCat": blank,
                "flightCategory": "IFR"
            }))
            .unwrap();
            assert_eq!(raw.upstream_category(), Some(&json!("IFR")));
        }
    }

    #[test]
    fn test_taf_reads_either_period_field() {
        let current: RawTaf = serde_json::from_value(json!({
            "fcsts": [{"timeFrom": 1}, {"timeFrom": 2}]
        }))
        .unwrap();
        let legacy: RawTaf = serde_json::from_value(json!({
            "forecast": [{"timeFrom": 1}]
        }))
        .unwrap();
        let neither: RawTaf = serde_json::from_value(json!({"fcsts": null})).unwrap();

        assert_eq!(current.periods().len(), 2);
        assert_eq!(legacy.periods().len(), 1);
        assert!(neither.periods().is_empty());
    }

    #[test]
    fn test_raw_clouds_ignores_non_arrays() {
        assert!(raw_clouds(Some(&json!("OVC"))).is_empty());
        let layers = raw_clouds(Some(&json!([{"cover": "BKN", "base": 2500}])));
        assert_eq!(layers.len(), 1);
    }
}
