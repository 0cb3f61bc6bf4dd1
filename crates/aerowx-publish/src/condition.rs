//! Home-automation weather condition derived from METAR data.

use serde::{Deserialize, Serialize};

/// Condition values understood by the platform's weather entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    LightningRainy,
    Lightning,
    SnowyRainy,
    Snowy,
    Hail,
    Pouring,
    Rainy,
    Fog,
    Cloudy,
    Partlycloudy,
    #[default]
    Sunny,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LightningRainy => "lightning-rainy",
            Self::Lightning => "lightning",
            Self::SnowyRainy => "snowy-rainy",
            Self::Snowy => "snowy",
            Self::Hail => "hail",
            Self::Pouring => "pouring",
            Self::Rainy => "rainy",
            Self::Fog => "fog",
            Self::Cloudy => "cloudy",
            Self::Partlycloudy => "partlycloudy",
            Self::Sunny => "sunny",
        }
    }

    /// Map a raw present-weather string and flight category to a condition.
    ///
    /// Phenomena win over the category; without any the category decides
    /// how overcast it is.
    pub fn from_metar(weather_raw: Option<&str>, flight_category: Option<&str>) -> Self {
        let wx = weather_raw.unwrap_or_default().trim().to_ascii_uppercase();
        let has = |code: &str| wx.contains(code);

        if !wx.is_empty() {
            if has("TS") {
                return if has("RA") { Self::LightningRainy } else { Self::Lightning };
            }
            if has("SN") || has("SG") || has("IC") {
                return if has("RA") { Self::SnowyRainy } else { Self::Snowy };
            }
            if has("PL") || has("GR") || has("GS") {
                return Self::Hail;
            }
            if has("+RA") || has("SHRA") {
                return Self::Pouring;
            }
            if has("RA") || has("DZ") {
                return Self::Rainy;
            }
            if has("FG") || has("BR") {
                return Self::Fog;
            }
        }

        match flight_category {
            Some("IFR" | "LIFR") => Self::Cloudy,
            Some("MVFR") => Self::Partlycloudy,
            _ => Self::Sunny,
        }
    }
}
