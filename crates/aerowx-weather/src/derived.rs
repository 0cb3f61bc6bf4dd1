//! Values computed from the raw observation: humidity, pressure in both
//! units, and unit conversions used by the publish sinks.

use serde::{Deserialize, Serialize};

pub const HPA_PER_INHG: f64 = 33.8639;

/// Altimeter readings above this are hectopascals, at or below are inHg.
const ALTIMETER_HPA_THRESHOLD: f64 = 60.0;

const MAGNUS_A: f64 = 17.625;
const MAGNUS_B: f64 = 243.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    Hpa,
    Inhg,
}

/// Station pressure in both units, tagged with the unit it was reported in.
///
/// Both representations are computed once at construction from the source
/// value. There is no conversion method, so a value already in one unit can
/// never be converted a second time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    source_unit: PressureUnit,
    source_value: f64,
    hpa: f64,
    inhg: f64,
}

impl Pressure {
    pub fn from_hpa(value: f64) -> Self {
        Self {
            source_unit: PressureUnit::Hpa,
            source_value: value,
            hpa: round_to(value, 1),
            inhg: round_to(value / HPA_PER_INHG, 2),
        }
    }

    pub fn from_inhg(value: f64) -> Self {
        Self {
            source_unit: PressureUnit::Inhg,
            source_value: value,
            hpa: round_to(value * HPA_PER_INHG, 1),
            inhg: round_to(value, 2),
        }
    }

    /// Interpret an altimeter setting whose unit the provider does not
    /// state. Readings above 60 are hPa, others inHg.
    pub fn from_altimeter_reading(value: f64) -> Self {
        if value > ALTIMETER_HPA_THRESHOLD {
            Self::from_hpa(value)
        } else {
            Self::from_inhg(value)
        }
    }

    pub fn source_unit(&self) -> PressureUnit {
        self.source_unit
    }

    pub fn source_value(&self) -> f64 {
        self.source_value
    }

    pub fn hpa(&self) -> f64 {
        self.hpa
    }

    pub fn inhg(&self) -> f64 {
        self.inhg
    }
}

/// Relative humidity (%) from temperature and dewpoint in °C, Magnus formula.
pub fn relative_humidity(temp_c: f64, dewpoint_c: f64) -> Option<f64> {
    if !temp_c.is_finite() || !dewpoint_c.is_finite() {
        return None;
    }
    let gamma = |t: f64| (MAGNUS_A * t) / (MAGNUS_B + t);
    let rh = 100.0 * (gamma(dewpoint_c) - gamma(temp_c)).exp();
    rh.is_finite().then(|| round_to(rh.clamp(0.0, 100.0), 1))
}

pub fn c_to_f(c: f64) -> f64 {
    round_to(c * 9.0 / 5.0 + 32.0, 1)
}

pub fn kt_to_kmh(kt: f64) -> f64 {
    round_to(kt * 1.852, 1)
}

pub fn sm_to_km(sm: f64) -> f64 {
    round_to(sm * 1.60934, 1)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inhg_source_reads_stable_hpa() {
        let p = Pressure::from_inhg(29.92);
        let first = p.hpa();
        let second = p.hpa();
        assert_eq!(first, second);
        assert_eq!(first, 1013.2);
        assert_eq!(p.inhg(), 29.92);
        assert_eq!(p.source_unit(), PressureUnit::Inhg);
    }

    #[test]
    fn test_hpa_source_is_not_reconverted() {
        let p = Pressure::from_hpa(1013.25);
        assert_eq!(p.hpa(), 1013.3);
        assert_eq!(p.inhg(), 29.92);
        assert_eq!(p.source_value(), 1013.25);
    }

    #[test]
    fn test_altimeter_heuristic_picks_unit_by_magnitude() {
        assert_eq!(Pressure::from_altimeter_reading(1018.0).source_unit(), PressureUnit::Hpa);
        assert_eq!(Pressure::from_altimeter_reading(30.05).source_unit(), PressureUnit::Inhg);
        assert_eq!(Pressure::from_altimeter_reading(1018.0).hpa(), 1018.0);
    }

    #[test]
    fn test_serialized_pressure_round_trips_without_conversion() {
        let p = Pressure::from_inhg(30.01);
        let json = serde_json::to_string(&p).unwrap_or_default();
        let back: Option<Pressure> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(p));
    }

    #[test]
    fn test_humidity_saturated_when_equal() {
        assert_eq!(relative_humidity(15.0, 15.0), Some(100.0));
    }

    #[test]
    fn test_humidity_typical_value() {
        let rh = relative_humidity(20.0, 10.0).unwrap_or_default();
        assert!((rh - 52.5).abs() < 0.5, "rh = {rh}");
    }

    #[test]
    fn test_humidity_is_clamped() {
        // Dewpoint above temperature happens with bad sensor data.
        assert_eq!(relative_humidity(10.0, 12.0), Some(100.0));
        assert_eq!(relative_humidity(f64::NAN, 1.0), None);
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(c_to_f(0.0), 32.0);
        assert_eq!(c_to_f(-40.0), -40.0);
        assert_eq!(kt_to_kmh(10.0), 18.5);
        assert_eq!(sm_to_km(10.0), 16.1);
    }
}
