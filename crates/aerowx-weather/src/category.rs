//! Flight category (VFR / MVFR / IFR / LIFR).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightCategory {
    Vfr,
    Mvfr,
    Ifr,
    Lifr,
}

impl FlightCategory {
    /// Compute the category from visibility (statute miles) and ceiling (feet).
    ///
    /// An absent value places no constraint. Bands are tested most severe
    /// first, so boundary values fall into the more severe band.
    pub fn compute(visibility_sm: Option<f64>, ceiling_ft: Option<u32>) -> Self {
        let vis = visibility_sm.unwrap_or(f64::INFINITY);
        let ceil = ceiling_ft.unwrap_or(u32::MAX);

        if vis < 1.0 || ceil < 500 {
            FlightCategory::Lifr
        } else if vis < 3.0 || ceil < 1000 {
            FlightCategory::Ifr
        } else if vis <= 5.0 || ceil <= 3000 {
            FlightCategory::Mvfr
        } else {
            FlightCategory::Vfr
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightCategory::Vfr => "VFR",
            FlightCategory::Mvfr => "MVFR",
            FlightCategory::Ifr => "IFR",
            FlightCategory::Lifr => "LIFR",
        }
    }
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Upstream,
    Computed,
}

/// The single authoritative category for a record and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCategory {
    pub value: String,
    pub source: CategorySource,
}

/// Upstream category wins when present and non-empty, unchanged.
pub fn resolve_category(
    upstream: Option<&Value>,
    visibility_sm: Option<f64>,
    ceiling_ft: Option<u32>,
) -> ResolvedCategory {
    match field::text(upstream) {
        Some(value) => ResolvedCategory {
            value,
            source: CategorySource::Upstream,
        },
        None => ResolvedCategory {
            value: FlightCategory::compute(visibility_sm, ceiling_ft).to_string(),
            source: CategorySource::Computed,
        },
    }
}
