//! Sky condition decoding and ceiling derivation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{self, degrade};
use crate::raw::{raw_clouds, RawCloud};

/// Cover codes, readable text and okta detail.
const COVERS: &[(&str, &str, &str)] = &[
    ("SKC", "Sky Clear", "0/8 (0%)"),
    ("CLR", "Clear", "0/8 (0%)"),
    ("NSC", "No Significant Clouds", "0/8 (0%)"),
    ("CAVOK", "Ceiling and Visibility OK", "0/8 (0%)"),
    ("FEW", "Few", "1-2/8 (12-25%)"),
    ("SCT", "Scattered", "3-4/8 (37-50%)"),
    ("BKN", "Broken", "5-7/8 (62-87%)"),
    ("OVC", "Overcast", "8/8 (100%)"),
    ("VV", "Vertical Visibility", "Sky Obscured"),
];

const CLOUD_TYPES: &[(&str, &str)] = &[
    ("CB", "Cumulonimbus"),
    ("TCU", "Towering Cumulus"),
    ("CI", "Cirrus"),
    ("CC", "Cirrocumulus"),
    ("CS", "Cirrostratus"),
    ("AC", "Altocumulus"),
    ("AS", "Altostratus"),
    ("NS", "Nimbostratus"),
    ("SC", "Stratocumulus"),
    ("ST", "Stratus"),
    ("CU", "Cumulus"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    pub cover: String,
    pub cover_text: String,
    pub coverage_detail: String,
    /// Base in feet above ground level. Absent for clear-sky codes.
    pub base_ft: Option<u32>,
    pub cloud_type: Option<String>,
    pub cloud_type_code: Option<String>,
}

impl CloudLayer {
    fn new(cover: &str, base_ft: Option<u32>, type_code: Option<String>) -> Self {
        let cover = cover.trim().to_ascii_uppercase();
        let (cover_text, coverage_detail) = COVERS
            .iter()
            .find(|(code, _, _)| *code == cover)
            .map(|(_, text, detail)| (text.to_string(), detail.to_string()))
            .unwrap_or_else(|| (cover.clone(), String::new()));

        let cloud_type = type_code.as_deref().map(|code| {
            CLOUD_TYPES
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| code.to_string())
        });

        Self {
            cover,
            cover_text,
            coverage_detail,
            base_ft,
            cloud_type,
            cloud_type_code: type_code,
        }
    }

    pub fn is_ceiling(&self) -> bool {
        matches!(self.cover.as_str(), "BKN" | "OVC")
    }

    /// Altitude text, e.g. `2,500 ft AGL`.
    pub fn altitude_agl(&self) -> Option<String> {
        self.base_ft.map(|ft| format!("{} ft AGL", thousands(ft)))
    }

    /// `Broken at 2,500 ft AGL (Cumulonimbus)`, or just the cover text when
    /// the layer has no base.
    pub fn phrase(&self) -> String {
        let mut out = self.cover_text.clone();
        if let Some(alt) = self.altitude_agl() {
            out.push_str(" at ");
            out.push_str(&alt);
        }
        if let Some(kind) = &self.cloud_type {
            out.push_str(&format!(" ({})", kind));
        }
        out
    }

    /// Approximate sky coverage in percent.
    pub fn coverage_percent(&self) -> Option<u8> {
        match self.cover.as_str() {
            "SKC" | "CLR" | "NSC" | "CAVOK" => Some(0),
            "FEW" => Some(25),
            "SCT" => Some(50),
            "BKN" => Some(75),
            "OVC" | "VV" => Some(100),
            _ => None,
        }
    }
}

/// Decoded sky condition, lowest layer first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudLayers {
    pub layers: Vec<CloudLayer>,
    pub ceiling_ft: Option<u32>,
}

impl CloudLayers {
    pub fn phrases(&self) -> Vec<String> {
        self.layers.iter().map(CloudLayer::phrase).collect()
    }

    /// Highest coverage across all layers.
    pub fn coverage_percent(&self) -> Option<u8> {
        self.layers.iter().filter_map(CloudLayer::coverage_percent).max()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Decode the detailed `clouds` array, falling back to the general `cover`
/// field only when the array is missing or empty.
pub fn decode_clouds(detailed: Option<&Value>, general_cover: Option<&Value>) -> CloudLayers {
    let raw = raw_clouds(detailed);
    let mut layers: Vec<CloudLayer> = if raw.is_empty() {
        field::text(general_cover)
            .map(|cover| cover.to_ascii_uppercase())
            .filter(|cover| COVERS.iter().any(|(code, _, _)| code == cover))
            .map(|cover| vec![CloudLayer::new(&cover, None, None)])
            .unwrap_or_default()
    } else {
        raw.iter().filter_map(decode_layer).collect()
    };

    layers.sort_by_key(|l| l.base_ft);

    let ceiling_ft = layers
        .iter()
        .filter(|l| l.is_ceiling())
        .filter_map(|l| l.base_ft)
        .min();

    CloudLayers { layers, ceiling_ft }
}

fn decode_layer(raw: &RawCloud) -> Option<CloudLayer> {
    let cover = field::text(raw.cover.as_ref())?;
    let base_ft = degrade(field::number("clouds.base", raw.base.as_ref()))
        .filter(|b| *b >= 0.0)
        .map(|b| b.round() as u32);
    let type_code = field::text(raw.cloud_type.as_ref()).map(|t| t.to_ascii_uppercase());
    Some(CloudLayer::new(&cover, base_ft, type_code))
}

fn thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
