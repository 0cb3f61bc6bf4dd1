//! Present-weather token decoding (`-SHRA`, `+TSRA`, `VCFG`, ...).

use serde::{Deserialize, Serialize};

const DESCRIPTORS: &[(&str, &str)] = &[
    ("MI", "Shallow"),
    ("PR", "Partial"),
    ("BC", "Patches"),
    ("DR", "Low Drifting"),
    ("BL", "Blowing"),
    ("SH", "Shower(s)"),
    ("TS", "Thunderstorm"),
    ("FZ", "Freezing"),
];

const PHENOMENA: &[(&str, &str)] = &[
    ("DZ", "Drizzle"),
    ("RA", "Rain"),
    ("SN", "Snow"),
    ("SG", "Snow Grains"),
    ("IC", "Ice Crystals"),
    ("PL", "Ice Pellets"),
    ("GR", "Hail"),
    ("GS", "Small Hail"),
    ("UP", "Unknown Precipitation"),
    ("BR", "Mist"),
    ("FG", "Fog"),
    ("FU", "Smoke"),
    ("VA", "Volcanic Ash"),
    ("DU", "Dust"),
    ("SA", "Sand"),
    ("HZ", "Haze"),
    ("PY", "Spray"),
    ("PO", "Dust Whirls"),
    ("SQ", "Squalls"),
    ("FC", "Funnel Cloud"),
    ("SS", "Sandstorm"),
    ("DS", "Duststorm"),
];

/// One decoded token. Unrecognized tokens keep their code as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedToken {
    pub code: String,
    pub text: String,
    pub recognized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeatherPhenomena {
    NoSignificantWeather,
    Reported { tokens: Vec<DecodedToken> },
}

impl WeatherPhenomena {
    /// Human-readable form, tokens joined with commas.
    pub fn summary(&self) -> String {
        match self {
            WeatherPhenomena::NoSignificantWeather => "No significant weather".to_string(),
            WeatherPhenomena::Reported { tokens } => tokens
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, WeatherPhenomena::Reported { .. })
    }
}

/// Decode a whitespace-delimited present-weather string.
pub fn decode_weather(input: Option<&str>) -> WeatherPhenomena {
    let tokens: Vec<DecodedToken> = input
        .unwrap_or_default()
        .split_whitespace()
        .filter(|t| *t != "NSW")
        .map(decode_token)
        .collect();

    if tokens.is_empty() {
        WeatherPhenomena::NoSignificantWeather
    } else {
        WeatherPhenomena::Reported { tokens }
    }
}

fn decode_token(code: &str) -> DecodedToken {
    match describe(code) {
        Some(text) => DecodedToken {
            code: code.to_string(),
            text,
            recognized: true,
        },
        None => DecodedToken {
            code: code.to_string(),
            text: code.to_string(),
            recognized: false,
        },
    }
}

fn lookup<'a>(table: &'a [(&str, &str)], rest: &str) -> Option<(&'a str, usize)> {
    table
        .iter()
        .find(|(code, _)| rest.starts_with(code))
        .map(|(code, text)| (*text, code.len()))
}

fn describe(token: &str) -> Option<String> {
    let mut words = Vec::new();
    let mut rest = token;

    if let Some(r) = rest.strip_prefix('-') {
        words.push("Light");
        rest = r;
    } else if let Some(r) = rest.strip_prefix('+') {
        words.push("Heavy");
        rest = r;
    }

    let vicinity = match rest.strip_prefix("VC") {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };

    let mut matched = false;
    if let Some((text, len)) = lookup(DESCRIPTORS, rest) {
        words.push(text);
        rest = &rest[len..];
        matched = true;
    }

    while let Some((text, len)) = lookup(PHENOMENA, rest) {
        words.push(text);
        rest = &rest[len..];
        matched = true;
    }

    if !matched || !rest.is_empty() {
        return None;
    }

    let mut phrase = words.join(" ");
    if vicinity {
        phrase.push_str(" in Vicinity");
    }
    Some(phrase)
}
