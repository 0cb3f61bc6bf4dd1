//! Wind direction, speed and gust decoding, including variable (VRB) winds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{self, degrade};

const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub direction_deg: Option<u16>,
    pub variable: bool,
    pub speed_kt: Option<f64>,
    pub gust_kt: Option<f64>,
}

impl Wind {
    /// Decode `wdir`, `wspd` and `wgst`. Direction may be degrees or `VRB`.
    pub fn decode(wdir: Option<&Value>, wspd: Option<&Value>, wgst: Option<&Value>) -> Self {
        let variable = matches!(
            field::text(wdir).as_deref().map(str::to_ascii_uppercase).as_deref(),
            Some("VRB")
        );
        let direction_deg = if variable {
            None
        } else {
            degrade(field::number("wdir", wdir))
                .filter(|d| (0.0..=360.0).contains(d))
                .map(|d| d.round() as u16)
        };

        Self {
            direction_deg,
            variable,
            speed_kt: degrade(field::number("wspd", wspd)).filter(|s| *s >= 0.0),
            gust_kt: degrade(field::number("wgst", wgst)).filter(|g| *g > 0.0),
        }
    }

    pub fn is_variable(&self) -> bool {
        self.variable || matches!(self.direction_deg, None | Some(0))
    }

    pub fn cardinal(&self) -> Option<&'static str> {
        if self.is_variable() {
            return None;
        }
        self.direction_deg.map(cardinal)
    }

    /// `270° (W) at 15 kt gusting 25 kt`, or `VRB at 3 kt`.
    /// `None` when no speed was reported.
    pub fn describe(&self) -> Option<String> {
        let speed = self.speed_kt?;
        let mut text = match (self.is_variable(), self.direction_deg) {
            (false, Some(deg)) => format!("{}° ({}) at {} kt", deg, cardinal(deg), fmt_num(speed)),
            _ => format!("VRB at {} kt", fmt_num(speed)),
        };
        if let Some(gust) = self.gust_kt {
            text.push_str(&format!(" gusting {} kt", fmt_num(gust)));
        }
        Some(text)
    }
}

/// 16-point compass name for a bearing in degrees.
pub fn cardinal(deg: u16) -> &'static str {
    let ix = ((f64::from(deg % 360) / 22.5) + 0.5) as usize % 16;
    CARDINALS[ix]
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}
