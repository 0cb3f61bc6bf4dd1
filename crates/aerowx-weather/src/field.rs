//! Defensive decoding of individual upstream JSON fields.
//!
//! The provider mixes numbers, numeric strings, nulls and absent keys for the
//! same field across reports. Every accessor here returns a value or a
//! `MalformedField`; callers degrade the field to absent and keep going.

use serde_json::Value;
use thiserror::Error;

/// A single field could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed field `{field}`: {reason}")]
pub struct MalformedField {
    pub field: &'static str,
    pub reason: String,
}

impl MalformedField {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn absent(field: &'static str) -> Self {
        Self::new(field, "absent")
    }

    pub fn is_absent(&self) -> bool {
        self.reason == "absent"
    }
}

/// Turn a field result into an option, logging real decode failures.
pub fn degrade<T>(result: Result<T, MalformedField>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) if e.is_absent() => None,
        Err(e) => {
            tracing::debug!("{}", e);
            None
        }
    }
}

/// Numeric value, accepting JSON numbers and numeric strings.
pub fn number(field: &'static str, value: Option<&Value>) -> Result<f64, MalformedField> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(MalformedField::absent(field)),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => {
            return Err(MalformedField::new(
                field,
                format!("expected a number, got {}", other),
            ))
        }
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(MalformedField::new(
            field,
            format!("not a finite number: {}", value.map(Value::to_string).unwrap_or_default()),
        )),
    }
}

/// Integral value, rejecting fractional numbers.
pub fn integer(field: &'static str, value: Option<&Value>) -> Result<i64, MalformedField> {
    match value {
        None | Some(Value::Null) => Err(MalformedField::absent(field)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| MalformedField::new(field, format!("not an integer: {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| MalformedField::new(field, format!("not an integer: {:?}", s))),
        Some(other) => Err(MalformedField::new(
            field,
            format!("expected an integer, got {}", other),
        )),
    }
}

/// Non-empty trimmed text. Numbers are rendered as text.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
