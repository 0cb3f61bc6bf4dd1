//! Visibility normalisation to statute miles.

use serde_json::Value;

use crate::field::MalformedField;

const FIELD: &str = "visib";

/// Parse a visibility token such as `"10+"`, `"3"`, `"1 1/2SM"`, `"P6SM"`
/// or `"1/4"` into statute miles.
///
/// The numeric prefix is read and any trailing suffix is ignored.
pub fn parse_visibility(input: &str) -> Result<f64, MalformedField> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix('P')
        .or_else(|| trimmed.strip_prefix('M'))
        .unwrap_or(trimmed);

    let prefix_len = body
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '/' || c == ' '))
        .unwrap_or(body.len());
    let prefix = body[..prefix_len].trim();

    if prefix.is_empty() {
        return Err(MalformedField::new(
            FIELD,
            format!("no numeric prefix in {:?}", input),
        ));
    }

    let mut total = 0.0;
    for part in prefix.split_whitespace() {
        total += parse_component(part).ok_or_else(|| {
            MalformedField::new(FIELD, format!("unreadable visibility {:?}", input))
        })?;
    }

    if total.is_finite() && total >= 0.0 {
        Ok(total)
    } else {
        Err(MalformedField::new(
            FIELD,
            format!("out of range visibility {:?}", input),
        ))
    }
}

fn parse_component(part: &str) -> Option<f64> {
    match part.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => part.parse().ok(),
    }
}

/// Decode the upstream `visib` field, which may be a number or a string.
pub fn decode_visibility(value: Option<&Value>) -> Result<f64, MalformedField> {
    match value {
        None | Some(Value::Null) => Err(MalformedField::absent(FIELD)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(MalformedField::new(FIELD, format!("out of range {}", n))),
        },
        Some(Value::String(s)) => parse_visibility(s),
        Some(other) => Err(MalformedField::new(
            FIELD,
            format!("unexpected visibility {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plus_suffix_is_stripped() {
        assert_eq!(parse_visibility("10+").unwrap(), 10.0);
    }

    #[test]
    fn test_plain_number() {
        assert_eq!(parse_visibility("3").unwrap(), 3.0);
        assert_eq!(parse_visibility(" 0.25 ").unwrap(), 0.25);
    }

    #[test]
    fn test_empty_is_malformed() {
        let err = parse_visibility("").unwrap_err();
        assert_eq!(err.field, "visib");
        assert!(!err.is_absent());
    }

    #[test]
    fn test_text_without_digits_is_malformed() {
        assert!(parse_visibility("unknown").is_err());
    }

    #[test]
    fn test_fractions_and_mixed_numbers() {
        assert_eq!(parse_visibility("1/2").unwrap(), 0.5);
        assert_eq!(parse_visibility("1 1/2SM").unwrap(), 1.5);
        assert!(parse_visibility("1/0").is_err());
    }

    #[test]
    fn test_greater_and_less_than_markers() {
        assert_eq!(parse_visibility("P6SM").unwrap(), 6.0);
        assert_eq!(parse_visibility("M1/4SM").unwrap(), 0.25);
    }

    #[test]
    fn test_decode_accepts_json_numbers() {
        assert_eq!(decode_visibility(Some(&json!(7))).unwrap(), 7.0);
        assert_eq!(decode_visibility(Some(&json!("10+"))).unwrap(), 10.0);
        assert!(decode_visibility(None).unwrap_err().is_absent());
        assert!(decode_visibility(Some(&json!(-1.0))).is_err());
    }
}
