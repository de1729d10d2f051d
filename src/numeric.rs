use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Parse a decimal that arrives either as a JSON string (the API's normal
/// shape) or as a bare JSON number. Anything else yields `None`.
pub fn parse_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(text) => parse_decimal_str(text),
        Value::Number(number) => parse_decimal_str(&number.to_string()),
        _ => None,
    }
}

/// Like [`parse_decimal`] but rejects negative values.
pub fn parse_non_negative(value: Option<&Value>) -> Option<Decimal> {
    parse_decimal(value).filter(|d| !d.is_sign_negative() || d.is_zero())
}

/// Defensive coercion used for display arithmetic: missing or unparsable
/// values count as zero. The flag reports whether a fallback happened.
pub fn decimal_or_zero(value: Option<&Value>) -> (Decimal, bool) {
    match parse_decimal(value) {
        Some(d) => (d, false),
        None => (Decimal::ZERO, true),
    }
}

pub fn parse_decimal_str(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// RFC 3339 / ISO-8601 timestamps as emitted by the API.
pub fn parse_timestamp(text: Option<&str>) -> Option<DateTime<Utc>> {
    let text = text?.trim();
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
