//! Lenient conversion of raw input into declared field types.
//!
//! # Invariants
//! - Coercion never fails: malformed numbers become `0` / `0.0`.
//! - Absent input stays absent.

use super::value::{format_float, FieldValue, RawValue};
use crate::schema::FieldType;

/// Coerces `raw` into `field_type`; `None` in, `None` out.
pub fn coerce(raw: Option<&RawValue>, field_type: FieldType) -> Option<FieldValue> {
    let raw = raw?;
    Some(match field_type {
        FieldType::String => FieldValue::Text(text_of(raw)),
        FieldType::Integer => FieldValue::Integer(integer_of(raw)),
        FieldType::Float => FieldValue::Float(float_of(raw)),
    })
}

fn text_of(raw: &RawValue) -> String {
    match raw {
        RawValue::Bool(value) => value.to_string(),
        RawValue::Integer(value) => value.to_string(),
        RawValue::Float(value) => format_float(*value),
        RawValue::Text(value) => value.clone(),
    }
}

fn integer_of(raw: &RawValue) -> i64 {
    match raw {
        RawValue::Bool(value) => i64::from(*value),
        RawValue::Integer(value) => *value,
        // `as` truncates toward zero, saturates at the bounds and maps NaN to 0.
        RawValue::Float(value) => *value as i64,
        RawValue::Text(value) => parse_leading_int(value),
    }
}

fn float_of(raw: &RawValue) -> f64 {
    match raw {
        RawValue::Bool(value) => f64::from(u8::from(*value)),
        RawValue::Integer(value) => *value as f64,
        RawValue::Float(value) => *value,
        RawValue::Text(value) => parse_leading_float(value),
    }
}

/// Parses the leading integer of `text` (`" -12abc"` -> `-12`), else `0`.
///
/// Single underscores between digits are accepted; results saturate at the
/// `i64` bounds.
pub fn parse_leading_int(text: &str) -> i64 {
    let bytes = text.trim_start().as_bytes();
    let (negative, start) = match bytes.first() {
        Some(b'-') => (true, 1),
        Some(b'+') => (false, 1),
        _ => (false, 0),
    };
    let mut digits = String::new();
    scan_digits(bytes, start, &mut digits);

    digits.bytes().fold(0_i64, |acc, digit| {
        let digit = i64::from(digit - b'0');
        if negative {
            acc.saturating_mul(10).saturating_sub(digit)
        } else {
            acc.saturating_mul(10).saturating_add(digit)
        }
    })
}

/// Parses the leading decimal number of `text` (`"1.5e3x"` -> `1500.0`),
/// else `0.0`.
///
/// The exact tokens written for non-finite floats (`inf`, `-inf`, `NaN`)
/// parse back to their values.
pub fn parse_leading_float(text: &str) -> f64 {
    match text.trim() {
        "inf" | "+inf" => return f64::INFINITY,
        "-inf" => return f64::NEG_INFINITY,
        "NaN" => return f64::NAN,
        _ => {}
    }
    let bytes = text.trim_start().as_bytes();
    let mut literal = String::new();
    let mut idx = 0;
    if let Some(&sign @ (b'+' | b'-')) = bytes.first() {
        literal.push(char::from(sign));
        idx = 1;
    }

    let int_end = scan_digits(bytes, idx, &mut literal);
    let mut has_mantissa = int_end > idx;
    idx = int_end;

    if bytes.get(idx) == Some(&b'.') && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit) {
        if !has_mantissa {
            literal.push('0');
        }
        literal.push('.');
        idx = scan_digits(bytes, idx + 1, &mut literal);
        has_mantissa = true;
    }
    if !has_mantissa {
        return 0.0;
    }

    if matches!(bytes.get(idx), Some(b'e' | b'E')) {
        let mut exponent = String::from("e");
        let mut exp_start = idx + 1;
        if let Some(&sign @ (b'+' | b'-')) = bytes.get(exp_start) {
            exponent.push(char::from(sign));
            exp_start += 1;
        }
        if scan_digits(bytes, exp_start, &mut exponent) > exp_start {
            literal.push_str(&exponent);
        }
    }

    literal.parse::<f64>().unwrap_or(0.0)
}

/// Copies ASCII digits starting at `start` into `out`, skipping single
/// underscores between digits. Returns the index after the last consumed byte.
fn scan_digits(bytes: &[u8], start: usize, out: &mut String) -> usize {
    let mut idx = start;
    while let Some(&byte) = bytes.get(idx) {
        if byte.is_ascii_digit() {
            out.push(char::from(byte));
            idx += 1;
        } else if byte == b'_'
            && idx > start
            && bytes[idx - 1].is_ascii_digit()
            && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit)
        {
            idx += 1;
        } else {
            break;
        }
    }
    idx
}
