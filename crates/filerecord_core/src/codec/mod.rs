//! Line-oriented record file format.
//!
//! # Responsibility
//! - Encode attributes as `fieldName:"escaped"` lines in schema order.
//! - Decode such text back into an ordered, type-unaware field mapping.
//!
//! # Invariants
//! - Absent and blank values (empty string, `0`, `0.0`) are not written.
//! - `decode(encode(attrs))` yields every written value verbatim.
//! - Blank lines are ignored on decode.

pub mod escape;

pub use escape::{escape, unescape, EscapeError};

use crate::model::attributes::Attributes;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Decoded field name / string value pairs, in file order.
pub type DecodedFields = Vec<(String, String)>;

/// Record text that does not follow the line format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A non-blank line has no `:` separator.
    MissingSeparator { line: usize },
    /// The value after the separator is not a valid escaped string.
    InvalidValue {
        line: usize,
        field: String,
        reason: EscapeError,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator { line } => {
                write!(f, "line {line}: expected `fieldName:\"value\"`")
            }
            Self::InvalidValue {
                line,
                field,
                reason,
            } => write!(f, "line {line}: invalid value for field `{field}`: {reason}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingSeparator { .. } => None,
            Self::InvalidValue { reason, .. } => Some(reason),
        }
    }
}

/// Serializes every present, non-blank attribute, one line per field.
pub fn encode(attributes: &Attributes) -> String {
    let mut out = String::new();
    for (name, value) in attributes.iter() {
        let Some(value) = value.filter(|value| !value.is_blank()) else {
            continue;
        };
        out.push_str(name);
        out.push(':');
        out.push_str(&escape(&value.to_text()));
        out.push('\n');
    }
    out
}

/// Parses record text into `(field, value)` pairs.
///
/// The field name is everything before the first `:`; the value is the
/// unescaped remainder. Field names are not checked against any schema.
pub fn decode(text: &str) -> Result<DecodedFields, CodecError> {
    let mut fields = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;
        let (name, payload) = line
            .split_once(':')
            .ok_or(CodecError::MissingSeparator { line: line_no })?;
        let value = unescape(payload).map_err(|reason| CodecError::InvalidValue {
            line: line_no,
            field: name.to_string(),
            reason,
        })?;
        fields.push((name.to_string(), value));
    }
    Ok(fields)
}
