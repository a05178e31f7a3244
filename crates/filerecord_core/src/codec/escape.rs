//! Reversible double-quoted string escaping.
//!
//! Escaped payloads never contain a raw control character, so one field
//! always occupies exactly one line.

use std::error::Error;
use std::fmt::{Display, Formatter, Write};

/// Reasons a quoted payload cannot be unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    /// The payload is not wrapped in double quotes.
    Unquoted,
    /// A `"` appears inside the payload without a backslash.
    UnescapedQuote,
    /// The payload ends in the middle of an escape sequence.
    UnterminatedEscape,
    UnknownEscape(char),
    /// `\x` / `\u` escape with missing or malformed hex digits.
    InvalidHex,
    InvalidCodepoint(u32),
    /// `\x` byte escapes do not form valid UTF-8.
    InvalidUtf8,
}

impl Display for EscapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unquoted => write!(f, "value is not a quoted string"),
            Self::UnescapedQuote => write!(f, "unescaped quote inside value"),
            Self::UnterminatedEscape => write!(f, "unterminated escape sequence"),
            Self::UnknownEscape(c) => write!(f, "unknown escape sequence `\\{c}`"),
            Self::InvalidHex => write!(f, "malformed hex escape"),
            Self::InvalidCodepoint(value) => write!(f, "invalid code point U+{value:X}"),
            Self::InvalidUtf8 => write!(f, "byte escapes do not form valid UTF-8"),
        }
    }
}

impl Error for EscapeError {}

/// Wraps `value` in double quotes, escaping quotes, backslashes and control
/// characters.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{0c}' => out.push_str("\\f"),
            '\u{0b}' => out.push_str("\\v"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{1b}' => out.push_str("\\e"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02X}", u32::from(c));
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:X}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Exact inverse of [`escape`].
///
/// Also accepts `\#`, `\s`, `\0`, `\uHHHH` and multi-byte `\xHH` sequences.
pub fn unescape(payload: &str) -> Result<String, EscapeError> {
    let inner = payload
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or(EscapeError::Unquoted)?;

    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or(EscapeError::UnterminatedEscape)?;
                match escaped {
                    '\\' | '"' | '#' => push_char(&mut out, escaped),
                    'n' => out.push(b'\n'),
                    't' => out.push(b'\t'),
                    'r' => out.push(b'\r'),
                    'f' => out.push(0x0c),
                    'v' => out.push(0x0b),
                    'a' => out.push(0x07),
                    'b' => out.push(0x08),
                    'e' => out.push(0x1b),
                    's' => out.push(b' '),
                    '0' => out.push(0),
                    'x' => {
                        let digits = take_hex(&mut chars, 2);
                        let byte =
                            u8::from_str_radix(&digits, 16).map_err(|_| EscapeError::InvalidHex)?;
                        out.push(byte);
                    }
                    'u' => {
                        let value = read_unicode_escape(&mut chars)?;
                        let decoded =
                            char::from_u32(value).ok_or(EscapeError::InvalidCodepoint(value))?;
                        push_char(&mut out, decoded);
                    }
                    other => return Err(EscapeError::UnknownEscape(other)),
                }
            }
            '"' => return Err(EscapeError::UnescapedQuote),
            other => push_char(&mut out, other),
        }
    }

    String::from_utf8(out).map_err(|_| EscapeError::InvalidUtf8)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0_u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Reads `HHHH` or `{H..}` after a `\u`.
fn read_unicode_escape(chars: &mut std::str::Chars<'_>) -> Result<u32, EscapeError> {
    let braced = chars.clone().next() == Some('{');
    let digits = if braced {
        chars.next();
        let digits = take_hex(chars, 6);
        if chars.next() != Some('}') {
            return Err(EscapeError::InvalidHex);
        }
        digits
    } else {
        let digits = take_hex(chars, 4);
        if digits.len() != 4 {
            return Err(EscapeError::InvalidHex);
        }
        digits
    };
    u32::from_str_radix(&digits, 16).map_err(|_| EscapeError::InvalidHex)
}

/// Consumes up to `max` hex digits.
fn take_hex(chars: &mut std::str::Chars<'_>, max: usize) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.clone().next() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(c);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}
