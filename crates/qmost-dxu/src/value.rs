//! FITS header values: the literals a DXU definition fixes, and their
//! card representation.

use core::cmp::Ordering;
use core::fmt;
use core::str;

/// A FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// Integer above `i64::MAX`, e.g. the `TZEROn` offset of `uint64` columns.
    Unsigned(u64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
    /// Keyword present with an empty value field; used for template cards
    /// whose value is filled in later.
    Undefined,
}

impl Value {
    /// Convert a YAML scalar from a definition file.
    ///
    /// Returns `None` for mappings, sequences, tagged values and null.
    pub fn from_yaml(node: &serde_yaml::Value) -> Option<Value> {
        match node {
            serde_yaml::Value::Bool(b) => Some(Value::Logical(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Value::Unsigned(u))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_yaml::Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Unsigned(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Exact view of an integer value of either signedness.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Integer(n) => Some(i128::from(*n)),
            Value::Unsigned(n) => Some(i128::from(*n)),
            _ => None,
        }
    }

    /// Numeric ordering. Two integers compare exactly; anything involving
    /// a float compares as `f64`. `None` for non-numbers and NaN.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl fmt::Display for Value {
    /// Human-readable rendering used in documentation tables.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Logical(b) => f.write_str(if *b { "T" } else { "F" }),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Unsigned(n) => write!(f, "{n}"),
            Value::Float(v) => f.write_str(&format_float_short(*v)),
            Value::String(s) => f.write_str(s),
            Value::Undefined => Ok(()),
        }
    }
}

/// Shortest float text that still reads back as a float (`1.0`, not `1`).
fn format_float_short(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

// ── Parsing ──

/// Split a value field at the ` /` comment separator.
fn split_comment(field: &[u8]) -> (&[u8], Option<&str>) {
    let len = field.len();
    let mut i = 0;
    while i + 1 < len {
        if field[i] == b' ' && field[i + 1] == b'/' {
            let mut comment_start = i + 2;
            if comment_start < len && field[comment_start] == b' ' {
                comment_start += 1;
            }
            let comment = str::from_utf8(&field[comment_start..])
                .ok()
                .map(|s| s.trim_end());
            return (&field[..i], comment.filter(|s| !s.is_empty()));
        }
        i += 1;
    }
    (field, None)
}

/// Parse a quoted string starting at byte 0; `''` is a literal quote.
fn parse_string(field: &[u8]) -> Option<(Value, Option<&str>)> {
    let mut value = String::new();
    let mut i = 1;
    let len = field.len();

    while i < len {
        if field[i] == b'\'' {
            if i + 1 < len && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            value.push(field[i] as char);
            i += 1;
        }
    }

    let (_, comment) = split_comment(&field[i.min(len)..]);
    Some((Value::String(value.trim_end().to_string()), comment))
}

/// Parse the 70-byte value portion of a card (bytes 10..80).
///
/// An all-blank value field (optionally followed by a comment) parses as
/// [`Value::Undefined`].
pub fn parse_value(value_bytes: &[u8]) -> Option<(Value, Option<&str>)> {
    let first = value_bytes.iter().position(|&b| b != b' ')?;
    if value_bytes[first] == b'\'' {
        return parse_string(&value_bytes[first..]);
    }
    if value_bytes[first] == b'/' {
        let text = str::from_utf8(&value_bytes[first + 1..]).ok()?.trim();
        return Some((Value::Undefined, Some(text).filter(|s| !s.is_empty())));
    }

    let (val_part, comment) = split_comment(value_bytes);
    let text = str::from_utf8(val_part).ok()?.trim();
    if text.is_empty() {
        return Some((Value::Undefined, comment));
    }

    let value = match text {
        "T" => Value::Logical(true),
        "F" => Value::Logical(false),
        _ if !text.contains(['.', 'E', 'e', 'D', 'd']) => {
            if let Ok(n) = text.parse::<i64>() {
                Value::Integer(n)
            } else {
                Value::Unsigned(text.parse::<u64>().ok()?)
            }
        }
        _ => Value::Float(text.replace(['D', 'd'], "E").parse::<f64>().ok()?),
    };
    Some((value, comment))
}

// ── Formatting ──

/// Serialize a [`Value`] into the 70-byte field of bytes 10..80 of a card.
///
/// Numeric and logical values are right-justified in the first 20 bytes
/// (columns 11-30 of the card). String values start with a single quote
/// and are padded to at least 8 characters.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];

    match value {
        Value::Logical(b) => buf[19] = if *b { b'T' } else { b'F' },
        Value::Integer(n) => right_justify(n.to_string().as_bytes(), &mut buf[..20]),
        Value::Unsigned(n) => right_justify(n.to_string().as_bytes(), &mut buf[..20]),
        Value::Float(f) => right_justify(format_float(*f).as_bytes(), &mut buf[..20]),
        Value::String(s) => write_string(s, &mut buf),
        Value::Undefined => {}
    }

    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..start + len].copy_from_slice(&src[..len]);
}

/// Fixed-format float that fits in 20 columns.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    let short = format_float_short(f);
    if short.len() <= 20 && short.parse::<f64>().ok() == Some(f) {
        return short;
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.chars() {
        if pos >= 69 {
            break;
        }
        // headers are printable ASCII only
        let ch = if matches!(ch, ' '..='~') { ch as u8 } else { b'?' };
        if ch == b'\'' {
            if pos + 1 >= 69 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            buf[pos] = ch;
            pos += 1;
        }
    }

    // Closing quote no earlier than index 9 (8 characters of content).
    pos = pos.max(9);
    buf[pos] = b'\'';
}
