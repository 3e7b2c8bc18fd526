use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};

/// A single typed cell.
///
/// Equality is strict: two values are equal only when both the variant and
/// the content match, so `Integer(5)`, `Float(5.0)` and `Text("5")` are all
/// different. `Empty` equals only `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                // keep a trailing ".0" so floats never render like integers
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Types a raw cell the way a spreadsheet would: each cell independently,
/// falling back to text when nothing else matches.
///
/// Numbers are only typed when the typed value holds exactly what the cell
/// says. Integers beyond `i64` and decimals with more precision than an
/// `f64` carries stay text, so two different source values never load as
/// the same number.
pub fn infer_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Empty;
    }
    if is_integer_literal(raw) {
        return match parse_integer(raw) {
            Some(integer) => Value::Integer(integer),
            None => Value::Text(raw.to_string()),
        };
    }
    if let Some(float) = parse_float(raw) {
        return Value::Float(float);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(datetime) = parse_naive_datetime(raw) {
        return Value::DateTime(datetime);
    }
    if let Ok(date) = parse_naive_date(raw) {
        return Value::Date(date);
    }
    Value::Text(raw.to_string())
}

/// Keeps every non-empty cell as text.
pub fn raw_value(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Empty
    } else {
        Value::Text(raw.to_string())
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(raw: &str) -> Option<i64> {
    if !is_integer_literal(raw) {
        return None;
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    // leading zeros mark identifiers such as postal codes
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    let numeric = raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !numeric || !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = raw.parse::<f64>().ok().filter(|value| value.is_finite())?;
    let written = normalize_decimal(raw)?;
    let stored = normalize_decimal(&format!("{value:e}"))?;
    (written == stored).then_some(value)
}

/// Sign, significant digits and decimal point position of a decimal literal.
///
/// `"1.50"`, `"15e-1"` and `"0.0015e3"` all normalize to `(false, "15", 1)`.
fn normalize_decimal(literal: &str) -> Option<(bool, String, i64)> {
    let (negative, unsigned) = match literal.as_bytes().first()? {
        b'-' => (true, &literal[1..]),
        b'+' => (false, &literal[1..]),
        _ => (false, literal),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => (&unsigned[..idx], unsigned[idx + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{whole}{fraction}");
    let significant = digits.trim_start_matches('0');
    let point = (whole.len() as i64)
        .saturating_add(exponent)
        .saturating_sub((digits.len() - significant.len()) as i64);
    let significant = significant.trim_end_matches('0');
    if significant.is_empty() {
        return Some((negative, String::new(), 0));
    }
    Some((negative, significant.to_string(), point))
}
