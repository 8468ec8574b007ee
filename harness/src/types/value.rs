//! Strict runtime values and their two encodings.
//!
//! A `Value` is the natively-typed form handed to the strictly-typed write
//! entry points. Each value has:
//!
//! - a tagged binary form (one type tag byte followed by a little-endian
//!   payload) used in record value buffers;
//! - an untagged binary form used inside tablet columns, where the type is
//!   fixed per column;
//! - a canonical string literal, parsed by the server on the inferred entry
//!   points.
//!
//! # Literal grammar
//!
//! ```text
//! BOOLEAN          true | false
//! INT32            -?[0-9]+
//! INT64/TIMESTAMP  -?[0-9]+L
//! FLOAT            decimal F          e.g. 1.01F
//! DOUBLE           decimal with '.' or exponent, no suffix
//! TEXT             '...'   ('' escapes a quote)
//! STRING           "..."   ("" escapes a quote)
//! BLOB             X'<hex>'
//! DATE             YYYY-MM-DD
//! ```
//!
//! The grammars do not overlap, so a literal also identifies its type.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::types::SemanticType;

/// A natively-typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    String(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
}

/// Errors that can occur when decoding a binary value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The buffer ended before the value did.
    Truncated,
    /// The type tag is not a known `SemanticType`.
    UnknownTag(u8),
    /// A text payload was not valid UTF-8.
    InvalidUtf8,
    /// An encoded date does not name a calendar day.
    InvalidDate(i32),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "value buffer truncated"),
            Self::UnknownTag(tag) => write!(f, "unknown value tag: {tag:#04x}"),
            Self::InvalidUtf8 => write!(f, "text value is not valid UTF-8"),
            Self::InvalidDate(raw) => write!(f, "invalid encoded date: {raw}"),
        }
    }
}

impl std::error::Error for ValueError {}

/// A literal that is not valid under the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub declared: SemanticType,
    pub literal: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a valid {} literal",
            self.literal, self.declared
        )
    }
}

impl std::error::Error for LiteralError {}

/// A value whose runtime representation does not match its column's
/// declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeViolation {
    pub column: String,
    pub declared: SemanticType,
    pub actual: SemanticType,
}

impl fmt::Display for TypeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}' is declared {} but the value is {}",
            self.column, self.declared, self.actual
        )
    }
}

impl std::error::Error for TypeViolation {}

impl Value {
    /// The type tag owning this value's representation.
    #[must_use]
    pub const fn representation(&self) -> SemanticType {
        match self {
            Self::Boolean(_) => SemanticType::Boolean,
            Self::Int32(_) => SemanticType::Int32,
            Self::Int64(_) => SemanticType::Int64,
            Self::Float32(_) => SemanticType::Float32,
            Self::Float64(_) => SemanticType::Float64,
            Self::Text(_) => SemanticType::Text,
            Self::String(_) => SemanticType::String,
            Self::Blob(_) => SemanticType::Blob,
            Self::Date(_) => SemanticType::Date,
        }
    }

    /// Whether this value is a valid instance of `declared`.
    #[must_use]
    pub fn matches(&self, declared: SemanticType) -> bool {
        self.representation() == declared.representation()
    }

    /// Check this value against a column declaration.
    pub fn check(&self, column: &str, declared: SemanticType) -> Result<(), TypeViolation> {
        if self.matches(declared) {
            Ok(())
        } else {
            Err(TypeViolation {
                column: column.to_string(),
                declared,
                actual: self.representation(),
            })
        }
    }

    // =========================================================================
    // Literals
    // =========================================================================

    /// Render the canonical literal for this value.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Int32(n) => n.to_string(),
            Self::Int64(n) => format!("{n}L"),
            Self::Float32(x) => format!("{x:?}F"),
            Self::Float64(x) => format!("{x:?}"),
            Self::Text(s) => quote(s, '\''),
            Self::String(s) => quote(s, '"'),
            Self::Blob(bytes) => format!("X'{}'", hex::encode(bytes)),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Parse a literal under a declared type.
    pub fn parse_literal(declared: SemanticType, literal: &str) -> Result<Self, LiteralError> {
        parse_literal_inner(declared, literal).ok_or_else(|| LiteralError {
            declared,
            literal: literal.to_string(),
        })
    }

    /// Identify the type of a literal and parse it.
    ///
    /// Returns `None` if the literal matches no grammar.
    #[must_use]
    pub fn infer_literal(literal: &str) -> Option<(SemanticType, Self)> {
        SemanticType::MATRIX
            .into_iter()
            .find_map(|ty| parse_literal_inner(ty, literal).map(|value| (ty, value)))
    }

    // =========================================================================
    // Binary encoding
    // =========================================================================

    /// Size of the tagged encoding.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        1 + self.untagged_size()
    }

    fn untagged_size(&self) -> usize {
        match self {
            Self::Boolean(_) => 1,
            Self::Int32(_) | Self::Float32(_) | Self::Date(_) => 4,
            Self::Int64(_) | Self::Float64(_) => 8,
            Self::Text(s) | Self::String(s) => 4 + s.len(),
            Self::Blob(b) => 4 + b.len(),
        }
    }

    /// Append the tagged encoding to `out`.
    pub fn write_tagged(&self, out: &mut Vec<u8>) {
        out.reserve(self.serialized_size());
        out.push(self.representation().tag());
        self.write_untagged(out);
    }

    /// Append the untagged encoding to `out`.
    #[allow(clippy::cast_possible_truncation)] // lengths are bounded by the frame size
    pub fn write_untagged(&self, out: &mut Vec<u8>) {
        match self {
            Self::Boolean(b) => out.push(u8::from(*b)),
            Self::Int32(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::Int64(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::Float32(x) => out.extend_from_slice(&x.to_le_bytes()),
            Self::Float64(x) => out.extend_from_slice(&x.to_le_bytes()),
            Self::Text(s) | Self::String(s) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Self::Blob(b) => {
                out.extend_from_slice(&(b.len() as u32).to_le_bytes());
                out.extend_from_slice(b);
            }
            Self::Date(d) => out.extend_from_slice(&date_to_i32(*d).to_le_bytes()),
        }
    }

    /// Decode one tagged value.
    ///
    /// Returns the value and number of bytes consumed.
    pub fn read_tagged(bytes: &[u8]) -> Result<(Self, usize), ValueError> {
        let (&tag, rest) = bytes.split_first().ok_or(ValueError::Truncated)?;
        let ty = SemanticType::try_from(tag).map_err(ValueError::UnknownTag)?;
        let (value, consumed) = Self::read_untagged(ty, rest)?;
        Ok((value, consumed + 1))
    }

    /// Decode one untagged value of a known type.
    ///
    /// Returns the value and number of bytes consumed.
    pub fn read_untagged(ty: SemanticType, bytes: &[u8]) -> Result<(Self, usize), ValueError> {
        match ty {
            SemanticType::Boolean => {
                let b = *bytes.first().ok_or(ValueError::Truncated)?;
                Ok((Self::Boolean(b != 0), 1))
            }
            SemanticType::Int32 => Ok((Self::Int32(i32::from_le_bytes(take(bytes)?)), 4)),
            SemanticType::Int64 | SemanticType::Timestamp => {
                Ok((Self::Int64(i64::from_le_bytes(take(bytes)?)), 8))
            }
            SemanticType::Float32 => Ok((Self::Float32(f32::from_le_bytes(take(bytes)?)), 4)),
            SemanticType::Float64 => Ok((Self::Float64(f64::from_le_bytes(take(bytes)?)), 8)),
            SemanticType::Date => {
                let raw = i32::from_le_bytes(take(bytes)?);
                let date = date_from_i32(raw).ok_or(ValueError::InvalidDate(raw))?;
                Ok((Self::Date(date), 4))
            }
            SemanticType::Text | SemanticType::String | SemanticType::Blob => {
                let len = u32::from_le_bytes(take(bytes)?) as usize;
                let payload = bytes.get(4..4 + len).ok_or(ValueError::Truncated)?;
                let value = match ty {
                    SemanticType::Blob => Self::Blob(payload.to_vec()),
                    _ => {
                        let s = std::str::from_utf8(payload)
                            .map_err(|_| ValueError::InvalidUtf8)?
                            .to_string();
                        if ty == SemanticType::Text {
                            Self::Text(s)
                        } else {
                            Self::String(s)
                        }
                    }
                };
                Ok((value, 4 + len))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N], ValueError> {
    bytes
        .get(..N)
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or(ValueError::Truncated)
}

/// Encode a date as its day number counted from 0001-01-01 (day 1).
///
/// Total over every `NaiveDate`, including negative and six-digit years.
fn date_to_i32(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn date_from_i32(raw: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(raw)
}

fn quote(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

fn unquote(literal: &str, quote: char) -> Option<String> {
    let inner = literal.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == quote && chars.next() != Some(quote) {
            return None;
        }
        out.push(c);
    }
    Some(out)
}

fn parse_literal_inner(declared: SemanticType, literal: &str) -> Option<Value> {
    match declared {
        SemanticType::Boolean => {
            if literal.eq_ignore_ascii_case("true") {
                Some(Value::Boolean(true))
            } else if literal.eq_ignore_ascii_case("false") {
                Some(Value::Boolean(false))
            } else {
                None
            }
        }
        SemanticType::Int32 => literal.parse().ok().map(Value::Int32),
        SemanticType::Int64 | SemanticType::Timestamp => literal
            .strip_suffix('L')
            .and_then(|digits| digits.parse().ok())
            .map(Value::Int64),
        SemanticType::Float32 => literal
            .strip_suffix('F')
            .filter(|digits| digits.contains(['.', 'e', 'E']))
            .and_then(|digits| digits.parse::<f32>().ok())
            .filter(|x| x.is_finite())
            .map(Value::Float32),
        SemanticType::Float64 => Some(literal)
            .filter(|digits| digits.contains(['.', 'e', 'E']))
            .and_then(|digits| digits.parse::<f64>().ok())
            .filter(|x| x.is_finite())
            .map(Value::Float64),
        SemanticType::Text => unquote(literal, '\'').map(Value::Text),
        SemanticType::String => unquote(literal, '"').map(Value::String),
        SemanticType::Blob => literal
            .strip_prefix("X'")
            .and_then(|rest| rest.strip_suffix('\''))
            .and_then(|digits| hex::decode(digits).ok())
            .map(Value::Blob),
        SemanticType::Date => NaiveDate::parse_from_str(literal, "%Y-%m-%d")
            .ok()
            .map(Value::Date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn samples() -> Vec<Value> {
        vec![
            Value::Boolean(true),
            Value::Int32(-42),
            Value::Int64(i64::MAX),
            Value::Float32(1.01),
            Value::Float64(-2.5e-8),
            Value::Text("it's".to_string()),
            Value::String("say \"hi\"".to_string()),
            Value::Blob(vec![0x00, 0xAB, 0xFF]),
            Value::Date(date(2024, 2, 29)),
        ]
    }

    #[test]
    fn test_extreme_dates_roundtrip() {
        for d in [date(250_000, 1, 1), date(-1, 6, 1), NaiveDate::MIN, NaiveDate::MAX] {
            let value = Value::Date(d);
            let mut buf = Vec::new();
            value.write_untagged(&mut buf);
            assert_eq!(buf.len(), 4);
            let (decoded, used) = Value::read_untagged(SemanticType::Date, &buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(used, 4);
        }
        for d in [date(250_000, 1, 1), date(-1, 6, 1)] {
            let value = Value::Date(d);
            assert_eq!(
                Value::parse_literal(SemanticType::Date, &value.to_literal()).unwrap(),
                value
            );
        }
    }

    #[test]
    fn test_date_day_numbers() {
        let mut buf = Vec::new();
        Value::Date(date(1, 1, 1)).write_untagged(&mut buf);
        assert_eq!(i32::from_le_bytes(buf.try_into().unwrap()), 1);
    }

    #[test]
    fn test_tagged_roundtrip() {
        for value in samples() {
            let mut bytes = Vec::new();
            value.write_tagged(&mut bytes);
            assert_eq!(bytes.len(), value.serialized_size());
            let (decoded, consumed) = Value::read_tagged(&bytes).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_read_tagged_truncated() {
        let mut bytes = Vec::new();
        Value::Text("hello".to_string()).write_tagged(&mut bytes);
        bytes.truncate(bytes.len() - 1);
        assert_eq!(Value::read_tagged(&bytes), Err(ValueError::Truncated));
        assert_eq!(Value::read_tagged(&[]), Err(ValueError::Truncated));
    }

    #[test]
    fn test_read_tagged_unknown_tag() {
        assert_eq!(Value::read_tagged(&[0x06, 0]), Err(ValueError::UnknownTag(0x06)));
    }

    #[test]
    fn test_timestamp_tag_decodes_as_int64() {
        let mut bytes = vec![SemanticType::Timestamp.tag()];
        bytes.extend_from_slice(&7i64.to_le_bytes());
        let (value, _) = Value::read_tagged(&bytes).unwrap();
        assert_eq!(value, Value::Int64(7));
        assert!(value.matches(SemanticType::Timestamp));
    }

    #[test]
    fn test_literal_roundtrip() {
        for value in samples() {
            let literal = value.to_literal();
            let parsed = Value::parse_literal(value.representation(), &literal).unwrap();
            assert_eq!(parsed, value, "literal {literal}");
        }
    }

    #[test]
    fn test_canonical_literals() {
        assert_eq!(Value::Boolean(false).to_literal(), "false");
        assert_eq!(Value::Int32(1).to_literal(), "1");
        assert_eq!(Value::Int64(1).to_literal(), "1L");
        assert_eq!(Value::Float32(1.01).to_literal(), "1.01F");
        assert_eq!(Value::Float64(1.0).to_literal(), "1.0");
        assert_eq!(Value::Text("a'b".to_string()).to_literal(), "'a''b'");
        assert_eq!(Value::String("abc".to_string()).to_literal(), "\"abc\"");
        assert_eq!(Value::Blob(vec![0x0a, 0x0b]).to_literal(), "X'0a0b'");
        assert_eq!(Value::Date(date(2024, 1, 1)).to_literal(), "2024-01-01");
    }

    #[test]
    fn test_literal_grammars_are_disjoint() {
        for value in samples() {
            let literal = value.to_literal();
            for ty in SemanticType::MATRIX {
                let accepted = Value::parse_literal(ty, &literal).is_ok();
                assert_eq!(accepted, ty == value.representation(), "{literal} as {ty}");
            }
        }
    }

    #[test]
    fn test_infer_literal() {
        for value in samples() {
            let (ty, inferred) = Value::infer_literal(&value.to_literal()).unwrap();
            assert_eq!(ty, value.representation());
            assert_eq!(inferred, value);
        }
        assert!(Value::infer_literal("not a literal").is_none());
    }

    #[test]
    fn test_rejected_literals() {
        assert!(Value::parse_literal(SemanticType::Int32, "2147483648").is_err());
        assert!(Value::parse_literal(SemanticType::Int64, "12").is_err());
        assert!(Value::parse_literal(SemanticType::Float32, "1.5").is_err());
        assert!(Value::parse_literal(SemanticType::Float64, "15").is_err());
        assert!(Value::parse_literal(SemanticType::Text, "'unterminated").is_err());
        assert!(Value::parse_literal(SemanticType::Text, "'a'b'").is_err());
        assert!(Value::parse_literal(SemanticType::Blob, "X'zz'").is_err());
        assert!(Value::parse_literal(SemanticType::Date, "2024-13-01").is_err());
    }

    #[test]
    fn test_check_reports_violation() {
        let err = Value::Boolean(true).check("s1", SemanticType::Int32).unwrap_err();
        assert_eq!(
            err,
            TypeViolation {
                column: "s1".to_string(),
                declared: SemanticType::Int32,
                actual: SemanticType::Boolean,
            }
        );
        assert!(Value::Int64(1).check("s1", SemanticType::Timestamp).is_ok());
    }
}
