//! Schema-driven coercion of fixture rows.
//!
//! Every column type is handled through one coercion table entry holding
//! three functions: parse a fixture field into a strict value, produce the
//! type's fixed default, and encode a value as its canonical literal. The
//! coercer consults the table once per cell; no other code branches on the
//! column type to coerce.
//!
//! # Null substitution
//!
//! Under [`NullPolicy::Substitute`] (the default) a null field becomes the
//! fixed per-type default:
//!
//! | type | default |
//! |---|---|
//! | BOOLEAN | `false` |
//! | INT32, INT64, TIMESTAMP | `1` |
//! | FLOAT | `1.01` |
//! | DOUBLE | `1.0` |
//! | TEXT, STRING | `"default"` |
//! | BLOB | `b"default"` |
//! | DATE | `2024-01-01` |
//!
//! Under [`NullPolicy::Absent`] a null field becomes [`CoercedValue::Absent`].

use std::fmt;

use chrono::NaiveDate;

use crate::catalog::ColumnSchema;
use crate::constants::{DEFAULT_FLOAT32, PLACEHOLDER_BLOB, PLACEHOLDER_DATE, PLACEHOLDER_STRING};
use crate::fixture::FixtureRow;
use crate::types::{DeviceId, ErrorKind, SemanticType, Value};

/// Which shape coerced values take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercionMode {
    /// Natively-typed values for the strictly-typed entry points.
    Strict,
    /// Canonical string literals for the entry points where the engine
    /// parses types itself.
    Inferred,
}

impl fmt::Display for CoercionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Inferred => f.write_str("inferred"),
        }
    }
}

/// What a null fixture field turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Substitute the fixed per-type default.
    #[default]
    Substitute,
    /// Keep the cell absent.
    Absent,
}

/// One coerced cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Absent,
    Strict(Value),
    Inferred(String),
}

impl CoercedValue {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The mode this cell was coerced under, if present.
    #[must_use]
    pub const fn mode(&self) -> Option<CoercionMode> {
        match self {
            Self::Absent => None,
            Self::Strict(_) => Some(CoercionMode::Strict),
            Self::Inferred(_) => Some(CoercionMode::Inferred),
        }
    }
}

/// A coerced row bound to its device and schema.
///
/// Each row owns its value buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedRow {
    pub device: DeviceId,
    pub timestamp: i64,
    pub schema: ColumnSchema,
    pub values: Vec<CoercedValue>,
}

impl CoercedRow {
    /// Whether no cell carries a value. Such rows are not persisted.
    #[must_use]
    pub fn is_all_absent(&self) -> bool {
        self.values.iter().all(CoercedValue::is_absent)
    }
}

/// A fixture field that could not be parsed under its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub line: usize,
    pub column: String,
    pub declared: SemanticType,
    pub field: String,
    pub reason: &'static str,
}

/// Errors produced by coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    /// A field is malformed for its declared type.
    Parse(ParseFailure),
    /// The row has a different number of fields than the schema has columns.
    Width {
        line: usize,
        expected: usize,
        actual: usize,
    },
}

impl CoerceError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::ParseFailure
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(p) => write!(
                f,
                "line {}: column '{}' ({}): '{}' {}",
                p.line, p.column, p.declared, p.field, p.reason
            ),
            Self::Width {
                line,
                expected,
                actual,
            } => write!(f, "line {line}: expected {expected} fields, found {actual}"),
        }
    }
}

impl std::error::Error for CoerceError {}

/// The coercion table entry for one type.
pub struct Coercion {
    /// Parse a non-null fixture field.
    pub parse: fn(&str) -> Result<Value, &'static str>,
    /// The value substituted for a null field.
    pub default: fn() -> Value,
    /// Encode a value as its canonical literal.
    pub encode: fn(&Value) -> String,
}

/// Look up the coercion table entry for `ty`.
#[must_use]
pub fn coercion(ty: SemanticType) -> &'static Coercion {
    match ty {
        SemanticType::Boolean => &BOOLEAN,
        SemanticType::Int32 => &INT32,
        SemanticType::Int64 | SemanticType::Timestamp => &INT64,
        SemanticType::Float32 => &FLOAT32,
        SemanticType::Float64 => &FLOAT64,
        SemanticType::Text => &TEXT,
        SemanticType::String => &STRING,
        SemanticType::Blob => &BLOB,
        SemanticType::Date => &DATE,
    }
}

static BOOLEAN: Coercion = Coercion {
    parse: parse_boolean,
    default: default_boolean,
    encode: Value::to_literal,
};
static INT32: Coercion = Coercion {
    parse: parse_int32,
    default: default_int32,
    encode: Value::to_literal,
};
static INT64: Coercion = Coercion {
    parse: parse_int64,
    default: default_int64,
    encode: Value::to_literal,
};
static FLOAT32: Coercion = Coercion {
    parse: parse_float32,
    default: default_float32,
    encode: Value::to_literal,
};
static FLOAT64: Coercion = Coercion {
    parse: parse_float64,
    default: default_float64,
    encode: Value::to_literal,
};
static TEXT: Coercion = Coercion {
    parse: parse_text,
    default: default_text,
    encode: Value::to_literal,
};
static STRING: Coercion = Coercion {
    parse: parse_string,
    default: default_string,
    encode: Value::to_literal,
};
static BLOB: Coercion = Coercion {
    parse: parse_blob,
    default: default_blob,
    encode: Value::to_literal,
};
static DATE: Coercion = Coercion {
    parse: parse_date,
    default: default_date,
    encode: Value::to_literal,
};

fn parse_boolean(field: &str) -> Result<Value, &'static str> {
    if field.eq_ignore_ascii_case("true") {
        Ok(Value::Boolean(true))
    } else if field.eq_ignore_ascii_case("false") {
        Ok(Value::Boolean(false))
    } else {
        Err("is not true or false")
    }
}

fn parse_int32(field: &str) -> Result<Value, &'static str> {
    field
        .parse()
        .map(Value::Int32)
        .map_err(|_| "is not a 32-bit integer")
}

fn parse_int64(field: &str) -> Result<Value, &'static str> {
    field
        .parse()
        .map(Value::Int64)
        .map_err(|_| "is not a 64-bit integer")
}

fn parse_float32(field: &str) -> Result<Value, &'static str> {
    match field.parse::<f32>() {
        Ok(x) if x.is_finite() => Ok(Value::Float32(x)),
        _ => Err("is not a finite 32-bit float"),
    }
}

fn parse_float64(field: &str) -> Result<Value, &'static str> {
    match field.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(Value::Float64(x)),
        _ => Err("is not a finite 64-bit float"),
    }
}

#[allow(clippy::unnecessary_wraps)] // signature fixed by the table
fn parse_text(field: &str) -> Result<Value, &'static str> {
    Ok(Value::Text(field.to_string()))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_string(field: &str) -> Result<Value, &'static str> {
    Ok(Value::String(field.to_string()))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_blob(field: &str) -> Result<Value, &'static str> {
    Ok(Value::Blob(field.as_bytes().to_vec()))
}

fn parse_date(field: &str) -> Result<Value, &'static str> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|_| "is not a YYYY-MM-DD date")
}

const fn default_boolean() -> Value {
    Value::Boolean(false)
}

const fn default_int32() -> Value {
    Value::Int32(1)
}

const fn default_int64() -> Value {
    Value::Int64(1)
}

const fn default_float32() -> Value {
    Value::Float32(DEFAULT_FLOAT32)
}

const fn default_float64() -> Value {
    Value::Float64(1.0)
}

fn default_text() -> Value {
    Value::Text(PLACEHOLDER_STRING.to_string())
}

fn default_string() -> Value {
    Value::String(PLACEHOLDER_STRING.to_string())
}

fn default_blob() -> Value {
    Value::Blob(PLACEHOLDER_BLOB.to_vec())
}

fn default_date() -> Value {
    let (year, month, day) = PLACEHOLDER_DATE;
    Value::Date(NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN))
}

/// Coerces fixture rows under one mode and null policy.
#[derive(Debug, Clone, Copy)]
pub struct ValueCoercer {
    mode: CoercionMode,
    null_policy: NullPolicy,
}

impl ValueCoercer {
    #[must_use]
    pub const fn new(mode: CoercionMode) -> Self {
        Self {
            mode,
            null_policy: NullPolicy::Substitute,
        }
    }

    #[must_use]
    pub const fn with_null_policy(mut self, null_policy: NullPolicy) -> Self {
        self.null_policy = null_policy;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> CoercionMode {
        self.mode
    }

    #[must_use]
    pub const fn null_policy(&self) -> NullPolicy {
        self.null_policy
    }

    /// Coerce every field of `row` against `schema`, positionally.
    pub fn coerce(
        &self,
        schema: &ColumnSchema,
        row: &FixtureRow,
    ) -> Result<Vec<CoercedValue>, CoerceError> {
        if row.fields.len() != schema.len() {
            return Err(CoerceError::Width {
                line: row.line,
                expected: schema.len(),
                actual: row.fields.len(),
            });
        }

        schema
            .columns()
            .iter()
            .zip(&row.fields)
            .map(|(column, field)| {
                let table = coercion(column.ty);
                let value = match field {
                    Some(text) => (table.parse)(text).map_err(|reason| {
                        CoerceError::Parse(ParseFailure {
                            line: row.line,
                            column: column.name.clone(),
                            declared: column.ty,
                            field: text.clone(),
                            reason,
                        })
                    })?,
                    None if self.null_policy == NullPolicy::Absent => {
                        return Ok(CoercedValue::Absent);
                    }
                    None => (table.default)(),
                };
                Ok(match self.mode {
                    CoercionMode::Strict => CoercedValue::Strict(value),
                    CoercionMode::Inferred => CoercedValue::Inferred((table.encode)(&value)),
                })
            })
            .collect()
    }

    /// Coerce `row` and bind it to `device`.
    pub fn coerce_row(
        &self,
        device: &DeviceId,
        schema: &ColumnSchema,
        row: &FixtureRow,
    ) -> Result<CoercedRow, CoerceError> {
        Ok(CoercedRow {
            device: device.clone(),
            timestamp: row.timestamp,
            schema: schema.clone(),
            values: self.coerce(schema, row)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[Option<&str>]) -> FixtureRow {
        FixtureRow {
            line: 1,
            timestamp: 0,
            fields: fields.iter().map(|f| f.map(str::to_string)).collect(),
        }
    }

    fn all_types_schema() -> ColumnSchema {
        ColumnSchema::from_pairs(SemanticType::ALL.iter().map(|ty| (ty.name(), *ty))).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_boolean_null_becomes_false() {
        let schema = ColumnSchema::single("s1", SemanticType::Boolean);
        let values = ValueCoercer::new(CoercionMode::Strict)
            .coerce(&schema, &row(&[None]))
            .unwrap();
        assert_eq!(values, vec![CoercedValue::Strict(Value::Boolean(false))]);
    }

    #[test]
    fn test_defaults_for_every_type() {
        let schema = all_types_schema();
        let nulls = vec![None; schema.len()];
        let values = ValueCoercer::new(CoercionMode::Strict)
            .coerce(&schema, &row(&nulls))
            .unwrap();
        let expected: Vec<CoercedValue> = [
            Value::Boolean(false),
            Value::Int32(1),
            Value::Int64(1),
            Value::Int64(1),
            Value::Float32(1.01),
            Value::Float64(1.0),
            Value::Text("default".to_string()),
            Value::String("default".to_string()),
            Value::Blob(b"default".to_vec()),
            Value::Date(date(2024, 1, 1)),
        ]
        .into_iter()
        .map(CoercedValue::Strict)
        .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_defaults_are_deterministic() {
        let schema = all_types_schema();
        let nulls = vec![None; schema.len()];
        for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
            let coercer = ValueCoercer::new(mode);
            let first = coercer.coerce(&schema, &row(&nulls)).unwrap();
            for _ in 0..5 {
                assert_eq!(coercer.coerce(&schema, &row(&nulls)).unwrap(), first);
            }
        }
    }

    #[test]
    fn test_inferred_defaults() {
        let schema = all_types_schema();
        let nulls = vec![None; schema.len()];
        let values = ValueCoercer::new(CoercionMode::Inferred)
            .coerce(&schema, &row(&nulls))
            .unwrap();
        let literals: Vec<&str> = values
            .iter()
            .map(|v| match v {
                CoercedValue::Inferred(s) => s.as_str(),
                other => panic!("expected literal, got {other:?}"),
            })
            .collect();
        assert_eq!(
            literals,
            [
                "false",
                "1",
                "1L",
                "1L",
                "1.01F",
                "1.0",
                "'default'",
                "\"default\"",
                "X'64656661756c74'",
                "2024-01-01",
            ]
        );
    }

    #[test]
    fn test_strict_then_literal_equals_inferred() {
        let schema = all_types_schema();
        let fields = [
            Some("TRUE"),
            Some("-7"),
            Some("9000000000"),
            Some("42"),
            Some("3.25"),
            Some("-0.001"),
            Some("it's"),
            Some("plain"),
            Some("raw bytes"),
            Some("1999-12-31"),
        ];
        let strict = ValueCoercer::new(CoercionMode::Strict)
            .coerce(&schema, &row(&fields))
            .unwrap();
        let inferred = ValueCoercer::new(CoercionMode::Inferred)
            .coerce(&schema, &row(&fields))
            .unwrap();
        for (s, i) in strict.iter().zip(&inferred) {
            match (s, i) {
                (CoercedValue::Strict(value), CoercedValue::Inferred(literal)) => {
                    assert_eq!(&value.to_literal(), literal);
                }
                other => panic!("unexpected pair {other:?}"),
            }
        }
    }

    #[test]
    fn test_absent_policy() {
        let schema = ColumnSchema::from_pairs([
            ("s1", SemanticType::Int32),
            ("s2", SemanticType::Text),
        ])
        .unwrap();
        let coercer =
            ValueCoercer::new(CoercionMode::Strict).with_null_policy(NullPolicy::Absent);
        let values = coercer.coerce(&schema, &row(&[None, Some("x")])).unwrap();
        assert_eq!(
            values,
            vec![
                CoercedValue::Absent,
                CoercedValue::Strict(Value::Text("x".to_string()))
            ]
        );
    }

    #[test]
    fn test_malformed_fields_fail() {
        let cases = [
            (SemanticType::Boolean, "yes"),
            (SemanticType::Int32, "2147483648"),
            (SemanticType::Int64, "1.5"),
            (SemanticType::Timestamp, "soon"),
            (SemanticType::Float32, "abc"),
            (SemanticType::Float64, "NaN"),
            (SemanticType::Date, "2024/01/01"),
        ];
        for (ty, field) in cases {
            let schema = ColumnSchema::single("s1", ty);
            for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
                let err = ValueCoercer::new(mode)
                    .coerce(&schema, &row(&[Some(field)]))
                    .unwrap_err();
                assert_eq!(err.kind(), ErrorKind::ParseFailure);
                match err {
                    CoerceError::Parse(failure) => {
                        assert_eq!(failure.declared, ty);
                        assert_eq!(failure.field, field);
                        assert_eq!(failure.column, "s1");
                    }
                    CoerceError::Width { .. } => panic!("expected Parse"),
                }
            }
        }
    }

    #[test]
    fn test_width_mismatch() {
        let schema = ColumnSchema::single("s1", SemanticType::Int32);
        let err = ValueCoercer::new(CoercionMode::Strict)
            .coerce(&schema, &row(&[Some("1"), Some("2")]))
            .unwrap_err();
        assert_eq!(
            err,
            CoerceError::Width {
                line: 1,
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_coerce_row_binds_device() {
        let device = DeviceId::parse("root.sg.d1").unwrap();
        let schema = ColumnSchema::single("s1", SemanticType::Int32);
        let coerced = ValueCoercer::new(CoercionMode::Strict)
            .with_null_policy(NullPolicy::Absent)
            .coerce_row(&device, &schema, &row(&[None]))
            .unwrap();
        assert_eq!(coerced.device, device);
        assert!(coerced.is_all_absent());
    }
}
