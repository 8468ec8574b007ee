//! Negative cases: values and literals that do not belong to a target type.
//!
//! Strict cases carry a native value of another representation; they must be
//! rejected on the client before anything is sent. Inferred cases carry a
//! literal the target's grammar rejects; they can only be rejected by the
//! engine. The two expected kinds are kept apart.

use std::fmt;

use chrono::NaiveDate;

use crate::coerce::{CoercedValue, CoercionMode};
use crate::types::{ErrorKind, SemanticType, Value};

/// The wrong input carried by a case.
#[derive(Debug, Clone, PartialEq)]
pub enum MismatchInput {
    Value(Value),
    Literal(String),
}

/// One negative case for one target type.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchCase {
    /// The declared type of the column written to.
    pub target: SemanticType,
    /// The type the input was taken from.
    pub source: SemanticType,
    pub input: MismatchInput,
    /// Whether the input is a near miss rather than another type's exemplar.
    pub near_miss: bool,
    pub expected: ErrorKind,
}

impl MismatchCase {
    #[must_use]
    pub const fn mode(&self) -> CoercionMode {
        match self.input {
            MismatchInput::Value(_) => CoercionMode::Strict,
            MismatchInput::Literal(_) => CoercionMode::Inferred,
        }
    }

    /// The input as a coerced cell.
    #[must_use]
    pub fn cell(&self) -> CoercedValue {
        match &self.input {
            MismatchInput::Value(value) => CoercedValue::Strict(value.clone()),
            MismatchInput::Literal(literal) => CoercedValue::Inferred(literal.clone()),
        }
    }
}

impl fmt::Display for MismatchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.near_miss { "near miss" } else { "exemplar" };
        match &self.input {
            MismatchInput::Value(value) => write!(
                f,
                "{} column <- {} value {value} ({kind})",
                self.target,
                value.representation()
            ),
            MismatchInput::Literal(literal) => write!(
                f,
                "{} column <- {} literal {literal} ({kind})",
                self.target, self.source
            ),
        }
    }
}

/// Generator for negative cases.
pub struct MismatchGenerator;

impl MismatchGenerator {
    /// A representative value of `ty`.
    #[must_use]
    pub fn exemplar(ty: SemanticType) -> Value {
        match ty {
            SemanticType::Boolean => Value::Boolean(true),
            SemanticType::Int32 => Value::Int32(7),
            SemanticType::Int64 | SemanticType::Timestamp => Value::Int64(7),
            SemanticType::Float32 => Value::Float32(7.5),
            SemanticType::Float64 => Value::Float64(7.25),
            SemanticType::Text => Value::Text("text".to_string()),
            SemanticType::String => Value::String("string".to_string()),
            SemanticType::Blob => Value::Blob(b"blob".to_vec()),
            SemanticType::Date => {
                Value::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or(NaiveDate::MIN))
            }
        }
    }

    /// Values of every other representation, plus near misses.
    ///
    /// Every case is expected to be rejected client-side.
    #[must_use]
    pub fn mismatched_values(target: SemanticType) -> Vec<MismatchCase> {
        let case = |source: SemanticType, value: Value, near_miss| MismatchCase {
            target,
            source,
            input: MismatchInput::Value(value),
            near_miss,
            expected: ErrorKind::ClientSideTypeViolation,
        };

        let mut cases: Vec<MismatchCase> = SemanticType::MATRIX
            .into_iter()
            .filter(|ty| !ty.shares_representation(target))
            .map(|ty| case(ty, Self::exemplar(ty), false))
            .collect();

        let near_miss = match target {
            ty if ty.is_numeric() => Value::String(Self::exemplar(ty).to_literal()),
            SemanticType::Text => Value::Blob(b"text".to_vec()),
            SemanticType::String => Value::Blob(b"string".to_vec()),
            SemanticType::Blob => Value::Text(hex::encode(b"blob")),
            SemanticType::Date => Value::Int32(20_240_601),
            _ => Value::String("true".to_string()),
        };
        cases.push(case(near_miss.representation(), near_miss, true));
        cases
    }

    /// Literals the target's grammar rejects: the other types' canonical
    /// literals, plus near misses.
    ///
    /// Every case is expected to be rejected by the engine.
    #[must_use]
    pub fn mismatched_literals(target: SemanticType) -> Vec<MismatchCase> {
        let case = |source: SemanticType, literal: String, near_miss| MismatchCase {
            target,
            source,
            input: MismatchInput::Literal(literal),
            near_miss,
            expected: ErrorKind::ServerSideExecutionFailure,
        };

        let near_misses: &[&str] = match target {
            SemanticType::Boolean => &["yes", "1"],
            SemanticType::Int32 => &["2147483648", "7.0"],
            SemanticType::Int64 | SemanticType::Timestamp => &["9223372036854775808L", "7l"],
            SemanticType::Float32 => &["7.5f", "7F"],
            SemanticType::Float64 => &["1.0.0", "7.25D"],
            SemanticType::Text => &["'unterminated", "'a'b'"],
            SemanticType::String => &["\"unterminated", "\"a\"b\""],
            SemanticType::Blob => &["X'zz'", "X'abc'"],
            SemanticType::Date => &["2024-13-01", "20240601"],
        };

        SemanticType::MATRIX
            .into_iter()
            .filter(|ty| !ty.shares_representation(target))
            .map(|ty| case(ty, Self::exemplar(ty).to_literal(), false))
            .chain(
                near_misses
                    .iter()
                    .map(|literal| case(target, (*literal).to_string(), true)),
            )
            .filter(|c| match &c.input {
                MismatchInput::Literal(literal) => Value::parse_literal(target, literal).is_err(),
                MismatchInput::Value(_) => false,
            })
            .collect()
    }

    /// Every strict and inferred case for every type in the matrix.
    pub fn matrix() -> impl Iterator<Item = MismatchCase> {
        SemanticType::MATRIX.into_iter().flat_map(|target| {
            Self::mismatched_values(target)
                .into_iter()
                .chain(Self::mismatched_literals(target))
        })
    }
}
