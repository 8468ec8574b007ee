//! Semantic column types.
//!
//! Provides the closed `SemanticType` enumeration together with its stable
//! one-byte wire tag and its textual name.

use std::fmt;
use std::str::FromStr;

/// The declared type of a column.
///
/// `Int64` and `Timestamp` are distinct tags that share one 64-bit integer
/// representation. Every other tag has a representation of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SemanticType {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Float32 = 3,
    Float64 = 4,
    Text = 5,
    Timestamp = 8,
    Date = 9,
    Blob = 10,
    String = 11,
}

impl SemanticType {
    /// Every type tag.
    pub const ALL: [Self; 10] = [
        Self::Boolean,
        Self::Int32,
        Self::Int64,
        Self::Timestamp,
        Self::Float32,
        Self::Float64,
        Self::Text,
        Self::String,
        Self::Blob,
        Self::Date,
    ];

    /// One tag per representation class, in matrix order.
    ///
    /// `Timestamp` is left out because its exemplar is the `Int64` one.
    pub const MATRIX: [Self; 9] = [
        Self::Boolean,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Text,
        Self::String,
        Self::Blob,
        Self::Date,
    ];

    /// The wire tag of this type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// The upper-case name used in schema declarations and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Float32 => "FLOAT",
            Self::Float64 => "DOUBLE",
            Self::Text => "TEXT",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
            Self::Blob => "BLOB",
            Self::String => "STRING",
        }
    }

    /// The tag that owns this type's runtime representation.
    #[must_use]
    pub const fn representation(self) -> Self {
        match self {
            Self::Timestamp => Self::Int64,
            other => other,
        }
    }

    /// Whether two tags share a runtime representation.
    #[must_use]
    pub fn shares_representation(self, other: Self) -> bool {
        self.representation() == other.representation()
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Timestamp | Self::Float32 | Self::Float64
        )
    }
}

impl TryFrom<u8> for SemanticType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Boolean),
            1 => Ok(Self::Int32),
            2 => Ok(Self::Int64),
            3 => Ok(Self::Float32),
            4 => Ok(Self::Float64),
            5 => Ok(Self::Text),
            8 => Ok(Self::Timestamp),
            9 => Ok(Self::Date),
            10 => Ok(Self::Blob),
            11 => Ok(Self::String),
            _ => Err(value),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeName(pub String);

impl fmt::Display for UnknownTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown type name: {}", self.0)
    }
}

impl std::error::Error for UnknownTypeName {}

impl FromStr for SemanticType {
    type Err = UnknownTypeName;

    /// Parse a type name, case-insensitively.
    ///
    /// Accepts the canonical names plus `FLOAT32`, `FLOAT64` and `BINARY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let parsed = match upper.as_str() {
            "BOOLEAN" => Self::Boolean,
            "INT32" => Self::Int32,
            "INT64" => Self::Int64,
            "FLOAT" | "FLOAT32" => Self::Float32,
            "DOUBLE" | "FLOAT64" => Self::Float64,
            "TEXT" => Self::Text,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "BLOB" | "BINARY" => Self::Blob,
            "STRING" => Self::String,
            _ => return Err(UnknownTypeName(s.to_string())),
        };
        Ok(parsed)
    }
}
