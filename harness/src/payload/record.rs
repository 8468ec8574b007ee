//! Row-oriented records used by the record-based write entry points.

use crate::coerce::{CoercedRow, CoercedValue, CoercionMode};
use crate::payload::PayloadError;
use crate::types::{SemanticType, Value};

/// The values of one record, in one coercion mode.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValues {
    Strict(Vec<Value>),
    Inferred(Vec<String>),
}

impl RecordValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Strict(values) => values.len(),
            Self::Inferred(literals) => literals.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn mode(&self) -> CoercionMode {
        match self {
            Self::Strict(_) => CoercionMode::Strict,
            Self::Inferred(_) => CoercionMode::Inferred,
        }
    }
}

/// One timestamped record: parallel lists of columns, declared types and
/// values.
///
/// # Invariants
///
/// - `columns`, `types` and `values` have equal length and are positionally
///   aligned.
/// - Absent cells are not represented; a record built from an all-absent row
///   has no columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: i64,
    pub columns: Vec<String>,
    pub types: Vec<SemanticType>,
    pub values: RecordValues,
}

impl Record {
    /// Build a record from a coerced row, dropping absent cells.
    ///
    /// Values are moved out of the row; nothing is shared with other
    /// records.
    pub fn from_row(row: CoercedRow) -> Result<Self, PayloadError> {
        if row.values.len() != row.schema.len() {
            return Err(PayloadError::Width {
                expected: row.schema.len(),
                actual: row.values.len(),
            });
        }
        let mut columns = Vec::with_capacity(row.values.len());
        let mut types = Vec::with_capacity(row.values.len());
        let mut strict = Vec::new();
        let mut inferred = Vec::new();

        for (column, cell) in row.schema.columns().iter().zip(row.values) {
            match cell {
                CoercedValue::Absent => continue,
                CoercedValue::Strict(value) => strict.push(value),
                CoercedValue::Inferred(literal) => inferred.push(literal),
            }
            columns.push(column.name.clone());
            types.push(column.ty);
        }

        let values = match (strict.is_empty(), inferred.is_empty()) {
            (_, true) => RecordValues::Strict(strict),
            (true, false) => RecordValues::Inferred(inferred),
            (false, false) => return Err(PayloadError::MixedModes),
        };

        Ok(Self {
            timestamp: row.timestamp,
            columns,
            types,
            values,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the record carries no cells. Such records persist nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether the column, type and value lists line up.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.columns.len() == self.types.len() && self.columns.len() == self.values.len()
    }
}
