//! Column-major batches for the columnar write entry point.
//!
//! A `Tablet` holds up to a fixed number of rows for one device and one
//! schema. Values are stored per column in a vector of the column's native
//! type, with a parallel null bitmap. Appends are strictly typed: a value
//! whose representation does not match its column is rejected before the
//! row is stored, and a rejected row leaves the tablet unchanged.

use chrono::NaiveDate;

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercedValue, coercion};
use crate::payload::PayloadError;
use crate::types::{DeviceId, SemanticType, Value};

/// The native storage of one tablet column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(Vec<String>),
    String(Vec<String>),
    Blob(Vec<Vec<u8>>),
    Date(Vec<NaiveDate>),
}

impl ColumnValues {
    fn with_capacity(ty: SemanticType, capacity: usize) -> Self {
        match ty {
            SemanticType::Boolean => Self::Boolean(Vec::with_capacity(capacity)),
            SemanticType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            SemanticType::Int64 | SemanticType::Timestamp => {
                Self::Int64(Vec::with_capacity(capacity))
            }
            SemanticType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            SemanticType::Float64 => Self::Float64(Vec::with_capacity(capacity)),
            SemanticType::Text => Self::Text(Vec::with_capacity(capacity)),
            SemanticType::String => Self::String(Vec::with_capacity(capacity)),
            SemanticType::Blob => Self::Blob(Vec::with_capacity(capacity)),
            SemanticType::Date => Self::Date(Vec::with_capacity(capacity)),
        }
    }

    /// Push a value of the matching representation.
    ///
    /// Hands the value back if the representation differs.
    fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (Self::Boolean(v), Value::Boolean(x)) => v.push(x),
            (Self::Int32(v), Value::Int32(x)) => v.push(x),
            (Self::Int64(v), Value::Int64(x)) => v.push(x),
            (Self::Float32(v), Value::Float32(x)) => v.push(x),
            (Self::Float64(v), Value::Float64(x)) => v.push(x),
            (Self::Text(v), Value::Text(x)) | (Self::String(v), Value::String(x)) => v.push(x),
            (Self::Blob(v), Value::Blob(x)) => v.push(x),
            (Self::Date(v), Value::Date(x)) => v.push(x),
            (_, value) => return Err(value),
        }
        Ok(())
    }

    /// The value at `row`, as a strict value.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Self::Boolean(v) => v.get(row).copied().map(Value::Boolean),
            Self::Int32(v) => v.get(row).copied().map(Value::Int32),
            Self::Int64(v) => v.get(row).copied().map(Value::Int64),
            Self::Float32(v) => v.get(row).copied().map(Value::Float32),
            Self::Float64(v) => v.get(row).copied().map(Value::Float64),
            Self::Text(v) => v.get(row).cloned().map(Value::Text),
            Self::String(v) => v.get(row).cloned().map(Value::String),
            Self::Blob(v) => v.get(row).cloned().map(Value::Blob),
            Self::Date(v) => v.get(row).copied().map(Value::Date),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Text(v) | Self::String(v) => v.len(),
            Self::Blob(v) => v.len(),
            Self::Date(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One tablet column: native values plus a null bitmap.
///
/// Null slots hold the type's default so that the value vector stays
/// aligned with the timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TabletColumn {
    pub values: ColumnValues,
    pub nulls: Vec<bool>,
}

impl TabletColumn {
    /// The value at `row`, or `None` if it is null or out of range.
    #[must_use]
    pub fn value(&self, row: usize) -> Option<Value> {
        if self.nulls.get(row).copied().unwrap_or(true) {
            return None;
        }
        self.values.get(row)
    }

    #[must_use]
    pub fn is_null(&self, row: usize) -> bool {
        self.nulls.get(row).copied().unwrap_or(false)
    }
}

/// A fixed-capacity, column-major batch of rows for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Tablet {
    device: DeviceId,
    schema: ColumnSchema,
    capacity: usize,
    timestamps: Vec<i64>,
    columns: Vec<TabletColumn>,
}

impl Tablet {
    /// Create an empty tablet.
    pub fn new(
        device: DeviceId,
        schema: ColumnSchema,
        capacity: usize,
    ) -> Result<Self, PayloadError> {
        if capacity == 0 {
            return Err(PayloadError::ZeroCapacity);
        }
        let columns = schema
            .types()
            .map(|ty| TabletColumn {
                values: ColumnValues::with_capacity(ty, capacity),
                nulls: Vec::with_capacity(capacity),
            })
            .collect();
        Ok(Self {
            device,
            schema,
            capacity,
            timestamps: Vec::with_capacity(capacity),
            columns,
        })
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// - `CapacityExceeded` if the tablet is full.
    /// - `Width` if `values` does not have one cell per column.
    /// - `LiteralInColumnar` if a cell is an inferred literal.
    /// - `TypeViolation` if a strict value does not match its column.
    ///
    /// On error the tablet is unchanged.
    pub fn append(&mut self, timestamp: i64, values: Vec<CoercedValue>) -> Result<(), PayloadError> {
        if self.is_full() {
            return Err(PayloadError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if values.len() != self.schema.len() {
            return Err(PayloadError::Width {
                expected: self.schema.len(),
                actual: values.len(),
            });
        }

        // Validate the whole row before touching any column.
        for (column, cell) in self.schema.columns().iter().zip(&values) {
            match cell {
                CoercedValue::Absent => {}
                CoercedValue::Strict(value) => value.check(&column.name, column.ty)?,
                CoercedValue::Inferred(_) => {
                    return Err(PayloadError::LiteralInColumnar {
                        column: column.name.clone(),
                    });
                }
            }
        }

        for ((def, column), cell) in self
            .schema
            .columns()
            .iter()
            .zip(&mut self.columns)
            .zip(values)
        {
            let (value, null) = match cell {
                CoercedValue::Strict(value) => (value, false),
                _ => ((coercion(def.ty).default)(), true),
            };
            column.values.push(value).map_err(|value| {
                PayloadError::TypeViolation(crate::types::TypeViolation {
                    column: def.name.clone(),
                    declared: def.ty,
                    actual: value.representation(),
                })
            })?;
            column.nulls.push(null);
        }
        self.timestamps.push(timestamp);
        Ok(())
    }

    #[must_use]
    pub const fn device(&self) -> &DeviceId {
        &self.device
    }

    #[must_use]
    pub const fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// The explicit row count.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.timestamps.len() >= self.capacity
    }

    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    #[must_use]
    pub fn columns(&self) -> &[TabletColumn] {
        &self.columns
    }

    /// Rows with at least one non-null cell.
    #[must_use]
    pub fn persisted_rows(&self) -> usize {
        (0..self.row_count())
            .filter(|&row| self.columns.iter().any(|c| !c.is_null(row)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeViolation;

    fn tablet(capacity: usize) -> Tablet {
        Tablet::new(
            DeviceId::parse("root.sg.d1").unwrap(),
            ColumnSchema::from_pairs([
                ("flag", SemanticType::Boolean),
                ("at", SemanticType::Timestamp),
                ("name", SemanticType::String),
            ])
            .unwrap(),
            capacity,
        )
        .unwrap()
    }

    fn strict(values: Vec<Value>) -> Vec<CoercedValue> {
        values.into_iter().map(CoercedValue::Strict).collect()
    }

    #[test]
    fn test_append_stores_column_major() {
        let mut t = tablet(4);
        t.append(
            1,
            strict(vec![
                Value::Boolean(true),
                Value::Int64(10),
                Value::String("a".to_string()),
            ]),
        )
        .unwrap();
        t.append(
            2,
            vec![
                CoercedValue::Absent,
                CoercedValue::Strict(Value::Int64(20)),
                CoercedValue::Absent,
            ],
        )
        .unwrap();

        assert_eq!(t.row_count(), 2);
        assert_eq!(t.timestamps(), [1, 2]);
        assert_eq!(t.columns()[0].values, ColumnValues::Boolean(vec![true, false]));
        assert_eq!(t.columns()[0].nulls, vec![false, true]);
        assert_eq!(t.columns()[1].value(1), Some(Value::Int64(20)));
        assert_eq!(t.columns()[2].value(1), None);
        for column in t.columns() {
            assert_eq!(column.values.len(), t.row_count());
            assert_eq!(column.nulls.len(), t.row_count());
        }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut t = tablet(1);
        let row = || {
            strict(vec![
                Value::Boolean(false),
                Value::Int64(0),
                Value::String(String::new()),
            ])
        };
        t.append(0, row()).unwrap();
        assert!(t.is_full());
        assert_eq!(
            t.append(1, row()).unwrap_err(),
            PayloadError::CapacityExceeded { capacity: 1 }
        );
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Tablet::new(
            DeviceId::parse("root.sg.d1").unwrap(),
            ColumnSchema::single("s1", SemanticType::Int32),
            0,
        )
        .unwrap_err();
        assert_eq!(err, PayloadError::ZeroCapacity);
    }

    #[test]
    fn test_type_violation_leaves_tablet_unchanged() {
        let mut t = tablet(4);
        let err = t
            .append(
                1,
                strict(vec![
                    Value::Boolean(true),
                    Value::Int32(10),
                    Value::String("a".to_string()),
                ]),
            )
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::TypeViolation(TypeViolation {
                column: "at".to_string(),
                declared: SemanticType::Timestamp,
                actual: SemanticType::Int32,
            })
        );
        assert!(t.is_empty());
        assert!(t.columns().iter().all(|c| c.values.is_empty() && c.nulls.is_empty()));
    }

    #[test]
    fn test_literals_rejected() {
        let mut t = tablet(4);
        let err = t
            .append(
                1,
                vec![
                    CoercedValue::Inferred("true".to_string()),
                    CoercedValue::Absent,
                    CoercedValue::Absent,
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::LiteralInColumnar {
                column: "flag".to_string()
            }
        );
    }

    #[test]
    fn test_persisted_rows_skip_all_null() {
        let mut t = tablet(4);
        t.append(1, vec![CoercedValue::Absent; 3]).unwrap();
        t.append(
            2,
            vec![
                CoercedValue::Strict(Value::Boolean(true)),
                CoercedValue::Absent,
                CoercedValue::Absent,
            ],
        )
        .unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.persisted_rows(), 1);
    }
}
