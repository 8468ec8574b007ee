//! Per-device point storage for the in-memory engine.

use std::collections::BTreeMap;

use crate::types::{SemanticType, Value};

/// A column declared with one type and requested with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConflict {
    pub column: String,
    pub declared: SemanticType,
    pub requested: SemanticType,
}

/// The columns and points of one device.
///
/// Points are keyed by timestamp. Writing at an existing timestamp merges
/// the new cells into the stored point.
#[derive(Debug, Default, Clone)]
pub struct DeviceSeries {
    columns: BTreeMap<String, SemanticType>,
    points: BTreeMap<i64, BTreeMap<String, Value>>,
}

impl DeviceSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn column_type(&self, column: &str) -> Option<SemanticType> {
        self.columns.get(column).copied()
    }

    /// Declare a column. Redeclaring with the same type is a no-op.
    pub fn declare(&mut self, column: &str, ty: SemanticType) -> Result<(), ColumnConflict> {
        match self.columns.get(column) {
            Some(&declared) if declared != ty => Err(ColumnConflict {
                column: column.to_string(),
                declared,
                requested: ty,
            }),
            Some(_) => Ok(()),
            None => {
                self.columns.insert(column.to_string(), ty);
                Ok(())
            }
        }
    }

    /// Store cells at `timestamp`. Nothing is stored for an empty row.
    pub fn insert(&mut self, timestamp: i64, cells: impl IntoIterator<Item = (String, Value)>) {
        let mut cells = cells.into_iter().peekable();
        if cells.peek().is_none() {
            return;
        }
        self.points.entry(timestamp).or_default().extend(cells);
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn point(&self, timestamp: i64) -> Option<&BTreeMap<String, Value>> {
        self.points.get(&timestamp)
    }

    /// Remove every point at or before `before`. Returns how many were
    /// removed.
    pub fn delete_through(&mut self, before: i64) -> usize {
        let kept = match before.checked_add(1) {
            Some(first_kept) => self.points.split_off(&first_kept),
            None => BTreeMap::new(),
        };
        let removed = self.points.len();
        self.points = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(column: &str, n: i32) -> (String, Value) {
        (column.to_string(), Value::Int32(n))
    }

    #[test]
    fn test_points_merge_by_timestamp() {
        let mut series = DeviceSeries::new();
        series.insert(1, [cell("a", 1)]);
        series.insert(1, [cell("b", 2)]);
        series.insert(2, [cell("a", 3)]);
        assert_eq!(series.point_count(), 2);
        assert_eq!(series.point(1).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_insert_stores_nothing() {
        let mut series = DeviceSeries::new();
        series.insert(1, std::iter::empty());
        assert_eq!(series.point_count(), 0);
    }

    #[test]
    fn test_delete_through_is_inclusive() {
        let mut series = DeviceSeries::new();
        for ts in [-5, 0, 5, 10] {
            series.insert(ts, [cell("a", 0)]);
        }
        assert_eq!(series.delete_through(5), 3);
        assert_eq!(series.point_count(), 1);
        assert!(series.point(10).is_some());
        assert_eq!(series.delete_through(i64::MAX), 1);
        assert_eq!(series.delete_through(i64::MAX), 0);
    }

    #[test]
    fn test_declare_conflicts() {
        let mut series = DeviceSeries::new();
        series.declare("a", SemanticType::Int32).unwrap();
        series.declare("a", SemanticType::Int32).unwrap();
        assert_eq!(
            series.declare("a", SemanticType::Int64),
            Err(ColumnConflict {
                column: "a".to_string(),
                declared: SemanticType::Int32,
                requested: SemanticType::Int64,
            })
        );
        assert_eq!(series.column_type("a"), Some(SemanticType::Int32));
    }
}
