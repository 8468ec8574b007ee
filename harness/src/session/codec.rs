//! Conversion between payloads and wire messages.
//!
//! Encoding is where client-side type checks happen: a strict record whose
//! value does not match its declared column type is rejected here, before
//! any bytes reach the transport. Decoding is the receiving half, used by
//! the engine.

use std::fmt;

use crate::payload::{PayloadError, Record, RecordValues, Tablet, WritePayload};
use crate::proto;
use crate::types::{SemanticType, Value, ValueError};

/// An encoded write, ready for its entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedWrite {
    Record(proto::InsertRecordRequest),
    Records(proto::InsertRecordsRequest),
    OneDevice(proto::InsertRecordsOfOneDeviceRequest),
    Tablets(proto::InsertTabletsRequest),
}

/// Encode a payload for the wire.
pub fn encode_payload(payload: &WritePayload) -> Result<EncodedWrite, PayloadError> {
    let inferred = payload.mode() == crate::coerce::CoercionMode::Inferred;
    Ok(match payload {
        WritePayload::SingleRecord { device, record } => {
            EncodedWrite::Record(proto::InsertRecordRequest {
                device: device.to_string(),
                row: Some(encode_record(record)?),
                inferred,
            })
        }
        WritePayload::MultiRecord { devices, records } => {
            EncodedWrite::Records(proto::InsertRecordsRequest {
                devices: devices.iter().map(ToString::to_string).collect(),
                rows: records.iter().map(encode_record).collect::<Result<_, _>>()?,
                inferred,
            })
        }
        WritePayload::OneDeviceBatch { device, records } => {
            EncodedWrite::OneDevice(proto::InsertRecordsOfOneDeviceRequest {
                device: device.to_string(),
                rows: records.iter().map(encode_record).collect::<Result<_, _>>()?,
                inferred,
            })
        }
        WritePayload::ColumnarBatch { tablets } => {
            EncodedWrite::Tablets(proto::InsertTabletsRequest {
                tablets: tablets
                    .iter()
                    .map(|(name, tablet)| encode_tablet(name, tablet))
                    .collect::<Result<_, _>>()?,
            })
        }
    })
}

fn encode_record(record: &Record) -> Result<proto::Row, PayloadError> {
    let mut row = proto::Row {
        timestamp: record.timestamp,
        measurements: record.columns.clone(),
        ..proto::Row::default()
    };
    match &record.values {
        RecordValues::Strict(values) => {
            for ((column, ty), value) in record.columns.iter().zip(&record.types).zip(values) {
                value.check(column, *ty)?;
                row.types.push(i32::from(ty.tag()));
                value.write_tagged(&mut row.values);
            }
        }
        RecordValues::Inferred(literals) => row.literals.clone_from(literals),
    }
    Ok(row)
}

fn encode_tablet(name: &str, tablet: &Tablet) -> Result<proto::InsertTabletRequest, PayloadError> {
    let rows = tablet.row_count();
    let row_count = u32::try_from(rows).map_err(|_| PayloadError::CapacityExceeded {
        capacity: tablet.capacity(),
    })?;
    let columns = tablet
        .schema()
        .columns()
        .iter()
        .zip(tablet.columns())
        .map(|(def, column)| {
            let mut values = Vec::new();
            let mut null_bitmap = vec![0u8; rows.div_ceil(8)];
            for row in 0..rows {
                match column.value(row) {
                    Some(value) => value.write_untagged(&mut values),
                    None => null_bitmap[row / 8] |= 1 << (row % 8),
                }
            }
            proto::TabletColumn {
                measurement: def.name.clone(),
                data_type: i32::from(def.ty.tag()),
                values,
                null_bitmap,
            }
        })
        .collect();
    Ok(proto::InsertTabletRequest {
        name: name.to_string(),
        device: tablet.device().to_string(),
        timestamps: tablet.timestamps().to_vec(),
        columns,
        row_count,
    })
}

// =============================================================================
// Decoding
// =============================================================================

/// Errors decoding a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnknownType(i32),
    Value(ValueError),
    /// A value's tag does not belong to the column's declared type.
    TagMismatch {
        column: String,
        declared: SemanticType,
        actual: SemanticType,
    },
    /// Parallel lists have different lengths.
    Misaligned { what: &'static str },
    /// Bytes remain after the last value.
    TrailingValues(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(tag) => write!(f, "unknown data type {tag}"),
            Self::Value(e) => write!(f, "bad value encoding: {e}"),
            Self::TagMismatch {
                column,
                declared,
                actual,
            } => write!(f, "column '{column}' is declared {declared}, got a {actual} value"),
            Self::Misaligned { what } => write!(f, "misaligned {what}"),
            Self::TrailingValues(n) => write!(f, "{n} bytes after the last value"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Value(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValueError> for DecodeError {
    fn from(e: ValueError) -> Self {
        Self::Value(e)
    }
}

fn data_type(raw: i32) -> Result<SemanticType, DecodeError> {
    u8::try_from(raw)
        .ok()
        .and_then(|tag| SemanticType::try_from(tag).ok())
        .ok_or(DecodeError::UnknownType(raw))
}

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Typed {
        column: String,
        ty: SemanticType,
        value: Value,
    },
    Literal {
        column: String,
        literal: String,
    },
}

impl Cell {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Typed { column, .. } | Self::Literal { column, .. } => column,
        }
    }
}

/// One decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    pub timestamp: i64,
    pub cells: Vec<Cell>,
}

/// Decode a record row.
pub fn decode_row(row: &proto::Row, inferred: bool) -> Result<DecodedRow, DecodeError> {
    let cells = if inferred {
        if row.literals.len() != row.measurements.len() {
            return Err(DecodeError::Misaligned { what: "literals" });
        }
        row.measurements
            .iter()
            .zip(&row.literals)
            .map(|(column, literal)| Cell::Literal {
                column: column.clone(),
                literal: literal.clone(),
            })
            .collect()
    } else {
        if row.types.len() != row.measurements.len() {
            return Err(DecodeError::Misaligned { what: "types" });
        }
        let mut cells = Vec::with_capacity(row.measurements.len());
        let mut offset = 0;
        for (column, raw) in row.measurements.iter().zip(&row.types) {
            let ty = data_type(*raw)?;
            let (value, consumed) = Value::read_tagged(&row.values[offset..])?;
            offset += consumed;
            if !value.matches(ty) {
                return Err(DecodeError::TagMismatch {
                    column: column.clone(),
                    declared: ty,
                    actual: value.representation(),
                });
            }
            cells.push(Cell::Typed {
                column: column.clone(),
                ty,
                value,
            });
        }
        if offset != row.values.len() {
            return Err(DecodeError::TrailingValues(row.values.len() - offset));
        }
        cells
    };
    Ok(DecodedRow {
        timestamp: row.timestamp,
        cells,
    })
}

/// Decode a tablet into rows. Null cells are omitted.
pub fn decode_tablet(tablet: &proto::InsertTabletRequest) -> Result<Vec<DecodedRow>, DecodeError> {
    let rows = tablet.row_count as usize;
    if tablet.timestamps.len() != rows {
        return Err(DecodeError::Misaligned {
            what: "timestamps",
        });
    }
    let mut out: Vec<DecodedRow> = tablet
        .timestamps
        .iter()
        .map(|&timestamp| DecodedRow {
            timestamp,
            cells: Vec::new(),
        })
        .collect();

    for column in &tablet.columns {
        let ty = data_type(column.data_type)?;
        if column.null_bitmap.len() != rows.div_ceil(8) {
            return Err(DecodeError::Misaligned {
                what: "null bitmap",
            });
        }
        let mut offset = 0;
        for (index, row) in out.iter_mut().enumerate() {
            if column.null_bitmap[index / 8] & (1 << (index % 8)) != 0 {
                continue;
            }
            let (value, consumed) = Value::read_untagged(ty, &column.values[offset..])?;
            offset += consumed;
            row.cells.push(Cell::Typed {
                column: column.measurement.clone(),
                ty,
                value,
            });
        }
        if offset != column.values.len() {
            return Err(DecodeError::TrailingValues(column.values.len() - offset));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSchema;
    use crate::coerce::{CoercedRow, CoercedValue};
    use crate::payload::PayloadAssembler;
    use crate::types::{DeviceId, TypeViolation};

    fn row(schema: ColumnSchema, values: Vec<CoercedValue>) -> CoercedRow {
        CoercedRow {
            device: DeviceId::parse("root.sg.d1").unwrap(),
            timestamp: 4,
            schema,
            values,
        }
    }

    #[test]
    fn test_strict_record_round_trip() {
        let schema = ColumnSchema::from_pairs([
            ("a", SemanticType::Timestamp),
            ("b", SemanticType::Blob),
        ])
        .unwrap();
        let payload = PayloadAssembler::single_record(row(
            schema,
            vec![
                CoercedValue::Strict(Value::Int64(9)),
                CoercedValue::Strict(Value::Blob(vec![1, 2])),
            ],
        ))
        .unwrap();
        let EncodedWrite::Record(request) = encode_payload(&payload).unwrap() else {
            panic!("wrong request");
        };
        assert_eq!(request.device, "root.sg.d1");
        assert!(!request.inferred);
        let row = request.row.unwrap();
        assert_eq!(row.types, [8, 10]);

        let decoded = decode_row(&row, false).unwrap();
        assert_eq!(decoded.timestamp, 4);
        assert_eq!(
            decoded.cells,
            vec![
                Cell::Typed {
                    column: "a".to_string(),
                    ty: SemanticType::Timestamp,
                    value: Value::Int64(9),
                },
                Cell::Typed {
                    column: "b".to_string(),
                    ty: SemanticType::Blob,
                    value: Value::Blob(vec![1, 2]),
                },
            ]
        );
    }

    #[test]
    fn test_mismatched_strict_value_rejected_while_encoding() {
        let payload = PayloadAssembler::single_record(row(
            ColumnSchema::single("s1", SemanticType::Date),
            vec![CoercedValue::Strict(Value::Int32(20_240_601))],
        ))
        .unwrap();
        assert_eq!(
            encode_payload(&payload).unwrap_err(),
            PayloadError::TypeViolation(TypeViolation {
                column: "s1".to_string(),
                declared: SemanticType::Date,
                actual: SemanticType::Int32,
            })
        );
    }

    #[test]
    fn test_inferred_record_carries_literals_only() {
        let payload = PayloadAssembler::single_record(row(
            ColumnSchema::single("s1", SemanticType::Int64),
            vec![CoercedValue::Inferred("5L".to_string())],
        ))
        .unwrap();
        let EncodedWrite::Record(request) = encode_payload(&payload).unwrap() else {
            panic!("wrong request");
        };
        assert!(request.inferred);
        let row = request.row.unwrap();
        assert!(row.types.is_empty() && row.values.is_empty());
        assert_eq!(row.literals, ["5L"]);
        let decoded = decode_row(&row, true).unwrap();
        assert_eq!(
            decoded.cells,
            vec![Cell::Literal {
                column: "s1".to_string(),
                literal: "5L".to_string()
            }]
        );
    }

    #[test]
    fn test_tablet_round_trip_with_nulls() {
        let schema = ColumnSchema::from_pairs([
            ("s1", SemanticType::Int32),
            ("s2", SemanticType::String),
        ])
        .unwrap();
        let rows = (0..10)
            .map(|i| {
                let mut r = row(
                    schema.clone(),
                    vec![
                        CoercedValue::Strict(Value::Int32(i)),
                        if i % 3 == 0 {
                            CoercedValue::Absent
                        } else {
                            CoercedValue::Strict(Value::String(format!("s{i}")))
                        },
                    ],
                );
                r.timestamp = i64::from(i);
                r
            })
            .collect();
        let payloads = PayloadAssembler::columnar_batch(rows, 16).unwrap();
        let EncodedWrite::Tablets(request) = encode_payload(&payloads[0]).unwrap() else {
            panic!("wrong request");
        };
        let tablet = &request.tablets[0];
        assert_eq!(tablet.name, "root.sg.d1");
        assert_eq!(tablet.row_count, 10);
        assert_eq!(tablet.columns[1].null_bitmap, [0b0100_1001, 0b0000_0010]);

        let decoded = decode_tablet(tablet).unwrap();
        assert_eq!(decoded.len(), 10);
        assert_eq!(decoded[3].cells.len(), 1);
        assert_eq!(decoded[4].cells.len(), 2);
        assert_eq!(
            decoded[4].cells[1],
            Cell::Typed {
                column: "s2".to_string(),
                ty: SemanticType::String,
                value: Value::String("s4".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_rejects_tag_mismatch() {
        let mut values = Vec::new();
        Value::Int32(1).write_tagged(&mut values);
        let row = proto::Row {
            timestamp: 0,
            measurements: vec!["s1".to_string()],
            types: vec![i32::from(SemanticType::Float64.tag())],
            values,
            literals: Vec::new(),
        };
        assert!(matches!(
            decode_row(&row, false),
            Err(DecodeError::TagMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let row = proto::Row {
            timestamp: 0,
            measurements: vec!["s1".to_string()],
            types: vec![42],
            values: vec![42, 0],
            literals: Vec::new(),
        };
        assert_eq!(decode_row(&row, false), Err(DecodeError::UnknownType(42)));
    }
}
