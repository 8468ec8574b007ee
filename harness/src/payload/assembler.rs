use std::collections::BTreeMap;

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercedRow, CoercionMode};
use crate::payload::{PayloadError, Record, Tablet, WritePayload};
use crate::types::DeviceId;

/// Builders for the four payload shapes.
///
/// Every builder consumes its rows; each record or tablet row gets its own
/// buffer.
pub struct PayloadAssembler;

impl PayloadAssembler {
    /// One record for one device.
    pub fn single_record(row: CoercedRow) -> Result<WritePayload, PayloadError> {
        let device = row.device.clone();
        let record = Record::from_row(row)?;
        Ok(WritePayload::SingleRecord { device, record })
    }

    /// Many records, each for its own device.
    pub fn multi_record(rows: Vec<CoercedRow>) -> Result<WritePayload, PayloadError> {
        if rows.is_empty() {
            return Err(PayloadError::Empty);
        }
        let mut devices = Vec::with_capacity(rows.len());
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            devices.push(row.device.clone());
            records.push(Record::from_row(row)?);
        }
        check_single_mode(&records)?;
        Ok(WritePayload::MultiRecord { devices, records })
    }

    /// Many records for `device`.
    pub fn one_device_batch(
        device: &DeviceId,
        rows: Vec<CoercedRow>,
    ) -> Result<WritePayload, PayloadError> {
        if rows.is_empty() {
            return Err(PayloadError::Empty);
        }
        let records = rows
            .into_iter()
            .map(|row| {
                if &row.device != device {
                    return Err(PayloadError::DeviceMismatch {
                        expected: device.clone(),
                        actual: row.device,
                    });
                }
                Record::from_row(row)
            })
            .collect::<Result<Vec<_>, _>>()?;
        check_single_mode(&records)?;
        Ok(WritePayload::OneDeviceBatch {
            device: device.clone(),
            records,
        })
    }

    /// Columnar payloads of at most `capacity` rows per tablet.
    ///
    /// Rows are grouped by device, one tablet per device. Each tablet that
    /// fills up is returned as its own payload; the partly filled remainders
    /// of all devices form the last payload, keyed by device path.
    pub fn columnar_batch(
        rows: Vec<CoercedRow>,
        capacity: usize,
    ) -> Result<Vec<WritePayload>, PayloadError> {
        if capacity == 0 {
            return Err(PayloadError::ZeroCapacity);
        }
        if rows.is_empty() {
            return Err(PayloadError::Empty);
        }

        let mut payloads = Vec::new();
        let mut open: BTreeMap<String, Tablet> = BTreeMap::new();
        for row in rows {
            let key = row.device.as_str().to_string();
            let mut tablet = match open.remove(&key) {
                Some(tablet) => {
                    check_schema(&tablet, &row.device, &row.schema)?;
                    tablet
                }
                None => Tablet::new(row.device.clone(), row.schema.clone(), capacity)?,
            };
            tablet.append(row.timestamp, row.values)?;
            if tablet.is_full() {
                payloads.push(WritePayload::ColumnarBatch {
                    tablets: BTreeMap::from([(key, tablet)]),
                });
            } else {
                open.insert(key, tablet);
            }
        }
        if !open.is_empty() {
            payloads.push(WritePayload::ColumnarBatch { tablets: open });
        }
        Ok(payloads)
    }

    /// One columnar payload from prebuilt tablets, keyed by device path.
    pub fn columnar_from_tablets(
        tablets: impl IntoIterator<Item = Tablet>,
    ) -> Result<WritePayload, PayloadError> {
        let mut keyed = BTreeMap::new();
        for tablet in tablets {
            let key = tablet.device().as_str().to_string();
            if keyed.contains_key(&key) {
                return Err(PayloadError::DuplicateTablet {
                    device: tablet.device().clone(),
                });
            }
            keyed.insert(key, tablet);
        }
        if keyed.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(WritePayload::ColumnarBatch { tablets: keyed })
    }
}

fn check_single_mode(records: &[Record]) -> Result<(), PayloadError> {
    let mut modes = records
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| r.values.mode());
    let first: Option<CoercionMode> = modes.next();
    match first {
        Some(mode) if modes.any(|m| m != mode) => Err(PayloadError::MixedModes),
        _ => Ok(()),
    }
}

fn check_schema(
    tablet: &Tablet,
    device: &DeviceId,
    schema: &ColumnSchema,
) -> Result<(), PayloadError> {
    if tablet.schema() == schema {
        Ok(())
    } else {
        Err(PayloadError::SchemaMismatch {
            device: device.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::CoercedValue;
    use crate::payload::{EntryPoint, RecordValues};
    use crate::types::{SemanticType, Value};

    fn schema() -> ColumnSchema {
        ColumnSchema::from_pairs([("s1", SemanticType::Int32), ("s2", SemanticType::Text)]).unwrap()
    }

    fn device(path: &str) -> DeviceId {
        DeviceId::parse(path).unwrap()
    }

    fn strict_row(path: &str, timestamp: i64, n: i32) -> CoercedRow {
        CoercedRow {
            device: device(path),
            timestamp,
            schema: schema(),
            values: vec![
                CoercedValue::Strict(Value::Int32(n)),
                CoercedValue::Strict(Value::Text(format!("v{n}"))),
            ],
        }
    }

    fn inferred_row(path: &str, timestamp: i64) -> CoercedRow {
        CoercedRow {
            device: device(path),
            timestamp,
            schema: schema(),
            values: vec![
                CoercedValue::Inferred("1".to_string()),
                CoercedValue::Inferred("'x'".to_string()),
            ],
        }
    }

    #[test]
    fn test_single_record() {
        let payload = PayloadAssembler::single_record(strict_row("root.sg.d1", 3, 7)).unwrap();
        assert_eq!(payload.entry_point(), EntryPoint::SingleRecord);
        let WritePayload::SingleRecord { device: d, record } = payload else {
            panic!("wrong shape");
        };
        assert_eq!(d, device("root.sg.d1"));
        assert_eq!(record.timestamp, 3);
        assert_eq!(
            record.values,
            RecordValues::Strict(vec![Value::Int32(7), Value::Text("v7".to_string())])
        );
    }

    #[test]
    fn test_extra_values_are_not_dropped() {
        let mut row = strict_row("root.sg.d1", 3, 7);
        row.values.push(CoercedValue::Strict(Value::Int32(8)));
        assert_eq!(
            PayloadAssembler::single_record(row).unwrap_err(),
            PayloadError::Width {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_multi_record_keeps_device_per_row() {
        let payload = PayloadAssembler::multi_record(vec![
            strict_row("root.sg.d1", 1, 1),
            strict_row("root.sg.d2", 1, 2),
            strict_row("root.sg.d1", 2, 3),
        ])
        .unwrap();
        assert_eq!(payload.row_count(), 3);
        assert_eq!(payload.devices(), [device("root.sg.d1"), device("root.sg.d2")]);
    }

    #[test]
    fn test_multi_record_rejects_mixed_modes() {
        let err = PayloadAssembler::multi_record(vec![
            strict_row("root.sg.d1", 1, 1),
            inferred_row("root.sg.d1", 2),
        ])
        .unwrap_err();
        assert_eq!(err, PayloadError::MixedModes);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(
            PayloadAssembler::multi_record(Vec::new()).unwrap_err(),
            PayloadError::Empty
        );
        assert_eq!(
            PayloadAssembler::one_device_batch(&device("root.sg.d1"), Vec::new()).unwrap_err(),
            PayloadError::Empty
        );
        assert_eq!(
            PayloadAssembler::columnar_batch(Vec::new(), 4).unwrap_err(),
            PayloadError::Empty
        );
        assert_eq!(
            PayloadAssembler::columnar_from_tablets(Vec::new()).unwrap_err(),
            PayloadError::Empty
        );
    }

    #[test]
    fn test_one_device_batch_rejects_other_devices() {
        let err = PayloadAssembler::one_device_batch(
            &device("root.sg.d1"),
            vec![strict_row("root.sg.d1", 1, 1), strict_row("root.sg.d2", 2, 2)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PayloadError::DeviceMismatch {
                expected: device("root.sg.d1"),
                actual: device("root.sg.d2"),
            }
        );
    }

    #[test]
    fn test_one_device_batch_inferred() {
        let payload = PayloadAssembler::one_device_batch(
            &device("root.sg.d1"),
            vec![inferred_row("root.sg.d1", 1), inferred_row("root.sg.d1", 2)],
        )
        .unwrap();
        assert_eq!(payload.mode(), CoercionMode::Inferred);
        assert_eq!(payload.row_count(), 2);
    }

    #[test]
    fn test_columnar_batch_flushes_full_tablets() {
        let rows = (0..5).map(|i| strict_row("root.sg.d1", i, 0)).collect();
        let payloads = PayloadAssembler::columnar_batch(rows, 2).unwrap();
        let counts: Vec<usize> = payloads.iter().map(WritePayload::row_count).collect();
        assert_eq!(counts, [2, 2, 1]);
        assert!(payloads.iter().all(|p| p.entry_point() == EntryPoint::ColumnarBatch));
    }

    #[test]
    fn test_columnar_batch_one_tablet_per_device() {
        let rows = vec![
            strict_row("root.sg.d1", 1, 1),
            strict_row("root.sg.d2", 1, 2),
            strict_row("root.sg.d1", 2, 3),
        ];
        let payloads = PayloadAssembler::columnar_batch(rows, 10).unwrap();
        assert_eq!(payloads.len(), 1);
        let WritePayload::ColumnarBatch { tablets } = &payloads[0] else {
            panic!("wrong shape");
        };
        let keys: Vec<&str> = tablets.keys().map(String::as_str).collect();
        assert_eq!(keys, ["root.sg.d1", "root.sg.d2"]);
        assert_eq!(tablets["root.sg.d1"].row_count(), 2);
        assert_eq!(tablets["root.sg.d2"].row_count(), 1);
    }

    #[test]
    fn test_columnar_batch_rejects_literals() {
        let err = PayloadAssembler::columnar_batch(vec![inferred_row("root.sg.d1", 1)], 4)
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::LiteralInColumnar {
                column: "s1".to_string()
            }
        );
        assert_eq!(err.kind(), Some(crate::types::ErrorKind::ClientSideTypeViolation));
    }

    #[test]
    fn test_columnar_batch_rejects_schema_change() {
        let mut other = strict_row("root.sg.d1", 2, 0);
        other.schema = ColumnSchema::from_pairs([
            ("s1", SemanticType::Int32),
            ("s3", SemanticType::Text),
        ])
        .unwrap();
        let err = PayloadAssembler::columnar_batch(vec![strict_row("root.sg.d1", 1, 0), other], 4)
            .unwrap_err();
        assert_eq!(
            err,
            PayloadError::SchemaMismatch {
                device: device("root.sg.d1")
            }
        );
    }

    #[test]
    fn test_columnar_from_tablets_rejects_duplicates() {
        let tablet = || Tablet::new(device("root.sg.d1"), schema(), 2).unwrap();
        let err = PayloadAssembler::columnar_from_tablets([tablet(), tablet()]).unwrap_err();
        assert_eq!(
            err,
            PayloadError::DuplicateTablet {
                device: device("root.sg.d1")
            }
        );
    }
}
