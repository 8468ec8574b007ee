//! An in-memory engine speaking the wire protocol.
//!
//! `MemoryEngine` implements `Transport`, so a `RemoteSession` can run
//! every scenario against it without a network. It enforces the rules the
//! harness relies on:
//!
//! - Devices must live under a created namespace.
//! - Declared column types are fixed; strict writes auto-declare undeclared
//!   columns from their type tags, inferred writes parse each literal under
//!   the declared type or infer a type for undeclared columns.
//! - Points are keyed by timestamp; rows without cells store nothing.
//! - A multi-row request is validated in full before any row is applied.
//!
//! Faults can be injected at the transport boundary from a seeded RNG.

use std::collections::{BTreeMap, BTreeSet};

use prost::Message;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::proto::google::rpc::{Code, Status};
use crate::proto::{self, request};
use crate::session::codec::{self, Cell, DecodedRow};
use crate::session::{Transport, TransportError, frame};
use crate::simulation::series::DeviceSeries;
use crate::types::{DeviceId, Namespace, SemanticType, Value};

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability that a round trip fails before reaching the engine
    /// (0.0 - 1.0).
    pub transport_error_rate: f64,
    /// Probability that a response frame has a bit flipped (0.0 - 1.0).
    pub corruption_rate: f64,
}

impl FaultConfig {
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Every round trip fails.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            transport_error_rate: 1.0,
            corruption_rate: 0.0,
        }
    }
}

/// Counters for engine activity.
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    pub requests: u64,
    pub rejected: u64,
    pub rows_applied: u64,
    pub injected_transport_errors: u64,
    pub corrupted_responses: u64,
}

struct Rejection {
    code: Code,
    message: String,
}

impl Rejection {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: Code::InvalidArgument,
            message: message.into(),
        }
    }
}

/// In-memory engine for deterministic testing.
pub struct MemoryEngine {
    namespaces: BTreeSet<Namespace>,
    devices: BTreeMap<DeviceId, DeviceSeries>,
    fault_config: FaultConfig,
    rng: StdRng,
    stats: EngineStats,
}

impl MemoryEngine {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            namespaces: BTreeSet::new(),
            devices: BTreeMap::new(),
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: EngineStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub const fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// Stored points for `device`; zero for unknown devices.
    #[must_use]
    pub fn point_count(&self, device: &DeviceId) -> usize {
        self.devices.get(device).map_or(0, DeviceSeries::point_count)
    }

    #[must_use]
    pub fn point(&self, device: &DeviceId, timestamp: i64) -> Option<&BTreeMap<String, Value>> {
        self.devices.get(device)?.point(timestamp)
    }

    #[must_use]
    pub fn column_type(&self, device: &DeviceId, column: &str) -> Option<SemanticType> {
        self.devices.get(device)?.column_type(column)
    }

    #[must_use]
    pub fn has_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Execute one request.
    pub fn handle(&mut self, request: proto::Request) -> proto::Response {
        self.stats.requests += 1;
        let result = match request.payload {
            Some(payload) => self.execute(payload),
            None => Err(Rejection::invalid("request has no payload")),
        };
        let (status, count) = match result {
            Ok(count) => (
                Status {
                    code: Code::Ok.into(),
                    message: String::new(),
                },
                count,
            ),
            Err(rejection) => {
                self.stats.rejected += 1;
                tracing::debug!(
                    "engine rejected request {}: {}",
                    request.request_id,
                    rejection.message
                );
                (
                    Status {
                        code: rejection.code.into(),
                        message: rejection.message,
                    },
                    0,
                )
            }
        };
        proto::Response {
            request_id: request.request_id,
            status: Some(status),
            count,
        }
    }

    fn execute(&mut self, payload: request::Payload) -> Result<i64, Rejection> {
        match payload {
            request::Payload::InsertRecord(req) => {
                let row = req
                    .row
                    .as_ref()
                    .ok_or_else(|| Rejection::invalid("record request has no row"))?;
                let row = decode_row(row, req.inferred)?;
                self.write(vec![(req.device, row)])?;
            }
            request::Payload::InsertRecords(req) => {
                if req.devices.len() != req.rows.len() {
                    return Err(Rejection::invalid(format!(
                        "{} devices for {} rows",
                        req.devices.len(),
                        req.rows.len()
                    )));
                }
                let rows = req
                    .rows
                    .iter()
                    .map(|row| decode_row(row, req.inferred))
                    .collect::<Result<Vec<_>, _>>()?;
                self.write(req.devices.into_iter().zip(rows).collect())?;
            }
            request::Payload::InsertRecordsOfOneDevice(req) => {
                let rows = req
                    .rows
                    .iter()
                    .map(|row| Ok((req.device.clone(), decode_row(row, req.inferred)?)))
                    .collect::<Result<Vec<_>, Rejection>>()?;
                self.write(rows)?;
            }
            request::Payload::InsertTablets(req) => {
                let mut rows = Vec::new();
                for tablet in &req.tablets {
                    let decoded = codec::decode_tablet(tablet)
                        .map_err(|e| Rejection::invalid(format!("tablet {}: {e}", tablet.name)))?;
                    rows.extend(decoded.into_iter().map(|row| (tablet.device.clone(), row)));
                }
                self.write(rows)?;
            }
            request::Payload::CountRows(req) => {
                let count = self.count_rows(&req.target)?;
                return Ok(i64::try_from(count).unwrap_or(i64::MAX));
            }
            request::Payload::DeleteData(req) => {
                let device = parse_device(&req.device)?;
                if let Some(series) = self.devices.get_mut(&device) {
                    let removed = series.delete_through(req.before_timestamp);
                    tracing::debug!("deleted {removed} points from {device}");
                }
            }
            request::Payload::CreateNamespace(req) => {
                let namespace = parse_namespace(&req.namespace)?;
                self.namespaces.insert(namespace);
            }
            request::Payload::DropNamespace(req) => {
                let namespace = parse_namespace(&req.namespace)?;
                if !self.namespaces.remove(&namespace) {
                    return Err(Rejection {
                        code: Code::NotFound,
                        message: format!("namespace {namespace} does not exist"),
                    });
                }
                self.devices.retain(|device, _| !namespace.contains(device));
            }
            request::Payload::DeclareColumns(req) => self.declare_columns(&req)?,
        }
        Ok(0)
    }

    fn writable_device(&self, path: &str) -> Result<DeviceId, Rejection> {
        let device = parse_device(path)?;
        if self.namespaces.iter().any(|ns| ns.contains(&device)) {
            Ok(device)
        } else {
            Err(Rejection {
                code: Code::FailedPrecondition,
                message: format!("{device} is not under any namespace"),
            })
        }
    }

    fn declared_type(&self, device: &DeviceId, column: &str) -> Option<SemanticType> {
        self.devices.get(device)?.column_type(column)
    }

    fn declare_columns(&mut self, req: &proto::DeclareColumnsRequest) -> Result<(), Rejection> {
        let device = self.writable_device(&req.device)?;
        let mut staged: BTreeMap<&str, SemanticType> = BTreeMap::new();
        for column in &req.columns {
            let ty = data_type(column.data_type)?;
            let declared = self
                .declared_type(&device, &column.measurement)
                .or_else(|| staged.get(column.measurement.as_str()).copied());
            if let Some(declared) = declared.filter(|d| *d != ty) {
                return Err(Rejection::invalid(format!(
                    "column '{}' of {device} is already declared {declared}, not {ty}",
                    column.measurement
                )));
            }
            staged.insert(&column.measurement, ty);
        }

        let series = self.devices.entry(device).or_default();
        for (column, ty) in staged {
            series
                .declare(column, ty)
                .map_err(|c| Rejection::invalid(format!("column '{}' conflicts", c.column)))?;
        }
        Ok(())
    }

    /// Validate every row, then apply them all.
    fn write(&mut self, rows: Vec<(String, DecodedRow)>) -> Result<(), Rejection> {
        let mut new_columns: BTreeMap<(DeviceId, String), SemanticType> = BTreeMap::new();
        let mut staged = Vec::with_capacity(rows.len());

        for (path, row) in rows {
            let device = self.writable_device(&path)?;
            let mut cells = Vec::with_capacity(row.cells.len());
            for cell in row.cells {
                let declared = self.declared_type(&device, cell.column()).or_else(|| {
                    new_columns
                        .get(&(device.clone(), cell.column().to_string()))
                        .copied()
                });
                let (column, ty, value) = match cell {
                    Cell::Typed { column, ty, value } => match declared {
                        Some(d) if d.representation() != ty.representation() => {
                            return Err(Rejection::invalid(format!(
                                "column '{column}' of {device} is declared {d}, got {ty}"
                            )));
                        }
                        Some(d) => (column, d, value),
                        None => (column, ty, value),
                    },
                    Cell::Literal { column, literal } => match declared {
                        Some(d) => {
                            let value = Value::parse_literal(d, &literal).map_err(|e| {
                                Rejection::invalid(format!("column '{column}' of {device}: {e}"))
                            })?;
                            (column, d, value)
                        }
                        None => {
                            let (ty, value) = Value::infer_literal(&literal).ok_or_else(|| {
                                Rejection::invalid(format!(
                                    "column '{column}' of {device}: cannot infer a type for '{literal}'"
                                ))
                            })?;
                            (column, ty, value)
                        }
                    },
                };
                if declared.is_none() {
                    new_columns.insert((device.clone(), column.clone()), ty);
                }
                cells.push((column, value));
            }
            staged.push((device, row.timestamp, cells));
        }

        for ((device, column), ty) in new_columns {
            self.devices
                .entry(device)
                .or_default()
                .declare(&column, ty)
                .map_err(|c| Rejection::invalid(format!("column '{}' conflicts", c.column)))?;
        }
        for (device, timestamp, cells) in staged {
            self.stats.rows_applied += 1;
            self.devices
                .entry(device)
                .or_default()
                .insert(timestamp, cells);
        }
        Ok(())
    }

    fn count_rows(&self, target: &str) -> Result<usize, Rejection> {
        if let Some(prefix) = target.strip_suffix(".**") {
            let namespace = parse_namespace(prefix)?;
            return Ok(self
                .devices
                .iter()
                .filter(|(device, _)| namespace.contains(device))
                .map(|(_, series)| series.point_count())
                .sum());
        }
        let device = parse_device(target)?;
        Ok(self.point_count(&device))
    }

    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }
}

impl Transport for MemoryEngine {
    fn round_trip(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        if self.should_inject_fault(self.fault_config.transport_error_rate) {
            self.stats.injected_transport_errors += 1;
            return Err(TransportError::Unavailable(
                "simulated transport error".to_string(),
            ));
        }

        let request = frame::decode(frame)
            .map_err(|e| e.to_string())
            .and_then(|body| proto::Request::decode(body).map_err(|e| e.to_string()));
        let response = match request {
            Ok(request) => self.handle(request),
            Err(reason) => proto::Response {
                request_id: 0,
                status: Some(Status {
                    code: Code::DataLoss.into(),
                    message: format!("unreadable request: {reason}"),
                }),
                count: 0,
            },
        };

        let mut reply = frame::encode(&response.encode_to_vec())
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        if self.should_inject_fault(self.fault_config.corruption_rate) {
            self.stats.corrupted_responses += 1;
            let index = self.rng.random_range(0..reply.len());
            let bit = self.rng.random_range(0..8u8);
            reply[index] ^= 1 << bit;
        }
        Ok(reply)
    }
}

fn decode_row(row: &proto::Row, inferred: bool) -> Result<DecodedRow, Rejection> {
    codec::decode_row(row, inferred).map_err(|e| Rejection::invalid(e.to_string()))
}

fn parse_device(path: &str) -> Result<DeviceId, Rejection> {
    DeviceId::parse(path).map_err(|e| Rejection::invalid(e.to_string()))
}

fn parse_namespace(path: &str) -> Result<Namespace, Rejection> {
    Namespace::parse(path).map_err(|e| Rejection::invalid(e.to_string()))
}

fn data_type(raw: i32) -> Result<SemanticType, Rejection> {
    u8::try_from(raw)
        .ok()
        .and_then(|tag| SemanticType::try_from(tag).ok())
        .ok_or_else(|| Rejection::invalid(format!("unknown data type {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnSchema;
    use crate::session::{RemoteSession, Session, SessionError};
    use crate::types::ErrorKind;

    fn device() -> DeviceId {
        DeviceId::parse("root.sg.d1").unwrap()
    }

    fn session() -> RemoteSession<MemoryEngine> {
        let mut session = RemoteSession::new(MemoryEngine::new(0));
        session
            .create_namespace(&Namespace::parse("root.sg").unwrap())
            .unwrap();
        session
    }

    fn strict_row(timestamp: i64, column: &str, value: &Value, ty: SemanticType) -> proto::Row {
        let mut values = Vec::new();
        value.write_tagged(&mut values);
        proto::Row {
            timestamp,
            measurements: vec![column.to_string()],
            types: vec![i32::from(ty.tag())],
            values,
            literals: Vec::new(),
        }
    }

    fn literal_row(timestamp: i64, column: &str, literal: &str) -> proto::Row {
        proto::Row {
            timestamp,
            measurements: vec![column.to_string()],
            literals: vec![literal.to_string()],
            ..proto::Row::default()
        }
    }

    fn execution_code(err: &SessionError) -> Code {
        match err {
            SessionError::Execution { code, .. } => *code,
            other => panic!("expected an execution failure, got {other}"),
        }
    }

    #[test]
    fn test_write_requires_namespace() {
        let mut session = RemoteSession::new(MemoryEngine::new(0));
        let err = session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(strict_row(0, "s1", &Value::Int32(1), SemanticType::Int32)),
                inferred: false,
            })
            .unwrap_err();
        assert_eq!(execution_code(&err), Code::FailedPrecondition);
        assert_eq!(err.kind(), ErrorKind::ServerSideExecutionFailure);
    }

    #[test]
    fn test_strict_write_auto_declares() {
        let mut session = session();
        session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(strict_row(0, "s1", &Value::Int64(5), SemanticType::Timestamp)),
                inferred: false,
            })
            .unwrap();
        let engine = session.transport();
        assert_eq!(engine.point_count(&device()), 1);
        assert_eq!(
            engine.column_type(&device(), "s1"),
            Some(SemanticType::Timestamp)
        );
    }

    #[test]
    fn test_strict_write_rejects_conflicting_tag() {
        let mut session = session();
        session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::Float64))
            .unwrap();
        let err = session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(strict_row(0, "s1", &Value::Int32(1), SemanticType::Int32)),
                inferred: false,
            })
            .unwrap_err();
        assert_eq!(execution_code(&err), Code::InvalidArgument);
        assert_eq!(session.transport().point_count(&device()), 0);
    }

    #[test]
    fn test_inferred_write_parses_under_declared_type() {
        let mut session = session();
        session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::Int64))
            .unwrap();
        session
            .write_one_device_batch(proto::InsertRecordsOfOneDeviceRequest {
                device: device().to_string(),
                rows: vec![literal_row(0, "s1", "7L")],
                inferred: true,
            })
            .unwrap();
        assert_eq!(
            session.transport().point(&device(), 0).unwrap()["s1"],
            Value::Int64(7)
        );

        let err = session
            .write_one_device_batch(proto::InsertRecordsOfOneDeviceRequest {
                device: device().to_string(),
                rows: vec![literal_row(1, "s1", "7")],
                inferred: true,
            })
            .unwrap_err();
        assert_eq!(execution_code(&err), Code::InvalidArgument);
    }

    #[test]
    fn test_inferred_write_infers_undeclared_columns() {
        let mut session = session();
        session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(literal_row(0, "s1", "X'0a0b'")),
                inferred: true,
            })
            .unwrap();
        assert_eq!(
            session.transport().column_type(&device(), "s1"),
            Some(SemanticType::Blob)
        );
    }

    #[test]
    fn test_multi_row_write_is_all_or_nothing() {
        let mut session = session();
        session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::Boolean))
            .unwrap();
        let err = session
            .write_one_device_batch(proto::InsertRecordsOfOneDeviceRequest {
                device: device().to_string(),
                rows: vec![literal_row(0, "s1", "true"), literal_row(1, "s1", "yes")],
                inferred: true,
            })
            .unwrap_err();
        assert_eq!(execution_code(&err), Code::InvalidArgument);
        assert_eq!(session.transport().point_count(&device()), 0);
    }

    #[test]
    fn test_empty_row_stores_nothing() {
        let mut session = session();
        session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(proto::Row::default()),
                inferred: false,
            })
            .unwrap();
        assert_eq!(session.count_rows(device().as_str()).unwrap(), 0);
    }

    #[test]
    fn test_count_by_prefix() {
        let mut session = session();
        for (path, ts) in [("root.sg.d1", 0), ("root.sg.d1", 1), ("root.sg.d2", 0)] {
            session
                .write_single_record(proto::InsertRecordRequest {
                    device: path.to_string(),
                    row: Some(strict_row(ts, "s1", &Value::Int32(1), SemanticType::Int32)),
                    inferred: false,
                })
                .unwrap();
        }
        assert_eq!(session.count_rows("root.sg.d1").unwrap(), 2);
        assert_eq!(session.count_rows("root.sg.**").unwrap(), 3);
        assert_eq!(session.count_rows("root.sg.d9").unwrap(), 0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut session = session();
        session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(strict_row(3, "s1", &Value::Int32(1), SemanticType::Int32)),
                inferred: false,
            })
            .unwrap();
        session.delete_all_data(&device(), i64::MAX).unwrap();
        session.delete_all_data(&device(), i64::MAX).unwrap();
        session
            .delete_all_data(&DeviceId::parse("root.sg.unknown").unwrap(), i64::MAX)
            .unwrap();
        assert_eq!(session.count_rows(device().as_str()).unwrap(), 0);
    }

    #[test]
    fn test_redeclare_with_other_type_rejected() {
        let mut session = session();
        session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::Text))
            .unwrap();
        session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::Text))
            .unwrap();
        let err = session
            .declare_columns(&device(), &ColumnSchema::single("s1", SemanticType::String))
            .unwrap_err();
        assert_eq!(execution_code(&err), Code::InvalidArgument);
    }

    #[test]
    fn test_drop_namespace() {
        let mut session = session();
        let namespace = Namespace::parse("root.sg").unwrap();
        session
            .write_single_record(proto::InsertRecordRequest {
                device: device().to_string(),
                row: Some(strict_row(0, "s1", &Value::Int32(1), SemanticType::Int32)),
                inferred: false,
            })
            .unwrap();
        session.drop_namespace(&namespace).unwrap();
        assert_eq!(session.transport().point_count(&device()), 0);
        let err = session.drop_namespace(&namespace).unwrap_err();
        assert_eq!(execution_code(&err), Code::NotFound);
    }

    #[test]
    fn test_injected_faults_are_deterministic() {
        let run = |seed| {
            let config = FaultConfig {
                transport_error_rate: 0.3,
                corruption_rate: 0.3,
            };
            let mut session = RemoteSession::new(MemoryEngine::with_config(seed, config));
            (0..50)
                .map(|_| {
                    session.count_rows("root.sg.d1").is_ok()
                })
                .collect::<Vec<_>>()
        };
        let a = run(11);
        assert_eq!(a, run(11));
        assert!(a.iter().any(|ok| *ok));
        assert!(a.iter().any(|ok| !*ok));
    }

    #[test]
    fn test_unreachable_engine() {
        let mut session = RemoteSession::new(MemoryEngine::with_config(0, FaultConfig::unreachable()));
        let err = session.count_rows("root.sg.d1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(session.transport().stats().injected_transport_errors, 1);
    }
}
