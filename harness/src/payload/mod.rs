//! Write payloads and their assembly.
//!
//! The engine exposes four write entry points, each taking a differently
//! nested payload: one record, many records for many devices, many records
//! for one device, and column-major tablets.

mod assembler;
mod record;
mod tablet;

use std::collections::BTreeMap;
use std::fmt;

pub use assembler::PayloadAssembler;
pub use record::{Record, RecordValues};
pub use tablet::{ColumnValues, Tablet, TabletColumn};

use crate::coerce::CoercionMode;
use crate::types::{DeviceId, ErrorKind, TypeViolation};

/// The four write entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryPoint {
    SingleRecord,
    MultiRecord,
    OneDeviceBatch,
    ColumnarBatch,
}

impl EntryPoint {
    pub const ALL: [Self; 4] = [
        Self::SingleRecord,
        Self::MultiRecord,
        Self::OneDeviceBatch,
        Self::ColumnarBatch,
    ];

    /// Whether the entry point accepts payloads in `mode`.
    ///
    /// The columnar entry point is strictly typed only.
    #[must_use]
    pub const fn supports(self, mode: CoercionMode) -> bool {
        !matches!(
            (self, mode),
            (Self::ColumnarBatch, CoercionMode::Inferred)
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SingleRecord => "writeSingleRecord",
            Self::MultiRecord => "writeMultiRecord",
            Self::OneDeviceBatch => "writeOneDeviceBatch",
            Self::ColumnarBatch => "writeColumnarBatch",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while assembling a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// No rows were given.
    Empty,
    /// Strict and inferred cells were mixed in one payload.
    MixedModes,
    /// An inferred literal was given to the columnar entry point.
    LiteralInColumnar { column: String },
    /// A row for another device was given to a one-device batch.
    DeviceMismatch {
        expected: DeviceId,
        actual: DeviceId,
    },
    /// Rows for one device disagree on the schema.
    SchemaMismatch { device: DeviceId },
    /// Two tablets were given for the same device.
    DuplicateTablet { device: DeviceId },
    /// A row has the wrong number of cells for the tablet schema.
    Width { expected: usize, actual: usize },
    /// A tablet is already full.
    CapacityExceeded { capacity: usize },
    /// A tablet was created with zero capacity.
    ZeroCapacity,
    /// A strict value does not match its declared column type.
    TypeViolation(TypeViolation),
}

impl PayloadError {
    /// The taxonomy kind, for errors that belong to it.
    ///
    /// Type errors are client-side rejections; the rest are harness misuse.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::TypeViolation(_) | Self::LiteralInColumnar { .. } | Self::MixedModes => {
                Some(ErrorKind::ClientSideTypeViolation)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "payload has no rows"),
            Self::MixedModes => write!(f, "payload mixes strict values and literals"),
            Self::LiteralInColumnar { column } => {
                write!(f, "column '{column}': literals are not accepted in a tablet")
            }
            Self::DeviceMismatch { expected, actual } => {
                write!(f, "row for {actual} in a batch for {expected}")
            }
            Self::SchemaMismatch { device } => {
                write!(f, "rows for {device} disagree on the schema")
            }
            Self::DuplicateTablet { device } => write!(f, "more than one tablet for {device}"),
            Self::Width { expected, actual } => {
                write!(f, "row has {actual} cells, tablet has {expected} columns")
            }
            Self::CapacityExceeded { capacity } => {
                write!(f, "tablet is full ({capacity} rows)")
            }
            Self::ZeroCapacity => write!(f, "tablet capacity must be at least 1"),
            Self::TypeViolation(violation) => write!(f, "{violation}"),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TypeViolation(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<TypeViolation> for PayloadError {
    fn from(violation: TypeViolation) -> Self {
        Self::TypeViolation(violation)
    }
}

/// A payload for one of the write entry points.
#[derive(Debug, Clone, PartialEq)]
pub enum WritePayload {
    SingleRecord {
        device: DeviceId,
        record: Record,
    },
    /// `devices[i]` owns `records[i]`; devices may repeat.
    MultiRecord {
        devices: Vec<DeviceId>,
        records: Vec<Record>,
    },
    OneDeviceBatch {
        device: DeviceId,
        records: Vec<Record>,
    },
    /// Tablets keyed by batch name.
    ColumnarBatch { tablets: BTreeMap<String, Tablet> },
}

impl WritePayload {
    #[must_use]
    pub const fn entry_point(&self) -> EntryPoint {
        match self {
            Self::SingleRecord { .. } => EntryPoint::SingleRecord,
            Self::MultiRecord { .. } => EntryPoint::MultiRecord,
            Self::OneDeviceBatch { .. } => EntryPoint::OneDeviceBatch,
            Self::ColumnarBatch { .. } => EntryPoint::ColumnarBatch,
        }
    }

    /// The coercion mode of the payload. Payloads without cells count as
    /// strict.
    #[must_use]
    pub fn mode(&self) -> CoercionMode {
        let records: &[Record] = match self {
            Self::SingleRecord { record, .. } => std::slice::from_ref(record),
            Self::MultiRecord { records, .. } | Self::OneDeviceBatch { records, .. } => records,
            Self::ColumnarBatch { .. } => return CoercionMode::Strict,
        };
        records
            .iter()
            .find(|r| !r.is_empty())
            .map_or(CoercionMode::Strict, |r| r.values.mode())
    }

    /// Distinct devices written by the payload, in order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceId> {
        let mut out: Vec<DeviceId> = Vec::new();
        let mut add = |device: &DeviceId| {
            if !out.contains(device) {
                out.push(device.clone());
            }
        };
        match self {
            Self::SingleRecord { device, .. } | Self::OneDeviceBatch { device, .. } => add(device),
            Self::MultiRecord { devices, .. } => devices.iter().for_each(add),
            Self::ColumnarBatch { tablets } => tablets.values().for_each(|t| add(t.device())),
        }
        out
    }

    /// Number of rows carried, including rows without cells.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            Self::SingleRecord { .. } => 1,
            Self::MultiRecord { records, .. } | Self::OneDeviceBatch { records, .. } => {
                records.len()
            }
            Self::ColumnarBatch { tablets } => tablets.values().map(Tablet::row_count).sum(),
        }
    }
}
