//! End-to-end write scenarios.
//!
//! A scenario writes one fixture to one device through one entry point in
//! one coercion mode, verifies the persisted count and cleans up. A
//! negative scenario writes one wrong value or literal and checks that it
//! is rejected with the expected kind of error.

use std::fmt;

use crate::catalog::ColumnSchema;
use crate::coerce::{CoerceError, CoercedRow, CoercionMode, NullPolicy, ValueCoercer};
use crate::constants::DEFAULT_TABLET_CAPACITY;
use crate::fixture::{FixtureError, FixtureSource};
use crate::mismatch::MismatchCase;
use crate::oracle::{ExpectedOutcome, OracleError, WriteOracle};
use crate::payload::{EntryPoint, PayloadAssembler, PayloadError, WritePayload};
use crate::session::{Session, SessionError, Submission, SubmissionError, SubmissionOutcome};
use crate::types::{DeviceId, ErrorKind, Namespace};

/// What to write and how.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub device: DeviceId,
    pub schema: ColumnSchema,
    pub entry_point: EntryPoint,
    pub mode: CoercionMode,
    pub null_policy: NullPolicy,
}

/// The result of a passing scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub entry_point: EntryPoint,
    pub mode: CoercionMode,
    pub rows_read: usize,
    pub all_absent_rows: usize,
    pub expected: u64,
    pub persisted: u64,
    pub submissions: usize,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} rows read, {} all-absent, {} expected, {} persisted, {} submissions",
            self.entry_point,
            self.mode,
            self.rows_read,
            self.all_absent_rows,
            self.expected,
            self.persisted,
            self.submissions
        )
    }
}

/// Reasons a scenario failed.
#[derive(Debug)]
pub enum ScenarioError {
    Fixture(FixtureError),
    Coerce(CoerceError),
    Payload(PayloadError),
    /// The device has no parent namespace to create.
    NoNamespace(DeviceId),
    /// Creating the namespace or declaring columns failed.
    Setup(SessionError),
    /// The entry point does not accept the mode.
    Unsupported {
        entry_point: EntryPoint,
        mode: CoercionMode,
    },
    Submission(SubmissionError),
    /// A write expected to succeed was rejected.
    Rejected(SubmissionOutcome),
    Oracle(OracleError),
}

impl ScenarioError {
    /// The taxonomy kind of the failure, if it has one.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Fixture(_) | Self::Coerce(_) => Some(ErrorKind::ParseFailure),
            Self::Payload(e) => e.kind(),
            Self::NoNamespace(_) | Self::Unsupported { .. } => None,
            Self::Setup(e) => Some(e.kind()),
            Self::Submission(e) => Some(e.kind()),
            Self::Rejected(outcome) => outcome.kind(),
            Self::Oracle(e) => Some(e.kind()),
        }
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixture(e) => write!(f, "fixture: {e}"),
            Self::Coerce(e) => write!(f, "coercion: {e}"),
            Self::Payload(e) => write!(f, "payload: {e}"),
            Self::NoNamespace(device) => write!(f, "{device} has no parent namespace"),
            Self::Setup(e) => write!(f, "setup: {e}"),
            Self::Unsupported { entry_point, mode } => {
                write!(f, "{entry_point} does not accept {mode} payloads")
            }
            Self::Submission(e) => write!(f, "submission: {e}"),
            Self::Rejected(outcome) => write!(f, "write {outcome}"),
            Self::Oracle(e) => write!(f, "verification: {e}"),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fixture(e) => Some(e),
            Self::Coerce(e) => Some(e),
            Self::Payload(e) => Some(e),
            Self::Setup(e) => Some(e),
            Self::Submission(e) => Some(e),
            Self::Oracle(e) => Some(e),
            Self::NoNamespace(_) | Self::Unsupported { .. } | Self::Rejected(_) => None,
        }
    }
}

impl From<FixtureError> for ScenarioError {
    fn from(e: FixtureError) -> Self {
        Self::Fixture(e)
    }
}

impl From<CoerceError> for ScenarioError {
    fn from(e: CoerceError) -> Self {
        Self::Coerce(e)
    }
}

impl From<PayloadError> for ScenarioError {
    fn from(e: PayloadError) -> Self {
        Self::Payload(e)
    }
}

impl From<OracleError> for ScenarioError {
    fn from(e: OracleError) -> Self {
        Self::Oracle(e)
    }
}

/// Runs scenarios against one session, one at a time.
pub struct ScenarioRunner<'a> {
    session: &'a mut dyn Session,
    tablet_capacity: usize,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self {
            session,
            tablet_capacity: DEFAULT_TABLET_CAPACITY,
        }
    }

    #[must_use]
    pub const fn with_tablet_capacity(mut self, capacity: usize) -> Self {
        self.tablet_capacity = capacity;
        self
    }

    /// Create the device's namespace and declare its columns.
    fn setup(&mut self, device: &DeviceId, schema: &ColumnSchema) -> Result<(), ScenarioError> {
        let namespace =
            Namespace::of(device).ok_or_else(|| ScenarioError::NoNamespace(device.clone()))?;
        self.session
            .create_namespace(&namespace)
            .map_err(ScenarioError::Setup)?;
        self.session
            .declare_columns(device, schema)
            .map_err(ScenarioError::Setup)
    }

    /// Write `fixture`, verify the persisted count and clean up.
    pub fn run(
        &mut self,
        scenario: &Scenario,
        fixture: &FixtureSource,
    ) -> Result<ScenarioReport, ScenarioError> {
        if !scenario.entry_point.supports(scenario.mode) {
            return Err(ScenarioError::Unsupported {
                entry_point: scenario.entry_point,
                mode: scenario.mode,
            });
        }
        self.setup(&scenario.device, &scenario.schema)?;

        let coercer = ValueCoercer::new(scenario.mode).with_null_policy(scenario.null_policy);
        let rows = fixture
            .rows()
            .map(|row| -> Result<CoercedRow, ScenarioError> {
                Ok(coercer.coerce_row(&scenario.device, &scenario.schema, &row?)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rows_read = rows.len();
        let all_absent_rows = rows.iter().filter(|row| row.is_all_absent()).count();
        let expected = ExpectedOutcome::from_rows(&rows).rows().unwrap_or_default();

        let payloads = self.assemble(scenario, rows)?;
        let submissions = payloads.len();

        let mut failure = None;
        for payload in payloads {
            match Submission::new(payload).submit(self.session) {
                Ok(outcome) if outcome.is_accepted() => {}
                Ok(outcome) => {
                    failure = Some(ScenarioError::Rejected(outcome.clone()));
                    break;
                }
                Err(e) => {
                    failure = Some(ScenarioError::Submission(e));
                    break;
                }
            }
        }

        let oracle = WriteOracle::for_device(&scenario.device);
        let verification = oracle.verify_with(self.session, expected);
        if let Some(failure) = failure {
            if let Err(e) = verification {
                tracing::debug!("verification after a failed write: {e}");
            }
            return Err(failure);
        }
        let persisted = verification?;

        let report = ScenarioReport {
            entry_point: scenario.entry_point,
            mode: scenario.mode,
            rows_read,
            all_absent_rows,
            expected,
            persisted,
            submissions,
        };
        tracing::info!("{report}");
        Ok(report)
    }

    fn assemble(
        &self,
        scenario: &Scenario,
        rows: Vec<CoercedRow>,
    ) -> Result<Vec<WritePayload>, PayloadError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        match scenario.entry_point {
            EntryPoint::SingleRecord => rows
                .into_iter()
                .map(PayloadAssembler::single_record)
                .collect(),
            EntryPoint::MultiRecord => Ok(vec![PayloadAssembler::multi_record(rows)?]),
            EntryPoint::OneDeviceBatch => Ok(vec![PayloadAssembler::one_device_batch(
                &scenario.device,
                rows,
            )?]),
            EntryPoint::ColumnarBatch => PayloadAssembler::columnar_batch(rows, self.tablet_capacity),
        }
    }

    /// Write one mismatched cell and check it is rejected as expected.
    ///
    /// The column is named after the target type, so cases for different
    /// targets can share a device.
    pub fn run_negative(
        &mut self,
        device: &DeviceId,
        entry_point: EntryPoint,
        case: &MismatchCase,
    ) -> Result<(), ScenarioError> {
        if !entry_point.supports(case.mode()) {
            return Err(ScenarioError::Unsupported {
                entry_point,
                mode: case.mode(),
            });
        }
        let schema = ColumnSchema::single(&case.target.name().to_ascii_lowercase(), case.target);
        self.setup(device, &schema)?;

        let row = CoercedRow {
            device: device.clone(),
            timestamp: 0,
            schema,
            values: vec![case.cell()],
        };
        let build = match entry_point {
            EntryPoint::SingleRecord => PayloadAssembler::single_record(row),
            EntryPoint::MultiRecord => PayloadAssembler::multi_record(vec![row]),
            EntryPoint::OneDeviceBatch => PayloadAssembler::one_device_batch(device, vec![row]),
            EntryPoint::ColumnarBatch => {
                PayloadAssembler::columnar_batch(vec![row], self.tablet_capacity).and_then(
                    |payloads| payloads.into_iter().next().ok_or(PayloadError::Empty),
                )
            }
        };

        let mut submission = Submission::from_build(build);
        let oracle = WriteOracle::for_device(device);
        let outcome = match submission.submit(self.session) {
            Ok(outcome) => outcome.clone(),
            Err(e) => {
                if let Err(cleanup) = oracle.verify_with(self.session, 0) {
                    tracing::debug!("cleanup after a failed submission: {cleanup}");
                }
                return Err(ScenarioError::Submission(e));
            }
        };
        let expected = ExpectedOutcome::Rejection(case.expected);
        oracle.expect_rejection_with(self.session, expected, &outcome)?;
        tracing::debug!("{entry_point}: {case} -> {outcome}");
        Ok(())
    }
}
