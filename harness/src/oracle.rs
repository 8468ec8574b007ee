//! Verification of writes against the engine.
//!
//! After a write, the oracle counts the points of every target device, sums
//! them and compares the sum with the expected count. Cleanup then removes
//! every point of every target, whether or not verification passed. No step
//! is retried.

use std::fmt;

use crate::coerce::CoercedRow;
use crate::session::{Session, SessionError, SubmissionOutcome};
use crate::types::{DeviceId, ErrorKind};

/// What a scenario expects from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// The write succeeds and this many points are persisted.
    Rows(u64),
    /// The write fails with this kind of error.
    Rejection(ErrorKind),
}

impl ExpectedOutcome {
    /// Rows that carry at least one value; all-absent rows are not persisted.
    #[must_use]
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CoercedRow>) -> Self {
        let persisted = rows.into_iter().filter(|row| !row.is_all_absent()).count();
        Self::Rows(persisted as u64)
    }

    /// The expected row count, if a success is expected.
    #[must_use]
    pub const fn rows(self) -> Option<u64> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Rejection(_) => None,
        }
    }

    /// Check whether `outcome` was accepted or rejected as expected.
    /// Persisted counts are reconciled separately.
    pub fn check(self, outcome: &SubmissionOutcome) -> Result<(), OracleError> {
        match (self, outcome.kind()) {
            (Self::Rows(_), None) => Ok(()),
            (Self::Rows(_), Some(actual)) => Err(OracleError::UnexpectedRejection(actual)),
            (Self::Rejection(_), None) => Err(OracleError::UnexpectedSuccess),
            (Self::Rejection(expected), Some(actual)) if actual != expected => {
                Err(OracleError::WrongErrorKind { expected, actual })
            }
            (Self::Rejection(_), Some(_)) => Ok(()),
        }
    }
}

/// Reasons a verification failed.
#[derive(Debug)]
pub enum OracleError {
    /// The counted points differ from the expected count.
    VerificationMismatch { expected: u64, actual: u64 },
    /// A rejection was expected but the write succeeded.
    UnexpectedSuccess,
    /// A success was expected but the write was rejected.
    UnexpectedRejection(ErrorKind),
    /// The write was rejected with another kind of error.
    WrongErrorKind {
        expected: ErrorKind,
        actual: ErrorKind,
    },
    /// A count query failed.
    Query(SessionError),
    /// Verification passed but cleanup failed.
    Cleanup(SessionError),
}

impl OracleError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::VerificationMismatch { .. }
            | Self::UnexpectedSuccess
            | Self::UnexpectedRejection(_)
            | Self::WrongErrorKind { .. } => ErrorKind::VerificationMismatch,
            Self::Query(e) | Self::Cleanup(e) => e.kind(),
        }
    }
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VerificationMismatch { expected, actual } => {
                write!(f, "expected {expected} rows, counted {actual}")
            }
            Self::UnexpectedSuccess => write!(f, "expected an error, execution completed normally"),
            Self::UnexpectedRejection(actual) => {
                write!(f, "expected success, got a {actual} error")
            }
            Self::WrongErrorKind { expected, actual } => {
                write!(f, "expected a {expected} error, got a {actual} error")
            }
            Self::Query(e) => write!(f, "count query failed: {e}"),
            Self::Cleanup(e) => write!(f, "cleanup failed: {e}"),
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(e) | Self::Cleanup(e) => Some(e),
            _ => None,
        }
    }
}

/// Count reconciliation and cleanup for a set of target devices.
#[derive(Debug, Clone)]
pub struct WriteOracle {
    targets: Vec<DeviceId>,
    cleanup_before: i64,
}

impl WriteOracle {
    #[must_use]
    pub const fn new(targets: Vec<DeviceId>) -> Self {
        Self {
            targets,
            cleanup_before: i64::MAX,
        }
    }

    #[must_use]
    pub fn for_device(device: &DeviceId) -> Self {
        Self::new(vec![device.clone()])
    }

    #[must_use]
    pub fn targets(&self) -> &[DeviceId] {
        &self.targets
    }

    /// Compare the summed count with `expected`, then clean up.
    ///
    /// Cleanup runs for every target even when verification failed. If both
    /// fail, the verification failure is returned and the cleanup failure
    /// is logged.
    pub fn verify<Q, C>(&self, expected: u64, query: Q, cleanup: C) -> Result<u64, OracleError>
    where
        Q: FnMut(&DeviceId) -> Result<u64, SessionError>,
        C: FnMut(&DeviceId, i64) -> Result<(), SessionError>,
    {
        let verification = self.reconcile(expected, query);
        let cleanup = self.clean(cleanup);
        conclude(verification, cleanup)
    }

    /// `verify` using `session` for both queries and cleanup.
    pub fn verify_with(
        &self,
        session: &mut dyn Session,
        expected: u64,
    ) -> Result<u64, OracleError> {
        let verification = self.reconcile(expected, |device| session.count_rows(device.as_str()));
        let cleanup = self.clean(|device, before| session.delete_all_data(device, before));
        conclude(verification, cleanup)
    }

    /// Check `outcome` against `expected`, then clean up.
    pub fn expect_rejection<C>(
        &self,
        expected: ExpectedOutcome,
        outcome: &SubmissionOutcome,
        cleanup: C,
    ) -> Result<(), OracleError>
    where
        C: FnMut(&DeviceId, i64) -> Result<(), SessionError>,
    {
        let verification = expected.check(outcome);
        let cleanup = self.clean(cleanup);
        conclude(verification, cleanup)
    }

    /// `expect_rejection` using `session` for cleanup.
    pub fn expect_rejection_with(
        &self,
        session: &mut dyn Session,
        expected: ExpectedOutcome,
        outcome: &SubmissionOutcome,
    ) -> Result<(), OracleError> {
        self.expect_rejection(expected, outcome, |device, before| {
            session.delete_all_data(device, before)
        })
    }

    fn reconcile<Q>(&self, expected: u64, mut query: Q) -> Result<u64, OracleError>
    where
        Q: FnMut(&DeviceId) -> Result<u64, SessionError>,
    {
        let mut actual = 0;
        for device in &self.targets {
            actual += query(device).map_err(OracleError::Query)?;
        }
        tracing::debug!("verifying {} targets: expected {expected}, counted {actual}", self.targets.len());
        if actual == expected {
            Ok(actual)
        } else {
            Err(OracleError::VerificationMismatch { expected, actual })
        }
    }

    /// Delete every target's points. Returns the first failure; later ones
    /// are logged.
    fn clean<C>(&self, mut cleanup: C) -> Result<(), SessionError>
    where
        C: FnMut(&DeviceId, i64) -> Result<(), SessionError>,
    {
        let mut first = None;
        for device in &self.targets {
            if let Err(e) = cleanup(device, self.cleanup_before) {
                if first.is_none() {
                    first = Some(e);
                } else {
                    tracing::warn!("cleanup of {device} failed: {e}");
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

fn conclude<T>(
    verification: Result<T, OracleError>,
    cleanup: Result<(), SessionError>,
) -> Result<T, OracleError> {
    match (verification, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(OracleError::Cleanup(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_error)) => {
            tracing::warn!("cleanup failed after a failed verification: {cleanup_error}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::payload::PayloadError;
    use crate::proto::google::rpc::Code;
    use crate::session::TransportError;

    fn devices() -> Vec<DeviceId> {
        vec![
            DeviceId::parse("root.sg.d1").unwrap(),
            DeviceId::parse("root.sg.d2").unwrap(),
        ]
    }

    fn down() -> SessionError {
        SessionError::Transport(TransportError::Unavailable("down".to_string()))
    }

    #[test]
    fn test_counts_are_summed_over_targets() {
        let oracle = WriteOracle::new(devices());
        let counted = oracle
            .verify(5, |d| Ok(if d.as_str().ends_with('1') { 2 } else { 3 }), |_, _| Ok(()))
            .unwrap();
        assert_eq!(counted, 5);
    }

    #[test]
    fn test_mismatch_still_cleans_every_target() {
        let oracle = WriteOracle::new(devices());
        let cleaned = RefCell::new(Vec::new());
        let err = oracle
            .verify(
                4,
                |_| Ok(1),
                |d, before| {
                    cleaned.borrow_mut().push((d.clone(), before));
                    Ok(())
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::VerificationMismatch {
                expected: 4,
                actual: 2
            }
        ));
        assert_eq!(err.kind(), ErrorKind::VerificationMismatch);
        let cleaned = cleaned.into_inner();
        assert_eq!(cleaned.len(), 2);
        assert!(cleaned.iter().all(|(_, before)| *before == i64::MAX));
    }

    #[test]
    fn test_verification_failure_wins_over_cleanup_failure() {
        let oracle = WriteOracle::new(devices());
        let attempts = RefCell::new(0);
        let err = oracle
            .verify(
                9,
                |_| Ok(0),
                |_, _| {
                    *attempts.borrow_mut() += 1;
                    Err(down())
                },
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::VerificationMismatch { .. }));
        assert_eq!(*attempts.borrow(), 2);
    }

    #[test]
    fn test_cleanup_failure_after_success() {
        let oracle = WriteOracle::new(devices());
        let err = oracle.verify(0, |_| Ok(0), |_, _| Err(down())).unwrap_err();
        assert!(matches!(err, OracleError::Cleanup(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_query_failure_is_not_retried() {
        let oracle = WriteOracle::new(devices());
        let queries = RefCell::new(0);
        let err = oracle
            .verify(
                0,
                |_| {
                    *queries.borrow_mut() += 1;
                    Err(down())
                },
                |_, _| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::Query(_)));
        assert_eq!(*queries.borrow(), 1);
    }

    #[test]
    fn test_unexpected_success() {
        let oracle = WriteOracle::new(devices());
        let err = oracle
            .expect_rejection(
                ExpectedOutcome::Rejection(ErrorKind::ClientSideTypeViolation),
                &SubmissionOutcome::Accepted,
                |_, _| Ok(()),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected an error, execution completed normally"
        );
    }

    #[test]
    fn test_wrong_error_kind() {
        let oracle = WriteOracle::new(devices());
        let outcome = SubmissionOutcome::RejectedServerSide {
            code: Code::InvalidArgument,
            message: "bad".to_string(),
        };
        let err = oracle
            .expect_rejection(
                ExpectedOutcome::Rejection(ErrorKind::ClientSideTypeViolation),
                &outcome,
                |_, _| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::WrongErrorKind {
                expected: ErrorKind::ClientSideTypeViolation,
                actual: ErrorKind::ServerSideExecutionFailure,
            }
        ));
    }

    #[test]
    fn test_expected_rejection() {
        let oracle = WriteOracle::new(devices());
        let outcome = SubmissionOutcome::RejectedClientSide(PayloadError::MixedModes);
        oracle
            .expect_rejection(
                ExpectedOutcome::Rejection(ErrorKind::ClientSideTypeViolation),
                &outcome,
                |_, _| Ok(()),
            )
            .unwrap();
    }

    #[test]
    fn test_rows_expectation_fails_on_a_rejection() {
        let oracle = WriteOracle::new(devices());
        let outcome = SubmissionOutcome::RejectedServerSide {
            code: Code::InvalidArgument,
            message: "bad".to_string(),
        };
        let cleaned = RefCell::new(0);
        let err = oracle
            .expect_rejection(ExpectedOutcome::Rows(1), &outcome, |_, _| {
                *cleaned.borrow_mut() += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::UnexpectedRejection(ErrorKind::ServerSideExecutionFailure)
        ));
        assert_eq!(*cleaned.borrow(), 2);
        ExpectedOutcome::Rows(1)
            .check(&SubmissionOutcome::Accepted)
            .unwrap();
    }
}
