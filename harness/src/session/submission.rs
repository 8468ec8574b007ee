//! The lifecycle of one write.
//!
//! ```text
//! Built --submit--> Submitted --+--> Accepted
//!                               +--> RejectedClientSide
//!                               +--> RejectedServerSide
//! ```
//!
//! A submission is submitted at most once. Client-side rejection happens
//! while encoding, so a rejected payload never reaches the transport. A
//! transport or protocol failure leaves the submission in `Submitted`: the
//! engine may or may not have applied it.

use std::fmt;

use crate::payload::{PayloadError, WritePayload};
use crate::proto::google::rpc::Code;
use crate::session::{Session, SessionError, codec};
use crate::types::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Built,
    Submitted,
    Accepted,
    RejectedClientSide,
    RejectedServerSide,
}

/// How a submitted write ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted,
    RejectedClientSide(PayloadError),
    RejectedServerSide { code: Code, message: String },
}

impl SubmissionOutcome {
    /// The error kind of a rejection; `None` when accepted.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Accepted => None,
            Self::RejectedClientSide(_) => Some(ErrorKind::ClientSideTypeViolation),
            Self::RejectedServerSide { .. } => Some(ErrorKind::ServerSideExecutionFailure),
        }
    }

    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::RejectedClientSide(e) => write!(f, "rejected client-side: {e}"),
            Self::RejectedServerSide { code, message } => {
                write!(f, "rejected server-side ({}): {message}", code.as_str_name())
            }
        }
    }
}

/// Errors from `Submission::submit`.
#[derive(Debug)]
pub enum SubmissionError {
    /// The submission already left the `Built` state.
    AlreadySubmitted(SubmissionState),
    /// The write could not be delivered or its response was unreadable.
    Session(SessionError),
}

impl SubmissionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadySubmitted(_) => ErrorKind::Transport,
            Self::Session(e) => e.kind(),
        }
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubmitted(state) => {
                write!(f, "submission already submitted (state {state:?})")
            }
            Self::Session(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SubmissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AlreadySubmitted(_) => None,
            Self::Session(e) => Some(e),
        }
    }
}

/// One write payload and its lifecycle state.
pub struct Submission {
    payload: Result<WritePayload, PayloadError>,
    state: SubmissionState,
    outcome: Option<SubmissionOutcome>,
}

impl Submission {
    #[must_use]
    pub const fn new(payload: WritePayload) -> Self {
        Self::from_build(Ok(payload))
    }

    /// A submission from the result of assembling its payload.
    ///
    /// An assembly error is reported as a client-side rejection on submit.
    #[must_use]
    pub const fn from_build(payload: Result<WritePayload, PayloadError>) -> Self {
        Self {
            payload,
            state: SubmissionState::Built,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SubmissionState {
        self.state
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    /// Encode the payload and send it through `session`.
    pub fn submit(
        &mut self,
        session: &mut dyn Session,
    ) -> Result<&SubmissionOutcome, SubmissionError> {
        if self.state != SubmissionState::Built {
            return Err(SubmissionError::AlreadySubmitted(self.state));
        }
        self.state = SubmissionState::Submitted;

        let encoded = match &self.payload {
            Ok(payload) => codec::encode_payload(payload),
            Err(e) => Err(e.clone()),
        };
        let (state, outcome) = match encoded {
            Err(e) => (
                SubmissionState::RejectedClientSide,
                SubmissionOutcome::RejectedClientSide(e),
            ),
            Ok(write) => match session.write_encoded(write) {
                Ok(()) => (SubmissionState::Accepted, SubmissionOutcome::Accepted),
                Err(SessionError::Execution { code, message }) => (
                    SubmissionState::RejectedServerSide,
                    SubmissionOutcome::RejectedServerSide { code, message },
                ),
                Err(e) => return Err(SubmissionError::Session(e)),
            },
        };
        tracing::debug!("submission {outcome}");
        self.state = state;
        Ok(self.outcome.insert(outcome))
    }
}
