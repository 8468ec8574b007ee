//! The client side of the engine API.
//!
//! `Session` is the set of operations the harness consumes. `RemoteSession`
//! implements it over any `Transport` that can carry one request frame and
//! return one response frame.

pub mod codec;
pub mod frame;
mod remote;
mod submission;

use std::fmt;

pub use codec::EncodedWrite;
pub use frame::FrameError;
pub use remote::RemoteSession;
pub use submission::{Submission, SubmissionError, SubmissionOutcome, SubmissionState};

use crate::catalog::ColumnSchema;
use crate::proto;
use crate::proto::google::rpc::Code;
use crate::types::{DeviceId, ErrorKind, Namespace};

/// Errors from the transport below a session.
#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    /// The peer is not reachable.
    Unavailable(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Unavailable(reason) => write!(f, "transport unavailable: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A response that does not follow the wire contract.
#[derive(Debug)]
pub enum ProtocolError {
    Frame(FrameError),
    Decode(prost::DecodeError),
    RequestIdMismatch { sent: u32, received: u32 },
    MissingStatus,
    UnknownStatusCode(i32),
    NegativeCount(i64),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "bad frame: {e}"),
            Self::Decode(e) => write!(f, "bad response: {e}"),
            Self::RequestIdMismatch { sent, received } => {
                write!(f, "response for request {received}, expected {sent}")
            }
            Self::MissingStatus => write!(f, "response has no status"),
            Self::UnknownStatusCode(code) => write!(f, "unknown status code {code}"),
            Self::NegativeCount(n) => write!(f, "negative row count {n}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors returned by session operations.
#[derive(Debug)]
pub enum SessionError {
    /// The engine executed the request and returned a non-OK status.
    Execution { code: Code, message: String },
    Transport(TransportError),
    Protocol(ProtocolError),
}

impl SessionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Execution { .. } => ErrorKind::ServerSideExecutionFailure,
            Self::Transport(_) | Self::Protocol(_) => ErrorKind::Transport,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution { code, message } => {
                write!(f, "execution failed ({}): {message}", code.as_str_name())
            }
            Self::Transport(e) => write!(f, "{e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Execution { .. } => None,
            Self::Transport(e) => Some(e),
            Self::Protocol(e) => Some(e),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// Carries one request frame to the engine and returns its response frame.
pub trait Transport {
    fn round_trip(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// Operations the harness needs from the engine.
///
/// Calls are blocking and are not retried.
pub trait Session {
    fn write_single_record(
        &mut self,
        request: proto::InsertRecordRequest,
    ) -> Result<(), SessionError>;

    fn write_multi_record(&mut self, request: proto::InsertRecordsRequest)
    -> Result<(), SessionError>;

    fn write_one_device_batch(
        &mut self,
        request: proto::InsertRecordsOfOneDeviceRequest,
    ) -> Result<(), SessionError>;

    fn write_columnar_batch(
        &mut self,
        request: proto::InsertTabletsRequest,
    ) -> Result<(), SessionError>;

    /// Count points for a device path, or for every device under
    /// `prefix.**`.
    fn count_rows(&mut self, target: &str) -> Result<u64, SessionError>;

    /// Remove every point of `device` with a timestamp at or before
    /// `before`.
    fn delete_all_data(&mut self, device: &DeviceId, before: i64) -> Result<(), SessionError>;

    fn create_namespace(&mut self, namespace: &Namespace) -> Result<(), SessionError>;

    fn drop_namespace(&mut self, namespace: &Namespace) -> Result<(), SessionError>;

    fn declare_columns(
        &mut self,
        device: &DeviceId,
        schema: &ColumnSchema,
    ) -> Result<(), SessionError>;

    /// Send an already encoded write to its entry point.
    fn write_encoded(&mut self, write: EncodedWrite) -> Result<(), SessionError> {
        match write {
            EncodedWrite::Record(request) => self.write_single_record(request),
            EncodedWrite::Records(request) => self.write_multi_record(request),
            EncodedWrite::OneDevice(request) => self.write_one_device_batch(request),
            EncodedWrite::Tablets(request) => self.write_columnar_batch(request),
        }
    }
}
