//! The failure taxonomy shared by every stage of a scenario.

use std::fmt;

/// The kind of failure a scenario observed.
///
/// Negative scenarios compare kinds rather than messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A fixture field could not be coerced under its declared type.
    ParseFailure,
    /// A value's representation did not match its declared type before any
    /// bytes left the process.
    ClientSideTypeViolation,
    /// The engine rejected a payload it received.
    ServerSideExecutionFailure,
    /// The persisted row count disagreed with the expectation.
    VerificationMismatch,
    /// The connection to the engine failed or returned an unreadable frame.
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ParseFailure => "parse failure",
            Self::ClientSideTypeViolation => "client-side type violation",
            Self::ServerSideExecutionFailure => "server-side execution failure",
            Self::VerificationMismatch => "verification mismatch",
            Self::Transport => "transport failure",
        };
        f.write_str(name)
    }
}
