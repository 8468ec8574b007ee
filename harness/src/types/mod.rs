//! Core value types: semantic types, strict values, paths and error kinds.

mod error_kind;
mod ids;
mod semantic_type;
mod value;

pub use error_kind::ErrorKind;
pub use ids::{DeviceId, Namespace, PathError};
pub use semantic_type::{SemanticType, UnknownTypeName};
pub use value::{LiteralError, TypeViolation, Value, ValueError};
