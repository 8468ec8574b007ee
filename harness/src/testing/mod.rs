#![cfg(test)]

use crate::catalog::ColumnSchema;
use crate::session::RemoteSession;
use crate::simulation::MemoryEngine;
use crate::types::{DeviceId, SemanticType};

/// Seed used by test engines unless a test picks its own.
pub const TEST_SEED: u64 = 7;

/// Create a session backed by a fresh, fault-free in-memory engine.
pub fn new_test_session() -> RemoteSession<MemoryEngine> {
    RemoteSession::new(MemoryEngine::new(TEST_SEED))
}

/// Parse a device path that is known to be valid.
pub fn device(path: &str) -> DeviceId {
    #[allow(clippy::expect_used)]
    DeviceId::parse(path).expect("test device path must be valid")
}

/// One column per semantic type, named after the type.
pub fn all_types_schema() -> ColumnSchema {
    let names: Vec<String> = SemanticType::ALL
        .iter()
        .map(|ty| ty.name().to_ascii_lowercase())
        .collect();
    #[allow(clippy::expect_used)]
    ColumnSchema::from_pairs(names.iter().map(String::as_str).zip(SemanticType::ALL))
        .expect("type names are distinct")
}
