//! Deterministic in-memory stand-in for the remote engine.
//!
//! The harness talks to the engine only through `Session`. This module
//! provides an engine that speaks the same framed protocol in process, so
//! that every scenario can run without a network:
//!
//! - Same protocol as the remote client (no shortcut around encoding)
//! - All randomness is seeded for reproducibility
//! - Faults can be injected at the transport boundary
//!
//! # Usage
//!
//! ```
//! use harness::session::{RemoteSession, Session};
//! use harness::simulation::MemoryEngine;
//! use harness::types::Namespace;
//!
//! let mut session = RemoteSession::new(MemoryEngine::new(42));
//! session.create_namespace(&Namespace::parse("root.sg").unwrap()).unwrap();
//! assert_eq!(session.count_rows("root.sg.**").unwrap(), 0);
//! ```

mod engine;
mod series;

pub use engine::{EngineStats, FaultConfig, MemoryEngine};
pub use series::{ColumnConflict, DeviceSeries};
