// Life of a scenario:
// 1. Create the namespace and declare the device's columns
// 2. Read the fixture and coerce every row (strict values or literals)
// 3. Assemble payloads for the entry point under test
// 4. Submit each payload through the session:
//     - Strict mismatches are rejected while encoding
//     - Everything else is framed and sent to the engine
// 5. Count the persisted points, compare, and delete them
//
// System components:
//  - Coercion table and payload assembly
//  - Session (framed protobuf over a blocking transport)
//  - Oracle for count reconciliation and cleanup
//  - In-memory engine for running everything in process

pub mod catalog;
pub mod coerce;
pub mod config;
mod constants;
mod e2e_tests;
pub mod fixture;
pub mod mismatch;
pub mod oracle;
pub mod payload;
pub mod proto;
pub mod scenario;
pub mod session;
pub mod simulation;
mod testing;
pub mod types;

pub use scenario::{Scenario, ScenarioError, ScenarioReport, ScenarioRunner};
