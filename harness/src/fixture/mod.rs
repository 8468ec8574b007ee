//! Fixture rows: reading tabular fixtures and generating seeded ones.

mod generator;
mod source;

pub use generator::{FixtureGenConfig, FixtureGenerator, GeneratedFixture};
pub use source::{FixtureError, FixtureRow, FixtureRows, FixtureSource};
