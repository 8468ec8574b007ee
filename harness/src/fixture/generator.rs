//! Seeded fixture generation.
//!
//! Produces fixture text for a schema that is reproducible from a seed.
//! Every generated field parses under its column's type and never equals
//! the null token, so generated fixtures never trigger parse failures.
//! Nulls are placed at random, and a configurable share of rows is made
//! entirely null.

use std::fmt::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::ColumnSchema;
use crate::constants::DEFAULT_NULL_TOKEN;
use crate::fixture::FixtureSource;
use crate::types::SemanticType;

/// Configuration for fixture generation.
#[derive(Debug, Clone)]
pub struct FixtureGenConfig {
    /// Number of rows to generate.
    pub rows: usize,
    /// Probability that a single field is null (0.0 - 1.0).
    pub null_rate: f64,
    /// Probability that a whole row is null (0.0 - 1.0).
    pub all_null_rate: f64,
    /// Timestamp of the first row.
    pub start_timestamp: i64,
    /// Distance between consecutive timestamps.
    pub step: i64,
}

impl Default for FixtureGenConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            null_rate: 0.1,
            all_null_rate: 0.05,
            start_timestamp: 0,
            step: 1,
        }
    }
}

/// A generated fixture and what went into it.
#[derive(Debug, Clone)]
pub struct GeneratedFixture {
    pub text: String,
    pub rows: usize,
    pub all_null_rows: usize,
}

impl GeneratedFixture {
    #[must_use]
    pub fn into_source(self) -> FixtureSource {
        FixtureSource::from_text(self.text)
    }
}

/// Generator for fixture text.
///
/// The same seed and configuration always produce the same text.
pub struct FixtureGenerator {
    rng: StdRng,
    config: FixtureGenConfig,
}

impl FixtureGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FixtureGenConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, config: FixtureGenConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &FixtureGenConfig {
        &self.config
    }

    /// Generate a fixture for `schema`, with a header line.
    pub fn generate(&mut self, schema: &ColumnSchema) -> GeneratedFixture {
        let mut text = String::from("Time");
        for name in schema.names() {
            text.push(',');
            text.push_str(name);
        }
        text.push('\n');

        let mut all_null_rows = 0;
        let mut timestamp = self.config.start_timestamp;
        for _ in 0..self.config.rows {
            let _ = write!(text, "{timestamp}");
            let whole_row_null = self.rng.random::<f64>() < self.config.all_null_rate;
            let mut any_value = false;
            for ty in schema.types() {
                text.push(',');
                if whole_row_null || self.rng.random::<f64>() < self.config.null_rate {
                    text.push_str(DEFAULT_NULL_TOKEN);
                } else {
                    any_value = true;
                    self.write_field(&mut text, ty);
                }
            }
            if !any_value {
                all_null_rows += 1;
            }
            text.push('\n');
            timestamp += self.config.step;
        }

        GeneratedFixture {
            text,
            rows: self.config.rows,
            all_null_rows,
        }
    }

    fn write_field(&mut self, out: &mut String, ty: SemanticType) {
        let _ = match ty {
            SemanticType::Boolean => write!(out, "{}", self.rng.random::<bool>()),
            SemanticType::Int32 => write!(out, "{}", self.rng.random_range(-1000..1000)),
            SemanticType::Int64 | SemanticType::Timestamp => {
                write!(out, "{}", self.rng.random_range(-1_000_000_i64..1_000_000))
            }
            SemanticType::Float32 => {
                write!(out, "{:?}", self.rng.random_range(-100.0_f32..100.0))
            }
            SemanticType::Float64 => {
                write!(out, "{:?}", self.rng.random_range(-1000.0_f64..1000.0))
            }
            SemanticType::Text | SemanticType::String | SemanticType::Blob => {
                let len = self.rng.random_range(1..12);
                let word: String = (0..len)
                    .map(|_| char::from(self.rng.random_range(b'a'..=b'k')))
                    .collect();
                out.write_str(&word)
            }
            SemanticType::Date => write!(
                out,
                "{:04}-{:02}-{:02}",
                self.rng.random_range(1970..2100),
                self.rng.random_range(1..=12),
                self.rng.random_range(1..=28)
            ),
        };
    }
}
