#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use harness::catalog::ColumnSchema;
use harness::coerce::{CoercionMode, NullPolicy};
use harness::config::HarnessConfig;
use harness::fixture::{FixtureGenConfig, FixtureGenerator, FixtureSource};
use harness::mismatch::MismatchGenerator;
use harness::payload::EntryPoint;
use harness::session::RemoteSession;
use harness::simulation::MemoryEngine;
use harness::types::{DeviceId, SemanticType};
use harness::{Scenario, ScenarioRunner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODES: [CoercionMode; 2] = [CoercionMode::Strict, CoercionMode::Inferred];

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harness=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: device={}, tablet_capacity={}, seed={}",
        config.device,
        config.tablet_capacity,
        config.seed
    );

    let schema = default_schema();
    let fixture = match load_fixture(&config, &schema) {
        Ok(fixture) => fixture,
        Err(e) => {
            tracing::error!("Failed to load fixture: {e}");
            std::process::exit(1);
        }
    };

    let mut session = RemoteSession::new(MemoryEngine::new(config.seed));
    let mut runner =
        ScenarioRunner::new(&mut session).with_tablet_capacity(config.tablet_capacity);

    let mut passed = 0_usize;
    let mut failed = 0_usize;

    for entry_point in EntryPoint::ALL {
        for mode in MODES.into_iter().filter(|mode| entry_point.supports(*mode)) {
            let scenario = Scenario {
                device: config.device.clone(),
                schema: schema.clone(),
                entry_point,
                mode,
                null_policy: NullPolicy::Substitute,
            };
            match runner.run(&scenario, &fixture) {
                Ok(_) => passed += 1,
                Err(e) => {
                    tracing::error!("{entry_point} [{mode}] failed: {e}");
                    failed += 1;
                }
            }
        }
    }

    let negative_device = match negative_device(&config.device) {
        Ok(device) => device,
        Err(e) => {
            tracing::error!("Failed to derive the device for negative cases: {e}");
            std::process::exit(1);
        }
    };
    for case in MismatchGenerator::matrix() {
        for entry_point in EntryPoint::ALL
            .into_iter()
            .filter(|entry_point| entry_point.supports(case.mode()))
        {
            match runner.run_negative(&negative_device, entry_point, &case) {
                Ok(()) => passed += 1,
                Err(e) => {
                    tracing::error!("{entry_point}: {case} failed: {e}");
                    failed += 1;
                }
            }
        }
    }

    let stats = session.transport().stats();
    tracing::info!(
        "{passed} scenarios passed, {failed} failed ({} requests, {} rejected by the engine)",
        stats.requests,
        stats.rejected
    );
    if failed > 0 {
        std::process::exit(1);
    }
}

/// One column per semantic type.
fn default_schema() -> ColumnSchema {
    ColumnSchema::from_pairs(
        [
            ("s_boolean", SemanticType::Boolean),
            ("s_int32", SemanticType::Int32),
            ("s_int64", SemanticType::Int64),
            ("s_timestamp", SemanticType::Timestamp),
            ("s_float", SemanticType::Float32),
            ("s_double", SemanticType::Float64),
            ("s_text", SemanticType::Text),
            ("s_string", SemanticType::String),
            ("s_blob", SemanticType::Blob),
            ("s_date", SemanticType::Date),
        ],
    )
    .unwrap_or_else(|e| {
        tracing::error!("Invalid default schema: {e}");
        std::process::exit(1);
    })
}

fn load_fixture(
    config: &HarnessConfig,
    schema: &ColumnSchema,
) -> Result<FixtureSource, harness::fixture::FixtureError> {
    if let Some(path) = &config.fixture {
        tracing::info!("Reading fixture {}", path.display());
        return Ok(FixtureSource::from_path(path)?.with_null_token(&config.null_token));
    }
    let generated = FixtureGenerator::with_config(
        config.seed,
        FixtureGenConfig {
            rows: config.rows,
            ..FixtureGenConfig::default()
        },
    )
    .generate(schema);
    tracing::info!(
        "Generated fixture: {} rows, {} all-null",
        generated.rows,
        generated.all_null_rows
    );
    Ok(generated.into_source())
}

/// A sibling of `device` for negative cases, so their columns never clash
/// with the fixture schema.
fn negative_device(device: &DeviceId) -> Result<DeviceId, harness::types::PathError> {
    DeviceId::parse(&format!("{device}_mismatch"))
}
