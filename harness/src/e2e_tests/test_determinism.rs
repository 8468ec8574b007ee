//! Test that the same seed produces identical runs.

use crate::coerce::{CoercionMode, NullPolicy};
use crate::e2e_tests::helpers::*;
use crate::fixture::{FixtureGenConfig, FixtureGenerator};
use crate::scenario::ScenarioReport;
use crate::simulation::{FaultConfig, MemoryEngine};
use crate::session::{RemoteSession, Session};
use crate::types::Namespace;

fn run_sequence(seed: u64) -> Vec<ScenarioReport> {
    let schema = all_types_schema();
    let fixture = FixtureGenerator::with_config(
        seed,
        FixtureGenConfig {
            rows: 40,
            ..FixtureGenConfig::default()
        },
    )
    .generate(&schema)
    .into_source();

    let mut reports = Vec::new();
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        for entry_point in entry_points_for(mode) {
            let mut test = TestHarness::new();
            let mut scenario = scenario("root.sg.d1", schema.clone(), entry_point, mode);
            scenario.null_policy = NullPolicy::Absent;
            reports.push(test.run(&scenario, &fixture).unwrap());
        }
    }
    reports
}

#[test]
fn test_deterministic_reports() {
    let run1 = run_sequence(99);
    let run2 = run_sequence(99);
    assert_eq!(run1, run2);
}

#[test]
fn test_generated_fixture_is_reproducible() {
    let schema = all_types_schema();
    let a = FixtureGenerator::new(5).generate(&schema);
    let b = FixtureGenerator::new(5).generate(&schema);
    let c = FixtureGenerator::new(6).generate(&schema);
    assert_eq!(a.text, b.text);
    assert_ne!(a.text, c.text);
}

#[test]
fn test_injected_faults_are_reproducible() {
    let outcomes = |seed: u64| {
        let config = FaultConfig {
            transport_error_rate: 0.5,
            ..FaultConfig::no_faults()
        };
        let mut session = RemoteSession::new(MemoryEngine::with_config(seed, config));
        let namespace = Namespace::parse("root.sg").unwrap();
        (0..40)
            .map(|_| session.create_namespace(&namespace).is_ok())
            .collect::<Vec<_>>()
    };

    assert_eq!(outcomes(1), outcomes(1));
    assert!(outcomes(1).contains(&false));
}
