//! Test that persisted counts equal rows minus all-absent rows.

use crate::coerce::{CoercionMode, NullPolicy};
use crate::e2e_tests::helpers::*;
use crate::fixture::{FixtureGenConfig, FixtureGenerator, FixtureSource};
use crate::payload::EntryPoint;

#[test]
fn test_all_absent_rows_are_not_counted() {
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        for entry_point in entry_points_for(mode) {
            let mut test = TestHarness::new();
            let mut scenario = scenario("root.sg.d1", all_types_schema(), entry_point, mode);
            scenario.null_policy = NullPolicy::Absent;

            let report = test.run(&scenario, &all_types_fixture()).unwrap();

            assert_eq!(report.rows_read, 4, "{entry_point} {mode}");
            assert_eq!(report.all_absent_rows, 1, "{entry_point} {mode}");
            assert_eq!(report.expected, 3, "{entry_point} {mode}");
            assert_eq!(report.persisted, 3, "{entry_point} {mode}");
        }
    }
}

#[test]
fn test_generated_fixture_reconciles() {
    let schema = all_types_schema();
    let config = FixtureGenConfig {
        rows: 80,
        null_rate: 0.3,
        all_null_rate: 0.2,
        ..FixtureGenConfig::default()
    };
    let generated = FixtureGenerator::with_config(3, config).generate(&schema);
    let all_null_rows = generated.all_null_rows;
    let fixture = generated.into_source();

    for entry_point in entry_points_for(CoercionMode::Strict) {
        let mut test = TestHarness::new();
        let mut scenario = scenario("root.sg.d1", schema.clone(), entry_point, CoercionMode::Strict);
        scenario.null_policy = NullPolicy::Absent;

        let report = test.run(&scenario, &fixture).unwrap();

        assert_eq!(report.all_absent_rows, all_null_rows, "{entry_point}");
        assert_eq!(report.persisted, (80 - all_null_rows) as u64, "{entry_point}");
    }
}

#[test]
fn test_substitution_persists_every_row() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        all_types_schema(),
        EntryPoint::MultiRecord,
        CoercionMode::Strict,
    );

    let report = test.run(&scenario, &all_types_fixture()).unwrap();

    assert_eq!(report.all_absent_rows, 0);
    assert_eq!(report.persisted, 4);
}

#[test]
fn test_empty_fixture_submits_nothing() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        boolean_schema(),
        EntryPoint::OneDeviceBatch,
        CoercionMode::Strict,
    );

    let report = test
        .run(&scenario, &FixtureSource::from_text("Time,s1\n"))
        .unwrap();

    assert_eq!(report.submissions, 0);
    assert_eq!(report.persisted, 0);
}
