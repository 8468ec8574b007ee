//! Test batches of records for one device.

use crate::coerce::CoercionMode;
use crate::e2e_tests::helpers::*;
use crate::fixture::{FixtureGenConfig, FixtureGenerator};
use crate::payload::EntryPoint;
use crate::session::Session;

#[test]
fn test_one_device_batch_in_both_modes() {
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        let mut test = TestHarness::new();
        let scenario = scenario(
            "root.sg.d1",
            all_types_schema(),
            EntryPoint::OneDeviceBatch,
            mode,
        );

        let report = test.run(&scenario, &all_types_fixture()).unwrap();

        assert_eq!(report.submissions, 1, "{mode}");
        assert_eq!(report.expected, 4, "{mode}");
        assert_eq!(report.persisted, 4, "{mode}");
    }
}

#[test]
fn test_generated_fixture_round_trips() {
    let schema = all_types_schema();
    let config = FixtureGenConfig {
        rows: 50,
        ..FixtureGenConfig::default()
    };
    let fixture = FixtureGenerator::with_config(11, config)
        .generate(&schema)
        .into_source();

    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.gen.d1",
        schema,
        EntryPoint::OneDeviceBatch,
        CoercionMode::Inferred,
    );
    let report = test.run(&scenario, &fixture).unwrap();

    assert_eq!(report.rows_read, 50);
    assert_eq!(report.persisted, 50);
    assert_eq!(test.session.count_rows("root.gen.**").unwrap(), 0);
}
