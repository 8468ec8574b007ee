//! Test columnar batches split across tablets.

use std::fmt::Write;

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercionMode, NullPolicy};
use crate::e2e_tests::helpers::*;
use crate::fixture::FixtureSource;
use crate::payload::EntryPoint;
use crate::scenario::ScenarioError;
use crate::types::SemanticType;

fn int_fixture(rows: usize) -> FixtureSource {
    let mut text = String::from("Time,int32\n");
    for t in 0..rows {
        writeln!(text, "{t},{t}").unwrap();
    }
    FixtureSource::from_text(text)
}

#[test]
fn test_full_tablets_and_remainder() {
    let mut test = TestHarness::new();
    let schema = ColumnSchema::single("int32", SemanticType::Int32);
    let scenario = scenario("root.sg.d1", schema, EntryPoint::ColumnarBatch, CoercionMode::Strict);

    let report = test.run_with_capacity(2, &scenario, &int_fixture(5)).unwrap();

    // Two full tablets, then one holding the remainder
    assert_eq!(report.submissions, 3);
    assert_eq!(report.persisted, 5);
    assert!(test.engine().stats().requests > 0);
}

#[test]
fn test_exact_fit_has_no_remainder() {
    let mut test = TestHarness::new();
    let schema = ColumnSchema::single("int32", SemanticType::Int32);
    let scenario = scenario("root.sg.d1", schema, EntryPoint::ColumnarBatch, CoercionMode::Strict);

    let report = test.run_with_capacity(3, &scenario, &int_fixture(6)).unwrap();

    assert_eq!(report.submissions, 2);
    assert_eq!(report.persisted, 6);
}

#[test]
fn test_all_types_with_nulls() {
    for null_policy in [NullPolicy::Substitute, NullPolicy::Absent] {
        let mut test = TestHarness::new();
        let mut scenario = scenario(
            "root.sg.d1",
            all_types_schema(),
            EntryPoint::ColumnarBatch,
            CoercionMode::Strict,
        );
        scenario.null_policy = null_policy;

        let report = test.run(&scenario, &all_types_fixture()).unwrap();

        let expected = if null_policy == NullPolicy::Absent { 3 } else { 4 };
        assert_eq!(report.persisted, expected, "{null_policy:?}");
    }
}

#[test]
fn test_inferred_mode_is_unsupported() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        all_types_schema(),
        EntryPoint::ColumnarBatch,
        CoercionMode::Inferred,
    );

    let err = test.run(&scenario, &all_types_fixture()).unwrap_err();

    assert!(matches!(
        err,
        ScenarioError::Unsupported {
            entry_point: EntryPoint::ColumnarBatch,
            mode: CoercionMode::Inferred,
        }
    ));
    assert_eq!(test.engine().stats().requests, 0);
}
