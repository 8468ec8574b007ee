//! Test single-record writes, including the boolean-null example.

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercionMode, ValueCoercer};
use crate::e2e_tests::helpers::*;
use crate::fixture::FixtureSource;
use crate::payload::{EntryPoint, PayloadAssembler};
use crate::session::{Session, Submission};
use crate::types::{Namespace, SemanticType, Value};

#[test]
fn test_boolean_null_counts_one_then_zero() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        boolean_schema(),
        EntryPoint::SingleRecord,
        CoercionMode::Strict,
    );
    let fixture = FixtureSource::from_text("Time,s1\n0,null\n");

    let report = test.run(&scenario, &fixture).unwrap();

    assert_eq!(report.rows_read, 1);
    assert_eq!(report.all_absent_rows, 0);
    assert_eq!(report.expected, 1);
    assert_eq!(report.persisted, 1);
    assert_eq!(report.submissions, 1);
    // Cleanup ran
    assert_eq!(test.session.count_rows("root.sg.d1").unwrap(), 0);
}

#[test]
fn test_boolean_null_is_written_as_false() {
    let mut test = TestHarness::new();
    let device = device("root.sg.d1");
    test.session
        .create_namespace(&Namespace::parse("root.sg").unwrap())
        .unwrap();

    let fixture = FixtureSource::from_text("Time,s1\n0,null\n");
    let row = fixture.rows().next().unwrap().unwrap();
    let coerced = ValueCoercer::new(CoercionMode::Strict)
        .coerce_row(&device, &boolean_schema(), &row)
        .unwrap();
    let mut submission = Submission::new(PayloadAssembler::single_record(coerced).unwrap());

    assert!(submission.submit(&mut test.session).unwrap().is_accepted());
    assert_eq!(test.session.count_rows("root.sg.d1").unwrap(), 1);
    let point = test.engine().point(&device, 0).unwrap();
    assert_eq!(point.get("s1"), Some(&Value::Boolean(false)));
}

#[test]
fn test_single_record_all_types_in_both_modes() {
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        let mut test = TestHarness::new();
        let scenario = scenario("root.sg.d2", all_types_schema(), EntryPoint::SingleRecord, mode);

        let report = test.run(&scenario, &all_types_fixture()).unwrap();

        assert_eq!(report.rows_read, 4, "{mode}");
        assert_eq!(report.persisted, 4, "{mode}");
        assert_eq!(report.submissions, 4, "{mode}");
    }
}

#[test]
fn test_inferred_literals_persist_the_strict_values() {
    let device = device("root.sg.d3");
    let schema = all_types_schema();
    let fixture = all_types_fixture();

    let mut points = Vec::new();
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        let mut test = TestHarness::new();
        test.session
            .create_namespace(&Namespace::parse("root.sg").unwrap())
            .unwrap();
        test.session.declare_columns(&device, &schema).unwrap();
        let coercer = ValueCoercer::new(mode);
        for row in fixture.rows() {
            let coerced = coercer.coerce_row(&device, &schema, &row.unwrap()).unwrap();
            let mut submission =
                Submission::new(PayloadAssembler::single_record(coerced).unwrap());
            assert!(submission.submit(&mut test.session).unwrap().is_accepted());
        }
        points.push(
            (1..=4)
                .map(|t| test.engine().point(&device, t).cloned())
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(points[0], points[1]);
}

#[test]
fn test_extreme_dates_persist_in_both_modes() {
    let schema = ColumnSchema::single("s1", SemanticType::Date);
    for field in ["+250000-01-01", "-0001-06-01"] {
        let fixture = FixtureSource::from_text(format!("0,{field}\n"));
        for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
            let mut test = TestHarness::new();
            let scenario = scenario("root.sg.d1", schema.clone(), EntryPoint::SingleRecord, mode);

            let report = test
                .run(&scenario, &fixture)
                .unwrap_or_else(|e| panic!("{field} [{mode}]: {e}"));

            assert_eq!(report.persisted, 1, "{field} [{mode}]");
        }
    }
}
