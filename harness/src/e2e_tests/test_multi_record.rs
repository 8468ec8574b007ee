//! Test multi-record writes.

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercedRow, CoercedValue, CoercionMode};
use crate::e2e_tests::helpers::*;
use crate::payload::{EntryPoint, PayloadAssembler};
use crate::proto::google::rpc::Code;
use crate::session::{Session, Submission, SubmissionOutcome};
use crate::types::{Namespace, SemanticType};

#[test]
fn test_multi_record_is_one_submission() {
    for mode in [CoercionMode::Strict, CoercionMode::Inferred] {
        let mut test = TestHarness::new();
        let scenario = scenario("root.sg.d1", all_types_schema(), EntryPoint::MultiRecord, mode);

        let report = test.run(&scenario, &all_types_fixture()).unwrap();

        assert_eq!(report.submissions, 1, "{mode}");
        assert_eq!(report.persisted, 4, "{mode}");
    }
}

#[test]
fn test_multi_record_spans_devices() {
    let mut test = TestHarness::new();
    test.session
        .create_namespace(&Namespace::parse("root.sg").unwrap())
        .unwrap();
    let schema = ColumnSchema::single("s1", SemanticType::Int32);
    let rows = ["root.sg.d1", "root.sg.d2", "root.sg.d1"]
        .into_iter()
        .enumerate()
        .map(|(t, path)| CoercedRow {
            device: device(path),
            timestamp: i64::try_from(t).unwrap(),
            schema: schema.clone(),
            values: vec![CoercedValue::Inferred(t.to_string())],
        })
        .collect();

    let mut submission = Submission::new(PayloadAssembler::multi_record(rows).unwrap());
    assert!(submission.submit(&mut test.session).unwrap().is_accepted());

    assert_eq!(test.session.count_rows("root.sg.d1").unwrap(), 2);
    assert_eq!(test.session.count_rows("root.sg.d2").unwrap(), 1);
    assert_eq!(test.session.count_rows("root.sg.**").unwrap(), 3);
}

#[test]
fn test_rejected_batch_applies_nothing() {
    let mut test = TestHarness::new();
    let device = device("root.sg.d1");
    let schema = ColumnSchema::single("s1", SemanticType::Int32);
    test.session
        .create_namespace(&Namespace::parse("root.sg").unwrap())
        .unwrap();
    test.session.declare_columns(&device, &schema).unwrap();

    // The second literal is out of range for INT32
    let rows = ["1", "99999999999"]
        .into_iter()
        .enumerate()
        .map(|(t, literal)| CoercedRow {
            device: device.clone(),
            timestamp: i64::try_from(t).unwrap(),
            schema: schema.clone(),
            values: vec![CoercedValue::Inferred(literal.to_string())],
        })
        .collect();

    let mut submission = Submission::new(PayloadAssembler::multi_record(rows).unwrap());
    let outcome = submission.submit(&mut test.session).unwrap();
    assert!(matches!(
        outcome,
        SubmissionOutcome::RejectedServerSide {
            code: Code::InvalidArgument,
            ..
        }
    ));
    assert_eq!(test.session.count_rows("root.sg.d1").unwrap(), 0);
}
