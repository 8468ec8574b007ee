//! Test that cleanup always runs and is idempotent.

use crate::coerce::{CoercedRow, CoercedValue, CoercionMode};
use crate::e2e_tests::helpers::*;
use crate::fixture::FixtureSource;
use crate::oracle::{OracleError, WriteOracle};
use crate::payload::{EntryPoint, PayloadAssembler};
use crate::session::{Session, Submission};
use crate::simulation::FaultConfig;
use crate::types::{ErrorKind, Namespace, Value};

#[test]
fn test_repeated_cleanup_is_a_no_op() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        all_types_schema(),
        EntryPoint::OneDeviceBatch,
        CoercionMode::Strict,
    );
    test.run(&scenario, &all_types_fixture()).unwrap();

    let oracle = WriteOracle::for_device(&scenario.device);
    for _ in 0..3 {
        assert_eq!(oracle.verify_with(&mut test.session, 0).unwrap(), 0);
    }
}

#[test]
fn test_cleanup_of_unknown_device_succeeds() {
    let mut test = TestHarness::new();
    test.session
        .delete_all_data(&device("root.nowhere.d1"), i64::MAX)
        .unwrap();
    test.session
        .delete_all_data(&device("root.nowhere.d1"), i64::MAX)
        .unwrap();
}

#[test]
fn test_cleanup_runs_after_count_mismatch() {
    let mut test = TestHarness::new();
    let device = device("root.sg.d1");
    test.session
        .create_namespace(&Namespace::parse("root.sg").unwrap())
        .unwrap();
    let row = CoercedRow {
        device: device.clone(),
        timestamp: 0,
        schema: boolean_schema(),
        values: vec![CoercedValue::Strict(Value::Boolean(true))],
    };
    let mut submission = Submission::new(PayloadAssembler::single_record(row).unwrap());
    assert!(submission.submit(&mut test.session).unwrap().is_accepted());

    let err = WriteOracle::for_device(&device)
        .verify_with(&mut test.session, 5)
        .unwrap_err();

    assert!(matches!(
        err,
        OracleError::VerificationMismatch {
            expected: 5,
            actual: 1
        }
    ));
    assert_eq!(err.kind(), ErrorKind::VerificationMismatch);
    assert_eq!(test.engine().point_count(&device), 0);
}

#[test]
fn test_transport_failure_during_write_is_surfaced() {
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        boolean_schema(),
        EntryPoint::SingleRecord,
        CoercionMode::Strict,
    );
    test.session
        .create_namespace(&Namespace::parse("root.sg").unwrap())
        .unwrap();
    test.session
        .transport_mut()
        .set_fault_config(FaultConfig::unreachable());

    let err = test
        .run(&scenario, &FixtureSource::from_text("0,true\n"))
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Transport));
}
