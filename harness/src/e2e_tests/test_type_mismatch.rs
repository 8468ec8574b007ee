//! Test the full type-mismatch matrix against every entry point.

use crate::coerce::CoercionMode;
use crate::e2e_tests::helpers::*;
use crate::mismatch::{MismatchCase, MismatchGenerator, MismatchInput};
use crate::payload::EntryPoint;
use crate::scenario::ScenarioError;
use crate::types::{ErrorKind, SemanticType, Value};

#[test]
fn test_strict_mismatches_are_rejected_client_side() {
    let mut test = TestHarness::new();
    let device = device("root.neg.strict");
    let mut cases = 0;

    for target in SemanticType::ALL {
        for case in MismatchGenerator::mismatched_values(target) {
            for entry_point in entry_points_for(CoercionMode::Strict) {
                test.run_negative(&device, entry_point, &case)
                    .unwrap_or_else(|e| panic!("{entry_point}: {case}: {e}"));
                cases += 1;
            }
        }
    }

    assert!(cases > 0);
    assert_eq!(test.engine().point_count(&device), 0);
    // Strict mismatches never reach the engine as writes
    assert_eq!(test.engine().stats().rows_applied, 0);
}

#[test]
fn test_inferred_mismatches_are_rejected_server_side() {
    let mut test = TestHarness::new();
    let device = device("root.neg.inferred");

    for target in SemanticType::ALL {
        for case in MismatchGenerator::mismatched_literals(target) {
            for entry_point in entry_points_for(CoercionMode::Inferred) {
                test.run_negative(&device, entry_point, &case)
                    .unwrap_or_else(|e| panic!("{entry_point}: {case}: {e}"));
            }
        }
    }

    assert_eq!(test.engine().point_count(&device), 0);
    assert!(test.engine().stats().rejected > 0);
}

#[test]
fn test_columnar_rejects_inferred_cases() {
    let mut test = TestHarness::new();
    let case = MismatchGenerator::mismatched_literals(SemanticType::Int32)
        .into_iter()
        .next()
        .unwrap();

    let err = test
        .run_negative(&device("root.neg.d1"), EntryPoint::ColumnarBatch, &case)
        .unwrap_err();

    assert!(matches!(err, ScenarioError::Unsupported { .. }));
}

#[test]
fn test_matching_value_fails_the_negative_check() {
    let mut test = TestHarness::new();
    let case = MismatchCase {
        target: SemanticType::Int32,
        source: SemanticType::Int32,
        input: MismatchInput::Value(Value::Int32(7)),
        near_miss: false,
        expected: ErrorKind::ClientSideTypeViolation,
    };

    let err = test
        .run_negative(&device("root.neg.d1"), EntryPoint::SingleRecord, &case)
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "verification: expected an error, execution completed normally"
    );
    assert_eq!(err.kind(), Some(ErrorKind::VerificationMismatch));
    // Cleanup still ran
    assert_eq!(test.engine().point_count(&device("root.neg.d1")), 0);
}

#[test]
fn test_wrong_expected_kind_is_reported() {
    let mut test = TestHarness::new();
    let mut case = MismatchGenerator::mismatched_literals(SemanticType::Date)
        .into_iter()
        .next()
        .unwrap();
    case.expected = ErrorKind::ClientSideTypeViolation;

    let err = test
        .run_negative(&device("root.neg.d1"), EntryPoint::MultiRecord, &case)
        .unwrap_err();

    assert!(err.to_string().contains("got a server-side execution failure error"), "{err}");
}
