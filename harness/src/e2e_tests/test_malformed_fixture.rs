//! Test that malformed fixtures surface parse failures.

use std::io::Write;

use crate::catalog::ColumnSchema;
use crate::coerce::CoercionMode;
use crate::e2e_tests::helpers::*;
use crate::fixture::FixtureSource;
use crate::payload::EntryPoint;
use crate::scenario::ScenarioError;
use crate::session::Session;
use crate::types::{ErrorKind, SemanticType};

fn run(schema: ColumnSchema, text: &str) -> (TestHarness, ScenarioError) {
    let mut test = TestHarness::new();
    let scenario = scenario("root.sg.d1", schema, EntryPoint::MultiRecord, CoercionMode::Strict);
    let err = test
        .run(&scenario, &FixtureSource::from_text(text))
        .unwrap_err();
    (test, err)
}

#[test]
fn test_malformed_number() {
    let schema = ColumnSchema::single("s1", SemanticType::Int32);
    let (mut test, err) = run(schema, "Time,s1\n0,1\n1,twelve\n");

    assert_eq!(err.kind(), Some(ErrorKind::ParseFailure));
    let message = err.to_string();
    assert!(message.contains("line 3"), "{message}");
    assert!(message.contains("twelve"), "{message}");
    // Nothing was submitted
    assert_eq!(test.session.count_rows("root.sg.d1").unwrap(), 0);
    assert_eq!(test.engine().stats().rows_applied, 0);
}

#[test]
fn test_malformed_date() {
    let schema = ColumnSchema::single("s1", SemanticType::Date);
    let (_, err) = run(schema, "0,2024-02-30\n");
    assert!(matches!(err, ScenarioError::Coerce(_)));
}

#[test]
fn test_malformed_timestamp() {
    let (_, err) = run(ColumnSchema::single("s1", SemanticType::Boolean), "noon,true\n");
    assert!(matches!(err, ScenarioError::Fixture(_)));
    assert_eq!(err.kind(), Some(ErrorKind::ParseFailure));
}

#[test]
fn test_wrong_width() {
    let (_, err) = run(ColumnSchema::single("s1", SemanticType::Boolean), "0,true,false\n");
    assert_eq!(err.kind(), Some(ErrorKind::ParseFailure));
}

#[test]
fn test_fixture_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# comment").unwrap();
    writeln!(file, "Time,s1").unwrap();
    writeln!(file, "0,1.5").unwrap();
    writeln!(file, "1,NA").unwrap();
    file.flush().unwrap();

    let fixture = FixtureSource::from_path(file.path())
        .unwrap()
        .with_null_token("NA");
    let mut test = TestHarness::new();
    let scenario = scenario(
        "root.sg.d1",
        ColumnSchema::single("s1", SemanticType::Float64),
        EntryPoint::ColumnarBatch,
        CoercionMode::Strict,
    );

    let report = test.run(&scenario, &fixture).unwrap();
    assert_eq!(report.persisted, 2);
}
