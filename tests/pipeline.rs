mod common;

use std::path::Path;

use cellcheck::{
    CompareError, Dataset, Value,
    config::ReportConfig,
    error::DatasetRole,
    loader::LoadOptions,
    pipeline::{RunOptions, compare_datasets, run},
};

use common::{TestWorkspace, pdf_text};

fn options() -> RunOptions {
    RunOptions {
        load: LoadOptions::default(),
        report: ReportConfig::default(),
    }
}

#[test]
fn run_returns_outcome_and_writes_document() {
    let workspace = TestWorkspace::new();
    let control = workspace.write("control.csv", "A,B\n1,x\n2,y\n");
    let test = workspace.write("test.csv", "A,B\n1,x\n3,y\n");
    let output = workspace.path().join("out.pdf");

    let outcome = run(&control, &test, &output, &options()).expect("run");

    assert_eq!(outcome.output, output);
    assert_eq!((outcome.rows, outcome.columns), (2, 2));
    assert_eq!(outcome.mismatches, 1);
    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.accuracy(), 75.0);
    assert!(pdf_text(&output).contains("(Page 1 of 1) Tj"));
}

#[test]
fn run_handles_header_only_inputs() {
    let workspace = TestWorkspace::new();
    let control = workspace.write("control.csv", "A,B\n");
    let test = workspace.write("test.csv", "A,B\n");
    let output = workspace.path().join("out.pdf");

    let outcome = run(&control, &test, &output, &options()).expect("run");
    assert_eq!(outcome.rows, 0);
    assert_eq!(outcome.mismatches, 0);
    let pdf = pdf_text(&output);
    assert!(pdf.contains("(A) Tj"));
    assert!(!pdf.contains("(Mismatched Values) Tj"));
}

#[test]
fn run_tags_source_failures_with_their_role() {
    let workspace = TestWorkspace::new();
    let good = workspace.write("good.csv", "A\n1\n");
    let ragged = workspace.write("ragged.csv", "A\n1,2\n");
    let output = workspace.path().join("out.pdf");

    let err = run(&ragged, &good, &output, &options()).unwrap_err();
    match err {
        CompareError::SourceRead { role, detail, .. } => {
            assert_eq!(role, DatasetRole::Control);
            assert!(detail.contains("Row 2"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn run_reports_unwritable_output() {
    let workspace = TestWorkspace::new();
    let control = workspace.write("control.csv", "A\n1\n");
    let output = workspace.path().join("missing-dir").join("out.pdf");

    let err = run(&control, &control, &output, &options()).unwrap_err();
    assert!(matches!(err, CompareError::ReportWrite { .. }));
}

#[test]
fn run_rejects_schema_drift_before_writing() {
    let workspace = TestWorkspace::new();
    let control = workspace.write("control.csv", "A,B\n1,2\n");
    let test = workspace.write("test.csv", "A,C\n1,2\n");
    let output = workspace.path().join("out.pdf");

    let err = run(&control, &test, &output, &options()).unwrap_err();
    assert!(matches!(err, CompareError::SchemaMismatch { .. }));
    assert!(!output.exists());
}

#[test]
fn schema_mismatch_wins_over_row_count_mismatch() {
    let control = Dataset::from_rows(
        &["A", "B"],
        vec![vec![Value::Integer(1), Value::text("x")]],
    )
    .unwrap();
    let test = Dataset::from_rows(
        &["A", "C"],
        vec![
            vec![Value::Integer(1), Value::text("x")],
            vec![Value::Integer(2), Value::text("y")],
        ],
    )
    .unwrap();

    let err = compare_datasets(&control, &test, &ReportConfig::default()).unwrap_err();
    assert!(matches!(err, CompareError::SchemaMismatch { .. }), "{err:?}");

    let workspace = TestWorkspace::new();
    let control = workspace.write("control.csv", "A,B\n1,x\n");
    let test = workspace.write("test.csv", "A,C\n1,x\n2,y\n");
    let output = workspace.path().join("out.pdf");
    let err = run(&control, &test, &output, &options()).unwrap_err();
    assert!(matches!(err, CompareError::SchemaMismatch { .. }), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn run_refuses_stdin_for_both_datasets() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("out.pdf");
    let dash = Path::new("-");

    let err = run(dash, dash, &output, &options()).unwrap_err();
    match err {
        CompareError::SourceRead { role, detail, .. } => {
            assert_eq!(role, DatasetRole::Test);
            assert!(detail.contains("standard input"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!output.exists());
}
