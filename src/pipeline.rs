//! Drives one comparison run: load → validate → compare → build → write.
//!
//! [`compare_datasets`] is the in-memory core and never touches the file
//! system. [`run`] wraps it with the loader and the PDF serializer and
//! measures wall-clock time. Nothing is shared between runs.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::anyhow;
use log::{debug, info};

use crate::{
    compare::{Comparison, compare},
    config::ReportConfig,
    dataset::Dataset,
    error::{CompareError, DatasetRole},
    io_utils,
    loader::{LoadOptions, load_dataset},
    pdf,
    report::{Report, build_report},
    schema,
};

/// Validates the pair, compares it and builds the report model.
pub fn compare_datasets(
    control: &Dataset,
    test: &Dataset,
    config: &ReportConfig,
) -> Result<(Comparison, Report), CompareError> {
    schema::validate(control, test)?;
    let comparison = compare(control, test)?;
    debug!(
        "Compared {} row(s) x {} column(s): {} mismatch(es)",
        comparison.matrix.row_count(),
        comparison.matrix.column_count(),
        comparison.records.len()
    );
    let report = build_report(control, &comparison.matrix, &comparison.records, config);
    Ok((comparison, report))
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub load: LoadOptions,
    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub mismatches: usize,
    pub pages: usize,
    pub elapsed: Duration,
    pub control: Dataset,
    pub comparison: Comparison,
}

impl RunOutcome {
    pub fn accuracy(&self) -> f64 {
        self.comparison.accuracy()
    }
}

pub fn run(
    control_path: &Path,
    test_path: &Path,
    output: &Path,
    options: &RunOptions,
) -> Result<RunOutcome, CompareError> {
    let started = Instant::now();

    // stdin can be consumed once; a second read would see an empty source
    if io_utils::is_dash(control_path) && io_utils::is_dash(test_path) {
        return Err(CompareError::source_read(
            DatasetRole::Test,
            test_path.into(),
            anyhow!("standard input already supplies the control dataset; read the test dataset from a file"),
        ));
    }

    info!("Loading control dataset {:?}", control_path);
    let control = load_dataset(control_path, &options.load)
        .map_err(|err| CompareError::source_read(DatasetRole::Control, control_path.into(), err))?;
    info!("Loading test dataset {:?}", test_path);
    let test = load_dataset(test_path, &options.load)
        .map_err(|err| CompareError::source_read(DatasetRole::Test, test_path.into(), err))?;

    let (comparison, report) = compare_datasets(&control, &test, &options.report)?;
    let pages = pdf::write_report(&report, &options.report, output)
        .map_err(|err| CompareError::report_write(output.into(), err))?;

    Ok(RunOutcome {
        output: output.to_path_buf(),
        rows: control.row_count(),
        columns: control.column_count(),
        mismatches: comparison.records.len(),
        pages,
        elapsed: started.elapsed(),
        control,
        comparison,
    })
}
