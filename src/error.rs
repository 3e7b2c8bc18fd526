use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Which side of a comparison a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetRole {
    Control,
    Test,
}

impl fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetRole::Control => f.write_str("control"),
            DatasetRole::Test => f.write_str("test"),
        }
    }
}

/// Failure outcome of a comparison run. A run either produces a complete
/// report or one of these.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Column names are different in the two files (control: [{control}], test: [{test}])")]
    SchemaMismatch { control: String, test: String },
    #[error("Row counts are different in the two files: control has {control} row(s) but test has {test}")]
    ShapeMismatch { control: usize, test: usize },
    #[error("Reading {role} dataset {path:?}: {detail}")]
    SourceRead {
        role: DatasetRole,
        path: PathBuf,
        detail: String,
    },
    #[error("Writing report to {path:?}: {detail}")]
    ReportWrite { path: PathBuf, detail: String },
}

impl CompareError {
    pub(crate) fn source_read(role: DatasetRole, path: PathBuf, err: anyhow::Error) -> Self {
        CompareError::SourceRead {
            role,
            path,
            detail: format!("{err:#}"),
        }
    }

    pub(crate) fn report_write(path: PathBuf, err: anyhow::Error) -> Self {
        CompareError::ReportWrite {
            path,
            detail: format!("{err:#}"),
        }
    }
}
