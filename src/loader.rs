//! Builds a [`Dataset`] from a delimited text file or an `.xlsx` workbook.
//!
//! The first row supplies the column names. Workbooks are read from their
//! first worksheet; rows without any value are skipped there and unnamed
//! header cells become `Unnamed: N`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{Value, infer_value, raw_value},
    dataset::Dataset,
    io_utils, xlsx,
};

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// When false every non-empty cell stays text.
    pub infer_types: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            infer_types: true,
        }
    }
}

pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    if xlsx::is_workbook_path(path) {
        load_workbook(path, options)
    } else {
        load_delimited(path, options)
    }
}

fn load_delimited(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let columns = io_utils::reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let to_value: fn(&str) -> Value = if options.infer_types {
        infer_value
    } else {
        raw_value
    };

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {:?}", row_idx + 2, path))?;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {} in {:?}", row_idx + 2, path))?;
        if decoded.len() > columns.len() {
            bail!(
                "Row {} in {:?} has {} field(s) but the header declares {}",
                row_idx + 2,
                path,
                decoded.len(),
                columns.len()
            );
        }
        let mut row = decoded
            .iter()
            .map(|field| to_value(field))
            .collect::<Vec<_>>();
        row.resize(columns.len(), Value::Empty);
        rows.push(row);
    }

    debug!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        rows.len(),
        columns.len(),
        path
    );
    Dataset::new(columns, rows)
}

fn load_workbook(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let mut rows = xlsx::read_first_sheet(path)?
        .into_iter()
        .filter(|row| row.iter().any(|value| !value.is_empty()));
    let Some(header) = rows.next() else {
        debug!("Workbook {:?} has no populated rows", path);
        return Dataset::new(Vec::new(), Vec::new());
    };
    let body = rows.collect::<Vec<_>>();
    let width = body
        .iter()
        .map(Vec::len)
        .chain([header.len()])
        .max()
        .unwrap_or(0);
    let columns = (0..width)
        .map(|idx| match header.get(idx) {
            Some(value) if !value.is_empty() => value.as_display(),
            _ => format!("Unnamed: {idx}"),
        })
        .collect::<Vec<_>>();
    let rows = body
        .into_iter()
        .map(|mut row| {
            row.resize(width, Value::Empty);
            if options.infer_types {
                row
            } else {
                row.into_iter().map(untyped).collect()
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Loaded {} row(s) x {} column(s) from workbook {:?}",
        rows.len(),
        columns.len(),
        path
    );
    Dataset::new(columns, rows)
}

/// Workbook cells arrive typed; without inference they compare by display text.
fn untyped(value: Value) -> Value {
    match value {
        Value::Empty | Value::Text(_) => value,
        other => Value::Text(other.as_display()),
    }
}
