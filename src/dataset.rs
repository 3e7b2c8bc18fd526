//! In-memory tabular dataset shared by the loader, the comparison engine
//! and the report builder.
//!
//! A [`Dataset`] is an ordered list of column identifiers plus rows of typed
//! [`Value`]s. Every row holds exactly one value per column; the constructor
//! rejects ragged input so downstream code can index cells without bounds
//! juggling. Row identity is the positional index.

use anyhow::{Result, ensure};

use crate::data::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == columns.len(),
                "Row {} holds {} value(s) but {} column(s) are declared",
                idx,
                row.len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    /// Builds a dataset from string column names and rows of anything that
    /// converts into a [`Value`]. Mostly useful for tests and embedding.
    pub fn from_rows<C, R, V>(columns: &[C], rows: R) -> Result<Self>
    where
        C: AsRef<str>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|values| values.get(column))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
