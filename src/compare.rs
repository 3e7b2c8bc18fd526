//! Cell-wise comparison engine.
//!
//! [`compare`] walks both datasets in row-major order and produces a
//! [`MismatchMatrix`] aligned with the control dataset plus one
//! [`MismatchRecord`] per differing cell. Equality is the strict equality of
//! [`Value`]: no tolerance, no coercion between types.
//!
//! The column sets must already have been accepted by
//! [`crate::schema::validate`]. Differing row counts are rejected here with
//! [`CompareError::ShapeMismatch`] before any cell is inspected; rows are never
//! padded, truncated or realigned.

use itertools::iproduct;

use crate::{data::Value, dataset::Dataset, error::CompareError};

/// Boolean grid with one entry per control cell; `true` marks a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchMatrix {
    row_count: usize,
    column_count: usize,
    cells: Vec<bool>,
}

impl MismatchMatrix {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Out-of-range coordinates read as "no mismatch".
    pub fn is_mismatch(&self, row: usize, column: usize) -> bool {
        if row >= self.row_count || column >= self.column_count {
            return false;
        }
        self.cells[row * self.column_count + column]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        (0..self.row_count)
            .map(move |row| &self.cells[row * self.column_count..(row + 1) * self.column_count])
    }

    pub fn to_grid(&self) -> Vec<Vec<bool>> {
        self.rows().map(<[bool]>::to_vec).collect()
    }

    pub fn mismatch_count(&self) -> usize {
        self.cells.iter().filter(|flag| **flag).count()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// One differing cell. `row` is the zero-based positional row index.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchRecord {
    pub row: usize,
    pub column: String,
    pub control: Value,
    pub test: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub matrix: MismatchMatrix,
    pub records: Vec<MismatchRecord>,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.records.is_empty()
    }

    /// Percentage of cells that match, 100 when there are no cells at all.
    pub fn accuracy(&self) -> f64 {
        let total = self.matrix.cell_count();
        if total == 0 {
            return 100.0;
        }
        let matching = total - self.matrix.mismatch_count();
        matching as f64 * 100.0 / total as f64
    }
}

pub fn compare(control: &Dataset, test: &Dataset) -> Result<Comparison, CompareError> {
    if control.row_count() != test.row_count() {
        return Err(CompareError::ShapeMismatch {
            control: control.row_count(),
            test: test.row_count(),
        });
    }

    let row_count = control.row_count();
    let column_count = control.column_count();
    let mut cells = Vec::with_capacity(row_count * column_count);
    let mut records = Vec::new();

    for (row, column) in iproduct!(0..row_count, 0..column_count) {
        let left = &control.rows()[row][column];
        let right = &test.rows()[row][column];
        let differs = left != right;
        cells.push(differs);
        if differs {
            records.push(MismatchRecord {
                row,
                column: control.columns()[column].clone(),
                control: left.clone(),
                test: right.clone(),
            });
        }
    }

    Ok(Comparison {
        matrix: MismatchMatrix {
            row_count,
            column_count,
            cells,
        },
        records,
    })
}
