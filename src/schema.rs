use itertools::Itertools;

use crate::{dataset::Dataset, error::CompareError};

/// Accepts the pair only when both datasets expose the same column
/// identifiers in the same order.
pub fn validate(control: &Dataset, test: &Dataset) -> Result<(), CompareError> {
    if control.columns() == test.columns() {
        return Ok(());
    }
    Err(CompareError::SchemaMismatch {
        control: control.columns().iter().join(", "),
        test: test.columns().iter().join(", "),
    })
}
