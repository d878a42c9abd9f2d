//! Argument and dimension checks shared by every backend.
//!
//! Backends call these before touching storage so both implementations
//! reject exactly the same inputs.

use crate::models::{MetadataFilter, VectorRecord, validate_vector};
use crate::{Error, Result};

/// Validates an optional filter.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a malformed filter.
pub fn validate_filter(filter: Option<&MetadataFilter>) -> Result<()> {
    filter.map_or(Ok(()), MetadataFilter::validate)
}

/// Validates `search` arguments that do not depend on store state.
///
/// # Errors
///
/// Returns [`Error::Validation`] for `top_k == 0`, an empty or non-finite
/// query, or a malformed filter.
pub fn validate_search(
    query: &[f32],
    top_k: usize,
    filter: Option<&MetadataFilter>,
) -> Result<()> {
    if top_k == 0 {
        return Err(Error::Validation("top_k must be positive".to_string()));
    }
    validate_vector(query, "query vector")?;
    validate_filter(filter)
}

/// Checks a query vector against the established dimension.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the lengths differ.
pub fn check_query_dimension(established: usize, query: &[f32]) -> Result<()> {
    if query.len() != established {
        return Err(Error::DimensionMismatch {
            expected: established,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Validates a batch of records and resolves the dimension they establish.
///
/// With no established dimension the first record sets it. Returns the
/// dimension in force after the batch would be applied, or `None` for an
/// empty batch on a store with no dimension.
///
/// # Errors
///
/// Returns the first validation failure or dimension conflict in batch
/// order.
pub fn resolve_batch_dimension(
    established: Option<usize>,
    records: &[VectorRecord],
) -> Result<Option<usize>> {
    let mut dimension = established;
    for record in records {
        record.validate()?;
        match dimension {
            Some(expected) if expected != record.dimensions() => {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: record.dimensions(),
                });
            },
            Some(_) => {},
            None => dimension = Some(record.dimensions()),
        }
    }
    Ok(dimension)
}
