//! Merging several results into one aggregate.

use std::sync::Arc;

use tracing::info;

use crate::core::errors::{OutlierError, Result};
use crate::core::table::Table;

use super::merge_helpers::{combine, rebase};
use super::models::AggregateResult;
use super::OutlierSet;

fn same_table(a: &Arc<Table>, b: &Arc<Table>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// Left-fold `results` into one aggregate. Every result must share the
/// table of the first one.
///
/// Inputs are never modified. For a column tested by several inputs the
/// aggregate flags the union of their flagged sets.
pub fn merge(results: &[&dyn OutlierSet]) -> Result<AggregateResult> {
    let first = results.first().ok_or_else(|| {
        OutlierError::unsupported_merge("at least one result is required")
    })?;
    if let Some(position) = results
        .iter()
        .position(|result| !same_table(first.table(), result.table()))
    {
        return Err(OutlierError::InconsistentTable { base: 0, position });
    }
    fold(results)
}

/// Like [`merge`], but keeps the table of `results[base_index]`. Inputs
/// built on other tables are re-resolved against it; their identifiers must
/// all be present in its index.
pub fn merge_with_base(results: &[&dyn OutlierSet], base_index: usize) -> Result<AggregateResult> {
    if results.is_empty() {
        return Err(OutlierError::unsupported_merge("at least one result is required"));
    }
    let base = results.get(base_index).ok_or_else(|| {
        OutlierError::invalid_value(
            format!("base index {base_index} is out of range for {} results", results.len()),
            "base_index",
            base_index,
        )
    })?;
    let table = Arc::clone(base.table());

    let mut acc: Option<AggregateResult> = None;
    for result in results {
        let mut normalized = result.to_aggregate();
        if !Arc::ptr_eq(result.table(), &table) {
            rebase(&mut normalized, &table)?;
        }
        acc = Some(match acc {
            None => normalized,
            Some(acc) => combine(acc, &normalized)?,
        });
    }

    let merged = acc.ok_or_else(|| OutlierError::internal("merge produced no result"))?;
    log_merge(&merged, results.len());
    Ok(merged)
}

fn fold(results: &[&dyn OutlierSet]) -> Result<AggregateResult> {
    let mut iter = results.iter();
    let mut acc = match iter.next() {
        Some(first) => first.to_aggregate(),
        None => return Err(OutlierError::unsupported_merge("at least one result is required")),
    };
    for result in iter {
        acc = combine(acc, &result.to_aggregate())?;
    }
    log_merge(&acc, results.len());
    Ok(acc)
}

fn log_merge(merged: &AggregateResult, inputs: usize) {
    info!(
        inputs,
        methods = %merged.shortname().join(", "),
        flagged_rows = merged.all_flagged().len(),
        "Merged outlier results"
    );
}
