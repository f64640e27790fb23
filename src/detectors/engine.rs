//! Detection engine: runs one method over the tested columns and builds the
//! result.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::api::results::{OutlierResult, OutlierSet, IDENTICAL_COLUMN};
use crate::core::config::LimitsConfig;
use crate::core::errors::{OutlierError, Result};
use crate::core::table::{RowId, Table};

use super::thresholds::{
    beyond_cut, column_bounds, identical_shares, outside, recursive_bounds, sn_threshold,
    usable_column,
};
use super::{strategy, MethodParams, Strategy, Threshold};

type ColumnFlags = (String, IndexSet<RowId>, Threshold);

/// Run `params` over `columns` of `table`.
///
/// Repeated column names are tested once. Either every column is computed
/// or the call fails; there is no partial result.
pub fn detect(
    table: Arc<Table>,
    columns: &[String],
    params: MethodParams,
    limits: &LimitsConfig,
) -> Result<OutlierResult> {
    params.validate()?;
    let columns: Vec<String> = columns
        .iter()
        .cloned()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    let columns = columns.as_slice();
    if columns.is_empty() {
        return Err(OutlierError::validation("no column selected for testing"));
    }
    for column in columns {
        if !table.has_column(column) {
            return Err(OutlierError::column_not_found_in(
                column.as_str(),
                format!("{} detection", params.kind().shortname()),
            ));
        }
    }

    let kind = params.kind();
    let mut identical_columns = Vec::new();
    let flags = match strategy(kind)? {
        Strategy::Frequency => {
            identical_columns = columns.to_vec();
            vec![detect_identical(&table, columns, &params)?]
        }
        per_column => columns
            .iter()
            .map(|column| detect_column(&table, column, &params, per_column, limits))
            .collect::<Result<Vec<_>>>()?,
    };

    let result = OutlierResult::from_parts(Arc::clone(&table), params, identical_columns, flags)?;
    info!(
        method = kind.shortname(),
        columns = columns.len(),
        flagged_rows = result.all_flagged().len(),
        "Outlier detection complete"
    );
    Ok(result)
}

fn ids_at(table: &Table, positions: impl IntoIterator<Item = usize>) -> IndexSet<RowId> {
    positions
        .into_iter()
        .map(|position| table.index()[position].clone())
        .collect()
}

fn detect_column(
    table: &Table,
    column: &str,
    params: &MethodParams,
    strategy: Strategy,
    limits: &LimitsConfig,
) -> Result<ColumnFlags> {
    let kind = params.kind();
    let (flagged, threshold) = match strategy {
        Strategy::Bounded(estimator) => {
            let (low, high) = column_bounds(table, column, estimator, params)?;
            let cells = table.numeric(column)?;
            let positions = cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| matches!(cell, Some(value) if outside(*value, low, high)))
                .map(|(position, _)| position);
            (ids_at(table, positions), Threshold::Bounds { low, high })
        }
        Strategy::Recursive(estimator) => {
            let max_iteration = match params {
                MethodParams::RecursiveSd { max_iteration, .. } => *max_iteration,
                _ => 1,
            };
            let cells = usable_column(table, column, kind)?;
            let outcome = recursive_bounds(&cells, estimator, params, max_iteration)
                .ok_or_else(|| OutlierError::degenerate_column(column, kind.shortname()))?;
            debug!(
                column = %column,
                iterations = outcome.iterations,
                max_iteration,
                "Recursive bounds settled"
            );
            (
                ids_at(table, outcome.flagged),
                Threshold::Bounds {
                    low: outcome.low,
                    high: outcome.high,
                },
            )
        }
        Strategy::PairwiseMedian => {
            let (threshold, metric) = sn_threshold(table, column, params.distance(), limits)?;
            let positions = metric
                .iter()
                .enumerate()
                .filter(|(_, distance)| matches!(distance, Some(d) if *d > threshold))
                .map(|(position, _)| position);
            (ids_at(table, positions), Threshold::Scalar(threshold))
        }
        Strategy::Cut => {
            let MethodParams::Cutoff {
                threshold,
                filter,
                inclusive,
            } = *params
            else {
                return Err(OutlierError::internal(format!(
                    "cut strategy used with '{}' parameters",
                    kind.shortname()
                )));
            };
            let cells = usable_column(table, column, kind)?;
            let positions = cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| {
                    matches!(cell, Some(value) if beyond_cut(*value, threshold, filter, inclusive))
                })
                .map(|(position, _)| position);
            (ids_at(table, positions), Threshold::Scalar(threshold))
        }
        Strategy::Frequency => {
            return Err(OutlierError::internal(
                "identical-value detection runs across columns, not per column",
            ))
        }
    };

    debug!(
        column = %column,
        method = kind.shortname(),
        flagged = flagged.len(),
        threshold = %threshold,
        "Column computed"
    );
    Ok((column.to_string(), flagged, threshold))
}

fn detect_identical(table: &Table, columns: &[String], params: &MethodParams) -> Result<ColumnFlags> {
    let frequency = params.distance();
    let shares = identical_shares(table, columns)?;
    let positions = shares
        .iter()
        .enumerate()
        .filter(|(_, share)| **share > frequency)
        .map(|(position, _)| position);
    let flagged = ids_at(table, positions);
    debug!(
        columns = columns.len(),
        frequency,
        flagged = flagged.len(),
        "Identical-value frequency computed"
    );
    Ok((
        IDENTICAL_COLUMN.to_string(),
        flagged,
        Threshold::Scalar(frequency),
    ))
}
