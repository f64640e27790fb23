//! Threshold algorithms: one estimator per detection method.
//!
//! Bounded estimators take the present values of a single column and return
//! `(low, high)`, or `None` when there is nothing to estimate from. The
//! table-level helpers at the bottom handle missing cells and turn a `None`
//! into `DegenerateColumn`.

use tracing::{debug, warn};

use crate::core::config::LimitsConfig;
use crate::core::errors::{OutlierError, Result};
use crate::core::stats;
use crate::core::table::Table;

use super::{BoundsEstimator, CutoffFilter, MethodKind, MethodParams};

/// `median ± distance × IQR`
pub fn iqr_bounds(values: &[f64], params: &MethodParams) -> Option<(f64, f64)> {
    let center = stats::median(values)?;
    let spread = stats::iqr(values)?;
    let distance = params.distance();
    Some((center - distance * spread, center + distance * spread))
}

/// `mean ± distance × population SD`
pub fn sd_bounds(values: &[f64], params: &MethodParams) -> Option<(f64, f64)> {
    let center = stats::mean(values)?;
    let spread = stats::population_std(values)?;
    let distance = params.distance();
    Some((center - distance * spread, center + distance * spread))
}

/// `median ± distance × b × median(|x − median|)`
pub fn mad_bounds(values: &[f64], params: &MethodParams) -> Option<(f64, f64)> {
    let b = match params {
        MethodParams::Mad { b, .. } => *b,
        _ => stats::MAD_NORMAL_CONSISTENCY,
    };
    let center = stats::median(values)?;
    let spread = stats::mad(values, b)?;
    let distance = params.distance();
    Some((center - distance * spread, center + distance * spread))
}

/// Tukey fences: `Q1 − distance × IQR`, `Q3 + distance × IQR`
pub fn tukey_bounds(values: &[f64], params: &MethodParams) -> Option<(f64, f64)> {
    let (q1, q3) = stats::quartiles(values)?;
    let distance = params.distance();
    let spread = q3 - q1;
    Some((q1 - distance * spread, q3 + distance * spread))
}

/// The `distance` and `1 − distance` percentiles.
pub fn percentile_bounds(values: &[f64], params: &MethodParams) -> Option<(f64, f64)> {
    let tail = params.distance();
    Some((
        stats::percentile(values, tail)?,
        stats::percentile(values, 1.0 - tail)?,
    ))
}

/// Whether a value lies outside `(low, high)`.
pub fn outside(value: f64, low: f64, high: f64) -> bool {
    value < low || value > high
}

/// Whether a value falls on the flagged side of a cut.
pub fn beyond_cut(value: f64, threshold: f64, filter: CutoffFilter, inclusive: bool) -> bool {
    match (filter, inclusive) {
        (CutoffFilter::LowPass, true) => value > threshold,
        (CutoffFilter::LowPass, false) => value >= threshold,
        (CutoffFilter::HighPass, true) => value < threshold,
        (CutoffFilter::HighPass, false) => value <= threshold,
    }
}

/// Numeric view of a column that has at least one present value.
pub fn usable_column(table: &Table, column: &str, kind: MethodKind) -> Result<Vec<Option<f64>>> {
    let cells = table.numeric(column)?;
    if cells.iter().all(Option::is_none) {
        return Err(OutlierError::degenerate_column(column, kind.shortname()));
    }
    Ok(cells)
}

/// Two-sided bounds of one table column.
pub fn column_bounds(
    table: &Table,
    column: &str,
    estimator: BoundsEstimator,
    params: &MethodParams,
) -> Result<(f64, f64)> {
    let cells = usable_column(table, column, params.kind())?;
    let values = stats::present(&cells);
    estimator(&values, params)
        .filter(|(low, high)| low.is_finite() && high.is_finite())
        .ok_or_else(|| OutlierError::degenerate_column(column, params.kind().shortname()))
}

/// Outcome of the recursive estimation on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveBounds {
    /// Final lower bound
    pub low: f64,
    /// Final upper bound
    pub high: f64,
    /// Row positions flagged in any iteration or by the final bounds
    pub flagged: Vec<usize>,
    /// Passes run before the bounds settled
    pub iterations: usize,
}

/// Re-estimate bounds on the values kept so far until no further value is
/// dropped or `max_iteration` is reached.
pub fn recursive_bounds(
    cells: &[Option<f64>],
    estimator: BoundsEstimator,
    params: &MethodParams,
    max_iteration: usize,
) -> Option<RecursiveBounds> {
    let mut working: Vec<(usize, f64)> = cells
        .iter()
        .enumerate()
        .filter_map(|(position, cell)| cell.map(|value| (position, value)))
        .collect();
    let mut flagged = vec![false; cells.len()];
    let mut bounds = None;
    let mut iterations = 0;

    while iterations < max_iteration {
        let values: Vec<f64> = working.iter().map(|(_, value)| *value).collect();
        let Some((low, high)) = estimator(&values, params) else {
            break;
        };
        bounds = Some((low, high));
        iterations += 1;

        let before = working.len();
        working.retain(|&(position, value)| {
            if outside(value, low, high) {
                flagged[position] = true;
                false
            } else {
                true
            }
        });
        if working.len() == before {
            break;
        }
    }

    let (low, high) = bounds?;
    for (position, cell) in cells.iter().enumerate() {
        if matches!(cell, Some(value) if outside(*value, low, high)) {
            flagged[position] = true;
        }
    }

    Some(RecursiveBounds {
        low,
        high,
        flagged: flagged
            .iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(position, _)| position)
            .collect(),
        iterations,
    })
}

/// Sn threshold (`distance × Sn`) and every row's median distance to the
/// others. Guarded by the pairwise limits because the cost is quadratic.
pub fn sn_threshold(
    table: &Table,
    column: &str,
    distance: f64,
    limits: &LimitsConfig,
) -> Result<(f64, Vec<Option<f64>>)> {
    let rows = table.n_rows();
    if rows > limits.pairwise_max_rows {
        return Err(OutlierError::resource_exhaustion(
            format!("Sn on column '{column}' needs all pairwise distances"),
            rows,
            limits.pairwise_max_rows,
        ));
    }
    if rows > limits.pairwise_warn_rows {
        warn!(
            column = %column,
            rows,
            limit = limits.pairwise_warn_rows,
            "Sn computes all pairwise distances; this may be slow"
        );
    }

    let cells = usable_column(table, column, MethodKind::Sn)?;
    let (scale, metric) = stats::sn(&cells)
        .ok_or_else(|| OutlierError::degenerate_column(column, MethodKind::Sn.shortname()))?;
    debug!(column = %column, scale, "Computed Sn scale");
    Ok((distance * scale, metric))
}

/// Per row, the share of the most frequent value across `columns`.
pub fn identical_shares(table: &Table, columns: &[String]) -> Result<Vec<f64>> {
    let numeric = columns
        .iter()
        .map(|column| usable_column(table, column, MethodKind::Identical))
        .collect::<Result<Vec<_>>>()?;

    let shares = (0..table.n_rows())
        .map(|row| {
            let cells: Vec<Option<f64>> = numeric.iter().map(|column| column[row]).collect();
            stats::modal_share(&cells, columns.len())
        })
        .collect();
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];

    #[test]
    fn test_iqr_bounds() {
        let (low, high) = iqr_bounds(&SAMPLE, &MethodParams::Iqr { distance: 1.5 }).unwrap();
        // median 3.5, IQR 2.5
        assert_relative_eq!(low, -0.25);
        assert_relative_eq!(high, 7.25);
        assert!(outside(100.0, low, high));
        assert!(!outside(5.0, low, high));
    }

    #[test]
    fn test_tukey_bounds() {
        let (low, high) = tukey_bounds(&SAMPLE, &MethodParams::Tukey { distance: 1.5 }).unwrap();
        assert_relative_eq!(low, 2.25 - 3.75);
        assert_relative_eq!(high, 4.75 + 3.75);
    }

    #[test]
    fn test_sd_and_mad_bounds() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let (low, high) = sd_bounds(&values, &MethodParams::Sd { distance: 2.0 }).unwrap();
        assert_relative_eq!(low, 1.0);
        assert_relative_eq!(high, 9.0);

        let params = MethodParams::Mad {
            distance: 2.0,
            b: 1.0,
        };
        // median 4.5, deviations [2.5,0.5,0.5,0.5,0.5,0.5,2.5,4.5] → 0.5
        let (low, high) = mad_bounds(&values, &params).unwrap();
        assert_relative_eq!(low, 3.5);
        assert_relative_eq!(high, 5.5);
    }

    #[test]
    fn test_percentile_bounds() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let (low, high) =
            percentile_bounds(&values, &MethodParams::Percentile { distance: 0.05 }).unwrap();
        assert_relative_eq!(low, 5.0);
        assert_relative_eq!(high, 95.0);
    }

    #[test]
    fn test_cut_directions() {
        assert!(beyond_cut(20.0, 15.0, CutoffFilter::LowPass, true));
        assert!(!beyond_cut(15.0, 15.0, CutoffFilter::LowPass, true));
        assert!(beyond_cut(15.0, 15.0, CutoffFilter::LowPass, false));
        assert!(beyond_cut(10.0, 15.0, CutoffFilter::HighPass, true));
        assert!(!beyond_cut(15.0, 15.0, CutoffFilter::HighPass, true));
        assert!(beyond_cut(15.0, 15.0, CutoffFilter::HighPass, false));
    }

    #[test]
    fn test_recursive_bounds_accumulate() {
        let mut cells: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 5) as f64)).collect();
        cells.push(Some(40.0));
        cells.push(Some(1000.0));
        cells.push(None);
        let params = MethodParams::RecursiveSd {
            distance: 2.0,
            max_iteration: 10,
        };
        let outcome = recursive_bounds(&cells, sd_bounds, &params, 10).unwrap();
        assert!(outcome.flagged.contains(&21));
        assert!(outcome.flagged.contains(&20));
        assert!(!outcome.flagged.contains(&22));
        assert!(outcome.iterations >= 2);
        assert!(outcome.high < 40.0);
    }

    #[test]
    fn test_recursive_bounds_respects_iteration_cap() {
        let cells: Vec<Option<f64>> = vec![Some(1.0), Some(2.0), Some(3.0), Some(50.0), Some(1e6)];
        let params = MethodParams::RecursiveSd {
            distance: 1.0,
            max_iteration: 1,
        };
        let outcome = recursive_bounds(&cells, sd_bounds, &params, 1).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert!(recursive_bounds(&[None, None], sd_bounds, &params, 3).is_none());
    }

    #[test]
    fn test_degenerate_column_is_reported() {
        let table = Table::from_columns(
            [(
                "x".to_string(),
                vec![crate::core::table::Value::Missing; 3],
            )]
            .into_iter()
            .collect(),
        )
        .unwrap();
        let err = column_bounds(&table, "x", iqr_bounds, &MethodParams::Iqr { distance: 2.0 })
            .unwrap_err();
        assert!(matches!(err, OutlierError::DegenerateColumn { .. }));
    }

    #[test]
    fn test_sn_threshold_limits() {
        let table = Table::from_numeric(vec![("x", (0..50).map(f64::from).collect())]).unwrap();
        let tight = LimitsConfig {
            pairwise_warn_rows: 10,
            pairwise_max_rows: 20,
        };
        let err = sn_threshold(&table, "x", 3.0, &tight).unwrap_err();
        assert!(matches!(err, OutlierError::ResourceExhaustion { current: 50, limit: 20, .. }));

        let (threshold, metric) = sn_threshold(&table, "x", 3.0, &LimitsConfig::default()).unwrap();
        assert!(threshold > 0.0);
        assert_eq!(metric.len(), 50);
    }

    #[test]
    fn test_identical_shares() {
        let table = Table::from_numeric(vec![
            ("a", vec![5.0, 1.0]),
            ("b", vec![5.0, 2.0]),
            ("c", vec![5.0, 1.0]),
        ])
        .unwrap();
        let columns: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let shares = identical_shares(&table, &columns).unwrap();
        assert_relative_eq!(shares[0], 1.0);
        assert_relative_eq!(shares[1], 2.0 / 3.0);
    }
}
