//! Scale estimators used by the threshold algorithms.
//!
//! All functions are pure. Missing values are excluded from the statistic by
//! the caller (see [`present`]); functions return `None` when there is no
//! value left to summarize instead of producing NaN.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Normal-consistency constant for the median absolute deviation.
pub const MAD_NORMAL_CONSISTENCY: f64 = 1.4826;

/// Consistency constant of the Sn estimator (Rousseeuw & Croux, 1993).
pub const SN_CONSISTENCY: f64 = 1.1926;

/// Small-sample correction factors of Sn for n = 1..=9.
const SN_SMALL_SAMPLE: [f64; 9] = [0.0, 0.743, 1.851, 0.954, 1.351, 0.993, 1.198, 1.005, 1.131];

/// Non-missing values of a column, in row order.
pub fn present(column: &[Option<f64>]) -> Vec<f64> {
    column.iter().flatten().copied().collect()
}

fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Quantile of already sorted values, interpolating linearly between the
/// order statistics at position `p * (n - 1)`.
pub fn quantile_sorted(sorted_values: &[f64], p: f64) -> Option<f64> {
    if sorted_values.is_empty() {
        return None;
    }

    let n = sorted_values.len();
    let index = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index || upper_index >= n {
        Some(sorted_values[lower_index.min(n - 1)])
    } else {
        let weight = index - lower_index as f64;
        Some(sorted_values[lower_index] * (1.0 - weight) + sorted_values[upper_index] * weight)
    }
}

/// Quantile of unsorted values.
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    quantile_sorted(&sorted, p)
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// First and third quartiles.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    let mut sorted = values.to_vec();
    sort_values(&mut sorted);
    Some((quantile_sorted(&sorted, 0.25)?, quantile_sorted(&sorted, 0.75)?))
}

/// Interquartile range, Q3 − Q1.
pub fn iqr(values: &[f64]) -> Option<f64> {
    quartiles(values).map(|(q1, q3)| q3 - q1)
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Median absolute deviation from the median, scaled by `b`.
pub fn mad(values: &[f64], b: f64) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    median(&deviations).map(|raw| raw * b)
}

/// Percentile at a fraction in [0, 1] (0.025 is the 2.5th percentile).
pub fn percentile(values: &[f64], fraction: f64) -> Option<f64> {
    quantile(values, fraction)
}

/// Small-sample correction `c(n)` of the Sn estimator.
pub fn sn_correction(n: usize) -> f64 {
    match n {
        0 => 0.0,
        1..=9 => SN_SMALL_SAMPLE[n - 1],
        _ if n % 2 == 1 => n as f64 / (n as f64 - 0.9),
        _ => 1.0,
    }
}

/// For every row, the median distance between its value and every other
/// present value of the column. Missing rows, and rows without any other
/// present value, get `None`.
///
/// This is O(n²) in time and O(n) in memory per row.
pub fn median_pairwise_distances(column: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut distances = Vec::with_capacity(column.len());
    column
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = (*value)?;
            distances.clear();
            distances.extend(
                column
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .filter_map(|(_, other)| other.map(|y| (x - y).abs())),
            );
            median(&distances)
        })
        .collect()
}

/// Sn robust scale together with the per-row median distances it was
/// derived from. `None` when no row has a defined median distance.
pub fn sn(column: &[Option<f64>]) -> Option<(f64, Vec<Option<f64>>)> {
    let per_row = median_pairwise_distances(column);
    let defined: Vec<f64> = per_row.iter().flatten().copied().collect();
    let center = median(&defined)?;
    let scale = SN_CONSISTENCY * sn_correction(column.len()) * center;
    Some((scale, per_row))
}

/// Share of the most frequent present value among `n_columns` cells.
/// Returns 0 for a row without any present value.
pub fn modal_share(row: &[Option<f64>], n_columns: usize) -> f64 {
    if n_columns == 0 {
        return 0.0;
    }
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for value in row.iter().flatten() {
        // fold -0.0 into 0.0 so both count as the same answer
        let normalized = if *value == 0.0 { 0.0 } else { *value };
        *counts.entry(normalized.to_bits()).or_insert(0) += 1;
    }
    let top = counts.values().copied().max().unwrap_or(0);
    top as f64 / n_columns as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantiles_use_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert_relative_eq!(median(&values).unwrap(), 3.5);
        let (q1, q3) = quartiles(&values).unwrap();
        assert_relative_eq!(q1, 2.25);
        assert_relative_eq!(q3, 4.75);
        assert_relative_eq!(iqr(&values).unwrap(), 2.5);
    }

    #[test]
    fn test_median_unsorted_input() {
        assert_relative_eq!(median(&[9.0, 1.0, 5.0]).unwrap(), 5.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median(&[]).is_none());
    }

    #[test]
    fn test_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std(&values).unwrap(), 2.0);
    }

    #[test]
    fn test_mad_scaled_by_b() {
        let values = [1.0, 1.0, 2.0, 2.0, 4.0, 6.0, 9.0];
        // median 2, absolute deviations [1,1,0,0,2,4,7] → median 1
        assert_relative_eq!(mad(&values, 1.0).unwrap(), 1.0);
        assert_relative_eq!(
            mad(&values, MAD_NORMAL_CONSISTENCY).unwrap(),
            MAD_NORMAL_CONSISTENCY
        );
    }

    #[test]
    fn test_percentile_fraction() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_relative_eq!(percentile(&values, 0.025).unwrap(), 2.5);
        assert_relative_eq!(percentile(&values, 0.975).unwrap(), 97.5);
    }

    #[test]
    fn test_sn_correction_table() {
        assert_relative_eq!(sn_correction(2), 0.743);
        assert_relative_eq!(sn_correction(9), 1.131);
        assert_relative_eq!(sn_correction(11), 11.0 / 10.1);
        assert_relative_eq!(sn_correction(12), 1.0);
    }

    #[test]
    fn test_median_pairwise_distances_skip_missing() {
        let column = [Some(1.0), None, Some(2.0), Some(4.0)];
        let distances = median_pairwise_distances(&column);
        // row 0: |1-2|, |1-4| → median 2
        assert_relative_eq!(distances[0].unwrap(), 2.0);
        assert!(distances[1].is_none());
        // row 2: |2-1|, |2-4| → 1.5
        assert_relative_eq!(distances[2].unwrap(), 1.5);
        assert_relative_eq!(distances[3].unwrap(), 2.5);
    }

    #[test]
    fn test_sn_scale() {
        let column = [Some(1.0), None, Some(2.0), Some(4.0)];
        let (scale, _) = sn(&column).unwrap();
        // median of [2, 1.5, 2.5] is 2, c(4) = 0.954
        assert_relative_eq!(scale, SN_CONSISTENCY * 0.954 * 2.0);
        assert!(sn(&[None, None]).is_none());
    }

    #[test]
    fn test_modal_share() {
        assert_relative_eq!(modal_share(&[Some(5.0), Some(5.0), Some(5.0)], 3), 1.0);
        assert_relative_eq!(modal_share(&[Some(1.0), Some(2.0), Some(1.0), None], 4), 0.5);
        assert_relative_eq!(modal_share(&[Some(0.0), Some(-0.0)], 2), 1.0);
        assert_relative_eq!(modal_share(&[None, None], 2), 0.0);
    }
}
