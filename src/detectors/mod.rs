//! Detection methods: the method catalogue, its parameters and the
//! kind → estimator dispatch table.

pub mod engine;
pub mod thresholds;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::config::validation::{
    validate_finite, validate_open_range, validate_positive_f64, validate_positive_usize,
};
use crate::core::errors::{OutlierError, Result};

pub use engine::detect;

/// The detection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MethodKind {
    /// Inter-quartile range around the median
    #[serde(rename = "iqr")]
    Iqr,
    /// Standard deviations around the mean
    #[serde(rename = "sd")]
    Sd,
    /// Standard deviations, recomputed until no new value is flagged
    #[serde(rename = "rsd")]
    RecursiveSd,
    /// Median absolute deviations around the median
    #[serde(rename = "mad")]
    Mad,
    /// Tukey fences around the quartiles
    #[serde(rename = "tukey")]
    Tukey,
    /// Rousseeuw-Croux Sn, a pairwise robust scale
    #[serde(rename = "sn")]
    Sn,
    /// Both tails beyond a percentile
    #[serde(rename = "prctile")]
    Percentile,
    /// A fixed threshold
    #[serde(rename = "cut-off")]
    Cutoff,
    /// Rows answering the same value across columns
    #[serde(rename = "id")]
    Identical,
}

impl MethodKind {
    /// Every method, in catalogue order.
    pub const ALL: [MethodKind; 9] = [
        MethodKind::Iqr,
        MethodKind::Sd,
        MethodKind::RecursiveSd,
        MethodKind::Mad,
        MethodKind::Tukey,
        MethodKind::Sn,
        MethodKind::Percentile,
        MethodKind::Cutoff,
        MethodKind::Identical,
    ];

    /// Stable key used in aggregate maps.
    pub fn shortname(self) -> &'static str {
        match self {
            MethodKind::Iqr => "iqr",
            MethodKind::Sd => "sd",
            MethodKind::RecursiveSd => "rsd",
            MethodKind::Mad => "mad",
            MethodKind::Tukey => "tukey",
            MethodKind::Sn => "sn",
            MethodKind::Percentile => "prctile",
            MethodKind::Cutoff => "cut-off",
            MethodKind::Identical => "id",
        }
    }

    /// Human readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            MethodKind::Iqr => "Inter-quartile range",
            MethodKind::Sd => "Standard Deviation",
            MethodKind::RecursiveSd => "Recursive Standard Deviation",
            MethodKind::Mad => "Median Absolute Deviation",
            MethodKind::Tukey => "Tukey",
            MethodKind::Sn => "Sn",
            MethodKind::Percentile => "Percentile",
            MethodKind::Cutoff => "Cut-Off",
            MethodKind::Identical => "Identical",
        }
    }

    /// Whether the method produces a (low, high) pair per column, which is
    /// what winsorization clips to.
    pub fn has_two_sided_bounds(self) -> bool {
        matches!(
            strategy(self),
            Ok(Strategy::Bounded(_) | Strategy::Recursive(_))
        )
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shortname())
    }
}

impl FromStr for MethodKind {
    type Err = OutlierError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => MethodKind::Iqr,
            "sd" => MethodKind::Sd,
            "rsd" | "recursive-sd" => MethodKind::RecursiveSd,
            "mad" => MethodKind::Mad,
            "tukey" => MethodKind::Tukey,
            "sn" => MethodKind::Sn,
            "prctile" | "percentile" => MethodKind::Percentile,
            "cut-off" | "cutoff" => MethodKind::Cutoff,
            "id" | "identical" => MethodKind::Identical,
            _ => {
                return Err(OutlierError::invalid_value(
                    format!("unknown method '{s}'"),
                    "method",
                    s,
                ))
            }
        };
        Ok(kind)
    }
}

/// Direction of a cut-off filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutoffFilter {
    /// Keeps values below the cut; flags values above it
    #[default]
    LowPass,
    /// Keeps values above the cut; flags values below it
    HighPass,
}

impl fmt::Display for CutoffFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoffFilter::LowPass => f.write_str("low-pass"),
            CutoffFilter::HighPass => f.write_str("high-pass"),
        }
    }
}

impl FromStr for CutoffFilter {
    type Err = OutlierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low-pass" | "low_pass" | "lowpass" => Ok(CutoffFilter::LowPass),
            "high-pass" | "high_pass" | "highpass" => Ok(CutoffFilter::HighPass),
            _ => Err(OutlierError::invalid_value(
                format!("unknown cut-off filter '{s}', expected low-pass or high-pass"),
                "filter",
                s,
            )),
        }
    }
}

/// A method together with the parameters driving it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum MethodParams {
    /// See [`MethodKind::Iqr`].
    Iqr {
        /// Multiplier of the IQR
        distance: f64,
    },
    /// See [`MethodKind::Sd`].
    Sd {
        /// Multiplier of the standard deviation
        distance: f64,
    },
    /// See [`MethodKind::RecursiveSd`].
    #[serde(rename = "rsd")]
    RecursiveSd {
        /// Multiplier of the standard deviation
        distance: f64,
        /// Upper bound on the number of passes
        max_iteration: usize,
    },
    /// See [`MethodKind::Mad`].
    Mad {
        /// Multiplier of the scaled MAD
        distance: f64,
        /// Consistency constant applied to the raw MAD
        b: f64,
    },
    /// See [`MethodKind::Tukey`].
    Tukey {
        /// Multiplier of the IQR beyond each quartile
        distance: f64,
    },
    /// See [`MethodKind::Sn`].
    Sn {
        /// Multiplier of Sn
        distance: f64,
    },
    /// See [`MethodKind::Percentile`].
    #[serde(rename = "prctile")]
    Percentile {
        /// Tail mass cut on each side, in `(0, 0.5)`
        distance: f64,
    },
    /// See [`MethodKind::Cutoff`].
    #[serde(rename = "cut-off")]
    Cutoff {
        /// The cut value
        threshold: f64,
        /// Which side of the cut is kept
        filter: CutoffFilter,
        /// Whether values equal to the cut are kept
        inclusive: bool,
    },
    /// See [`MethodKind::Identical`].
    #[serde(rename = "id")]
    Identical {
        /// Share of identical answers above which a row is flagged
        frequency: f64,
    },
}

impl MethodParams {
    /// The method these parameters drive.
    pub fn kind(&self) -> MethodKind {
        match self {
            MethodParams::Iqr { .. } => MethodKind::Iqr,
            MethodParams::Sd { .. } => MethodKind::Sd,
            MethodParams::RecursiveSd { .. } => MethodKind::RecursiveSd,
            MethodParams::Mad { .. } => MethodKind::Mad,
            MethodParams::Tukey { .. } => MethodKind::Tukey,
            MethodParams::Sn { .. } => MethodKind::Sn,
            MethodParams::Percentile { .. } => MethodKind::Percentile,
            MethodParams::Cutoff { .. } => MethodKind::Cutoff,
            MethodParams::Identical { .. } => MethodKind::Identical,
        }
    }

    /// The primary numeric parameter: the distance, the cut or the frequency.
    pub fn distance(&self) -> f64 {
        match *self {
            MethodParams::Iqr { distance }
            | MethodParams::Sd { distance }
            | MethodParams::RecursiveSd { distance, .. }
            | MethodParams::Mad { distance, .. }
            | MethodParams::Tukey { distance }
            | MethodParams::Sn { distance }
            | MethodParams::Percentile { distance } => distance,
            MethodParams::Cutoff { threshold, .. } => threshold,
            MethodParams::Identical { frequency } => frequency,
        }
    }

    /// Key of the distance in an aggregate's distance map.
    pub fn distance_key(&self) -> String {
        format_number(self.distance())
    }

    /// Secondary parameters in display form, if the method has any.
    pub fn extras(&self) -> Option<String> {
        match self {
            MethodParams::RecursiveSd { max_iteration, .. } => {
                Some(format!("max iteration {max_iteration}"))
            }
            MethodParams::Mad { b, .. } => Some(format!("b = {}", format_number(*b))),
            MethodParams::Cutoff {
                filter, inclusive, ..
            } => Some(format!(
                "{filter}, {}",
                if *inclusive { "inclusive" } else { "exclusive" }
            )),
            _ => None,
        }
    }

    /// Reject parameters that would make the method meaningless.
    pub fn validate(&self) -> Result<()> {
        match *self {
            MethodParams::Iqr { distance }
            | MethodParams::Sd { distance }
            | MethodParams::Tukey { distance }
            | MethodParams::Sn { distance } => validate_positive_f64(distance, "distance"),
            MethodParams::RecursiveSd {
                distance,
                max_iteration,
            } => {
                validate_positive_f64(distance, "distance")?;
                validate_positive_usize(max_iteration, "max_iteration")
            }
            MethodParams::Mad { distance, b } => {
                validate_positive_f64(distance, "distance")?;
                validate_positive_f64(b, "b")
            }
            MethodParams::Percentile { distance } => {
                validate_open_range(distance, 0.0, 0.5, "distance")
            }
            MethodParams::Cutoff { threshold, .. } => validate_finite(threshold, "threshold"),
            MethodParams::Identical { frequency } => {
                if frequency > 0.0 && frequency <= 1.0 {
                    Ok(())
                } else {
                    Err(OutlierError::InvalidFrequency { value: frequency })
                }
            }
        }
    }
}

/// Shortest display form of a parameter value (`2`, `2.5`, `0.025`).
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// Threshold recorded for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Two-sided bounds; values outside are flagged
    Bounds { low: f64, high: f64 },
    /// Single value: the Sn distance threshold, the cut or the frequency
    Scalar(f64),
}

impl Threshold {
    /// The (low, high) pair, if the threshold is two-sided.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match *self {
            Threshold::Bounds { low, high } => Some((low, high)),
            Threshold::Scalar(_) => None,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Bounds { low, high } => write!(f, "low: {low:.2}; high: {high:.2}"),
            Threshold::Scalar(value) => write!(f, "{value:.2}"),
        }
    }
}

/// (low, high) from the present values of one column.
pub type BoundsEstimator = fn(&[f64], &MethodParams) -> Option<(f64, f64)>;

/// How the engine turns a column into flags.
#[derive(Clone, Copy)]
pub enum Strategy {
    /// Flag values outside estimated bounds
    Bounded(BoundsEstimator),
    /// Bounded, re-estimated on the shrinking set of kept values
    Recursive(BoundsEstimator),
    /// Flag rows whose median distance to the others exceeds a threshold
    PairwiseMedian,
    /// One-sided comparison with a fixed cut
    Cut,
    /// Joint most-frequent-value share across all tested columns
    Frequency,
}

static STRATEGIES: Lazy<HashMap<MethodKind, Strategy>> = Lazy::new(|| {
    let mut table: HashMap<MethodKind, Strategy> = HashMap::new();
    table.insert(MethodKind::Iqr, Strategy::Bounded(thresholds::iqr_bounds));
    table.insert(MethodKind::Sd, Strategy::Bounded(thresholds::sd_bounds));
    table.insert(
        MethodKind::RecursiveSd,
        Strategy::Recursive(thresholds::sd_bounds),
    );
    table.insert(MethodKind::Mad, Strategy::Bounded(thresholds::mad_bounds));
    table.insert(MethodKind::Tukey, Strategy::Bounded(thresholds::tukey_bounds));
    table.insert(MethodKind::Sn, Strategy::PairwiseMedian);
    table.insert(
        MethodKind::Percentile,
        Strategy::Bounded(thresholds::percentile_bounds),
    );
    table.insert(MethodKind::Cutoff, Strategy::Cut);
    table.insert(MethodKind::Identical, Strategy::Frequency);
    table
});

/// Look up how a method is computed.
pub fn strategy(kind: MethodKind) -> Result<Strategy> {
    STRATEGIES
        .get(&kind)
        .copied()
        .ok_or_else(|| OutlierError::internal(format!("no estimator registered for '{kind}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortname_round_trip() {
        for kind in MethodKind::ALL {
            assert_eq!(kind.shortname().parse::<MethodKind>().unwrap(), kind);
            assert!(STRATEGIES.contains_key(&kind));
        }
        assert_eq!("Cutoff".parse::<MethodKind>().unwrap(), MethodKind::Cutoff);
        assert!("zscore".parse::<MethodKind>().is_err());
    }

    #[test]
    fn test_two_sided_methods() {
        let two_sided: Vec<_> = MethodKind::ALL
            .into_iter()
            .filter(|k| k.has_two_sided_bounds())
            .collect();
        assert_eq!(
            two_sided,
            vec![
                MethodKind::Iqr,
                MethodKind::Sd,
                MethodKind::RecursiveSd,
                MethodKind::Mad,
                MethodKind::Tukey,
                MethodKind::Percentile
            ]
        );
    }

    #[test]
    fn test_params_validation() {
        assert!(MethodParams::Iqr { distance: 2.0 }.validate().is_ok());
        assert!(MethodParams::Iqr { distance: 0.0 }.validate().is_err());
        assert!(MethodParams::Percentile { distance: 2.5 }.validate().is_err());
        assert!(MethodParams::Percentile { distance: 0.025 }.validate().is_ok());
        assert!(MethodParams::RecursiveSd {
            distance: 3.0,
            max_iteration: 0
        }
        .validate()
        .is_err());
        assert!(matches!(
            MethodParams::Identical { frequency: 1.5 }.validate(),
            Err(OutlierError::InvalidFrequency { .. })
        ));
        assert!(MethodParams::Identical { frequency: 1.0 }.validate().is_ok());
        assert!(MethodParams::Cutoff {
            threshold: f64::NAN,
            filter: CutoffFilter::LowPass,
            inclusive: true
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_distance_key_and_extras() {
        assert_eq!(MethodParams::Iqr { distance: 2.0 }.distance_key(), "2");
        assert_eq!(MethodParams::Sd { distance: 2.5 }.distance_key(), "2.5");
        let mad = MethodParams::Mad {
            distance: 2.5,
            b: 1.4826,
        };
        assert_eq!(mad.extras().as_deref(), Some("b = 1.4826"));
        assert_eq!(MethodParams::Tukey { distance: 1.5 }.extras(), None);
    }

    #[test]
    fn test_params_serde_tag() {
        let json = serde_json::to_value(MethodParams::Percentile { distance: 0.025 }).unwrap();
        assert_eq!(json["method"], "prctile");
        let back: MethodParams = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), MethodKind::Percentile);
    }
}
