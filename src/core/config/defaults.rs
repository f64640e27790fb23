//! Default parameters of each detection method.

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::detectors::{CutoffFilter, MethodKind, MethodParams};

/// Per-method defaults applied when the caller omits a parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodDefaults {
    /// Inter-quartile range distance
    #[serde(default = "MethodDefaults::default_iqr_distance")]
    pub iqr_distance: f64,

    /// Standard deviation distance
    #[serde(default = "MethodDefaults::default_sd_distance")]
    pub sd_distance: f64,

    /// Recursive standard deviation distance
    #[serde(default = "MethodDefaults::default_rsd_distance")]
    pub rsd_distance: f64,

    /// Recursive standard deviation iteration cap
    #[serde(default = "MethodDefaults::default_rsd_max_iteration")]
    pub rsd_max_iteration: usize,

    /// Median absolute deviation distance
    #[serde(default = "MethodDefaults::default_mad_distance")]
    pub mad_distance: f64,

    /// MAD scale constant
    #[serde(default = "MethodDefaults::default_mad_b")]
    pub mad_b: f64,

    /// Tukey fence distance
    #[serde(default = "MethodDefaults::default_tukey_distance")]
    pub tukey_distance: f64,

    /// Sn distance
    #[serde(default = "MethodDefaults::default_sn_distance")]
    pub sn_distance: f64,

    /// Percentile tail fraction
    #[serde(default = "MethodDefaults::default_percentile_distance")]
    pub percentile_distance: f64,

    /// Identical-value frequency
    #[serde(default = "MethodDefaults::default_identical_frequency")]
    pub identical_frequency: f64,

    /// Cut-off filter direction
    #[serde(default)]
    pub cutoff_filter: CutoffFilter,

    /// Whether a value equal to the cut passes the filter
    #[serde(default = "MethodDefaults::default_cutoff_inclusive")]
    pub cutoff_inclusive: bool,
}

impl Default for MethodDefaults {
    fn default() -> Self {
        Self {
            iqr_distance: Self::default_iqr_distance(),
            sd_distance: Self::default_sd_distance(),
            rsd_distance: Self::default_rsd_distance(),
            rsd_max_iteration: Self::default_rsd_max_iteration(),
            mad_distance: Self::default_mad_distance(),
            mad_b: Self::default_mad_b(),
            tukey_distance: Self::default_tukey_distance(),
            sn_distance: Self::default_sn_distance(),
            percentile_distance: Self::default_percentile_distance(),
            identical_frequency: Self::default_identical_frequency(),
            cutoff_filter: CutoffFilter::default(),
            cutoff_inclusive: Self::default_cutoff_inclusive(),
        }
    }
}

impl MethodDefaults {
    const fn default_iqr_distance() -> f64 {
        2.0
    }

    const fn default_sd_distance() -> f64 {
        2.5
    }

    const fn default_rsd_distance() -> f64 {
        3.0
    }

    const fn default_rsd_max_iteration() -> usize {
        50
    }

    const fn default_mad_distance() -> f64 {
        2.5
    }

    const fn default_mad_b() -> f64 {
        crate::core::stats::MAD_NORMAL_CONSISTENCY
    }

    const fn default_tukey_distance() -> f64 {
        1.5
    }

    const fn default_sn_distance() -> f64 {
        3.0
    }

    const fn default_percentile_distance() -> f64 {
        0.025
    }

    const fn default_identical_frequency() -> f64 {
        0.98
    }

    const fn default_cutoff_inclusive() -> bool {
        true
    }

    /// Parameters for `kind` built from these defaults.
    ///
    /// Cut-off has no meaningful default cut, so `cutoff` supplies it.
    pub fn params_for(&self, kind: MethodKind, cutoff: Option<f64>) -> Option<MethodParams> {
        let params = match kind {
            MethodKind::Iqr => MethodParams::Iqr {
                distance: self.iqr_distance,
            },
            MethodKind::Sd => MethodParams::Sd {
                distance: self.sd_distance,
            },
            MethodKind::RecursiveSd => MethodParams::RecursiveSd {
                distance: self.rsd_distance,
                max_iteration: self.rsd_max_iteration,
            },
            MethodKind::Mad => MethodParams::Mad {
                distance: self.mad_distance,
                b: self.mad_b,
            },
            MethodKind::Tukey => MethodParams::Tukey {
                distance: self.tukey_distance,
            },
            MethodKind::Sn => MethodParams::Sn {
                distance: self.sn_distance,
            },
            MethodKind::Percentile => MethodParams::Percentile {
                distance: self.percentile_distance,
            },
            MethodKind::Identical => MethodParams::Identical {
                frequency: self.identical_frequency,
            },
            MethodKind::Cutoff => MethodParams::Cutoff {
                threshold: cutoff?,
                filter: self.cutoff_filter,
                inclusive: self.cutoff_inclusive,
            },
        };
        Some(params)
    }

    /// Every default must be a valid parameter for its method.
    pub fn validate(&self) -> Result<()> {
        for kind in MethodKind::ALL {
            if let Some(params) = self.params_for(kind, Some(0.0)) {
                params.validate()?;
            }
        }
        Ok(())
    }
}
