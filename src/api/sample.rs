//! Validated entry point: a table, its tested columns and the defaults used
//! to fill in omitted parameters.

use std::sync::Arc;

use tracing::info;

use crate::api::results::OutlierResult;
use crate::core::config::OutlierConfig;
use crate::core::errors::{OutlierError, Result};
use crate::core::table::Table;
use crate::core::validation::{coerce_numeric, ColumnSelection, ConversionReport};
use crate::detectors::{detect, CutoffFilter, MethodKind, MethodParams};

/// A table prepared for detection.
#[derive(Debug, Clone)]
pub struct Sample {
    table: Arc<Table>,
    columns: Vec<String>,
    config: OutlierConfig,
    conversion: ConversionReport,
}

impl Sample {
    /// Validate `table` once: optionally promote `index_column` to the row
    /// index, resolve the selection and coerce tested columns to numbers.
    pub fn new(
        table: Table,
        selection: &ColumnSelection,
        index_column: Option<&str>,
        config: OutlierConfig,
    ) -> Result<Self> {
        config.validate()?;
        let columns = selection.resolve(&table, index_column)?;
        let mut table = match index_column {
            Some(name) => table.with_index_column(name)?,
            None => table,
        };
        let conversion = coerce_numeric(&mut table, &columns)?;
        info!(
            rows = table.n_rows(),
            columns = columns.len(),
            "Sample ready for detection"
        );
        Ok(Self {
            table: Arc::new(table),
            columns,
            config,
            conversion,
        })
    }

    /// Use an already validated shared table as is.
    pub fn from_shared(table: Arc<Table>, columns: Vec<String>, config: OutlierConfig) -> Result<Self> {
        config.validate()?;
        if let Some(missing) = columns.iter().find(|column| !table.has_column(column)) {
            return Err(OutlierError::column_not_found_in(missing.as_str(), "sample"));
        }
        Ok(Self {
            table,
            columns,
            config,
            conversion: ConversionReport::default(),
        })
    }

    /// The coerced table shared with every result.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Columns selected for testing.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Defaults and limits in effect.
    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// What numeric coercion changed while building the sample.
    pub fn conversion(&self) -> &ConversionReport {
        &self.conversion
    }

    /// Run a method with explicit parameters.
    pub fn detect(&self, params: MethodParams) -> Result<OutlierResult> {
        detect(
            Arc::clone(&self.table),
            &self.columns,
            params,
            &self.config.limits,
        )
    }

    /// Run a method with its configured defaults.
    pub fn detect_default(&self, kind: MethodKind) -> Result<OutlierResult> {
        let params = self.config.defaults.params_for(kind, None).ok_or_else(|| {
            OutlierError::invalid_value(
                "the cut-off method needs an explicit threshold",
                "threshold",
                kind,
            )
        })?;
        self.detect(params)
    }

    /// Median ± `distance` × IQR.
    pub fn method_iqr(&self, distance: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Iqr {
            distance: distance.unwrap_or(self.config.defaults.iqr_distance),
        })
    }

    /// Mean ± `distance` × SD.
    pub fn method_sd(&self, distance: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Sd {
            distance: distance.unwrap_or(self.config.defaults.sd_distance),
        })
    }

    /// SD bounds re-estimated on the remaining values, at most `max_iteration` times.
    pub fn method_rsd(&self, distance: Option<f64>, max_iteration: Option<usize>) -> Result<OutlierResult> {
        self.detect(MethodParams::RecursiveSd {
            distance: distance.unwrap_or(self.config.defaults.rsd_distance),
            max_iteration: max_iteration.unwrap_or(self.config.defaults.rsd_max_iteration),
        })
    }

    /// Median ± `distance` × `b` × MAD.
    pub fn method_mad(&self, distance: Option<f64>, b: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Mad {
            distance: distance.unwrap_or(self.config.defaults.mad_distance),
            b: b.unwrap_or(self.config.defaults.mad_b),
        })
    }

    /// Tukey fences at `distance` × IQR beyond the quartiles.
    pub fn method_tukey(&self, distance: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Tukey {
            distance: distance.unwrap_or(self.config.defaults.tukey_distance),
        })
    }

    /// Quadratic in the number of rows; see `limits` in the configuration.
    pub fn method_sn(&self, distance: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Sn {
            distance: distance.unwrap_or(self.config.defaults.sn_distance),
        })
    }

    /// `distance` is a tail fraction in (0, 0.5), e.g. 0.025.
    pub fn method_prctile(&self, distance: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Percentile {
            distance: distance.unwrap_or(self.config.defaults.percentile_distance),
        })
    }

    /// Flags values on the far side of a fixed `threshold`.
    pub fn method_cutoff(
        &self,
        threshold: f64,
        filter: Option<CutoffFilter>,
        inclusive: Option<bool>,
    ) -> Result<OutlierResult> {
        self.detect(MethodParams::Cutoff {
            threshold,
            filter: filter.unwrap_or(self.config.defaults.cutoff_filter),
            inclusive: inclusive.unwrap_or(self.config.defaults.cutoff_inclusive),
        })
    }

    /// Flags rows whose most frequent answer exceeds `frequency` of the tested columns.
    pub fn method_identical(&self, frequency: Option<f64>) -> Result<OutlierResult> {
        self.detect(MethodParams::Identical {
            frequency: frequency.unwrap_or(self.config.defaults.identical_frequency),
        })
    }
}
