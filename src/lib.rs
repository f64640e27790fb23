//! # Outlier-RS: Outlier Detection for Tabular Data
//!
//! Detects and manages outlying observations in an in-memory table using
//! several independent statistical criteria, and keeps track of which method
//! and parameter flagged which value:
//!
//! - **Threshold methods**: IQR, SD, recursive SD, MAD, Tukey fences, Sn,
//!   percentiles, fixed cut-offs and identical-value frequency
//! - **Results**: per-column flagged rows, thresholds, counts and positions
//! - **Curation**: manual `add` / `remove` of flagged rows
//! - **Merge**: fold several results into one multi-method aggregate
//! - **Remediation**: delete, blank or winsorize flagged values on a copy
//! - **Inspection**: a review projection of flagged vs. non-flagged cells
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         API Layer                            │
//! │   Sample · Results (add/remove) · merge · manage · inspect   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Detectors                  │  Core                          │
//! │ • Method catalogue          │ • Table (shared, read-only)    │
//! │ • Threshold algorithms      │ • Scale estimators             │
//! │ • Detection engine          │ • Config · Validation · Errors │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use outlier_rs::{ColumnSelection, OutlierConfig, OutlierSet, Sample, Table};
//!
//! # fn main() -> outlier_rs::Result<()> {
//! let table = Table::from_numeric(vec![("rt", vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0])])?;
//! let sample = Sample::new(table, &ColumnSelection::All, None, OutlierConfig::default())?;
//!
//! let result = sample.method_iqr(Some(1.5))?;
//! assert_eq!(result.all_flagged().len(), 1);
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core data structures and numerics
pub mod core {
    //! Table model, scale estimators, configuration, validation and errors.

    pub mod config;
    pub mod errors;
    pub mod stats;
    pub mod table;
    pub mod validation;
}

// Detection methods
pub mod detectors;

// Public API
pub mod api {
    //! Results, curation, merge, remediation and inspection.

    pub mod inspect;
    pub mod manage;
    pub mod report;
    pub mod results;
    pub mod sample;
}

// Re-export primary types for convenience
pub use api::inspect::{CellFormat, InspectCell, InspectOptions, InspectTable};
pub use api::manage::ManagePolicy;
pub use api::results::{
    merge, merge_with_base, Additions, AggregateResult, OutlierResult, OutlierSet, Removal,
    ADDED_MANUALLY, IDENTICAL_COLUMN,
};
pub use api::sample::Sample;
pub use core::config::OutlierConfig;
pub use core::errors::{OutlierError, Result, ResultExt};
pub use core::table::{RowId, Table, Value};
pub use core::validation::ColumnSelection;
pub use detectors::{detect, CutoffFilter, MethodKind, MethodParams, Threshold};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
