//! Error types for the outlier-rs library.
//!
//! Every failure a caller can hit is a variant of [`OutlierError`]. Variants
//! carry the offending column, identifier or value so the caller can show an
//! actionable message. Nothing here is retried internally: these are data or
//! programming errors, not transient conditions.

use std::io;

use thiserror::Error;

/// Main result type for outlier operations.
pub type Result<T> = std::result::Result<T, OutlierError>;

/// Error type for all outlier detection, curation and remediation operations.
#[derive(Error, Debug)]
pub enum OutlierError {
    /// A named column is absent from the table or from a result's tested columns
    #[error("Column not found: '{column}'{}", context_suffix(.context))]
    ColumnNotFound {
        /// Column that could not be resolved
        column: String,
        /// Where the lookup happened
        context: Option<String>,
    },

    /// A tested column has no usable numeric value
    #[error("Column '{column}' has no usable numeric values for the {method} method")]
    DegenerateColumn {
        /// Column that was tested
        column: String,
        /// Shortname of the method that needed the statistic
        method: String,
    },

    /// Merge was handed something it cannot fold into an aggregate
    #[error("Unsupported merge operand: {message}")]
    UnsupportedMergeOperand {
        /// Error description
        message: String,
    },

    /// Merge inputs reference different tables and no base table was selected
    #[error("Inconsistent tables: result #{position} does not share the table of result #{base}")]
    InconsistentTable {
        /// Index of the result whose table is retained
        base: usize,
        /// Index of the first result with a different table
        position: usize,
    },

    /// Clipping requested for a method without two-sided numeric bounds
    #[error("Winsorization is not possible for column '{column}' with the {method} method")]
    WinsorizeUnsupported {
        /// Column (or pseudo-column) that was selected
        column: String,
        /// Shortname(s) lacking two-sided bounds
        method: String,
    },

    /// Identical-value frequency outside (0, 1]
    #[error("Invalid frequency {value}: expected a value in (0, 1]")]
    InvalidFrequency {
        /// Frequency that was supplied
        value: f64,
    },

    /// A row identifier is absent from the table index
    #[error("Identifier '{identifier}' is not present in the table index")]
    IdentifierNotFound {
        /// Identifier in its display form
        identifier: String,
    },

    /// I/O related errors (reading tables and configuration files)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Validation errors for caller-supplied parameters
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
        /// Actual value received
        actual: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data format being handled
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A computation would exceed a configured size limit
    #[error("Resource exhaustion: {message}")]
    ResourceExhaustion {
        /// Error description
        message: String,
        /// Current workload size
        current: usize,
        /// Maximum allowed size
        limit: usize,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" ({ctx})"),
        None => String::new(),
    }
}

impl OutlierError {
    /// Create a column-not-found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
            context: None,
        }
    }

    /// Create a column-not-found error with lookup context
    pub fn column_not_found_in(column: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
            context: Some(context.into()),
        }
    }

    /// Create a degenerate column error
    pub fn degenerate_column(column: impl Into<String>, method: impl Into<String>) -> Self {
        Self::DegenerateColumn {
            column: column.into(),
            method: method.into(),
        }
    }

    /// Create an unsupported merge operand error
    pub fn unsupported_merge(message: impl Into<String>) -> Self {
        Self::UnsupportedMergeOperand {
            message: message.into(),
        }
    }

    /// Create a winsorize-unsupported error
    pub fn winsorize_unsupported(column: impl Into<String>, method: impl Into<String>) -> Self {
        Self::WinsorizeUnsupported {
            column: column.into(),
            method: method.into(),
        }
    }

    /// Create an identifier-not-found error
    pub fn identifier_not_found(identifier: impl ToString) -> Self {
        Self::IdentifierNotFound {
            identifier: identifier.to_string(),
        }
    }

    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            actual: None,
        }
    }

    /// Create a new validation error naming the field and the rejected value
    pub fn invalid_value(
        message: impl Into<String>,
        field: impl Into<String>,
        actual: impl ToString,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
            actual: Some(actual.to_string()),
        }
    }

    /// Create a new resource exhaustion error
    pub fn resource_exhaustion(message: impl Into<String>, current: usize, limit: usize) -> Self {
        Self::ResourceExhaustion {
            message: message.into(),
            current,
            limit,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::ColumnNotFound { context: ctx, .. } | Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Config { field, .. } if field.is_none() => {
                *field = Some(context.into());
            }
            _ => {}
        }
        self
    }
}

impl From<io::Error> for OutlierError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for OutlierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for OutlierError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<OutlierError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}
