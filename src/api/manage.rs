//! Remediation: a copy of the table with outliers deleted, blanked or
//! clipped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::results::{OutlierSet, ADDED_MANUALLY};
use crate::core::errors::{OutlierError, Result, ResultExt};
use crate::core::table::{Table, Value};

/// What to do with flagged cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagePolicy {
    /// Drop every row flagged in a selected column
    Delete,
    /// Replace flagged cells with a missing value
    Blank,
    /// Clip every value of a selected column into its bounds
    Winsorize,
}

impl fmt::Display for ManagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagePolicy::Delete => "delete",
            ManagePolicy::Blank => "na",
            ManagePolicy::Winsorize => "winsorize",
        };
        f.write_str(name)
    }
}

impl FromStr for ManagePolicy {
    type Err = OutlierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(ManagePolicy::Delete),
            "na" | "blank" => Ok(ManagePolicy::Blank),
            "winsorize" | "winsorise" => Ok(ManagePolicy::Winsorize),
            _ => Err(OutlierError::invalid_value(
                format!("unknown policy '{s}', expected delete, na or winsorize"),
                "policy",
                s,
            )),
        }
    }
}

/// Flagged keys the operation applies to. `None` means every key.
fn selected_keys<R: OutlierSet + ?Sized>(result: &R, columns: Option<&[String]>) -> Result<Vec<String>> {
    match columns {
        None => Ok(result.flagged().keys().cloned().collect()),
        Some(columns) => columns
            .iter()
            .map(|column| {
                if result.flagged().contains_key(column) || result.columns_tested().contains(column) {
                    Ok(column.clone())
                } else {
                    Err(OutlierError::column_not_found_in(column.as_str(), "manage"))
                }
            })
            .collect(),
    }
}

/// Apply `policy` to a copy of the result's table.
pub fn apply<R: OutlierSet + ?Sized>(
    result: &R,
    policy: ManagePolicy,
    columns: Option<&[String]>,
) -> Result<Table> {
    let keys = selected_keys(result, columns)?;
    let source = result.table();

    let managed = match policy {
        ManagePolicy::Delete => {
            let mut drop: Vec<usize> = keys
                .iter()
                .filter_map(|key| result.position().get(key))
                .flatten()
                .copied()
                .collect();
            drop.sort_unstable();
            drop.dedup();
            source.without_positions(&drop)?
        }
        ManagePolicy::Blank => {
            let mut copy = Table::clone(source);
            for key in &keys {
                if key == ADDED_MANUALLY {
                    warn!("Manually added rows have no column to blank; skipped");
                    continue;
                }
                let Some(positions) = result.position().get(key) else {
                    continue;
                };
                for column in result.target_columns(key) {
                    for &position in positions {
                        copy.set(position, &column, Value::Missing)?;
                    }
                }
            }
            copy
        }
        ManagePolicy::Winsorize => {
            let mut copy = Table::clone(source);
            for key in keys.iter().filter(|key| *key != ADDED_MANUALLY) {
                let (low, high) = result.clip_bounds(key)?;
                for cell in copy.column_mut(key).context("winsorize")? {
                    if let Value::Number(value) = cell {
                        *value = clip(*value, low, high);
                    }
                }
            }
            copy
        }
    };

    info!(
        policy = %policy,
        columns = keys.len(),
        rows_before = source.n_rows(),
        rows_after = managed.n_rows(),
        "Remediation applied"
    );
    Ok(managed)
}

/// Clip into `[low, high]` without panicking on crossed bounds.
fn clip(value: f64, low: f64, high: f64) -> f64 {
    if value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("delete".parse::<ManagePolicy>().unwrap(), ManagePolicy::Delete);
        assert_eq!("NA".parse::<ManagePolicy>().unwrap(), ManagePolicy::Blank);
        assert_eq!("winsorise".parse::<ManagePolicy>().unwrap(), ManagePolicy::Winsorize);
        assert!("trim".parse::<ManagePolicy>().is_err());
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(clip(50.0, 0.0, 10.0), 10.0);
        assert_eq!(clip(5.0, 0.0, 10.0), 5.0);
    }
}
