//! Text summary of results.

use std::fmt::{self, Write as _};

use crate::api::results::{
    AggregateResult, OutlierResult, OutlierSet, ADDED_MANUALLY, IDENTICAL_COLUMN,
};
use crate::core::table::RowId;
use crate::detectors::{format_number, MethodKind, Threshold};

const RULE_WIDTH: usize = 30;
const TITLE: &str = "Summary of the outliers detection";

fn write_title(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rule = "-".repeat(TITLE.len());
    writeln!(f, "{rule}")?;
    writeln!(f, "{TITLE}")?;
    writeln!(f, "{rule}")?;
    writeln!(f)
}

/// Up to five identifiers; longer lists show the first two and the last.
pub fn sample_identifiers(ids: &[RowId]) -> String {
    match ids.len() {
        0 => String::new(),
        1..=5 => ids
            .iter()
            .map(RowId::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        n => format!("{}, {}, ..., {}", ids[0], ids[1], ids[n - 1]),
    }
}

fn plural_suffix(count: usize) -> &'static str {
    match count {
        0 => ".",
        1 => " : ",
        _ => "s : ",
    }
}

fn flagged_ids<R: OutlierSet + ?Sized>(result: &R, key: &str) -> Vec<RowId> {
    result
        .flagged()
        .get(key)
        .map(|ids| ids.iter().cloned().collect())
        .unwrap_or_default()
}

fn write_manual<R: OutlierSet + ?Sized>(f: &mut fmt::Formatter<'_>, result: &R) -> fmt::Result {
    if let Some(count) = result.count().get(ADDED_MANUALLY) {
        writeln!(
            f,
            "You added manually {count} outlier{}{}",
            plural_suffix(*count),
            sample_identifiers(&flagged_ids(result, ADDED_MANUALLY))
        )?;
        writeln!(f)?;
    }
    Ok(())
}

fn write_column_line<R: OutlierSet + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    result: &R,
    column: &str,
    frequency: Option<f64>,
) -> fmt::Result {
    let count = result.count().get(column).copied().unwrap_or(0);
    let ids = sample_identifiers(&flagged_ids(result, column));
    match frequency {
        Some(frequency) => writeln!(
            f,
            "There {} {count} row{} with a frequency above {}{}{ids}",
            if count == 1 { "is" } else { "are" },
            if count == 1 { "" } else { "s" },
            format_number(frequency),
            if count == 0 { "." } else { " : " },
        ),
        None => writeln!(f, "The column {column} has {count} outlier{}{ids}", plural_suffix(count)),
    }
}

impl fmt::Display for OutlierResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_title(f)?;
        writeln!(f, "Method used : {}", self.method())?;
        match self.params().extras() {
            Some(extras) => writeln!(f, "Distance used : {} ({extras})", self.params().distance_key())?,
            None => writeln!(f, "Distance used : {}", self.params().distance_key())?,
        }
        let tested = if self.identical_columns().is_empty() {
            self.columns_tested()
        } else {
            self.identical_columns()
        };
        writeln!(f, "Column tested : {}", tested.join(", "))?;
        writeln!(f, "Total number of outliers : {}", self.all_flagged().len())?;
        writeln!(
            f,
            "Total number of flagged values : {}",
            self.flag_set().total_flagged_values()
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(f)?;

        for column in self.columns_tested() {
            match self.threshold().get(column) {
                Some(Threshold::Scalar(frequency)) if self.kind() == MethodKind::Identical => {
                    write_column_line(f, self, column, Some(*frequency))?;
                }
                Some(Threshold::Scalar(value)) if self.kind() == MethodKind::Sn => {
                    write_column_line(f, self, column, None)?;
                    writeln!(f, "Threshold median distance to other point is {value:.2}")?;
                }
                Some(Threshold::Scalar(value)) => {
                    write_column_line(f, self, column, None)?;
                    writeln!(f, "Cut-off : {value:.2} ({})", self.params().extras().unwrap_or_default())?;
                }
                Some(Threshold::Bounds { low, high }) => {
                    write_column_line(f, self, column, None)?;
                    writeln!(f, "Low threshold : {low:.2} / High threshold : {high:.2}")?;
                }
                None => write_column_line(f, self, column, None)?,
            }
            writeln!(f)?;
        }

        write_manual(f, self)
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_title(f)?;
        writeln!(f, "Method used : {}", self.method().join(", "))?;

        let distances = self
            .distance_map()
            .iter()
            .map(|(distance, kinds)| {
                let names: Vec<&str> = kinds.iter().map(|k| k.shortname()).collect();
                format!("{distance} ({})", names.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "Distance used : {distances}")?;

        let tested = self
            .columns_tested()
            .iter()
            .map(|column| {
                let names: Vec<&str> = self
                    .columns_tested_with_method()
                    .get(column)
                    .map(|kinds| kinds.iter().map(|k| k.shortname()).collect())
                    .unwrap_or_default();
                format!("{column} ({})", names.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "Column tested : {tested}")?;
        writeln!(f, "Total number of outliers : {}", self.all_flagged().len())?;
        writeln!(
            f,
            "Total number of flagged values : {}",
            self.flag_set().total_flagged_values()
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(f)?;

        for column in self.columns_tested() {
            let thresholds = self.threshold().get(column);
            let frequency = thresholds
                .and_then(|t| t.get(&MethodKind::Identical))
                .and_then(|t| match t {
                    Threshold::Scalar(value) if column == IDENTICAL_COLUMN => Some(*value),
                    _ => None,
                });
            write_column_line(f, self, column, frequency)?;

            let mut line = String::new();
            for (kind, threshold) in thresholds.into_iter().flatten() {
                match (kind, threshold) {
                    (MethodKind::Identical, _) => {}
                    (_, Threshold::Bounds { low, high }) => {
                        let _ = write!(
                            line,
                            "{}: low: {low:.2} / high: {high:.2} ; ",
                            kind.shortname().to_uppercase()
                        );
                    }
                    (_, Threshold::Scalar(value)) => {
                        let _ = write!(line, "{}: {value:.2} ; ", kind.shortname().to_uppercase());
                    }
                }
            }
            if !line.is_empty() {
                writeln!(f, "{}", line.trim_end_matches(" ; "))?;
            }
            writeln!(f)?;
        }

        write_manual(f, self)
    }
}
