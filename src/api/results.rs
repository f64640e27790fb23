//! Outlier results and the operations shared by single and aggregate results.
//!
//! A result keeps a shared, read-only handle on the table it was computed
//! from. Curation (`add`, `remove`) edits the result in place; remediation
//! (`manage`) and review (`inspect`) build new tables and leave both the
//! result and its table untouched.

mod merge;
mod merge_helpers;
pub mod models;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::api::inspect::{self, InspectOptions, InspectTable};
use crate::api::manage::{self, ManagePolicy};
use crate::core::errors::{OutlierError, Result};
use crate::core::table::{RowId, Table};
use crate::detectors::Threshold;

pub use merge::{merge, merge_with_base};
pub use models::{AggregateResult, FlagSet, OutlierResult, ADDED_MANUALLY, IDENTICAL_COLUMN};

/// Identifiers to flag manually.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Additions(pub Vec<RowId>);

/// Identifiers to unflag.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// Remove from every key, the manual bucket included
    Everywhere(Vec<RowId>),
    /// Remove only from the named keys
    PerColumn(IndexMap<String, Vec<RowId>>),
}

impl Removal {
    /// Build a per-column removal from `(column, identifiers)` pairs.
    pub fn per_column<I, K, V, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = T>,
        T: Into<RowId>,
    {
        Removal::PerColumn(
            pairs
                .into_iter()
                .map(|(column, ids)| (column.into(), ids.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

macro_rules! single_identifier_conversions {
    ($($source:ty),*) => {
        $(
            impl From<$source> for Additions {
                fn from(id: $source) -> Self {
                    Additions(vec![RowId::from(id)])
                }
            }

            impl From<$source> for Removal {
                fn from(id: $source) -> Self {
                    Removal::Everywhere(vec![RowId::from(id)])
                }
            }
        )*
    };
}

single_identifier_conversions!(RowId, &RowId, &str, String, i64, i32, usize);

impl<T: Into<RowId>> From<Vec<T>> for Additions {
    fn from(ids: Vec<T>) -> Self {
        Additions(ids.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RowId> + Clone> From<&[T]> for Additions {
    fn from(ids: &[T]) -> Self {
        Additions(ids.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<RowId>> From<Vec<T>> for Removal {
    fn from(ids: Vec<T>) -> Self {
        Removal::Everywhere(ids.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RowId> + Clone> From<&[T]> for Removal {
    fn from(ids: &[T]) -> Self {
        Removal::Everywhere(ids.iter().cloned().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Vec<RowId>>> for Removal {
    fn from(map: IndexMap<String, Vec<RowId>>) -> Self {
        Removal::PerColumn(map)
    }
}

/// The capability set shared by [`OutlierResult`] and [`AggregateResult`].
pub trait OutlierSet {
    /// Flags and the table they refer to.
    fn flag_set(&self) -> &FlagSet;

    /// Mutable flags; callers must `refresh` after editing.
    fn flag_set_mut(&mut self) -> &mut FlagSet;

    /// Whether the result folds several methods.
    fn is_aggregate(&self) -> bool;

    /// Tested columns; identical-value detection reports its pseudo-column.
    fn columns_tested(&self) -> &[String];

    /// Real columns covered by identical-value detection, if it took part.
    fn identical_columns(&self) -> &[String];

    /// Bounds winsorization clips a tested column to.
    fn clip_bounds(&self, column: &str) -> Result<(f64, f64)>;

    /// Deep copy in aggregate shape.
    fn to_aggregate(&self) -> AggregateResult;

    /// The table the result was computed from.
    fn table(&self) -> &Arc<Table> {
        self.flag_set().table()
    }

    /// Flagged identifiers per tested column, plus the manual bucket.
    fn flagged(&self) -> &IndexMap<String, IndexSet<RowId>> {
        self.flag_set().flagged()
    }

    /// Number of flagged identifiers per key.
    fn count(&self) -> &IndexMap<String, usize> {
        self.flag_set().count()
    }

    /// Table positions of the flagged identifiers per key.
    fn position(&self) -> &IndexMap<String, Vec<usize>> {
        self.flag_set().position()
    }

    /// Union of every flagged set, in table order.
    fn all_flagged(&self) -> &[RowId] {
        self.flag_set().all_flagged()
    }

    /// Table columns that a flagged key stands for.
    fn target_columns(&self, key: &str) -> Vec<String> {
        match key {
            ADDED_MANUALLY => Vec::new(),
            IDENTICAL_COLUMN if !self.identical_columns().is_empty() => {
                self.identical_columns().to_vec()
            }
            _ => vec![key.to_string()],
        }
    }

    /// Flag identifiers manually. Adding an identifier twice has no effect.
    fn add(&mut self, ids: impl Into<Additions>) -> Result<()>
    where
        Self: Sized,
    {
        let Additions(ids) = ids.into();
        let table = Arc::clone(self.table());
        let resolved = ids
            .iter()
            .map(|id| table.resolve(id))
            .collect::<Result<Vec<_>>>()?;

        let flags = self.flag_set_mut();
        let bucket = flags
            .flagged_mut()
            .entry(ADDED_MANUALLY.to_string())
            .or_default();
        for id in resolved {
            bucket.insert(id);
        }
        flags.refresh()?;
        debug!(added = ids.len(), "Manually flagged identifiers");
        Ok(())
    }

    /// Unflag identifiers everywhere or per column.
    fn remove(&mut self, removal: impl Into<Removal>) -> Result<()>
    where
        Self: Sized,
    {
        let table = Arc::clone(self.table());
        let resolve_all = |ids: &[RowId]| -> Result<Vec<RowId>> {
            ids.iter().map(|id| table.resolve(id)).collect()
        };

        match removal.into() {
            Removal::Everywhere(ids) => {
                let resolved = resolve_all(ids.as_slice())?;
                for set in self.flag_set_mut().flagged_mut().values_mut() {
                    for id in &resolved {
                        set.shift_remove(id);
                    }
                }
            }
            Removal::PerColumn(map) => {
                for column in map.keys() {
                    if !self.flagged().contains_key(column) {
                        return Err(OutlierError::column_not_found_in(
                            column.as_str(),
                            "remove: not a tested column",
                        ));
                    }
                }
                // Resolve everything first so an unknown identifier leaves the flags intact.
                let resolved_map = map
                    .iter()
                    .map(|(column, ids)| -> Result<(&String, Vec<RowId>)> {
                        Ok((column, resolve_all(ids.as_slice())?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                for (column, resolved) in resolved_map {
                    if let Some(set) = self.flag_set_mut().flagged_mut().get_mut(column) {
                        for id in &resolved {
                            set.shift_remove(id);
                        }
                    }
                }
            }
        }

        let flags = self.flag_set_mut();
        if flags
            .flagged()
            .get(ADDED_MANUALLY)
            .is_some_and(IndexSet::is_empty)
        {
            flags.flagged_mut().shift_remove(ADDED_MANUALLY);
        }
        flags.refresh()
    }

    /// A remediated copy of the table.
    fn manage(&self, policy: ManagePolicy, columns: Option<&[String]>) -> Result<Table> {
        manage::apply(self, policy, columns)
    }

    /// The review projection of the table.
    fn inspect(&self, options: &InspectOptions) -> Result<InspectTable> {
        inspect::project(self, options)
    }
}

impl OutlierSet for OutlierResult {
    fn flag_set(&self) -> &FlagSet {
        &self.flags
    }

    fn flag_set_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    fn is_aggregate(&self) -> bool {
        false
    }

    fn columns_tested(&self) -> &[String] {
        &self.columns_tested
    }

    fn identical_columns(&self) -> &[String] {
        &self.identical_columns
    }

    fn clip_bounds(&self, column: &str) -> Result<(f64, f64)> {
        let threshold = self.threshold_for(column)?;
        match threshold.bounds() {
            Some(bounds) if self.kind().has_two_sided_bounds() => Ok(bounds),
            _ => Err(OutlierError::winsorize_unsupported(column, self.shortname())),
        }
    }

    fn to_aggregate(&self) -> AggregateResult {
        merge_helpers::normalize(self)
    }
}

impl OutlierSet for AggregateResult {
    fn flag_set(&self) -> &FlagSet {
        &self.flags
    }

    fn flag_set_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    fn is_aggregate(&self) -> bool {
        true
    }

    fn columns_tested(&self) -> &[String] {
        &self.columns_tested
    }

    fn identical_columns(&self) -> &[String] {
        &self.identical_columns
    }

    /// The tightest bounds across the column's methods.
    fn clip_bounds(&self, column: &str) -> Result<(f64, f64)> {
        let thresholds = self.threshold_for(column)?;
        let unsupported: Vec<&str> = thresholds
            .iter()
            .filter(|(kind, threshold)| !kind.has_two_sided_bounds() || threshold.bounds().is_none())
            .map(|(kind, _)| kind.shortname())
            .collect();
        if !unsupported.is_empty() {
            return Err(OutlierError::winsorize_unsupported(column, unsupported.join(", ")));
        }

        thresholds
            .values()
            .filter_map(Threshold::bounds)
            .reduce(|(low_a, high_a), (low_b, high_b)| (low_a.max(low_b), high_a.min(high_b)))
            .ok_or_else(|| OutlierError::winsorize_unsupported(column, "none"))
    }

    fn to_aggregate(&self) -> AggregateResult {
        self.clone()
    }
}


#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
