//! Result records: the single-method result and the multi-method aggregate.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::core::errors::{OutlierError, Result};
use crate::core::table::{RowId, Table};
use crate::detectors::{MethodKind, MethodParams, Threshold};

/// Key of the bucket filled by manual additions.
pub const ADDED_MANUALLY: &str = "added_manually";

/// Pseudo-column under which identical-value detection records its flags.
pub const IDENTICAL_COLUMN: &str = "Identical";

/// Flagged identifiers per key plus the figures derived from them.
///
/// `count`, `position` and `all_flagged` are only ever written by
/// [`FlagSet::refresh`], so they cannot drift from `flagged`.
#[derive(Debug, Clone, Serialize)]
pub struct FlagSet {
    #[serde(skip)]
    table: Arc<Table>,
    flagged: IndexMap<String, IndexSet<RowId>>,
    count: IndexMap<String, usize>,
    position: IndexMap<String, Vec<usize>>,
    all_flagged: Vec<RowId>,
}

impl FlagSet {
    pub(crate) fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            flagged: IndexMap::new(),
            count: IndexMap::new(),
            position: IndexMap::new(),
            all_flagged: Vec::new(),
        }
    }

    /// The table the flags refer to.
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// Flagged identifiers per key.
    pub fn flagged(&self) -> &IndexMap<String, IndexSet<RowId>> {
        &self.flagged
    }

    /// Size of each flagged set.
    pub fn count(&self) -> &IndexMap<String, usize> {
        &self.count
    }

    /// Table positions of each flagged set, ascending.
    pub fn position(&self) -> &IndexMap<String, Vec<usize>> {
        &self.position
    }

    /// Every flagged identifier once, in table order.
    pub fn all_flagged(&self) -> &[RowId] {
        &self.all_flagged
    }

    /// Total number of flagged cells over all keys.
    pub fn total_flagged_values(&self) -> usize {
        self.count.values().sum()
    }

    pub(crate) fn flagged_mut(&mut self) -> &mut IndexMap<String, IndexSet<RowId>> {
        &mut self.flagged
    }

    pub(crate) fn set_table(&mut self, table: Arc<Table>) {
        self.table = table;
    }

    /// Re-derive counts, positions and the union from `flagged`.
    ///
    /// Each key's identifiers are reordered to table order.
    pub(crate) fn refresh(&mut self) -> Result<()> {
        let mut count = IndexMap::with_capacity(self.flagged.len());
        let mut position = IndexMap::with_capacity(self.flagged.len());
        let mut hit = vec![false; self.table.n_rows()];

        for (key, ids) in self.flagged.iter_mut() {
            let positions = self.table.positions(ids.iter())?;
            *ids = positions
                .iter()
                .map(|&p| self.table.index()[p].clone())
                .collect();
            for &p in &positions {
                hit[p] = true;
            }
            count.insert(key.clone(), ids.len());
            position.insert(key.clone(), positions);
        }

        self.all_flagged = hit
            .iter()
            .enumerate()
            .filter(|(_, flagged)| **flagged)
            .map(|(p, _)| self.table.index()[p].clone())
            .collect();
        self.count = count;
        self.position = position;
        Ok(())
    }
}

/// Outcome of one detection method over the tested columns.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierResult {
    pub(crate) params: MethodParams,
    pub(crate) columns_tested: Vec<String>,
    pub(crate) identical_columns: Vec<String>,
    pub(crate) threshold: IndexMap<String, Threshold>,
    #[serde(flatten)]
    pub(crate) flags: FlagSet,
}

impl OutlierResult {
    /// Assemble a result from per-key flags and thresholds.
    pub(crate) fn from_parts(
        table: Arc<Table>,
        params: MethodParams,
        identical_columns: Vec<String>,
        columns: Vec<(String, IndexSet<RowId>, Threshold)>,
    ) -> Result<Self> {
        let mut flags = FlagSet::new(table);
        let mut columns_tested = Vec::with_capacity(columns.len());
        let mut threshold = IndexMap::with_capacity(columns.len());
        for (column, ids, value) in columns {
            flags.flagged_mut().insert(column.clone(), ids);
            threshold.insert(column.clone(), value);
            columns_tested.push(column);
        }
        flags.refresh()?;
        Ok(Self {
            params,
            columns_tested,
            identical_columns,
            threshold,
            flags,
        })
    }

    /// The method that produced this result.
    pub fn kind(&self) -> MethodKind {
        self.params.kind()
    }

    /// Display name of the method
    pub fn method(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Shortname of the method, e.g. `iqr`.
    pub fn shortname(&self) -> &'static str {
        self.kind().shortname()
    }

    /// Parameters the method ran with.
    pub fn params(&self) -> &MethodParams {
        &self.params
    }

    /// The distance, frequency or cut value of the method.
    pub fn distance(&self) -> f64 {
        self.params.distance()
    }

    /// Threshold per tested column.
    pub fn threshold(&self) -> &IndexMap<String, Threshold> {
        &self.threshold
    }

    /// Threshold of one tested column.
    pub fn threshold_for(&self, column: &str) -> Result<&Threshold> {
        self.threshold
            .get(column)
            .ok_or_else(|| OutlierError::column_not_found_in(column, "tested columns"))
    }
}

/// Several methods folded together, with per-column provenance.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub(crate) methods: Vec<MethodParams>,
    pub(crate) distance_map: IndexMap<String, Vec<MethodKind>>,
    pub(crate) columns_tested: Vec<String>,
    pub(crate) columns_tested_with_method: IndexMap<String, Vec<MethodKind>>,
    pub(crate) identical_columns: Vec<String>,
    pub(crate) threshold: IndexMap<String, IndexMap<MethodKind, Threshold>>,
    #[serde(flatten)]
    pub(crate) flags: FlagSet,
}

impl AggregateResult {
    /// Display names of the contributing methods, in merge order.
    pub fn method(&self) -> Vec<&'static str> {
        self.methods.iter().map(|p| p.kind().display_name()).collect()
    }

    /// Shortnames of the contributing methods, in merge order.
    pub fn shortname(&self) -> Vec<&'static str> {
        self.methods.iter().map(|p| p.kind().shortname()).collect()
    }

    /// Parameters of every contributing method.
    pub fn params(&self) -> &[MethodParams] {
        &self.methods
    }

    /// Distance value → methods that used it.
    pub fn distance_map(&self) -> &IndexMap<String, Vec<MethodKind>> {
        &self.distance_map
    }

    /// Methods that tested each column.
    pub fn columns_tested_with_method(&self) -> &IndexMap<String, Vec<MethodKind>> {
        &self.columns_tested_with_method
    }

    /// Thresholds per tested column and method.
    pub fn threshold(&self) -> &IndexMap<String, IndexMap<MethodKind, Threshold>> {
        &self.threshold
    }

    /// Thresholds of one tested column, keyed by method.
    pub fn threshold_for(&self, column: &str) -> Result<&IndexMap<MethodKind, Threshold>> {
        self.threshold
            .get(column)
            .ok_or_else(|| OutlierError::column_not_found_in(column, "tested columns"))
    }
}
