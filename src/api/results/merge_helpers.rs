//! Helper functions for folding results into an aggregate.
//!
//! This module contains the normalization of a single result into aggregate
//! shape and the pairwise combination used by the merge fold.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::core::errors::Result;
use crate::core::table::{RowId, Table};

use super::models::{AggregateResult, OutlierResult};

/// Append the items of `incoming` that `target` does not hold yet.
pub fn extend_unique<T: PartialEq + Clone>(target: &mut Vec<T>, incoming: &[T]) {
    for item in incoming {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

/// Union two flag maps key by key.
pub fn union_flags(
    flagged: &mut IndexMap<String, IndexSet<RowId>>,
    incoming: &IndexMap<String, IndexSet<RowId>>,
) {
    for (key, ids) in incoming {
        flagged
            .entry(key.clone())
            .or_default()
            .extend(ids.iter().cloned());
    }
}

/// Wrap a single result in aggregate shape.
pub fn normalize(result: &OutlierResult) -> AggregateResult {
    let kind = result.kind();
    let mut distance_map = IndexMap::new();
    distance_map.insert(result.params.distance_key(), vec![kind]);

    let columns_tested_with_method = result
        .columns_tested
        .iter()
        .map(|column| (column.clone(), vec![kind]))
        .collect();

    let threshold = result
        .threshold
        .iter()
        .map(|(column, value)| {
            let mut per_method = IndexMap::new();
            per_method.insert(kind, *value);
            (column.clone(), per_method)
        })
        .collect();

    AggregateResult {
        methods: vec![result.params],
        distance_map,
        columns_tested: result.columns_tested.clone(),
        columns_tested_with_method,
        identical_columns: result.identical_columns.clone(),
        threshold,
        flags: result.flags.clone(),
    }
}

/// Fold `incoming` into `acc`. Flag sets of shared columns are unioned.
pub fn combine(mut acc: AggregateResult, incoming: &AggregateResult) -> Result<AggregateResult> {
    acc.methods.extend(incoming.methods.iter().copied());

    for (distance, kinds) in &incoming.distance_map {
        extend_unique(acc.distance_map.entry(distance.clone()).or_default(), kinds);
    }

    extend_unique(&mut acc.columns_tested, &incoming.columns_tested);
    extend_unique(&mut acc.identical_columns, &incoming.identical_columns);

    for column in &incoming.columns_tested {
        if let Some(kinds) = incoming.columns_tested_with_method.get(column) {
            extend_unique(
                acc.columns_tested_with_method
                    .entry(column.clone())
                    .or_default(),
                kinds,
            );
        }
        if let Some(thresholds) = incoming.threshold.get(column) {
            let target = acc.threshold.entry(column.clone()).or_default();
            for (kind, value) in thresholds {
                target.insert(*kind, *value);
            }
        }
    }

    union_flags(acc.flags.flagged_mut(), incoming.flags.flagged());
    acc.flags.refresh()?;
    Ok(acc)
}

/// Point an aggregate at `table`, resolving every identifier against it.
pub fn rebase(aggregate: &mut AggregateResult, table: &Arc<Table>) -> Result<()> {
    let mut rebased = IndexMap::with_capacity(aggregate.flags.flagged().len());
    for (key, ids) in aggregate.flags.flagged() {
        let resolved = ids
            .iter()
            .map(|id| table.resolve(id))
            .collect::<Result<IndexSet<_>>>()?;
        rebased.insert(key.clone(), resolved);
    }
    *aggregate.flags.flagged_mut() = rebased;
    aggregate.flags.set_table(Arc::clone(table));
    aggregate.flags.refresh()
}
