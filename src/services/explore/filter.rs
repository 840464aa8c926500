use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{CellValue, Table};

/// Per-column allowed values. Columns are combined with AND; a column with
/// no selected value does not constrain anything.
pub type FilterSet = BTreeMap<String, BTreeSet<CellValue>>;

/// The values a user may pick for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCandidates {
    pub column: String,
    pub values: Vec<CellValue>,
}

/// Sorted distinct non-null values of every column.
pub fn candidate_values(table: &Table) -> Vec<ColumnCandidates> {
    table
        .columns()
        .par_iter()
        .enumerate()
        .map(|(idx, column)| {
            let values: BTreeSet<&CellValue> = table
                .column_values(idx)
                .filter(|value| !value.is_null())
                .collect();
            ColumnCandidates {
                column: column.clone(),
                values: values.into_iter().cloned().collect(),
            }
        })
        .collect()
}

/// Rows that satisfy every predicate, in their original order. A null cell
/// never satisfies a predicate.
pub fn apply_filters(table: &Table, filters: &FilterSet) -> Result<Table, AppError> {
    let mut predicates = Vec::with_capacity(filters.len());
    for (column, allowed) in filters {
        let idx = table
            .column_index(column)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown filter column '{}'", column)))?;
        if !allowed.is_empty() {
            predicates.push((idx, allowed));
        }
    }

    if predicates.is_empty() {
        return Ok(table.clone());
    }

    let filtered = table.retain_rows(|row| {
        predicates.iter().all(|(idx, allowed)| {
            let value = &row[*idx];
            !value.is_null() && allowed.contains(value)
        })
    });

    tracing::debug!(
        "Filtered {} rows down to {} with {} predicates",
        table.row_count(),
        filtered.row_count(),
        predicates.len()
    );
    Ok(filtered)
}
