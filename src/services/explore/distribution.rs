use std::collections::HashMap;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{CellValue, Table};

/// Label shown in place of the missing-value group.
pub const MISSING_LABEL: &str = "NA / missing";
pub const COUNT_HEADER: &str = "N";
pub const PERCENT_ALL_HEADER: &str = "% of all filtered rows";
pub const PERCENT_NON_NULL_HEADER: &str = "% of non-null rows";

/// Whether missing values get their own group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    Include,
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionSettings {
    pub nulls: NullPolicy,
    pub min_modalities: usize,
    pub max_cap: usize,
    pub default_cap: usize,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            nulls: NullPolicy::Include,
            min_modalities: 1,
            max_cap: 50,
            default_cap: 20,
        }
    }
}

/// Range of the top-K control for a distribution with `groups` modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModalityBounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl ModalityBounds {
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(self.min, self.max)
    }
}

impl DistributionSettings {
    pub fn bounds(&self, groups: usize) -> ModalityBounds {
        let max = groups.min(self.max_cap).max(1);
        let min = self.min_modalities.clamp(1, max);
        ModalityBounds {
            min,
            max,
            default: self.default_cap.clamp(min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub value: CellValue,
    pub count: usize,
    pub percent_all: f64,
    pub percent_non_null: Option<f64>,
}

/// Value counts of one column, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub column: String,
    pub total_rows: usize,
    pub total_non_null: usize,
    pub rows: Vec<DistributionRow>,
}

impl Distribution {
    /// Counts each value of `column`. Returns `None` when the table has no
    /// rows, since no percentage can be computed.
    pub fn compute(table: &Table, column: &str, nulls: NullPolicy) -> Result<Option<Self>, AppError> {
        let idx = table
            .column_index(column)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown column '{}'", column)))?;

        let total_rows = table.row_count();
        if table.is_empty() {
            return Ok(None);
        }

        // first-seen order breaks ties between equal counts
        let mut positions: HashMap<&CellValue, usize> = HashMap::new();
        let mut groups: Vec<(&CellValue, usize)> = Vec::new();
        for value in table.column_values(idx) {
            match positions.get(value) {
                Some(&pos) => groups[pos].1 += 1,
                None => {
                    positions.insert(value, groups.len());
                    groups.push((value, 1));
                }
            }
        }
        groups.sort_by(|a, b| b.1.cmp(&a.1));

        let total_non_null = groups
            .iter()
            .filter(|(value, _)| !value.is_null())
            .map(|(_, count)| count)
            .sum::<usize>();

        let rows = groups
            .into_iter()
            .filter(|(value, _)| nulls == NullPolicy::Include || !value.is_null())
            .map(|(value, count)| DistributionRow {
                value: value.clone(),
                count,
                percent_all: percent(count, total_rows),
                percent_non_null: (!value.is_null() && total_non_null > 0)
                    .then(|| percent(count, total_non_null)),
            })
            .collect();

        Ok(Some(Self {
            column: column.to_string(),
            total_rows,
            total_non_null,
            rows,
        }))
    }

    /// The `k` most frequent groups, with the missing group relabelled for
    /// display.
    pub fn top(&self, k: usize) -> Vec<DistributionRow> {
        self.rows
            .iter()
            .take(k)
            .map(|row| {
                let mut row = row.clone();
                if row.value.is_null() {
                    row.value = CellValue::from(MISSING_LABEL);
                }
                row
            })
            .collect()
    }

    /// Every group as a table, keeping the raw null value.
    pub fn to_table(&self) -> Table {
        let columns = vec![
            self.column.clone(),
            COUNT_HEADER.to_string(),
            PERCENT_ALL_HEADER.to_string(),
            PERCENT_NON_NULL_HEADER.to_string(),
        ];
        let rows = self
            .rows
            .iter()
            .map(|row| {
                vec![
                    row.value.clone(),
                    CellValue::Number(row.count as f64),
                    CellValue::Number(row.percent_all),
                    CellValue::from(row.percent_non_null),
                ]
            })
            .collect();
        Table::new(columns, rows)
    }
}

fn percent(count: usize, total: usize) -> f64 {
    count as f64 / total as f64 * 100.0
}
