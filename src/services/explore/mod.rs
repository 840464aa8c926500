pub mod distribution;
pub mod filter;
pub mod normalizer;

pub use distribution::{Distribution, DistributionRow, DistributionSettings, ModalityBounds, NullPolicy};
pub use filter::{ColumnCandidates, FilterSet};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Table, Workbook};

/// Column picked for the distribution when the request names none.
pub const PREFERRED_COLUMN: &str = "Category";

/// Everything one interaction asks for. Built fresh per request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewRequest {
    pub filters: FilterSet,
    pub column: Option<String>,
    pub max_modalities: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DistributionView {
    Empty {
        column: Option<String>,
        message: String,
    },
    Ready {
        column: String,
        total_rows: usize,
        total_non_null: usize,
        modalities: usize,
        bounds: ModalityBounds,
        shown: usize,
        rows: Vec<DistributionRow>,
    },
}

/// The normalized article sheet plus what is needed to filter it and
/// summarize it. Read-only once built.
#[derive(Debug, Clone)]
pub struct Explorer {
    sheet: String,
    table: Table,
    candidates: Vec<ColumnCandidates>,
    settings: DistributionSettings,
}

impl Explorer {
    pub fn new(workbook: &Workbook, sheet: &str, settings: DistributionSettings) -> Result<Self, AppError> {
        let raw = workbook.sheet(sheet).ok_or_else(|| {
            AppError::Format(format!("Sheet '{}' is missing or could not be parsed", sheet))
        })?;

        let table = normalizer::normalize(raw);
        let candidates = filter::candidate_values(&table);
        tracing::info!(
            "Explorer ready on sheet {}: {} rows, {} filterable columns",
            sheet,
            table.row_count(),
            candidates.len()
        );

        Ok(Self {
            sheet: sheet.to_string(),
            table,
            candidates,
            settings,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn candidates(&self) -> &[ColumnCandidates] {
        &self.candidates
    }

    /// `Category` when present, the first column otherwise.
    pub fn default_column(&self) -> Option<&str> {
        let columns = self.table.columns();
        columns
            .iter()
            .find(|c| *c == PREFERRED_COLUMN)
            .or_else(|| columns.first())
            .map(String::as_str)
    }

    pub fn filter(&self, filters: &FilterSet) -> Result<Table, AppError> {
        filter::apply_filters(&self.table, filters)
    }

    fn resolve_column(&self, request: &ViewRequest) -> Option<String> {
        match request.column.as_deref() {
            Some(column) if !column.is_empty() => Some(column.to_string()),
            _ => self.default_column().map(str::to_string),
        }
    }

    /// Full distribution of the requested column over the filtered rows, or
    /// `None` when there is nothing to count.
    pub fn full_distribution(&self, request: &ViewRequest) -> Result<Option<Distribution>, AppError> {
        let filtered = self.filter(&request.filters)?;
        let Some(column) = self.resolve_column(request) else {
            return Ok(None);
        };
        Distribution::compute(&filtered, &column, self.settings.nulls)
    }

    pub fn distribution(&self, request: &ViewRequest) -> Result<DistributionView, AppError> {
        let column = self.resolve_column(request);
        let distribution = match self.full_distribution(request)? {
            Some(distribution) if !distribution.rows.is_empty() => distribution,
            Some(_) => {
                return Ok(DistributionView::Empty {
                    message: format!(
                        "Column '{}' has no non-null value in the filtered rows",
                        column.as_deref().unwrap_or_default()
                    ),
                    column,
                });
            }
            None => {
                return Ok(DistributionView::Empty {
                    column,
                    message: "No filtered rows yet. Adjust the filters.".to_string(),
                });
            }
        };

        let modalities = distribution.rows.len();
        let bounds = self.settings.bounds(modalities);
        let rows = distribution.top(bounds.clamp(request.max_modalities));

        Ok(DistributionView::Ready {
            column: distribution.column,
            total_rows: distribution.total_rows,
            total_non_null: distribution.total_non_null,
            modalities,
            bounds,
            shown: rows.len(),
            rows,
        })
    }
}
