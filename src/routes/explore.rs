use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    AppState,
    error::AppError,
    routes::{sheets::TableView, xlsx_attachment},
    services::{
        excel,
        explore::{ColumnCandidates, DistributionView, ViewRequest},
    },
};

/// Sheet name used when exporting the filtered rows.
pub const FILTERED_SHEET_NAME: &str = "Filtered_Final";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/explore/columns", get(columns))
        .route("/explore/filter", post(filter_rows))
        .route("/explore/filter/export", post(export_filtered))
        .route("/explore/distribution", post(distribution))
        .route("/explore/distribution/export", post(export_distribution))
}

#[derive(Debug, Serialize)]
pub struct ColumnsResponse<'a> {
    sheet: &'a str,
    row_count: usize,
    default_column: Option<&'a str>,
    columns: &'a [ColumnCandidates],
}

async fn columns(State(state): State<Arc<AppState>>) -> Response {
    let explorer = &state.explorer;
    Json(ColumnsResponse {
        sheet: explorer.sheet(),
        row_count: explorer.table().row_count(),
        default_column: explorer.default_column(),
        columns: explorer.candidates(),
    })
    .into_response()
}

async fn filter_rows(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Response, AppError> {
    let filtered = state.explorer.filter(&request.filters)?;
    tracing::info!(
        "Filter on {} columns kept {} of {} rows",
        request.filters.len(),
        filtered.row_count(),
        state.explorer.table().row_count()
    );
    Ok(Json(TableView::new(None, &filtered)).into_response())
}

async fn export_filtered(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Response, AppError> {
    let filtered = state.explorer.filter(&request.filters)?;
    let buffer = excel::export_table(&filtered, FILTERED_SHEET_NAME)?;
    let file_name = format!("{}_filtered.xlsx", state.explorer.sheet());
    Ok(xlsx_attachment(&file_name, buffer))
}

async fn distribution(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Json<DistributionView>, AppError> {
    let view = state.explorer.distribution(&request)?;
    match &view {
        DistributionView::Ready { column, modalities, shown, .. } => {
            tracing::info!("Distribution of {}: showing {} of {} modalities", column, shown, modalities);
        }
        DistributionView::Empty { message, .. } => {
            tracing::info!("Distribution skipped: {}", message);
        }
    }
    Ok(Json(view))
}

async fn export_distribution(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewRequest>,
) -> Result<Response, AppError> {
    let distribution = state.explorer.full_distribution(&request)?.ok_or_else(|| {
        AppError::InvalidInput("No filtered rows to summarize, nothing to export".to_string())
    })?;

    let name = format!("Distribution_{}", distribution.column);
    let buffer = excel::export_table(&distribution.to_table(), &name)?;
    Ok(xlsx_attachment(&format!("{}.xlsx", name), buffer))
}
