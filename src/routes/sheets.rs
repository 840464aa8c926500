use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    AppState,
    error::AppError,
    models::{CellValue, SheetFailure, Table},
    routes::xlsx_attachment,
    services::excel,
};

/// Download name of the untouched input workbook.
pub const WORKBOOK_DOWNLOAD_NAME: &str = "Revue_systematique_complete.xlsx";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workbook", get(workbook_summary))
        .route("/workbook/download", get(download_workbook))
        .route("/sheets/:name", get(get_sheet))
        .route("/sheets/:name/export", get(export_sheet))
}

#[derive(Debug, Serialize)]
pub struct WorkbookSummary<'a> {
    sheet_names: &'a [String],
    advanced_sheet: &'a str,
    unavailable_sheets: &'a [SheetFailure],
}

#[derive(Debug, Serialize)]
pub struct TableView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet: Option<&'a str>,
    columns: &'a [String],
    row_count: usize,
    rows: &'a [Vec<CellValue>],
}

impl<'a> TableView<'a> {
    pub fn new(sheet: Option<&'a str>, table: &'a Table) -> Self {
        Self {
            sheet,
            columns: table.columns(),
            row_count: table.row_count(),
            rows: table.rows(),
        }
    }
}

async fn workbook_summary(State(state): State<Arc<AppState>>) -> Response {
    Json(WorkbookSummary {
        sheet_names: &state.workbook.sheet_names,
        advanced_sheet: state.explorer.sheet(),
        unavailable_sheets: &state.workbook.failures,
    })
    .into_response()
}

async fn download_workbook(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("Serving original workbook ({}KB)", state.workbook.source.len() / 1024);
    xlsx_attachment(WORKBOOK_DOWNLOAD_NAME, state.workbook.source.clone())
}

fn selected_sheet<'a>(state: &'a AppState, name: &str) -> Result<&'a Table, AppError> {
    state.workbook.sheet(name).ok_or_else(|| {
        tracing::warn!("Requested unknown sheet: {}", name);
        AppError::NotFound(format!("Sheet '{}' not found", name))
    })
}

async fn get_sheet(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let table = selected_sheet(&state, &name)?;
    tracing::info!("Showing sheet {} ({} rows)", name, table.row_count());
    Ok(Json(TableView::new(Some(&name), table)).into_response())
}

async fn export_sheet(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let table = selected_sheet(&state, &name)?;
    let buffer = excel::export_table(table, &name)?;
    Ok(xlsx_attachment(&format!("{}.xlsx", name), buffer))
}
