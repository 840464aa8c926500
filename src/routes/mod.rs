use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;

use crate::services::excel::utils::download_file_name;
use crate::AppState;

pub mod explore;
pub mod sheets;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Spreadsheet download response. The quoted `filename` is an ASCII
/// fallback, `filename*` carries the exact UTF-8 name (RFC 6266).
pub fn xlsx_attachment(file_name: &str, body: impl Into<Bytes>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        download_file_name(file_name),
        urlencoding::encode(file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let body: Bytes = body.into();

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_MIME)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
