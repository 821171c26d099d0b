//! Report generation and download endpoints

use crate::api::form::parse_screening_form;
use crate::api::run_screening;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::PredictResponse;
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

/// POST /api/report
///
/// Run the screening pipeline, apply the borderline verdict band, compose
/// the PDF report, and return the decision JSON with a download link.
pub async fn generate_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let form = parse_screening_form(multipart).await?;
    run_screening(state, form, true).await.map(Json)
}

/// GET /api/download/:filename
///
/// Serve a previously generated report or side-output figure from the
/// media directory. Only bare file names are accepted; anything that could
/// traverse out of the directory is rejected.
pub async fn download_report(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let content_type = if filename.ends_with(".pdf") {
        "application/pdf"
    } else if filename.ends_with(".png") {
        "image/png"
    } else {
        return Err(ApiError::BadRequest("Invalid file name".to_string()));
    };
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::BadRequest("Invalid file name".to_string()));
    }

    let path = state.config.media_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("File not found: {}", filename)))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/report", post(generate_report))
        .route("/api/download/:filename", get(download_report))
}
