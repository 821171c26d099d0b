//! Spectrogram endpoint

use crate::api::form::parse_screening_form;
use crate::error::{ApiError, ApiResult};
use crate::pipeline;
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Router,
};

/// POST /api/spectrogram
///
/// Decode the uploaded recording and return its mel spectrogram as PNG.
pub async fn spectrogram(
    State(_state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = parse_screening_form(multipart).await?;
    let Some(audio) = form.audio else {
        return Err(ApiError::BadRequest("An audio file is required".to_string()));
    };

    // CPU-bound decode and render off the async runtime.
    let png = tokio::task::spawn_blocking(move || {
        let png = pipeline::render_spectrogram(audio.path());
        drop(audio);
        png
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?
    .map_err(|e| ApiError::BadRequest(format!("Spectrogram failed: {:#}", e)))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// Build spectrogram routes
pub fn spectrogram_routes() -> Router<AppState> {
    Router::new().route("/api/spectrogram", post(spectrogram))
}
