//! Prediction endpoint

use crate::api::form::parse_screening_form;
use crate::api::run_screening;
use crate::error::ApiResult;
use crate::pipeline::PredictResponse;
use crate::AppState;
use axum::{extract::Multipart, extract::State, routing::post, Json, Router};

/// POST /api/predict
///
/// Run the screening pipeline and return the raw decision as JSON. Side
/// outputs and a report can be requested through form flags; the
/// borderline band is never applied here.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let form = parse_screening_form(multipart).await?;
    run_screening(state, form, false).await.map(Json)
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/api/predict", post(predict))
}
