//! HTTP API handlers for pdx-predict
//!
//! Entry points stay thin: they parse the multipart form, hand the staged
//! request to the shared pipeline on a blocking worker, and translate the
//! outcome into a response.

pub mod form;
pub mod health;
pub mod predict;
pub mod report;
pub mod spectrogram;

pub use health::health_routes;
pub use predict::predict_routes;
pub use report::report_routes;
pub use spectrogram::spectrogram_routes;

use crate::api::form::ScreeningForm;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{self, PipelineRequest, PredictResponse, RequestFlags};
use crate::AppState;

/// Run the pipeline for a parsed form on a blocking worker.
///
/// `with_report` selects the report entry point behavior: PDF generation
/// plus the borderline verdict band.
pub(crate) async fn run_screening(
    state: AppState,
    form: ScreeningForm,
    with_report: bool,
) -> ApiResult<PredictResponse> {
    let flags = RequestFlags {
        use_audio: form.audio_requested(),
        use_image: form.image_requested(),
        combine_features: form.combine_features.unwrap_or(false),
        return_spectrogram: form.return_spectrogram.unwrap_or(false),
        return_heatmap: form.return_heatmap.unwrap_or(false),
        generate_report: with_report || form.generate_report.unwrap_or(false),
        apply_borderline: with_report,
    };

    let config = state.config.clone();
    let registry = state.registry.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let request = PipelineRequest {
            flags,
            user: form.user.clone(),
            audio_path: form.audio.as_ref().map(|f| f.path().to_path_buf()),
            image_path: form.image.as_ref().map(|f| f.path().to_path_buf()),
        };
        let result = pipeline::run(&config, &registry, &request);
        // Staged uploads are removed here, on every exit path.
        drop(form);
        result
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?;

    match outcome {
        Ok(response) => Ok(response),
        Err(e) => {
            let mut last_error = state.last_error.write().await;
            *last_error = Some(e.to_string());
            Err(e.into())
        }
    }
}
