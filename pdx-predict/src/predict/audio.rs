//! Voice-modality predictor

use crate::models::ModelRegistry;
use crate::predict::PredictError;
use pdx_common::{FeatureVector, ModalityResult};
use tracing::debug;

/// Score a prepared biomarker vector with the voice classifier.
pub fn predict_audio(
    registry: &ModelRegistry,
    features: &FeatureVector,
) -> Result<ModalityResult, PredictError> {
    let model = registry
        .audio_classifier()
        .ok_or(PredictError::ModelNotFound("audio"))?;

    let output = model
        .score_vector(features.as_slice())
        .map_err(|e| PredictError::Scoring(format!("{:#}", e)))?;

    debug!(label = output.label(), "Audio prediction");
    Ok(ModalityResult::from(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_artifact_reports_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().to_path_buf());

        let err = predict_audio(&registry, &FeatureVector::zeroed()).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
