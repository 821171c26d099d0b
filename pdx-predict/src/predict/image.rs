//! Scan-modality predictor

use crate::extract::ImageFeatures;
use crate::models::ModelRegistry;
use crate::predict::PredictError;
use pdx_common::ModalityResult;
use tracing::debug;

/// Score a preprocessed scan tensor with the image classifier.
pub fn predict_image(
    registry: &ModelRegistry,
    features: &ImageFeatures,
) -> Result<ModalityResult, PredictError> {
    let model = registry
        .image_classifier()
        .ok_or(PredictError::ModelNotFound("image"))?;

    let output = model
        .score_image(&features.tensor)
        .map_err(|e| PredictError::Scoring(format!("{:#}", e)))?;

    debug!(label = output.label(), "Image prediction");
    Ok(ModalityResult::from(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_image_features;

    #[test]
    fn absent_artifact_reports_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().to_path_buf());
        let img = image::DynamicImage::ImageLuma8(image::GrayImage::new(32, 32));
        let features = extract_image_features(&img);

        let err = predict_image(&registry, &features).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
