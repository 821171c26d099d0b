//! Per-modality predictors and decision fusion.

pub mod audio;
pub mod fusion;
pub mod image;

pub use audio::predict_audio;
pub use fusion::{borderline_policy, fuse, FusionOutcome};
pub use image::predict_image;

use thiserror::Error;

/// Failures a single modality predictor can report.
///
/// A missing model is distinguished from a scoring failure so callers can
/// surface an actionable message instead of a generic error.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0} model not found")]
    ModelNotFound(&'static str),
    #[error("Scoring failed: {0}")]
    Scoring(String),
}
