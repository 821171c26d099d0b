//! Pretrained model artifacts: loading, caching, and scoring.

pub mod artifact;
pub mod registry;
pub mod scaler;

pub use artifact::OnnxClassifier;
pub use registry::{ArtifactId, ModelRegistry};
pub use scaler::AffineScaler;
