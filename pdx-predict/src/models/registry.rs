//! Lazy model registry
//!
//! Every pretrained artifact is loaded at most once, on first use, and the
//! loaded instance (or the fact that it is absent) is cached for the life of
//! the process. Absent artifacts are a legal deployment state: the affected
//! modality degrades and the rest of the pipeline keeps working.

use crate::models::artifact::OnnxClassifier;
use crate::models::scaler::AffineScaler;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// The pretrained artifacts the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactId {
    AudioClassifier,
    AudioScaler,
    ImageClassifier,
    FusionClassifier,
}

impl ArtifactId {
    /// File name of the artifact inside the models directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactId::AudioClassifier => "audio_classifier.onnx",
            ArtifactId::AudioScaler => "audio_scaler.json",
            ArtifactId::ImageClassifier => "image_classifier.onnx",
            ArtifactId::FusionClassifier => "fusion_classifier.onnx",
        }
    }
}

/// Process-wide cache of lazily loaded artifacts.
///
/// Each slot is a `OnceLock` holding `Some(artifact)` after a successful
/// load or `None` after a failed one, so a missing file is probed exactly
/// once rather than on every request.
#[derive(Debug)]
pub struct ModelRegistry {
    models_dir: PathBuf,
    audio: OnceLock<Option<Arc<OnnxClassifier>>>,
    scaler: OnceLock<Option<Arc<AffineScaler>>>,
    image: OnceLock<Option<Arc<OnnxClassifier>>>,
    fusion: OnceLock<Option<Arc<OnnxClassifier>>>,
}

impl ModelRegistry {
    pub fn new(models_dir: PathBuf) -> Self {
        Self {
            models_dir,
            audio: OnceLock::new(),
            scaler: OnceLock::new(),
            image: OnceLock::new(),
            fusion: OnceLock::new(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Voice classifier, loaded on first request that needs it.
    pub fn audio_classifier(&self) -> Option<Arc<OnnxClassifier>> {
        self.audio
            .get_or_init(|| self.load_classifier(ArtifactId::AudioClassifier))
            .clone()
    }

    /// Fitted feature scaler for the voice classifier.
    pub fn audio_scaler(&self) -> Option<Arc<AffineScaler>> {
        self.scaler
            .get_or_init(|| {
                let path = self.artifact_path(ArtifactId::AudioScaler);
                if !path.exists() {
                    warn!("Artifact not present, continuing without: {}", path.display());
                    return None;
                }
                match AffineScaler::load(&path) {
                    Ok(scaler) => {
                        info!("Loaded scaler: {}", path.display());
                        Some(Arc::new(scaler))
                    }
                    Err(e) => {
                        warn!("Failed to load {}: {:#}", path.display(), e);
                        None
                    }
                }
            })
            .clone()
    }

    /// Scan classifier.
    pub fn image_classifier(&self) -> Option<Arc<OnnxClassifier>> {
        self.image
            .get_or_init(|| self.load_classifier(ArtifactId::ImageClassifier))
            .clone()
    }

    /// Combined-feature classifier used by the fusion stage.
    pub fn fusion_classifier(&self) -> Option<Arc<OnnxClassifier>> {
        self.fusion
            .get_or_init(|| self.load_classifier(ArtifactId::FusionClassifier))
            .clone()
    }

    fn artifact_path(&self, id: ArtifactId) -> PathBuf {
        self.models_dir.join(id.file_name())
    }

    fn load_classifier(&self, id: ArtifactId) -> Option<Arc<OnnxClassifier>> {
        let path = self.artifact_path(id);
        if !path.exists() {
            warn!("Artifact not present, continuing without: {}", path.display());
            return None;
        }
        match OnnxClassifier::load(id.file_name(), &path) {
            Ok(model) => {
                info!("Loaded model: {}", path.display());
                Some(Arc::new(model))
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_artifacts_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path().to_path_buf());
        assert!(registry.audio_classifier().is_none());
        assert!(registry.audio_scaler().is_none());
        assert!(registry.image_classifier().is_none());
        assert!(registry.fusion_classifier().is_none());
    }

    #[test]
    fn scaler_loads_once_and_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("audio_scaler.json"),
            r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#,
        )
        .unwrap();
        let registry = ModelRegistry::new(dir.path().to_path_buf());
        let a = registry.audio_scaler().unwrap();
        let b = registry.audio_scaler().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_first_use_initializes_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("audio_scaler.json"),
            r#"{"mean": [1.0], "scale": [2.0]}"#,
        )
        .unwrap();
        let registry = Arc::new(ModelRegistry::new(dir.path().to_path_buf()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.audio_scaler().unwrap())
            })
            .collect();
        let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for pair in loaded.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn corrupt_artifact_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audio_scaler.json"), "not json").unwrap();
        let registry = ModelRegistry::new(dir.path().to_path_buf());
        assert!(registry.audio_scaler().is_none());
        // Cached failure, not re-probed.
        assert!(registry.audio_scaler().is_none());
    }

    #[test]
    fn artifact_file_names() {
        assert_eq!(ArtifactId::AudioClassifier.file_name(), "audio_classifier.onnx");
        assert_eq!(ArtifactId::AudioScaler.file_name(), "audio_scaler.json");
        assert_eq!(ArtifactId::ImageClassifier.file_name(), "image_classifier.onnx");
        assert_eq!(ArtifactId::FusionClassifier.file_name(), "fusion_classifier.onnx");
    }
}
