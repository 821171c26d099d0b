//! Feature extraction: acoustic biomarkers, scan tensors, and the visual
//! side outputs (mel spectrogram, heatmap).

pub mod features;
pub mod image;
pub mod perturbation;
pub mod pitch;
pub mod spectrogram;

pub use features::{extract_audio_features, AUDIO_BIOMARKER_NAMES};
pub use image::{extract_image_features, render_heatmap_png, ImageFeatures, IMAGE_PROXY_NAMES};
pub use spectrogram::spectrogram_png;
