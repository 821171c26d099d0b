//! ONNX scoring artifacts
//!
//! Wraps an `ort` session behind a small scoring interface that returns the
//! capability-tagged [`ScoreOutput`]. Whether an artifact exposes a
//! probability is resolved here, from the shape and range of its output
//! tensor, never probed by callers:
//!
//! - two or more values per row: class probabilities; label is the argmax
//!   and the reported probability is the positive class (index 1),
//! - a single value inside [0, 1]: sigmoid probability of the positive
//!   class,
//! - a single value outside [0, 1]: a raw decision score, label only.

use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Tensor;
use pdx_common::ScoreOutput;
use std::path::Path;
use std::sync::Mutex;

/// A pretrained ONNX classifier loaded from the models directory.
///
/// `ort` sessions need `&mut` to run, so the session sits behind a mutex;
/// the registry shares one instance across all requests.
pub struct OnnxClassifier {
    name: String,
    input_name: String,
    session: Mutex<Session>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load a session from an `.onnx` file.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let builder = Session::builder()
            .map_err(|e| anyhow!("Failed to create session builder: {}", e))?;
        let mut builder = builder
            .with_intra_threads(1)
            .map_err(|e| anyhow!("Failed to configure session: {}", e))?;
        let session = builder
            .commit_from_file(path)
            .map_err(|e| anyhow!("Failed to load {}: {}", path.display(), e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .context("Model declares no inputs")?;

        Ok(Self {
            name: name.to_string(),
            input_name,
            session: Mutex::new(session),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score a flat feature vector (shape `[1, n]`).
    pub fn score_vector(&self, features: &[f32]) -> Result<ScoreOutput> {
        let input = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| anyhow!("{}: input shape error: {}", self.name, e))?;
        let tensor =
            Tensor::from_array(input).map_err(|e| anyhow!("{}: tensor error: {}", self.name, e))?;
        self.run(tensor)
    }

    /// Score a preprocessed image tensor (shape `[1, h, w, c]`).
    pub fn score_image(&self, tensor: &Array4<f32>) -> Result<ScoreOutput> {
        let tensor = Tensor::from_array(tensor.clone())
            .map_err(|e| anyhow!("{}: tensor error: {}", self.name, e))?;
        self.run(tensor)
    }

    fn run<T>(&self, tensor: Tensor<T>) -> Result<ScoreOutput>
    where
        T: ort::value::PrimitiveTensorElementType + std::fmt::Debug + Clone + 'static,
    {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("{}: session lock poisoned", self.name))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| anyhow!("{}: inference error: {}", self.name, e))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| anyhow!("{}: model produced no output", self.name))?;
        let (_shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("{}: output extraction error: {}", self.name, e))?;

        decode_scores(data).ok_or_else(|| anyhow!("{}: model produced an empty output", self.name))
    }
}

/// Resolve the capability-tagged output from one row of raw scores.
pub fn decode_scores(data: &[f32]) -> Option<ScoreOutput> {
    match data {
        [] => None,
        [v] if (0.0..=1.0).contains(v) => Some(ScoreOutput::LabelWithProbability {
            label: (*v >= 0.5) as u8,
            probability: *v as f64,
        }),
        [v] => Some(ScoreOutput::LabelOnly {
            label: (*v >= 0.5) as u8,
        }),
        scores => {
            let label = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0);
            // Binary classifiers report the positive class; wider heads
            // report the winning class.
            let probability = if scores.len() == 2 {
                scores[1]
            } else {
                scores[label]
            };
            Some(ScoreOutput::LabelWithProbability {
                label: label.min(1) as u8,
                probability: probability as f64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scores_decode_to_none() {
        assert!(decode_scores(&[]).is_none());
    }

    #[test]
    fn sigmoid_output_carries_probability() {
        let out = decode_scores(&[0.8]).unwrap();
        assert_eq!(out.label(), 1);
        assert!((out.probability().unwrap() - 0.8).abs() < 1.0e-9);

        let out = decode_scores(&[0.2]).unwrap();
        assert_eq!(out.label(), 0);
    }

    #[test]
    fn raw_score_output_is_label_only() {
        let out = decode_scores(&[3.7]).unwrap();
        assert_eq!(out, ScoreOutput::LabelOnly { label: 1 });
        let out = decode_scores(&[-1.2]).unwrap();
        assert_eq!(out, ScoreOutput::LabelOnly { label: 0 });
    }

    #[test]
    fn two_class_output_reports_positive_class_probability() {
        let out = decode_scores(&[0.3, 0.7]).unwrap();
        assert_eq!(out.label(), 1);
        assert!((out.probability().unwrap() - 0.7).abs() < 1.0e-9);

        // Negative prediction still reports the positive-class probability.
        let out = decode_scores(&[0.9, 0.1]).unwrap();
        assert_eq!(out.label(), 0);
        assert!((out.probability().unwrap() - 0.1).abs() < 1.0e-9);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let result = OnnxClassifier::load("audio", Path::new("/nonexistent/model.onnx"));
        assert!(result.is_err());
    }
}
