//! Prediction data model shared between extraction, scoring, fusion and
//! report rendering.

use serde::{Deserialize, Serialize};

/// Fixed length of the audio biomarker vector.
///
/// Every audio classifier artifact is trained against vectors of exactly
/// this length; extraction pads or truncates to guarantee it.
pub const AUDIO_FEATURE_LEN: usize = 40;

/// Fixed-length, finite-valued biomarker vector for one prediction request.
///
/// Construction sanitizes the input: non-finite elements become 0.0 and the
/// vector is padded with zeros or truncated to [`AUDIO_FEATURE_LEN`].
/// Absent biomarkers are therefore 0.0, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Build a sanitized fixed-length vector from raw measures.
    pub fn from_values(values: Vec<f32>) -> Self {
        let mut v: Vec<f32> = values
            .into_iter()
            .map(|x| if x.is_finite() { x } else { 0.0 })
            .collect();
        v.resize(AUDIO_FEATURE_LEN, 0.0);
        Self(v)
    }

    /// The all-zero fallback vector used when extraction fails entirely.
    pub fn zeroed() -> Self {
        Self(vec![0.0; AUDIO_FEATURE_LEN])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the contents with a transformed copy of the same length.
    ///
    /// Used by the scaler; a length mismatch is rejected so a bad artifact
    /// can never change the vector's shape.
    pub fn replace(&mut self, values: Vec<f32>) -> bool {
        if values.len() != self.0.len() {
            return false;
        }
        self.0 = values
            .into_iter()
            .map(|x| if x.is_finite() { x } else { 0.0 })
            .collect();
        true
    }
}

/// Capability-tagged output of one scoring call.
///
/// Whether a probability exists is decided when the artifact output is
/// decoded, not probed at use sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutput {
    /// The artifact only exposes a class decision.
    LabelOnly { label: u8 },
    /// The artifact exposes a calibrated positive-class probability.
    LabelWithProbability { label: u8, probability: f64 },
}

impl ScoreOutput {
    pub fn label(&self) -> u8 {
        match self {
            Self::LabelOnly { label } => *label,
            Self::LabelWithProbability { label, .. } => *label,
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            Self::LabelOnly { .. } => None,
            Self::LabelWithProbability { probability, .. } => Some(*probability),
        }
    }
}

/// Result of scoring one modality (audio or image).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalityResult {
    /// Binary class: 1 = positive finding, 0 = negative.
    pub label: u8,
    /// Positive-class probability when the artifact exposes one.
    pub probability: Option<f64>,
}

impl From<ScoreOutput> for ModalityResult {
    fn from(score: ScoreOutput) -> Self {
        Self {
            label: score.label(),
            probability: score.probability(),
        }
    }
}

/// Final combined decision for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusedDecision {
    pub final_label: u8,
    /// Absent when no contributing modality exposed a probability.
    pub final_confidence: Option<f64>,
    /// True only when a dedicated fusion artifact scored the request.
    pub fusion_used: bool,
    /// Set by the borderline policy at the report entry point.
    pub borderline: bool,
}

/// Patient identity passed through opaquely into the report.
///
/// The pipeline never validates or stores these fields; missing values are
/// rendered as "N/A".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub test_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_pads_to_fixed_length() {
        let fv = FeatureVector::from_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(fv.len(), AUDIO_FEATURE_LEN);
        assert_eq!(fv.as_slice()[0], 1.0);
        assert_eq!(fv.as_slice()[3], 0.0);
    }

    #[test]
    fn feature_vector_truncates_long_input() {
        let fv = FeatureVector::from_values(vec![1.0; 100]);
        assert_eq!(fv.len(), AUDIO_FEATURE_LEN);
    }

    #[test]
    fn feature_vector_sanitizes_non_finite() {
        let fv = FeatureVector::from_values(vec![f32::NAN, f32::INFINITY, -1.5]);
        assert_eq!(fv.as_slice()[0], 0.0);
        assert_eq!(fv.as_slice()[1], 0.0);
        assert_eq!(fv.as_slice()[2], -1.5);
        assert!(fv.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn replace_rejects_length_mismatch() {
        let mut fv = FeatureVector::zeroed();
        assert!(!fv.replace(vec![1.0; 10]));
        assert_eq!(fv, FeatureVector::zeroed());
        assert!(fv.replace(vec![1.0; AUDIO_FEATURE_LEN]));
        assert_eq!(fv.as_slice()[0], 1.0);
    }

    #[test]
    fn score_output_capability_resolution() {
        let tagged = ScoreOutput::LabelWithProbability {
            label: 1,
            probability: 0.8,
        };
        assert_eq!(tagged.label(), 1);
        assert_eq!(tagged.probability(), Some(0.8));

        let plain = ScoreOutput::LabelOnly { label: 0 };
        assert_eq!(plain.probability(), None);

        let result: ModalityResult = plain.into();
        assert_eq!(result.label, 0);
        assert!(result.probability.is_none());
    }
}
