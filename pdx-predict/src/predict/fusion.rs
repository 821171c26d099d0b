//! Decision fusion
//!
//! Combines whatever modality results survived into a single verdict. When
//! the combined-feature classifier is available and combination was
//! requested, its score alone sets the decision; otherwise fusion falls
//! back to label OR and probability max over the available per-modality
//! results. A probability a modality never produced is excluded, not
//! treated as 0.

use crate::models::OnnxClassifier;
use pdx_common::{FusedDecision, ModalityResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Positive verdict threshold on the fused confidence.
pub const THRESHOLD: f64 = 0.50;
/// Lower edge of the borderline band.
pub const BORDERLINE_LOWER: f64 = 0.45;

/// Result of the fusion stage.
#[derive(Debug)]
pub struct FusionOutcome {
    /// `None` when no modality produced a usable result.
    pub decision: Option<FusedDecision>,
    /// Combined-feature classifier output, when that path ran.
    pub fused: Option<ModalityResult>,
    /// Why the combined-feature path was skipped or failed, if it was.
    pub error: Option<String>,
}

/// Fuse the available modality results into one decision.
///
/// `combined` carries the concatenated feature vector for the fusion
/// classifier; passing `Some` means combination was requested.
pub fn fuse(
    audio: Option<&ModalityResult>,
    image: Option<&ModalityResult>,
    fusion_model: Option<Arc<OnnxClassifier>>,
    combined: Option<&[f32]>,
) -> FusionOutcome {
    let mut fused: Option<ModalityResult> = None;
    let mut error: Option<String> = None;
    let mut fusion_used = false;

    if let Some(features) = combined {
        match fusion_model {
            Some(model) => match model.score_vector(features) {
                Ok(output) => fused = Some(ModalityResult::from(output)),
                Err(e) => {
                    warn!("Fusion scoring failed: {:#}", e);
                    error = Some(format!("Fusion scoring failed: {:#}", e));
                }
            },
            None => {
                error = Some("fusion model not found".to_string());
            }
        }
    }

    let decision = decide(audio, image, fused.as_ref());
    if let Some(d) = decision.as_ref() {
        debug!(
            final_label = d.final_label,
            final_confidence = ?d.final_confidence,
            fusion_used = d.fusion_used,
            "Fused decision"
        );
    }
    FusionOutcome {
        decision,
        fused,
        error,
    }
}

/// Resolve the final decision from the available results.
///
/// A fused score is authoritative when present; the per-modality votes
/// only decide when the fused path was skipped or failed.
fn decide(
    audio: Option<&ModalityResult>,
    image: Option<&ModalityResult>,
    fused: Option<&ModalityResult>,
) -> Option<FusedDecision> {
    if let Some(f) = fused {
        return Some(FusedDecision {
            final_label: f.label.min(1),
            final_confidence: f.probability,
            fusion_used: true,
            borderline: false,
        });
    }

    let votes: Vec<&ModalityResult> = [audio, image].into_iter().flatten().collect();
    if votes.is_empty() {
        return None;
    }

    let final_label = votes.iter().map(|r| r.label).max().unwrap_or(0).min(1);
    let final_confidence = votes
        .iter()
        .filter_map(|r| r.probability)
        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))));

    Some(FusedDecision {
        final_label,
        final_confidence,
        fusion_used: false,
        borderline: false,
    })
}

/// Map a fused confidence onto the screening verdict bands.
///
/// At or above [`THRESHOLD`] the verdict is positive. Inside
/// `[BORDERLINE_LOWER, THRESHOLD)` the label stays negative but the result
/// is flagged borderline. Below the band it is a plain negative.
pub fn borderline_policy(confidence: f64) -> (u8, bool) {
    if confidence >= THRESHOLD {
        (1, false)
    } else if confidence >= BORDERLINE_LOWER {
        (0, true)
    } else {
        (0, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: u8, probability: Option<f64>) -> ModalityResult {
        ModalityResult { label, probability }
    }

    #[test]
    fn fallback_takes_label_or_and_probability_max() {
        let audio = result(1, Some(0.9));
        let image = result(0, Some(0.3));
        let out = fuse(Some(&audio), Some(&image), None, None);
        let decision = out.decision.unwrap();
        assert_eq!(decision.final_label, 1);
        assert_eq!(decision.final_confidence, Some(0.9));
        assert!(!decision.fusion_used);
        assert!(out.error.is_none());
    }

    #[test]
    fn positive_label_carries_even_when_its_probability_is_lower() {
        let audio = result(1, Some(0.2));
        let image = result(0, Some(0.9));
        let out = fuse(Some(&audio), Some(&image), None, None);
        let decision = out.decision.unwrap();
        assert_eq!(decision.final_label, 1);
        assert_eq!(decision.final_confidence, Some(0.9));
    }

    #[test]
    fn positive_label_wins_even_without_probability() {
        let audio = result(1, None);
        let image = result(0, Some(0.2));
        let out = fuse(Some(&audio), Some(&image), None, None);
        let decision = out.decision.unwrap();
        assert_eq!(decision.final_label, 1);
        // Absent probability is excluded, not coerced to zero.
        assert_eq!(decision.final_confidence, Some(0.2));
    }

    #[test]
    fn single_modality_passes_through() {
        let audio = result(1, Some(0.8));
        let out = fuse(Some(&audio), None, None, None);
        let decision = out.decision.unwrap();
        assert_eq!(decision.final_label, audio.label);
        assert_eq!(decision.final_confidence, audio.probability);
        assert!(!decision.fusion_used);
        assert!(out.fused.is_none());
    }

    #[test]
    fn no_probabilities_means_no_confidence() {
        let audio = result(0, None);
        let out = fuse(Some(&audio), None, None, None);
        let decision = out.decision.unwrap();
        assert_eq!(decision.final_label, 0);
        assert_eq!(decision.final_confidence, None);
    }

    #[test]
    fn no_modalities_yields_no_decision() {
        let out = fuse(None, None, None, None);
        assert!(out.decision.is_none());
    }

    #[test]
    fn fused_result_decides_alone_over_modality_votes() {
        // A combined-feature score overrides the per-modality votes even
        // when a modality disagrees with higher confidence.
        let audio = result(1, Some(0.8));
        let image = result(0, Some(0.1));
        let fused = result(0, Some(0.3));
        let decision = decide(Some(&audio), Some(&image), Some(&fused)).unwrap();
        assert_eq!(decision.final_label, 0);
        assert_eq!(decision.final_confidence, Some(0.3));
        assert!(decision.fusion_used);
    }

    #[test]
    fn requested_combination_without_model_records_error_and_falls_back() {
        let audio = result(0, Some(0.4));
        let combined = vec![0.0f32; 50];
        let out = fuse(Some(&audio), None, None, Some(&combined));
        let decision = out.decision.unwrap();
        assert!(!decision.fusion_used);
        assert_eq!(decision.final_label, 0);
        assert!(out.error.unwrap().contains("model not found"));
    }

    #[test]
    fn borderline_band_edges() {
        assert_eq!(borderline_policy(0.50), (1, false));
        assert_eq!(borderline_policy(0.80), (1, false));
        assert_eq!(borderline_policy(0.47), (0, true));
        assert_eq!(borderline_policy(0.45), (0, true));
        assert_eq!(borderline_policy(0.40), (0, false));
    }
}
