//! Acoustic biomarker vector assembly
//!
//! Turns a decoded mono recording into the fixed 40-length feature vector
//! the audio classifier was trained on. Every sub-analysis fails locally:
//! a measure that cannot be computed becomes 0.0, and a recording that
//! defeats analysis entirely yields the all-zero vector. This function
//! never errors.

use pdx_common::FeatureVector;
use tracing::{debug, warn};

use super::perturbation::{mark_cycles, measure_perturbation};
use super::pitch::track_pitch;
use crate::models::scaler::AffineScaler;

/// Named biomarkers, in the exact order the classifier was trained with
/// (the classic UCI voice-measure ordering). The six nonlinear measures at
/// the tail have no analyzer wired in and are emitted as 0.0.
pub const AUDIO_BIOMARKER_NAMES: [&str; 22] = [
    "MDVP:Fo(Hz)",
    "MDVP:Fhi(Hz)",
    "MDVP:Flo(Hz)",
    "MDVP:Jitter(%)",
    "MDVP:Jitter(Abs)",
    "MDVP:RAP",
    "MDVP:PPQ",
    "Jitter:DDP",
    "MDVP:Shimmer",
    "MDVP:Shimmer(dB)",
    "Shimmer:APQ3",
    "Shimmer:APQ5",
    "MDVP:APQ",
    "Shimmer:DDA",
    "NHR",
    "HNR",
    "RPDE",
    "DFA",
    "spread1",
    "spread2",
    "D2",
    "PPE",
];

/// Extract the audio biomarker vector from mono samples.
///
/// When a fitted scaler is supplied its affine transform is applied; a
/// scaler whose dimensions do not match passes the raw vector through
/// unchanged rather than failing the extraction.
pub fn extract_audio_features(
    samples: &[f32],
    sample_rate: u32,
    scaler: Option<&AffineScaler>,
) -> FeatureVector {
    if samples.is_empty() || sample_rate == 0 {
        warn!("Empty recording, emitting zero feature vector");
        return FeatureVector::zeroed();
    }

    let track = track_pitch(samples, sample_rate);
    let (fo_mean, fo_max, fo_min) = track.fo_stats().unwrap_or((f32::NAN, f32::NAN, f32::NAN));

    let runs = mark_cycles(samples, sample_rate, &track);
    let m = measure_perturbation(&runs, &track);

    // Order must match AUDIO_BIOMARKER_NAMES. Nonlinear tail measures have
    // no analyzer and stay 0.0.
    let values = vec![
        fo_mean,
        fo_max,
        fo_min,
        m.jitter_local,
        m.jitter_abs,
        m.jitter_rap,
        m.jitter_ppq5,
        m.jitter_ddp,
        m.shimmer_local,
        m.shimmer_db,
        m.shimmer_apq3,
        m.shimmer_apq5,
        m.shimmer_apq11,
        m.shimmer_dda,
        m.nhr,
        m.hnr,
        0.0, // RPDE
        0.0, // DFA
        0.0, // spread1
        0.0, // spread2
        0.0, // D2
        0.0, // PPE
    ];

    let mut features = FeatureVector::from_values(values);

    if let Some(scaler) = scaler {
        match scaler.transform(features.as_slice()) {
            Some(scaled) => {
                if !features.replace(scaled) {
                    warn!("Scaler produced a mismatched vector, keeping raw features");
                }
            }
            None => {
                warn!(
                    scaler_len = scaler.len(),
                    features_len = features.len(),
                    "Scaler dimensions do not match, keeping raw features"
                );
            }
        }
    }

    debug!(
        fo_mean = fo_mean,
        jitter_local = m.jitter_local,
        shimmer_local = m.shimmer_local,
        hnr = m.hnr,
        "Audio feature extraction complete"
    );

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdx_common::AUDIO_FEATURE_LEN;

    fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn vector_is_always_full_length_and_finite() {
        for samples in [tone(200.0, 22_050, 1.0), vec![0.0; 22_050], Vec::new()] {
            let fv = extract_audio_features(&samples, 22_050, None);
            assert_eq!(fv.len(), AUDIO_FEATURE_LEN);
            assert!(fv.as_slice().iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn empty_recording_yields_zero_vector() {
        let fv = extract_audio_features(&[], 22_050, None);
        assert_eq!(fv, FeatureVector::zeroed());
    }

    #[test]
    fn voiced_tone_populates_pitch_fields() {
        let fv = extract_audio_features(&tone(200.0, 22_050, 1.0), 22_050, None);
        let v = fv.as_slice();
        assert!((v[0] - 200.0).abs() < 10.0, "Fo mean {}", v[0]);
        assert!(v[1] >= v[0] && v[2] <= v[0], "Fhi {} Flo {}", v[1], v[2]);
        // HNR populated, NHR small for a clean tone.
        assert!(v[15] > 0.0);
        assert!(v[14] < 1.0);
    }

    #[test]
    fn padding_region_is_zero() {
        let fv = extract_audio_features(&tone(200.0, 22_050, 1.0), 22_050, None);
        assert!(fv.as_slice()[AUDIO_BIOMARKER_NAMES.len()..]
            .iter()
            .all(|&x| x == 0.0));
    }

    #[test]
    fn mismatched_scaler_passes_raw_vector_through() {
        let samples = tone(200.0, 22_050, 1.0);
        let raw = extract_audio_features(&samples, 22_050, None);
        let bad = AffineScaler::new(vec![0.0; 10], vec![1.0; 10]);
        let scaled = extract_audio_features(&samples, 22_050, Some(&bad));
        assert_eq!(raw, scaled);
    }

    #[test]
    fn matching_scaler_is_applied() {
        let samples = tone(200.0, 22_050, 1.0);
        let scaler = AffineScaler::new(vec![1.0; AUDIO_FEATURE_LEN], vec![2.0; AUDIO_FEATURE_LEN]);
        let raw = extract_audio_features(&samples, 22_050, None);
        let scaled = extract_audio_features(&samples, 22_050, Some(&scaler));
        let expected = (raw.as_slice()[0] - 1.0) / 2.0;
        assert!((scaled.as_slice()[0] - expected).abs() < 1.0e-6);
    }
}
