//! Mono resampling using rubato
//!
//! Normalizes vocal recordings to the fixed analysis rate before biomarker
//! extraction.

use anyhow::{anyhow, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Sample rate all acoustic analysis runs at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Resample a mono buffer from `input_rate` to `output_rate`.
///
/// The whole buffer is processed as a single chunk; recordings are short
/// (seconds of sustained phonation), so no streaming is needed.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        input_rate = input_rate,
        output_rate = output_rate,
        frames = input.len(),
        "Resampling audio"
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0, // fixed ratio, no runtime changes
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| anyhow!("Failed to create resampler: {}", e))?;

    let mut output = resampler
        .process(&[input.to_vec()], None)
        .map_err(|e| anyhow!("Resampling failed: {}", e))?;

    Ok(output.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_is_identity_at_same_rate() {
        let input = vec![0.1f32, 0.2, 0.3];
        let output = resample(&input, 22_050, 22_050).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn resample_scales_length_by_ratio() {
        // One second of a 440 Hz tone at 44.1kHz down to 22.05kHz.
        let input: Vec<f32> = (0..44_100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let output = resample(&input, 44_100, ANALYSIS_SAMPLE_RATE).unwrap();
        let expected = input.len() / 2;
        let tolerance = expected / 50;
        assert!(
            output.len().abs_diff(expected) <= tolerance,
            "expected ~{} frames, got {}",
            expected,
            output.len()
        );
    }

    #[test]
    fn resample_empty_input_is_empty() {
        assert!(resample(&[], 48_000, 22_050).unwrap().is_empty());
    }
}
