//! Audio decoding and resampling for the biomarker pipeline

pub mod decoder;
pub mod resampler;

pub use decoder::{decode_audio_file, DecodedAudio};
pub use resampler::{resample, ANALYSIS_SAMPLE_RATE};

use anyhow::Result;
use std::path::Path;

/// Decode an audio file and normalize it to the analysis sample rate.
///
/// All biomarker extraction runs at [`ANALYSIS_SAMPLE_RATE`]; classifier
/// artifacts were fitted against features measured at that rate.
pub fn decode_for_analysis(path: &Path) -> Result<DecodedAudio> {
    let decoded = decode_audio_file(path)?;
    if decoded.sample_rate == ANALYSIS_SAMPLE_RATE {
        return Ok(decoded);
    }
    let samples = resample(&decoded.samples, decoded.sample_rate, ANALYSIS_SAMPLE_RATE)?;
    Ok(DecodedAudio {
        duration_seconds: samples.len() as f64 / ANALYSIS_SAMPLE_RATE as f64,
        samples,
        sample_rate: ANALYSIS_SAMPLE_RATE,
        channels: decoded.channels,
    })
}
