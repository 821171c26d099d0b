//! Audio test fixture generator
//!
//! Utilities for generating test voice recordings.

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.5,
            sample_rate: 22_050,
            frequency: 180.0,
        }
    }
}

/// Generate a mono test WAV file with the specified configuration.
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let sample = (2.0 * std::f32::consts::PI * config.frequency * t).sin();
        writer.write_sample((sample * i16::MAX as f32 * 0.5) as i16)?;
    }
    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate a WAV file and return its bytes for upload bodies.
pub fn test_wav_bytes(dir: &Path, config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let path = dir.join("fixture.wav");
    generate_test_wav(&path, config)?;
    Ok(std::fs::read(&path)?)
}
