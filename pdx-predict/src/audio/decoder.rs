//! Format-agnostic audio decoding
//!
//! Decodes vocal recordings to mono f32 PCM using symphonia (WAV, MP3,
//! FLAC, OGG, AAC, ...). Multi-channel input is averaged down to mono.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Duration in seconds
    pub duration_seconds: f64,
}

/// Decode an audio file to mono f32 PCM samples.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track
        .codec_params
        .channels
        .context("Channels unknown")?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Error reading packet: {}", e));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .with_context(|| format!("Failed to decode packet in: {}", file_path.display()))?;

        mix_to_mono(&decoded, &mut all_samples);
    }

    let duration_seconds = all_samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        sample_rate = sample_rate,
        channels = channel_count,
        total_samples = all_samples.len(),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

/// Average all channels of a decoded buffer into the mono output.
fn mix_to_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    fn mix_down<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
    where
        S: Sample,
        f32: FromSample<S>,
    {
        let channels = buf.spec().channels.count();
        let frames = buf.frames();
        out.reserve(frames);
        for frame in 0..frames {
            let mut sum = 0.0f32;
            for ch in 0..channels {
                sum += f32::from_sample(buf.chan(ch)[frame]);
            }
            out.push(sum / channels as f32);
        }
    }

    match decoded {
        AudioBufferRef::U8(buf) => mix_down(buf, out),
        AudioBufferRef::U16(buf) => mix_down(buf, out),
        AudioBufferRef::U24(buf) => mix_down(buf, out),
        AudioBufferRef::U32(buf) => mix_down(buf, out),
        AudioBufferRef::S8(buf) => mix_down(buf, out),
        AudioBufferRef::S16(buf) => mix_down(buf, out),
        AudioBufferRef::S24(buf) => mix_down(buf, out),
        AudioBufferRef::S32(buf) => mix_down(buf, out),
        AudioBufferRef::F32(buf) => mix_down(buf, out),
        AudioBufferRef::F64(buf) => mix_down(buf, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_missing_file_reports_open_failure() {
        let result = decode_audio_file(Path::new("/nonexistent/recording.wav"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to open audio file"));
    }
}
