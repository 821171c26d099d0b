//! Mel spectrogram computation and PNG rendering
//!
//! 128 mel bands up to 8 kHz, STFT via realfft, power mapped to dB relative
//! to the spectrogram maximum with an 80 dB floor. The rendered PNG is used
//! both as a standalone response and as the report's audio figure.

use anyhow::{anyhow, Result};
use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use std::io::Cursor;

/// Mel band count.
const N_MELS: usize = 128;
/// Upper mel filter edge in Hz.
const F_MAX: f32 = 8000.0;
/// STFT frame length.
const FRAME_SIZE: usize = 2048;
/// STFT hop.
const HOP_SIZE: usize = 512;
/// Dynamic range below the peak, in dB.
const TOP_DB: f32 = 80.0;

/// Mel spectrogram in dB, frames × bands.
#[derive(Debug)]
pub struct MelSpectrogram {
    /// `frames[t][band]`, values in [-TOP_DB, 0].
    pub frames: Vec<Vec<f32>>,
    pub n_bands: usize,
}

/// Compute the mel spectrogram of a mono recording.
pub fn mel_spectrogram(samples: &[f32], sample_rate: u32) -> Result<MelSpectrogram> {
    if samples.len() < FRAME_SIZE {
        return Err(anyhow!(
            "Recording too short for a spectrogram ({} samples)",
            samples.len()
        ));
    }

    let filterbank = mel_filterbank(N_MELS, FRAME_SIZE, sample_rate as f32, F_MAX);
    let window = hann_window(FRAME_SIZE);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let mut input = vec![0.0f32; FRAME_SIZE];
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); FRAME_SIZE / 2 + 1];

    let n_frames = (samples.len() - FRAME_SIZE) / HOP_SIZE + 1;
    let mut power_frames: Vec<Vec<f32>> = Vec::with_capacity(n_frames);

    for frame_idx in 0..n_frames {
        let start = frame_idx * HOP_SIZE;
        for i in 0..FRAME_SIZE {
            input[i] = samples[start + i] * window[i];
        }
        fft.process(&mut input, &mut spectrum)
            .map_err(|e| anyhow!("FFT failed: {}", e))?;

        let mut bands = vec![0.0f32; N_MELS];
        for (band, filter) in filterbank.iter().enumerate() {
            let mut energy = 0.0f32;
            for &(bin, coeff) in filter {
                energy += coeff * spectrum[bin].norm_sqr();
            }
            bands[band] = energy;
        }
        power_frames.push(bands);
    }

    // Power to dB relative to the peak, floored TOP_DB below it.
    let peak = power_frames
        .iter()
        .flatten()
        .fold(f32::MIN_POSITIVE, |a, &b| a.max(b));
    for frame in &mut power_frames {
        for v in frame.iter_mut() {
            let db = 10.0 * (v.max(1.0e-10) / peak).log10();
            *v = db.max(-TOP_DB);
        }
    }

    Ok(MelSpectrogram {
        frames: power_frames,
        n_bands: N_MELS,
    })
}

/// Render the mel spectrogram to PNG bytes (low frequencies at the bottom).
pub fn render_png(mel: &MelSpectrogram) -> Result<Vec<u8>> {
    let width = mel.frames.len() as u32;
    let height = mel.n_bands as u32;
    if width == 0 || height == 0 {
        return Err(anyhow!("Empty spectrogram"));
    }

    let mut img = image::RgbImage::new(width, height);
    for (x, frame) in mel.frames.iter().enumerate() {
        for (band, &db) in frame.iter().enumerate() {
            let t = (db + TOP_DB) / TOP_DB; // 0 at the floor, 1 at the peak
            let y = height - 1 - band as u32;
            img.put_pixel(x as u32, y, image::Rgb(colormap(t)));
        }
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| anyhow!("PNG encoding failed: {}", e))?;
    Ok(bytes)
}

/// Compute and render in one step; the shape both callers want.
pub fn spectrogram_png(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    render_png(&mel_spectrogram(samples, sample_rate)?)
}

/// Sparse triangular mel filterbank: per band, the contributing FFT bins
/// with their weights.
fn mel_filterbank(
    n_mels: usize,
    frame_size: usize,
    sample_rate: f32,
    f_max: f32,
) -> Vec<Vec<(usize, f32)>> {
    fn hz_to_mel(hz: f32) -> f32 {
        2595.0 * (1.0 + hz / 700.0).log10()
    }
    fn mel_to_hz(mel: f32) -> f32 {
        700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
    }

    let f_max = f_max.min(sample_rate / 2.0);
    let mel_max = hz_to_mel(f_max);
    let n_bins = frame_size / 2 + 1;
    let bin_hz = sample_rate / frame_size as f32;

    // n_mels + 2 edge points, evenly spaced on the mel scale.
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut bank = Vec::with_capacity(n_mels);
    for band in 0..n_mels {
        let (lo, center, hi) = (edges[band], edges[band + 1], edges[band + 2]);
        let mut filter = Vec::new();
        for bin in 0..n_bins {
            let freq = bin as f32 * bin_hz;
            let weight = if freq > lo && freq < center {
                (freq - lo) / (center - lo)
            } else if freq >= center && freq < hi {
                (hi - freq) / (hi - center)
            } else {
                continue;
            };
            if weight > 0.0 {
                filter.push((bin, weight));
            }
        }
        bank.push(filter);
    }
    bank
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Magma-like colormap over t in [0, 1].
fn colormap(t: f32) -> [u8; 3] {
    const ANCHORS: [(f32, [f32; 3]); 5] = [
        (0.00, [0.0, 0.0, 0.016]),
        (0.25, [0.28, 0.06, 0.47]),
        (0.50, [0.72, 0.21, 0.47]),
        (0.75, [0.99, 0.53, 0.38]),
        (1.00, [0.99, 0.99, 0.75]),
    ];
    let t = t.clamp(0.0, 1.0);
    let mut rgb = ANCHORS[ANCHORS.len() - 1].1;
    for pair in ANCHORS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            rgb = [
                c0[0] + f * (c1[0] - c0[0]),
                c0[1] + f * (c1[1] - c0[1]),
                c0[2] + f * (c1[2] - c0[2]),
            ];
            break;
        }
    }
    [
        (rgb[0] * 255.0) as u8,
        (rgb[1] * 255.0) as u8,
        (rgb[2] * 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn spectrogram_has_expected_shape() {
        let samples = tone(440.0, 22_050, 1.0);
        let mel = mel_spectrogram(&samples, 22_050).unwrap();
        assert_eq!(mel.n_bands, 128);
        assert!(!mel.frames.is_empty());
        assert!(mel
            .frames
            .iter()
            .flatten()
            .all(|&db| (-80.0..=0.0).contains(&db)));
    }

    #[test]
    fn too_short_input_is_an_error() {
        assert!(mel_spectrogram(&[0.0; 100], 22_050).is_err());
    }

    #[test]
    fn png_bytes_carry_the_png_signature() {
        let samples = tone(440.0, 22_050, 1.0);
        let png = spectrogram_png(&samples, 22_050).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
