//! Fundamental-frequency tracking
//!
//! Frame-based normalized autocorrelation over a 75-600 Hz search range.
//! Autocorrelation is computed via FFT (realfft) per frame; frames whose
//! best peak falls below the voicing threshold, or whose energy is below
//! the silence floor, are marked unvoiced. Pitch statistics only ever look
//! at voiced frames.

use realfft::num_complex::Complex;
use realfft::RealFftPlanner;

/// Lowest fundamental considered voiced.
pub const PITCH_FLOOR_HZ: f32 = 75.0;
/// Highest fundamental considered voiced.
pub const PITCH_CEILING_HZ: f32 = 600.0;

/// Analysis hop between frames.
const HOP_SECONDS: f32 = 0.010;
/// Minimum normalized autocorrelation peak for a frame to count as voiced.
const VOICING_THRESHOLD: f32 = 0.45;
/// Frames quieter than this RMS are treated as silence.
const SILENCE_RMS: f32 = 1.0e-4;

/// One analysis frame of the pitch track.
#[derive(Debug, Clone)]
pub struct PitchFrame {
    /// Sample index of the frame start.
    pub start: usize,
    /// Fundamental frequency, present only for voiced frames.
    pub f0: Option<f32>,
    /// Normalized autocorrelation peak height (harmonicity proxy).
    pub clarity: f32,
    /// Frame RMS energy.
    pub rms: f32,
}

impl PitchFrame {
    pub fn is_voiced(&self) -> bool {
        self.f0.is_some()
    }
}

/// Pitch track over a whole recording.
#[derive(Debug)]
pub struct PitchTrack {
    pub frames: Vec<PitchFrame>,
    pub sample_rate: u32,
    /// Hop between frame starts, in samples.
    pub hop: usize,
    /// Frame window length, in samples.
    pub window: usize,
}

impl PitchTrack {
    /// Fo statistics (mean, max, min) over voiced frames; `None` when the
    /// recording has no voiced frame at all.
    pub fn fo_stats(&self) -> Option<(f32, f32, f32)> {
        let mut count = 0usize;
        let mut sum = 0.0f32;
        let mut max = f32::MIN;
        let mut min = f32::MAX;
        for f0 in self.frames.iter().filter_map(|f| f.f0) {
            count += 1;
            sum += f0;
            max = max.max(f0);
            min = min.min(f0);
        }
        if count == 0 {
            return None;
        }
        Some((sum / count as f32, max, min))
    }

    /// Mean harmonics-to-noise ratio (dB) over voiced frames.
    ///
    /// Uses the autocorrelation peak r of each voiced frame:
    /// HNR = 10*log10(r / (1 - r)).
    pub fn mean_hnr_db(&self) -> Option<f32> {
        let values: Vec<f32> = self
            .frames
            .iter()
            .filter(|f| f.is_voiced())
            .map(|f| {
                let r = f.clarity.clamp(1.0e-6, 1.0 - 1.0e-6);
                10.0 * (r / (1.0 - r)).log10()
            })
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// Track pitch over the recording.
///
/// Total over any input: too-short or silent audio produces an empty or
/// fully unvoiced track, never an error.
pub fn track_pitch(samples: &[f32], sample_rate: u32) -> PitchTrack {
    // Three floor periods per window, as pitch trackers conventionally use.
    let window = (3.0 * sample_rate as f32 / PITCH_FLOOR_HZ) as usize;
    let hop = ((HOP_SECONDS * sample_rate as f32) as usize).max(1);

    let mut track = PitchTrack {
        frames: Vec::new(),
        sample_rate,
        hop,
        window,
    };
    if samples.len() < window || sample_rate == 0 {
        return track;
    }

    let min_lag = ((sample_rate as f32 / PITCH_CEILING_HZ) as usize).max(2);
    let max_lag = ((sample_rate as f32 / PITCH_FLOOR_HZ) as usize).min(window - 2);
    if min_lag >= max_lag {
        return track;
    }

    // FFT-based autocorrelation: r = ifft(|fft(x)|^2). Zero padding to at
    // least twice the window avoids circular wrap inside the lag range.
    let fft_len = (2 * window).next_power_of_two();
    let mut planner = RealFftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut input = vec![0.0f32; fft_len];
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); fft_len / 2 + 1];
    let mut autocorr = vec![0.0f32; fft_len];

    let mut start = 0usize;
    while start + window <= samples.len() {
        let frame = &samples[start..start + window];
        let mean = frame.iter().sum::<f32>() / window as f32;
        let rms = (frame.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>()
            / window as f32)
            .sqrt();

        let analyzed = if rms < SILENCE_RMS {
            None
        } else {
            for (dst, &src) in input.iter_mut().zip(frame.iter()) {
                *dst = src - mean;
            }
            input[window..].fill(0.0);

            analyze_frame(
                &*forward,
                &*inverse,
                &mut input,
                &mut spectrum,
                &mut autocorr,
                window,
                min_lag,
                max_lag,
            )
        };

        let (f0, clarity) = match analyzed {
            Some((lag, clarity)) if clarity > VOICING_THRESHOLD => {
                let f0 = sample_rate as f32 / lag;
                if (PITCH_FLOOR_HZ..=PITCH_CEILING_HZ).contains(&f0) {
                    (Some(f0), clarity)
                } else {
                    (None, clarity)
                }
            }
            Some((_, clarity)) => (None, clarity),
            None => (None, 0.0),
        };

        track.frames.push(PitchFrame {
            start,
            f0,
            clarity,
            rms,
        });
        start += hop;
    }

    track
}

/// Autocorrelate one prepared frame and pick the best peak in the lag range.
///
/// Returns the interpolated lag (fractional samples) and the normalized
/// peak height, or `None` when the frame carries no energy.
fn analyze_frame(
    forward: &dyn realfft::RealToComplex<f32>,
    inverse: &dyn realfft::ComplexToReal<f32>,
    input: &mut [f32],
    spectrum: &mut [Complex<f32>],
    autocorr: &mut [f32],
    window: usize,
    min_lag: usize,
    max_lag: usize,
) -> Option<(f32, f32)> {
    forward.process(input, spectrum).ok()?;
    for bin in spectrum.iter_mut() {
        *bin = Complex::new(bin.norm_sqr(), 0.0);
    }
    inverse.process(spectrum, autocorr).ok()?;

    let r0 = autocorr[0];
    if r0 <= 0.0 {
        return None;
    }

    // Zero padding leaves only window - lag overlapping terms at each lag,
    // biasing r[lag] low by (window - lag) / window. Undo the bias so a
    // perfectly periodic frame normalizes to ~1 instead of tapering with lag.
    for lag in 1..=(max_lag + 1).min(window - 1) {
        autocorr[lag] *= window as f32 / (window - lag) as f32;
    }

    let mut best_lag = min_lag;
    let mut best_val = autocorr[min_lag];
    for lag in (min_lag + 1)..=max_lag {
        if autocorr[lag] > best_val {
            best_val = autocorr[lag];
            best_lag = lag;
        }
    }

    // Parabolic interpolation around the winning lag for sub-sample accuracy.
    let refined = if best_lag > min_lag && best_lag < max_lag {
        let left = autocorr[best_lag - 1];
        let right = autocorr[best_lag + 1];
        let denom = left - 2.0 * best_val + right;
        if denom.abs() > f32::EPSILON {
            best_lag as f32 + 0.5 * (left - right) / denom
        } else {
            best_lag as f32
        }
    } else {
        best_lag as f32
    };

    Some((refined, (best_val / r0).clamp(0.0, 1.0)))
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
    fn tracks_a_steady_tone_within_tolerance() {
        let samples = tone(220.0, 22_050, 1.0);
        let track = track_pitch(&samples, 22_050);
        let (mean, max, min) = track.fo_stats().expect("tone must be voiced");
        assert!((mean - 220.0).abs() < 5.0, "mean {}", mean);
        assert!(max < 235.0 && min > 205.0, "max {} min {}", max, min);
    }

    #[test]
    fn silence_is_fully_unvoiced() {
        let samples = vec![0.0f32; 22_050];
        let track = track_pitch(&samples, 22_050);
        assert!(!track.frames.is_empty());
        assert!(track.fo_stats().is_none());
        assert!(track.mean_hnr_db().is_none());
    }

    #[test]
    fn short_input_yields_empty_track() {
        let track = track_pitch(&[0.1, -0.1, 0.1], 22_050);
        assert!(track.frames.is_empty());
        assert!(track.fo_stats().is_none());
    }

    #[test]
    fn hnr_is_high_for_a_pure_tone() {
        let samples = tone(150.0, 22_050, 1.0);
        let track = track_pitch(&samples, 22_050);
        let hnr = track.mean_hnr_db().expect("voiced");
        assert!(hnr > 10.0, "pure tone should be strongly harmonic: {}", hnr);
    }

    #[test]
    fn clarity_is_not_tapered_by_lag() {
        // A low fundamental means a long lag; without the overlap
        // correction its clarity would cap near (window - lag) / window.
        let samples = tone(150.0, 22_050, 1.0);
        let track = track_pitch(&samples, 22_050);
        let voiced: Vec<f32> = track
            .frames
            .iter()
            .filter(|f| f.is_voiced())
            .map(|f| f.clarity)
            .collect();
        assert!(!voiced.is_empty());
        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!(mean > 0.95, "periodic frames should normalize to ~1: {}", mean);
    }
}
