//! Cycle-to-cycle perturbation measures
//!
//! Marks glottal cycles by peak-picking the waveform under guidance of the
//! pitch track, then derives the classic jitter (period perturbation) and
//! shimmer (amplitude perturbation) family from consecutive cycle lengths
//! and peak amplitudes. Every measure degrades to NaN when the recording
//! carries too few cycles; the feature assembly maps NaN to 0.0.

use super::pitch::PitchTrack;

/// One uninterrupted run of glottal cycles (no unvoiced gap inside).
#[derive(Debug, Default)]
pub struct CycleRun {
    /// Cycle periods in seconds.
    pub periods: Vec<f32>,
    /// Peak absolute amplitude of each cycle.
    pub amplitudes: Vec<f32>,
}

/// Perturbation measures over a recording.
///
/// All jitter/shimmer values are fractions of the mean (not percentages),
/// except `jitter_abs` (seconds) and `shimmer_db` (decibels).
#[derive(Debug, Clone, Copy)]
pub struct PerturbationMeasures {
    pub jitter_local: f32,
    pub jitter_abs: f32,
    pub jitter_rap: f32,
    pub jitter_ppq5: f32,
    pub jitter_ddp: f32,
    pub shimmer_local: f32,
    pub shimmer_db: f32,
    pub shimmer_apq3: f32,
    pub shimmer_apq5: f32,
    pub shimmer_apq11: f32,
    pub shimmer_dda: f32,
    pub hnr: f32,
    pub nhr: f32,
}

impl PerturbationMeasures {
    fn nan() -> Self {
        Self {
            jitter_local: f32::NAN,
            jitter_abs: f32::NAN,
            jitter_rap: f32::NAN,
            jitter_ppq5: f32::NAN,
            jitter_ddp: f32::NAN,
            shimmer_local: f32::NAN,
            shimmer_db: f32::NAN,
            shimmer_apq3: f32::NAN,
            shimmer_apq5: f32::NAN,
            shimmer_apq11: f32::NAN,
            shimmer_dda: f32::NAN,
            hnr: f32::NAN,
            nhr: f32::NAN,
        }
    }
}

/// Mark glottal cycles across all voiced regions of the pitch track.
///
/// Within a voiced region the next peak is searched in a window around one
/// local period ahead of the previous peak; unvoiced gaps terminate the
/// current run so perturbation differences never span a gap.
pub fn mark_cycles(samples: &[f32], sample_rate: u32, track: &PitchTrack) -> Vec<CycleRun> {
    let mut runs: Vec<CycleRun> = Vec::new();
    if samples.is_empty() || sample_rate == 0 {
        return runs;
    }

    let mut frame_idx = 0usize;

    while frame_idx < track.frames.len() {
        let frame = &track.frames[frame_idx];
        if frame.f0.is_none() {
            frame_idx += 1;
            continue;
        }

        // Walk cycles through this voiced region, consuming frames as the
        // cursor passes them so the local period stays current.
        let mut cursor = frame.start;
        let mut period;
        let mut run = CycleRun::default();
        let mut last_peak: Option<usize> = None;

        loop {
            // Local period from the frame the cursor currently sits in.
            while frame_idx + 1 < track.frames.len()
                && track.frames[frame_idx + 1].start <= cursor
            {
                frame_idx += 1;
            }
            match track.frames.get(frame_idx).and_then(|f| f.f0) {
                Some(f0) => period = sample_rate as f32 / f0,
                None => break, // left the voiced region
            }

            let lo = cursor + (0.75 * period) as usize;
            let hi = (cursor + (1.35 * period) as usize).min(samples.len().saturating_sub(1));
            if lo >= hi {
                break;
            }

            let peak = (lo..=hi)
                .max_by(|&a, &b| {
                    samples[a]
                        .abs()
                        .partial_cmp(&samples[b].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(lo);

            if let Some(prev) = last_peak {
                run.periods.push((peak - prev) as f32 / sample_rate as f32);
                run.amplitudes.push(samples[peak].abs().max(1.0e-6));
            }
            last_peak = Some(peak);
            cursor = peak;
        }

        if run.periods.len() >= 2 {
            runs.push(run);
        }
        frame_idx += 1;
    }

    runs
}

/// Derive all perturbation measures from cycle runs and the pitch track.
pub fn measure_perturbation(runs: &[CycleRun], track: &PitchTrack) -> PerturbationMeasures {
    let mut m = PerturbationMeasures::nan();

    let mean_period = mean(runs.iter().flat_map(|r| r.periods.iter().copied()));
    let mean_amp = mean(runs.iter().flat_map(|r| r.amplitudes.iter().copied()));

    if let Some(mean_period) = mean_period {
        if let Some(abs_diff) = mean_abs_diff(runs, |r| &r.periods) {
            m.jitter_abs = abs_diff;
            m.jitter_local = abs_diff / mean_period;
        }
        if let Some(rap) = mean_quotient(runs, |r| &r.periods, 3) {
            m.jitter_rap = rap / mean_period;
            m.jitter_ddp = 3.0 * m.jitter_rap;
        }
        if let Some(ppq5) = mean_quotient(runs, |r| &r.periods, 5) {
            m.jitter_ppq5 = ppq5 / mean_period;
        }
    }

    if let Some(mean_amp) = mean_amp {
        if let Some(abs_diff) = mean_abs_diff(runs, |r| &r.amplitudes) {
            m.shimmer_local = abs_diff / mean_amp;
        }
        m.shimmer_db = mean_db_diff(runs).unwrap_or(f32::NAN);
        if let Some(apq3) = mean_quotient(runs, |r| &r.amplitudes, 3) {
            m.shimmer_apq3 = apq3 / mean_amp;
            m.shimmer_dda = 3.0 * m.shimmer_apq3;
        }
        if let Some(apq5) = mean_quotient(runs, |r| &r.amplitudes, 5) {
            m.shimmer_apq5 = apq5 / mean_amp;
        }
        if let Some(apq11) = mean_quotient(runs, |r| &r.amplitudes, 11) {
            m.shimmer_apq11 = apq11 / mean_amp;
        }
    }

    if let Some(hnr) = track.mean_hnr_db() {
        m.hnr = hnr;
        m.nhr = 10.0f32.powf(-hnr / 10.0);
    }

    m
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

/// Mean absolute difference between consecutive values, within each run.
fn mean_abs_diff(runs: &[CycleRun], select: impl Fn(&CycleRun) -> &Vec<f32>) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for run in runs {
        let values = select(run);
        for pair in values.windows(2) {
            sum += (pair[1] - pair[0]).abs();
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

/// N-point perturbation quotient numerator: mean |x_i - avg(neighborhood)|.
///
/// With n = 3 this is RAP/APQ3, n = 5 PPQ5/APQ5, n = 11 APQ11.
fn mean_quotient(
    runs: &[CycleRun],
    select: impl Fn(&CycleRun) -> &Vec<f32>,
    n: usize,
) -> Option<f32> {
    let half = n / 2;
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for run in runs {
        let values = select(run);
        if values.len() < n {
            continue;
        }
        for i in half..(values.len() - half) {
            let window = &values[i - half..=i + half];
            let avg = window.iter().sum::<f32>() / n as f32;
            sum += (values[i] - avg).abs();
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

/// Mean absolute dB ratio between consecutive cycle amplitudes.
fn mean_db_diff(runs: &[CycleRun]) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for run in runs {
        for pair in run.amplitudes.windows(2) {
            if pair[0] > 0.0 && pair[1] > 0.0 {
                sum += (20.0 * (pair[1] / pair[0]).log10()).abs();
                count += 1;
            }
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}
