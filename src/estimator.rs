//! F0 estimation - Fills a pitch contour from raw samples.
//!
//! The analysis pipeline only depends on the [`F0Estimator`] trait: a
//! sizing function that tells how many frames a signal produces, and a
//! fill function that writes F0 values and frame times in place.
//!
//! # Frame Grid
//!
//! Frames are spaced by a fixed frame period (milliseconds). Frame `i` is
//! centred at `i * frame_period / 1000` seconds, and a signal of `n`
//! samples at `fs` Hz produces `floor(1000 * n / fs / frame_period) + 1`
//! frames.
//!
//! # Autocorrelation Estimator
//!
//! [`AutocorrelationEstimator`] follows Boersma (1993):
//! - Autocorrelation normalization: r_x(τ) ≈ r_a(τ) / r_w(τ) (Eq. 9)
//! - Unvoiced candidate strength (Eq. 23) and octave cost (Eq. 24)
//! - Viterbi transition costs (Eq. 27)
//!
//! Autocorrelations are computed through the FFT (Wiener-Khinchin), with
//! enough zero padding to make the correlation linear.

use std::ops::Range;
use std::sync::Arc;

use ndarray::{ArrayView1, ArrayViewMut1};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::trace;

use crate::buffer::{try_filled, try_with_capacity};
use crate::error::{Error, Result};
use crate::sound::MAX_SAMPLE_RATE;

/// Number of frames for a signal of `n_samples` at `sample_rate` Hz.
///
/// Returns 0 for a zero sample rate or a non-positive frame period.
pub fn samples_for_frame_period(sample_rate: u32, n_samples: usize, frame_period: f64) -> usize {
    if sample_rate == 0 || frame_period.is_nan() || frame_period <= 0.0 {
        return 0;
    }
    let frames = 1000.0 * n_samples as f64 / sample_rate as f64 / frame_period;
    (frames as usize).saturating_add(1)
}

/// An F0 extraction algorithm.
///
/// Implementations must be shareable across threads; one estimator serves
/// any number of concurrent analyses.
pub trait F0Estimator: Send + Sync {
    /// Spacing between frames in milliseconds.
    fn frame_period(&self) -> f64;

    /// Number of frames `estimate` expects for this signal.
    fn n_frames(&self, sample_rate: u32, n_samples: usize) -> usize {
        samples_for_frame_period(sample_rate, n_samples, self.frame_period())
    }

    /// Write frame times (seconds) and F0 values (Hz, 0 = unvoiced).
    ///
    /// Both output views have the length returned by [`F0Estimator::n_frames`].
    ///
    /// # Errors
    ///
    /// `Error::Allocation` if a working buffer cannot be allocated, or
    /// `Error::InvalidFormat` for a sample rate the estimator cannot handle.
    fn estimate(
        &self,
        samples: ArrayView1<f64>,
        sample_rate: u32,
        timestamps: ArrayViewMut1<f64>,
        frequencies: ArrayViewMut1<f64>,
    ) -> Result<()>;
}

/// Parameters of the autocorrelation estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorOptions {
    /// Frame period in milliseconds (default: 5.0).
    pub frame_period: f64,
    /// Lowest F0 searched, in Hz (default: 71.0).
    pub f0_floor: f64,
    /// Highest F0 searched, in Hz (default: 800.0).
    pub f0_ceil: f64,
    /// Strength a voiced candidate must beat (default: 0.45).
    pub voicing_threshold: f64,
    /// Frames quieter than this fraction of the global peak tend to be
    /// unvoiced (default: 0.03).
    pub silence_threshold: f64,
    /// Preference for higher candidates (default: 0.01).
    pub octave_cost: f64,
    /// Penalty for octave jumps between frames (default: 0.35).
    pub octave_jump_cost: f64,
    /// Penalty for voicing transitions between frames (default: 0.14).
    pub voiced_unvoiced_cost: f64,
    /// Window length in periods of `f0_floor` (default: 3.0).
    pub periods_per_window: f64,
    /// Voiced candidates kept per frame (default: 15).
    pub max_candidates: usize,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            frame_period: 5.0,
            f0_floor: 71.0,
            f0_ceil: 800.0,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
            periods_per_window: 3.0,
            max_candidates: 15,
        }
    }
}

/// A candidate F0 for one frame.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Frequency in Hz (0 = unvoiced).
    frequency: f64,
    /// Candidate strength.
    strength: f64,
}

/// Normalized-autocorrelation F0 tracker.
#[derive(Debug, Clone, Default)]
pub struct AutocorrelationEstimator {
    options: EstimatorOptions,
}

impl AutocorrelationEstimator {
    pub fn new(options: EstimatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }
}

impl F0Estimator for AutocorrelationEstimator {
    fn frame_period(&self) -> f64 {
        self.options.frame_period
    }

    fn estimate(
        &self,
        samples: ArrayView1<f64>,
        sample_rate: u32,
        mut timestamps: ArrayViewMut1<f64>,
        mut frequencies: ArrayViewMut1<f64>,
    ) -> Result<()> {
        let opts = &self.options;
        let n_frames = frequencies.len().min(timestamps.len());
        let time_step = opts.frame_period / 1000.0;

        for (i, t) in timestamps.iter_mut().enumerate() {
            *t = i as f64 * time_step;
        }
        frequencies.fill(0.0);

        if sample_rate > MAX_SAMPLE_RATE {
            return Err(Error::InvalidFormat(format!(
                "sample rate {} Hz above {} Hz",
                sample_rate, MAX_SAMPLE_RATE
            )));
        }
        if n_frames == 0 || sample_rate == 0 || opts.f0_floor <= 0.0 {
            return Ok(());
        }
        let fs = sample_rate as f64;

        // Window: periods_per_window periods of the lowest pitch, odd length
        let mut window_samples = (opts.periods_per_window / opts.f0_floor * fs).round() as usize;
        if window_samples % 2 == 0 {
            window_samples += 1;
        }
        let half_window = window_samples / 2;

        let min_lag = ((fs / opts.f0_ceil).ceil() as usize).max(2);
        let max_lag = ((fs / opts.f0_floor).floor() as usize).min(window_samples.saturating_sub(2));
        if max_lag <= min_lag + 1 {
            return Ok(());
        }

        let window = hanning_window(window_samples)?;
        let mut autocorrelator = Autocorrelator::new(window_samples)?;
        let r_w = autocorrelator.compute(&window, max_lag);

        let global_peak = samples.iter().map(|&s| s.abs()).fold(0.0f64, f64::max);
        let n_samples = samples.len() as isize;

        let mut frames: Vec<Vec<Candidate>> = try_with_capacity(n_frames, "candidate frames")?;
        let mut frame = try_filled(window_samples, 0.0, "analysis frame")?;

        for i in 0..n_frames {
            let centre = (i as f64 * time_step * fs).round() as isize;
            let start = centre - half_window as isize;

            // Zero outside the signal
            for (k, slot) in frame.iter_mut().enumerate() {
                let idx = start + k as isize;
                *slot = if (0..n_samples).contains(&idx) {
                    samples[idx as usize]
                } else {
                    0.0
                };
            }

            let local_peak = frame.iter().map(|&s| s.abs()).fold(0.0f64, f64::max);
            let local_intensity = local_peak / (global_peak + 1e-30);

            for (s, &w) in frame.iter_mut().zip(window.iter()) {
                *s *= w;
            }
            let r = autocorrelator.compute(&frame, max_lag);

            // Eq. 23
            let unvoiced = Candidate {
                frequency: 0.0,
                strength: opts.voicing_threshold
                    + (2.0 - local_intensity / opts.silence_threshold).max(0.0)
                        * (1.0 + opts.voicing_threshold),
            };
            let mut candidates = vec![unvoiced];
            candidates.extend(
                find_peaks(&r, &r_w, min_lag..max_lag, fs, opts.max_candidates)
                    .into_iter()
                    .map(|peak| Candidate {
                        // Eq. 24
                        strength: peak.strength
                            - opts.octave_cost * (opts.f0_floor / peak.frequency).log2(),
                        ..peak
                    }),
            );
            frames.push(candidates);
        }

        let costs = TransitionCosts {
            octave_jump: opts.octave_jump_cost,
            voiced_unvoiced: opts.voiced_unvoiced_cost,
            time_correction: 0.01 / time_step,
        };
        track(&frames, &costs, frequencies)?;

        trace!(
            n_frames,
            window_samples,
            min_lag,
            max_lag,
            "autocorrelation pass complete"
        );
        Ok(())
    }
}

fn hanning_window(n: usize) -> Result<Vec<f64>> {
    let mut window = try_with_capacity(n.max(1), "analysis window")?;
    if n <= 1 {
        window.push(1.0);
        return Ok(window);
    }
    let step = 2.0 * std::f64::consts::PI / (n - 1) as f64;
    window.extend((0..n).map(|i| 0.5 - 0.5 * (step * i as f64).cos()));
    Ok(window)
}

/// FFT-based linear autocorrelation for frames of a fixed maximum length.
struct Autocorrelator {
    fft_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
}

impl Autocorrelator {
    fn new(frame_len: usize) -> Result<Self> {
        // At least 2N so the circular correlation equals the linear one
        let fft_len = (2 * frame_len).next_power_of_two();
        let buffer = try_with_capacity(fft_len, "fft buffer")?;
        let mut planner = FftPlanner::<f64>::new();
        Ok(Self {
            fft_len,
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
            buffer,
        })
    }

    /// Autocorrelation of `frame` for lags 0 to `max_lag`.
    fn compute(&mut self, frame: &[f64], max_lag: usize) -> Vec<f64> {
        self.buffer.clear();
        self.buffer
            .extend(frame.iter().take(self.fft_len).map(|&s| Complex::new(s, 0.0)));
        self.buffer.resize(self.fft_len, Complex::new(0.0, 0.0));

        self.forward.process(&mut self.buffer);
        for c in self.buffer.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut self.buffer);

        let scale = 1.0 / self.fft_len as f64;
        (0..=max_lag)
            .map(|lag| {
                if lag < frame.len() {
                    self.buffer[lag].re * scale
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Local maxima of the window-corrected autocorrelation r(τ)/r(0) ÷ r_w(τ)/r_w(0)
/// with lag in `lags`, strongest first, at most `limit` of them.
fn find_peaks(
    r: &[f64],
    r_w: &[f64],
    lags: Range<usize>,
    sample_rate: f64,
    limit: usize,
) -> Vec<Candidate> {
    let (r_0, r_w0) = match (r.first(), r_w.first()) {
        (Some(&a), Some(&b)) if a > 0.0 && b > 0.0 => (a, b),
        _ => return Vec::new(),
    };
    if lags.start == 0 || lags.end >= r.len().min(r_w.len()) {
        return Vec::new();
    }

    let normalized = |lag: usize| {
        if r_w[lag] > 0.0 {
            (r[lag] / r_0) / (r_w[lag] / r_w0)
        } else {
            0.0
        }
    };

    let mut peaks: Vec<Candidate> = lags
        .filter_map(|lag| {
            let (prev, curr, next) = (normalized(lag - 1), normalized(lag), normalized(lag + 1));
            (curr > prev && curr > next && curr > 0.0).then(|| Candidate {
                frequency: sample_rate / (lag as f64 + vertex_offset(prev, curr, next)),
                strength: curr,
            })
        })
        .collect();

    peaks.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    peaks.truncate(limit);
    peaks
}

/// Offset of the parabola vertex through three equally spaced points,
/// relative to the middle one. 0 when the fit is flat or leaves the cell.
fn vertex_offset(prev: f64, curr: f64, next: f64) -> f64 {
    let curvature = prev - 2.0 * curr + next;
    if curvature.abs() <= 1e-10 {
        return 0.0;
    }
    let offset = 0.5 * (prev - next) / curvature;
    if offset.abs() < 1.0 {
        offset
    } else {
        0.0
    }
}

/// Path costs between consecutive frames (Eq. 27).
struct TransitionCosts {
    octave_jump: f64,
    voiced_unvoiced: f64,
    /// `0.01 / time_step`, so costs do not depend on the frame rate.
    time_correction: f64,
}

impl TransitionCosts {
    fn between(&self, from: f64, to: f64) -> f64 {
        let cost = match (from > 0.0, to > 0.0) {
            (false, false) => 0.0,
            (true, true) => self.octave_jump * (to / from).log2().abs(),
            _ => self.voiced_unvoiced,
        };
        cost * self.time_correction
    }
}

/// Choose one candidate per frame along the cheapest path and write its
/// frequency into `f0`.
///
/// Only the running cost of the previous frame is kept; back pointers are
/// stored per frame for the final walk.
fn track(frames: &[Vec<Candidate>], costs: &TransitionCosts, mut f0: ArrayViewMut1<f64>) -> Result<()> {
    let Some(first) = frames.first() else {
        return Ok(());
    };

    let mut cost: Vec<f64> = first.iter().map(|c| -c.strength).collect();
    let mut back: Vec<Vec<usize>> = try_with_capacity(frames.len(), "viterbi back pointers")?;
    back.push(Vec::new());

    for pair in frames.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let mut next_cost = Vec::with_capacity(next.len());
        let mut next_back = Vec::with_capacity(next.len());
        for to in next {
            let (k, total) = prev
                .iter()
                .zip(cost.iter())
                .map(|(from, &c)| c + costs.between(from.frequency, to.frequency))
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap_or((0, f64::INFINITY));
            next_cost.push(total - to.strength);
            next_back.push(k);
        }
        cost = next_cost;
        back.push(next_back);
    }

    let mut state = cost
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(j, _)| j);
    for i in (0..frames.len()).rev() {
        if let Some(slot) = f0.get_mut(i) {
            *slot = frames[i].get(state).map_or(0.0, |c| c.frequency);
        }
        state = back[i].get(state).copied().unwrap_or(0);
    }
    Ok(())
}
