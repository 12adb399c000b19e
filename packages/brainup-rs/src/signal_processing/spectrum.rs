//! Welch power spectral density.

use crate::error::{BrainupError, Result};
use crate::types::{RawSpectrum, SignalMatrix};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::f64::consts::PI;

// Thread-local FFT planner, reused across rayon workers
thread_local! {
    static FFT_PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

/// Segment length cap used when none is configured.
pub const DEFAULT_SEGMENT_LENGTH: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hamming,
    Hann,
}

impl WindowKind {
    /// Periodic (DFT-even) window of length `n`.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        let (a0, a1) = match self {
            WindowKind::Hamming => (0.54, 0.46),
            WindowKind::Hann => (0.5, 0.5),
        };
        (0..n)
            .map(|i| a0 - a1 * (2.0 * PI * i as f64 / n as f64).cos())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Upper bound on the segment length; shorter recordings use their length.
    pub n_per_seg: usize,
    pub n_overlap: usize,
    pub window: WindowKind,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            n_per_seg: DEFAULT_SEGMENT_LENGTH,
            n_overlap: 0,
            window: WindowKind::Hamming,
        }
    }
}

/// One-sided Welch PSD with the default configuration.
pub fn compute_psd(signal: &SignalMatrix) -> Result<RawSpectrum> {
    compute_psd_with(signal, &WelchConfig::default())
}

pub fn compute_psd_with(signal: &SignalMatrix, config: &WelchConfig) -> Result<RawSpectrum> {
    let n_samples = signal.num_samples();
    if n_samples == 0 {
        return Err(BrainupError::InvalidSignal(
            "cannot estimate a spectrum from an empty recording".to_string(),
        ));
    }
    if config.n_per_seg == 0 {
        return Err(BrainupError::InvalidSignal(
            "segment length must be positive".to_string(),
        ));
    }

    let seg_len = config.n_per_seg.min(n_samples);
    if config.n_overlap >= seg_len {
        return Err(BrainupError::InvalidSignal(format!(
            "overlap ({}) must be shorter than the segment ({})",
            config.n_overlap, seg_len
        )));
    }
    let step = seg_len - config.n_overlap;
    let fs = signal.sample_rate();

    let window = config.window.coefficients(seg_len);
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
    let n_bins = seg_len / 2 + 1;

    let power: Vec<Vec<f64>> = signal
        .data()
        .par_iter()
        .map(|row| welch_channel(row, &window, step, scale, n_bins))
        .collect();

    let frequencies = (0..n_bins)
        .map(|k| k as f64 * fs / seg_len as f64)
        .collect();

    log::debug!(
        "Welch PSD: {} channels, segment {} samples, {} bins",
        signal.num_channels(),
        seg_len,
        n_bins
    );

    Ok(RawSpectrum {
        channels: signal.channels().to_vec(),
        frequencies,
        power,
    })
}

fn welch_channel(row: &[f64], window: &[f64], step: usize, scale: f64, n_bins: usize) -> Vec<f64> {
    let seg_len = window.len();
    let mut acc = vec![0.0; n_bins];
    let mut segments = 0usize;

    let fft = FFT_PLANNER.with(|planner| planner.borrow_mut().plan_fft_forward(seg_len));
    let mut buffer = vec![Complex::new(0.0, 0.0); seg_len];

    let mut start = 0;
    while start + seg_len <= row.len() {
        let segment = &row[start..start + seg_len];
        let mean = segment.iter().sum::<f64>() / seg_len as f64;

        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(window) {
            *slot = Complex::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (a, c) in acc.iter_mut().zip(&buffer[..n_bins]) {
            *a += c.norm_sqr();
        }
        segments += 1;
        start += step;
    }

    let nyquist_bin = if seg_len % 2 == 0 { Some(n_bins - 1) } else { None };
    acc.iter()
        .enumerate()
        .map(|(k, &p)| {
            let one_sided = if k == 0 || Some(k) == nyquist_bin { 1.0 } else { 2.0 };
            p * scale * one_sided / segments as f64
        })
        .collect()
}
