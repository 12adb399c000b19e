//! Digital Filter Implementations
//!
//! IIR filters built from second-order sections (biquads). Butterworth
//! low/high/band-pass and notch designs, applied zero-phase over whole
//! recordings.

use crate::error::{BrainupError, Result};
use crate::types::SignalMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_FILTER_ORDER: usize = 4;

/// Second-order section coefficients, normalized so that `a0 == 1`.
/// H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Gain at DC (z = 1).
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad section, Direct Form II Transposed.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.state.z1;
        self.state.z1 = c.b1 * input - c.a1 * output + self.state.z2;
        self.state.z2 = c.b2 * input - c.a2 * output;
        output
    }

    /// Load the state a constant input `x` would settle into; returns the
    /// settled output.
    fn settle(&mut self, x: f64) -> f64 {
        let c = self.coeffs;
        let y = c.dc_gain() * x;
        self.state.z1 = y - c.b0 * x;
        self.state.z2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }
}

/// Cascaded second-order sections.
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        self.sections
            .iter_mut()
            .fold(input, |acc, section| section.process(acc))
    }

    /// Causal pass; the input is left unchanged.
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    pub fn reset(&mut self) {
        self.sections.iter_mut().for_each(BiquadFilter::reset);
    }

    fn settle(&mut self, x: f64) {
        self.sections
            .iter_mut()
            .fold(x, |acc, section| section.settle(acc));
    }

    /// Edge padding used by the zero-phase pass.
    fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Forward-backward pass with odd reflection padding, each direction
    /// starting from the steady state of its first sample.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 || self.sections.is_empty() {
            return signal.to_vec();
        }

        let pad = self.pad_len().min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        let mut pass = self.clone();
        pass.settle(extended[0]);
        let mut forward = pass.filter(&extended);

        forward.reverse();
        let mut pass = self.clone();
        pass.settle(forward[0]);
        let mut backward = pass.filter(&forward);
        backward.reverse();

        backward[pad..pad + n].to_vec()
    }
}

/// Butterworth filter designer (bilinear transform with prewarping).
pub struct ButterworthFilter;

impl ButterworthFilter {
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        SosFilter::new(Self::design_lowpass(Self::prewarp(cutoff, sample_rate), order))
    }

    pub fn highpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        SosFilter::new(Self::design_highpass(Self::prewarp(cutoff, sample_rate), order))
    }

    /// Highpass at `low` cascaded with lowpass at `high`.
    pub fn bandpass(low: f64, high: f64, sample_rate: f64, order: usize) -> SosFilter {
        let mut sections = Self::design_highpass(Self::prewarp(low, sample_rate), order);
        sections.extend(Self::design_lowpass(Self::prewarp(high, sample_rate), order));
        SosFilter::new(sections)
    }

    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Damping term `2 sin(theta_k)` of each conjugate pole pair.
    fn damping(k: usize, order: usize) -> f64 {
        let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        2.0 * theta.sin()
    }

    fn design_lowpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let order = order.max(1);
        let mut sections = Vec::with_capacity((order + 1) / 2);

        for k in 0..order / 2 {
            let d = Self::damping(k, order);
            let wn2 = wn * wn;
            let denom = 1.0 + d * wn + wn2;
            sections.push(BiquadCoeffs {
                b0: wn2 / denom,
                b1: 2.0 * wn2 / denom,
                b2: wn2 / denom,
                a1: 2.0 * (wn2 - 1.0) / denom,
                a2: (1.0 - d * wn + wn2) / denom,
            });
        }

        if order % 2 == 1 {
            let g = wn / (1.0 + wn);
            sections.push(BiquadCoeffs {
                b0: g,
                b1: g,
                b2: 0.0,
                a1: (wn - 1.0) / (wn + 1.0),
                a2: 0.0,
            });
        }

        sections
    }

    fn design_highpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let order = order.max(1);
        let mut sections = Vec::with_capacity((order + 1) / 2);

        for k in 0..order / 2 {
            let d = Self::damping(k, order);
            let wn2 = wn * wn;
            let denom = 1.0 + d * wn + wn2;
            sections.push(BiquadCoeffs {
                b0: 1.0 / denom,
                b1: -2.0 / denom,
                b2: 1.0 / denom,
                a1: 2.0 * (wn2 - 1.0) / denom,
                a2: (1.0 - d * wn + wn2) / denom,
            });
        }

        if order % 2 == 1 {
            let g = 1.0 / (1.0 + wn);
            sections.push(BiquadCoeffs {
                b0: g,
                b1: -g,
                b2: 0.0,
                a1: (wn - 1.0) / (wn + 1.0),
                a2: 0.0,
            });
        }

        sections
    }
}

/// Notch (band-reject) filter for removing a single frequency.
pub struct NotchFilter;

impl NotchFilter {
    /// `q_factor`: higher is narrower, 30 is typical for line noise.
    pub fn design(center_freq: f64, sample_rate: f64, q_factor: f64) -> SosFilter {
        let w0 = 2.0 * PI * center_freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q_factor);
        let a0 = 1.0 + alpha;

        SosFilter::new(vec![BiquadCoeffs {
            b0: 1.0 / a0,
            b1: -2.0 * cos_w0 / a0,
            b2: 1.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }])
    }
}

/// Band limits offered to the user, mirroring the dashboard's filter menu.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterPreset {
    None,
    /// Keep activity below 1 Hz.
    LowFrequency,
    /// Keep activity above 25 Hz.
    HighFrequency,
    Custom { low: Option<f64>, high: Option<f64> },
}

impl FilterPreset {
    /// `(low, high)` cutoffs handed to [`filter`].
    pub fn cutoffs(&self) -> (Option<f64>, Option<f64>) {
        match *self {
            FilterPreset::None => (None, None),
            FilterPreset::LowFrequency => (None, Some(1.0)),
            FilterPreset::HighFrequency => (Some(25.0), None),
            FilterPreset::Custom { low, high } => (low, high),
        }
    }
}

fn check_cutoff(name: &str, value: f64, nyquist: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(BrainupError::InvalidFilter(format!(
            "{} cutoff must be positive, got {}",
            name, value
        )));
    }
    if value >= nyquist {
        return Err(BrainupError::InvalidFilter(format!(
            "{} cutoff ({} Hz) must be less than Nyquist ({} Hz)",
            name, value, nyquist
        )));
    }
    Ok(())
}

/// Design the Butterworth filter for `(low, high)`; `None` when both are open.
pub fn design_filter(
    low: Option<f64>,
    high: Option<f64>,
    sample_rate: f64,
    order: usize,
) -> Result<Option<SosFilter>> {
    let nyquist = sample_rate / 2.0;

    let design = match (low, high) {
        (None, None) => None,
        (Some(l), None) => {
            check_cutoff("Low", l, nyquist)?;
            Some(ButterworthFilter::highpass(l, sample_rate, order))
        }
        (None, Some(h)) => {
            check_cutoff("High", h, nyquist)?;
            Some(ButterworthFilter::lowpass(h, sample_rate, order))
        }
        (Some(l), Some(h)) => {
            check_cutoff("Low", l, nyquist)?;
            check_cutoff("High", h, nyquist)?;
            if l >= h {
                return Err(BrainupError::InvalidFilter(
                    "Low cutoff must be less than high cutoff".to_string(),
                ));
            }
            Some(ButterworthFilter::bandpass(l, h, sample_rate, order))
        }
    };

    Ok(design)
}

fn apply(signal: &SignalMatrix, sos: &SosFilter) -> Result<SignalMatrix> {
    let data: Vec<Vec<f64>> = signal
        .data()
        .par_iter()
        .map(|row| sos.filtfilt(row))
        .collect();
    signal.with_data(data)
}

/// Zero-phase Butterworth filter of the given order. `(None, None)` returns
/// an identical copy.
pub fn filter_with_order(
    signal: &SignalMatrix,
    low: Option<f64>,
    high: Option<f64>,
    order: usize,
) -> Result<SignalMatrix> {
    match design_filter(low, high, signal.sample_rate(), order)? {
        None => Ok(signal.clone()),
        Some(sos) => {
            log::debug!(
                "Filtering {} channels: low={:?} high={:?} order={} ({} sections)",
                signal.num_channels(),
                low,
                high,
                order,
                sos.num_sections()
            );
            apply(signal, &sos)
        }
    }
}

pub fn filter(signal: &SignalMatrix, low: Option<f64>, high: Option<f64>) -> Result<SignalMatrix> {
    filter_with_order(signal, low, high, DEFAULT_FILTER_ORDER)
}

/// Remove a single frequency (e.g. 50/60 Hz line noise) with zero phase.
pub fn notch(signal: &SignalMatrix, freq: f64, q_factor: f64) -> Result<SignalMatrix> {
    check_cutoff("Notch", freq, signal.sample_rate() / 2.0)?;
    if !(q_factor.is_finite() && q_factor > 0.0) {
        return Err(BrainupError::InvalidFilter(format!(
            "Q factor must be positive, got {}",
            q_factor
        )));
    }
    apply(signal, &NotchFilter::design(freq, signal.sample_rate(), q_factor))
}
