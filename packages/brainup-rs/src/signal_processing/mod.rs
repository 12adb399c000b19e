//! Signal Processing Module
//!
//! Spectral features for EEG recordings:
//! - Welch power spectral density
//! - Canonical and custom frequency band extraction
//! - Zero-phase Butterworth and notch filters
//!
//! Filters use second-order sections (biquads) for numerical stability.

mod bands;
mod filters;
mod spectrum;

pub use bands::{extract_bands, extract_canonical_bands};
pub use filters::{
    design_filter, filter, filter_with_order, notch, BiquadCoeffs, BiquadFilter,
    ButterworthFilter, FilterPreset, NotchFilter, SosFilter, DEFAULT_FILTER_ORDER,
};
pub use spectrum::{compute_psd, compute_psd_with, WelchConfig, WindowKind, DEFAULT_SEGMENT_LENGTH};
