pub mod bands;
pub mod export;
pub mod layouts;
pub mod sweep;
pub mod topomap;

use crate::cli::FilterArgs;
use crate::exit_codes;
use brainup_rs::signal_processing::filter;
use brainup_rs::{decode_file, BrainupError, DecodeOptions, SignalMatrix};
use std::path::Path;

/// Exit code for a library error: input problems are the user's to fix.
pub fn exit_code_for(error: &BrainupError) -> i32 {
    match error {
        BrainupError::UnsupportedFormat(_)
        | BrainupError::FileRead { .. }
        | BrainupError::NoEegStreamFound
        | BrainupError::FileNotFound(_)
        | BrainupError::UnknownLayout(_)
        | BrainupError::InsufficientElectrodes { .. }
        | BrainupError::EmptyChannelSelection
        | BrainupError::ChannelNotFound(_)
        | BrainupError::DuplicateChannel(_)
        | BrainupError::UnknownBand(_)
        | BrainupError::InvalidFilter(_)
        | BrainupError::InvalidName(_)
        | BrainupError::InvalidOption(_)
        | BrainupError::InvalidPayload(_)
        | BrainupError::MalformedExport(_) => exit_codes::INPUT_ERROR,
        _ => exit_codes::EXECUTION_ERROR,
    }
}

pub fn report(error: &BrainupError) -> i32 {
    eprintln!("Error: {}", error);
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
    exit_code_for(error)
}

/// Read, decode and optionally filter a recording.
pub fn load_signal(file: &str, sample_rate: Option<f64>, band: FilterArgs) -> Result<SignalMatrix, i32> {
    let mut options = DecodeOptions::default();
    if let Some(rate) = sample_rate {
        if !(rate.is_finite() && rate > 0.0) {
            eprintln!("Error: --sample-rate must be positive, got {}", rate);
            return Err(exit_codes::INPUT_ERROR);
        }
        options.tabular_sample_rate = rate;
    }

    let bytes = std::fs::read(Path::new(file)).map_err(|e| {
        eprintln!("Error: cannot read '{}': {}", file, e);
        exit_codes::INPUT_ERROR
    })?;

    let file_name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);

    let signal = decode_file(&bytes, file_name, &options).map_err(|e| report(&e))?;
    log::info!(
        "Loaded {}: {} channels, {} samples @ {} Hz",
        file,
        signal.num_channels(),
        signal.num_samples(),
        signal.sample_rate()
    );

    filter(&signal, band.low, band.high).map_err(|e| report(&e))
}
