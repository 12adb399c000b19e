/// File Readers Module
///
/// Decodes uploaded recordings (CSV, Excel, EDF, XDF) into a [`SignalMatrix`].
/// Each format implements [`FormatReader`]; [`decode`] picks the reader and
/// folds its errors into [`BrainupError`].
use crate::error::{BrainupError, Result};
use crate::types::SignalMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod csv_reader;
pub mod edf_reader;
pub mod table;
pub mod xdf_reader;
pub mod xls_reader;

pub use csv_reader::CsvFileReader;
pub use edf_reader::EdfFileReader;
pub use table::NumericTable;
pub use xdf_reader::XdfFileReader;
pub use xls_reader::XlsFileReader;

/// Sample rate assumed for tabular uploads, which carry none.
pub const DEFAULT_TABULAR_SAMPLE_RATE: f64 = 256.0;

pub type FileResult<T> = std::result::Result<T, FileReaderError>;

/// Reader-level failures, folded into [`BrainupError`] by [`decode`].
#[derive(Error, Debug)]
pub enum FileReaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("No EEG stream found")]
    NoEegStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalFormat {
    Csv,
    Xls,
    Edf,
    Xdf,
}

impl SignalFormat {
    /// Resolve the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "csv" => Ok(SignalFormat::Csv),
            "xls" | "xlsx" => Ok(SignalFormat::Xls),
            "edf" => Ok(SignalFormat::Edf),
            "xdf" => Ok(SignalFormat::Xdf),
            _ => Err(BrainupError::UnsupportedFormat(file_name.to_string())),
        }
    }

    pub fn supported_extensions() -> &'static [&'static str] {
        &["csv", "xls", "xlsx", "edf", "xdf"]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalFormat::Csv => "CSV",
            SignalFormat::Xls => "Excel",
            SignalFormat::Edf => "EDF",
            SignalFormat::Xdf => "XDF",
        }
    }

    fn reader(&self, options: &DecodeOptions) -> Box<dyn FormatReader> {
        match self {
            SignalFormat::Csv => Box::new(CsvFileReader::new(options.tabular_sample_rate)),
            SignalFormat::Xls => Box::new(XlsFileReader::new(options.tabular_sample_rate)),
            SignalFormat::Edf => Box::new(EdfFileReader),
            SignalFormat::Xdf => Box::new(XdfFileReader),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub tabular_sample_rate: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            tabular_sample_rate: DEFAULT_TABULAR_SAMPLE_RATE,
        }
    }
}

/// A decoder for one on-disk format, reading from an in-memory payload.
pub trait FormatReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> FileResult<SignalMatrix>;

    fn format_name(&self) -> &str;
}

pub fn decode(bytes: &[u8], format: SignalFormat) -> Result<SignalMatrix> {
    decode_with(bytes, format, &DecodeOptions::default())
}

pub fn decode_with(bytes: &[u8], format: SignalFormat, options: &DecodeOptions) -> Result<SignalMatrix> {
    decode_named(bytes, format, format.name(), options)
}

/// Decode with `file` used in error reports.
pub fn decode_named(
    bytes: &[u8],
    format: SignalFormat,
    file: &str,
    options: &DecodeOptions,
) -> Result<SignalMatrix> {
    let reader = format.reader(options);
    match reader.read(bytes) {
        Ok(signal) => {
            log::debug!(
                "Decoded {} ({}): {} channels x {} samples @ {} Hz",
                file,
                reader.format_name(),
                signal.num_channels(),
                signal.num_samples(),
                signal.sample_rate()
            );
            Ok(signal)
        }
        Err(FileReaderError::NoEegStream) => Err(BrainupError::NoEegStreamFound),
        Err(e) => {
            log::warn!("Failed to decode {} as {}: {}", file, reader.format_name(), e);
            Err(BrainupError::file_read(file, e))
        }
    }
}

/// Resolve the format from `file_name` and decode.
pub fn decode_file(bytes: &[u8], file_name: &str, options: &DecodeOptions) -> Result<SignalMatrix> {
    let format = SignalFormat::from_file_name(file_name)?;
    decode_named(bytes, format, file_name, options)
}
