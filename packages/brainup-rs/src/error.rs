use std::path::PathBuf;
use thiserror::Error;

/// Boxed parser failure carried by [`BrainupError::FileRead`].
pub type ParseFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum BrainupError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error reading file '{file}'. Please check the file format and content")]
    FileRead {
        file: String,
        #[source]
        source: ParseFailure,
    },

    #[error("No EEG stream found in the XDF file")]
    NoEegStreamFound,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unknown electrode layout: {0}")]
    UnknownLayout(String),

    #[error("At least {required} electrodes with known positions are needed, found {found}")]
    InsufficientElectrodes { found: usize, required: usize },

    #[error("None of the selected channels were found in the data")]
    EmptyChannelSelection,

    #[error("Channel '{0}' not found in the data")]
    ChannelNotFound(String),

    #[error("Duplicate channel label: {0}")]
    DuplicateChannel(String),

    #[error("Unknown frequency band: {0}")]
    UnknownBand(String),

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Invalid upload payload: {0}")]
    InvalidPayload(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed power-band export: {0}")]
    MalformedExport(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding failed: {0}")]
    Image(#[from] png::EncodingError),
}

impl BrainupError {
    /// Wrap an arbitrary parser failure so it never escapes as a raw error.
    pub fn file_read(file: impl Into<String>, source: impl Into<ParseFailure>) -> Self {
        BrainupError::FileRead {
            file: file.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrainupError>;
