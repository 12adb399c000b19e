use crate::error::{BrainupError, Result};
use crate::montage::Topography;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Content handed to [`SessionStore::persist`](super::SessionStore::persist).
#[derive(Debug, Clone)]
pub enum Payload {
    /// `[data:]<mime>;base64,<payload>` as sent by a browser upload.
    DataUri(String),
    Bytes(Vec<u8>),
    Image(Topography),
}

impl Payload {
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Payload::DataUri(uri) => decode_data_uri(&uri),
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Image(topography) => Ok(topography.png),
        }
    }
}

/// Decode the base64 body of an upload transport string.
pub fn decode_data_uri(contents: &str) -> Result<Vec<u8>> {
    let (header, body) = contents
        .split_once(',')
        .ok_or_else(|| BrainupError::InvalidPayload("missing ',' separator".to_string()))?;

    if !header.trim_end().ends_with(";base64") {
        return Err(BrainupError::InvalidPayload(format!(
            "expected a base64 payload, got header '{}'",
            header
        )));
    }

    let body: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| BrainupError::InvalidPayload(e.to_string()))
}

/// A raw upload together with the file name the user declared for it.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub payload: Payload,
}

impl Upload {
    pub fn from_data_uri(contents: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: Payload::DataUri(contents.into()),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: Payload::Bytes(bytes),
        }
    }

    /// Declared extension, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}
