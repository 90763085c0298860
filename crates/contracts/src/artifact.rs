//! LogArtifact - Analyze/Report request payload
//!
//! An uploaded run log, kept as opaque bytes. Decoding the run is the analysis
//! service's concern; the replayer only checks the encoding by extension.

use std::path::Path;

use bytes::Bytes;

use crate::ContractError;

/// Log encoding accepted by the analysis service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Csv,
}

impl ArtifactFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// MIME type used for multipart upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }
}

/// Uploaded log file
#[derive(Debug, Clone)]
pub struct LogArtifact {
    pub file_name: String,
    pub format: ArtifactFormat,
    pub bytes: Bytes,
}

impl LogArtifact {
    /// Wrap in-memory content, checking the file name's extension
    pub fn from_bytes(
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<Self, ContractError> {
        let file_name = file_name.into();
        let format = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ArtifactFormat::from_extension)
            .ok_or_else(|| ContractError::UnsupportedArtifact {
                file_name: file_name.clone(),
            })?;

        Ok(Self {
            file_name,
            format,
            bytes: bytes.into(),
        })
    }

    /// Read a log file from disk
    ///
    /// # Errors
    /// - Unsupported extension (checked before reading)
    /// - File read failure
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // validate extension before touching the file
        Self::from_bytes(file_name.clone(), Bytes::new())?;
        let content = std::fs::read(path)?;
        Self::from_bytes(file_name, content)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
