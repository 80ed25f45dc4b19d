use thiserror::Error;

use crate::config::UploadConfig;
use crate::models::FileBlob;

pub const PDF_MIME: &str = "application/pdf";
pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("File is empty")]
    Empty,

    #[error("File exceeds the {limit} byte limit ({size} bytes)")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported file type '{found}', expected one of: {expected}")]
    UnsupportedType { found: String, expected: String },
}

/// A file received in a request, not yet persisted.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn into_blob(self) -> FileBlob {
        let mime = essence(&self.mime_type);
        FileBlob::new(self.file_name, mime, self.data)
    }
}

/// `"application/pdf; name=x"` -> `"application/pdf"`
fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Type and size limits applied before an upload touches storage.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed: &'static [&'static str],
    max_bytes: usize,
}

impl UploadPolicy {
    pub fn new(allowed: &'static [&'static str], max_bytes: usize) -> Self {
        Self { allowed, max_bytes }
    }

    /// Corrections, approvals and client signatures.
    pub fn pdf(config: &UploadConfig) -> Self {
        Self::new(&[PDF_MIME], config.correction_max_bytes)
    }

    pub fn logo(config: &UploadConfig) -> Self {
        Self::new(&[PNG_MIME, JPEG_MIME], config.logo_max_bytes)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check(&self, upload: &Upload) -> Result<(), UploadError> {
        if upload.data.is_empty() {
            return Err(UploadError::Empty);
        }
        let mime = essence(&upload.mime_type);
        if !self.allowed.contains(&mime.as_str()) {
            return Err(UploadError::UnsupportedType {
                found: mime,
                expected: self.allowed.join(", "),
            });
        }
        if upload.data.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: upload.data.len(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}
