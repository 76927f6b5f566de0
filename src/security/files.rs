//! Upload validation and filename sanitization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Longest filename, in bytes, that survives sanitization.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Metadata of a file about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Lowercase extension after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Reasons an upload is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileValidationError {
    #[error("File size {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("File has no extension")]
    MissingExtension,

    #[error("File type '.{extension}' is not allowed. Allowed types: {allowed}")]
    ExtensionNotAllowed { extension: String, allowed: String },
}

/// Flattened `{valid, error?, sanitized_name?}` view of a validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_name: Option<String>,
}

impl From<Result<String, FileValidationError>> for FileValidation {
    fn from(result: Result<String, FileValidationError>) -> Self {
        match result {
            Ok(name) => Self {
                valid: true,
                error: None,
                sanitized_name: Some(name),
            },
            Err(e) => Self {
                valid: false,
                error: Some(e.to_string()),
                sanitized_name: None,
            },
        }
    }
}

/// Check size and extension; on success return the sanitized filename.
pub fn validate_file(
    file: &FileInfo,
    config: &SecurityConfig,
) -> Result<String, FileValidationError> {
    if file.size > config.max_file_size_bytes {
        return Err(FileValidationError::TooLarge {
            size: file.size,
            max: config.max_file_size_bytes,
        });
    }

    let extension = file.extension().ok_or(FileValidationError::MissingExtension)?;
    if !config.allowed_file_extensions.contains(&extension) {
        return Err(FileValidationError::ExtensionNotAllowed {
            extension,
            allowed: config
                .allowed_file_extensions
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    Ok(sanitize_filename(&file.name))
}

/// Make a filename safe to send and store.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| {
            !matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*') && !c.is_control()
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');

    if trimmed.is_empty() {
        return "file".to_string();
    }
    if trimmed.len() <= MAX_FILENAME_BYTES {
        return trimmed.to_string();
    }

    match trimmed.rfind('.') {
        Some(idx) if idx > 0 && trimmed.len() - idx < MAX_FILENAME_BYTES => {
            let ext = &trimmed[idx..];
            let stem = truncate_bytes(&trimmed[..idx], MAX_FILENAME_BYTES - ext.len());
            format!("{stem}{ext}")
        }
        _ => truncate_bytes(trimmed, MAX_FILENAME_BYTES).to_string(),
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
