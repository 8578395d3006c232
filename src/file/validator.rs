//! Upload validation rules.

use std::path::Path;

use image::ImageReader;
use serde::Serialize;

use super::record::FileRecord;
use super::WILDCARD_EXTENSION;
use crate::config::UploadConfig;
use crate::upload::ErrorKind;

/// Result of validating a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    TooLarge,
    DisallowedExtension,
    NotAnImage,
}

impl ValidationOutcome {
    pub fn is_valid(self) -> bool {
        self == ValidationOutcome::Valid
    }

    /// Error kind reported for a failed check.
    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::TooLarge => Some(ErrorKind::TooLarge),
            ValidationOutcome::DisallowedExtension => Some(ErrorKind::DisallowedExtension),
            ValidationOutcome::NotAnImage => Some(ErrorKind::NotAnImage),
        }
    }
}

/// Check a file against size, extension and image constraints.
///
/// - `max_size == 0` disables the size check.
/// - `allowed_extensions` containing `"*"` disables the extension check;
///   otherwise the file's extension must match one entry, ignoring case.
///   A file without an extension never matches.
/// - `only_images` requires the bytes to decode as an image.
///
/// Checks run in that order and the first failure wins.
pub fn validate(
    file: &FileRecord,
    max_size: u64,
    allowed_extensions: &[String],
    only_images: bool,
) -> ValidationOutcome {
    if max_size != 0 && file.size() > max_size {
        return ValidationOutcome::TooLarge;
    }

    if !allowed_extensions.iter().any(|e| e == WILDCARD_EXTENSION) {
        let allowed = file.extension().is_some_and(|ext| {
            allowed_extensions
                .iter()
                .any(|candidate| candidate.to_lowercase() == ext)
        });
        if !allowed {
            return ValidationOutcome::DisallowedExtension;
        }
    }

    if only_images && !file.source_path().is_some_and(is_image) {
        return ValidationOutcome::NotAnImage;
    }

    ValidationOutcome::Valid
}

/// Validation parameters bundled together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Maximum size in bytes (0 = unlimited).
    pub max_size: u64,
    /// Allowed extensions; `"*"` allows all.
    pub allowed_extensions: Vec<String>,
    /// Require image content.
    pub only_images: bool,
}

impl ValidationRules {
    pub fn check(&self, file: &FileRecord) -> ValidationOutcome {
        validate(
            file,
            self.max_size,
            &self.allowed_extensions,
            self.only_images,
        )
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_size: 0,
            allowed_extensions: vec![WILDCARD_EXTENSION.to_string()],
            only_images: false,
        }
    }
}

impl From<&UploadConfig> for ValidationRules {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_size: config.max_size,
            allowed_extensions: config.allowed_extensions.clone(),
            only_images: config.only_images,
        }
    }
}

/// True if the header of `path` decodes to image dimensions.
fn is_image(path: &Path) -> bool {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .is_some()
}
