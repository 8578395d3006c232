//! Destination name generation for uploaded files.
//!
//! A generator only proposes a path that is free at the moment it checks.
//! Nothing reserves the name, so another process writing into the same
//! directory between [`FilenameGenerator::generate`] and the actual write can
//! still take it (time-of-check/time-of-use).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::record::FileRecord;
use crate::{FileUploadError, Result};

/// Number of hex characters in a random file name.
pub const NAME_LENGTH: usize = 12;

/// Number of random bytes digested per candidate name.
const RANDOM_BYTES: usize = 20;

/// Upper bound on candidates tried before giving up.
pub const MAX_ATTEMPTS: usize = 1000;

/// Strategy producing a destination path for a file.
pub trait FilenameGenerator: Send + Sync {
    /// Return a path inside `upload_directory` that does not exist yet.
    fn generate(&self, file: &FileRecord, upload_directory: &Path) -> Result<PathBuf>;
}

/// Random hex names, e.g. `uploads/3f9a0c1be27d.png`.
///
/// The stem is the tail of a SHA-256 digest of 20 random bytes. Names made
/// from an MD5 digest have the same shape, so both kinds can share a
/// directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFilenameGenerator;

impl RandomFilenameGenerator {
    pub fn new() -> Self {
        Self
    }

    fn candidate(file: &FileRecord, upload_directory: &Path) -> PathBuf {
        let bytes: [u8; RANDOM_BYTES] = rand::random();
        let digest = hex::encode(Sha256::digest(bytes));
        let stem = &digest[digest.len() - NAME_LENGTH..];

        upload_directory.join(format!("{stem}{}", extension_suffix(file)))
    }
}

impl FilenameGenerator for RandomFilenameGenerator {
    fn generate(&self, file: &FileRecord, upload_directory: &Path) -> Result<PathBuf> {
        for attempt in 1..=MAX_ATTEMPTS {
            let path = Self::candidate(file, upload_directory);
            if !path.exists() {
                return Ok(path);
            }
            debug!("Name collision on attempt {}: {:?}", attempt, path);
        }

        Err(FileUploadError::NameSpaceExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// Counter-based names: `{prefix}-1.ext`, `{prefix}-2.ext`, ...
///
/// Picks the first counter value whose path is free.
#[derive(Debug, Clone)]
pub struct SequentialFilenameGenerator {
    prefix: String,
}

impl SequentialFilenameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for SequentialFilenameGenerator {
    fn default() -> Self {
        Self::new("file")
    }
}

impl FilenameGenerator for SequentialFilenameGenerator {
    fn generate(&self, file: &FileRecord, upload_directory: &Path) -> Result<PathBuf> {
        let suffix = extension_suffix(file);

        (1..=MAX_ATTEMPTS)
            .map(|n| upload_directory.join(format!("{}-{n}{suffix}", self.prefix)))
            .find(|path| !path.exists())
            .ok_or(FileUploadError::NameSpaceExhausted {
                attempts: MAX_ATTEMPTS,
            })
    }
}

/// `.ext` when the record has a non-empty extension distinct from its name.
fn extension_suffix(file: &FileRecord) -> String {
    match file.extension() {
        Some(ext) if !ext.is_empty() && file.name() != Some(ext) => format!(".{ext}"),
        _ => String::new(),
    }
}
