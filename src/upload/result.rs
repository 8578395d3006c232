//! Upload outcome types.

use std::fmt;

use serde::Serialize;

use crate::file::FileRecord;

/// Why a single upload entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Larger than the configured maximum size.
    #[serde(rename = "max-file-size")]
    TooLarge,
    /// Extension not in the allowed list.
    #[serde(rename = "invalid-extension")]
    DisallowedExtension,
    /// Content does not decode as an image.
    #[serde(rename = "not-image")]
    NotAnImage,
    /// Moving, writing or persisting the file failed.
    #[serde(rename = "failed-to-upload")]
    UploadFailed,
}

impl ErrorKind {
    /// Stable string code for this error kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TooLarge => "max-file-size",
            ErrorKind::DisallowedExtension => "invalid-extension",
            ErrorKind::NotAnImage => "not-image",
            ErrorKind::UploadFailed => "failed-to-upload",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last stage an entry reached before it failed.
///
/// ```text
/// Received -> Validated -> Moved -> Persisted
///     \-> Rejected            \-> PersistFailed
/// ```
///
/// A failure at [`UploadStage::Moved`] leaves the bytes on disk without a
/// metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Received,
    Validated,
    Moved,
}

/// A failed entry together with the record built for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadFailure {
    pub kind: ErrorKind,
    pub file: FileRecord,
    pub stage: UploadStage,
}

impl UploadFailure {
    pub fn new(kind: ErrorKind, file: FileRecord, stage: UploadStage) -> Self {
        Self { kind, file, stage }
    }

    /// True if the file was written but is not tracked by the store.
    pub fn is_orphan(&self) -> bool {
        self.stage == UploadStage::Moved
    }
}

/// Aggregate result of an upload request.
///
/// Both lists keep the order of the input entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadResult {
    /// Every entry was stored.
    Success(Vec<FileRecord>),
    /// At least one entry failed. `uploaded` holds the entries that made it.
    PartialOrTotalFailure {
        uploaded: Vec<FileRecord>,
        errors: Vec<UploadFailure>,
    },
}

impl UploadResult {
    pub(crate) fn from_parts(uploaded: Vec<FileRecord>, errors: Vec<UploadFailure>) -> Self {
        if errors.is_empty() {
            UploadResult::Success(uploaded)
        } else {
            UploadResult::PartialOrTotalFailure { uploaded, errors }
        }
    }

    pub(crate) fn failure(failure: UploadFailure) -> Self {
        UploadResult::PartialOrTotalFailure {
            uploaded: Vec::new(),
            errors: vec![failure],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success(_))
    }

    /// Records that were stored.
    pub fn uploaded(&self) -> &[FileRecord] {
        match self {
            UploadResult::Success(files) => files,
            UploadResult::PartialOrTotalFailure { uploaded, .. } => uploaded,
        }
    }

    /// Entries that failed.
    pub fn errors(&self) -> &[UploadFailure] {
        match self {
            UploadResult::Success(_) => &[],
            UploadResult::PartialOrTotalFailure { errors, .. } => errors,
        }
    }
}
