//! Raw upload input handed over by the HTTP layer.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::file::FileRecord;

/// One uploaded file as received from the request parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    /// Client-supplied file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Temporary location the parser wrote the bytes to.
    pub temp_source: PathBuf,
    /// Client-supplied MIME type.
    pub mime_type: Option<String>,
}

impl UploadEntry {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, size: u64, temp_source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            temp_source: temp_source.into(),
            mime_type: None,
        }
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Build the file record for this entry.
    pub fn into_record(self) -> FileRecord {
        FileRecord::from_upload_entry(self.name, self.size, Some(self.temp_source), self.mime_type)
    }
}

/// Uploaded files keyed by form field name.
#[derive(Debug, Clone, Default)]
pub struct UploadSource {
    fields: HashMap<String, Vec<UploadEntry>>,
}

impl UploadSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to a field.
    pub fn add(&mut self, field: impl Into<String>, entry: UploadEntry) {
        self.fields.entry(field.into()).or_default().push(entry);
    }

    /// Builder-style [`add`](Self::add).
    pub fn with_entry(mut self, field: impl Into<String>, entry: UploadEntry) -> Self {
        self.add(field, entry);
        self
    }

    /// Entries of a field, in submission order.
    pub fn get(&self, field: &str) -> Option<&[UploadEntry]> {
        self.fields.get(field).map(Vec::as_slice)
    }
}
