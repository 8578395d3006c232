//! fileupload - server-side upload handling
//!
//! Validates uploaded files, moves them into an upload directory under
//! collision-free names, records their metadata in a store and finds
//! files again by content hash, metadata field or raw bytes.

pub mod config;
#[cfg(feature = "sqlite")]
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod store;
pub mod upload;

pub use config::{Config, DatabaseConfig, LoggingConfig, SearchConfig, UploadConfig};
#[cfg(feature = "sqlite")]
pub use db::Database;
pub use error::{FileUploadError, Result};
pub use file::{
    list_files_recursively, validate, FileRecord, FileSearch, FilenameGenerator,
    RandomFilenameGenerator, SearchField, SearchScope, SequentialFilenameGenerator,
    ValidationOutcome, ValidationRules,
};
pub use store::{MetadataStore, StoreRow, StoreValue, FILES_TABLE};
pub use upload::{
    ErrorKind, FileUploader, UploadEntry, UploadFailure, UploadResult, UploadSource, UploadStage,
};
