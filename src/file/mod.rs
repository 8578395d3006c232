//! File handling for fileupload.
//!
//! This module provides:
//! - The `FileRecord` value object and its filesystem operations
//! - Pluggable destination name generation
//! - Size/extension/image validation
//! - Search by hash, field or content over the store or a directory tree

mod generator;
mod record;
mod search;
mod validator;

pub use generator::{
    FilenameGenerator, RandomFilenameGenerator, SequentialFilenameGenerator, MAX_ATTEMPTS,
    NAME_LENGTH,
};
pub use record::FileRecord;
pub use search::{list_files_recursively, FileSearch, SearchField, SearchScope};
pub use validator::{validate, ValidationOutcome, ValidationRules};

pub(crate) use record::move_file;

/// Extension list entry that allows every extension.
pub const WILDCARD_EXTENSION: &str = "*";

/// Default number of bytes read per file by content search (512 KiB).
pub const DEFAULT_MAX_READ_SIZE: usize = 512 * 1024;
