//! File search over the metadata store or a directory tree.
//!
//! Directory searches run against a live filesystem. A file listed by the
//! walk may be gone or replaced by the time it is inspected; such files are
//! skipped with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::record::FileRecord;
use super::DEFAULT_MAX_READ_SIZE;
use crate::config::SearchConfig;
use crate::store::{columns, MetadataStore, StoreValue, FILES_TABLE};
use crate::{FileUploadError, Result};

/// Where a search looks for candidates.
#[derive(Debug, Clone, Copy)]
pub enum SearchScope<'p> {
    /// Rows of the files table.
    Store,
    /// Every file below a directory.
    Directory(&'p Path),
}

/// Field matched by [`FileSearch::search_by_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Id,
    Name,
    Size,
    Type,
    Extension,
    Path,
}

impl SearchField {
    /// Column holding this field in the files table.
    pub fn column(self) -> &'static str {
        match self {
            SearchField::Id => columns::ID,
            SearchField::Name => columns::NAME,
            SearchField::Size => columns::SIZE,
            SearchField::Type => columns::TYPE,
            SearchField::Extension => columns::EXT,
            SearchField::Path => columns::PATH,
        }
    }

    /// Check whether `file` carries `value` in this field.
    fn matches(self, file: &FileRecord, value: &StoreValue) -> bool {
        match self {
            SearchField::Id => file.id().is_some_and(|id| value.as_integer() == Some(id)),
            SearchField::Name => file.name().is_some_and(|n| value.as_text() == Some(n)),
            SearchField::Size => {
                i64::try_from(file.size()).is_ok_and(|size| value.as_integer() == Some(size))
            }
            SearchField::Type => file.mime_type().is_some_and(|t| value.as_text() == Some(t)),
            SearchField::Extension => {
                file.extension().is_some_and(|e| value.as_text() == Some(e))
            }
            SearchField::Path => file
                .stored_path()
                .is_some_and(|p| value.as_text().is_some_and(|v| Path::new(v) == p)),
        }
    }
}

/// Searches for files by content hash, field value or content substring.
pub struct FileSearch<'a> {
    store: Option<&'a dyn MetadataStore>,
    max_read_size: u64,
}

impl<'a> FileSearch<'a> {
    /// Create a search that can only scan directories.
    pub fn new() -> Self {
        Self {
            store: None,
            max_read_size: DEFAULT_MAX_READ_SIZE as u64,
        }
    }

    /// Create a search backed by a metadata store.
    pub fn with_store(store: &'a dyn MetadataStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    /// Apply the `[search]` section of the configuration.
    pub fn with_config(self, config: &SearchConfig) -> Self {
        self.with_max_read_size(config.max_read_size)
    }

    /// Set how many bytes of each file content search reads.
    pub fn with_max_read_size(mut self, max_read_size: usize) -> Self {
        self.max_read_size = max_read_size as u64;
        self
    }

    /// Find files equal to `reference` by size, MIME type and content hash.
    pub async fn search_by_file(
        &self,
        reference: &FileRecord,
        scope: SearchScope<'_>,
    ) -> Result<Vec<FileRecord>> {
        let candidates = match scope {
            SearchScope::Store => {
                let Some(hash) = reference.content_hash()? else {
                    return Ok(Vec::new());
                };
                let query = format!(
                    "SELECT * FROM {FILES_TABLE} WHERE {} = ? ORDER BY {}",
                    columns::HASH,
                    columns::ID
                );
                self.store_records(&query, &[StoreValue::Text(hash)]).await?
            }
            SearchScope::Directory(directory) => directory_records(directory)?,
        };

        Ok(candidates
            .into_iter()
            .filter(|candidate| reference.compare(candidate))
            .collect())
    }

    /// Find files whose `field` equals `value`.
    ///
    /// Store searches compare in SQL; directory searches recompute the field
    /// for every file. Files on disk carry no id, so [`SearchField::Id`]
    /// never matches in a directory.
    pub async fn search_by_field(
        &self,
        field: SearchField,
        value: impl Into<StoreValue>,
        scope: SearchScope<'_>,
    ) -> Result<Vec<FileRecord>> {
        let value = value.into();

        match scope {
            SearchScope::Store => {
                let query = format!(
                    "SELECT * FROM {FILES_TABLE} WHERE {} = ? ORDER BY {}",
                    field.column(),
                    columns::ID
                );
                self.store_records(&query, &[value]).await
            }
            SearchScope::Directory(directory) => Ok(directory_records(directory)?
                .into_iter()
                .filter(|file| field.matches(file, &value))
                .collect()),
        }
    }

    /// Find files containing `needle` within their first `max_read_size` bytes.
    ///
    /// Content past the read cap is not scanned, so a match there is missed.
    pub async fn search_by_content(
        &self,
        needle: impl AsRef<[u8]>,
        scope: SearchScope<'_>,
    ) -> Result<Vec<FileRecord>> {
        let needle = needle.as_ref();

        let candidates = match scope {
            SearchScope::Store => {
                let query = format!(
                    "SELECT {} FROM {FILES_TABLE} ORDER BY {}",
                    columns::PATH,
                    columns::ID
                );
                let rows = self.store()?.select_many(&query, &[]).await?;
                rows.iter()
                    .filter_map(|row| row.get(columns::PATH).and_then(StoreValue::as_text))
                    .filter_map(|path| inspect(Path::new(path)))
                    .collect::<Vec<_>>()
            }
            SearchScope::Directory(directory) => directory_records(directory)?,
        };

        let mut matches = Vec::new();
        for file in candidates {
            let content = match file.read_bytes(Some(self.max_read_size)) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable file {:?}: {}", file.stored_path(), e);
                    continue;
                }
            };
            if contains(&content, needle) {
                matches.push(file);
            }
        }

        Ok(matches)
    }

    fn store(&self) -> Result<&'a dyn MetadataStore> {
        self.store
            .ok_or_else(|| FileUploadError::Store("no metadata store configured".to_string()))
    }

    async fn store_records(&self, query: &str, params: &[StoreValue]) -> Result<Vec<FileRecord>> {
        let rows = self.store()?.select_many(query, params).await?;
        debug!("Store search returned {} rows", rows.len());
        Ok(rows.iter().map(FileRecord::from_store_row).collect())
    }
}

impl Default for FileSearch<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// List every regular file below `directory`, depth first.
///
/// Entries of each directory are visited in file name order; directories
/// themselves are not returned. Symlinks to files are listed, symlinks to
/// directories are not followed.
pub fn list_files_recursively(directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(directory.as_ref(), &mut files)?;
    Ok(files)
}

fn walk(directory: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(directory)?
        .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in entries {
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            debug!("Not following directory symlink {:?}", path);
        } else {
            files.push(path);
        }
    }

    Ok(())
}

fn directory_records(directory: &Path) -> Result<Vec<FileRecord>> {
    Ok(list_files_recursively(directory)?
        .iter()
        .filter_map(|path| inspect(path))
        .collect())
}

fn inspect(path: &Path) -> Option<FileRecord> {
    match FileRecord::from_path(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("Skipping {:?}: {}", path, e);
            None
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
