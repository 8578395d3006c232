//! File value object.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::store::{columns, StoreRow, StoreValue};
use crate::{FileUploadError, Result};

/// Number of leading bytes inspected when sniffing a MIME type.
const SNIFF_LEN: u64 = 8 * 1024;

/// MIME type reported for zero-length files.
const EMPTY_MIME_TYPE: &str = "inode/x-empty";

/// MIME type reported when nothing more specific is known.
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Description of one file: identity, metadata and, once written, its location.
///
/// A record does not own the file it describes. Renaming, moving or deleting
/// the file on disk leaves the record pointing at the old location; callers
/// re-derive a record with [`FileRecord::from_path`] when they need a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileRecord {
    id: Option<i64>,
    name: Option<String>,
    size: u64,
    temp_source: Option<PathBuf>,
    mime_type: Option<String>,
    extension: Option<String>,
    stored_path: Option<PathBuf>,
}

impl FileRecord {
    /// Create a record from raw upload metadata.
    ///
    /// Nothing on disk is touched.
    pub fn from_upload_entry(
        name: impl Into<String>,
        size: u64,
        temp_source: Option<PathBuf>,
        mime_type: Option<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: None,
            extension: extension_of(&name),
            name: Some(name),
            size,
            temp_source,
            mime_type,
            stored_path: None,
        }
    }

    /// Create a record by inspecting an existing file.
    ///
    /// Returns `NotFound` if `path` does not exist or is not a regular file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FileUploadError::NotFound(format!("File: {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(FileUploadError::NotFound(format!("File: {}", path.display())));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = sniff_mime_type(path, metadata.len())?;

        Ok(Self {
            id: None,
            extension: extension_of(&name),
            name: Some(name),
            size: metadata.len(),
            temp_source: None,
            mime_type: Some(mime_type),
            stored_path: Some(path.to_path_buf()),
        })
    }

    /// Create a record from a row of the files table.
    ///
    /// The file itself is not inspected.
    pub fn from_store_row(row: &StoreRow) -> Self {
        let text = |column: &str| {
            row.get(column)
                .and_then(StoreValue::as_text)
                .map(str::to_string)
        };

        let name = text(columns::NAME);
        let size = row
            .get(columns::SIZE)
            .and_then(StoreValue::as_integer)
            .and_then(|s| u64::try_from(s).ok())
            .unwrap_or(0);

        Self {
            id: row.get(columns::ID).and_then(StoreValue::as_integer),
            extension: name.as_deref().and_then(extension_of),
            name,
            size,
            temp_source: None,
            mime_type: text(columns::TYPE),
            stored_path: text(columns::PATH).map(PathBuf::from),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Attach the identifier returned by the metadata store.
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Transient upload source; cleared once the file is moved.
    pub fn temp_source(&self) -> Option<&Path> {
        self.temp_source.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Lower-cased suffix after the last dot of the name.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Where the file lives after it was stored.
    pub fn stored_path(&self) -> Option<&Path> {
        self.stored_path.as_deref()
    }

    /// Name without its `.extension` suffix.
    pub fn base_name(&self) -> Option<&str> {
        let name = self.name.as_deref()?;
        Some(name.rsplit_once('.').map_or(name, |(stem, _)| stem))
    }

    /// Path the bytes can currently be read from: the upload source while the
    /// file is in flight, the stored path afterwards.
    pub fn source_path(&self) -> Option<&Path> {
        self.temp_source.as_deref().or(self.stored_path.as_deref())
    }

    /// Record that the bytes now live at `path`.
    ///
    /// The name follows the new file name and the upload source is dropped.
    pub(crate) fn mark_stored(&mut self, path: PathBuf) {
        if let Some(file_name) = path.file_name() {
            let name = file_name.to_string_lossy().into_owned();
            self.extension = extension_of(&name);
            self.name = Some(name);
        }
        self.stored_path = Some(path);
        self.temp_source = None;
    }

    /// Hex SHA-256 digest of the stored file.
    ///
    /// `Ok(None)` when the record has no stored path.
    pub fn content_hash(&self) -> Result<Option<String>> {
        let Some(path) = self.stored_path.as_deref() else {
            return Ok(None);
        };

        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;

        Ok(Some(hex::encode(hasher.finalize())))
    }

    /// Compare size, MIME type and content hash.
    ///
    /// A file that cannot be read never compares equal.
    pub fn compare(&self, other: &FileRecord) -> bool {
        if self.size != other.size || self.mime_type != other.mime_type {
            return false;
        }

        match (self.content_hash(), other.content_hash()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// [`compare`](Self::compare) plus equal name and extension.
    pub fn compare_strict(&self, other: &FileRecord) -> bool {
        self.compare(other) && self.name == other.name && self.extension == other.extension
    }

    /// Rename the stored file within its directory.
    ///
    /// Without `new_ext` the current extension is kept if the file name has
    /// one. Fails if the destination already exists. Returns the new path;
    /// the record is not updated.
    pub fn rename(&self, new_name: &str, new_ext: Option<&str>) -> Result<PathBuf> {
        let current = self.current_path()?;
        let file_name = target_file_name(current, Some(new_name), new_ext);
        let destination = match current.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        };

        ensure_vacant(&destination)?;
        fs::rename(current, &destination)?;
        debug!("Renamed {:?} to {:?}", current, destination);

        Ok(destination)
    }

    /// Move the stored file into `directory`.
    ///
    /// `new_name` defaults to the current name without its extension, and the
    /// extension follows the same rule as [`rename`](Self::rename). Returns
    /// the new path; the record is not updated.
    pub fn move_to(
        &self,
        directory: impl AsRef<Path>,
        new_name: Option<&str>,
        new_ext: Option<&str>,
    ) -> Result<PathBuf> {
        let current = self.current_path()?;
        let destination = directory
            .as_ref()
            .join(target_file_name(current, new_name, new_ext));

        ensure_vacant(&destination)?;
        move_file(current, &destination)?;
        debug!("Moved {:?} to {:?}", current, destination);

        Ok(destination)
    }

    /// Copy the stored file into `directory`, leaving the original untouched.
    ///
    /// Naming follows [`move_to`](Self::move_to). Returns the path of the copy.
    pub fn copy_to(
        &self,
        directory: impl AsRef<Path>,
        new_name: Option<&str>,
        new_ext: Option<&str>,
    ) -> Result<PathBuf> {
        let current = self.current_path()?;
        let destination = directory
            .as_ref()
            .join(target_file_name(current, new_name, new_ext));

        ensure_vacant(&destination)?;
        fs::copy(current, &destination)?;
        debug!("Copied {:?} to {:?}", current, destination);

        Ok(destination)
    }

    /// Delete the stored file.
    pub fn delete(&self) -> Result<()> {
        let current = self.current_path()?;
        fs::remove_file(current)?;
        debug!("Deleted {:?}", current);
        Ok(())
    }

    /// Read the stored file, at most `max_len` bytes when given.
    pub fn read_bytes(&self, max_len: Option<u64>) -> Result<Vec<u8>> {
        let file = File::open(self.current_path()?)?;
        let mut buf = Vec::new();

        match max_len {
            Some(limit) => file.take(limit).read_to_end(&mut buf)?,
            None => (&file).read_to_end(&mut buf)?,
        };

        Ok(buf)
    }

    /// Replace the stored file's content. Returns the number of bytes written.
    pub fn write_bytes(&self, data: &[u8]) -> Result<usize> {
        fs::write(self.current_path()?, data)?;
        Ok(data.len())
    }

    fn current_path(&self) -> io::Result<&Path> {
        self.stored_path.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "file record has no stored path")
        })
    }
}

/// Lower-cased suffix after the last dot, if the name has a dot.
pub(crate) fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// File name for a rename/move/copy of `current`.
fn target_file_name(current: &Path, new_name: Option<&str>, new_ext: Option<&str>) -> String {
    let old_name = current
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (old_stem, old_ext) = match old_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (old_name.clone(), None),
    };

    let name = new_name.map_or(old_stem, str::to_string);
    let ext = new_ext.map(str::to_string).or(old_ext).unwrap_or_default();

    if ext.is_empty() {
        name
    } else {
        format!("{name}.{ext}")
    }
}

fn ensure_vacant(destination: &Path) -> io::Result<()> {
    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }
    Ok(())
}

/// Move a file, falling back to copy + remove when a plain rename fails
/// (for example across filesystems).
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            debug!("rename {:?} -> {:?} failed ({}), copying instead", from, to, e);
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                warn!("Copied {:?} but could not remove the source: {}", from, e);
            }
            Ok(())
        }
    }
}

/// Determine a MIME type from the file's leading bytes.
///
/// Magic signatures win, then UTF-8 text, then the extension.
fn sniff_mime_type(path: &Path, len: u64) -> io::Result<String> {
    if len == 0 {
        return Ok(EMPTY_MIME_TYPE.to_string());
    }

    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut header)?;

    if let Some(kind) = infer::get(&header) {
        return Ok(kind.mime_type().to_string());
    }
    if looks_like_text(&header) {
        return Ok("text/plain".to_string());
    }

    Ok(mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string()))
}

fn looks_like_text(header: &[u8]) -> bool {
    if header.contains(&0) {
        return false;
    }
    match std::str::from_utf8(header) {
        Ok(_) => true,
        // Cut in the middle of a multi-byte character at the end of the sample
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extension_is_lowercased_last_segment() {
        let file = FileRecord::from_upload_entry("Archive.Tar.GZ", 10, None, None);
        assert_eq!(file.extension(), Some("gz"));

        let file = FileRecord::from_upload_entry("photo.PNG", 10, None, None);
        assert_eq!(file.extension(), Some("png"));
    }

    #[test]
    fn test_extension_absent_without_dot() {
        let file = FileRecord::from_upload_entry("README", 10, None, None);
        assert_eq!(file.extension(), None);

        assert_eq!(FileRecord::default().extension(), None);
    }

    #[test]
    fn test_extension_edge_cases() {
        assert_eq!(extension_of(".hidden"), Some("hidden".to_string()));
        assert_eq!(extension_of("trailing."), Some(String::new()));
        assert_eq!(extension_of("日本語.TXT"), Some("txt".to_string()));
    }

    #[test]
    fn test_base_name() {
        let file = FileRecord::from_upload_entry("report.final.PDF", 1, None, None);
        assert_eq!(file.base_name(), Some("report.final"));

        let file = FileRecord::from_upload_entry("README", 1, None, None);
        assert_eq!(file.base_name(), Some("README"));
    }

    #[test]
    fn test_from_upload_entry_does_not_touch_disk() {
        let file = FileRecord::from_upload_entry(
            "a.txt",
            10,
            Some(PathBuf::from("/nonexistent/tmp/x")),
            Some("text/plain".to_string()),
        );

        assert_eq!(file.id(), None);
        assert_eq!(file.name(), Some("a.txt"));
        assert_eq!(file.size(), 10);
        assert_eq!(file.temp_source(), Some(Path::new("/nonexistent/tmp/x")));
        assert_eq!(file.mime_type(), Some("text/plain"));
        assert_eq!(file.stored_path(), None);
    }

    #[test]
    fn test_from_path() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "notes.TXT", b"hello world");

        let file = FileRecord::from_path(&path).unwrap();

        assert_eq!(file.name(), Some("notes.TXT"));
        assert_eq!(file.extension(), Some("txt"));
        assert_eq!(file.size(), 11);
        assert_eq!(file.mime_type(), Some("text/plain"));
        assert_eq!(file.stored_path(), Some(path.as_path()));
        assert_eq!(file.id(), None);
    }

    #[test]
    fn test_from_path_not_found() {
        let dir = TempDir::new().unwrap();
        let result = FileRecord::from_path(dir.path().join("missing.txt"));
        assert!(matches!(result, Err(FileUploadError::NotFound(_))));
    }

    #[test]
    fn test_from_path_directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let result = FileRecord::from_path(dir.path());
        assert!(matches!(result, Err(FileUploadError::NotFound(_))));
    }

    #[test]
    fn test_mime_sniffing() {
        let dir = TempDir::new().unwrap();

        let png = dir.path().join("image.bin");
        image::RgbImage::new(2, 2)
            .save_with_format(&png, image::ImageFormat::Png)
            .unwrap();
        assert_eq!(
            FileRecord::from_path(&png).unwrap().mime_type(),
            Some("image/png")
        );

        let pdf = write_file(dir.path(), "doc", b"%PDF-1.7\n...");
        assert_eq!(
            FileRecord::from_path(&pdf).unwrap().mime_type(),
            Some("application/pdf")
        );

        let empty = write_file(dir.path(), "empty.txt", b"");
        assert_eq!(
            FileRecord::from_path(&empty).unwrap().mime_type(),
            Some("inode/x-empty")
        );

        let wasm = write_file(dir.path(), "module", b"\0asm\x01\0\0\0");
        assert_eq!(
            FileRecord::from_path(&wasm).unwrap().mime_type(),
            Some("application/wasm")
        );

        let binary = write_file(dir.path(), "blob", &[0u8, 159, 146, 150]);
        assert_eq!(
            FileRecord::from_path(&binary).unwrap().mime_type(),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn test_mime_sniffing_ignores_extension_for_known_formats() {
        let dir = TempDir::new().unwrap();
        let mut zip = b"PK\x03\x04\x14\0\0\0\x08\0".to_vec();
        zip.extend_from_slice(&[0u8; 32]);
        let path = write_file(dir.path(), "archive.dat", &zip);

        assert_eq!(
            FileRecord::from_path(&path).unwrap().mime_type(),
            Some("application/zip")
        );
    }

    #[test]
    fn test_from_store_row() {
        let mut row = StoreRow::new();
        row.insert("ID".to_string(), StoreValue::Integer(7));
        row.insert("NAME".to_string(), StoreValue::Text("a1b2c3.JPG".to_string()));
        row.insert("SIZE".to_string(), StoreValue::Integer(2048));
        row.insert("TYPE".to_string(), StoreValue::Text("image/jpeg".to_string()));
        row.insert(
            "PATH".to_string(),
            StoreValue::Text("uploads/a1b2c3.JPG".to_string()),
        );

        let file = FileRecord::from_store_row(&row);

        assert_eq!(file.id(), Some(7));
        assert_eq!(file.name(), Some("a1b2c3.JPG"));
        assert_eq!(file.extension(), Some("jpg"));
        assert_eq!(file.size(), 2048);
        assert_eq!(file.mime_type(), Some("image/jpeg"));
        assert_eq!(file.stored_path(), Some(Path::new("uploads/a1b2c3.JPG")));
    }

    #[test]
    fn test_content_hash() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.txt", b"abc");

        let file = FileRecord::from_path(&path).unwrap();
        assert_eq!(
            file.content_hash().unwrap().as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_content_hash_without_path() {
        let file = FileRecord::from_upload_entry("a.txt", 3, None, None);
        assert_eq!(file.content_hash().unwrap(), None);
    }

    #[test]
    fn test_content_hash_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.txt", b"abc");
        let file = FileRecord::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(file.content_hash(), Err(FileUploadError::Io(_))));
    }

    #[test]
    fn test_compare_and_compare_strict() {
        let dir = TempDir::new().unwrap();
        let a = FileRecord::from_path(write_file(dir.path(), "a.txt", b"same")).unwrap();
        let b = FileRecord::from_path(write_file(dir.path(), "b.txt", b"same")).unwrap();
        let a_copy = {
            let sub = dir.path().join("sub");
            fs::create_dir(&sub).unwrap();
            FileRecord::from_path(write_file(&sub, "a.txt", b"same")).unwrap()
        };

        // Same content, different name
        assert!(a.compare(&b));
        assert!(!a.compare_strict(&b));

        // Same content and name
        assert!(a.compare(&a_copy));
        assert!(a.compare_strict(&a_copy));
    }

    #[test]
    fn test_compare_different_content() {
        let dir = TempDir::new().unwrap();
        let a = FileRecord::from_path(write_file(dir.path(), "a.txt", b"aaaa")).unwrap();
        let b = FileRecord::from_path(write_file(dir.path(), "b.txt", b"bbbb")).unwrap();

        assert!(!a.compare(&b));
    }

    #[test]
    fn test_compare_unreadable_is_unequal() {
        let dir = TempDir::new().unwrap();
        let a_path = write_file(dir.path(), "a.txt", b"same");
        let a = FileRecord::from_path(&a_path).unwrap();
        let b = FileRecord::from_path(write_file(dir.path(), "b.txt", b"same")).unwrap();
        fs::remove_file(&a_path).unwrap();

        assert!(!a.compare(&b));
        assert!(!b.compare(&a));
    }

    #[test]
    fn test_rename_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "old.txt", b"x")).unwrap();

        let renamed = file.rename("new", None).unwrap();

        assert_eq!(renamed, dir.path().join("new.txt"));
        assert!(renamed.exists());
        assert!(!dir.path().join("old.txt").exists());
        // The record still points at the old location
        assert_eq!(file.stored_path(), Some(dir.path().join("old.txt").as_path()));
    }

    #[test]
    fn test_rename_without_extension() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "Makefile", b"x")).unwrap();

        let renamed = file.rename("GNUmakefile", None).unwrap();
        assert_eq!(renamed, dir.path().join("GNUmakefile"));
    }

    #[test]
    fn test_rename_with_new_extension() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "data.csv", b"x")).unwrap();

        let renamed = file.rename("data", Some("tsv")).unwrap();
        assert_eq!(renamed, dir.path().join("data.tsv"));

        let file = FileRecord::from_path(&renamed).unwrap();
        let renamed = file.rename("data", Some("")).unwrap();
        assert_eq!(renamed, dir.path().join("data"));
    }

    #[test]
    fn test_rename_refuses_existing_destination() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"a")).unwrap();
        write_file(dir.path(), "b.txt", b"b");

        let result = file.rename("b", None);

        assert!(matches!(result, Err(FileUploadError::Io(_))));
        assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"b");
    }

    #[test]
    fn test_operations_without_stored_path() {
        let file = FileRecord::from_upload_entry("a.txt", 1, None, None);

        assert!(matches!(file.rename("b", None), Err(FileUploadError::Io(_))));
        assert!(matches!(file.delete(), Err(FileUploadError::Io(_))));
        assert!(matches!(file.read_bytes(None), Err(FileUploadError::Io(_))));
    }

    #[test]
    fn test_move_to() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"move me")).unwrap();

        let moved = file.move_to(target.path(), None, None).unwrap();

        assert_eq!(moved, target.path().join("a.txt"));
        assert_eq!(fs::read(&moved).unwrap(), b"move me");
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_move_to_with_new_name_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"x")).unwrap();
        let target = dir.path().join("archive");
        fs::create_dir(&target).unwrap();

        let moved = file.move_to(&target, Some("renamed"), None).unwrap();
        assert_eq!(moved, target.join("renamed.txt"));
    }

    #[test]
    fn test_move_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"x")).unwrap();

        let result = file.move_to(dir.path().join("missing"), None, None);
        assert!(matches!(result, Err(FileUploadError::Io(_))));
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_copy_to() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"copy me")).unwrap();

        let copied = file.copy_to(target.path(), Some("b"), Some("md")).unwrap();

        assert_eq!(copied, target.path().join("b.md"));
        assert_eq!(fs::read(&copied).unwrap(), b"copy me");
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"copy me");
    }

    #[test]
    fn test_move_without_extension() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let source = write_file(dir.path(), "Makefile", b"all:");
        let file = FileRecord::from_path(&source).unwrap();

        let moved = file.move_to(target.path(), None, None).unwrap();
        assert_eq!(moved, target.path().join("Makefile"));
        assert!(!source.exists());

        let renamed = FileRecord::from_path(&moved)
            .unwrap()
            .move_to(target.path(), Some("build"), None)
            .unwrap();
        assert_eq!(renamed, target.path().join("build"));
    }

    #[test]
    fn test_copy_without_extension() {
        let dir = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "LICENSE", b"MIT")).unwrap();

        let copied = file.copy_to(target.path(), None, None).unwrap();
        assert_eq!(copied, target.path().join("LICENSE"));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.txt", b"x");
        let file = FileRecord::from_path(&path).unwrap();

        file.delete().unwrap();
        assert!(!path.exists());

        // Deleting again fails
        assert!(matches!(file.delete(), Err(FileUploadError::Io(_))));
    }

    #[test]
    fn test_read_and_write_bytes() {
        let dir = TempDir::new().unwrap();
        let file = FileRecord::from_path(write_file(dir.path(), "a.txt", b"0123456789")).unwrap();

        assert_eq!(file.read_bytes(None).unwrap(), b"0123456789");
        assert_eq!(file.read_bytes(Some(4)).unwrap(), b"0123");
        assert_eq!(file.read_bytes(Some(100)).unwrap(), b"0123456789");

        assert_eq!(file.write_bytes(b"replaced").unwrap(), 8);
        assert_eq!(file.read_bytes(None).unwrap(), b"replaced");
    }

    #[test]
    fn test_mark_stored() {
        let mut file = FileRecord::from_upload_entry(
            "photo.PNG",
            10,
            Some(PathBuf::from("/tmp/php123")),
            None,
        );

        file.mark_stored(PathBuf::from("uploads/0a1b2c3d4e5f.png"));

        assert_eq!(file.name(), Some("0a1b2c3d4e5f.png"));
        assert_eq!(file.extension(), Some("png"));
        assert_eq!(file.temp_source(), None);
        assert_eq!(file.source_path(), Some(Path::new("uploads/0a1b2c3d4e5f.png")));
    }

    #[test]
    fn test_serialize() {
        let file = FileRecord::from_upload_entry("a.txt", 3, None, Some("text/plain".to_string()));
        let json = serde_json::to_value(&file).unwrap();

        assert_eq!(json["name"], "a.txt");
        assert_eq!(json["extension"], "txt");
        assert_eq!(json["size"], 3);
        assert!(json["id"].is_null());
    }
}
