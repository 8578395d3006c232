//! Test helpers for upload integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fileupload::{Database, UploadConfig, UploadEntry};
use tempfile::TempDir;

/// Temporary workspace with an in-memory store.
pub struct Fixture {
    pub dir: TempDir,
    pub db: Database,
}

impl Fixture {
    pub async fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            db: Database::open_in_memory().await.unwrap(),
        }
    }

    /// Directory uploads are moved into.
    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Upload config pointing at this fixture's upload directory.
    pub fn config(&self) -> UploadConfig {
        UploadConfig {
            directory: self.upload_dir(),
            ..UploadConfig::default()
        }
    }

    /// Write `content` to a temp file the way a request parser would.
    pub fn entry(&self, name: &str, content: &[u8]) -> UploadEntry {
        temp_upload(self.dir.path(), name, content)
    }
}

/// Write a temporary upload file and describe it as an upload entry.
pub fn temp_upload(dir: &Path, name: &str, content: &[u8]) -> UploadEntry {
    let tmp_dir = dir.join("tmp");
    fs::create_dir_all(&tmp_dir).unwrap();
    let path = tmp_dir.join(format!("upload-{}", fs::read_dir(&tmp_dir).unwrap().count()));
    fs::write(&path, content).unwrap();
    UploadEntry::new(name, content.len() as u64, path)
}
