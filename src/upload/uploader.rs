//! Upload orchestration.

use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::entry::{UploadEntry, UploadSource};
use super::result::{ErrorKind, UploadFailure, UploadResult, UploadStage};
use crate::config::UploadConfig;
use crate::file::{move_file, validate, FileRecord, FilenameGenerator, RandomFilenameGenerator};
use crate::store::{columns, MetadataStore, StoreValue, FILES_TABLE};
use crate::{FileUploadError, Result};

/// Validates uploads, moves them into the upload directory and records
/// their metadata.
///
/// Entries are handled one at a time in input order. A failing entry does
/// not stop the ones after it.
pub struct FileUploader<'a> {
    config: UploadConfig,
    store: Option<&'a dyn MetadataStore>,
    generator: Box<dyn FilenameGenerator>,
    title: Option<String>,
    user_id: Option<i64>,
}

impl<'a> FileUploader<'a> {
    /// Create an uploader with random destination names and no store.
    ///
    /// `save_to_store` defaults to true, so attach a store with
    /// [`with_store`](Self::with_store) or turn saving off with
    /// [`with_save_to_store`](Self::with_save_to_store). Otherwise every
    /// stored file fails with [`ErrorKind::UploadFailed`] at
    /// [`UploadStage::Moved`].
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            store: None,
            generator: Box::new(RandomFilenameGenerator::new()),
            title: None,
            user_id: None,
        }
    }

    /// Record metadata in `store`.
    pub fn with_store(mut self, store: &'a dyn MetadataStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the destination name strategy.
    pub fn with_generator(mut self, generator: impl FilenameGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum size in bytes (0 = unlimited).
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.config.max_size = max_size;
        self
    }

    pub fn with_only_images(mut self, only_images: bool) -> Self {
        self.config.only_images = only_images;
        self
    }

    pub fn with_upload_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = directory.into();
        self
    }

    pub fn with_save_to_store(mut self, save_to_store: bool) -> Self {
        self.config.save_to_store = save_to_store;
        self
    }

    /// Add a column written with every metadata row.
    pub fn with_extra_field(mut self, name: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.config.extra_fields.insert(name.into(), value.into());
        self
    }

    /// Title stored with every metadata row.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Owner stored with every metadata row.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Process every entry submitted under `field`.
    ///
    /// Returns `NoFileProvided` if the field is missing or empty.
    pub async fn process(&self, source: &UploadSource, field: &str) -> Result<UploadResult> {
        match source.get(field) {
            Some(entries) if !entries.is_empty() => self.process_batch(entries.to_vec()).await,
            _ => Err(FileUploadError::NoFileProvided),
        }
    }

    /// Process a list of entries.
    ///
    /// The result lists stored files and failures in input order.
    pub async fn process_batch(&self, entries: Vec<UploadEntry>) -> Result<UploadResult> {
        if entries.is_empty() {
            return Err(FileUploadError::NoFileProvided);
        }

        let total = entries.len();
        let mut uploaded = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for entry in entries {
            match self.process_entry(entry).await {
                Ok(file) => uploaded.push(file),
                Err(failure) => errors.push(failure),
            }
        }

        info!(
            "Upload batch finished: {} stored, {} failed of {}",
            uploaded.len(),
            errors.len(),
            total
        );
        Ok(UploadResult::from_parts(uploaded, errors))
    }

    /// Process a single optional entry.
    ///
    /// Returns `NoFileProvided` if there is no entry or its name is empty.
    pub async fn process_single(&self, entry: Option<UploadEntry>) -> Result<UploadResult> {
        match entry {
            Some(entry) if !entry.name.is_empty() => self.process_batch(vec![entry]).await,
            _ => Err(FileUploadError::NoFileProvided),
        }
    }

    /// Store a raw request body as a new file.
    ///
    /// The body is written first and validated afterwards, since there is no
    /// client name or size to check up front. A rejected file is deleted.
    /// Body files carry no extension, so an extension allow-list without
    /// `"*"` rejects every body.
    pub async fn process_raw_body(&self, content: &[u8]) -> Result<UploadResult> {
        if content.is_empty() {
            return Err(FileUploadError::NoFileProvided);
        }

        let placeholder = FileRecord::default();
        let destination = match self.write_body(&placeholder, content) {
            Ok(path) => path,
            Err(failure) => return Ok(UploadResult::failure(failure)),
        };

        let mut file = match FileRecord::from_path(&destination) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to inspect written body {:?}: {}", destination, e);
                return Ok(UploadResult::failure(UploadFailure::new(
                    ErrorKind::UploadFailed,
                    placeholder,
                    UploadStage::Moved,
                )));
            }
        };

        if let Some(kind) = self.check(&file) {
            info!("Rejected request body {:?}: {}", destination, kind);
            let stage = match file.delete() {
                Ok(()) => UploadStage::Received,
                Err(e) => {
                    warn!("Could not remove rejected body {:?}: {}", destination, e);
                    UploadStage::Moved
                }
            };
            return Ok(UploadResult::failure(UploadFailure::new(kind, file, stage)));
        }

        if self.config.save_to_store {
            match self.persist_metadata(&file).await {
                Ok(id) => file.set_id(id),
                Err(e) => {
                    warn!("Stored {:?} but recording metadata failed: {}", destination, e);
                    return Ok(UploadResult::failure(UploadFailure::new(
                        ErrorKind::UploadFailed,
                        file,
                        UploadStage::Moved,
                    )));
                }
            }
        }

        info!("Stored request body at {:?}", destination);
        Ok(UploadResult::Success(vec![file]))
    }

    /// Insert one metadata row for a stored file and return its id.
    ///
    /// The row holds the fixed columns plus every configured extra field.
    pub async fn persist_metadata(&self, file: &FileRecord) -> Result<i64> {
        let store = self
            .store
            .ok_or_else(|| FileUploadError::Store("no metadata store configured".to_string()))?;
        let path = file
            .stored_path()
            .ok_or_else(|| FileUploadError::Store("file has not been stored".to_string()))?;
        let size = i64::try_from(file.size())
            .map_err(|_| FileUploadError::Store(format!("size {} out of range", file.size())))?;
        let hash = file
            .content_hash()
            .map_err(|e| FileUploadError::Store(format!("hashing {}: {e}", path.display())))?;

        let mut names: Vec<String> = [
            columns::NAME,
            columns::BASE_NAME,
            columns::EXT,
            columns::SIZE,
            columns::HASH,
            columns::PATH,
            columns::TYPE,
            columns::TITLE,
            columns::USER_ID,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        let mut values = vec![
            StoreValue::from(file.name()),
            StoreValue::from(file.base_name()),
            StoreValue::from(file.extension()),
            StoreValue::from(size),
            StoreValue::from(hash),
            StoreValue::from(path.to_string_lossy().into_owned()),
            StoreValue::from(file.mime_type()),
            StoreValue::from(self.title.clone()),
            StoreValue::from(self.user_id),
        ];
        for (name, value) in &self.config.extra_fields {
            names.push(name.clone());
            values.push(value.clone());
        }

        let id = store
            .insert(FILES_TABLE, &names, &values)
            .await
            .map_err(|e| match e {
                FileUploadError::Store(_) => e,
                other => FileUploadError::Store(other.to_string()),
            })?;

        debug!("Recorded metadata row {} for {:?}", id, path);
        Ok(id)
    }

    async fn process_entry(&self, entry: UploadEntry) -> std::result::Result<FileRecord, UploadFailure> {
        let mut file = entry.into_record();

        if let Some(kind) = self.check(&file) {
            info!("Rejected upload {:?}: {}", file.name().unwrap_or_default(), kind);
            return Err(UploadFailure::new(kind, file, UploadStage::Received));
        }

        if let Err(e) = self.move_into_place(&mut file) {
            warn!("Failed to store upload {:?}: {}", file.name().unwrap_or_default(), e);
            return Err(UploadFailure::new(
                ErrorKind::UploadFailed,
                file,
                UploadStage::Validated,
            ));
        }

        if self.config.save_to_store {
            match self.persist_metadata(&file).await {
                Ok(id) => file.set_id(id),
                Err(e) => {
                    warn!(
                        "Stored {:?} but recording metadata failed: {}",
                        file.stored_path(),
                        e
                    );
                    return Err(UploadFailure::new(
                        ErrorKind::UploadFailed,
                        file,
                        UploadStage::Moved,
                    ));
                }
            }
        }

        debug!("Stored upload at {:?}", file.stored_path());
        Ok(file)
    }

    fn check(&self, file: &FileRecord) -> Option<ErrorKind> {
        validate(
            file,
            self.config.max_size,
            &self.config.allowed_extensions,
            self.config.only_images,
        )
        .error_kind()
    }

    fn move_into_place(&self, file: &mut FileRecord) -> Result<()> {
        let source = file
            .temp_source()
            .ok_or_else(|| FileUploadError::NotFound("Upload source".to_string()))?
            .to_path_buf();

        fs::create_dir_all(&self.config.directory)?;
        let destination = self.generator.generate(file, &self.config.directory)?;
        move_file(&source, &destination)?;
        file.mark_stored(destination);

        Ok(())
    }

    /// Write `body` to a fresh file in the upload directory.
    ///
    /// A partially written file is removed. If that removal fails too, the
    /// failure is reported at [`UploadStage::Moved`] with the leftover path.
    fn write_body(
        &self,
        placeholder: &FileRecord,
        mut body: impl Read,
    ) -> std::result::Result<PathBuf, UploadFailure> {
        let received = |e: FileUploadError| {
            warn!("Failed to write request body: {}", e);
            UploadFailure::new(
                ErrorKind::UploadFailed,
                placeholder.clone(),
                UploadStage::Received,
            )
        };

        fs::create_dir_all(&self.config.directory).map_err(|e| received(e.into()))?;
        let destination = self
            .generator
            .generate(placeholder, &self.config.directory)
            .map_err(received)?;
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .map_err(|e| received(e.into()))?;

        let Err(e) = io::copy(&mut body, &mut out) else {
            return Ok(destination);
        };
        drop(out);

        match fs::remove_file(&destination) {
            Ok(()) => Err(received(e.into())),
            Err(remove_err) => {
                warn!(
                    "Failed to write request body to {:?} ({}) and could not remove it: {}",
                    destination, e, remove_err
                );
                let mut orphan = placeholder.clone();
                orphan.mark_stored(destination);
                Err(UploadFailure::new(
                    ErrorKind::UploadFailed,
                    orphan,
                    UploadStage::Moved,
                ))
            }
        }
    }
}
