//! Upload processing for fileupload.
//!
//! Turns raw upload entries into stored files:
//! validate, pick a destination, move the bytes, record metadata.

mod entry;
mod result;
mod uploader;

pub use entry::{UploadEntry, UploadSource};
pub use result::{ErrorKind, UploadFailure, UploadResult, UploadStage};
pub use uploader::FileUploader;
