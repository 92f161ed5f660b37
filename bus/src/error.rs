//! Error types for the bus crate.

use common::UploadId;
use thiserror::Error;

/// Result type alias using BusError
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors returned by the upload tracking API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The upload is already being tracked
    #[error("upload already exists; id '{0}'")]
    UploadAlreadyExists(UploadId),

    /// The upload was never tracked, or has been finished or pruned
    #[error("unknown upload; id '{0}'")]
    UnknownUpload(UploadId),
}
