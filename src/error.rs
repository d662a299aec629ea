use thiserror::Error;

/// Terminal failures of a batch submission.
///
/// Variants carry rendered messages rather than source errors so a failure
/// can be cloned into the published [`UploadStatus`](crate::model::UploadStatus)
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Network unreachable, request aborted, or the deadline expired.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
    /// Success status, but the payload did not carry a usable overlay collection.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Transport(format!("request timed out: {err}"))
        } else {
            UploadError::Transport(err.to_string())
        }
    }
}

/// Terminal failures of the export packager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    EmptyResultSet,
    /// One slice could not be decoded; the whole job fails, no partial archive.
    #[error("could not decode slice {index}: {reason}")]
    Decode { index: usize, reason: String },
    /// A passphrase was supplied but protection could not be applied.
    #[error("could not protect archive: {0}")]
    Encryption(String),
    /// Structural archive failure with no passphrase in force.
    #[error("could not assemble archive: {0}")]
    Archive(String),
}
