//! Export packaging.
//!
//! Bundles decoded overlay slices into one ZIP archive for a local save
//! action. With a passphrase in force, entries are protected with AES-256
//! (WinZip AE-2; the entry keys are derived from the passphrase with that
//! scheme's PBKDF2-HMAC-SHA1 derivation) and any packaging error aborts the
//! job with no plaintext fallback.

pub mod data_uri;

use crate::error::ExportError;
use crate::model::{ExportFormat, ResultArtifact};
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

/// A finished archive ready for a local save action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One export job over a snapshot of the current results.
///
/// The snapshot is taken at construction, so a new upload replacing the
/// session results does not affect a job already in flight.
#[derive(Debug, Clone)]
pub struct ExportJob {
    format: ExportFormat,
    passphrase: Option<String>,
    source: Arc<[ResultArtifact]>,
}

impl ExportJob {
    /// An empty passphrase means no protection.
    pub fn new(
        source: Arc<[ResultArtifact]>,
        format: ExportFormat,
        passphrase: Option<String>,
    ) -> Self {
        Self {
            format,
            passphrase: passphrase.filter(|p| !p.is_empty()),
            source,
        }
    }

    /// Decode every slice and assemble the archive. All-or-nothing: a single
    /// undecodable slice fails the job before any archive bytes exist.
    pub fn run(&self) -> Result<ExportBundle, ExportError> {
        if self.source.is_empty() {
            return Err(ExportError::EmptyResultSet);
        }

        let mut entries = Vec::with_capacity(self.source.len());
        for artifact in self.source.iter() {
            let data = data_uri::decode(&artifact.data_uri).map_err(|reason| {
                ExportError::Decode {
                    index: artifact.index,
                    reason,
                }
            })?;
            entries.push((entry_name(artifact.index, self.format), data));
        }

        let bytes = self.pack(&entries).map_err(|err| self.classify(err))?;
        tracing::debug!(
            entries = entries.len(),
            protected = self.passphrase.is_some(),
            bytes = bytes.len(),
            "archive assembled"
        );
        Ok(ExportBundle {
            file_name: self.format.archive_file_name(),
            bytes,
        })
    }

    fn pack(&self, entries: &[(String, Vec<u8>)]) -> zip::result::ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(name.as_str(), self.entry_options())?;
            writer.write_all(data)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    fn entry_options(&self) -> FileOptions<'_, ()> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        match self.passphrase.as_deref() {
            Some(passphrase) => options.with_aes_encryption(AesMode::Aes256, passphrase),
            None => options,
        }
    }

    /// Fail closed: with a passphrase in force every packaging error means
    /// the protection could not be applied.
    fn classify(&self, err: zip::result::ZipError) -> ExportError {
        if self.passphrase.is_some() {
            ExportError::Encryption(err.to_string())
        } else {
            ExportError::Archive(err.to_string())
        }
    }
}

/// Entry names are 1-based to match human-facing slice numbering, while the
/// artifact index stays 0-based.
fn entry_name(index: usize, format: ExportFormat) -> String {
    format!("image_{}.{}", index + 1, format.extension())
}
