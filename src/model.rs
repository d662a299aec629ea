use crate::error::UploadError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub base_url: String,
    /// Sent as the `x-api-key` header when present. Deployment detail, not core logic.
    pub api_key: Option<String>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub health_timeout: Duration,
    pub user_agent: String,
}

/// One local file queued for submission.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// The set of files selected for one submission.
///
/// Immutable once built; consumed exactly once by the orchestrator and never
/// retried automatically.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: Vec<BatchFile>,
}

impl UploadBatch {
    pub fn new(files: Vec<BatchFile>) -> Self {
        Self { files }
    }

    /// Read the given paths into an in-memory batch, preserving order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let bytes = Bytes::from(std::fs::read(path)?);
            files.push(BatchFile { file_name, bytes });
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[BatchFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Payload bytes across the batch; the denominator for progress reporting.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes.len() as u64).sum()
    }
}

/// Lifecycle of one batch submission as observed by UI layers.
///
/// `percent` is monotonically non-decreasing within a submission and resets
/// to 0 when the next one begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    InProgress { percent: u8 },
    Success,
    Failure { reason: UploadError },
}

/// One inference output: a transport-encoded overlay plus its position in
/// the batch. `index` equals submission order and is 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub index: usize,
    pub data_uri: String,
}

/// Events emitted during a submission and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started {
        submission_id: String,
        files: usize,
        bytes_total: u64,
    },
    Progress {
        percent: u8,
    },
    Completed {
        slices: usize,
    },
    Failed {
        error: UploadError,
    },
}

/// Export formats offered to the user. Closed set per the service contract;
/// anything else is rejected before a job is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Dicom,
    Nifti,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Dicom => "dcm",
            ExportFormat::Nifti => "nii",
            ExportFormat::Png => "png",
        }
    }

    /// User-facing spelling, also used in the archive name.
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Dicom => "DICOM",
            ExportFormat::Nifti => "NIfTI",
            ExportFormat::Png => "PNG",
        }
    }

    pub fn archive_file_name(self) -> String {
        format!("segmentation_results_{}.zip", self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dicom" => Ok(ExportFormat::Dicom),
            "nifti" => Ok(ExportFormat::Nifti),
            "png" => Ok(ExportFormat::Png),
            other => Err(format!(
                "unknown export format `{other}` (expected DICOM, NIfTI or PNG)"
            )),
        }
    }
}
