//! Local persistence of finished export bundles.

use crate::export::ExportBundle;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write the archive into `dir`, creating the directory when missing.
/// Returns the path of the written file.
pub fn save_archive(dir: &Path, bundle: &ExportBundle) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;
    let path = dir.join(&bundle.file_name);
    std::fs::write(&path, &bundle.bytes)
        .with_context(|| format!("write archive {}", path.display()))?;
    Ok(path)
}
