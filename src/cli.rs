use crate::engine::UploadOrchestrator;
use crate::export::{data_uri, ExportJob};
use crate::model::{ExportFormat, SessionConfig, UploadBatch, UploadEvent, UploadStatus};
use crate::session::SessionStore;
use crate::storage;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "medseg-cli",
    version,
    about = "Submit medical images for segmentation and export the results"
)]
pub struct Cli {
    /// Image files to submit as one batch, in slice order
    pub files: Vec<PathBuf>,

    /// Base URL of the segmentation service
    #[arg(long, default_value = "http://localhost:5000")]
    pub base_url: String,

    /// API key sent as the x-api-key header
    #[arg(long, env = "MEDSEG_API_KEY")]
    pub api_key: Option<String>,

    /// Upload request timeout
    #[arg(long, default_value = "60s")]
    pub timeout: humantime::Duration,

    /// Skip the service reachability probe before submitting
    #[arg(long)]
    pub no_preflight: bool,

    /// Export the results in this format (DICOM, NIfTI or PNG)
    #[arg(long)]
    pub export: Option<ExportFormat>,

    /// Protect the exported archive with this passphrase
    #[arg(long, env = "MEDSEG_PASSPHRASE")]
    pub passphrase: Option<String>,

    /// Directory the exported archive is written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Print a JSON summary of the results on stdout
    #[arg(long)]
    pub json: bool,
}

/// Build a `SessionConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SessionConfig {
    SessionConfig {
        base_url: args.base_url.clone(),
        api_key: args.api_key.clone(),
        request_timeout: Duration::from(args.timeout),
        health_timeout: Duration::from_secs(5),
        user_agent: format!("medseg-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.files.is_empty() {
        eprintln!("no files selected; nothing to submit");
        return Ok(());
    }

    let cfg = build_config(&args);
    let store = Arc::new(SessionStore::new());
    let orchestrator =
        UploadOrchestrator::new(&cfg, store.clone()).context("initialize HTTP client")?;

    if !args.no_preflight {
        orchestrator
            .client()
            .health_check()
            .await
            .context("the segmentation service is unreachable")?;
    }

    let batch = UploadBatch::load(&args.files).context("read input files")?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UploadEvent>();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            match ev {
                UploadEvent::Started {
                    files, bytes_total, ..
                } => eprintln!("Uploading {files} file(s), {bytes_total} bytes"),
                UploadEvent::Progress { percent } => eprintln!("Upload: {percent}%"),
                UploadEvent::Completed { slices } => {
                    eprintln!("Segmentation complete: {slices} slice(s)")
                }
                UploadEvent::Failed { error } => eprintln!("Submission failed: {error}"),
            }
        }
    });

    orchestrator.submit(batch, &event_tx).await;
    drop(event_tx);
    let _ = printer.await;

    match store.status() {
        UploadStatus::Success => {}
        UploadStatus::Failure { reason } => return Err(anyhow::Error::new(reason)),
        other => anyhow::bail!("submission ended in unexpected state {other:?}"),
    }

    if args.json {
        let slices: Vec<_> = store
            .results()
            .iter()
            .map(|a| {
                serde_json::json!({
                    "index": a.index,
                    "media_type": data_uri::media_type(&a.data_uri),
                    "encoded_len": a.data_uri.len(),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&serde_json::json!({ "slices": slices }))?;
        println!("{out}");
    }

    if let Some(format) = args.export {
        let job = ExportJob::new(store.results(), format, args.passphrase.clone());
        let bundle = job.run().context("export failed")?;
        let path = storage::save_archive(&args.output_dir, &bundle)?;
        eprintln!("Saved: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_the_cli_timeout() {
        let args = Cli::parse_from([
            "medseg-cli",
            "scan.dcm",
            "--base-url",
            "http://imaging.local:5000",
            "--timeout",
            "90s",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://imaging.local:5000");
        assert_eq!(cfg.request_timeout, Duration::from_secs(90));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn export_format_values_are_the_closed_set() {
        let args = Cli::parse_from(["medseg-cli", "scan.dcm", "--export", "NIfTI"]);
        assert_eq!(args.export, Some(ExportFormat::Nifti));

        let err = Cli::try_parse_from(["medseg-cli", "scan.dcm", "--export", "tiff"]);
        assert!(err.is_err());
    }
}
