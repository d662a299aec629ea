//! HTTP client for the segmentation inference endpoint.
//!
//! The whole batch travels as one multipart request; the service replies
//! with a JSON body whose `overlays` field holds one data-URI-encoded image
//! per input file, in input order.

use crate::error::UploadError;
use crate::model::{SessionConfig, UploadBatch};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Field name the service expects every file of the batch under.
const UPLOAD_FIELD: &str = "images";

/// Chunk size for upload body streaming (64 KB)
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    cfg: SessionConfig,
}

impl InferenceClient {
    pub fn new(cfg: &SessionConfig) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.cfg.base_url.trim_end_matches('/'))
    }

    /// Probe the service root, as the UI does before enabling uploads.
    /// Any answer means the service is reachable; auth and routing problems
    /// surface on the real submission.
    pub async fn health_check(&self) -> Result<(), UploadError> {
        let mut req = self
            .http
            .get(&self.cfg.base_url)
            .timeout(self.cfg.health_timeout);
        if let Some(key) = &self.cfg.api_key {
            req = req.header("x-api-key", key);
        }
        req.send().await?;
        Ok(())
    }

    /// Send the batch as one combined request and return the ordered overlay
    /// collection.
    ///
    /// Payload bytes are counted into `sent` as chunks are produced for the
    /// transport. This is a close approximation of bytes put on the wire
    /// (multipart framing is not counted) and feeds stable realtime progress.
    pub async fn predict_batch(
        &self,
        batch: &UploadBatch,
        sent: Arc<AtomicU64>,
    ) -> Result<Vec<String>, UploadError> {
        let mut form = Form::new();
        for file in batch.files() {
            let body = reqwest::Body::wrap_stream(counting_stream(file.bytes.clone(), sent.clone()));
            let part = Part::stream_with_length(body, file.bytes.len() as u64)
                .file_name(file.file_name.clone())
                .mime_str("application/octet-stream")?;
            form = form.part(UPLOAD_FIELD, part);
        }

        let mut req = self.http.post(self.predict_url()).multipart(form);
        if let Some(key) = &self.cfg.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = server_message(resp).await;
            return Err(UploadError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(format!("invalid JSON body: {e}")))?;
        parse_overlays(&body)
    }
}

/// Stream one file's payload in fixed chunks, counting bytes as they are
/// handed to the transport.
fn counting_stream(
    bytes: Bytes,
    sent: Arc<AtomicU64>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    let len = bytes.len();
    stream::iter((0..len).step_by(UPLOAD_CHUNK_SIZE)).map(move |off| {
        let end = (off + UPLOAD_CHUNK_SIZE).min(len);
        sent.fetch_add((end - off) as u64, Ordering::Relaxed);
        Ok(bytes.slice(off..end))
    })
}

/// Extract the ordered overlay collection from a success payload.
pub(crate) fn parse_overlays(body: &serde_json::Value) -> Result<Vec<String>, UploadError> {
    let overlays = body
        .get("overlays")
        .ok_or_else(|| UploadError::MalformedResponse("missing `overlays` field".into()))?;
    let items = overlays
        .as_array()
        .ok_or_else(|| UploadError::MalformedResponse("`overlays` is not an array".into()))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                UploadError::MalformedResponse(format!("overlay {i} is not a string"))
            })
        })
        .collect()
}

/// Best-effort extraction of a server-supplied error message. The fail path
/// consumes only what the failing response actually carried.
async fn server_message(resp: reqwest::Response) -> String {
    let text = resp.text().await.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return "no error detail".to_string();
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(body) => body
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| text.to_string()),
        Err(_) => text.to_string(),
    }
}
