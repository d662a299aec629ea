//! Upload orchestration.
//!
//! One submission at a time is meaningful to the caller. A newer submission
//! supersedes an older one through the session store's generation gate rather
//! than by aborting the request in flight; a late-arriving response from a
//! superseded submission is discarded, never applied.

pub mod inference;

use crate::error::UploadError;
use crate::model::{ResultArtifact, SessionConfig, UploadBatch, UploadEvent};
use crate::session::SessionStore;
use inference::InferenceClient;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// How often the byte counter is sampled while a request is in flight.
const PROGRESS_SAMPLE_INTERVAL: Duration = Duration::from_millis(150);

pub struct UploadOrchestrator {
    client: InferenceClient,
    store: Arc<SessionStore>,
}

impl UploadOrchestrator {
    pub fn new(cfg: &SessionConfig, store: Arc<SessionStore>) -> Result<Self, UploadError> {
        Ok(Self {
            client: InferenceClient::new(cfg)?,
            store,
        })
    }

    pub fn client(&self) -> &InferenceClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one batch submission to its terminal state.
    ///
    /// An empty batch is a no-op: no status transition, no request. The
    /// terminal outcome is applied through the store's generation gate and
    /// only announced on `event_tx` when it was accepted as the live one.
    pub async fn submit(&self, batch: UploadBatch, event_tx: &UnboundedSender<UploadEvent>) {
        if batch.is_empty() {
            tracing::debug!("empty batch, nothing to submit");
            return;
        }

        let generation = self.store.begin();
        let submission_id = gen_submission_id();
        let bytes_total = batch.total_bytes();
        tracing::info!(
            %submission_id,
            files = batch.len(),
            bytes_total,
            "starting batch submission"
        );
        let _ = event_tx.send(UploadEvent::Started {
            submission_id: submission_id.clone(),
            files: batch.len(),
            bytes_total,
        });

        let sent = Arc::new(AtomicU64::new(0));
        let request = self.client.predict_batch(&batch, sent.clone());
        tokio::pin!(request);

        let mut ticker = tokio::time::interval(PROGRESS_SAMPLE_INTERVAL);
        let outcome = loop {
            tokio::select! {
                res = &mut request => break res,
                _ = ticker.tick() => {
                    let percent = percent_complete(sent.load(Ordering::Relaxed), bytes_total);
                    if let Some(p) = self.store.progress(generation, percent) {
                        let _ = event_tx.send(UploadEvent::Progress { percent: p });
                    }
                }
            }
        };

        match outcome {
            Ok(overlays) => {
                // The transport settled, so the full payload went out.
                if let Some(p) = self.store.progress(generation, 100) {
                    let _ = event_tx.send(UploadEvent::Progress { percent: p });
                }
                let artifacts = wrap_overlays(overlays);
                let slices = artifacts.len();
                if self.store.complete(generation, artifacts) {
                    tracing::info!(%submission_id, slices, "segmentation completed");
                    let _ = event_tx.send(UploadEvent::Completed { slices });
                } else {
                    tracing::debug!(%submission_id, "submission superseded, result dropped");
                }
            }
            Err(error) => {
                if self.store.fail(generation, error.clone()) {
                    tracing::warn!(%submission_id, %error, "submission failed");
                    let _ = event_tx.send(UploadEvent::Failed { error });
                } else {
                    tracing::debug!(%submission_id, "submission superseded, failure dropped");
                }
            }
        }
    }
}

/// Wrap the ordered overlay collection, pinning each to its positional index.
fn wrap_overlays(overlays: Vec<String>) -> Vec<ResultArtifact> {
    overlays
        .into_iter()
        .enumerate()
        .map(|(index, data_uri)| ResultArtifact { index, data_uri })
        .collect()
}

/// Random id attached to log lines for one submission.
fn gen_submission_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    u64::from_le_bytes(b).to_string()
}

/// `round(bytes_sent * 100 / bytes_total)`, clamped to [0, 100].
pub(crate) fn percent_complete(bytes_sent: u64, bytes_total: u64) -> u8 {
    if bytes_total == 0 {
        return 0;
    }
    let rounded = (bytes_sent.saturating_mul(100) + bytes_total / 2) / bytes_total;
    rounded.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent_complete(0, 1000), 0);
        assert_eq!(percent_complete(4, 1000), 0);
        assert_eq!(percent_complete(5, 1000), 1);
        assert_eq!(percent_complete(499, 1000), 50);
        assert_eq!(percent_complete(1000, 1000), 100);
    }

    #[test]
    fn percent_clamps_overshoot() {
        // Counted payload can momentarily exceed the estimate; never report >100.
        assert_eq!(percent_complete(1200, 1000), 100);
    }

    #[test]
    fn percent_of_empty_total_is_zero() {
        assert_eq!(percent_complete(0, 0), 0);
    }

    #[test]
    fn wrapped_overlays_carry_submission_order() {
        let artifacts = wrap_overlays(vec!["data:,a".into(), "data:,b".into()]);
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].index, 0);
        assert_eq!(artifacts[1].index, 1);
        assert_eq!(artifacts[1].data_uri, "data:,b");
    }
}
