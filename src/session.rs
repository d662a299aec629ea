//! Session result store.
//!
//! One owned value holds the upload status and the current result snapshot
//! for the whole client session. Results are replaced wholesale and handed
//! out as shared snapshots; consumers never observe incremental mutation.
//!
//! The store also carries the submission generation counter. A submission
//! may be superseded by a newer one at any time; progress and terminal
//! results gated through the store are applied only while their generation
//! is still the live one, so a late response cannot corrupt newer state.

use crate::error::UploadError;
use crate::model::{ResultArtifact, UploadStatus};
use std::sync::{Arc, Mutex};

/// Token identifying one submission within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug)]
struct SessionInner {
    generation: u64,
    status: UploadStatus,
    results: Arc<[ResultArtifact]>,
}

#[derive(Debug)]
pub struct SessionStore {
    inner: Mutex<SessionInner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                generation: 0,
                status: UploadStatus::Idle,
                results: Arc::from([]),
            }),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.inner.lock().expect("session store poisoned").status.clone()
    }

    /// Current result snapshot. Cheap to clone; replaced wholesale on each
    /// successful submission.
    pub fn results(&self) -> Arc<[ResultArtifact]> {
        self.inner.lock().expect("session store poisoned").results.clone()
    }

    /// Start a new submission: stale artifacts are cleared so they are never
    /// shown alongside the new batch, and progress resets to 0.
    pub fn begin(&self) -> Generation {
        let mut inner = self.inner.lock().expect("session store poisoned");
        inner.generation += 1;
        inner.status = UploadStatus::InProgress { percent: 0 };
        inner.results = Arc::from([]);
        Generation(inner.generation)
    }

    /// Apply a progress reading for `generation`.
    ///
    /// Returns the percent when it advanced the live submission; duplicate
    /// readings, regressions and readings from superseded submissions are
    /// swallowed so callers can publish every `Some` without re-filtering.
    pub fn progress(&self, generation: Generation, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        let mut inner = self.inner.lock().expect("session store poisoned");
        if inner.generation != generation.0 {
            tracing::debug!(percent, "discarding progress from superseded submission");
            return None;
        }
        match inner.status {
            UploadStatus::InProgress { percent: current } if percent > current => {
                inner.status = UploadStatus::InProgress { percent };
                Some(percent)
            }
            _ => None,
        }
    }

    /// Terminal success: publish the new result collection wholesale.
    /// Returns false when the submission was superseded and nothing changed.
    pub fn complete(&self, generation: Generation, artifacts: Vec<ResultArtifact>) -> bool {
        let mut inner = self.inner.lock().expect("session store poisoned");
        if inner.generation != generation.0 {
            tracing::debug!("discarding results from superseded submission");
            return false;
        }
        inner.status = UploadStatus::Success;
        inner.results = artifacts.into();
        true
    }

    /// Terminal failure: results stay empty, partial output is never shown.
    /// Returns false when the submission was superseded and nothing changed.
    pub fn fail(&self, generation: Generation, reason: UploadError) -> bool {
        let mut inner = self.inner.lock().expect("session store poisoned");
        if inner.generation != generation.0 {
            tracing::debug!(%reason, "discarding failure from superseded submission");
            return false;
        }
        inner.status = UploadStatus::Failure { reason };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts(n: usize) -> Vec<ResultArtifact> {
        (0..n)
            .map(|index| ResultArtifact {
                index,
                data_uri: format!("data:image/png;base64,c2xpY2Ut{index}"),
            })
            .collect()
    }

    #[test]
    fn begin_clears_results_and_resets_progress() {
        let store = SessionStore::new();
        let g1 = store.begin();
        assert!(store.complete(g1, artifacts(2)));
        assert_eq!(store.results().len(), 2);

        let _g2 = store.begin();
        assert!(store.results().is_empty());
        assert_eq!(store.status(), UploadStatus::InProgress { percent: 0 });
    }

    #[test]
    fn progress_is_monotone_and_deduplicated() {
        let store = SessionStore::new();
        let gen = store.begin();
        assert_eq!(store.progress(gen, 10), Some(10));
        assert_eq!(store.progress(gen, 10), None);
        assert_eq!(store.progress(gen, 5), None);
        assert_eq!(store.progress(gen, 90), Some(90));
        assert_eq!(store.status(), UploadStatus::InProgress { percent: 90 });
    }

    #[test]
    fn progress_clamps_to_one_hundred() {
        let store = SessionStore::new();
        let gen = store.begin();
        assert_eq!(store.progress(gen, 200), Some(100));
    }

    #[test]
    fn progress_after_terminal_state_is_ignored() {
        let store = SessionStore::new();
        let gen = store.begin();
        assert!(store.complete(gen, artifacts(1)));
        assert_eq!(store.progress(gen, 100), None);
        assert_eq!(store.status(), UploadStatus::Success);
    }

    #[test]
    fn superseded_terminal_results_are_discarded() {
        let store = SessionStore::new();
        let g1 = store.begin();
        let g2 = store.begin();

        assert!(!store.complete(g1, artifacts(3)));
        assert!(store.results().is_empty());
        assert_eq!(store.status(), UploadStatus::InProgress { percent: 0 });

        assert!(store.complete(g2, artifacts(2)));
        assert_eq!(store.results().len(), 2);
        assert_eq!(store.status(), UploadStatus::Success);
    }

    #[test]
    fn superseded_failure_does_not_mask_live_submission() {
        let store = SessionStore::new();
        let g1 = store.begin();
        let g2 = store.begin();

        assert!(!store.fail(g1, UploadError::Transport("old".into())));
        assert_eq!(store.status(), UploadStatus::InProgress { percent: 0 });

        assert!(store.fail(g2, UploadError::Transport("new".into())));
        assert_eq!(
            store.status(),
            UploadStatus::Failure {
                reason: UploadError::Transport("new".into())
            }
        );
        assert!(store.results().is_empty());
    }

    #[test]
    fn snapshots_are_immune_to_later_replacement() {
        let store = SessionStore::new();
        let g1 = store.begin();
        assert!(store.complete(g1, artifacts(3)));
        let snapshot = store.results();

        let g2 = store.begin();
        assert!(store.complete(g2, artifacts(1)));

        assert_eq!(snapshot.len(), 3);
        assert_eq!(store.results().len(), 1);
    }
}
