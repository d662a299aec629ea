//! Slice viewer state.
//!
//! Pure state transitions over the current result snapshot; no I/O. UI
//! layers own the rendering, this owns the cursor, display mode and focus.

use crate::model::ResultArtifact;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Show one slice at the cursor, or every slice in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Paged,
    AllVisible,
}

#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    results: Arc<[ResultArtifact]>,
    cursor: usize,
    display_mode: DisplayMode,
    focused: Option<usize>,
}

impl ViewerState {
    pub fn new(results: Arc<[ResultArtifact]>) -> Self {
        Self {
            results,
            cursor: 0,
            display_mode: DisplayMode::default(),
            focused: None,
        }
    }

    /// Replace the snapshot after a new successful upload: the cursor
    /// returns to the first slice and any focus is cleared.
    pub fn attach(&mut self, results: Arc<[ResultArtifact]>) {
        self.results = results;
        self.cursor = 0;
        self.focused = None;
    }

    pub fn results(&self) -> &[ResultArtifact] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    /// The slice under the cursor, when any results are present.
    pub fn current(&self) -> Option<&ResultArtifact> {
        self.results.get(self.cursor)
    }

    /// Move the cursor by one slice, clamped to the result range. No
    /// wraparound; a no-op at either boundary or with no results.
    pub fn advance(&mut self, direction: Direction) {
        if self.results.is_empty() {
            return;
        }
        match direction {
            Direction::Forward => {
                self.cursor = (self.cursor + 1).min(self.results.len() - 1);
            }
            Direction::Backward => {
                self.cursor = self.cursor.saturating_sub(1);
            }
        }
    }

    /// Switching modes never moves the cursor or touches the results.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    /// Open the full view over one slice. Out-of-range indices are ignored;
    /// at most one slice is focused at a time.
    pub fn focus(&mut self, index: usize) {
        if index < self.results.len() {
            self.focused = Some(index);
        }
    }

    pub fn unfocus(&mut self) {
        self.focused = None;
    }

    pub fn focused_artifact(&self) -> Option<&ResultArtifact> {
        self.focused.and_then(|i| self.results.get(i))
    }
}
