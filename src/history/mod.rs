//! Linear undo/redo over immutable document snapshots.
//!
//! # Overview
//!
//! - **History**: `past` / `present` / `future` regions holding shared
//!   snapshots. Transitions are expressed as a [`HistoryAction`] folded
//!   over the state by [`History::apply`].
//! - **ProjectStore**: the shared handle every mutation path goes through,
//!   pairing the history-tracked document with the transient per-scene
//!   activity board that is deliberately kept out of history.
//!
//! # Example
//!
//! ```ignore
//! use scenecraft::history::ProjectStore;
//! use scenecraft::project::ProjectDocument;
//!
//! let store = ProjectStore::new(ProjectDocument::default());
//! store.update(|doc| doc.content.update_script("1", "Hello"))?;
//! assert!(store.can_undo());
//! store.undo();
//! ```

mod activity;
mod store;

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

pub use activity::{ActivityBoard, ActivityGuard, ActivityKind};
pub use store::ProjectStore;

/// A transition of the history container.
#[derive(Debug)]
pub enum HistoryAction<T> {
    Undo,
    Redo,
    /// Commit a new present; a no-op when it is the current snapshot.
    Set(Arc<T>),
    /// Replace everything, dropping past and future.
    Reset(Arc<T>),
}

/// Undo/redo container over shared snapshots.
///
/// Snapshots are shelved by reference: no transition clones a document.
#[derive(Debug)]
pub struct History<T> {
    /// Oldest first
    past: VecDeque<Arc<T>>,
    present: Arc<T>,
    /// Nearest redo first
    future: VecDeque<Arc<T>>,
    /// Maximum number of undo entries kept (None = unbounded)
    limit: Option<usize>,
}

impl<T> History<T> {
    /// Create a history whose present is `initial`.
    pub fn new(initial: T) -> Self {
        Self::from_shared(Arc::new(initial))
    }

    /// Create a history around an existing snapshot.
    pub fn from_shared(initial: Arc<T>) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: VecDeque::new(),
            limit: None,
        }
    }

    /// Bound the number of undo entries; the oldest are dropped first.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self.enforce_limit();
        self
    }

    /// Apply a transition. Returns whether the state changed.
    pub fn apply(&mut self, action: HistoryAction<T>) -> bool {
        match action {
            HistoryAction::Undo => {
                let Some(previous) = self.past.pop_back() else {
                    return false;
                };
                let current = std::mem::replace(&mut self.present, previous);
                self.future.push_front(current);
            }
            HistoryAction::Redo => {
                let Some(next) = self.future.pop_front() else {
                    return false;
                };
                let current = std::mem::replace(&mut self.present, next);
                self.past.push_back(current);
            }
            HistoryAction::Set(next) => {
                if Arc::ptr_eq(&next, &self.present) {
                    return false;
                }
                let current = std::mem::replace(&mut self.present, next);
                self.past.push_back(current);
                self.future.clear();
                self.enforce_limit();
            }
            HistoryAction::Reset(next) => {
                self.past.clear();
                self.future.clear();
                self.present = next;
            }
        }
        debug!(
            past = self.past.len(),
            future = self.future.len(),
            "history transition"
        );
        true
    }

    pub fn set(&mut self, next: Arc<T>) -> bool {
        self.apply(HistoryAction::Set(next))
    }

    pub fn undo(&mut self) -> bool {
        self.apply(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.apply(HistoryAction::Redo)
    }

    pub fn reset(&mut self, next: Arc<T>) {
        self.apply(HistoryAction::Reset(next));
    }

    /// The current snapshot.
    pub fn present(&self) -> &Arc<T> {
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo entries.
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo entries.
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            while self.past.len() > limit {
                self.past.pop_front();
            }
        }
    }
}
