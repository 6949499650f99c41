//! Shared project store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};

use tracing::debug;

use super::activity::{ActivityBoard, ActivityGuard, ActivityKind};
use super::History;
use crate::error::StudioResult;
use crate::project::ProjectDocument;

/// Shared handle over the history-tracked document and the transient
/// activity board.
///
/// Every new document state enters through [`set`](Self::set) or
/// [`update`](Self::update). `update` derives the next state from the
/// present read under the same lock, so a result that arrives after
/// unrelated edits is merged into the latest document instead of
/// overwriting it.
///
/// The epoch counts document replacements. Work started against one
/// document commits through [`update_in_epoch`](Self::update_in_epoch) so it
/// can never land in a document loaded after it began.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    history: Arc<RwLock<History<ProjectDocument>>>,
    activity: Arc<Mutex<ActivityBoard>>,
    // Only written while the history write lock is held.
    epoch: Arc<AtomicU64>,
}

impl ProjectStore {
    /// Create a store with an unbounded history.
    pub fn new(document: ProjectDocument) -> Self {
        Self::with_limit(document, None)
    }

    /// Create a store keeping at most `limit` undo entries.
    pub fn with_limit(document: ProjectDocument, limit: Option<usize>) -> Self {
        Self {
            history: Arc::new(RwLock::new(History::new(document).with_limit(limit))),
            activity: Arc::new(Mutex::new(ActivityBoard::default())),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of document replacements so far.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn write(&self) -> RwLockWriteGuard<'_, History<ProjectDocument>> {
        self.history.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current document.
    pub fn present(&self) -> Arc<ProjectDocument> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(history.present())
    }

    /// Commit a new document. Returns false when `next` is the present
    /// snapshot itself.
    pub fn set(&self, next: Arc<ProjectDocument>) -> bool {
        self.write().set(next)
    }

    /// Apply an edit to a copy of the latest document and commit it.
    ///
    /// Nothing is committed when the edit fails. The closure runs under the
    /// store lock and must not call back into the store.
    pub fn update<R, F>(&self, edit: F) -> StudioResult<R>
    where
        F: FnOnce(&mut ProjectDocument) -> StudioResult<R>,
    {
        commit(&mut self.write(), edit)
    }

    /// Like [`update`](Self::update), but commits nothing and returns
    /// `Ok(None)` when the document was replaced since `epoch` was read.
    pub fn update_in_epoch<R, F>(&self, epoch: u64, edit: F) -> StudioResult<Option<R>>
    where
        F: FnOnce(&mut ProjectDocument) -> StudioResult<R>,
    {
        let mut history = self.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(epoch, "document replaced; update skipped");
            return Ok(None);
        }
        commit(&mut history, edit).map(Some)
    }

    pub fn undo(&self) -> bool {
        self.write().undo()
    }

    pub fn redo(&self) -> bool {
        self.write().redo()
    }

    /// Replace the document and drop all undo/redo state and activity.
    pub fn reset(&self, document: ProjectDocument) {
        debug!(name = %document.name, "resetting project store");
        let mut history = self.write();
        history.reset(Arc::new(document));
        self.epoch.fetch_add(1, Ordering::AcqRel);
        drop(history);
        self.activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn can_undo(&self) -> bool {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .can_redo()
    }

    /// Mark work as in flight for a scene until the guard is dropped.
    pub fn begin_activity(&self, scene_id: &str, kind: ActivityKind) -> ActivityGuard {
        ActivityGuard::begin(Arc::clone(&self.activity), scene_id, kind)
    }

    pub fn is_active(&self, scene_id: &str, kind: ActivityKind) -> bool {
        self.activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_active(scene_id, kind)
    }

    pub fn is_scene_busy(&self, scene_id: &str) -> bool {
        self.activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_scene_busy(scene_id)
    }
}

fn commit<R, F>(history: &mut History<ProjectDocument>, edit: F) -> StudioResult<R>
where
    F: FnOnce(&mut ProjectDocument) -> StudioResult<R>,
{
    let mut next = ProjectDocument::clone(history.present());
    let output = edit(&mut next)?;
    next.touch();
    history.set(Arc::new(next));
    Ok(output)
}
