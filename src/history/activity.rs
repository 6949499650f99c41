//! Transient per-scene activity flags.
//!
//! These live outside the document history so in-flight work never shows
//! up as undo entries. Flags are keyed by the scene's stable id, never by
//! position.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Kind of in-flight work on a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Image,
    Audio,
    VideoPrompt,
}

/// Counters of in-flight work per (scene id, kind).
///
/// `generation` advances on every [`clear`](Self::clear); guards begun
/// under an older generation no longer touch the counters.
#[derive(Debug, Default)]
pub struct ActivityBoard {
    active: HashMap<(String, ActivityKind), usize>,
    generation: u64,
}

impl ActivityBoard {
    fn begin(&mut self, scene_id: &str, kind: ActivityKind) -> u64 {
        *self.active.entry((scene_id.to_string(), kind)).or_insert(0) += 1;
        self.generation
    }

    fn finish(&mut self, generation: u64, scene_id: &str, kind: ActivityKind) {
        if generation != self.generation {
            return;
        }
        let key = (scene_id.to_string(), kind);
        if let Some(count) = self.active.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.active.remove(&key);
            }
        }
    }

    pub fn is_active(&self, scene_id: &str, kind: ActivityKind) -> bool {
        self.active.contains_key(&(scene_id.to_string(), kind))
    }

    /// Whether any work is in flight for the scene.
    pub fn is_scene_busy(&self, scene_id: &str) -> bool {
        self.active.keys().any(|(id, _)| id == scene_id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop every flag. Used when the document is replaced.
    pub fn clear(&mut self) {
        self.active.clear();
        self.generation += 1;
    }
}

/// Clears its flag when dropped, on success and failure paths alike.
#[derive(Debug)]
pub struct ActivityGuard {
    board: Arc<Mutex<ActivityBoard>>,
    generation: u64,
    scene_id: String,
    kind: ActivityKind,
}

impl ActivityGuard {
    pub(crate) fn begin(board: Arc<Mutex<ActivityBoard>>, scene_id: &str, kind: ActivityKind) -> Self {
        let generation = board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .begin(scene_id, kind);
        Self {
            board,
            generation,
            scene_id: scene_id.to_string(),
            kind,
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.board
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish(self.generation, &self.scene_id, self.kind);
    }
}
