//! Per-scene image version ledger.
//!
//! `image_history` is an append log: entries are never reordered or removed
//! while the scene exists. The active image may point at any entry.

use crate::error::{StudioError, StudioResult};
use crate::project::{AssetHandle, Scene};

impl Scene {
    /// Record a new generation result and make it the active image.
    ///
    /// An active image missing from the ledger (scenes loaded from files
    /// written before the ledger existed) is backfilled first.
    pub fn record_generation(&mut self, result: AssetHandle) {
        if let Some(current) = &self.primary_image {
            if !self.image_history.contains(current) {
                self.image_history.push(current.clone());
            }
        }
        self.image_history.push(result.clone());
        self.primary_image = Some(result);
    }

    /// Reactivate a historical version. The ledger is left untouched.
    pub fn promote_version(&mut self, index: usize) -> StudioResult<()> {
        let version = self.image_history.get(index).cloned().ok_or_else(|| {
            StudioError::ValidationFailed(format!(
                "scene {} has no image version #{}",
                self.scene_id, index
            ))
        })?;
        self.primary_image = Some(version);
        Ok(())
    }

    /// Number of versions in the ledger.
    pub fn version_count(&self) -> usize {
        self.image_history.len()
    }

    /// Ledger position of the active image (last matching entry).
    pub fn active_version(&self) -> Option<usize> {
        let active = self.primary_image.as_ref()?;
        self.image_history.iter().rposition(|entry| entry == active)
    }
}
