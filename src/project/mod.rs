//! Project data model and the edits that can be applied to it.
//!
//! A [`ProjectDocument`] is never edited in place by its owner: every edit
//! is applied to a fresh copy which is then committed through the
//! history store.

mod characters;
mod model;
mod scenes;

pub use model::{
    AssetHandle, Character, ProjectContent, ProjectDocument, Scene, DEFAULT_VOICE,
    INITIAL_SCENE_COUNT, MAX_REFERENCE_IMAGES,
};
pub use scenes::{ImportedScene, ScriptColumn};
