//! Project document types.
//!
//! The wire format matches the project files written by earlier releases:
//! camelCase keys, the script column stored as `vietnamese`, the visual
//! description as `contextPrompt`, the active image as `imageData`.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::budget::UsageStats;
use crate::error::{StudioError, StudioResult};

/// Voice used for speech generation when none is selected.
pub const DEFAULT_VOICE: &str = "Sadachbia";

/// Maximum number of reference images per character.
pub const MAX_REFERENCE_IMAGES: usize = 5;

/// Number of blank scenes in a new project.
pub const INITIAL_SCENE_COUNT: usize = 3;

/// Opaque handle to a generated binary artifact, encoded as a data URI
/// (`data:<mime>;base64,<payload>`).
///
/// Cloning shares the payload, so history snapshots never copy asset data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(Arc<str>);

impl AssetHandle {
    /// Wrap an already encoded handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(Arc::from(handle.into()))
    }

    /// Encode raw bytes as a handle.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether both handles point at the same stored payload.
    pub fn shares_payload(&self, other: &AssetHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// MIME type from the format header, if present.
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split_once(',')?.0;
        header.split(';').next().filter(|mime| !mime.is_empty())
    }

    /// Base64 payload after the format header.
    pub fn payload(&self) -> Option<&str> {
        self.0.split_once(',').map(|(_, payload)| payload)
    }

    /// Decode the payload into raw bytes.
    pub fn decode(&self) -> StudioResult<Vec<u8>> {
        let payload = self
            .payload()
            .ok_or_else(|| StudioError::InvalidAsset("missing format header".to_string()))?;
        STANDARD
            .decode(payload.trim())
            .map_err(|e| StudioError::InvalidAsset(e.to_string()))
    }
}

impl From<&str> for AssetHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The full serializable project state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "lastModified",
        with = "chrono::serde::ts_milliseconds",
        default
    )]
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub content: ProjectContent,
    #[serde(default)]
    pub usage_stats: UsageStats,
}

/// Editable project content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContent {
    #[serde(default)]
    pub style_prompt: String,
    #[serde(default = "default_voice")]
    pub selected_voice: String,
    #[serde(default)]
    pub video_prompt_note: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub characters: Vec<Character>,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl Default for ProjectContent {
    fn default() -> Self {
        Self {
            style_prompt: String::new(),
            selected_voice: default_voice(),
            video_prompt_note: String::new(),
            scenes: Vec::new(),
            characters: Vec::new(),
        }
    }
}

/// One narrative unit of the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Stable identifier, never reused after deletion.
    pub id: String,
    /// User-facing label, used for export naming.
    #[serde(default)]
    pub scene_id: String,
    #[serde(rename = "vietnamese", default)]
    pub script: String,
    #[serde(rename = "contextPrompt", default)]
    pub visual_description: String,
    /// Selected characters; insertion ordered, no duplicates.
    #[serde(default)]
    pub selected_character_ids: Vec<String>,
    #[serde(rename = "imageData", default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<AssetHandle>,
    /// Append-only ledger of image variants.
    #[serde(default)]
    pub image_history: Vec<AssetHandle>,
    #[serde(rename = "audioData", default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AssetHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_prompt_name: Option<String>,
    /// Legacy columns carried through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scene {
    /// Create a blank scene selecting the given default character.
    pub fn blank(id: impl Into<String>, label: impl Into<String>, default_character: Option<&str>) -> Self {
        Self {
            id: id.into(),
            scene_id: label.into(),
            script: String::new(),
            visual_description: String::new(),
            selected_character_ids: default_character.map(|c| vec![c.to_string()]).unwrap_or_default(),
            primary_image: None,
            image_history: Vec::new(),
            audio: None,
            video_prompt: None,
            motion_prompt: None,
            motion_prompt_name: None,
            extra: Map::new(),
        }
    }

    /// Whether the character is part of this scene's selection.
    pub fn has_character(&self, character_id: &str) -> bool {
        self.selected_character_ids.iter().any(|id| id == character_id)
    }
}

/// A recurring character with visual reference images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_references: Vec<AssetHandle>,
    #[serde(default)]
    pub is_default: bool,
}

impl ProjectDocument {
    /// An empty project: three blank scenes, no characters, zero usage.
    pub fn new_empty(default_voice: impl Into<String>) -> Self {
        let scenes = (1..=INITIAL_SCENE_COUNT)
            .map(|n| Scene::blank(n.to_string(), n.to_string(), None))
            .collect();
        Self {
            name: String::new(),
            last_modified_at: now_millis(),
            content: ProjectContent {
                selected_voice: default_voice.into(),
                scenes,
                ..ProjectContent::default()
            },
            usage_stats: UsageStats::default(),
        }
    }

    /// Record a modification time.
    pub fn touch(&mut self) {
        self.last_modified_at = now_millis();
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.content.scene(id)
    }
}

/// Current time at the millisecond precision of the wire format.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self::new_empty(DEFAULT_VOICE)
    }
}
