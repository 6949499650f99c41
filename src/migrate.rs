//! Schema migration for loaded project files.
//!
//! Project files written by older releases may lack fields or carry legacy
//! singular ones. [`Migrator`] normalizes any structurally valid file into
//! the current [`ProjectDocument`] shape. Every rule is idempotent, so
//! migrating an already current file changes nothing.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::budget::UsageStats;
use crate::error::{StudioError, StudioResult};
use crate::project::{ProjectDocument, DEFAULT_VOICE, MAX_REFERENCE_IMAGES};

/// Sentinel used by old files for "no character selected".
const NO_CHARACTER: &str = "none";

/// Prefix of ephemeral in-flight flags that must never survive a load.
const EPHEMERAL_FLAG_PREFIX: &str = "isGenerating";

/// Normalizes loaded documents into the current schema.
#[derive(Debug, Clone)]
pub struct Migrator {
    default_voice: String,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE)
    }
}

impl Migrator {
    pub fn new(default_voice: impl Into<String>) -> Self {
        Self {
            default_voice: default_voice.into(),
        }
    }

    /// Parse raw file bytes and migrate them.
    ///
    /// Nothing is produced on failure, so the caller's current document
    /// stays in place.
    pub fn load(&self, bytes: &[u8]) -> StudioResult<ProjectDocument> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| StudioError::MalformedProjectFile(e.to_string()))?;
        self.migrate(value)
    }

    /// Migrate an already parsed document.
    pub fn migrate(&self, mut value: Value) -> StudioResult<ProjectDocument> {
        let root = value
            .as_object_mut()
            .ok_or_else(|| malformed("top level is not an object"))?;

        let content = object_field(root, "content")?;
        migrate_scenes(content)?;
        migrate_characters(content)?;

        if !is_non_empty_str(content.get("selectedVoice")) {
            content.insert("selectedVoice".to_string(), Value::from(self.default_voice.as_str()));
        }
        if is_missing(content.get("videoPromptNote")) {
            content.insert("videoPromptNote".to_string(), Value::from(""));
        }
        if is_missing(root.get("usageStats")) {
            let zero = serde_json::to_value(UsageStats::default())?;
            root.insert("usageStats".to_string(), zero);
        }

        let document: ProjectDocument =
            serde_json::from_value(value).map_err(|e| malformed(&e.to_string()))?;
        debug!(
            scenes = document.content.scenes.len(),
            characters = document.content.characters.len(),
            "project migrated"
        );
        Ok(document)
    }
}

/// Load bytes with the default migrator.
pub fn load_project(bytes: &[u8]) -> StudioResult<ProjectDocument> {
    Migrator::default().load(bytes)
}

fn malformed(reason: &str) -> StudioError {
    StudioError::MalformedProjectFile(reason.to_string())
}

fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

/// Get an object field, creating it when absent.
fn object_field<'a>(parent: &'a mut Map<String, Value>, key: &str) -> StudioResult<&'a mut Map<String, Value>> {
    if is_missing(parent.get(key)) {
        parent.insert(key.to_string(), Value::Object(Map::new()));
    }
    parent
        .get_mut(key)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| malformed(&format!("`{}` is not an object", key)))
}

/// Get an array field, creating it when absent.
fn array_field<'a>(parent: &'a mut Map<String, Value>, key: &str) -> StudioResult<&'a mut Vec<Value>> {
    if is_missing(parent.get(key)) {
        parent.insert(key.to_string(), Value::Array(Vec::new()));
    }
    parent
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| malformed(&format!("`{}` is not an array", key)))
}

/// Numbers used as identifiers by hand-edited files become strings.
fn stringify_number(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Number(n)) = map.get(key) {
        let text = n.to_string();
        map.insert(key.to_string(), Value::String(text));
    }
}

/// Derive a list field from a legacy singular one when the list is absent.
/// The legacy field is always dropped.
fn derive_list(map: &mut Map<String, Value>, list_key: &str, legacy_key: &str, skip: Option<&str>) {
    let legacy = map.remove(legacy_key);
    if !is_missing(map.get(list_key)) {
        return;
    }
    let list = match legacy {
        Some(Value::String(s)) if !s.is_empty() && Some(s.as_str()) != skip => vec![Value::String(s)],
        _ => Vec::new(),
    };
    map.insert(list_key.to_string(), Value::Array(list));
}

fn dedupe(list: &mut Vec<Value>) {
    let mut seen = Vec::with_capacity(list.len());
    list.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

fn migrate_scenes(content: &mut Map<String, Value>) -> StudioResult<()> {
    let scenes = array_field(content, "scenes")?;
    for (index, scene) in scenes.iter_mut().enumerate() {
        let scene = scene
            .as_object_mut()
            .ok_or_else(|| malformed(&format!("scene #{} is not an object", index)))?;

        stringify_number(scene, "id");
        stringify_number(scene, "sceneId");
        if !is_non_empty_str(scene.get("id")) {
            scene.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if is_missing(scene.get("sceneId")) {
            scene.insert("sceneId".to_string(), Value::String((index + 1).to_string()));
        }

        derive_list(scene, "selectedCharacterIds", "selectedCharacterId", Some(NO_CHARACTER));
        if let Some(Value::Array(ids)) = scene.get_mut("selectedCharacterIds") {
            dedupe(ids);
        }
        if is_missing(scene.get("imageHistory")) {
            let history = match scene.get("imageData") {
                Some(Value::String(image)) if !image.is_empty() => vec![Value::String(image.clone())],
                _ => Vec::new(),
            };
            scene.insert("imageHistory".to_string(), Value::Array(history));
        }

        scene.retain(|key, _| !key.starts_with(EPHEMERAL_FLAG_PREFIX));
    }
    Ok(())
}

fn migrate_characters(content: &mut Map<String, Value>) -> StudioResult<()> {
    let characters = array_field(content, "characters")?;
    let mut seen_default = false;
    for (index, character) in characters.iter_mut().enumerate() {
        let character = character
            .as_object_mut()
            .ok_or_else(|| malformed(&format!("character #{} is not an object", index)))?;

        stringify_number(character, "id");
        derive_list(character, "imageReferences", "imageReference", None);
        if let Some(Value::Array(images)) = character.get_mut("imageReferences") {
            if images.len() > MAX_REFERENCE_IMAGES {
                warn!(
                    character = index,
                    count = images.len(),
                    "dropping reference images over the limit"
                );
                images.truncate(MAX_REFERENCE_IMAGES);
            }
        }

        let is_default = matches!(character.get("isDefault"), Some(Value::Bool(true)));
        if is_default && seen_default {
            character.insert("isDefault".to_string(), Value::Bool(false));
        }
        seen_default |= is_default;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn migrate(value: Value) -> ProjectDocument {
        Migrator::default().migrate(value).expect("migrate")
    }

    #[test]
    fn test_legacy_selected_character() {
        let doc = migrate(json!({
            "name": "Legacy",
            "content": {
                "scenes": [
                    { "id": "a", "selectedCharacterId": "c1" },
                    { "id": "b", "selectedCharacterId": "none" },
                    { "id": "c" }
                ]
            }
        }));
        let scenes = &doc.content.scenes;
        assert_eq!(scenes[0].selected_character_ids, vec!["c1".to_string()]);
        assert!(scenes[1].selected_character_ids.is_empty());
        assert!(scenes[2].selected_character_ids.is_empty());
        assert!(scenes[0].extra.get("selectedCharacterId").is_none());
    }

    #[test]
    fn test_existing_selection_wins_over_legacy() {
        let doc = migrate(json!({
            "content": { "scenes": [
                { "id": "a", "selectedCharacterIds": ["x", "y", "x"], "selectedCharacterId": "c1" }
            ] }
        }));
        assert_eq!(doc.content.scenes[0].selected_character_ids, vec!["x", "y"]);
    }

    #[test]
    fn test_image_history_from_legacy_image() {
        let doc = migrate(json!({
            "content": { "scenes": [
                { "id": "a", "imageData": "data:image/png;base64,AAAA" },
                { "id": "b" }
            ] }
        }));
        let first = &doc.content.scenes[0];
        assert_eq!(first.image_history.len(), 1);
        assert_eq!(first.primary_image.as_ref(), first.image_history.first());
        assert!(doc.content.scenes[1].image_history.is_empty());
    }

    #[test]
    fn test_ephemeral_flags_are_dropped() {
        let doc = migrate(json!({
            "content": { "scenes": [
                { "id": "a", "isGenerating": true, "isGeneratingAudio": true, "isGeneratingVideoPrompt": true }
            ] }
        }));
        let serialized = serde_json::to_value(&doc).expect("serialize");
        let scene = &serialized["content"]["scenes"][0];
        assert!(scene.get("isGeneratingAudio").is_none());
        assert!(scene.get("isGenerating").is_none());
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let doc = migrate(json!({ "name": "Bare" }));
        assert!(doc.content.scenes.is_empty());
        assert!(doc.content.characters.is_empty());
        assert_eq!(doc.content.selected_voice, DEFAULT_VOICE);
        assert_eq!(doc.content.video_prompt_note, "");
        assert_eq!(doc.usage_stats, UsageStats::default());
    }

    #[test]
    fn test_character_migration() {
        let doc = migrate(json!({
            "content": { "characters": [
                { "id": "c1", "name": "A", "imageReference": "data:image/png;base64,AA", "isDefault": true },
                { "id": "c2", "name": "B", "isDefault": true },
                { "id": 3, "name": "C", "imageReferences": ["1", "2", "3", "4", "5", "6"] }
            ] }
        }));
        let characters = &doc.content.characters;
        assert_eq!(characters[0].image_references.len(), 1);
        assert!(characters[0].is_default);
        assert!(!characters[1].is_default);
        assert_eq!(characters[2].id, "3");
        assert_eq!(characters[2].image_references.len(), MAX_REFERENCE_IMAGES);
    }

    #[test]
    fn test_missing_scene_ids_are_filled() {
        let doc = migrate(json!({ "content": { "scenes": [ {}, { "id": 7, "sceneId": 7 } ] } }));
        let scenes = &doc.content.scenes;
        assert!(!scenes[0].id.is_empty());
        assert_eq!(scenes[0].scene_id, "1");
        assert_eq!(scenes[1].id, "7");
        assert_eq!(scenes[1].scene_id, "7");
    }

    #[test]
    fn test_migration_is_idempotent() {
        let once = migrate(json!({
            "name": "Twice",
            "lastModified": 1_700_000_000_000i64,
            "content": {
                "stylePrompt": "watercolor",
                "scenes": [
                    { "id": "a", "sceneId": "1", "vietnamese": "Hi", "selectedCharacterId": "c1",
                      "imageData": "data:image/png;base64,AAAA", "isGeneratingAudio": true, "lang1": "x" }
                ],
                "characters": [ { "id": "c1", "imageReference": "data:image/png;base64,BB", "isDefault": true } ]
            }
        }));
        let twice = migrate(serde_json::to_value(&once).expect("serialize"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_bytes() {
        let err = Migrator::default().load(b"{ not json").unwrap_err();
        assert!(matches!(err, StudioError::MalformedProjectFile(_)));
    }

    #[test]
    fn test_wrong_shapes_are_malformed() {
        let migrator = Migrator::default();
        for value in [
            json!([1, 2, 3]),
            json!({ "content": "text" }),
            json!({ "content": { "scenes": 5 } }),
            json!({ "content": { "scenes": ["scene"] } }),
            json!({ "content": { "scenes": [ { "id": "a", "vietnamese": 12 } ] } }),
        ] {
            let err = migrator.migrate(value).unwrap_err();
            assert!(matches!(err, StudioError::MalformedProjectFile(_)));
        }
    }

    #[test]
    fn test_load_bytes() {
        let bytes = br#"{"name":"From disk","content":{"scenes":[{"id":"s1","selectedCharacterId":"c1"}]}}"#;
        let doc = load_project(bytes).expect("load");
        assert_eq!(doc.name, "From disk");
        assert_eq!(doc.content.scenes[0].selected_character_ids, vec!["c1"]);
    }
}
