//! Scene collection operations.

use uuid::Uuid;

use super::model::{ProjectContent, Scene};
use crate::error::{StudioError, StudioResult};

/// Column written by `apply_script_lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptColumn {
    Script,
    VisualDescription,
}

/// A scene row coming from a spreadsheet import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedScene {
    /// Display label; position is used when empty
    pub label: String,
    pub script: String,
    pub visual_description: String,
}

impl ProjectContent {
    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    /// Position of a scene in story order.
    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }

    pub fn scene_mut(&mut self, id: &str) -> StudioResult<&mut Scene> {
        self.scenes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))
    }

    fn new_scene(&self, label: String) -> Scene {
        let default_character = self.default_character().map(|c| c.id.as_str());
        Scene::blank(Uuid::new_v4().to_string(), label, default_character)
    }

    /// Append a blank scene and return its id.
    pub fn add_scene(&mut self) -> String {
        let scene = self.new_scene((self.scenes.len() + 1).to_string());
        let id = scene.id.clone();
        self.scenes.push(scene);
        id
    }

    /// Remove a scene together with its ledger.
    pub fn remove_scene(&mut self, id: &str) -> StudioResult<Scene> {
        let index = self
            .scene_index(id)
            .ok_or_else(|| StudioError::SceneNotFound(id.to_string()))?;
        Ok(self.scenes.remove(index))
    }

    pub fn update_script(&mut self, id: &str, script: impl Into<String>) -> StudioResult<()> {
        self.scene_mut(id)?.script = script.into();
        Ok(())
    }

    pub fn update_visual_description(&mut self, id: &str, text: impl Into<String>) -> StudioResult<()> {
        self.scene_mut(id)?.visual_description = text.into();
        Ok(())
    }

    pub fn set_scene_label(&mut self, id: &str, label: impl Into<String>) -> StudioResult<()> {
        self.scene_mut(id)?.scene_id = label.into();
        Ok(())
    }

    /// Toggle a character in a scene's selection; returns whether it is
    /// selected afterwards.
    pub fn toggle_character(&mut self, scene_id: &str, character_id: &str) -> StudioResult<bool> {
        if self.character(character_id).is_none() {
            return Err(StudioError::CharacterNotFound(character_id.to_string()));
        }
        let scene = self.scene_mut(scene_id)?;
        if scene.has_character(character_id) {
            scene.selected_character_ids.retain(|id| id != character_id);
            Ok(false)
        } else {
            scene.selected_character_ids.push(character_id.to_string());
            Ok(true)
        }
    }

    pub fn set_video_prompt(&mut self, id: &str, prompt: Option<String>) -> StudioResult<()> {
        self.scene_mut(id)?.video_prompt = prompt;
        Ok(())
    }

    pub fn set_motion_prompt(
        &mut self,
        id: &str,
        name: impl Into<String>,
        prompt: impl Into<String>,
    ) -> StudioResult<()> {
        let scene = self.scene_mut(id)?;
        scene.motion_prompt_name = Some(name.into());
        scene.motion_prompt = Some(prompt.into());
        Ok(())
    }

    /// Replace all scenes with imported rows.
    pub fn import_scenes(&mut self, rows: Vec<ImportedScene>) {
        let scenes = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let label = if row.label.trim().is_empty() {
                    (index + 1).to_string()
                } else {
                    row.label
                };
                let mut scene = self.new_scene(label);
                scene.script = row.script;
                scene.visual_description = row.visual_description;
                scene
            })
            .collect();
        self.scenes = scenes;
    }

    /// Write one line per scene into the given column, appending blank
    /// scenes when there are more lines than scenes.
    pub fn apply_script_lines(&mut self, lines: &[String], column: ScriptColumn) {
        while self.scenes.len() < lines.len() {
            let scene = self.new_scene((self.scenes.len() + 1).to_string());
            self.scenes.push(scene);
        }
        for (scene, line) in self.scenes.iter_mut().zip(lines) {
            match column {
                ScriptColumn::Script => scene.script = line.clone(),
                ScriptColumn::VisualDescription => scene.visual_description = line.clone(),
            }
        }
    }
}
