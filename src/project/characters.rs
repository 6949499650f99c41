//! Character collection operations.
//!
//! At most one character is the default. New and imported scenes adopt the
//! default character as their initial selection.

use uuid::Uuid;

use super::model::{AssetHandle, Character, ProjectContent, MAX_REFERENCE_IMAGES};
use crate::error::{StudioError, StudioResult};

impl ProjectContent {
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    fn character_mut(&mut self, id: &str) -> StudioResult<&mut Character> {
        self.characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StudioError::CharacterNotFound(id.to_string()))
    }

    /// The current default character, if any.
    pub fn default_character(&self) -> Option<&Character> {
        self.characters.iter().find(|c| c.is_default)
    }

    /// Append a new character and return its id.
    ///
    /// The first character of an empty collection becomes the default.
    pub fn add_character(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        let character = Character {
            id: id.clone(),
            name: format!("Character {}", self.characters.len() + 1),
            description: String::new(),
            image_references: Vec::new(),
            is_default: self.characters.is_empty(),
        };
        self.characters.push(character);
        id
    }

    /// Remove a character.
    ///
    /// If it was the default, the new first character takes over.
    pub fn remove_character(&mut self, id: &str) -> StudioResult<Character> {
        let index = self
            .characters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StudioError::CharacterNotFound(id.to_string()))?;
        let removed = self.characters.remove(index);
        if removed.is_default {
            if let Some(first) = self.characters.first_mut() {
                first.is_default = true;
            }
        }
        Ok(removed)
    }

    /// Make exactly this character the default.
    pub fn set_default_character(&mut self, id: &str) -> StudioResult<()> {
        self.character_mut(id)?;
        for character in &mut self.characters {
            character.is_default = character.id == id;
        }
        Ok(())
    }

    /// Replace name and description in one edit.
    pub fn update_character(
        &mut self,
        id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> StudioResult<()> {
        let character = self.character_mut(id)?;
        character.name = name.into();
        character.description = description.into();
        Ok(())
    }

    pub fn rename_character(&mut self, id: &str, name: impl Into<String>) -> StudioResult<()> {
        self.character_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn describe_character(&mut self, id: &str, description: impl Into<String>) -> StudioResult<()> {
        self.character_mut(id)?.description = description.into();
        Ok(())
    }

    /// Attach reference images; all or nothing.
    pub fn add_reference_images(&mut self, id: &str, images: Vec<AssetHandle>) -> StudioResult<()> {
        let character = self.character_mut(id)?;
        let requested = character.image_references.len() + images.len();
        if requested > MAX_REFERENCE_IMAGES {
            return Err(StudioError::CapacityExceeded {
                limit: MAX_REFERENCE_IMAGES,
                requested,
            });
        }
        character.image_references.extend(images);
        Ok(())
    }

    pub fn remove_reference_image(&mut self, id: &str, index: usize) -> StudioResult<AssetHandle> {
        let character = self.character_mut(id)?;
        if index >= character.image_references.len() {
            return Err(StudioError::ValidationFailed(format!(
                "character {} has no reference image #{}",
                id, index
            )));
        }
        Ok(character.image_references.remove(index))
    }
}
