//! Billable action kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::history::ActivityKind;

/// Kind of billable generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    GenerateImage,
    EditImage,
    Speech,
    VideoPrompt,
}

impl ActionKind {
    /// Human-readable action name.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::GenerateImage => "Generate Image",
            ActionKind::EditImage => "Edit Image",
            ActionKind::Speech => "Generate TTS Audio",
            ActionKind::VideoPrompt => "Generate Video Prompt",
        }
    }

    /// Model the action is billed against.
    pub fn model(&self) -> &'static str {
        match self {
            ActionKind::GenerateImage | ActionKind::EditImage => "gemini-2.5-flash-image",
            ActionKind::Speech => "gemini-2.5-pro-preview-tts",
            ActionKind::VideoPrompt => "gemini-2.5-flash",
        }
    }

    /// Per-scene activity flag raised while the action runs.
    pub fn activity(&self) -> ActivityKind {
        match self {
            ActionKind::GenerateImage | ActionKind::EditImage => ActivityKind::Image,
            ActionKind::Speech => ActivityKind::Audio,
            ActionKind::VideoPrompt => ActivityKind::VideoPrompt,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A-priori output token counts per action kind.
///
/// These are static per kind, not derived from the request content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEstimates {
    pub image: u64,
    pub image_edit: u64,
    pub speech: u64,
    pub video_prompt: u64,
}

impl Default for OutputEstimates {
    fn default() -> Self {
        Self {
            image: 258,
            image_edit: 258,
            speech: 100,
            video_prompt: 500,
        }
    }
}

impl OutputEstimates {
    pub fn for_kind(&self, kind: ActionKind) -> u64 {
        match kind {
            ActionKind::GenerateImage => self.image,
            ActionKind::EditImage => self.image_edit,
            ActionKind::Speech => self.speech,
            ActionKind::VideoPrompt => self.video_prompt,
        }
    }
}
