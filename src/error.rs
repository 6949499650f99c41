//! Error taxonomy for project state and billable operations.
//!
//! Every variant is handled at the boundary where the action was initiated;
//! none of them is meant to abort the process.

use std::io;

use thiserror::Error;

use crate::gate::ActionKind;

/// Errors surfaced by studio operations.
#[derive(Error, Debug)]
pub enum StudioError {
    /// No credential for the generation capability has been provided.
    #[error("A credential for the generation service is required")]
    CredentialMissing,

    /// The project file could not be parsed as a structured document.
    #[error("Malformed project file: {0}")]
    MalformedProjectFile(String),

    /// The action has no usable input and was rejected before any call.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The external generation capability failed or timed out.
    #[error("{action} failed: {message}")]
    GenerationFailed { action: ActionKind, message: String },

    /// The project was replaced while a generation was running; its result
    /// was discarded.
    #[error("{0} finished after the project was replaced; result discarded")]
    ProjectReplaced(ActionKind),

    /// A bounded collection would overflow.
    #[error("Capacity exceeded: at most {limit} allowed, {requested} requested")]
    CapacityExceeded { limit: usize, requested: usize },

    /// No scene with the given identifier exists in the current document.
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    /// No character with the given identifier exists in the current document.
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    /// `confirm` was called with nothing awaiting confirmation.
    #[error("No billable action is awaiting confirmation")]
    NoPendingAction,

    /// An asset handle is not a decodable data URI.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive writer error.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Configuration could not be assembled.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

impl StudioError {
    /// Stable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            StudioError::CredentialMissing => "credential_missing",
            StudioError::MalformedProjectFile(_) => "malformed_project_file",
            StudioError::ValidationFailed(_) => "validation_failed",
            StudioError::GenerationFailed { .. } => "generation_failed",
            StudioError::ProjectReplaced(_) => "project_replaced",
            StudioError::CapacityExceeded { .. } => "capacity_exceeded",
            StudioError::SceneNotFound(_) => "scene_not_found",
            StudioError::CharacterNotFound(_) => "character_not_found",
            StudioError::NoPendingAction => "no_pending_action",
            StudioError::InvalidAsset(_) => "invalid_asset",
            StudioError::Io(_) => "io",
            StudioError::Json(_) => "json",
            StudioError::Archive(_) => "archive",
            StudioError::Config(_) => "config",
        }
    }

    /// Whether the initiating caller can report the error and carry on.
    /// Only a broken archive writer leaves nothing sensible to retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StudioError::Archive(_))
    }

    /// Whether the user should be routed to credential entry.
    pub fn needs_credential(&self) -> bool {
        matches!(self, StudioError::CredentialMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(StudioError::CredentialMissing.label(), "credential_missing");
        assert_eq!(
            StudioError::CapacityExceeded { limit: 5, requested: 6 }.label(),
            "capacity_exceeded"
        );
    }

    #[test]
    fn test_generation_failed_message_names_action() {
        let err = StudioError::GenerationFailed {
            action: ActionKind::Speech,
            message: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Generate TTS Audio failed: timeout");
    }

    #[test]
    fn test_project_replaced_message() {
        let err = StudioError::ProjectReplaced(ActionKind::GenerateImage);
        assert_eq!(err.label(), "project_replaced");
        assert_eq!(
            err.to_string(),
            "Generate Image finished after the project was replaced; result discarded"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(StudioError::ValidationFailed("empty".to_string()).is_recoverable());
        assert!(StudioError::MalformedProjectFile("eof".to_string()).is_recoverable());
        assert!(!StudioError::Archive(zip::result::ZipError::FileNotFound).is_recoverable());
    }

    #[test]
    fn test_needs_credential() {
        assert!(StudioError::CredentialMissing.needs_credential());
        assert!(!StudioError::NoPendingAction.needs_credential());
    }
}
