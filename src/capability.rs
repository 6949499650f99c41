//! The external generation capability.
//!
//! Image, audio and text generation are provided by a third-party service
//! and consumed through [`GenerationCapability`]. Every call returns the
//! artifact together with the usage the service reported.

use std::env;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::budget::TokenCount;
use crate::gate::ActionKind;
use crate::project::AssetHandle;

/// Environment variable holding the service credential.
pub const CREDENTIAL_ENV_VAR: &str = "SCENECRAFT_API_KEY";

/// Secret used to authenticate against the generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key; blank keys are rejected.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Read the credential from the environment.
    pub fn from_env() -> Option<Self> {
        env::var(CREDENTIAL_ENV_VAR).ok().and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Errors reported by the generation service.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The transport gave up waiting.
    #[error("request timed out")]
    Timeout,

    /// The service answered without an artifact.
    #[error("no {0} was generated")]
    EmptyResult(&'static str),

    /// The service rejected the request.
    #[error("{0}")]
    Rejected(String),
}

/// Artifact plus the usage reported for producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub output: T,
    pub usage: TokenCount,
}

impl<T> Generated<T> {
    pub fn new(output: T, prompt_tokens: u64, candidates_tokens: u64) -> Self {
        Self {
            output,
            usage: TokenCount::new(prompt_tokens, candidates_tokens),
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        Generated {
            output: f(self.output),
            usage: self.usage,
        }
    }
}

/// Character data sent along with an image request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterBrief {
    pub name: String,
    pub description: String,
    pub image_references: Vec<AssetHandle>,
}

/// Script and visual description of a neighbouring scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneContext {
    pub script: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub style_prompt: String,
    pub visual_description: String,
    pub script: String,
    pub characters: Vec<CharacterBrief>,
    /// Up to two preceding scenes, in story order
    pub previous_scenes: Vec<SceneContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEditRequest {
    pub base_image: AssetHandle,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPromptRequest {
    pub current_script: String,
    pub current_image: AssetHandle,
    pub current_context: String,
    pub prev_script: String,
    pub prev_context: String,
    pub next_script: String,
    pub next_context: String,
    pub global_note: String,
}

/// A request of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Image(ImageRequest),
    ImageEdit(ImageEditRequest),
    Speech(SpeechRequest),
    VideoPrompt(VideoPromptRequest),
}

impl GenerationRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            GenerationRequest::Image(_) => ActionKind::GenerateImage,
            GenerationRequest::ImageEdit(_) => ActionKind::EditImage,
            GenerationRequest::Speech(_) => ActionKind::Speech,
            GenerationRequest::VideoPrompt(_) => ActionKind::VideoPrompt,
        }
    }

    /// Dispatch to the matching capability operation.
    pub async fn invoke<G>(
        &self,
        capability: &G,
        credential: &Credential,
    ) -> Result<Generated<Artifact>, CapabilityError>
    where
        G: GenerationCapability + ?Sized,
    {
        let generated = match self {
            GenerationRequest::Image(request) => capability
                .generate_image(credential, request)
                .await?
                .map(Artifact::Image),
            GenerationRequest::ImageEdit(request) => capability
                .edit_image(credential, request)
                .await?
                .map(Artifact::Image),
            GenerationRequest::Speech(request) => capability
                .generate_speech(credential, request)
                .await?
                .map(Artifact::Audio),
            GenerationRequest::VideoPrompt(request) => capability
                .generate_video_prompt(credential, request)
                .await?
                .map(Artifact::Text),
        };
        Ok(generated)
    }
}

/// Output of a generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Image(AssetHandle),
    Audio(AssetHandle),
    Text(String),
}

/// Operations offered by the generation service, one per action kind.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    async fn generate_image(
        &self,
        credential: &Credential,
        request: &ImageRequest,
    ) -> Result<Generated<AssetHandle>, CapabilityError>;

    async fn edit_image(
        &self,
        credential: &Credential,
        request: &ImageEditRequest,
    ) -> Result<Generated<AssetHandle>, CapabilityError>;

    async fn generate_speech(
        &self,
        credential: &Credential,
        request: &SpeechRequest,
    ) -> Result<Generated<AssetHandle>, CapabilityError>;

    async fn generate_video_prompt(
        &self,
        credential: &Credential,
        request: &VideoPromptRequest,
    ) -> Result<Generated<String>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl GenerationCapability for Echo {
        async fn generate_image(
            &self,
            _credential: &Credential,
            request: &ImageRequest,
        ) -> Result<Generated<AssetHandle>, CapabilityError> {
            let handle = AssetHandle::from_bytes("image/png", request.visual_description.as_bytes());
            Ok(Generated::new(handle, 10, 258))
        }

        async fn edit_image(
            &self,
            _credential: &Credential,
            _request: &ImageEditRequest,
        ) -> Result<Generated<AssetHandle>, CapabilityError> {
            Err(CapabilityError::EmptyResult("image"))
        }

        async fn generate_speech(
            &self,
            _credential: &Credential,
            _request: &SpeechRequest,
        ) -> Result<Generated<AssetHandle>, CapabilityError> {
            Err(CapabilityError::Timeout)
        }

        async fn generate_video_prompt(
            &self,
            _credential: &Credential,
            request: &VideoPromptRequest,
        ) -> Result<Generated<String>, CapabilityError> {
            Ok(Generated::new(request.current_script.to_uppercase(), 5, 7))
        }
    }

    fn credential() -> Credential {
        Credential::new("key").expect("credential")
    }

    #[test]
    fn test_blank_credential_rejected() {
        assert!(Credential::new("   ").is_none());
        assert!(Credential::new("abc").is_some());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        assert_eq!(format!("{:?}", credential()), "Credential(****)");
    }

    #[tokio::test]
    async fn test_invoke_dispatches_by_kind() {
        let request = GenerationRequest::Image(ImageRequest {
            style_prompt: String::new(),
            visual_description: "harbor".to_string(),
            script: String::new(),
            characters: Vec::new(),
            previous_scenes: Vec::new(),
        });
        assert_eq!(request.kind(), ActionKind::GenerateImage);

        let generated = request.invoke(&Echo, &credential()).await.expect("generate");
        assert!(matches!(generated.output, Artifact::Image(_)));
        assert_eq!(generated.usage, TokenCount::new(10, 258));
    }

    #[tokio::test]
    async fn test_invoke_propagates_failure() {
        let request = GenerationRequest::Speech(SpeechRequest {
            text: "hello".to_string(),
            voice: "Sadachbia".to_string(),
        });
        let err = request.invoke(&Echo, &credential()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Timeout));
    }
}
