//! The application object tying project state, the cost gate and the
//! generation capability together.
//!
//! # Overview
//!
//! A [`Studio`] owns one [`ProjectStore`]. Non-billable edits go straight
//! through the store. Billable generation is a two-step affair:
//! a `request_*` call validates the scene, estimates the cost and parks the
//! action in the gate; [`Studio::confirm`] runs it and reconciles the
//! reported usage. Results are merged by scene id into whatever document is
//! current when they arrive, so edits made while a generation was in flight
//! survive.
//!
//! # Example
//!
//! ```ignore
//! let studio = Studio::new(StudioConfig::default(), capability)
//!     .with_credential(Credential::from_env());
//!
//! let estimate = studio.request_image("2", None)?;
//! println!("about {}", format_currency(estimate.total_cost));
//! let receipt = studio.confirm().await?;
//! println!("{}", receipt.summary());
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::time::Instant;
use tracing::{info, warn};

use crate::budget::TokenCount;
use crate::capability::{
    Artifact, CharacterBrief, Credential, GenerationCapability, GenerationRequest, ImageEditRequest,
    ImageRequest, SceneContext, SpeechRequest, VideoPromptRequest,
};
use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::gate::{
    ActionKind, BillableAction, CostEstimate, CostGate, CostNotification, CostReceipt, GatePhase,
};
use crate::history::{ActivityKind, ProjectStore};
use crate::migrate::Migrator;
use crate::persist::{self, ArtifactKind, ExportBundle};
use crate::project::{ProjectContent, ProjectDocument, Scene};

/// Number of preceding scenes sent as context for image generation.
const IMAGE_CONTEXT_SCENES: usize = 2;

/// A billable request bound to the scene its result belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedGeneration {
    pub scene_id: String,
    pub request: GenerationRequest,
}

pub struct Studio {
    config: StudioConfig,
    store: ProjectStore,
    migrator: Migrator,
    capability: Arc<dyn GenerationCapability>,
    credential: RwLock<Option<Credential>>,
    gate: Mutex<CostGate<PlannedGeneration>>,
    notification: Mutex<Option<CostNotification>>,
}

impl Studio {
    /// Create a studio holding a fresh empty project.
    pub fn new(config: StudioConfig, capability: Arc<dyn GenerationCapability>) -> Self {
        let document = ProjectDocument::new_empty(config.default_voice.clone());
        let gate = CostGate::new(config.pricing, config.estimator(), config.output_estimates);
        Self {
            store: ProjectStore::with_limit(document, config.history_limit),
            migrator: Migrator::new(config.default_voice.clone()),
            capability,
            credential: RwLock::new(None),
            gate: Mutex::new(gate),
            notification: Mutex::new(None),
            config,
        }
    }

    pub fn with_credential(self, credential: Option<Credential>) -> Self {
        self.set_credential(credential);
        self
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// The current document.
    pub fn document(&self) -> Arc<ProjectDocument> {
        self.store.present()
    }

    pub fn set_credential(&self, credential: Option<Credential>) {
        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = credential;
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    fn credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_gate(&self) -> MutexGuard<'_, CostGate<PlannedGeneration>> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_notification(&self) -> MutexGuard<'_, Option<CostNotification>> {
        self.notification.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Load / save

    /// Replace the current project with a blank one.
    pub fn new_project(&self) {
        self.lock_gate().cancel();
        self.store
            .reset(ProjectDocument::new_empty(self.config.default_voice.clone()));
        info!("new project created");
    }

    /// Load and migrate a project file.
    ///
    /// On failure the current document and its history are kept.
    pub fn load(&self, bytes: &[u8]) -> StudioResult<()> {
        let document = self.migrator.load(bytes)?;
        info!(
            name = %document.name,
            scenes = document.content.scenes.len(),
            characters = document.content.characters.len(),
            "project loaded"
        );
        self.lock_gate().cancel();
        self.store.reset(document);
        Ok(())
    }

    /// Canonical bytes of the current document.
    pub fn save_bytes(&self) -> StudioResult<Vec<u8>> {
        persist::to_bytes(&self.document())
    }

    pub fn file_name(&self) -> String {
        persist::project_file_name(&self.document().name)
    }

    pub fn save_to_dir(&self, dir: &Path) -> StudioResult<PathBuf> {
        persist::save_to_dir(&self.document(), dir)
    }

    pub fn export(&self, kind: ArtifactKind) -> StudioResult<Option<ExportBundle>> {
        persist::export_archive(&self.document(), kind)
    }

    // Non-billable edits

    /// Apply an edit to the project content as one undoable step.
    pub fn edit<R, F>(&self, edit: F) -> StudioResult<R>
    where
        F: FnOnce(&mut ProjectContent) -> StudioResult<R>,
    {
        self.store.update(|doc| edit(&mut doc.content))
    }

    pub fn rename_project(&self, name: impl Into<String>) -> StudioResult<()> {
        let name = name.into();
        self.store.update(|doc| {
            doc.name = name;
            Ok(())
        })
    }

    /// Reactivate an earlier image version of a scene.
    pub fn promote_image_version(&self, scene_id: &str, index: usize) -> StudioResult<()> {
        self.edit(|content| content.scene_mut(scene_id)?.promote_version(index))
    }

    pub fn undo(&self) -> bool {
        self.store.undo()
    }

    pub fn redo(&self) -> bool {
        self.store.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn is_generating(&self, scene_id: &str, kind: ActivityKind) -> bool {
        self.store.is_active(scene_id, kind)
    }

    // Billable actions

    pub fn request_image(&self, scene_id: &str, prompt_override: Option<&str>) -> StudioResult<CostEstimate> {
        self.submit(|doc| plan_image(doc, scene_id, prompt_override))
    }

    pub fn request_image_edit(&self, scene_id: &str, instruction: &str) -> StudioResult<CostEstimate> {
        self.submit(|doc| plan_image_edit(doc, scene_id, instruction))
    }

    pub fn request_speech(&self, scene_id: &str) -> StudioResult<CostEstimate> {
        self.submit(|doc| plan_speech(doc, scene_id))
    }

    pub fn request_video_prompt(&self, scene_id: &str) -> StudioResult<CostEstimate> {
        self.submit(|doc| plan_video_prompt(doc, scene_id))
    }

    fn submit<F>(&self, prepare: F) -> StudioResult<CostEstimate>
    where
        F: FnOnce(&ProjectDocument) -> StudioResult<BillableAction<PlannedGeneration>>,
    {
        let credential = self.credential();
        let document = self.document();
        self.lock_gate()
            .submit(credential.as_ref(), || prepare(&document))
    }

    pub fn pending_estimate(&self) -> Option<CostEstimate> {
        self.lock_gate().pending().cloned()
    }

    pub fn pending_plan(&self) -> Option<PlannedGeneration> {
        self.lock_gate().pending_payload().cloned()
    }

    pub fn gate_phase(&self) -> GatePhase {
        self.lock_gate().phase()
    }

    /// Discard the action awaiting confirmation.
    pub fn cancel(&self) -> Option<CostEstimate> {
        self.lock_gate().cancel()
    }

    /// Execute the action awaiting confirmation.
    ///
    /// The scene's activity flag is raised for the duration of the call and
    /// cleared on every exit path. A result whose scene was deleted in the
    /// meantime is dropped, but the reported usage is still accrued. If the
    /// whole project was replaced by [`new_project`](Self::new_project) or
    /// [`load`](Self::load) while the call ran, nothing is committed to the
    /// replacement and `ProjectReplaced` is returned.
    pub async fn confirm(&self) -> StudioResult<CostReceipt> {
        let credential = self.credential().ok_or(StudioError::CredentialMissing)?;
        let confirmed = self.lock_gate().confirm()?;

        let scene_id = confirmed.payload().scene_id.clone();
        let kind = confirmed.estimate().action;
        let _activity = self.store.begin_activity(&scene_id, kind.activity());
        let capability = Arc::clone(&self.capability);

        let receipt = confirmed
            .execute(
                &self.store,
                move |plan: PlannedGeneration| async move {
                    plan.request.invoke(&*capability, &credential).await
                },
                |doc, artifact| commit_artifact(doc, &scene_id, artifact),
            )
            .await?;

        *self.lock_notification() = Some(CostNotification::new(
            receipt.clone(),
            self.config.notification_delay(),
        ));
        Ok(receipt)
    }

    /// Accrue usage reported by a collaborator outside the gate, such as
    /// the script chat. Returns the priced cost.
    pub fn accrue_external_usage(&self, usage: TokenCount) -> StudioResult<f64> {
        let pricing = self.config.pricing;
        let cost = self
            .store
            .update(|doc| Ok(doc.usage_stats.accrue_priced(usage, &pricing)))?;
        info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "external usage accrued"
        );
        Ok(cost)
    }

    /// The latest receipt, while its notification is still visible.
    pub fn notification(&self) -> Option<CostReceipt> {
        self.notification_at(Instant::now())
    }

    pub fn notification_at(&self, now: Instant) -> Option<CostReceipt> {
        let mut slot = self.lock_notification();
        let visible = slot
            .as_ref()
            .filter(|note| note.is_visible_at(now))
            .map(|note| note.receipt().clone());
        if visible.is_none() {
            *slot = None;
        }
        visible
    }

    pub fn dismiss_notification(&self) {
        *self.lock_notification() = None;
    }
}

fn locate<'a>(content: &'a ProjectContent, scene_id: &str) -> StudioResult<(usize, &'a Scene)> {
    content
        .scene_index(scene_id)
        .map(|index| (index, &content.scenes[index]))
        .ok_or_else(|| StudioError::SceneNotFound(scene_id.to_string()))
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn selected_characters(content: &ProjectContent, scene: &Scene) -> Vec<CharacterBrief> {
    content
        .characters
        .iter()
        .filter(|character| scene.has_character(&character.id))
        .map(|character| CharacterBrief {
            name: character.name.clone(),
            description: character.description.clone(),
            image_references: character.image_references.clone(),
        })
        .collect()
}

fn billable(
    kind: ActionKind,
    scene_id: &str,
    input_parts: &[&str],
    request: GenerationRequest,
) -> BillableAction<PlannedGeneration> {
    BillableAction {
        kind,
        input_text: input_parts.join(" "),
        payload: PlannedGeneration {
            scene_id: scene_id.to_string(),
            request,
        },
    }
}

fn plan_image(
    doc: &ProjectDocument,
    scene_id: &str,
    prompt_override: Option<&str>,
) -> StudioResult<BillableAction<PlannedGeneration>> {
    let content = &doc.content;
    let (index, scene) = locate(content, scene_id)?;
    let context = prompt_override
        .filter(|text| !is_blank(text))
        .unwrap_or(scene.visual_description.as_str());

    if is_blank(&content.style_prompt) && is_blank(context) && is_blank(&scene.script) {
        return Err(StudioError::ValidationFailed(format!(
            "scene {} needs a style, description or script before an image can be generated",
            scene.scene_id
        )));
    }

    let characters = selected_characters(content, scene);
    let characters_json = serde_json::to_string(&characters)?;
    let previous_scenes = content.scenes[index.saturating_sub(IMAGE_CONTEXT_SCENES)..index]
        .iter()
        .map(|prev| SceneContext {
            script: prev.script.clone(),
            prompt: prev.visual_description.clone(),
        })
        .collect();

    let request = ImageRequest {
        style_prompt: content.style_prompt.clone(),
        visual_description: context.to_string(),
        script: scene.script.clone(),
        characters,
        previous_scenes,
    };
    Ok(billable(
        ActionKind::GenerateImage,
        scene_id,
        &[
            content.style_prompt.as_str(),
            context,
            scene.script.as_str(),
            characters_json.as_str(),
        ],
        GenerationRequest::Image(request),
    ))
}

fn plan_image_edit(
    doc: &ProjectDocument,
    scene_id: &str,
    instruction: &str,
) -> StudioResult<BillableAction<PlannedGeneration>> {
    let content = &doc.content;
    let (_, scene) = locate(content, scene_id)?;
    let base_image = scene.primary_image.clone().ok_or_else(|| {
        StudioError::ValidationFailed(format!("scene {} has no image to edit", scene.scene_id))
    })?;
    if is_blank(instruction) {
        return Err(StudioError::ValidationFailed(
            "an edit instruction is required".to_string(),
        ));
    }

    let characters_json = serde_json::to_string(&selected_characters(content, scene))?;
    let request = ImageEditRequest {
        base_image,
        instruction: instruction.to_string(),
    };
    Ok(billable(
        ActionKind::EditImage,
        scene_id,
        &[
            content.style_prompt.as_str(),
            instruction,
            scene.script.as_str(),
            characters_json.as_str(),
        ],
        GenerationRequest::ImageEdit(request),
    ))
}

fn plan_speech(doc: &ProjectDocument, scene_id: &str) -> StudioResult<BillableAction<PlannedGeneration>> {
    let (_, scene) = locate(&doc.content, scene_id)?;
    if is_blank(&scene.script) {
        return Err(StudioError::ValidationFailed(format!(
            "scene {} has no script to voice",
            scene.scene_id
        )));
    }

    let request = SpeechRequest {
        text: scene.script.clone(),
        voice: doc.content.selected_voice.clone(),
    };
    Ok(billable(
        ActionKind::Speech,
        scene_id,
        &[scene.script.as_str()],
        GenerationRequest::Speech(request),
    ))
}

fn plan_video_prompt(
    doc: &ProjectDocument,
    scene_id: &str,
) -> StudioResult<BillableAction<PlannedGeneration>> {
    let content = &doc.content;
    let (index, scene) = locate(content, scene_id)?;
    let current_image = match (&scene.primary_image, is_blank(&scene.script)) {
        (Some(image), false) => image.clone(),
        _ => {
            return Err(StudioError::ValidationFailed(format!(
                "scene {} needs a script and an image before a video prompt can be generated",
                scene.scene_id
            )))
        }
    };

    let prev = index.checked_sub(1).and_then(|i| content.scenes.get(i));
    let next = content.scenes.get(index + 1);
    let request = VideoPromptRequest {
        current_script: scene.script.clone(),
        current_image,
        current_context: scene.visual_description.clone(),
        prev_script: prev.map(|s| s.script.clone()).unwrap_or_default(),
        prev_context: prev.map(|s| s.visual_description.clone()).unwrap_or_default(),
        next_script: next.map(|s| s.script.clone()).unwrap_or_default(),
        next_context: next.map(|s| s.visual_description.clone()).unwrap_or_default(),
        global_note: content.video_prompt_note.clone(),
    };
    let input_text = serde_json::to_string(&request)?;
    Ok(billable(
        ActionKind::VideoPrompt,
        scene_id,
        &[input_text.as_str()],
        GenerationRequest::VideoPrompt(request),
    ))
}

/// Store a generation result on its scene, looked up by id in the latest
/// document.
fn commit_artifact(doc: &mut ProjectDocument, scene_id: &str, artifact: Artifact) {
    let Ok(scene) = doc.content.scene_mut(scene_id) else {
        warn!(scene = scene_id, "scene was removed while generating; result dropped");
        return;
    };
    match artifact {
        Artifact::Image(image) => scene.record_generation(image),
        Artifact::Audio(audio) => scene.audio = Some(audio),
        Artifact::Text(prompt) => scene.video_prompt = Some(prompt),
    }
}
