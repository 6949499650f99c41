//! Bulk export of generated artifacts as zip archives.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::slugify;
use crate::error::StudioResult;
use crate::project::{AssetHandle, ProjectDocument, Scene};

/// Artifact kind that can be exported in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Audio,
}

impl ArtifactKind {
    fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Audio => "wav",
        }
    }

    fn archive_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "images",
            ArtifactKind::Audio => "voice",
        }
    }

    fn artifact<'a>(&self, scene: &'a Scene) -> Option<&'a AssetHandle> {
        match self {
            ArtifactKind::Image => scene.primary_image.as_ref(),
            ArtifactKind::Audio => scene.audio.as_ref(),
        }
    }
}

/// A finished archive ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Download name for a single scene artifact: `<sceneId>.png` / `<sceneId>.wav`.
pub fn asset_file_name(scene: &Scene, kind: ArtifactKind) -> String {
    let label: String = scene
        .scene_id
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    let stem = if label.is_empty() { scene.id.as_str() } else { label.as_str() };
    format!("{}.{}", stem, kind.extension())
}

/// Package every scene artifact of `kind`, keyed by scene label.
///
/// Returns `Ok(None)` when no scene has such an artifact. Scene labels are
/// not unique; repeated labels get a numeric suffix.
pub fn export_archive(doc: &ProjectDocument, kind: ArtifactKind) -> StudioResult<Option<ExportBundle>> {
    let eligible: Vec<(&Scene, &AssetHandle)> = doc
        .content
        .scenes
        .iter()
        .filter_map(|scene| kind.artifact(scene).map(|asset| (scene, asset)))
        .collect();

    if eligible.is_empty() {
        info!(kind = ?kind, "nothing to export");
        return Ok(None);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(eligible.len());

    for (scene, asset) in eligible {
        let bytes = asset.decode()?;
        let name = unique_name(&mut used, asset_file_name(scene, kind));
        debug!(entry = %name, size = bytes.len(), "adding archive entry");
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&bytes)?;
        entries.push(name);
    }

    let bytes = writer.finish()?.into_inner();
    let file_name = format!("{}-{}.zip", slugify(&doc.name), kind.archive_suffix());
    info!(file = %file_name, entries = entries.len(), "export archive built");

    Ok(Some(ExportBundle {
        file_name,
        bytes,
        entries,
    }))
}

fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, extension) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}).{}", stem, n, extension);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
