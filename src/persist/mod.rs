//! Save interface and bulk export.
//!
//! Saving produces the canonical JSON bytes of the current document under a
//! deterministic file name. Writes to disk go through a temp file and a
//! rename so a crash never leaves a truncated project behind.

mod export;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub use export::{asset_file_name, export_archive, ArtifactKind, ExportBundle};

use crate::error::StudioResult;
use crate::project::ProjectDocument;

/// Slug used when a name has no usable characters.
pub const UNTITLED_SLUG: &str = "untitled-project";

struct SlugRules {
    whitespace: Regex,
    disallowed: Regex,
    dash_runs: Regex,
}

fn slug_rules() -> Option<&'static SlugRules> {
    static RULES: OnceLock<Option<SlugRules>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            Some(SlugRules {
                whitespace: Regex::new(r"\s+").ok()?,
                disallowed: Regex::new(r"[^a-z0-9_-]+").ok()?,
                dash_runs: Regex::new(r"-{2,}").ok()?,
            })
        })
        .as_ref()
}

/// Lowercase, decompose and strip combining marks, so accented letters
/// keep their base letter.
fn fold_accents(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        // no canonical decomposition
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect()
}

/// File-system friendly form of a project name.
///
/// Accents are folded to their base letter; after that ASCII letters,
/// digits, `_` and `-` survive and everything else is dropped.
pub fn slugify(name: &str) -> String {
    let slug = slug_rules()
        .map(|rules| {
            let lower = fold_accents(name);
            let dashed = rules.whitespace.replace_all(&lower, "-");
            let stripped = rules.disallowed.replace_all(&dashed, "");
            rules
                .dash_runs
                .replace_all(&stripped, "-")
                .trim_matches('-')
                .to_string()
        })
        .unwrap_or_default();

    if slug.is_empty() {
        UNTITLED_SLUG.to_string()
    } else {
        slug
    }
}

/// `<slug>.json`
pub fn project_file_name(name: &str) -> String {
    format!("{}.json", slugify(name))
}

/// Canonical bytes of a document.
pub fn to_bytes(doc: &ProjectDocument) -> StudioResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(doc)?)
}

/// Write the document into `dir` under its project file name.
pub fn save_to_dir(doc: &ProjectDocument, dir: &Path) -> StudioResult<PathBuf> {
    let path = dir.join(project_file_name(&doc.name));
    write_atomic(&path, &to_bytes(doc)?)?;
    debug!(path = %path.display(), "project saved");
    Ok(path)
}

/// Temp file, sync, rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StudioResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::load_project;
    use tempfile::TempDir;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Film: Part 2"), "my-film-part-2");
        assert_eq!(slugify("  Hello   World  "), "hello-world");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("snake_case ok"), "snake_case-ok");
        assert_eq!(slugify("!!!"), UNTITLED_SLUG);
        assert_eq!(slugify(""), UNTITLED_SLUG);
    }

    #[test]
    fn test_slugify_folds_vietnamese() {
        assert_eq!(slugify("Phở Hà Nội"), "pho-ha-noi");
        assert_eq!(slugify("Đêm trăng Đà Lạt"), "dem-trang-da-lat");
        assert_eq!(project_file_name("Chuyện Cảng Biển"), "chuyen-cang-bien.json");
    }

    #[test]
    fn test_slugify_folds_french() {
        assert_eq!(slugify("Café Story"), "cafe-story");
        assert_eq!(slugify("Noël à Besançon"), "noel-a-besancon");
    }

    #[test]
    fn test_project_file_name() {
        assert_eq!(project_file_name("Harbor Story"), "harbor-story.json");
    }

    #[test]
    fn test_save_to_dir_round_trips_through_loader() {
        let dir = TempDir::new().expect("temp dir");
        let mut doc = ProjectDocument::default();
        doc.name = "Night Market".to_string();
        doc.content.scenes[0].script = "Xin chào".to_string();

        let path = save_to_dir(&doc, dir.path()).expect("save");
        assert_eq!(path, dir.path().join("night-market.json"));
        assert!(!dir.path().join("night-market.json.tmp").exists());

        let bytes = fs::read(&path).expect("read");
        let loaded = load_project(&bytes).expect("load");
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_save_overwrites_previous_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut doc = ProjectDocument::default();
        doc.name = "Draft".to_string();
        save_to_dir(&doc, dir.path()).expect("first save");

        doc.content.style_prompt = "watercolor".to_string();
        let path = save_to_dir(&doc, dir.path()).expect("second save");
        let text = fs::read_to_string(path).expect("read");
        assert!(text.contains("watercolor"));
    }

    #[test]
    fn test_bytes_use_wire_names() {
        let doc = ProjectDocument::default();
        let text = String::from_utf8(to_bytes(&doc).expect("bytes")).expect("utf8");
        assert!(text.contains("\"lastModified\""));
        assert!(text.contains("\"vietnamese\""));
        assert!(text.contains("\"usageStats\""));
    }
}
