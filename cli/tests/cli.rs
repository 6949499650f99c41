//! Integration tests for the scenecraft binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Project written by an older release: singular character selection,
/// single reference image, numeric scene ids, a leftover in-flight flag.
const LEGACY_PROJECT: &str = r#"{
    "name": "Harbor Story",
    "lastModified": 1700000000000,
    "content": {
        "stylePrompt": "watercolor",
        "scenes": [
            {"id": 1, "sceneId": "1", "vietnamese": "Dawn", "contextPrompt": "pier",
             "selectedCharacterId": "c1", "isGeneratingAudio": true,
             "imageData": "data:image/png;base64,aW1hZ2U="},
            {"id": 2, "sceneId": "2", "vietnamese": "Boat", "contextPrompt": "sea",
             "selectedCharacterId": "none"}
        ],
        "characters": [
            {"id": "c1", "name": "Lan", "description": "fisher girl",
             "imageReference": "data:image/png;base64,cmVm", "isDefault": true}
        ]
    }
}"#;

fn scenecraft(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scenecraft").expect("binary");
    cmd.arg("--config").arg(config_dir.join("absent.toml"));
    cmd
}

fn write_project(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("project.json");
    fs::write(&path, contents).expect("write project");
    path
}

#[test]
fn test_inspect_legacy_project() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), LEGACY_PROJECT);

    scenecraft(temp.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Harbor Story"))
        .stdout(predicate::str::contains("2 scenes, 1 characters"))
        .stdout(predicate::str::contains("1 images (1 versions)"));
}

#[test]
fn test_inspect_json_summary() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), LEGACY_PROJECT);

    let output = scenecraft(temp.path())
        .arg("inspect")
        .arg("--json")
        .arg(&file)
        .output()
        .expect("run");
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(summary["name"], "Harbor Story");
    assert_eq!(summary["scenes"], 2);
    assert_eq!(summary["totalCost"], 0.0);
}

#[test]
fn test_inspect_malformed_file_fails() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), "{ \"content\": ");

    scenecraft(temp.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed project file"));
}

#[test]
fn test_migrate_writes_canonical_file() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), LEGACY_PROJECT);
    let out = temp.path().join("out");

    scenecraft(temp.path())
        .arg("migrate")
        .arg(&file)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("harbor-story.json"));

    let text = fs::read_to_string(out.join("harbor-story.json")).expect("read migrated");
    let migrated: serde_json::Value = serde_json::from_str(&text).expect("json");
    let scene = &migrated["content"]["scenes"][0];
    assert_eq!(scene["id"], "1");
    assert_eq!(scene["selectedCharacterIds"], serde_json::json!(["c1"]));
    assert!(scene.get("selectedCharacterId").is_none());
    assert!(scene.get("isGeneratingAudio").is_none());
    assert_eq!(migrated["content"]["scenes"][1]["selectedCharacterIds"], serde_json::json!([]));
    assert_eq!(migrated["content"]["selectedVoice"], "Sadachbia");
}

#[test]
fn test_export_images() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), LEGACY_PROJECT);

    scenecraft(temp.path())
        .arg("export")
        .arg(&file)
        .args(["--kind", "images", "--out-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("harbor-story-images.zip"));

    assert!(temp.path().join("harbor-story-images.zip").exists());
}

#[test]
fn test_export_nothing() {
    let temp = TempDir::new().expect("temp dir");
    let file = write_project(temp.path(), LEGACY_PROJECT);

    scenecraft(temp.path())
        .arg("export")
        .arg(&file)
        .args(["--kind", "audio", "--out-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to export"));

    assert!(!temp.path().join("harbor-story-voice.zip").exists());
}

#[test]
fn test_estimate_speech() {
    let temp = TempDir::new().expect("temp dir");

    scenecraft(temp.path())
        .args(["estimate", "--action", "speech", "abcdefgh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generate TTS Audio"))
        .stdout(predicate::str::contains("Input tokens:  2"))
        .stdout(predicate::str::contains("Output tokens: 100"));
}

#[test]
fn test_config_file_is_applied() {
    let temp = TempDir::new().expect("temp dir");
    let config = temp.path().join("config.toml");
    fs::write(&config, "chars_per_token = 2\n").expect("write config");

    Command::cargo_bin("scenecraft")
        .expect("binary")
        .arg("--config")
        .arg(&config)
        .args(["estimate", "--action", "video-prompt", "abcdefgh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Input tokens:  4"))
        .stdout(predicate::str::contains("Output tokens: 500"));
}

#[test]
fn test_config_prints_defaults() {
    let temp = TempDir::new().expect("temp dir");

    scenecraft(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("chars_per_token = 4"))
        .stdout(predicate::str::contains("default_voice = \"Sadachbia\""));
}
