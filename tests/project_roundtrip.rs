//! End-to-end tests against a project laid out on a real filesystem.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use crawler::project::{open_project, serialize_document, Direction, EntityKind};
use crawler::{AppContext, Config, CrawlerError, FsStorage, Severity};

const MANIFEST: &str = r#"{
  "name": "Roundtrip",
  "objectTypes": {
    "items": ["Player"],
    "subfolders": [
      { "name": "enemies", "items": ["Bat", "Slime", "Ghost"], "subfolders": [] }
    ]
  },
  "families": { "items": ["Enemies"], "subfolders": [] },
  "layouts": { "items": ["Level 1", "Level 2"], "subfolders": [] }
}"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn pretty(value: Value) -> String {
    serialize_document(&value).unwrap()
}

/// Bat and Slime carry Solid, Player has a single image, Ghost is missing.
fn build_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, "project.c3proj", MANIFEST);
    write(
        root,
        "objectTypes/Player.json",
        &pretty(json!({
            "name": "Player",
            "image": { "width": 16, "height": 16 },
            "behaviorTypes": []
        })),
    );
    write(
        root,
        "objectTypes/enemies/Bat.json",
        &pretty(json!({
            "name": "Bat",
            "plugin-id": "Sprite",
            "behaviorTypes": [{ "behaviorId": "solid", "name": "Solid", "sid": 101 }],
            "animations": {
                "items": [{ "name": "Fly", "frames": [{}, {}] }],
                "subfolders": []
            }
        })),
    );
    write(
        root,
        "objectTypes/enemies/Slime.json",
        &pretty(json!({
            "name": "Slime",
            "behaviorTypes": [
                { "behaviorId": "solid", "name": "Solid", "sid": 102 },
                { "behaviorId": "Fade", "name": "Fade", "sid": 103 }
            ]
        })),
    );
    write(
        root,
        "families/Enemies.json",
        &pretty(json!({
            "name": "Enemies",
            "behaviorTypes": [],
            "members": ["Bat", "Slime"]
        })),
    );
    write(root, "layouts/Level 1.json", "{}");
    write(root, "images/player.png", "not really a png");
    write(root, "images/bat-fly-000.png", "frame");

    dir
}

fn read_json(path: impl AsRef<Path>) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_open_reports_missing_files() {
    let dir = build_project();
    let loaded = open_project(&FsStorage::new(), dir.path()).unwrap();

    let names: Vec<&str> = loaded
        .index
        .object_types()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["Player", "Bat", "Slime", "Ghost"]);
    assert!(!loaded.index.object_type("Ghost").unwrap().is_loaded());

    let bat = loaded.index.object_type("Bat").unwrap();
    assert_eq!(bat.folder, "enemies");
    assert_eq!(bat.assets.frames.len(), 2);
    assert_eq!(bat.assets.missing_count(), 1);

    let player = loaded.index.object_type("Player").unwrap();
    assert!(player.assets.image.as_ref().unwrap().path.is_some());

    let errors: Vec<String> = loaded
        .diagnostics
        .at_least(Severity::Error)
        .map(|d| d.message.clone())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("No object type file found for Ghost in enemies"));
    assert!(errors[1].contains("bat-fly-001"));

    assert_eq!(loaded.index.layouts().len(), 2);
    assert_eq!(loaded.diagnostics.warning_count(), 1);
}

#[test]
fn test_persist_without_changes_is_byte_identical() {
    let dir = build_project();
    let storage = FsStorage::new();
    let before = fs::read_to_string(dir.path().join("objectTypes/enemies/Slime.json")).unwrap();

    let loaded = open_project(&storage, dir.path()).unwrap();
    let slime = loaded.index.object_type("Slime").unwrap();
    slime.persist(&storage).unwrap();

    let after = fs::read_to_string(slime.source_path()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_consolidate_then_distribute() {
    let dir = build_project();
    let root = dir.path();
    let mut ctx = AppContext::new(FsStorage::new(), Config::default());
    ctx.open(root).unwrap();

    let report = ctx
        .migrate(Direction::ToFamily, "Enemies", None, "Solid")
        .unwrap();
    assert_eq!(report.behavior_id, json!("solid"));
    assert_eq!(report.written.len(), 3);

    let family = read_json(root.join("families/Enemies.json"));
    let entries = family["behaviorTypes"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Solid");
    assert_eq!(entries[0]["sid"], json!(report.sids[0]));

    let slime = read_json(root.join("objectTypes/enemies/Slime.json"));
    assert_eq!(
        slime["behaviorTypes"],
        json!([{ "behaviorId": "Fade", "name": "Fade", "sid": 103 }])
    );

    // Disk and memory agree after the move.
    let index = ctx.index().unwrap();
    let family_record = index.get(EntityKind::Family, "Enemies").unwrap();
    assert_eq!(
        family_record.raw().unwrap(),
        fs::read_to_string(family_record.source_path()).unwrap()
    );

    let report = ctx
        .migrate(Direction::ToMembers, "Enemies", None, "Solid")
        .unwrap();
    assert_eq!(report.sids.len(), 2);
    assert_ne!(report.sids[0], report.sids[1]);

    let family = read_json(root.join("families/Enemies.json"));
    assert_eq!(family["behaviorTypes"], json!([]));
    for name in ["Bat", "Slime"] {
        let member = read_json(root.join(format!("objectTypes/enemies/{}.json", name)));
        let solid: Vec<&Value> = member["behaviorTypes"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|b| b["name"] == "Solid")
            .collect();
        assert_eq!(solid.len(), 1);
        assert_eq!(solid[0]["behaviorId"], "solid");
    }

    // A fresh load sees what the index holds.
    let reloaded = ctx.reopen().unwrap().unwrap();
    assert!(reloaded.object_type("Bat").unwrap().has_behavior("Solid"));
    assert!(!reloaded.family("Enemies").unwrap().has_behavior("Solid"));
}

#[test]
fn test_migration_with_unloaded_member_writes_nothing() {
    let dir = build_project();
    let root = dir.path();
    let before = fs::read_to_string(root.join("objectTypes/enemies/Bat.json")).unwrap();

    let mut ctx = AppContext::new(FsStorage::new(), Config::default());
    ctx.open(root).unwrap();
    let members = vec!["Bat".to_string(), "Ghost".to_string()];
    let err = ctx
        .migrate(Direction::ToFamily, "Enemies", Some(members.as_slice()), "Solid")
        .unwrap_err();

    assert!(matches!(err, CrawlerError::MigrationPrecondition { .. }));
    assert_eq!(
        fs::read_to_string(root.join("objectTypes/enemies/Bat.json")).unwrap(),
        before
    );
}

#[test]
fn test_dump_log_writes_next_to_project() {
    let dir = build_project();
    let mut ctx = AppContext::new(FsStorage::new(), Config::default());
    ctx.open(dir.path()).unwrap();

    let path = ctx.dump_log().unwrap().unwrap();
    assert_eq!(path, dir.path().join("crawler-log.txt"));

    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("[ERROR]: No object type file found for Ghost in enemies"));
    assert!(text.trim_end().ends_with("[INFO]: Project Roundtrip opened."));
}
