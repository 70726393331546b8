//! Moving behaviors between a family and its members.
//!
//! Both directions work the same way: every affected record is edited as
//! a staged copy of its JSON document, all staged files are written, and
//! only after every write succeeded are the copies committed to the
//! index. A failed precondition writes nothing; a failed write leaves the
//! index untouched but cannot undo sibling writes that already landed.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;

use crate::error::{CrawlerError, Result};
use crate::storage::Storage;

use super::index::ProjectIndex;
use super::record::{behavior_entries, EntityKind, RecordContent};
use super::sid::SidGenerator;

/// Which way a behavior moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From member object types into the shared family.
    ToFamily,
    /// From the family into each member object type.
    ToMembers,
}

/// What a successful migration changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: Direction,
    /// The `behaviorId` that was propagated.
    pub behavior_id: Value,
    pub behavior_name: String,
    /// Files written, family included.
    pub written: Vec<PathBuf>,
    /// Sids of the newly created attachments.
    pub sids: Vec<u64>,
}

/// A record edit waiting to be persisted.
struct Staged {
    kind: EntityKind,
    index: usize,
    path: PathBuf,
    content: RecordContent,
}

impl ProjectIndex {
    /// Run a migration in the given direction.
    pub fn migrate_behavior(
        &mut self,
        storage: &dyn Storage,
        direction: Direction,
        family: &str,
        members: &[&str],
        behavior: &str,
    ) -> Result<MigrationReport> {
        match direction {
            Direction::ToFamily => self.move_behavior_to_family(storage, family, members, behavior),
            Direction::ToMembers => self.move_behavior_to_members(storage, family, members, behavior),
        }
    }

    /// Move `behavior` from the members into the family.
    ///
    /// The first member carrying the behavior supplies its `behaviorId`.
    /// Every member loses all entries with that name; members without it
    /// are neither changed nor rewritten. The family gains one entry with
    /// a fresh sid.
    pub fn move_behavior_to_family(
        &mut self,
        storage: &dyn Storage,
        family: &str,
        members: &[&str],
        behavior: &str,
    ) -> Result<MigrationReport> {
        let family_index = self.require(EntityKind::Family, family)?;
        let member_indices = self.require_all(EntityKind::ObjectType, members)?;
        let family_doc = self.document_of(EntityKind::Family, family_index)?;

        let mut canonical: Option<Value> = None;
        let mut staged = Vec::new();

        for &i in &member_indices {
            let doc = self.document_of(EntityKind::ObjectType, i)?;
            let Some(found) = first_behavior(doc, behavior) else {
                continue;
            };
            if canonical.is_none() {
                canonical = Some(behavior_id_of(found));
            }
            staged.push(self.stage(EntityKind::ObjectType, i, without_behavior(doc, behavior))?);
        }

        let behavior_id = canonical.ok_or_else(|| CrawlerError::MigrationPrecondition {
            message: format!(
                "none of the {} given member(s) of family '{}' has behavior '{}'",
                member_indices.len(),
                family,
                behavior
            ),
            help: Some("Check the behavior name and the member list".to_string()),
        })?;

        let mut sids = SidGenerator::new();
        let sid = sids.next_sid();
        let family_doc = with_behavior(family_doc, &behavior_id, behavior, sid, family)?;
        staged.push(self.stage(EntityKind::Family, family_index, family_doc)?);

        persist_concurrently(storage, &staged)?;

        log::info!(
            "Moved behavior {} from {} member(s) into family {}",
            behavior,
            staged.len() - 1,
            family
        );
        Ok(self.commit(Direction::ToFamily, behavior_id, behavior, staged, vec![sid]))
    }

    /// Move `behavior` from the family into each member.
    ///
    /// The first matching family entry supplies the `behaviorId`; every
    /// same-named entry is removed from the family. Each member gets its
    /// own entry with its own fresh sid.
    pub fn move_behavior_to_members(
        &mut self,
        storage: &dyn Storage,
        family: &str,
        members: &[&str],
        behavior: &str,
    ) -> Result<MigrationReport> {
        let family_index = self.require(EntityKind::Family, family)?;
        let member_indices = self.require_all(EntityKind::ObjectType, members)?;
        if member_indices.is_empty() {
            return Err(CrawlerError::MigrationPrecondition {
                message: format!("family '{}' has no members to receive '{}'", family, behavior),
                help: Some("Pass the members explicitly or add them to the family".to_string()),
            });
        }

        let family_doc = self.document_of(EntityKind::Family, family_index)?;
        let behavior_id = first_behavior(family_doc, behavior)
            .map(behavior_id_of)
            .ok_or_else(|| CrawlerError::MigrationPrecondition {
                message: format!("family '{}' has no behavior '{}'", family, behavior),
                help: None,
            })?;

        let family_staged = self.stage(
            EntityKind::Family,
            family_index,
            without_behavior(family_doc, behavior),
        )?;

        let mut sids = SidGenerator::new();
        let mut issued = Vec::with_capacity(member_indices.len());
        let mut staged = Vec::with_capacity(member_indices.len());
        for &i in &member_indices {
            let record = &self.object_types[i];
            let doc = self.document_of(EntityKind::ObjectType, i)?;
            let sid = sids.next_sid();
            let updated = with_behavior(doc, &behavior_id, behavior, sid, &record.name)?;
            staged.push(self.stage(EntityKind::ObjectType, i, updated)?);
            issued.push(sid);
        }

        persist_concurrently(storage, std::slice::from_ref(&family_staged))?;
        persist_concurrently(storage, &staged)?;

        log::info!(
            "Moved behavior {} from family {} into {} member(s)",
            behavior,
            family,
            staged.len()
        );
        staged.insert(0, family_staged);
        Ok(self.commit(Direction::ToMembers, behavior_id, behavior, staged, issued))
    }

    fn require(&self, kind: EntityKind, name: &str) -> Result<usize> {
        let index = self.position(kind, name).ok_or_else(|| {
            CrawlerError::precondition(format!("unknown {} '{}'", kind, name))
        })?;
        if !self.records(kind)[index].is_loaded() {
            return Err(CrawlerError::MigrationPrecondition {
                message: format!("{} '{}' failed to load and cannot be modified", kind, name),
                help: Some("Fix the definition file and reopen the project".to_string()),
            });
        }
        Ok(index)
    }

    /// Resolve names in order, skipping repeats.
    fn require_all(&self, kind: EntityKind, names: &[&str]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let index = self.require(kind, name)?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    fn document_of(&self, kind: EntityKind, index: usize) -> Result<&Value> {
        let record = &self.records(kind)[index];
        record
            .document()
            .ok_or_else(|| CrawlerError::precondition(format!("{} '{}' is not loaded", kind, record.name)))
    }

    fn stage(&self, kind: EntityKind, index: usize, document: Value) -> Result<Staged> {
        Ok(Staged {
            kind,
            index,
            path: self.records(kind)[index].source_path.clone(),
            content: RecordContent::from_document(document)?,
        })
    }

    fn commit(
        &mut self,
        direction: Direction,
        behavior_id: Value,
        behavior: &str,
        staged: Vec<Staged>,
        sids: Vec<u64>,
    ) -> MigrationReport {
        let mut written = Vec::with_capacity(staged.len());
        for edit in staged {
            self.records_mut(edit.kind)[edit.index].commit(edit.content);
            written.push(edit.path);
        }
        MigrationReport {
            direction,
            behavior_id,
            behavior_name: behavior.to_string(),
            written,
            sids,
        }
    }
}

/// Write every staged record at once. Any failure fails the batch.
fn persist_concurrently(storage: &dyn Storage, staged: &[Staged]) -> Result<()> {
    let failed: Vec<(PathBuf, String)> = staged
        .par_iter()
        .filter_map(|edit| {
            write_staged(storage, &edit.path, edit.content.raw())
                .err()
                .map(|e| (edit.path.clone(), e.to_string()))
        })
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        for (path, message) in &failed {
            log::error!("Failed to write {}: {}", path.display(), message);
        }
        Err(CrawlerError::PersistFailure { failed })
    }
}

fn write_staged(storage: &dyn Storage, path: &Path, raw: &str) -> Result<()> {
    log::debug!("Writing {}", path.display());
    storage.write_text(path, raw)
}

fn first_behavior<'d>(document: &'d Value, name: &str) -> Option<&'d Value> {
    behavior_entries(document)
        .iter()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
}

fn behavior_id_of(entry: &Value) -> Value {
    entry.get("behaviorId").cloned().unwrap_or(Value::Null)
}

/// Copy of `document` without any `behaviorTypes` entry named `name`.
fn without_behavior(document: &Value, name: &str) -> Value {
    let mut document = document.clone();
    if let Some(entries) = document
        .get_mut("behaviorTypes")
        .and_then(Value::as_array_mut)
    {
        entries.retain(|entry| entry.get("name").and_then(Value::as_str) != Some(name));
    }
    document
}

/// Copy of `document` with one `{behaviorId, name, sid}` entry appended.
fn with_behavior(
    document: &Value,
    behavior_id: &Value,
    name: &str,
    sid: u64,
    owner: &str,
) -> Result<Value> {
    let mut document = document.clone();
    let object = document.as_object_mut().ok_or_else(|| {
        CrawlerError::precondition(format!("definition of '{}' is not a JSON object", owner))
    })?;
    let entries = object
        .entry("behaviorTypes")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| {
            CrawlerError::precondition(format!("'behaviorTypes' of '{}' is not an array", owner))
        })?;
    entries.push(serde_json::json!({
        "behaviorId": behavior_id,
        "name": name,
        "sid": sid,
    }));
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::manifest::ProjectManifest;
    use crate::project::record::{serialize_document, BehaviorRef, EntityRecord};
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::{BTreeSet, HashSet};

    fn record(kind: EntityKind, name: &str, doc: Value) -> EntityRecord {
        let path = format!("/p/{}/{}.json", kind.dir_name(), name);
        let raw = serialize_document(&doc).unwrap();
        EntityRecord::loaded(name, kind, "", path, RecordContent::parse(raw).unwrap())
    }

    fn behaviors(entries: &[(&str, &str, u64)]) -> Value {
        Value::Array(
            entries
                .iter()
                .map(|(id, name, sid)| BehaviorRef::new(*id, *name, *sid).to_value())
                .collect(),
        )
    }

    /// Family "Enemies" with members Bat, Slime, Crow. Bat and Crow carry
    /// "Solid" under different ids; Slime does not.
    fn fixture() -> ProjectIndex {
        let objects = vec![
            record(
                EntityKind::ObjectType,
                "Bat",
                json!({
                    "name": "Bat",
                    "plugin-id": "Sprite",
                    "behaviorTypes": behaviors(&[("Solid", "Solid", 11), ("Flash", "Flash", 12)]),
                    "instanceVariables": [{ "name": "hp", "type": "number" }]
                }),
            ),
            record(
                EntityKind::ObjectType,
                "Slime",
                json!({ "name": "Slime", "behaviorTypes": behaviors(&[("Bullet", "Bullet", 21)]) }),
            ),
            record(
                EntityKind::ObjectType,
                "Crow",
                json!({ "name": "Crow", "behaviorTypes": behaviors(&[("solid-alt", "Solid", 31)]) }),
            ),
            EntityRecord::unloaded("Broken", EntityKind::ObjectType, "", "/p/objectTypes/Broken.json"),
        ];
        let families = vec![record(
            EntityKind::Family,
            "Enemies",
            json!({
                "name": "Enemies",
                "behaviorTypes": [],
                "members": ["Bat", "Slime", "Crow"]
            }),
        )];
        ProjectIndex::from_records("/p", ProjectManifest::default(), objects, families, vec![])
    }

    fn pairs(index: &ProjectIndex, kind: EntityKind, name: &str) -> BTreeSet<(String, String)> {
        index
            .get(kind, name)
            .unwrap()
            .behavior_types()
            .into_iter()
            .map(|b| (b.behavior_id, b.name))
            .collect()
    }

    fn assert_consistent(index: &ProjectIndex, storage: &MemoryStorage, kind: EntityKind, name: &str) {
        let record = index.get(kind, name).unwrap();
        let content = record.content().unwrap();
        assert_eq!(content.raw(), serialize_document(content.document()).unwrap());
        assert_eq!(storage.contents(&record.source_path).unwrap(), content.raw());
    }

    #[test]
    fn test_to_family_first_match_wins() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        let slime_before = index.object_type("Slime").unwrap().raw().unwrap().to_string();

        let report = index
            .move_behavior_to_family(&storage, "Enemies", &["Bat", "Slime", "Crow"], "Solid")
            .unwrap();

        assert_eq!(report.behavior_id, json!("Solid"));
        assert!(!index.object_type("Bat").unwrap().has_behavior("Solid"));
        assert!(index.object_type("Bat").unwrap().has_behavior("Flash"));
        assert!(!index.object_type("Crow").unwrap().has_behavior("Solid"));
        assert_eq!(index.object_type("Slime").unwrap().raw().unwrap(), slime_before);

        let family = index.family("Enemies").unwrap().behavior_types();
        assert_eq!(family.len(), 1);
        assert_eq!(family[0].behavior_id, "Solid");
        assert_eq!(family[0].name, "Solid");
        assert_eq!(family[0].sid, report.sids[0]);
        assert!(![11, 31].contains(&family[0].sid));

        let written: HashSet<PathBuf> = storage.writes().into_iter().collect();
        assert_eq!(
            written,
            HashSet::from([
                PathBuf::from("/p/objectTypes/Bat.json"),
                PathBuf::from("/p/objectTypes/Crow.json"),
                PathBuf::from("/p/families/Enemies.json"),
            ])
        );
        assert_eq!(report.written.len(), 3);
        for (kind, name) in [
            (EntityKind::ObjectType, "Bat"),
            (EntityKind::ObjectType, "Crow"),
            (EntityKind::Family, "Enemies"),
        ] {
            assert_consistent(&index, &storage, kind, name);
        }
    }

    #[test]
    fn test_to_family_without_behavior_writes_nothing() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        let before = index.clone();

        let err = index
            .move_behavior_to_family(&storage, "Enemies", &["Bat", "Slime", "Crow"], "X")
            .unwrap_err();

        assert!(matches!(err, CrawlerError::MigrationPrecondition { .. }));
        assert!(storage.writes().is_empty());
        for (a, b) in index.object_types().iter().zip(before.object_types()) {
            assert_eq!(a.raw(), b.raw());
        }
        assert_eq!(index.family("Enemies").unwrap().raw(), before.family("Enemies").unwrap().raw());
    }

    #[test]
    fn test_to_members_gives_each_member_its_own_sid() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        index
            .move_behavior_to_family(&storage, "Enemies", &["Bat"], "Flash")
            .unwrap();

        let report = index
            .move_behavior_to_members(&storage, "Enemies", &["Slime", "Crow"], "Flash")
            .unwrap();

        assert!(!index.family("Enemies").unwrap().has_behavior("Flash"));
        let slime = index.object_type("Slime").unwrap().behavior_types();
        let crow = index.object_type("Crow").unwrap().behavior_types();
        let slime_flash = slime.iter().find(|b| b.name == "Flash").unwrap();
        let crow_flash = crow.iter().find(|b| b.name == "Flash").unwrap();
        assert_eq!(slime_flash.behavior_id, "Flash");
        assert_eq!(crow_flash.behavior_id, "Flash");
        assert_ne!(slime_flash.sid, crow_flash.sid);
        assert_eq!(report.sids, vec![slime_flash.sid, crow_flash.sid]);
        assert_eq!(report.written[0], PathBuf::from("/p/families/Enemies.json"));
        assert_consistent(&index, &storage, EntityKind::Family, "Enemies");
        assert_consistent(&index, &storage, EntityKind::ObjectType, "Slime");
    }

    #[test]
    fn test_to_members_writes_family_first() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        index
            .move_behavior_to_family(&storage, "Enemies", &["Crow"], "Solid")
            .unwrap();
        let writes_before = storage.writes().len();

        index
            .move_behavior_to_members(&storage, "Enemies", &["Bat", "Slime", "Crow"], "Solid")
            .unwrap();

        let writes = storage.writes();
        assert_eq!(writes.len() - writes_before, 4);
        assert_eq!(writes[writes_before], PathBuf::from("/p/families/Enemies.json"));
    }

    #[test]
    fn test_round_trip_restores_member_behaviors() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        let members = ["Bat", "Crow"];
        let before: Vec<_> = members
            .iter()
            .map(|m| pairs(&index, EntityKind::ObjectType, m))
            .collect();

        index
            .move_behavior_to_family(&storage, "Enemies", &members, "Flash")
            .unwrap();
        // Bat is the only member with Flash; give it back to Bat alone.
        index
            .move_behavior_to_members(&storage, "Enemies", &["Bat"], "Flash")
            .unwrap();

        let after: Vec<_> = members
            .iter()
            .map(|m| pairs(&index, EntityKind::ObjectType, m))
            .collect();
        assert_eq!(after, before);
        assert!(index.family("Enemies").unwrap().behavior_types().is_empty());
    }

    #[test]
    fn test_round_trip_with_shared_behavior() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        let members = ["Bat", "Crow"];

        index
            .move_behavior_to_family(&storage, "Enemies", &members, "Solid")
            .unwrap();
        index
            .move_behavior_to_members(&storage, "Enemies", &members, "Solid")
            .unwrap();

        // Interchangeable instances collapse to the first member's id.
        for member in members {
            let solid: Vec<_> = index
                .object_type(member)
                .unwrap()
                .behavior_types()
                .into_iter()
                .filter(|b| b.name == "Solid")
                .collect();
            assert_eq!(solid.len(), 1);
            assert_eq!(solid[0].behavior_id, "Solid");
        }
    }

    #[test]
    fn test_sids_distinct_across_many_members() {
        let storage = MemoryStorage::new();
        let names: Vec<String> = (0..50).map(|i| format!("Obj{i}")).collect();
        let objects: Vec<EntityRecord> = names
            .iter()
            .map(|n| record(EntityKind::ObjectType, n, json!({ "behaviorTypes": [] })))
            .collect();
        let family = record(
            EntityKind::Family,
            "All",
            json!({ "behaviorTypes": behaviors(&[("Fade", "Fade", 1)]) }),
        );
        let mut index =
            ProjectIndex::from_records("/p", ProjectManifest::default(), objects, vec![family], vec![]);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let report = index
            .move_behavior_to_members(&storage, "All", &refs, "Fade")
            .unwrap();

        let unique: HashSet<u64> = report.sids.iter().copied().collect();
        assert_eq!(report.sids.len(), 50);
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn test_to_members_removes_all_same_named_entries() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        let family = record(
            EntityKind::Family,
            "Enemies",
            json!({
                "behaviorTypes": behaviors(&[("first", "Solid", 1), ("Fade", "Fade", 2), ("second", "Solid", 3)])
            }),
        );
        index.families[0] = family;

        let report = index
            .move_behavior_to_members(&storage, "Enemies", &["Slime"], "Solid")
            .unwrap();

        assert_eq!(report.behavior_id, json!("first"));
        let remaining = index.family("Enemies").unwrap().behavior_types();
        assert_eq!(remaining, vec![BehaviorRef::new("Fade", "Fade", 2)]);
    }

    #[test]
    fn test_to_members_without_behavior_is_precondition() {
        let storage = MemoryStorage::new();
        let mut index = fixture();

        let err = index
            .move_behavior_to_members(&storage, "Enemies", &["Bat"], "Solid")
            .unwrap_err();

        assert!(matches!(err, CrawlerError::MigrationPrecondition { .. }));
        assert!(storage.writes().is_empty());
    }

    #[test]
    fn test_to_members_requires_members() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        index
            .move_behavior_to_family(&storage, "Enemies", &["Bat"], "Solid")
            .unwrap();

        let err = index
            .move_behavior_to_members(&storage, "Enemies", &[], "Solid")
            .unwrap_err();

        assert!(matches!(err, CrawlerError::MigrationPrecondition { .. }));
        assert!(index.family("Enemies").unwrap().has_behavior("Solid"));
    }

    #[test]
    fn test_unknown_or_unloaded_records_are_rejected() {
        let storage = MemoryStorage::new();
        let mut index = fixture();

        let unknown = index.move_behavior_to_family(&storage, "Nobody", &["Bat"], "Solid");
        let unloaded = index.move_behavior_to_family(&storage, "Enemies", &["Bat", "Broken"], "Solid");
        let missing_member = index.move_behavior_to_family(&storage, "Enemies", &["Ghost"], "Solid");

        for result in [unknown, unloaded, missing_member] {
            assert!(matches!(result, Err(CrawlerError::MigrationPrecondition { .. })));
        }
        assert!(storage.writes().is_empty());
        assert!(index.object_type("Bat").unwrap().has_behavior("Solid"));
    }

    #[test]
    fn test_persist_failure_leaves_index_untouched() {
        let storage = MemoryStorage::new();
        storage.fail_writes_to("/p/families/Enemies.json");
        let mut index = fixture();

        let err = index
            .move_behavior_to_family(&storage, "Enemies", &["Bat", "Crow"], "Solid")
            .unwrap_err();

        match err {
            CrawlerError::PersistFailure { failed } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, PathBuf::from("/p/families/Enemies.json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(index.object_type("Bat").unwrap().has_behavior("Solid"));
        assert!(index.family("Enemies").unwrap().behavior_types().is_empty());
    }

    #[test]
    fn test_family_write_failure_stops_member_writes() {
        let storage = MemoryStorage::new();
        let mut index = fixture();
        index
            .move_behavior_to_family(&storage, "Enemies", &["Bat"], "Solid")
            .unwrap();
        storage.fail_writes_to("/p/families/Enemies.json");
        let writes_before = storage.writes().len();

        let err = index
            .move_behavior_to_members(&storage, "Enemies", &["Bat", "Slime"], "Solid")
            .unwrap_err();

        assert!(matches!(err, CrawlerError::PersistFailure { .. }));
        assert_eq!(storage.writes().len(), writes_before);
        assert!(index.family("Enemies").unwrap().has_behavior("Solid"));
    }

    #[test]
    fn test_unknown_fields_survive() {
        let storage = MemoryStorage::new();
        let mut index = fixture();

        index
            .move_behavior_to_family(&storage, "Enemies", &["Bat"], "Solid")
            .unwrap();

        let bat = index.object_type("Bat").unwrap().document().unwrap();
        assert_eq!(bat["plugin-id"], json!("Sprite"));
        assert_eq!(bat["instanceVariables"][0]["name"], json!("hp"));
        let family = index.family("Enemies").unwrap().document().unwrap();
        assert_eq!(family["members"], json!(["Bat", "Slime", "Crow"]));
    }

    #[test]
    fn test_migrate_behavior_dispatch() {
        let storage = MemoryStorage::new();
        let mut index = fixture();

        let report = index
            .migrate_behavior(&storage, Direction::ToFamily, "Enemies", &["Crow"], "Solid")
            .unwrap();

        assert_eq!(report.direction, Direction::ToFamily);
        assert_eq!(report.behavior_id, json!("solid-alt"));
    }
}
