//! Entity records: one object-type or family definition file.
//!
//! A loaded record keeps the exact text read from disk next to a generic
//! JSON document parsed from it. The document is a `serde_json::Value`
//! (with key order preserved) rather than a typed schema, so fields the
//! crawler does not model survive every rewrite. The two halves live in
//! [`RecordContent`] and can only be replaced together.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CrawlerError, Result};
use crate::storage::Storage;

use super::assets::ResolvedAssets;

/// Which namespace a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ObjectType,
    Family,
}

impl EntityKind {
    /// Directory under the project root holding this kind's definitions.
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::ObjectType => "objectTypes",
            EntityKind::Family => "families",
        }
    }

    /// Human-readable label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::ObjectType => "object type",
            EntityKind::Family => "family",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A behavior attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRef {
    pub behavior_id: String,
    pub name: String,
    #[serde(default)]
    pub sid: u64,
}

impl BehaviorRef {
    pub fn new(behavior_id: impl Into<String>, name: impl Into<String>, sid: u64) -> Self {
        Self {
            behavior_id: behavior_id.into(),
            name: name.into(),
            sid,
        }
    }

    /// Read a `behaviorTypes` entry. Only `name` must be a string, which
    /// is also all a migration matches on. A non-string `behaviorId` is
    /// kept in its JSON form and a `sid` that is not an unsigned integer
    /// reads as 0.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let name = entry.get("name")?.as_str()?;
        let behavior_id = match entry.get("behaviorId") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let sid = match entry.get("sid") {
            Some(sid) => sid.as_u64().unwrap_or_else(|| {
                log::warn!("Behavior {} has a non-integer sid {}", name, sid);
                0
            }),
            None => 0,
        };
        Some(Self::new(behavior_id, name, sid))
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "behaviorId": self.behavior_id,
            "name": self.name,
            "sid": self.sid,
        })
    }
}

/// Raw text and parsed document of a definition, always in agreement.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordContent {
    raw: String,
    document: Value,
}

impl RecordContent {
    /// Parse `raw`, keeping it verbatim as the snapshot.
    pub fn parse(raw: String) -> std::result::Result<Self, serde_json::Error> {
        let document = serde_json::from_str(&raw)?;
        Ok(Self { raw, document })
    }

    /// Build content from a document, serializing it as the snapshot.
    pub fn from_document(document: Value) -> Result<Self> {
        let raw = serialize_document(&document)?;
        Ok(Self { raw, document })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Replace the document and re-serialize the snapshot in one step.
    pub fn replace_document(&mut self, document: Value) -> Result<()> {
        *self = Self::from_document(document)?;
        Ok(())
    }

    /// Typed view of the `behaviorTypes` array.
    ///
    /// Entries without a string `name` are skipped.
    pub fn behavior_types(&self) -> Vec<BehaviorRef> {
        behavior_entries(&self.document)
            .iter()
            .filter_map(BehaviorRef::from_entry)
            .collect()
    }
}

/// Serialize a document the way definition files are written on disk
/// (two-space indentation).
pub fn serialize_document(document: &Value) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(|e| CrawlerError::Parse {
        path: PathBuf::new(),
        message: format!("Failed to serialize document: {}", e),
        help: None,
    })
}

/// The `behaviorTypes` entries of a document, or an empty slice.
pub fn behavior_entries(document: &Value) -> &[Value] {
    document
        .get("behaviorTypes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// In-memory representation of one definition file.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub name: String,
    pub kind: EntityKind,
    /// Folder path inside the namespace ("" at the root).
    pub folder: String,
    pub source_path: PathBuf,
    content: Option<RecordContent>,
    /// Session-local resolved image paths. Never persisted.
    pub assets: ResolvedAssets,
}

impl EntityRecord {
    /// A record whose definition could not be loaded.
    pub fn unloaded(
        name: impl Into<String>,
        kind: EntityKind,
        folder: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            folder: folder.into(),
            source_path: source_path.into(),
            content: None,
            assets: ResolvedAssets::default(),
        }
    }

    /// A record with loaded content.
    pub fn loaded(
        name: impl Into<String>,
        kind: EntityKind,
        folder: impl Into<String>,
        source_path: impl Into<PathBuf>,
        content: RecordContent,
    ) -> Self {
        let mut record = Self::unloaded(name, kind, folder, source_path);
        record.content = Some(content);
        record
    }

    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<&RecordContent> {
        self.content.as_ref()
    }

    pub fn raw(&self) -> Option<&str> {
        self.content.as_ref().map(RecordContent::raw)
    }

    pub fn document(&self) -> Option<&Value> {
        self.content.as_ref().map(RecordContent::document)
    }

    /// Behaviors attached to this entity (empty when unloaded).
    pub fn behavior_types(&self) -> Vec<BehaviorRef> {
        self.content
            .as_ref()
            .map(RecordContent::behavior_types)
            .unwrap_or_default()
    }

    pub fn has_behavior(&self, name: &str) -> bool {
        self.behavior_types().iter().any(|b| b.name == name)
    }

    /// Object type names listed in a family's `members` array.
    pub fn family_members(&self) -> Vec<String> {
        self.document()
            .and_then(|doc| doc.get("members"))
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `image` object, if this entity declares a single image.
    pub fn image(&self) -> Option<&Value> {
        self.document()
            .and_then(|doc| doc.get("image"))
            .filter(|image| image.is_object())
    }

    /// The `animations` folder, if this entity is animated.
    pub fn animations(&self) -> Option<&Value> {
        self.document()
            .and_then(|doc| doc.get("animations"))
            .filter(|anims| anims.is_object())
    }

    /// Swap in new content. Callers persist before committing.
    pub(crate) fn commit(&mut self, content: RecordContent) {
        self.content = Some(content);
    }

    /// Write the raw snapshot back to `source_path`.
    pub fn persist(&self, storage: &dyn Storage) -> Result<()> {
        let content = self.content.as_ref().ok_or_else(|| CrawlerError::Io {
            path: self.source_path.clone(),
            message: format!("{} '{}' has no loaded content to write", self.kind, self.name),
        })?;
        storage.write_text(&self.source_path, content.raw())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}
