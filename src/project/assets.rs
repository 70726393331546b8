//! Naming-convention image resolution for object types.
//!
//! Images are never referenced by path inside a definition. A sprite's
//! frames live at `images/<name>-<animation>-<NNN>.png` and single-image
//! objects at `images/<name>.png`, all lowercased. Resolved paths are kept
//! on the record as session-local decorations; the JSON is untouched.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::diagnostics::{codes, DiagnosticLog};
use crate::error::{CrawlerError, Result};
use crate::storage::Storage;

use super::record::EntityRecord;

/// Directory under the project root holding image assets.
pub const IMAGES_DIR: &str = "images";

/// Resolution result for the single image of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Where the image is expected by convention.
    pub expected: PathBuf,
    /// Set when the file exists.
    pub path: Option<PathBuf>,
    pub dimensions: Option<(u32, u32)>,
}

/// Resolution result for one animation frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub animation: String,
    /// Zero-based frame index within the animation.
    pub index: usize,
    pub expected: PathBuf,
    pub path: Option<PathBuf>,
    pub dimensions: Option<(u32, u32)>,
}

/// All assets resolved for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    pub image: Option<ResolvedImage>,
    /// Frames in animation-folder pre-order, then frame order.
    pub frames: Vec<ResolvedFrame>,
}

impl ResolvedAssets {
    /// Number of expected files that were not found.
    pub fn missing_count(&self) -> usize {
        let image = self
            .image
            .as_ref()
            .map_or(0, |img| usize::from(img.path.is_none()));
        image + self.frames.iter().filter(|f| f.path.is_none()).count()
    }
}

/// Expected path of a single-image entity.
pub fn image_path(root: &Path, entity: &str) -> PathBuf {
    root.join(IMAGES_DIR)
        .join(format!("{}.png", entity.to_lowercase()))
}

/// Expected path of animation frame `index`.
pub fn frame_path(root: &Path, entity: &str, animation: &str, index: usize) -> PathBuf {
    root.join(IMAGES_DIR)
        .join(format!("{}.png", frame_stem(entity, animation, index)))
}

fn frame_stem(entity: &str, animation: &str, index: usize) -> String {
    format!(
        "{}-{}-{:03}",
        entity.to_lowercase(),
        animation.to_lowercase(),
        index
    )
}

/// Resolve every image an object type declares.
///
/// Missing files are logged and left unset; resolution always continues.
pub fn resolve_assets(
    storage: &dyn Storage,
    root: &Path,
    record: &mut EntityRecord,
    read_dimensions: bool,
    log: &mut DiagnosticLog,
) {
    let mut assets = ResolvedAssets::default();
    let resolver = Resolver {
        storage,
        root,
        entity: &record.name,
        read_dimensions,
    };

    if let Some(animations) = record.animations() {
        resolver.walk_animation_folder(animations, &mut assets.frames, log);
    }

    if record.image().is_some() {
        assets.image = Some(resolver.resolve_image(log));
    }

    record.assets = assets;
}

struct Resolver<'a> {
    storage: &'a dyn Storage,
    root: &'a Path,
    entity: &'a str,
    read_dimensions: bool,
}

impl Resolver<'_> {
    fn walk_animation_folder(
        &self,
        folder: &Value,
        frames: &mut Vec<ResolvedFrame>,
        log: &mut DiagnosticLog,
    ) {
        for animation in array(folder, "items") {
            let Some(name) = animation.get("name").and_then(Value::as_str) else {
                log.warning(
                    codes::ASSET_MISSING,
                    format!("Animation without a name in {}, skipping its frames", self.entity),
                );
                continue;
            };
            for index in 0..array(animation, "frames").len() {
                frames.push(self.resolve_frame(name, index, log));
            }
        }

        for subfolder in array(folder, "subfolders") {
            self.walk_animation_folder(subfolder, frames, log);
        }
    }

    fn resolve_frame(&self, animation: &str, index: usize, log: &mut DiagnosticLog) -> ResolvedFrame {
        let expected = frame_path(self.root, self.entity, animation, index);
        let mut frame = ResolvedFrame {
            animation: animation.to_string(),
            index,
            expected: expected.clone(),
            path: None,
            dimensions: None,
        };

        if self.storage.exists(&expected) {
            frame.dimensions = self.dimensions(&expected, log);
            frame.path = Some(expected);
        } else {
            log.error(
                codes::ASSET_MISSING,
                format!(
                    "Image {} not found in {} ({}, animation {}, frame {})",
                    frame_stem(self.entity, animation, index),
                    expected.display(),
                    self.entity,
                    animation,
                    index
                ),
            );
        }
        frame
    }

    fn resolve_image(&self, log: &mut DiagnosticLog) -> ResolvedImage {
        let expected = image_path(self.root, self.entity);
        let mut image = ResolvedImage {
            expected: expected.clone(),
            path: None,
            dimensions: None,
        };

        if self.storage.exists(&expected) {
            image.dimensions = self.dimensions(&expected, log);
            image.path = Some(expected);
        } else {
            log.error(
                codes::ASSET_MISSING,
                format!(
                    "Image {} not found in {}",
                    self.entity.to_lowercase(),
                    expected.display()
                ),
            );
        }
        image
    }

    fn dimensions(&self, path: &Path, log: &mut DiagnosticLog) -> Option<(u32, u32)> {
        if !self.read_dimensions {
            return None;
        }
        match read_dimensions(self.storage, path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                log.warning(codes::ASSET_DECODE, format!("Could not read image size: {}", e));
                None
            }
        }
    }
}

/// Read width and height from an image header.
pub fn read_dimensions(storage: &dyn Storage, path: &Path) -> Result<(u32, u32)> {
    let bytes = storage.read_binary(path)?;
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(path, e))?
        .into_dimensions()
        .map_err(|e| decode_error(path, e))
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> CrawlerError {
    CrawlerError::Parse {
        path: path.to_path_buf(),
        message: format!("Unreadable image header: {}", err),
        help: None,
    }
}

fn array<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
