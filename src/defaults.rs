//! Bundled default presets.
//!
//! The content root ships an `index.json` manifest listing every bundled file
//! with its content type. Preset-typed entries form a read-only lookup keyed by
//! `(folder, name)`; a default's document is read from disk on first use and
//! cached afterwards.

use anyhow::Context;
use parking_lot::RwLock;
use path_absolutize::Absolutize;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::users::UserDirectories;

pub const CONTENT_INDEX_FILE: &str = "index.json";

/// One record of the content manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ContentIndexEntry {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Content types that are presets, and the user folder each targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    KoboldPreset,
    NovelPreset,
    TextGenPreset,
    OpenAiPreset,
    Instruct,
    Context,
}

impl DefaultKind {
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "kobold_preset" => Some(DefaultKind::KoboldPreset),
            "novel_preset" => Some(DefaultKind::NovelPreset),
            "textgen_preset" => Some(DefaultKind::TextGenPreset),
            "openai_preset" => Some(DefaultKind::OpenAiPreset),
            "instruct" => Some(DefaultKind::Instruct),
            "context" => Some(DefaultKind::Context),
            _ => None,
        }
    }

    pub fn folder<'a>(&self, dirs: &'a UserDirectories) -> &'a Path {
        match self {
            DefaultKind::KoboldPreset => &dirs.kobold_ai_settings,
            DefaultKind::NovelPreset => &dirs.novel_ai_settings,
            DefaultKind::TextGenPreset => &dirs.text_gen_settings,
            DefaultKind::OpenAiPreset => &dirs.open_ai_settings,
            DefaultKind::Instruct => &dirs.instruct,
            DefaultKind::Context => &dirs.context,
        }
    }
}

/// A bundled default as seen from one user's directory set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPreset {
    pub name: String,
    pub folder: PathBuf,
    /// Path relative to the content root.
    pub filename: String,
}

#[derive(Debug, Clone)]
struct IndexedDefault {
    kind: DefaultKind,
    name: String,
    filename: String,
}

pub struct DefaultPresetIndex {
    content_root: PathBuf,
    entries: Vec<IndexedDefault>,
    cache: RwLock<HashMap<String, Value>>,
}

impl DefaultPresetIndex {
    /// Load `<content_root>/index.json`. A missing manifest gives an empty index.
    pub fn load(content_root: &Path) -> anyhow::Result<Self> {
        let index_path = content_root.join(CONTENT_INDEX_FILE);
        let raw = match std::fs::read_to_string(&index_path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(target: "presetd::defaults", "no content index at {}; default presets disabled", index_path.display());
                return Ok(Self::from_entries(content_root, Vec::new()));
            }
            Err(e) => return Err(e).with_context(|| format!("read content index {}", index_path.display())),
        };
        let entries: Vec<ContentIndexEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("parse content index {}", index_path.display()))?;
        let index = Self::from_entries(content_root, entries);
        debug!(target: "presetd::defaults", "indexed {} default presets from {}", index.entries.len(), index_path.display());
        Ok(index)
    }

    pub fn from_entries(content_root: &Path, entries: Vec<ContentIndexEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| {
                let kind = DefaultKind::from_type(&e.kind)?;
                let name = Path::new(&e.filename).file_stem()?.to_string_lossy().to_string();
                Some(IndexedDefault { kind, name, filename: e.filename })
            })
            .collect();
        Self { content_root: content_root.to_path_buf(), entries, cache: RwLock::new(HashMap::new()) }
    }

    pub fn empty() -> Self {
        Self::from_entries(Path::new(""), Vec::new())
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Every default preset, with folders resolved for `dirs`.
    pub fn defaults_for(&self, dirs: &UserDirectories) -> Vec<DefaultPreset> {
        self.entries
            .iter()
            .map(|e| DefaultPreset {
                name: e.name.clone(),
                folder: e.kind.folder(dirs).to_path_buf(),
                filename: e.filename.clone(),
            })
            .collect()
    }

    /// Default preset named `name` whose folder is `folder`, if any.
    pub fn find(&self, dirs: &UserDirectories, folder: &Path, name: &str) -> Option<DefaultPreset> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.kind.folder(dirs) == folder)
            .map(|e| DefaultPreset {
                name: e.name.clone(),
                folder: folder.to_path_buf(),
                filename: e.filename.clone(),
            })
    }

    /// Parsed document for a bundled file. `None` when the file is missing,
    /// unparsable or outside the content root.
    pub fn read_content(&self, filename: &str) -> AppResult<Option<Value>> {
        if let Some(v) = self.cache.read().get(filename) {
            return Ok(Some(v.clone()));
        }
        let Some(path) = self.confined_path(filename)? else {
            warn!(target: "presetd::defaults", "refusing default preset outside content root: {}", filename);
            return Ok(None);
        };
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(target: "presetd::defaults", "default preset file missing: {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(AppError::io(&format!("read {}", path.display()), e)),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(v) => {
                self.cache.write().insert(filename.to_string(), v.clone());
                Ok(Some(v))
            }
            Err(e) => {
                warn!(target: "presetd::defaults", "default preset {} is not valid JSON: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn confined_path(&self, filename: &str) -> AppResult<Option<PathBuf>> {
        let root = self
            .content_root
            .absolutize()
            .map_err(|e| AppError::io("absolutize content root", e))?
            .to_path_buf();
        let candidate = self
            .content_root
            .join(filename)
            .absolutize()
            .map_err(|e| AppError::io("absolutize default preset path", e))?
            .to_path_buf();
        Ok(candidate.starts_with(&root).then_some(candidate))
    }
}

#[cfg(test)]
#[path = "defaults_tests.rs"]
mod defaults_tests;
