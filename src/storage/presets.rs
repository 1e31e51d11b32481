//! Preset persistence: save, rename, delete and default-restore lookup against a
//! user's per-backend folders.
//!
//! Rename is two filesystem effects (publish new, remove old) with no
//! transaction around them. A crash in between leaves both files on disk: the
//! failure mode is a duplicate entry, never a lost preset, because the new file
//! is fully flushed before the old one is removed.

use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{resolve_location, BackendId, PresetLocation};
use crate::defaults::DefaultPresetIndex;
use crate::error::{AppError, AppResult};
use crate::ident::{sanitize_name, sanitized_or_none};
use crate::users::UserDirectories;

use super::atomic::{to_pretty_json, write_atomic, write_exclusive};

/// Outcome of a restore lookup. Serializes as `{isDefault, preset}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreResult {
    #[serde(rename = "isDefault")]
    pub is_default: bool,
    pub preset: Value,
}

impl RestoreResult {
    fn not_default() -> Self {
        Self { is_default: false, preset: json!({}) }
    }
}

#[derive(Clone)]
pub struct PresetStore {
    defaults: Arc<DefaultPresetIndex>,
}

impl PresetStore {
    pub fn new(defaults: Arc<DefaultPresetIndex>) -> Self {
        Self { defaults }
    }

    /// Create or overwrite preset `name` for backend `api_id`. Returns the
    /// sanitized name the preset was stored under.
    pub fn save(&self, dirs: &UserDirectories, api_id: &str, name: &str, content: Option<&Value>) -> AppResult<String> {
        let name = require_name(name, "name")?;
        let content = require_content(content)?;
        let loc = location(dirs, api_id)?;
        save_at(&loc, &name, content)?;
        info!(target: "presetd::presets", "saved preset '{}' for {}", name, api_id);
        Ok(name)
    }

    /// Move preset `old_name` to `new_name`, rewriting the document's `name`
    /// field to match. Never overwrites an existing preset.
    pub fn rename(&self, dirs: &UserDirectories, api_id: &str, old_name: &str, new_name: &str) -> AppResult<()> {
        let old_name = require_name(old_name, "oldName")?;
        let new_name = require_name(new_name, "newName")?;
        let loc = location(dirs, api_id)?;
        let old_path = loc.file_path(&old_name);
        let new_path = loc.file_path(&new_name);

        if !old_path.exists() {
            return Err(not_found(&old_name));
        }
        if new_path.exists() {
            warn!(target: "presetd::presets", "new preset name '{}' is already in use", new_name);
            return Err(name_taken(&new_name));
        }

        let mut data = read_document(&old_path, &old_name)?;
        match data.as_object_mut() {
            Some(obj) => {
                obj.insert("name".to_string(), Value::String(new_name.clone()));
            }
            None => warn!(target: "presetd::presets", "preset '{}' is not a JSON object; name field left untouched", old_name),
        }
        let bytes = serialize(&data)?;
        write_exclusive(&new_path, &bytes).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                name_taken(&new_name)
            } else {
                AppError::io(&format!("publish {}", new_path.display()), e)
            }
        })?;

        match fs::remove_file(&old_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(target: "presetd::presets", "old preset '{}' vanished during rename", old_name);
            }
            Err(e) => return Err(AppError::io(&format!("remove {}", old_path.display()), e)),
        }
        info!(target: "presetd::presets", "renamed preset '{}' -> '{}' for {}", old_name, new_name, api_id);
        Ok(())
    }

    /// Remove preset `name`. `NotFound` when there is nothing to remove.
    pub fn delete(&self, dirs: &UserDirectories, api_id: &str, name: &str) -> AppResult<()> {
        let name = require_name(name, "name")?;
        let loc = location(dirs, api_id)?;
        if !remove_if_present(&loc.file_path(&name))? {
            return Err(not_found(&name));
        }
        info!(target: "presetd::presets", "deleted preset '{}' for {}", name, api_id);
        Ok(())
    }

    /// Look up the bundled default matching `(backend folder, name)`.
    /// Never reads or writes user presets.
    pub fn restore_lookup(&self, dirs: &UserDirectories, api_id: &str, name: &str) -> AppResult<RestoreResult> {
        let Some(loc) = resolve_location(api_id, dirs) else {
            return Ok(RestoreResult::not_default());
        };
        let name = sanitize_name(name);
        let Some(default) = self.defaults.find(dirs, &loc.folder, &name) else {
            return Ok(RestoreResult::not_default());
        };
        let preset = self.defaults.read_content(&default.filename)?.unwrap_or_else(|| json!({}));
        Ok(RestoreResult { is_default: true, preset })
    }

    /// Read back a saved preset.
    pub fn read(&self, dirs: &UserDirectories, api_id: &str, name: &str) -> AppResult<Value> {
        let name = require_name(name, "name")?;
        let loc = location(dirs, api_id)?;
        read_document(&loc.file_path(&name), &name)
    }

    /// Save into the OpenAI folder without backend resolution.
    // TODO: fold into `save` once clients send `apiId: "openai"` to /save.
    pub fn save_openai(&self, dirs: &UserDirectories, name: &str, content: Option<&Value>) -> AppResult<String> {
        let name = require_name(name, "name")?;
        let content = require_content(content)?;
        save_at(&BackendId::OpenAi.location(dirs), &name, content)?;
        info!(target: "presetd::presets", "saved openai preset '{}'", name);
        Ok(name)
    }

    /// Delete from the OpenAI folder. `Ok(false)` when the preset did not exist.
    pub fn delete_openai(&self, dirs: &UserDirectories, name: &str) -> AppResult<bool> {
        let name = require_name(name, "name")?;
        let removed = remove_if_present(&BackendId::OpenAi.location(dirs).file_path(&name))?;
        if removed {
            info!(target: "presetd::presets", "deleted openai preset '{}'", name);
        }
        Ok(removed)
    }
}

fn require_name(raw: &str, field: &str) -> AppResult<String> {
    sanitized_or_none(Some(raw)).ok_or_else(|| {
        AppError::user("invalid_name".to_string(), format!("'{}' is missing or not a valid preset name", field))
    })
}

fn require_content(content: Option<&Value>) -> AppResult<&Value> {
    content
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::user("missing_preset", "preset content is required"))
}

fn location(dirs: &UserDirectories, api_id: &str) -> AppResult<PresetLocation> {
    resolve_location(api_id, dirs)
        .ok_or_else(|| AppError::user("unknown_backend".to_string(), format!("unknown apiId '{}'", api_id)))
}

fn not_found(name: &str) -> AppError {
    AppError::not_found("preset_not_found".to_string(), format!("preset '{}' does not exist", name))
}

fn name_taken(name: &str) -> AppError {
    AppError::conflict("preset_name_taken".to_string(), format!("preset name '{}' is already in use", name))
}

fn serialize(content: &Value) -> AppResult<Vec<u8>> {
    to_pretty_json(content).map_err(|e| AppError::internal("serialize_error".to_string(), e.to_string()))
}

fn save_at(loc: &PresetLocation, name: &str, content: &Value) -> AppResult<()> {
    fs::create_dir_all(&loc.folder).map_err(|e| AppError::io(&format!("create {}", loc.folder.display()), e))?;
    let path = loc.file_path(name);
    let bytes = serialize(content)?;
    write_atomic(&path, &bytes).map_err(|e| AppError::io(&format!("write {}", path.display()), e))
}

fn read_document(path: &Path, name: &str) -> AppResult<Value> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found(name)),
        Err(e) => return Err(AppError::io(&format!("read {}", path.display()), e)),
    };
    serde_json::from_str(&raw)
        .map_err(|e| AppError::internal("corrupt_preset".to_string(), format!("{}: {}", path.display(), e)))
}

/// Unlink `path`; `Ok(false)` if it was already gone.
fn remove_if_present(path: &Path) -> AppResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::io(&format!("remove {}", path.display()), e)),
    }
}

#[cfg(test)]
#[path = "presets_tests.rs"]
mod presets_tests;
