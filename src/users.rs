use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::ident::sanitize_name;

pub const DEFAULT_USER_HANDLE: &str = "default-user";

/// Per-user folder set. Every preset operation receives one of these explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDirectories {
    pub root: PathBuf,
    pub kobold_ai_settings: PathBuf,
    pub novel_ai_settings: PathBuf,
    pub text_gen_settings: PathBuf,
    pub open_ai_settings: PathBuf,
    pub instruct: PathBuf,
    pub context: PathBuf,
}

impl UserDirectories {
    /// Build the directory set for `handle` under `data_root`. The handle goes
    /// through the same sanitizer as preset names.
    pub fn for_user(data_root: &Path, handle: &str) -> AppResult<Self> {
        let handle = sanitize_name(handle);
        if handle.is_empty() {
            return Err(AppError::user("invalid_user", "user handle is empty or invalid"));
        }
        Ok(Self::at(data_root.join(handle)))
    }

    /// Directory set rooted at an already-resolved user folder.
    pub fn at(root: PathBuf) -> Self {
        Self {
            kobold_ai_settings: root.join("KoboldAI Settings"),
            novel_ai_settings: root.join("NovelAI Settings"),
            text_gen_settings: root.join("TextGen Settings"),
            open_ai_settings: root.join("OpenAI Settings"),
            instruct: root.join("instruct"),
            context: root.join("context"),
            root,
        }
    }

    fn preset_folders(&self) -> [&Path; 6] {
        [
            &self.kobold_ai_settings,
            &self.novel_ai_settings,
            &self.text_gen_settings,
            &self.open_ai_settings,
            &self.instruct,
            &self.context,
        ]
    }

    /// Create every preset folder; safe to call repeatedly.
    pub fn ensure_exist(&self) -> AppResult<()> {
        for dir in self.preset_folders() {
            std::fs::create_dir_all(dir)
                .map_err(|e| AppError::io(&format!("create {}", dir.display()), e))?;
        }
        Ok(())
    }
}
