//! Backend identifiers and where their presets live.

use std::path::{Path, PathBuf};

use crate::users::UserDirectories;

/// Extension shared by every preset file.
pub const PRESET_EXTENSION: &str = ".json";

/// Generation backends that own a preset folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    Kobold,
    KoboldHorde,
    Novel,
    TextGenerationWebUi,
    OpenAi,
    Instruct,
    Context,
}

impl BackendId {
    pub const ALL: [BackendId; 7] = [
        BackendId::Kobold,
        BackendId::KoboldHorde,
        BackendId::Novel,
        BackendId::TextGenerationWebUi,
        BackendId::OpenAi,
        BackendId::Instruct,
        BackendId::Context,
    ];

    /// Parse the wire identifier (`apiId`). Matching is exact.
    pub fn parse(api_id: &str) -> Option<Self> {
        match api_id {
            "kobold" => Some(BackendId::Kobold),
            "koboldhorde" => Some(BackendId::KoboldHorde),
            "novel" => Some(BackendId::Novel),
            "textgenerationwebui" => Some(BackendId::TextGenerationWebUi),
            "openai" => Some(BackendId::OpenAi),
            "instruct" => Some(BackendId::Instruct),
            "context" => Some(BackendId::Context),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Kobold => "kobold",
            BackendId::KoboldHorde => "koboldhorde",
            BackendId::Novel => "novel",
            BackendId::TextGenerationWebUi => "textgenerationwebui",
            BackendId::OpenAi => "openai",
            BackendId::Instruct => "instruct",
            BackendId::Context => "context",
        }
    }

    /// Folder for this backend within a user's directory set.
    /// Kobold and Kobold Horde share one folder.
    pub fn folder<'a>(&self, dirs: &'a UserDirectories) -> &'a Path {
        match self {
            BackendId::Kobold | BackendId::KoboldHorde => &dirs.kobold_ai_settings,
            BackendId::Novel => &dirs.novel_ai_settings,
            BackendId::TextGenerationWebUi => &dirs.text_gen_settings,
            BackendId::OpenAi => &dirs.open_ai_settings,
            BackendId::Instruct => &dirs.instruct,
            BackendId::Context => &dirs.context,
        }
    }

    pub fn location(&self, dirs: &UserDirectories) -> PresetLocation {
        PresetLocation { folder: self.folder(dirs).to_path_buf(), extension: PRESET_EXTENSION }
    }
}

/// Resolved storage location for one backend and user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetLocation {
    pub folder: PathBuf,
    pub extension: &'static str,
}

impl PresetLocation {
    /// Path of the file holding preset `name`. `name` must already be sanitized.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.folder.join(format!("{}{}", name, self.extension))
    }
}

/// Resolve `api_id` for a user. Unknown identifiers resolve to `None`.
pub fn resolve_location(api_id: &str, dirs: &UserDirectories) -> Option<PresetLocation> {
    BackendId::parse(api_id).map(|b| b.location(dirs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs() -> UserDirectories {
        UserDirectories::at(PathBuf::from("/u"))
    }

    #[test]
    fn parse_roundtrips_wire_names() {
        for b in BackendId::ALL {
            assert_eq!(BackendId::parse(b.as_str()), Some(b));
        }
        assert_eq!(BackendId::parse("Kobold"), None);
        assert_eq!(BackendId::parse(""), None);
    }

    #[test]
    fn kobold_variants_share_folder() {
        let d = dirs();
        let a = resolve_location("kobold", &d).unwrap();
        let b = resolve_location("koboldhorde", &d).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.folder, PathBuf::from("/u/KoboldAI Settings"));
        assert_eq!(a.extension, ".json");
    }

    #[test]
    fn known_backends_map_to_their_folder() {
        let d = dirs();
        assert_eq!(resolve_location("novel", &d).unwrap().folder, d.novel_ai_settings);
        assert_eq!(resolve_location("textgenerationwebui", &d).unwrap().folder, d.text_gen_settings);
        assert_eq!(resolve_location("openai", &d).unwrap().folder, d.open_ai_settings);
        assert_eq!(resolve_location("instruct", &d).unwrap().folder, d.instruct);
        assert_eq!(resolve_location("context", &d).unwrap().folder, d.context);
    }

    #[test]
    fn unknown_backend_has_no_location() {
        assert!(resolve_location("mancer", &dirs()).is_none());
    }

    #[test]
    fn file_path_appends_extension() {
        let loc = resolve_location("instruct", &dirs()).unwrap();
        assert_eq!(loc.file_path("Alpaca"), PathBuf::from("/u/instruct/Alpaca.json"));
    }
}
