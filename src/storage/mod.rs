//!
//! presetd storage module
//! ----------------------
//! On-disk preset store. Each preset is one pretty-printed JSON file at
//! `<backend folder>/<sanitized name>.json` inside the requesting user's
//! directory set.
//!
//! Key responsibilities:
//! - Crash-safe publication of preset files (`atomic`).
//! - Save/rename/delete with collision and missing-file detection (`presets`).
//! - Restore lookups against the bundled default index.

pub mod atomic;
pub mod presets;

pub use presets::{PresetStore, RestoreResult};
