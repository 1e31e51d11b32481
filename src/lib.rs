pub mod backend;
pub mod config;
pub mod defaults;
pub mod error;
pub mod ident;
pub mod server;
pub mod storage;
pub mod users;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use storage::{PresetStore, RestoreResult};
