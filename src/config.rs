//! Server configuration: CLI flags override environment variables, which
//! override built-in defaults.

use std::path::PathBuf;

use crate::users::DEFAULT_USER_HANDLE;

pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_CONTENT_ROOT: &str = "default/content";

pub const ENV_HTTP_PORT: &str = "PRESETD_HTTP_PORT";
pub const ENV_DATA_ROOT: &str = "PRESETD_DATA_ROOT";
pub const ENV_CONTENT_ROOT: &str = "PRESETD_CONTENT_ROOT";
pub const ENV_DEFAULT_USER: &str = "PRESETD_DEFAULT_USER";

pub const USAGE: &str = "presetd Server\n\nUSAGE:\n  presetd_server [--http-port N] [--data-root PATH] [--content-root PATH] [--default-user HANDLE]\n\nOPTIONS:\n  --http-port N          HTTP API port (env: PRESETD_HTTP_PORT, default 8000)\n  --data-root PATH       Root of per-user data folders (env: PRESETD_DATA_ROOT, default data)\n  --content-root PATH    Bundled default content with index.json (env: PRESETD_CONTENT_ROOT, default default/content)\n  --default-user HANDLE  User for requests without x-user-handle (env: PRESETD_DEFAULT_USER, default default-user)\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub data_root: PathBuf,
    pub content_root: PathBuf,
    pub default_user: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            content_root: PathBuf::from(DEFAULT_CONTENT_ROOT),
            default_user: DEFAULT_USER_HANDLE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Resolve from process arguments and the real environment.
    pub fn from_env_and_args(args: &[String]) -> Self {
        Self::resolve(args, |k| std::env::var(k).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve<F>(args: &[String], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let http_port = parse_port_arg(args, "--http-port")
            .or_else(|| env(ENV_HTTP_PORT).and_then(|v| v.parse::<u16>().ok()))
            .unwrap_or(d.http_port);
        let data_root = arg_value(args, "--data-root")
            .or_else(|| env(ENV_DATA_ROOT))
            .map(PathBuf::from)
            .unwrap_or(d.data_root);
        let content_root = arg_value(args, "--content-root")
            .or_else(|| env(ENV_CONTENT_ROOT))
            .map(PathBuf::from)
            .unwrap_or(d.content_root);
        let default_user = arg_value(args, "--default-user")
            .or_else(|| env(ENV_DEFAULT_USER))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(d.default_user);
        Self { http_port, data_root, content_root, default_user }
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    arg_value(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}
