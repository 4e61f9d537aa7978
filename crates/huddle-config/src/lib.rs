//! Configuration system for the Huddle chat server.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[messaging]` and `[completion]` sections
//! - Config file layering (XDG user config + project-local overrides)
//! - Environment overrides (`HUDDLE_*` variables)
//! - Secret resolution (env var → config file)

pub mod discovery;
pub mod env;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use env::{apply_env_overrides, apply_env_overrides_from, parse_flag};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, resolve_secret, resolve_secret_from};
pub use types::*;
