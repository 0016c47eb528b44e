//! Configuration loading, validation and env substitution.
//!
//! Config files: `herald.toml`, `herald.yaml`, or `herald.json`
//! Searched in `./`, then `~/.config/herald/`, then `/etc/herald/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{ConfigFormat, config_dir, find_config_file, load, load_config},
    schema::{
        HeraldConfig, IRC_LINE_LIMIT, IrcConfig, ListenerConfig, MAX_CHANNEL_MAXLEN,
        MetricsConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
