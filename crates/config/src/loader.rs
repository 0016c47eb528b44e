use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::HeraldConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["herald.toml", "herald.yaml", "herald.yml", "herald.json"];

/// System-wide config directory, searched last.
const SYSTEM_CONFIG_DIR: &str = "/etc/herald";

/// Supported config file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Format for `path`; a missing extension means TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toml => write!(f, "TOML"),
            Self::Yaml => write!(f, "YAML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HeraldConfig> {
    let format = ConfigFormat::from_path(path)?;
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, format).map_err(|message| Error::parse(path, message))
}

/// Load the explicit config file, or discover one in the standard locations.
///
/// Search order when `explicit` is `None`:
/// 1. `./herald.{toml,yaml,yml,json}` (working directory)
/// 2. `~/.config/herald/herald.{toml,yaml,yml,json}` (user)
/// 3. `/etc/herald/herald.{toml,yaml,yml,json}` (system)
///
/// Returns `HeraldConfig::default()` and no path when nothing is found.
pub fn load(explicit: Option<&Path>) -> Result<(HeraldConfig, Option<PathBuf>)> {
    let Some(path) = explicit.map(Path::to_path_buf).or_else(find_config_file) else {
        debug!("no config file found, using defaults");
        return Ok((HeraldConfig::default(), None));
    };
    debug!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    Ok((config, Some(path)))
}

/// Find the first config file in the standard locations.
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(config_dir());
    dirs.push(PathBuf::from(SYSTEM_CONFIG_DIR));
    find_in_dirs(&dirs)
}

fn find_in_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

/// Returns the user config directory (`~/.config/herald/`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "herald").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, format: ConfigFormat) -> std::result::Result<HeraldConfig, String> {
    match format {
        ConfigFormat::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
    }
}
