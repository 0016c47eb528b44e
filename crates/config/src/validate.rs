//! Configuration validation engine.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and reports settings that will misbehave at
//! runtime (flooding, unjoinable fallback, missing TLS material).

use std::{collections::HashMap, path::Path};

use {herald_common::names::is_channel_name, secrecy::ExposeSecret};

use crate::{
    env_subst::substitute_env,
    loader::ConfigFormat,
    schema::{HeraldConfig, MAX_CHANNEL_MAXLEN},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "security",
    /// "irc", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "irc.nickname"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar value — stop recursion.
    Leaf,
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let irc = Struct(HashMap::from([
        ("server", Leaf),
        ("port", Leaf),
        ("ssl", Leaf),
        ("nickname", Leaf),
        ("realname", Leaf),
        ("username", Leaf),
        ("server_password", Leaf),
        ("reconnection_interval", Leaf),
        ("line_sleep", Leaf),
        ("fallback_channel", Leaf),
        ("max_join_attempts", Leaf),
        ("memory_timeout", Leaf),
        ("channel_maxlen", Leaf),
        ("keepalive_interval", Leaf),
        ("connect_timeout", Leaf),
    ]));

    let listener = Struct(HashMap::from([
        ("host", Leaf),
        ("port", Leaf),
        ("password", Leaf),
        ("ssl", Leaf),
        ("ssl_cert", Leaf),
        ("ssl_key", Leaf),
    ]));

    let metrics = Struct(HashMap::from([("enabled", Leaf), ("listen", Leaf)]));

    Struct(HashMap::from([
        ("irc", irc),
        ("listener", listener),
        ("metrics", metrics),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Best match for `needle` among `candidates`, if within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let format = match ConfigFormat::from_path(actual_path) {
        Ok(format) => format,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "syntax",
                    path: String::new(),
                    message: e.to_string(),
                }],
                config_path: Some(actual_path.clone()),
            };
        },
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let mut result = validate_str(&substitute_env(&content), format);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, ConfigFormat::Toml)
}

/// Validate raw config text in the given format.
#[must_use]
pub fn validate_str(raw: &str, format: ConfigFormat) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax — parse into a generic value tree
    let parsed: Result<toml::Value, String> = match format {
        ConfigFormat::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
    };
    let value = match parsed {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("{format} syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    let schema = build_schema_map();
    check_unknown_fields(&value, &schema, "", &mut diagnostics);

    // 3. Type check, then semantic checks on what parsed
    match value.try_into::<HeraldConfig>() {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        // Leaf or type mismatch — type errors are caught later
        return;
    };
    let mut known_keys: Vec<&str> = fields.keys().copied().collect();
    known_keys.sort_unstable();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: msg.trim().to_string(),
        });
    }
}

/// Semantic checks only, for a config that is already loaded (including the
/// built-in defaults when no file exists).
#[must_use]
pub fn validate_config(config: &HeraldConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantic_warnings(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic_warnings(config: &HeraldConfig, diagnostics: &mut Vec<Diagnostic>) {
    let irc = &config.irc;
    let listener = &config.listener;

    if irc.nickname.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "irc",
            path: "irc.nickname".into(),
            message: "nickname must not be empty".into(),
        });
    }

    if irc.channel_maxlen > MAX_CHANNEL_MAXLEN {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "irc",
            path: "irc.channel_maxlen".into(),
            message: format!(
                "{} does not fit on an IRC line; clamped to {MAX_CHANNEL_MAXLEN}",
                irc.channel_maxlen
            ),
        });
    }

    if let Some(fallback) = irc.fallback_channel()
        && !is_channel_name(fallback)
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "irc",
            path: "irc.fallback_channel".into(),
            message: format!(
                "\"{fallback}\" is not a channel name; rerouted messages will go to a user"
            ),
        });
    }

    if irc.line_sleep <= 0.0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "irc",
            path: "irc.line_sleep".into(),
            message: "no delay between lines; the server may disconnect for flooding".into(),
        });
    }

    if irc.max_join_attempts == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "irc",
            path: "irc.max_join_attempts".into(),
            message: "join backoff is disabled; unjoinable channels are retried forever".into(),
        });
    }

    if listener.password.expose_secret().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "security",
            path: "listener.password".into(),
            message: "listener password must not be empty".into(),
        });
    }

    if listener.ssl && listener.ssl_cert.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "security",
            path: "listener.ssl_cert".into(),
            message: "listener.ssl is enabled but listener.ssl_cert is missing".into(),
        });
    }

    let is_localhost = matches!(listener.host.as_str(), "127.0.0.1" | "localhost" | "::1");
    if !listener.ssl && !is_localhost {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "security",
            path: "listener".into(),
            message: format!(
                "TLS is disabled while binding to {}; the password travels in clear text",
                listener.host
            ),
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
