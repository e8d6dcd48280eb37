use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::CompileError;
use crate::transpiler::TranspileOptions;

pub const MANIFEST_NAME: &str = "ego.toml";

/// Resolved settings for one run: expansion knobs plus file naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub transpile: TranspileOptions,
    /// Extension (without the dot) of files picked up from directories.
    pub source_extension: String,
    /// Extension written in place of `source_extension`.
    pub output_extension: String,
    /// The `ego.toml` these settings were read from, if any.
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transpile: TranspileOptions::default(),
            source_extension: "ego".to_string(),
            output_extension: "go".to_string(),
            path: None,
        }
    }
}

impl Config {
    /// `dir/name.ego` -> `dir/name.go`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.output_extension)
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.source_extension.as_str())
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlManifest {
    #[serde(default)]
    transpile: TomlTranspile,
    #[serde(default)]
    files: TomlFiles,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlTranspile {
    error_ident: Option<String>,
    temp_prefix: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlFiles {
    source_extension: Option<String>,
    output_extension: Option<String>,
}

// ---- Discovery ----

/// Load settings from `explicit` when given, otherwise from `ego.toml` in
/// `dir` if one exists. A missing implicit manifest yields the defaults; an
/// explicit one must be readable.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Config, CompileError> {
    let manifest_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(MANIFEST_NAME);
            if !candidate.is_file() {
                tracing::debug!(dir = %dir.display(), "no ego.toml, using defaults");
                return Ok(Config::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&manifest_path).map_err(|e| {
        CompileError::config(format!("could not read file: {e}"), manifest_path.clone())
    })?;
    let config = parse_manifest(&content, &manifest_path)?;
    tracing::debug!(path = %manifest_path.display(), "loaded configuration");
    Ok(config)
}

// ---- Parsing & validation ----

pub fn parse_manifest(content: &str, manifest_path: &Path) -> Result<Config, CompileError> {
    let manifest: TomlManifest = toml::from_str(content).map_err(|e| {
        CompileError::config(format!("invalid syntax: {}", e.message()), manifest_path.to_path_buf())
    })?;

    let defaults = Config::default();
    let error_ident = manifest.transpile.error_ident.unwrap_or(defaults.transpile.error_ident);
    let temp_prefix = manifest.transpile.temp_prefix.unwrap_or(defaults.transpile.temp_prefix);
    validate_ident("error_ident", &error_ident, manifest_path)?;
    validate_ident("temp_prefix", &temp_prefix, manifest_path)?;
    if error_ident == temp_prefix {
        return Err(CompileError::config(
            "'error_ident' and 'temp_prefix' must differ",
            manifest_path.to_path_buf(),
        ));
    }

    let source_extension =
        normalize_extension("source_extension", manifest.files.source_extension, defaults.source_extension, manifest_path)?;
    let output_extension =
        normalize_extension("output_extension", manifest.files.output_extension, defaults.output_extension, manifest_path)?;
    if source_extension == output_extension {
        return Err(CompileError::config(
            "'source_extension' and 'output_extension' must differ",
            manifest_path.to_path_buf(),
        ));
    }

    Ok(Config {
        transpile: TranspileOptions { error_ident, temp_prefix },
        source_extension,
        output_extension,
        path: Some(manifest_path.to_path_buf()),
    })
}

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

fn validate_ident(key: &str, value: &str, manifest_path: &Path) -> Result<(), CompileError> {
    let mut chars = value.chars();
    let valid = chars.next().is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && value != "_"
        && !GO_KEYWORDS.contains(&value);
    if !valid {
        return Err(CompileError::config(
            format!("'{key}' must be a Go identifier, got '{value}'"),
            manifest_path.to_path_buf(),
        ));
    }
    Ok(())
}

fn normalize_extension(
    key: &str,
    value: Option<String>,
    default: String,
    manifest_path: &Path,
) -> Result<String, CompileError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let trimmed = value.strip_prefix('.').unwrap_or(&value);
    if trimmed.is_empty() || trimmed.contains(['.', '/', '\\']) {
        return Err(CompileError::config(
            format!("'{key}' must be a plain file extension, got '{value}'"),
            manifest_path.to_path_buf(),
        ));
    }
    Ok(trimmed.to_string())
}
