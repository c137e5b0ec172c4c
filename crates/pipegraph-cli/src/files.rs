//! Reading and writing component files.
//!
//! The format follows the file extension: `.yaml`/`.yml` is YAML, anything
//! else is JSON. YAML enums use the single-key map form in both directions
//! (`implementation: {container: ...}`, `- inputPath: data`), matching JSON,
//! rather than serde_yaml's `!tag` default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_yaml::with::singleton_map_recursive;
use thiserror::Error;

use pipegraph_core::ComponentSpec;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}' as YAML: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to parse '{path}' as JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize output: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn of(path: &Path) -> Format {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    pub fn render<T: Serialize>(self, value: &T) -> Result<String, FileError> {
        match self {
            Format::Json => serde_json::to_string_pretty(value)
                .map_err(|e| FileError::Serialize(e.to_string())),
            Format::Yaml => to_yaml(value).map_err(|e| FileError::Serialize(e.to_string())),
        }
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String, serde_yaml::Error> {
    let mut buffer = Vec::new();
    let mut serializer = serde_yaml::Serializer::new(&mut buffer);
    singleton_map_recursive::serialize(value, &mut serializer)?;
    drop(serializer);
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Loads a component from `path`.
pub fn load_component(path: &Path) -> Result<ComponentSpec, FileError> {
    let text = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = parse_component(path, &text)?;
    tracing::debug!(path = %path.display(), component = spec.display_name(), "loaded component");
    Ok(spec)
}

pub fn parse_component(path: &Path, text: &str) -> Result<ComponentSpec, FileError> {
    match Format::of(path) {
        Format::Yaml => {
            singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(text))
                .map_err(|source| FileError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
        }
        Format::Json => serde_json::from_str(text).map_err(|source| FileError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `text` to `output`, or to stdout when `output` is `None`.
pub fn emit(text: &str, output: Option<&Path>) -> Result<(), FileError> {
    match output {
        Some(path) => fs::write(path, text).map_err(|source| FileError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}
