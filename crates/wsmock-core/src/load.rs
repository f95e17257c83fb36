//! Load - 仕様ドキュメントとイベントドキュメントの読み込み
//!
//! どちらも YAML（JSON は YAML のサブセットなのでそのまま読める）。
//! 一度 `serde_json::Value` に落としてから型に変換する。

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::domain::{EventDocument, SpecDocument};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid event document: {0}")]
    Events(#[source] serde_json::Error),

    #[error("invalid specification: {0}")]
    Shape(String),
}

pub fn load_specification(path: &Path) -> Result<SpecDocument, LoadError> {
    let document = parse_specification(&read(path)?)?;
    info!(path = %path.display(), channels = document.channel_keys().count(), "loaded specification");
    Ok(document)
}

pub fn parse_specification(content: &str) -> Result<SpecDocument, LoadError> {
    let root: Value = serde_yaml::from_str(content)?;
    match root.get("channels") {
        Some(Value::Object(_)) => Ok(SpecDocument::new(root)),
        Some(_) => Err(LoadError::Shape("channels must be a mapping".to_string())),
        None => Err(LoadError::Shape("no channels section".to_string())),
    }
}

pub fn load_events(path: &Path) -> Result<EventDocument, LoadError> {
    let events = parse_events(&read(path)?)?;
    info!(path = %path.display(), events = events.events.len(), "loaded events");
    Ok(events)
}

/// Empty content is an empty event document.
pub fn parse_events(content: &str) -> Result<EventDocument, LoadError> {
    if content.trim().is_empty() {
        return Ok(EventDocument::default());
    }
    let root: Value = serde_yaml::from_str(content)?;
    if root.is_null() {
        return Ok(EventDocument::default());
    }
    serde_json::from_value(root).map_err(LoadError::Events)
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
