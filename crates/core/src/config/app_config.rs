use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config {path} must be a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("merged config is invalid: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Settings for the object detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Local ONNX model file; takes precedence over `model_url`.
    pub model_path: Option<PathBuf>,
    /// Where to fetch the model when it is not cached locally.
    pub model_url: Option<String>,
    pub confidence_threshold: f64,
    pub nms_threshold: f64,
    /// Fallback input resolution when the model does not declare one.
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_url: None,
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
            input_size: 640,
        }
    }
}

/// Settings for the multi-object tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Updates a track may go unmatched before it is removed.
    pub max_age: usize,
    /// Consecutive matches before a new track is reported.
    pub n_init: usize,
    /// Maximum `1 - IoU` for a detection to be associated with a track.
    pub max_iou_distance: f64,
    /// Detections below this confidence are ignored entirely.
    pub min_confidence: f64,
    /// Detections at or above this confidence may start new tracks.
    pub high_confidence: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 70,
            n_init: 3,
            max_iou_distance: 0.7,
            min_confidence: 0.3,
            high_confidence: 0.5,
        }
    }
}

/// Detector and tracker settings resolved from the configuration documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
}

impl AppConfig {
    /// Loads each JSON document in order and deep-merges it over the defaults.
    ///
    /// Later documents override earlier ones key by key; nested objects are
    /// merged rather than replaced.
    pub fn load(paths: &[&Path]) -> Result<Self, ConfigError> {
        let mut merged = serde_json::to_value(Self::default()).map_err(ConfigError::Invalid)?;
        for path in paths {
            let overlay = read_document(path)?;
            merge_values(&mut merged, overlay);
        }
        serde_json::from_value(merged).map_err(ConfigError::Invalid)
    }
}

fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(value)
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
