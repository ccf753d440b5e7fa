use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::brush::BrushSpec;
use crate::colorizer::{Palette, Window};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Display and editing defaults. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial intensity window.
    pub window: Window,
    pub palette: Palette,
    /// Number of labels offered for painting; caps the colours in use.
    pub label_count: usize,
    /// Overlay alpha for labelled voxels, opaque when `None`.
    pub overlay_alpha: Option<u8>,
    /// Largest value an annotation file may hold.
    pub max_label_value: u8,
    pub brush: BrushSpec,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: Window::default(),
            palette: Palette::default(),
            label_count: 5,
            overlay_alpha: Some(128),
            max_label_value: 50,
            brush: BrushSpec::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.bottom() >= self.window.top() {
            return Err(ConfigError::Invalid(format!(
                "window bottom {} must be below top {}",
                self.window.bottom(),
                self.window.top()
            )));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::Invalid("palette is empty".into()));
        }
        if self.brush.size == 0 {
            return Err(ConfigError::Invalid("brush size must be at least 1".into()));
        }
        Ok(())
    }
}
