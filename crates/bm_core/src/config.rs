//! Import configuration.
//!
//! Ten independent toggles decide which parts of a level are skipped during
//! a map import. Every toggle defaults to `true`; a JSON file may switch any
//! subset off.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn enabled() -> bool {
    true
}

/// Exclusion toggles for a map import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Weapons, interactables and anything under `includes.` / `equipment.`
    #[serde(default = "enabled")]
    pub exclude_dynamic: bool,

    /// `_Glacier` collision meshes and `_test` placeholders
    #[serde(default = "enabled")]
    pub exclude_collision: bool,

    /// Map overlay ("screens") meshes
    #[serde(default = "enabled")]
    pub exclude_overlay: bool,

    #[serde(default = "enabled")]
    pub exclude_fog: bool,

    #[serde(default = "enabled")]
    pub exclude_dust: bool,

    #[serde(default = "enabled")]
    pub exclude_glow: bool,

    #[serde(default = "enabled")]
    pub exclude_cover: bool,

    /// `ZBound` bounding-box nodes
    #[serde(default = "enabled")]
    pub exclude_bbox: bool,

    /// `ZShadowMeshObj` shadow casters
    #[serde(default = "enabled")]
    pub exclude_shadow: bool,

    /// Sub-meshes without a valid diffuse texture
    #[serde(default = "enabled")]
    pub exclude_textures: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::all(true)
    }
}

impl ImportSettings {
    /// Settings with every toggle set to `value`.
    pub fn all(value: bool) -> Self {
        Self {
            exclude_dynamic: value,
            exclude_collision: value,
            exclude_overlay: value,
            exclude_fog: value,
            exclude_dust: value,
            exclude_glow: value,
            exclude_cover: value,
            exclude_bbox: value,
            exclude_shadow: value,
            exclude_textures: value,
        }
    }

    /// Settings that keep everything.
    pub fn include_all() -> Self {
        Self::all(false)
    }
}

/// Full import configuration: exclusion toggles plus the output location.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Root directory for extracted maps. Empty or absent means "next to the archive".
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    #[serde(default)]
    pub settings: ImportSettings,
}

impl ImportConfig {
    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Resolve the output root for an archive.
    ///
    /// Falls back to the archive's directory when no output path is set.
    pub fn output_root(&self, archive: &Path) -> PathBuf {
        match &self.output_path {
            Some(path) if !path.as_os_str().is_empty() => path.clone(),
            _ => archive
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}
