// ── Configuration ────────────────────────────────────────────────────────────
//
// Tool defaults, optionally loaded from a TOML file. Every section is
// `#[serde(default)]`, so a file only needs the keys it overrides.
// Command-line flags take precedence over file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matte::Background;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub slice: SliceConfig,
    pub matte: MatteConfig,
    pub explorer: ExplorerConfig,
}

/// Defaults for the `slice` and `cutout` commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Glob patterns for input sheets.
    pub inputs: Vec<String>,
    pub out_dir: PathBuf,
    /// Grid as `NxM`.
    pub grid: String,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            inputs: vec!["assets/atlas/*.png".to_owned()],
            out_dir: PathBuf::from("assets/atlas/slices"),
            grid: "2x2".to_owned(),
        }
    }
}

/// Matte thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatteConfig {
    pub background: Background,
    pub white_threshold: u8,
    pub black_threshold: u8,
    /// Max RGB spread still treated as neutral.
    pub chroma_threshold: u8,
    /// Channel-sum distance bound for distance mode.
    pub distance_threshold: u32,
    /// Reference sample point for distance mode.
    pub sample: [u32; 2],
}

impl Default for MatteConfig {
    fn default() -> Self {
        Self {
            background: Background::White,
            white_threshold: 245,
            black_threshold: 12,
            chroma_threshold: 10,
            distance_threshold: 30,
            sample: [0, 0],
        }
    }
}

/// Explorer grid and export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub tile_w: u32,
    pub tile_h: u32,
    pub margin: u32,
    pub spacing: u32,
    /// Display zoom factor.
    pub scale: f32,
    pub out_dir: PathBuf,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            tile_w: 512,
            tile_h: 512,
            margin: 0,
            spacing: 0,
            scale: 0.4,
            out_dir: PathBuf::from("sprite_exports"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file is missing and `Error::Parse` if
    /// it is not valid TOML for this schema.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
