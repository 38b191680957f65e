// ── Label manifest ────────────────────────────────────────────────────────────
//
// The JSON contract shared by the slicer, the HTML preview and the explorer:
// - `labels.json`: an array of `TileRecord`s written after slicing;
// - `<image>.json` sidecars: `{ image, tile_w, ..., labels: [{index, label}] }`.
// Readers accept either a bare array or an object with a `labels` array, and
// skip entries that fail to parse.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};

// ── TileRecord ────────────────────────────────────────────────────────────────

/// One sliced tile as recorded in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    /// File name of the source sheet.
    #[serde(default)]
    pub sheet: String,
    #[serde(alias = "index")]
    pub tile_index: u32,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
    /// Tile path relative to the manifest's directory.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub label: String,
}

/// Parse manifest JSON into records, skipping malformed entries.
pub fn parse_records(json: &str, origin: &Path) -> Result<Vec<TileRecord>> {
    let doc: Value = serde_json::from_str(json).map_err(|e| Error::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(entries(doc, origin)?
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<TileRecord>(entry) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!("{}: skipping entry {i}: {e}", origin.display());
                None
            }
        })
        .collect())
}

/// Read a manifest file. A missing file is `Error::NotFound`.
pub fn read_manifest(path: &Path) -> Result<Vec<TileRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    parse_records(&json, path)
}

/// Write `records` as a pretty-printed JSON array, creating parent dirs.
pub fn write_manifest(path: &Path, records: &[TileRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(records)?)?;
    Ok(())
}

fn entries(doc: Value, origin: &Path) -> Result<Vec<Value>> {
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("labels") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(Error::Parse {
                path: origin.to_path_buf(),
                message: "`labels` is not an array".to_owned(),
            }),
            None => Ok(Vec::new()),
        },
        _ => Err(Error::Parse {
            path: origin.to_path_buf(),
            message: "expected an array or an object with `labels`".to_owned(),
        }),
    }
}

// ── Label sanitising ──────────────────────────────────────────────────────────

/// File-name form of a label for manifest renames: lowercase, every run of
/// characters outside `[a-z0-9]` collapsed to `_`, outer `_` trimmed.
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.trim().to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_owned()
}

/// Label suffix for explorer exports: keeps alphanumerics, `-` and `_`, then
/// trims `_`/`-` from both ends.
pub fn export_label_suffix(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .trim_matches(|c| c == '_' || c == '-')
        .to_owned()
}

// ── apply_labels ──────────────────────────────────────────────────────────────

/// Outcome of [`apply_labels`].
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub renamed: usize,
    pub missing: Vec<PathBuf>,
    /// Tiles whose rename failed; their records are left unchanged.
    pub failed: Vec<(PathBuf, Error)>,
}

/// Rename every tile listed in the manifest at `labels_path` to
/// `{stem}__{label}.png` and rewrite the manifest with the new file names.
///
/// `stem` is the part of the current file stem before the first `__`. Records
/// without a label fall back to `tile_{index}`. Missing tiles and failed
/// renames are reported and skipped; the manifest is rewritten either way.
pub fn apply_labels(labels_path: &Path) -> Result<ApplyReport> {
    let mut records = read_manifest(labels_path)?;
    let base_dir = labels_path.parent().unwrap_or_else(|| Path::new(""));
    let mut report = ApplyReport::default();

    for rec in &mut records {
        let label = match sanitize_label(&rec.label) {
            s if s.is_empty() => format!("tile_{}", rec.tile_index),
            s => s,
        };
        let rel = PathBuf::from(&rec.file);
        let file_path = base_dir.join(&rel);
        if !file_path.is_file() {
            warn!("missing file: {}", file_path.display());
            report.missing.push(file_path);
            continue;
        }

        let stem = rel
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let stem = stem.split("__").next().unwrap_or(stem);
        let new_name = format!("{stem}__{label}.png");
        let new_path = file_path.with_file_name(&new_name);
        if new_path == file_path {
            continue;
        }
        if new_path.exists() {
            warn!("overwriting existing {}", new_path.display());
        }
        match std::fs::rename(&file_path, &new_path) {
            Ok(()) => {
                rec.file = rel.with_file_name(&new_name).to_string_lossy().into_owned();
                report.renamed += 1;
            }
            Err(e) => {
                warn!("failed to rename {}: {e}", file_path.display());
                report.failed.push((file_path, e.into()));
            }
        }
    }

    write_manifest(labels_path, &records)?;
    info!("renamed files and updated labels: {}", labels_path.display());
    Ok(report)
}

// ── Sidecar labels ────────────────────────────────────────────────────────────

/// One `{index, label}` pair in a sidecar file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(alias = "tile_index")]
    pub index: u32,
    pub label: String,
}

/// Per-image label sidecar written by the explorer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelSidecar {
    pub image: String,
    pub tile_w: u32,
    pub tile_h: u32,
    pub margin: u32,
    pub spacing: u32,
    pub columns: u32,
    pub rows: u32,
    pub labels: Vec<LabelEntry>,
}

/// Default sidecar location: the image path with a `.json` extension.
pub fn sidecar_path(image: &Path) -> PathBuf {
    image.with_extension("json")
}

/// Load `index → label` pairs from a sidecar (or any manifest shape).
///
/// A missing file yields `Error::NotFound`; malformed entries are skipped
/// with a warning.
pub fn read_sidecar_labels(path: &Path) -> Result<BTreeMap<u32, String>> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&json).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut labels = BTreeMap::new();
    for (i, entry) in entries(doc, path)?.into_iter().enumerate() {
        match serde_json::from_value::<LabelEntry>(entry) {
            Ok(LabelEntry { index, label }) => {
                labels.insert(index, label);
            }
            Err(e) => warn!("{}: skipping label {i}: {e}", path.display()),
        }
    }
    Ok(labels)
}

/// Write a sidecar, creating parent directories.
pub fn write_sidecar(path: &Path, sidecar: &LabelSidecar) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(sidecar)?)?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
