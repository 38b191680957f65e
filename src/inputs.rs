// ── Input discovery ───────────────────────────────────────────────────────────

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Error, Result};

/// Raster extensions accepted when scanning a directory.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Expand glob `patterns` into existing files.
///
/// Matches of each pattern are sorted; patterns keep their given order and a
/// path matched twice is kept once. Returns `Error::NoInputs` when nothing
/// matches at all.
pub fn discover_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut paths = Vec::new();

    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern.as_ref())?
            .filter_map(|entry| match entry {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("unreadable match for '{}': {e}", pattern.as_ref());
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect();
        matched.sort();
        paths.extend(matched.into_iter().filter(|p| seen.insert(p.clone())));
    }

    if paths.is_empty() {
        return Err(Error::NoInputs(
            patterns.iter().map(|p| p.as_ref().to_owned()).collect(),
        ));
    }
    Ok(paths)
}

/// `path` itself when it is a file, otherwise the images directly inside the
/// directory `path`, sorted by name.
pub fn list_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::NotFound(path.to_path_buf()));
    }

    let mut images: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect();
    images.sort();
    Ok(images)
}

/// Whether `path` has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
