pub mod config;
pub mod error;
pub mod explorer;
pub mod grid;
pub mod inputs;
pub mod manifest;
pub mod matte;
pub mod preview;
pub mod remover;
pub mod slicer;

pub use error::{Error, Result};

/// Manifest written next to the sliced tiles unless `--labels-json` is given.
pub const DEFAULT_MANIFEST_NAME: &str = "labels.json";
/// Preview page written next to the sliced tiles unless `--html` is given.
pub const DEFAULT_PREVIEW_NAME: &str = "index.html";
