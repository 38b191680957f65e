// ── Errors ───────────────────────────────────────────────────────────────────

use std::path::PathBuf;

/// Top-level error type for matting, slicing and labeling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A JSON or TOML document could not be understood.
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The sheet does not divide evenly into the requested grid.
    #[error("size {width}x{height} not divisible by {columns}x{rows}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        columns: u32,
        rows: u32,
    },

    /// Malformed grid or tile-size argument.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// The colour sample point lies outside the image.
    #[error("sample point ({x}, {y}) outside {width}x{height} image")]
    SampleOutOfBounds { x: u32, y: u32, width: u32, height: u32 },

    /// No input file matched any of the given patterns.
    #[error("no input sheets found for {0:?}")]
    NoInputs(Vec<String>),

    /// Invalid glob pattern.
    #[error("bad pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Explorer session misuse (no selection, empty label, index out of range).
    #[error("explorer: {0}")]
    Session(String),

    /// Background remover failed.
    #[error("background remover: {0}")]
    Remover(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Image decode/encode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
