// ── Sheet slicing ─────────────────────────────────────────────────────────────
//
// Glue around the grid partitioner and the matte:
//   read sheet → (background remover) → partition → crop → (matte tile) → save
// One sheet at a time; a failing sheet is logged and skipped by `run_batch`.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::grid::{GridSpec, TileCell};
use crate::manifest::TileRecord;
use crate::matte::Matte;
use crate::preview;
use crate::remover::BackgroundRemover;

/// How tile files are named.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileNaming {
    /// `{stem}__tile_{index}.png`, renamed later by `apply_labels`.
    Labeled,
    /// `{stem}_frame_{row}_{col}.png`.
    Frame,
}

impl TileNaming {
    pub fn file_name(&self, stem: &str, cell: &TileCell) -> String {
        match self {
            TileNaming::Labeled => format!("{stem}__tile_{}.png", cell.index),
            TileNaming::Frame => format!("{stem}_frame_{}_{}.png", cell.row, cell.col),
        }
    }
}

/// A sheet that was skipped, with the reason.
#[derive(Debug)]
pub struct SkippedSheet {
    pub path: PathBuf,
    pub error: Error,
}

/// Result of slicing a batch of sheets.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub records: Vec<TileRecord>,
    pub skipped: Vec<SkippedSheet>,
}

/// Slicing settings shared by every sheet of a batch.
pub struct SliceJob {
    pub out_dir: PathBuf,
    pub grid: GridSpec,
    pub naming: TileNaming,
    /// Matte applied to each tile after cropping.
    pub tile_matte: Option<Matte>,
    /// Applied to the whole encoded sheet before partitioning.
    pub remover: Option<Box<dyn BackgroundRemover>>,
    /// Open each written tile in the platform viewer.
    pub open_tiles: bool,
}

impl SliceJob {
    pub fn new(out_dir: impl Into<PathBuf>, grid: GridSpec) -> Self {
        Self {
            out_dir: out_dir.into(),
            grid,
            naming: TileNaming::Labeled,
            tile_matte: None,
            remover: None,
            open_tiles: false,
        }
    }

    pub fn with_naming(mut self, naming: TileNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_tile_matte(mut self, matte: Matte) -> Self {
        self.tile_matte = Some(matte);
        self
    }

    pub fn with_remover(mut self, remover: Box<dyn BackgroundRemover>) -> Self {
        self.remover = Some(remover);
        self
    }

    /// Read a sheet, pass it through the remover if any, and decode as RGBA.
    pub fn load_sheet(&self, path: &Path) -> Result<RgbaImage> {
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let img = match &self.remover {
            Some(remover) => {
                let bytes = std::fs::read(path)?;
                image::load_from_memory(&remover.remove(&bytes)?)?
            }
            None => image::open(path)?,
        };
        Ok(img.into_rgba8())
    }

    /// Slice one sheet file into `out_dir`, returning a record per tile.
    pub fn slice_sheet(&self, path: &Path) -> Result<Vec<TileRecord>> {
        let sheet = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("processing {sheet}");

        let img = self.load_sheet(path)?;
        self.slice_image(&img, &sheet, &stem)
    }

    /// Slice an already decoded sheet.
    pub fn slice_image(&self, img: &RgbaImage, sheet: &str, stem: &str) -> Result<Vec<TileRecord>> {
        let (width, height) = img.dimensions();
        let cells = self.grid.partition(width, height)?;
        std::fs::create_dir_all(&self.out_dir)?;

        let mut records = Vec::with_capacity(cells.len());
        for cell in &cells {
            let r = cell.rect;
            let mut tile = imageops::crop_imm(img, r.left, r.top, r.width(), r.height()).to_image();
            if let Some(matte) = &self.tile_matte {
                matte.apply(&mut tile)?;
            }

            let file_name = self.naming.file_name(stem, cell);
            let tile_path = self.out_dir.join(&file_name);
            tile.save(&tile_path)?;
            if self.open_tiles {
                preview::open_in_viewer(&tile_path);
            }

            records.push(TileRecord {
                sheet: sheet.to_owned(),
                tile_index: cell.index,
                row: cell.row,
                col: cell.col,
                file: file_name,
                label: String::new(),
            });
        }
        Ok(records)
    }

    /// Slice every sheet in `inputs`; per-sheet failures are collected, not
    /// propagated. Only failing to create `out_dir` aborts the batch.
    pub fn run_batch(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        std::fs::create_dir_all(&self.out_dir)?;
        let mut report = BatchReport::default();

        for path in inputs {
            match self.slice_sheet(path) {
                Ok(records) => {
                    report.processed += 1;
                    report.records.extend(records);
                }
                Err(error) => {
                    warn!("skipping {}: {error}", path.display());
                    report.skipped.push(SkippedSheet { path: path.clone(), error });
                }
            }
        }
        Ok(report)
    }
}
