// ── Grid partitioning ────────────────────────────────────────────────────────
//
// Maps a grid specification and a sheet's pixel size to the rectangle of each
// cell, in row-major order (row varies slowest):
// - Exact division: every cell is `width / columns` by `height / rows`.
// - Centered crop: a fixed tile size is centred inside each (possibly
//   fractional) cell and shifted back inside the sheet at the edges.

use std::str::FromStr;

use crate::error::{Error, Result};

// ── TileSize ──────────────────────────────────────────────────────────────────

/// Fixed tile dimensions in pixels for centered-crop mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for TileSize {
    type Err = Error;

    /// Parses `"WxH"` or a single integer for a square tile.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let (width, height) = match lower.split_once('x') {
            Some((w, h)) => (parse_dimension(w, s)?, parse_dimension(h, s)?),
            None => {
                let side = parse_dimension(&lower, s)?;
                (side, side)
            }
        };
        if width == 0 || height == 0 {
            return Err(Error::InvalidGrid("tile size must be positive".to_owned()));
        }
        Ok(Self { width, height })
    }
}

// ── GridSpec ──────────────────────────────────────────────────────────────────

/// Column/row layout of a sheet, optionally with a fixed tile size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub columns: u32,
    pub rows: u32,
    /// `Some` selects centered-crop mode, `None` exact division.
    pub tile: Option<TileSize>,
}

impl GridSpec {
    /// Exact-division grid. Both counts must be positive and their product
    /// must fit a `u32` tile index.
    pub fn new(columns: u32, rows: u32) -> Result<Self> {
        let spec = Self { columns, rows, tile: None };
        spec.checked_cell_count()?;
        Ok(spec)
    }

    /// Switch to centered-crop mode with a fixed tile size.
    pub fn with_tile(mut self, tile: TileSize) -> Self {
        self.tile = Some(tile);
        self
    }

    /// `columns * rows`, saturating for grids `new` would reject.
    pub fn cell_count(&self) -> u32 {
        self.columns.saturating_mul(self.rows)
    }

    fn checked_cell_count(&self) -> Result<u32> {
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::InvalidGrid("grid values must be positive".to_owned()));
        }
        self.columns.checked_mul(self.rows).ok_or_else(|| {
            Error::InvalidGrid(format!("{}x{} grid has too many cells", self.columns, self.rows))
        })
    }

    /// Compute the rectangle of every cell for a `width × height` sheet.
    ///
    /// Returns `Error::DimensionMismatch` in exact-division mode when the
    /// sheet does not divide evenly, and `Error::InvalidGrid` when the grid
    /// has more columns or rows than the sheet has pixels.
    pub fn partition(&self, width: u32, height: u32) -> Result<Vec<TileCell>> {
        self.checked_cell_count()?;
        match self.tile {
            None => self.partition_exact(width, height),
            Some(tile) => {
                // At least one pixel of pitch per cell.
                if self.columns > width || self.rows > height {
                    return Err(Error::InvalidGrid(format!(
                        "{}x{} grid is finer than the {width}x{height} sheet",
                        self.columns, self.rows
                    )));
                }
                Ok(self.partition_centered(width, height, tile))
            }
        }
    }

    fn partition_exact(&self, width: u32, height: u32) -> Result<Vec<TileCell>> {
        if width % self.columns != 0 || height % self.rows != 0 {
            return Err(Error::DimensionMismatch {
                width,
                height,
                columns: self.columns,
                rows: self.rows,
            });
        }
        let tile_w = width / self.columns;
        let tile_h = height / self.rows;

        Ok(self.cells(|row, col| TileRect {
            left: col * tile_w,
            top: row * tile_h,
            right: (col + 1) * tile_w,
            bottom: (row + 1) * tile_h,
        }))
    }

    fn partition_centered(&self, width: u32, height: u32, tile: TileSize) -> Vec<TileCell> {
        let pitch_x = width as f64 / self.columns as f64;
        let pitch_y = height as f64 / self.rows as f64;

        self.cells(|row, col| {
            let (left, right) = centered_span(col, pitch_x, tile.width, width);
            let (top, bottom) = centered_span(row, pitch_y, tile.height, height);
            TileRect { left, top, right, bottom }
        })
    }

    fn cells(&self, mut rect_at: impl FnMut(u32, u32) -> TileRect) -> Vec<TileCell> {
        let mut cells = Vec::with_capacity(self.cell_count() as usize);
        for row in 0..self.rows {
            for col in 0..self.columns {
                cells.push(TileCell {
                    index: row * self.columns + col,
                    row,
                    col,
                    rect: rect_at(row, col),
                });
            }
        }
        cells
    }
}

impl FromStr for GridSpec {
    type Err = Error;

    /// Parses `"NxM"` (columns × rows), case-insensitive, whitespace tolerant.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let Some((cols, rows)) = lower.split_once('x') else {
            return Err(Error::InvalidGrid(format!("'{s}', use format NxM, e.g. 2x2")));
        };
        GridSpec::new(parse_dimension(cols, s)?, parse_dimension(rows, s)?)
    }
}

fn parse_dimension(part: &str, whole: &str) -> Result<u32> {
    part.trim()
        .parse::<u32>()
        .map_err(|_| Error::InvalidGrid(format!("'{whole}', use format NxM, e.g. 2x2")))
}

/// One axis of a centered crop: centre the span in cell `index`, shift it
/// inward on overflow, and clip only when `extent < size`.
fn centered_span(index: u32, pitch: f64, size: u32, extent: u32) -> (u32, u32) {
    let center = (index as f64 + 0.5) * pitch;
    let mut start = (center - size as f64 / 2.0).round_ties_even() as i64;
    let mut end = start + size as i64;
    let extent = extent as i64;

    if start < 0 {
        end -= start;
        start = 0;
    }
    if end > extent {
        start -= end - extent;
        end = extent;
    }
    // Sheet smaller than the tile.
    let start = start.max(0);

    (start as u32, end as u32)
}

// ── TileRect / TileCell ───────────────────────────────────────────────────────

/// Half-open pixel bounds `[left, right) × [top, bottom)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl TileRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Returns `true` if pixel `(x, y)` lies inside the rectangle.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    pub fn overlaps(&self, other: &TileRect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// A grid cell: its row-major index, position and pixel rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileCell {
    pub index: u32,
    pub row: u32,
    pub col: u32,
    pub rect: TileRect,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
