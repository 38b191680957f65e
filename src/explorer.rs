// ── Sprite sheet explorer session ─────────────────────────────────────────────
//
// Front-end independent state for browsing a list of sheets, picking tiles on
// a zoomed view, labeling them and exporting them. A GUI (or the CLI) owns one
// `ExplorerSession` and forwards user actions to it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::grid::TileRect;
use crate::manifest::{self, LabelEntry, LabelSidecar};

// ── SheetLayout ───────────────────────────────────────────────────────────────

/// Tile grid with an outer margin and spacing between tiles, in sheet pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SheetLayout {
    pub tile_w: u32,
    pub tile_h: u32,
    pub margin: u32,
    pub spacing: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self { tile_w: 512, tile_h: 512, margin: 0, spacing: 0 }
    }
}

impl SheetLayout {
    /// Horizontal distance between the left edges of adjacent tiles.
    pub fn pitch_w(&self) -> u32 {
        self.tile_w + self.spacing
    }

    pub fn pitch_h(&self) -> u32 {
        self.tile_h + self.spacing
    }

    /// Number of whole tiles `(columns, rows)` that fit a `width × height`
    /// sheet. A zero pitch gives an empty grid.
    pub fn grid_size(&self, width: u32, height: u32) -> (u32, u32) {
        fn fit(extent: u32, margin: u32, spacing: u32, pitch: u32) -> u32 {
            if pitch == 0 {
                return 0;
            }
            let usable = extent as i64 - 2 * margin as i64 + spacing as i64;
            (usable.max(0) / pitch as i64) as u32
        }
        (
            fit(width, self.margin, self.spacing, self.pitch_w()),
            fit(height, self.margin, self.spacing, self.pitch_h()),
        )
    }

    /// Map a display-space point on a view zoomed by `scale` back to a tile
    /// index. `None` when the point is in the margin, in a spacing gutter, or
    /// outside the `columns × rows` grid.
    pub fn index_at(&self, x: f32, y: f32, scale: f32, columns: u32, rows: u32) -> Option<u32> {
        if scale <= 0.0 || self.pitch_w() == 0 || self.pitch_h() == 0 {
            return None;
        }
        let sx = x / scale;
        let sy = y / scale;
        let margin = self.margin as f32;
        if sx < margin || sy < margin {
            return None;
        }
        let sx = sx - margin;
        let sy = sy - margin;

        let pitch_w = self.pitch_w() as f32;
        let pitch_h = self.pitch_h() as f32;
        let col = (sx / pitch_w).floor();
        let row = (sy / pitch_h).floor();
        if col >= columns as f32 || row >= rows as f32 {
            return None;
        }
        // Gutter between tiles.
        if sx - col * pitch_w >= self.tile_w as f32 || sy - row * pitch_h >= self.tile_h as f32 {
            return None;
        }
        Some(row as u32 * columns + col as u32)
    }

    /// Sheet rectangle of tile `index` in a grid with `columns` columns.
    pub fn tile_rect(&self, index: u32, columns: u32) -> TileRect {
        let col = index % columns.max(1);
        let row = index / columns.max(1);
        let left = self.margin + col * self.pitch_w();
        let top = self.margin + row * self.pitch_h();
        TileRect { left, top, right: left + self.tile_w, bottom: top + self.tile_h }
    }
}

// ── ExportReport ──────────────────────────────────────────────────────────────

/// Files written by one export call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub dir: PathBuf,
    pub written: Vec<PathBuf>,
}

/// Export file name: zero-padded index plus the sanitized label, if any.
pub fn export_file_name(index: u32, label: &str) -> String {
    let suffix = manifest::export_label_suffix(label);
    if suffix.is_empty() {
        format!("{index:03}.png")
    } else {
        format!("{index:03}_{suffix}.png")
    }
}

// ── ExplorerSession ───────────────────────────────────────────────────────────

pub struct ExplorerSession {
    images: Vec<PathBuf>,
    current: usize,
    layout: SheetLayout,
    scale: f32,
    out_dir: PathBuf,
    /// Labels per image, filled from the sidecar on first access.
    labels: HashMap<PathBuf, BTreeMap<u32, String>>,
    selected: Option<u32>,
    image: RgbaImage,
    columns: u32,
    rows: u32,
}

impl ExplorerSession {
    /// Open a session on `images` and load the first one.
    pub fn open(
        images: Vec<PathBuf>,
        layout: SheetLayout,
        scale: f32,
        out_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let Some(first) = images.first() else {
            return Err(Error::Session("no images loaded".to_owned()));
        };
        let image = load_rgba(first)?;
        let mut session = Self {
            images,
            current: 0,
            layout,
            scale,
            out_dir: out_dir.into(),
            labels: HashMap::new(),
            selected: None,
            image,
            columns: 0,
            rows: 0,
        };
        session.refresh_grid();
        Ok(session)
    }

    pub fn current_path(&self) -> &Path {
        &self.images[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// `(columns, rows)` of the current sheet under the current layout.
    pub fn grid(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub fn layout(&self) -> SheetLayout {
        self.layout
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    /// Apply a new layout and recompute the grid. A selection that no longer
    /// fits the grid is dropped.
    pub fn set_layout(&mut self, layout: SheetLayout) {
        self.layout = layout;
        self.refresh_grid();
        if self.selected.is_some_and(|i| self.check_index(i).is_err()) {
            self.selected = None;
        }
    }

    fn refresh_grid(&mut self) {
        let (w, h) = self.image.dimensions();
        (self.columns, self.rows) = self.layout.grid_size(w, h);
        debug!(
            "sheet {w}x{h}, scale {}, grid {}x{}",
            self.scale, self.columns, self.rows
        );
    }

    /// Switch to image `index`. On a load failure the session stays on the
    /// previous image.
    fn goto(&mut self, index: usize) -> Result<()> {
        let image = load_rgba(&self.images[index])?;
        self.current = index;
        self.image = image;
        self.selected = None;
        self.refresh_grid();
        info!(
            "loaded {} ({}/{})",
            self.current_path().display(),
            self.current + 1,
            self.images.len()
        );
        Ok(())
    }

    /// Advance to the next image. Returns `false` at the end of the list.
    pub fn next_image(&mut self) -> Result<bool> {
        if self.current + 1 >= self.images.len() {
            return Ok(false);
        }
        self.goto(self.current + 1)?;
        Ok(true)
    }

    /// Go back one image. Returns `false` at the start of the list.
    pub fn prev_image(&mut self) -> Result<bool> {
        if self.current == 0 {
            return Ok(false);
        }
        self.goto(self.current - 1)?;
        Ok(true)
    }

    // ── selection ─────────────────────────────────────────────────────────────

    /// Select the tile under display point `(x, y)`; a click outside every
    /// tile leaves the selection unchanged and returns `None`.
    pub fn click(&mut self, x: f32, y: f32) -> Option<u32> {
        let index = self.layout.index_at(x, y, self.scale, self.columns, self.rows)?;
        self.selected = Some(index);
        Some(index)
    }

    /// Select tile `index`, which must lie inside the current grid.
    pub fn select(&mut self, index: u32) -> Result<()> {
        self.check_index(index)?;
        self.selected = Some(index);
        Ok(())
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.columns.saturating_mul(self.rows) {
            return Err(Error::Session(format!(
                "tile {index} outside {}x{} grid",
                self.columns, self.rows
            )));
        }
        Ok(())
    }

    /// `(row, col)` of `index` in the current grid.
    pub fn position_of(&self, index: u32) -> (u32, u32) {
        let cols = self.columns.max(1);
        (index / cols, index % cols)
    }

    // ── labels ────────────────────────────────────────────────────────────────

    fn current_labels(&mut self) -> &mut BTreeMap<u32, String> {
        let path = self.images[self.current].clone();
        self.labels.entry(path).or_insert_with_key(|path| {
            let sidecar = manifest::sidecar_path(path);
            match manifest::read_sidecar_labels(&sidecar) {
                Ok(labels) => labels,
                Err(Error::NotFound(_)) => BTreeMap::new(),
                Err(e) => {
                    warn!("failed to load labels from {}: {e}", sidecar.display());
                    BTreeMap::new()
                }
            }
        })
    }

    pub fn label(&mut self, index: u32) -> Option<String> {
        self.current_labels().get(&index).cloned()
    }

    /// All labels of the current image, ordered by index.
    pub fn labels(&mut self) -> Vec<(u32, String)> {
        self.current_labels()
            .iter()
            .map(|(i, l)| (*i, l.clone()))
            .collect()
    }

    /// Label the selected tile. The text is trimmed and must not be empty.
    pub fn set_label(&mut self, text: &str) -> Result<u32> {
        let index = self
            .selected
            .ok_or_else(|| Error::Session("select a tile before labeling".to_owned()))?;
        let label = text.trim();
        if label.is_empty() {
            return Err(Error::Session("label is empty".to_owned()));
        }
        self.current_labels().insert(index, label.to_owned());
        Ok(index)
    }

    /// Remove the selected tile's label. Returns `false` if it had none.
    pub fn remove_label(&mut self) -> Result<bool> {
        let index = self
            .selected
            .ok_or_else(|| Error::Session("select a tile first".to_owned()))?;
        Ok(self.current_labels().remove(&index).is_some())
    }

    /// Sidecar payload for the current image.
    pub fn sidecar(&mut self) -> LabelSidecar {
        let labels = self
            .labels()
            .into_iter()
            .map(|(index, label)| LabelEntry { index, label })
            .collect();
        LabelSidecar {
            image: self.current_path().to_string_lossy().into_owned(),
            tile_w: self.layout.tile_w,
            tile_h: self.layout.tile_h,
            margin: self.layout.margin,
            spacing: self.layout.spacing,
            columns: self.columns,
            rows: self.rows,
            labels,
        }
    }

    /// Save the current image's labels to `path`, or next to the image.
    pub fn save_labels(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => manifest::sidecar_path(self.current_path()),
        };
        let sidecar = self.sidecar();
        manifest::write_sidecar(&path, &sidecar)?;
        info!("saved labels to {}", path.display());
        Ok(path)
    }

    // ── export ────────────────────────────────────────────────────────────────

    pub fn export_selected(&mut self) -> Result<ExportReport> {
        let index = self
            .selected
            .ok_or_else(|| Error::Session("select a tile to export".to_owned()))?;
        self.export_indexes(&[index])
    }

    /// Export every tile of the grid, or only the labeled ones.
    pub fn export_all(&mut self, only_labeled: bool) -> Result<ExportReport> {
        let total = self.columns.saturating_mul(self.rows);
        let indexes: Vec<u32> = if only_labeled {
            let labels = self.current_labels();
            (0..total).filter(|i| labels.contains_key(i)).collect()
        } else {
            (0..total).collect()
        };
        self.export_indexes(&indexes)
    }

    /// Write the given tiles to `out_dir/<image stem>/`.
    pub fn export_indexes(&mut self, indexes: &[u32]) -> Result<ExportReport> {
        let stem = self
            .current_path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = self.out_dir.join(stem);
        if indexes.is_empty() {
            info!("no tiles to export");
            return Ok(ExportReport { dir, written: Vec::new() });
        }

        for &index in indexes {
            self.check_index(index)?;
        }

        std::fs::create_dir_all(&dir)?;
        let mut written = Vec::with_capacity(indexes.len());
        for &index in indexes {
            let r = self.layout.tile_rect(index, self.columns);
            let tile = imageops::crop_imm(&self.image, r.left, r.top, r.width(), r.height()).to_image();
            let label = self.label(index).unwrap_or_default();
            let path = dir.join(export_file_name(index, &label));
            tile.save(&path)?;
            written.push(path);
        }
        info!("exported {} tiles to {}", written.len(), dir.display());
        Ok(ExportReport { dir, written })
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    Ok(image::open(path)?.into_rgba8())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
