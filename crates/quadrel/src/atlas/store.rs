use std::collections::HashMap;

use crate::coords::Rect;
use crate::error::{RenderError, Result};
use crate::gpu::GpuBackend;
use crate::pixmap::{Pixmap, Rgba8};

use super::grid::TileGrid;
use super::{MAX_ATLAS_SIZE, TILE_SIZE};

/// Where one tile-sized cell of a registered image lives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileSlot {
    /// Resident in the atlas at this linear tile index.
    Tile(u32),
    /// The cell's source pixels were one color; no atlas space is used and
    /// the cell renders as a tinted white-tile quad.
    Solid(Rgba8),
}

/// A registered image: pixel size plus one slot per tile-grid cell,
/// row-major from the image's top-left.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub width: u32,
    pub height: u32,
    pub slots: Vec<TileSlot>,
    /// Cheap stand-in color. The first uniform cell discovered during
    /// registration wins; an image with no uniform cell falls back to its
    /// top-left pixel.
    pub fallback: Rgba8,
}

impl ImageEntry {
    #[inline]
    pub fn cols(&self) -> u32 {
        self.width.div_ceil(TILE_SIZE)
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.height.div_ceil(TILE_SIZE)
    }

    /// Number of cells that occupy real atlas tiles.
    pub fn atlas_tiles(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, TileSlot::Tile(_)))
            .count()
    }
}

/// Atlas usage snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtlasStats {
    pub side: u32,
    pub tiles_used: usize,
    pub tiles_total: usize,
}

/// Pre-computed registration: per-cell uniformity and the tile demand.
///
/// Splitting planning from committing lets the renderer flush and grow the
/// atlas up front, so committing never stalls mid-image.
pub(crate) struct RegisterPlan {
    cols: u32,
    cells: Vec<Option<Rgba8>>,
    pub(crate) needed: usize,
    fallback: Rgba8,
}

/// CPU bookkeeping for the atlas texture: the occupancy grid and the
/// image registry. GPU work goes through the backend passed per call.
pub struct AtlasStore {
    grid: TileGrid,
    entries: HashMap<String, ImageEntry>,
    side: u32,
    pixelate: bool,
}

impl AtlasStore {
    /// Creates the atlas texture on the backend and seeds the white tile.
    pub(crate) fn new<B: GpuBackend>(backend: &mut B, side: u32, pixelate: bool) -> Self {
        backend.init_atlas(side, pixelate);
        backend.upload_atlas(0, 0, TILE_SIZE, TILE_SIZE, &white_tile_pixels());
        Self {
            grid: TileGrid::new(side),
            entries: HashMap::new(),
            side,
            pixelate,
        }
    }

    #[inline]
    pub(crate) fn side(&self) -> u32 {
        self.side
    }

    pub(crate) fn stats(&self) -> AtlasStats {
        AtlasStats {
            side: self.side,
            tiles_used: self.grid.used(),
            tiles_total: self.grid.total(),
        }
    }

    #[inline]
    pub(crate) fn free_tiles(&self) -> usize {
        self.grid.free()
    }

    #[inline]
    pub(crate) fn entry(&self, key: &str) -> Option<&ImageEntry> {
        self.entries.get(key)
    }

    pub(crate) fn image_count(&self) -> usize {
        self.entries.len()
    }

    /// Scans an image's tile grid: which cells are uniform, how many atlas
    /// tiles a commit will consume, and the fallback color.
    pub(crate) fn plan(pm: &Pixmap) -> RegisterPlan {
        let cols = pm.width().div_ceil(TILE_SIZE);
        let rows = pm.height().div_ceil(TILE_SIZE);

        let mut cells = Vec::with_capacity((cols * rows) as usize);
        let mut needed = 0;
        let mut fallback = None;

        for cy in 0..rows {
            for cx in 0..cols {
                let x = cx * TILE_SIZE;
                let y = cy * TILE_SIZE;
                let cw = (pm.width() - x).min(TILE_SIZE);
                let ch = (pm.height() - y).min(TILE_SIZE);

                let uniform = pm.region_uniform(x, y, cw, ch);
                match uniform {
                    Some(color) => {
                        if fallback.is_none() {
                            fallback = Some(color);
                        }
                    }
                    None => needed += 1,
                }
                cells.push(uniform);
            }
        }

        RegisterPlan {
            cols,
            cells,
            needed,
            fallback: fallback.unwrap_or_else(|| pm.pixel(0, 0)),
        }
    }

    /// Allocates and uploads the planned cells, then records the entry.
    /// Returns the number of atlas uploads performed.
    ///
    /// The caller guarantees `free_tiles() >= plan.needed`; if allocation
    /// still fails the partial allocation is rolled back.
    pub(crate) fn commit<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        key: &str,
        pm: &Pixmap,
        plan: RegisterPlan,
    ) -> Result<usize> {
        let mut slots = Vec::with_capacity(plan.cells.len());
        let mut allocated = Vec::new();

        for (i, cell) in plan.cells.iter().enumerate() {
            match cell {
                Some(color) => slots.push(TileSlot::Solid(*color)),
                None => {
                    let Some(index) = self.grid.alloc() else {
                        self.grid.free_tiles(allocated);
                        return Err(RenderError::AtlasExhausted {
                            side: self.side,
                            max: MAX_ATLAS_SIZE,
                        });
                    };
                    allocated.push(index);

                    let cx = i as u32 % plan.cols;
                    let cy = i as u32 / plan.cols;
                    let x = cx * TILE_SIZE;
                    let y = cy * TILE_SIZE;
                    let cw = (pm.width() - x).min(TILE_SIZE);
                    let ch = (pm.height() - y).min(TILE_SIZE);

                    let block = pm.extract_padded(x, y, cw, ch, TILE_SIZE);
                    let (tx, ty) = self.grid.origin(index);
                    backend.upload_atlas(tx, ty, TILE_SIZE, TILE_SIZE, &block);
                    slots.push(TileSlot::Tile(index));
                }
            }
        }

        log::debug!(
            "registered image {key:?}: {}x{}, {} atlas tiles, {} solid cells",
            pm.width(),
            pm.height(),
            allocated.len(),
            slots.len() - allocated.len(),
        );

        let uploads = allocated.len();
        self.entries.insert(
            key.to_string(),
            ImageEntry {
                width: pm.width(),
                height: pm.height(),
                slots,
                fallback: plan.fallback,
            },
        );
        Ok(uploads)
    }

    /// Drops an entry and releases its tiles. Unknown keys are a no-op;
    /// removing twice behaves like removing once.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        self.grid.free_tiles(entry.slots.iter().filter_map(|s| match s {
            TileSlot::Tile(index) => Some(*index),
            TileSlot::Solid(_) => None,
        }));
        log::debug!("removed image {key:?}");
        true
    }

    /// Doubles the atlas side, re-placing every occupied tile so its linear
    /// index is unchanged under the new tiles-per-row count. Returns the
    /// number of tiles re-placed.
    ///
    /// The caller must flush pending quads first: their UVs are normalized
    /// to the old side and would sample garbage afterwards.
    pub(crate) fn grow<B: GpuBackend>(&mut self, backend: &mut B) -> Result<usize> {
        let old_side = self.side;
        let new_side = old_side * 2;
        if new_side > MAX_ATLAS_SIZE {
            return Err(RenderError::AtlasExhausted {
                side: old_side,
                max: MAX_ATLAS_SIZE,
            });
        }

        let pixels = backend.read_atlas()?;
        let old_run = self.grid.tile_run();
        let old_stride = old_side as usize * 4;

        backend.init_atlas(new_side, self.pixelate);
        self.grid.grow(new_side);
        self.side = new_side;

        let occupied: Vec<u32> = self.grid.occupied_indices().collect();
        let row_bytes = TILE_SIZE as usize * 4;
        let mut tile = vec![0u8; TILE_SIZE as usize * row_bytes];

        for &index in &occupied {
            let (ox, oy) = TileGrid::origin_for_run(index, old_run);
            for row in 0..TILE_SIZE as usize {
                let src = (oy as usize + row) * old_stride + ox as usize * 4;
                tile[row * row_bytes..(row + 1) * row_bytes]
                    .copy_from_slice(&pixels[src..src + row_bytes]);
            }
            let (nx, ny) = self.grid.origin(index);
            backend.upload_atlas(nx, ny, TILE_SIZE, TILE_SIZE, &tile);
        }

        log::debug!(
            "atlas grown {old_side} -> {new_side}, re-placed {} tiles",
            occupied.len()
        );
        Ok(occupied.len())
    }

    /// Reads the whole atlas back into a pixmap.
    pub(crate) fn read_atlas<B: GpuBackend>(&self, backend: &mut B) -> Result<Pixmap> {
        let data = backend.read_atlas()?;
        debug_assert_eq!(data.len(), self.side as usize * self.side as usize * 4);
        Ok(Pixmap::from_pixels(self.side, self.side, data)
            .unwrap_or_else(|| Pixmap::new(self.side, self.side)))
    }

    /// UV rectangle of a tile's used `cw`×`ch` pixels under the current side.
    pub(crate) fn tile_uv(&self, index: u32, cw: u32, ch: u32) -> Rect {
        let (x, y) = self.grid.origin(index);
        let s = self.side as f32;
        Rect::new(x as f32 / s, y as f32 / s, cw as f32 / s, ch as f32 / s)
    }

    /// Degenerate UV rectangle at the center of the white tile. Solid quads
    /// sample this point so their color comes entirely from the tint.
    pub(crate) fn white_uv(&self) -> Rect {
        let c = TILE_SIZE as f32 / 2.0 / self.side as f32;
        Rect::new(c, c, 0.0, 0.0)
    }
}

fn white_tile_pixels() -> Vec<u8> {
    vec![255; TILE_SIZE as usize * TILE_SIZE as usize * 4]
}
