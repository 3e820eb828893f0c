//! The renderer facade.
//!
//! `Renderer` owns every subsystem and is the only type callers touch:
//! - atlas store and tile grid (image registration, growth)
//! - quad batch (vertex accumulation, flush on overflow)
//! - mask and transform stacks
//! - frame lifecycle and per-frame counters
//!
//! Pending quads flush whenever upcoming GPU state would invalidate them:
//! batch full, mask transition, atlas growth, atlas readback, frame end.

use crate::atlas::{
    AtlasStats, AtlasStore, DEFAULT_ATLAS_SIZE, MAX_ATLAS_SIZE, MIN_ATLAS_SIZE, TILE_SIZE,
    TileSlot,
};
use crate::batch::{DEFAULT_MAX_QUADS, MAX_QUADS, QuadBatch};
use crate::coords::{Color, Rect, Vec2};
use crate::error::{RenderError, Result};
use crate::frame::{FrameState, FrameStats};
use crate::gpu::{DrawPass, GpuBackend};
use crate::mask::MaskStack;
use crate::pixmap::Pixmap;
use crate::transform::TransformStack;

/// Constructor parameters.
#[derive(Debug, Copy, Clone)]
pub struct RendererConfig {
    /// Initial atlas side in pixels; a power of two in `64..=8192`.
    pub atlas_size: u32,
    /// Quad capacity of the batch buffer; `max_quads * 4 <= 65536`.
    pub max_quads: usize,
    /// Sample the atlas with nearest-neighbor filtering.
    pub pixelate: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            atlas_size: DEFAULT_ATLAS_SIZE,
            max_quads: DEFAULT_MAX_QUADS,
            pixelate: false,
        }
    }
}

/// A batching 2D renderer over a tile atlas.
///
/// World space is in pixels with the origin at the bottom-left and +Y up;
/// `to_screen` / `from_screen` convert to window coordinates. All methods
/// are driven from one thread.
pub struct Renderer<B: GpuBackend> {
    backend: B,
    store: AtlasStore,
    batch: QuadBatch,
    masks: MaskStack,
    transforms: TransformStack,
    frame: FrameState,
}

impl<B: GpuBackend> Renderer<B> {
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self> {
        let side = config.atlas_size;
        if !side.is_power_of_two() || !(MIN_ATLAS_SIZE..=MAX_ATLAS_SIZE).contains(&side) {
            return Err(RenderError::InvalidAtlasSize(side));
        }
        if config.max_quads == 0 {
            return Err(RenderError::ZeroQuads);
        }
        if config.max_quads > MAX_QUADS {
            return Err(RenderError::TooManyQuads(config.max_quads));
        }

        backend.set_index_pattern(&QuadBatch::index_pattern(config.max_quads));
        let store = AtlasStore::new(&mut backend, side, config.pixelate);

        log::info!(
            "renderer up: atlas {side}x{side}, batch capacity {} quads, pixelate {}",
            config.max_quads,
            config.pixelate
        );

        Ok(Self {
            backend,
            store,
            batch: QuadBatch::new(config.max_quads),
            masks: MaskStack::new(),
            transforms: TransformStack::new(),
            frame: FrameState::new(),
        })
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ── images ────────────────────────────────────────────────────────────

    /// Registers (or replaces) an image under `key`.
    ///
    /// The image is cut into 32 px cells; cells of a single color store no
    /// atlas pixels. When free tiles run short the atlas doubles, flushing
    /// pending quads first. Legal inside or outside a frame.
    pub fn register_image(&mut self, key: &str, image: &Pixmap) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::ZeroSizeImage(key.to_string()));
        }

        // Replacing an entry releases its tiles before demand is computed.
        self.store.remove(key);

        let plan = AtlasStore::plan(image);
        while self.store.free_tiles() < plan.needed {
            self.flush();
            let replaced = self.store.grow(&mut self.backend)?;
            self.frame.stats_mut().uploads += replaced;
        }

        let uploads = self.store.commit(&mut self.backend, key, image, plan)?;
        self.frame.stats_mut().uploads += uploads;
        Ok(())
    }

    /// Forgets `key` and frees its tiles. Unknown keys are ignored.
    pub fn remove_image(&mut self, key: &str) {
        self.store.remove(key);
    }

    #[inline]
    pub fn has_image(&self, key: &str) -> bool {
        self.store.entry(key).is_some()
    }

    /// Pixel size of a registered image.
    pub fn image_size(&self, key: &str) -> Option<(u32, u32)> {
        self.store.entry(key).map(|e| (e.width, e.height))
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.store.image_count()
    }

    // ── frame lifecycle ───────────────────────────────────────────────────

    /// Opens a frame of the given pixel size. Resets the transform stack,
    /// mask bookkeeping and the per-frame counters.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> Result<()> {
        if self.frame.in_frame() {
            return Err(RenderError::FrameAlreadyOpen);
        }
        self.backend.frame_begin(width, height)?;
        self.frame.begin(width, height)?;
        self.batch.reset();
        self.masks.reset();
        self.transforms.reset();
        Ok(())
    }

    /// Flushes pending quads and closes the frame.
    ///
    /// With a mask build still open or layers still pushed the frame is
    /// closed anyway, pending quads are dropped, and `UnbalancedMasks`
    /// comes back; the next `begin_frame` starts from a clean slate.
    pub fn end_frame(&mut self) -> Result<()> {
        self.frame.require_in_frame()?;

        if self.masks.is_balanced() {
            self.flush();
            self.backend.frame_end();
            self.frame.end()
        } else {
            let err = RenderError::UnbalancedMasks {
                building: self.masks.is_building(),
                depth: self.masks.depth(),
            };
            log::warn!("{err}; dropping {} pending quads", self.batch.quads());
            self.batch.reset();
            self.masks.reset();
            self.backend.frame_end();
            self.frame.end()?;
            Err(err)
        }
    }

    /// Counters for the current (or most recently ended) frame.
    #[inline]
    pub fn frame_stats(&self) -> FrameStats {
        self.frame.stats()
    }

    #[inline]
    pub fn atlas_stats(&self) -> AtlasStats {
        self.store.stats()
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws a registered image with its bottom-left corner at `pos` (world
    /// space, before the current transform).
    pub fn draw_image(&mut self, key: &str, pos: Vec2) -> Result<()> {
        self.draw_image_ex(key, pos, Color::white(), 1.0)
    }

    /// `draw_image` with a tint and a uniform scale factor.
    ///
    /// Emits one quad per tile-grid cell: resident cells sample their atlas
    /// tile, solid cells sample the white tile with the cell color folded
    /// into the tint.
    pub fn draw_image_ex(&mut self, key: &str, pos: Vec2, tint: Color, scale: f32) -> Result<()> {
        self.frame.require_in_frame()?;

        // Split borrows: the entry holds `store` while the batch, backend
        // and counters are mutated per cell.
        let Self {
            backend,
            store,
            batch,
            masks,
            transforms,
            frame,
        } = self;

        let entry = store
            .entry(key)
            .ok_or_else(|| RenderError::UnknownImage(key.to_string()))?;
        let t = transforms.current();
        let cols = entry.cols();
        let (w, h) = (entry.width, entry.height);

        for (i, slot) in entry.slots.iter().enumerate() {
            let cx = i as u32 % cols;
            let cy = i as u32 / cols;
            let x0 = cx * TILE_SIZE;
            let y0 = cy * TILE_SIZE;
            let cw = (w - x0).min(TILE_SIZE);
            let ch = (h - y0).min(TILE_SIZE);

            // Cell rows count down from the image's top edge; world +Y is up.
            let left = x0 as f32 * scale;
            let right = (x0 + cw) as f32 * scale;
            let top = (h - y0) as f32 * scale;
            let bottom = (h - y0 - ch) as f32 * scale;
            let corners = [
                t.apply(pos + Vec2::new(left, top)),
                t.apply(pos + Vec2::new(right, top)),
                t.apply(pos + Vec2::new(right, bottom)),
                t.apply(pos + Vec2::new(left, bottom)),
            ];

            let (uv, color) = match *slot {
                TileSlot::Tile(index) => (store.tile_uv(index, cw, ch), tint),
                TileSlot::Solid(px) => (store.white_uv(), tint * Color::from_rgba8(px)),
            };

            append_quad(backend, batch, masks, frame.stats_mut(), corners, uv, color);
        }
        Ok(())
    }

    /// Draws an axis-aligned solid-color rectangle (world space, transformed
    /// like everything else).
    pub fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        self.frame.require_in_frame()?;

        let t = self.transforms.current();
        let r = rect.normalized();
        let (min, max) = (r.min(), r.max());
        let corners = [
            t.apply(Vec2::new(min.x, max.y)),
            t.apply(max),
            t.apply(Vec2::new(max.x, min.y)),
            t.apply(min),
        ];
        let uv = self.store.white_uv();

        let Self {
            backend,
            batch,
            masks,
            frame,
            ..
        } = self;
        append_quad(backend, batch, masks, frame.stats_mut(), corners, uv, color);
        Ok(())
    }

    // ── masks ─────────────────────────────────────────────────────────────

    /// Starts building a mask layer: pending quads flush, then draws render
    /// coverage into the new layer until `end_mask`.
    pub fn begin_mask(&mut self) -> Result<()> {
        self.frame.require_in_frame()?;
        self.flush();
        let layer = self.masks.begin()?;
        self.backend.clear_mask_layer(layer);
        Ok(())
    }

    /// Finishes the mask being built and pushes it; subsequent draws are
    /// tested against it.
    pub fn end_mask(&mut self) -> Result<()> {
        self.frame.require_in_frame()?;
        self.flush();
        self.masks.end()
    }

    /// Pops the top mask layer.
    pub fn pop_mask(&mut self) -> Result<()> {
        self.frame.require_in_frame()?;
        self.flush();
        self.masks.pop()
    }

    /// Drops every pushed mask layer at once.
    pub fn clear_mask(&mut self) -> Result<()> {
        self.frame.require_in_frame()?;
        self.flush();
        self.masks.clear()
    }

    // ── transforms ────────────────────────────────────────────────────────

    pub fn translate(&mut self, delta: Vec2) {
        self.transforms.translate(delta);
    }

    /// Counter-clockwise rotation in radians.
    pub fn rotate(&mut self, radians: f32) {
        self.transforms.rotate(radians);
    }

    pub fn scale(&mut self, factor: Vec2) {
        self.transforms.scale(factor);
    }

    pub fn save_transform(&mut self) {
        self.transforms.save();
    }

    pub fn restore_transform(&mut self) {
        self.transforms.restore();
    }

    /// Back to the identity transform with an empty save stack.
    pub fn clear_transform(&mut self) {
        self.transforms.reset();
    }

    // ── coordinate mapping ────────────────────────────────────────────────

    /// Maps a world point through the current transform into window
    /// coordinates (top-left origin, +Y down). Uses the most recent frame
    /// height; zero before the first frame.
    pub fn to_screen(&self, p: Vec2) -> Vec2 {
        let (_, h) = self.frame.size();
        let q = self.transforms.current().apply(p);
        Vec2::new(q.x, h as f32 - q.y)
    }

    /// Inverse of `to_screen`. A singular current transform cannot be
    /// inverted; the input comes back unchanged.
    pub fn from_screen(&self, p: Vec2) -> Vec2 {
        match self.transforms.current().invert() {
            Some(inv) => {
                let (_, h) = self.frame.size();
                inv.apply(Vec2::new(p.x, h as f32 - p.y))
            }
            None => {
                log::warn!("from_screen under a singular transform; returning the input");
                p
            }
        }
    }

    // ── atlas readback ────────────────────────────────────────────────────

    /// Flushes pending quads and reads the atlas texture back as a pixmap.
    pub fn read_atlas(&mut self) -> Result<Pixmap> {
        self.flush();
        self.store.read_atlas(&mut self.backend)
    }

    /// Draws pending quads with the current mask state and empties the
    /// batch.
    fn flush(&mut self) {
        let Self {
            backend,
            batch,
            masks,
            frame,
            ..
        } = self;
        flush_batch(backend, batch, masks, frame.stats_mut());
    }
}

fn flush_batch<B: GpuBackend>(
    backend: &mut B,
    batch: &mut QuadBatch,
    masks: &MaskStack,
    stats: &mut FrameStats,
) {
    if batch.is_empty() {
        return;
    }
    let pass = if masks.is_building() {
        DrawPass::MaskLayer {
            layer: masks.write_layer(),
            mask_read: masks.read_layer(),
        }
    } else {
        DrawPass::Surface {
            mask_read: masks.read_layer(),
        }
    };
    backend.draw(pass, batch.vertices(), batch.quads());
    stats.draw_calls += 1;
    batch.reset();
}

fn append_quad<B: GpuBackend>(
    backend: &mut B,
    batch: &mut QuadBatch,
    masks: &MaskStack,
    stats: &mut FrameStats,
    corners: [Vec2; 4],
    uv: Rect,
    color: Color,
) {
    let full = batch.append(corners, uv, color);
    stats.quads += 1;
    if full {
        flush_batch(backend, batch, masks, stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{DrawRecord, RecordBackend};
    use crate::pixmap::Rgba8;

    const RED: Rgba8 = [255, 0, 0, 255];

    fn new_renderer(atlas: u32, max_quads: usize) -> Renderer<RecordBackend> {
        Renderer::new(
            RecordBackend::new(),
            RendererConfig {
                atlas_size: atlas,
                max_quads,
                pixelate: false,
            },
        )
        .unwrap()
    }

    fn solid(w: u32, h: u32, color: Rgba8) -> Pixmap {
        let mut pm = Pixmap::new(w, h);
        pm.fill(color);
        pm
    }

    fn noisy(w: u32, h: u32) -> Pixmap {
        let mut pm = Pixmap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                pm.set_pixel(x, y, [x as u8, y as u8, (x ^ y) as u8, 255]);
            }
        }
        pm
    }

    fn unit_rect() -> Rect {
        Rect::new(0.0, 0.0, 1.0, 1.0)
    }

    fn surface_passes(draws: &[DrawRecord]) -> Vec<DrawPass> {
        draws.iter().map(|d| d.pass).collect()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn rejects_bad_atlas_sizes() {
        for side in [0, 32, 100, 96, 16384] {
            let r = Renderer::new(
                RecordBackend::new(),
                RendererConfig {
                    atlas_size: side,
                    ..RendererConfig::default()
                },
            );
            assert!(
                matches!(r, Err(RenderError::InvalidAtlasSize(s)) if s == side),
                "side {side} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_quad_capacities() {
        let zero = Renderer::new(
            RecordBackend::new(),
            RendererConfig {
                max_quads: 0,
                ..RendererConfig::default()
            },
        );
        assert!(matches!(zero, Err(RenderError::ZeroQuads)));

        let over = Renderer::new(
            RecordBackend::new(),
            RendererConfig {
                max_quads: MAX_QUADS + 1,
                ..RendererConfig::default()
            },
        );
        assert!(matches!(over, Err(RenderError::TooManyQuads(n)) if n == MAX_QUADS + 1));

        assert!(new_renderer(64, MAX_QUADS).batch.max_quads() == MAX_QUADS);
    }

    #[test]
    fn new_seeds_white_tile_and_index_pattern() {
        let r = new_renderer(64, 8);
        let b = r.backend();
        assert_eq!(b.atlas_side(), 64);
        assert_eq!(b.atlas_pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(b.atlas_pixel(31, 31), [255, 255, 255, 255]);
        assert_eq!(b.index_pattern().len(), 8 * 6);
        assert_eq!(&b.index_pattern()[..6], &[3, 0, 1, 2, 3, 1]);
    }

    // ── frame protocol ────────────────────────────────────────────────────

    #[test]
    fn drawing_outside_a_frame_is_rejected() {
        let mut r = new_renderer(64, 8);
        assert!(matches!(
            r.draw_rect(unit_rect(), Color::white()),
            Err(RenderError::NotInFrame)
        ));
        assert!(matches!(
            r.draw_image("x", Vec2::zero()),
            Err(RenderError::NotInFrame)
        ));
        assert!(matches!(r.begin_mask(), Err(RenderError::NotInFrame)));
        assert!(matches!(r.end_frame(), Err(RenderError::NotInFrame)));
    }

    #[test]
    fn double_begin_frame_is_rejected() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        assert!(matches!(
            r.begin_frame(64, 64),
            Err(RenderError::FrameAlreadyOpen)
        ));
        r.end_frame().unwrap();
        r.begin_frame(64, 64).unwrap();
        r.end_frame().unwrap();
    }

    #[test]
    fn begin_frame_resets_the_transform() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.translate(Vec2::new(10.0, 10.0));
        r.end_frame().unwrap();

        r.begin_frame(64, 64).unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_frame().unwrap();

        let v = &r.backend().draws()[0].vertices;
        assert_eq!(v[3].pos, [0.0, 0.0]); // BL back at the origin
    }

    // ── batching and flush ────────────────────────────────────────────────

    #[test]
    fn quads_accumulate_into_one_draw_call() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        for _ in 0..5 {
            r.draw_rect(unit_rect(), Color::white()).unwrap();
        }
        assert_eq!(r.backend().draw_calls(), 0);
        r.end_frame().unwrap();

        assert_eq!(r.backend().draw_calls(), 1);
        assert_eq!(r.backend().draws()[0].quads, 5);
        assert_eq!(r.frame_stats().draw_calls, 1);
        assert_eq!(r.frame_stats().quads, 5);
    }

    #[test]
    fn full_batch_flushes_immediately() {
        let mut r = new_renderer(64, 4);
        r.begin_frame(64, 64).unwrap();
        for _ in 0..4 {
            r.draw_rect(unit_rect(), Color::white()).unwrap();
        }
        // Capacity reached: the batch flushed without waiting for end_frame.
        assert_eq!(r.backend().draw_calls(), 1);
        r.end_frame().unwrap();
        assert_eq!(r.backend().draw_calls(), 1);
    }

    #[test]
    fn overflowing_batch_splits_into_two_draws() {
        let mut r = new_renderer(64, 4);
        r.begin_frame(64, 64).unwrap();
        for _ in 0..5 {
            r.draw_rect(unit_rect(), Color::white()).unwrap();
        }
        r.end_frame().unwrap();

        assert_eq!(r.backend().draw_calls(), 2);
        assert_eq!(r.backend().draws()[0].quads, 4);
        assert_eq!(r.backend().draws()[1].quads, 1);
        assert_eq!(r.frame_stats().quads, 5);
    }

    #[test]
    fn empty_frame_issues_no_draws() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.end_frame().unwrap();
        assert_eq!(r.backend().draw_calls(), 0);
    }

    // ── draw_image geometry ───────────────────────────────────────────────

    #[test]
    fn draw_image_emits_anchored_quad_with_tile_uvs() {
        let mut r = new_renderer(64, 8);
        r.register_image("n", &noisy(32, 32)).unwrap();
        r.begin_frame(64, 64).unwrap();
        r.draw_image("n", Vec2::new(10.0, 20.0)).unwrap();
        r.end_frame().unwrap();

        let d = &r.backend().draws()[0];
        assert_eq!(d.quads, 1);
        let v = &d.vertices;
        // pos is the bottom-left corner; +Y is up.
        assert_eq!(v[0].pos, [10.0, 52.0]); // TL
        assert_eq!(v[1].pos, [42.0, 52.0]); // TR
        assert_eq!(v[2].pos, [42.0, 20.0]); // BR
        assert_eq!(v[3].pos, [10.0, 20.0]); // BL
        // Tile 1 sits at (32, 0) on a 64 px atlas.
        assert_eq!(v[0].uv, [0.5, 0.0]);
        assert_eq!(v[2].uv, [1.0, 0.5]);
        assert_eq!(v[0].color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn draw_image_scale_multiplies_extents() {
        let mut r = new_renderer(64, 8);
        r.register_image("n", &noisy(32, 32)).unwrap();
        r.begin_frame(256, 256).unwrap();
        r.draw_image_ex("n", Vec2::zero(), Color::white(), 2.0)
            .unwrap();
        r.end_frame().unwrap();

        let v = &r.backend().draws()[0].vertices;
        assert_eq!(v[0].pos, [0.0, 64.0]);
        assert_eq!(v[1].pos, [64.0, 64.0]);
        assert_eq!(v[3].pos, [0.0, 0.0]);
    }

    #[test]
    fn draw_image_emits_one_quad_per_cell() {
        let mut r = new_renderer(128, 16);
        r.register_image("wide", &noisy(64, 32)).unwrap();
        r.begin_frame(128, 128).unwrap();
        r.draw_image("wide", Vec2::zero()).unwrap();
        r.end_frame().unwrap();

        assert_eq!(r.backend().draws()[0].quads, 2);
    }

    #[test]
    fn solid_cells_render_as_tinted_white_tile() {
        let mut r = new_renderer(64, 8);
        r.register_image("red", &solid(32, 32, RED)).unwrap();
        assert_eq!(r.atlas_stats().tiles_used, 1); // white tile only

        r.begin_frame(64, 64).unwrap();
        r.draw_image("red", Vec2::zero()).unwrap();
        r.end_frame().unwrap();

        let v = &r.backend().draws()[0].vertices;
        assert_eq!(v[0].color, [1.0, 0.0, 0.0, 1.0]);
        // Degenerate UV at the white tile center: 16 / 64.
        assert!(v[..4].iter().all(|vert| vert.uv == [0.25, 0.25]));
    }

    #[test]
    fn tint_multiplies_solid_cell_color() {
        let mut r = new_renderer(64, 8);
        r.register_image("red", &solid(32, 32, RED)).unwrap();
        r.begin_frame(64, 64).unwrap();
        r.draw_image_ex("red", Vec2::zero(), Color::new(0.5, 1.0, 1.0, 0.5), 1.0)
            .unwrap();
        r.end_frame().unwrap();

        let v = &r.backend().draws()[0].vertices;
        assert_eq!(v[0].color, [0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn unknown_image_key_is_rejected() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        assert!(matches!(
            r.draw_image("ghost", Vec2::zero()),
            Err(RenderError::UnknownImage(k)) if k == "ghost"
        ));
    }

    #[test]
    fn draw_rect_applies_the_current_transform() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.translate(Vec2::new(5.0, 7.0));
        r.draw_rect(Rect::new(0.0, 0.0, 2.0, 3.0), Color::black())
            .unwrap();
        r.end_frame().unwrap();

        let v = &r.backend().draws()[0].vertices;
        assert_eq!(v[3].pos, [5.0, 7.0]); // BL
        assert_eq!(v[1].pos, [7.0, 10.0]); // TR
        assert_eq!(v[0].color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn clear_transform_drops_saves_and_offsets() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.save_transform();
        r.translate(Vec2::new(30.0, 30.0));
        r.clear_transform();
        r.restore_transform(); // nothing saved anymore; logged no-op

        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_frame().unwrap();
        assert_eq!(r.backend().draws()[0].vertices[3].pos, [0.0, 0.0]);
    }

    // ── registration and growth ───────────────────────────────────────────

    #[test]
    fn zero_size_image_is_rejected() {
        let mut r = new_renderer(64, 8);
        assert!(matches!(
            r.register_image("bad", &Pixmap::new(0, 16)),
            Err(RenderError::ZeroSizeImage(k)) if k == "bad"
        ));
        assert!(!r.has_image("bad"));
    }

    #[test]
    fn registration_works_outside_frames() {
        let mut r = new_renderer(64, 8);
        r.register_image("n", &noisy(32, 32)).unwrap();
        assert!(r.has_image("n"));
        assert_eq!(r.image_size("n"), Some((32, 32)));
        assert_eq!(r.image_count(), 1);
        assert_eq!(r.backend().draw_calls(), 0);
    }

    #[test]
    fn reregistering_replaces_and_releases_tiles() {
        let mut r = new_renderer(64, 8);
        r.register_image("a", &noisy(32, 32)).unwrap();
        assert_eq!(r.atlas_stats().tiles_used, 2);

        r.register_image("a", &solid(32, 32, RED)).unwrap();
        assert_eq!(r.atlas_stats().tiles_used, 1);
        assert_eq!(r.image_count(), 1);
    }

    #[test]
    fn remove_image_is_idempotent() {
        let mut r = new_renderer(64, 8);
        r.register_image("a", &noisy(32, 32)).unwrap();
        r.remove_image("a");
        assert_eq!(r.atlas_stats().tiles_used, 1);
        assert!(!r.has_image("a"));
        r.remove_image("a");
        assert_eq!(r.atlas_stats().tiles_used, 1);
    }

    #[test]
    fn growth_preserves_registered_content() {
        // 64 px atlas: 4 tiles, 3 free after the white tile.
        let mut r = new_renderer(64, 8);
        r.register_image("a", &noisy(32, 32)).unwrap();
        assert_eq!(r.atlas_stats().side, 64);

        // 4 more tiles needed, 2 free: the atlas doubles once.
        r.register_image("b", &noisy(64, 64)).unwrap();
        let stats = r.atlas_stats();
        assert_eq!(stats.side, 128);
        assert_eq!(stats.tiles_used, 6);

        // Tile 1 kept its index; its origin on the new side is (32, 0).
        assert_eq!(r.backend().atlas_pixel(32, 0), [0, 0, 0, 255]);
        assert_eq!(r.backend().atlas_pixel(33, 0), [1, 0, 1, 255]);
        // The white tile survived the move too.
        assert_eq!(r.backend().atlas_pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn two_large_images_share_the_grown_atlas() {
        let mut r = new_renderer(64, 8);
        r.register_image("a", &noisy(64, 64)).unwrap();
        r.register_image("b", &noisy(64, 64)).unwrap();

        let stats = r.atlas_stats();
        assert_eq!(stats.side, 128);
        assert_eq!(stats.tiles_used, 9);
        assert!(r.has_image("a") && r.has_image("b"));
    }

    #[test]
    fn growth_during_a_frame_flushes_pending_quads() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(128, 128).unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();

        r.register_image("big", &noisy(64, 64)).unwrap();
        // The pending quad went out before the atlas was recreated.
        assert_eq!(r.backend().draw_calls(), 1);
        r.end_frame().unwrap();
        assert_eq!(r.backend().draw_calls(), 1);
    }

    #[test]
    fn registration_without_growth_does_not_flush() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.register_image("small", &noisy(32, 32)).unwrap();
        assert_eq!(r.backend().draw_calls(), 0);
        r.end_frame().unwrap();
    }

    #[test]
    fn uploads_count_into_frame_stats() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.register_image("n", &noisy(32, 32)).unwrap();
        assert_eq!(r.frame_stats().uploads, 1);

        // Growth re-places 2 occupied tiles, then 4 new ones land.
        r.register_image("big", &noisy(64, 64)).unwrap();
        assert_eq!(r.frame_stats().uploads, 1 + 2 + 4);
        r.end_frame().unwrap();
    }

    // ── masks ─────────────────────────────────────────────────────────────

    #[test]
    fn mask_transitions_route_draws_between_targets() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();

        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.begin_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.pop_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_frame().unwrap();

        assert_eq!(r.backend().mask_clears(), &[1]);
        assert_eq!(
            surface_passes(r.backend().draws()),
            vec![
                DrawPass::Surface { mask_read: 0 },
                DrawPass::MaskLayer {
                    layer: 1,
                    mask_read: 0
                },
                DrawPass::Surface { mask_read: 1 },
                DrawPass::Surface { mask_read: 0 },
            ]
        );
    }

    #[test]
    fn nested_masks_build_against_the_layer_below() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();

        r.begin_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_mask().unwrap();

        r.begin_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_mask().unwrap();

        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.clear_mask().unwrap();
        r.end_frame().unwrap();

        assert_eq!(r.backend().mask_clears(), &[1, 2]);
        assert_eq!(
            surface_passes(r.backend().draws()),
            vec![
                DrawPass::MaskLayer {
                    layer: 1,
                    mask_read: 0
                },
                // The inner mask is itself tested against the outer one.
                DrawPass::MaskLayer {
                    layer: 2,
                    mask_read: 1
                },
                DrawPass::Surface { mask_read: 2 },
            ]
        );
    }

    #[test]
    fn mask_protocol_errors_surface_through_the_renderer() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();

        assert!(matches!(r.end_mask(), Err(RenderError::NoMaskBuilding)));
        assert!(matches!(r.pop_mask(), Err(RenderError::MaskStackEmpty)));

        r.begin_mask().unwrap();
        assert!(matches!(
            r.begin_mask(),
            Err(RenderError::MaskAlreadyBuilding)
        ));
        assert!(matches!(r.pop_mask(), Err(RenderError::MaskBuildOpen)));
        assert!(matches!(r.clear_mask(), Err(RenderError::MaskBuildOpen)));
    }

    #[test]
    fn end_frame_with_open_mask_build_fails_but_closes() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.begin_mask().unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();

        let err = r.end_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnbalancedMasks {
                building: true,
                depth: 0
            }
        ));
        // The pending mask quad was dropped, the frame was released.
        assert_eq!(r.backend().draw_calls(), 0);
        assert!(!r.backend().frame_open());

        // The next frame starts clean.
        r.begin_frame(64, 64).unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        r.end_frame().unwrap();
        assert_eq!(
            surface_passes(r.backend().draws()),
            vec![DrawPass::Surface { mask_read: 0 }]
        );
    }

    #[test]
    fn end_frame_with_unpopped_layers_fails_but_closes() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.begin_mask().unwrap();
        r.end_mask().unwrap();

        assert!(matches!(
            r.end_frame(),
            Err(RenderError::UnbalancedMasks {
                building: false,
                depth: 1
            })
        ));
        assert!(!r.backend().frame_open());
    }

    // ── coordinate mapping ────────────────────────────────────────────────

    #[test]
    fn to_screen_flips_y_against_the_frame_height() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(100, 200).unwrap();
        r.translate(Vec2::new(10.0, 20.0));

        let s = r.to_screen(Vec2::new(5.0, 5.0));
        assert_eq!(s.x, 15.0);
        assert_eq!(s.y, 175.0);

        let w = r.from_screen(s);
        assert!((w.x - 5.0).abs() < 1e-4 && (w.y - 5.0).abs() < 1e-4);
        r.end_frame().unwrap();
    }

    #[test]
    fn frame_size_persists_for_mapping_between_frames() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(100, 50).unwrap();
        r.end_frame().unwrap();
        assert_eq!(r.to_screen(Vec2::new(0.0, 10.0)).y, 40.0);
    }

    #[test]
    fn from_screen_with_singular_transform_returns_input() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(100, 100).unwrap();
        r.scale(Vec2::zero());
        let p = Vec2::new(3.0, 4.0);
        let q = r.from_screen(p);
        assert_eq!(q.x, p.x);
        assert_eq!(q.y, p.y);
        r.end_frame().unwrap();
    }

    // ── readback ──────────────────────────────────────────────────────────

    #[test]
    fn read_atlas_returns_white_tile_and_uploads() {
        let mut r = new_renderer(64, 8);
        r.register_image("n", &noisy(32, 32)).unwrap();

        let pm = r.read_atlas().unwrap();
        assert_eq!((pm.width(), pm.height()), (64, 64));
        assert_eq!(pm.pixel(16, 16), [255, 255, 255, 255]);
        assert_eq!(pm.pixel(32, 0), [0, 0, 0, 255]);
        assert_eq!(pm.pixel(0, 32), [0, 0, 0, 0]); // untouched tile
    }

    #[test]
    fn read_atlas_flushes_pending_quads() {
        let mut r = new_renderer(64, 8);
        r.begin_frame(64, 64).unwrap();
        r.draw_rect(unit_rect(), Color::white()).unwrap();
        let _ = r.read_atlas().unwrap();
        assert_eq!(r.backend().draw_calls(), 1);
        r.end_frame().unwrap();
    }
}
