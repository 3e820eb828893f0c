use super::{DrawPass, GpuBackend, SpriteVertex};

/// One logged draw call.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub pass: DrawPass,
    pub quads: usize,
    pub vertices: Vec<SpriteVertex>,
}

/// Backend that touches no GPU.
///
/// Atlas uploads land in a CPU byte buffer and `read_atlas` returns it, so
/// growth re-packing behaves exactly as on the wgpu path. Draw calls and mask
/// clears append to logs the tests inspect.
#[derive(Debug, Default)]
pub struct RecordBackend {
    side: u32,
    atlas: Vec<u8>,
    index_pattern: Vec<u16>,
    frame: Option<(u32, u32)>,
    draws: Vec<DrawRecord>,
    uploads: usize,
    atlas_inits: usize,
    mask_clears: Vec<usize>,
}

impl RecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atlas_side(&self) -> u32 {
        self.side
    }

    /// Times `init_atlas` ran; 1 after construction, +1 per growth.
    pub fn atlas_inits(&self) -> usize {
        self.atlas_inits
    }

    pub fn atlas_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.side as usize + x as usize) * 4;
        [
            self.atlas[i],
            self.atlas[i + 1],
            self.atlas[i + 2],
            self.atlas[i + 3],
        ]
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn draw_calls(&self) -> usize {
        self.draws.len()
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn index_pattern(&self) -> &[u16] {
        &self.index_pattern
    }

    pub fn mask_clears(&self) -> &[usize] {
        &self.mask_clears
    }

    pub fn frame_open(&self) -> bool {
        self.frame.is_some()
    }

    /// Forgets logged draws, uploads and mask clears. Atlas bytes stay.
    pub fn reset_log(&mut self) {
        self.draws.clear();
        self.mask_clears.clear();
        self.uploads = 0;
    }
}

impl GpuBackend for RecordBackend {
    fn init_atlas(&mut self, side: u32, _pixelate: bool) {
        self.side = side;
        self.atlas = vec![0; side as usize * side as usize * 4];
        self.atlas_inits += 1;
    }

    fn upload_atlas(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &[u8]) {
        debug_assert_eq!(pixels.len(), w as usize * h as usize * 4);
        debug_assert!(x + w <= self.side && y + h <= self.side);

        let stride = self.side as usize * 4;
        for row in 0..h as usize {
            let src = row * w as usize * 4;
            let dst = (y as usize + row) * stride + x as usize * 4;
            self.atlas[dst..dst + w as usize * 4]
                .copy_from_slice(&pixels[src..src + w as usize * 4]);
        }
        self.uploads += 1;
    }

    fn read_atlas(&mut self) -> anyhow::Result<Vec<u8>> {
        Ok(self.atlas.clone())
    }

    fn set_index_pattern(&mut self, indices: &[u16]) {
        self.index_pattern = indices.to_vec();
    }

    fn frame_begin(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.frame = Some((width, height));
        Ok(())
    }

    fn frame_end(&mut self) {
        self.frame = None;
    }

    fn clear_mask_layer(&mut self, layer: usize) {
        self.mask_clears.push(layer);
    }

    fn draw(&mut self, pass: DrawPass, vertices: &[SpriteVertex], quads: usize) {
        self.draws.push(DrawRecord {
            pass,
            quads,
            vertices: vertices[..quads * 4].to_vec(),
        });
    }
}
