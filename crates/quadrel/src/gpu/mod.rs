//! GPU backend seam.
//!
//! The renderer drives a small blocking interface so batching, atlas and mask
//! logic stay testable without a device:
//! - `WgpuBackend` submits real work through wgpu
//! - `RecordBackend` keeps pixels and draw calls in plain memory
//!
//! All calls are made single-threaded from `Renderer`; implementations never
//! need interior locking.

mod device;
mod record;

pub use device::{WgpuBackend, WgpuInit};
pub use record::{DrawRecord, RecordBackend};

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex for one quad corner (32 bytes).
///
/// `pos` is in world pixels, `uv` in normalized atlas coordinates, `color`
/// a straight-alpha tint multiplied with the sampled texel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2, // uv
        2 => Float32x4  // color
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Destination of one batched draw call.
///
/// `mask_read` names the mask layer the fragments are tested against;
/// layer 0 is the permanent full-coverage layer, so "no masking".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawPass {
    /// Draw to the frame target.
    Surface { mask_read: usize },
    /// Draw coverage into the given mask layer.
    MaskLayer { layer: usize, mask_read: usize },
}

/// Blocking interface between the renderer and the GPU.
pub trait GpuBackend {
    /// Creates (or recreates, dropping contents) the square RGBA8 atlas.
    fn init_atlas(&mut self, side: u32, pixelate: bool);

    /// Uploads an RGBA8 block into the atlas. `pixels` holds `w * h * 4`
    /// tightly packed bytes.
    fn upload_atlas(&mut self, x: u32, y: u32, w: u32, h: u32, pixels: &[u8]);

    /// Reads back the whole atlas as tightly packed RGBA8 rows.
    fn read_atlas(&mut self) -> anyhow::Result<Vec<u8>>;

    /// Stores the static quad index pattern. Called once per renderer.
    fn set_index_pattern(&mut self, indices: &[u16]);

    /// Opens a frame target of the given pixel size.
    fn frame_begin(&mut self, width: u32, height: u32) -> anyhow::Result<()>;

    /// Finishes and presents/submits the open frame.
    fn frame_end(&mut self);

    /// Clears one mask layer to zero coverage, creating it on first use.
    /// Never called for layer 0.
    fn clear_mask_layer(&mut self, layer: usize);

    /// Draws `quads * 6` indices over the first `quads * 4` entries of
    /// `vertices`. Only called with `quads > 0` inside an open frame.
    fn draw(&mut self, pass: DrawPass, vertices: &[SpriteVertex], quads: usize);
}
