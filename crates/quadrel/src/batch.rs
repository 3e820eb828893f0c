//! Quad batch buffer.
//!
//! Vertices for many quads accumulate in one fixed-capacity interleaved
//! buffer; the companion index list is static, so a flush uploads only the
//! used vertex range and issues a single indexed draw.

use bytemuck::Zeroable;

use crate::coords::{Color, Rect, Vec2};
use crate::gpu::SpriteVertex;

/// Largest legal quad capacity: 4 corners per quad must stay addressable by
/// 16-bit indices, so `max_quads * 4 <= 65536`.
pub const MAX_QUADS: usize = (u16::MAX as usize + 1) / 4;

/// Default quad capacity.
pub const DEFAULT_MAX_QUADS: usize = 10_921;

/// Per-quad index pattern over corners TL(0), TR(1), BR(2), BL(3):
/// triangles (BL, TL, TR) and (BR, BL, TR).
pub(crate) const QUAD_INDEX_PATTERN: [u16; 6] = [3, 0, 1, 2, 3, 1];

pub(crate) struct QuadBatch {
    vertices: Vec<SpriteVertex>,
    quads: usize,
    max_quads: usize,
}

impl QuadBatch {
    /// `max_quads` must already be validated against `1..=MAX_QUADS`.
    pub(crate) fn new(max_quads: usize) -> Self {
        debug_assert!((1..=MAX_QUADS).contains(&max_quads));
        Self {
            vertices: vec![SpriteVertex::zeroed(); max_quads * 4],
            quads: 0,
            max_quads,
        }
    }

    /// Builds the static index list: `max_quads` copies of the pattern, each
    /// shifted by its quad's first vertex. Uploaded to the GPU exactly once.
    pub(crate) fn index_pattern(max_quads: usize) -> Vec<u16> {
        let mut indices = Vec::with_capacity(max_quads * 6);
        for q in 0..max_quads {
            let base = (q * 4) as u16;
            indices.extend(QUAD_INDEX_PATTERN.iter().map(|&i| base + i));
        }
        indices
    }

    /// Appends one quad. `corners` are world positions in TL, TR, BR, BL
    /// order; the UV rect spreads over them the same way.
    ///
    /// Returns `true` when the batch just became full and must be flushed
    /// before the next append.
    pub(crate) fn append(&mut self, corners: [Vec2; 4], uv: Rect, color: Color) -> bool {
        debug_assert!(self.quads < self.max_quads, "append on a full batch");

        let c = color.to_array();
        let u0 = uv.origin.x;
        let v0 = uv.origin.y;
        let u1 = uv.origin.x + uv.size.x;
        let v1 = uv.origin.y + uv.size.y;
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];

        let base = self.quads * 4;
        for (i, (corner, cuv)) in corners.iter().zip(uvs).enumerate() {
            self.vertices[base + i] = SpriteVertex {
                pos: [corner.x, corner.y],
                uv: cuv,
                color: c,
            };
        }
        self.quads += 1;
        self.quads == self.max_quads
    }

    #[inline]
    pub(crate) fn quads(&self) -> usize {
        self.quads
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.quads == 0
    }

    #[inline]
    pub(crate) fn max_quads(&self) -> usize {
        self.max_quads
    }

    /// Full vertex storage; a flush reads the first `quads() * 4` entries.
    #[inline]
    pub(crate) fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.quads = 0;
    }
}
