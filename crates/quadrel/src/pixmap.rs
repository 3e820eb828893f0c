//! CPU-side RGBA8 pixel buffers.
//!
//! `Pixmap` is the image-source type handed to `Renderer::register_image` and
//! returned by `Renderer::read_atlas`. Rows are stored top-to-bottom,
//! 4 bytes per pixel, no row padding.

/// One RGBA8 pixel, straight alpha.
pub type Rgba8 = [u8; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Creates a transparent-black pixmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wraps an existing RGBA8 buffer.
    ///
    /// Returns `None` when `data` is not exactly `width * height * 4` bytes.
    pub fn from_pixels(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reads the pixel at `(x, y)`, row 0 at the top. Panics out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Writes the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    pub fn fill(&mut self, px: Rgba8) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Returns the region's color when every pixel in it is identical.
    ///
    /// The region must lie within bounds; zero-area regions return `None`.
    pub fn region_uniform(&self, x: u32, y: u32, w: u32, h: u32) -> Option<Rgba8> {
        if w == 0 || h == 0 {
            return None;
        }

        let first = self.pixel(x, y);
        for ry in y..y + h {
            let start = self.offset(x, ry);
            let row = &self.data[start..start + w as usize * 4];
            for px in row.chunks_exact(4) {
                if px != first {
                    return None;
                }
            }
        }
        Some(first)
    }

    /// Copies a `w`×`h` region into a `pad_to`×`pad_to` RGBA8 buffer.
    ///
    /// Texels past the region's extent repeat the region's own edge pixels,
    /// never a neighbor's, so linear filtering at the region border stays
    /// inside the source content.
    pub fn extract_padded(&self, x: u32, y: u32, w: u32, h: u32, pad_to: u32) -> Vec<u8> {
        debug_assert!(w > 0 && h > 0 && w <= pad_to && h <= pad_to);

        let mut out = vec![0u8; pad_to as usize * pad_to as usize * 4];
        for oy in 0..pad_to {
            let sy = y + oy.min(h - 1);
            for ox in 0..pad_to {
                let sx = x + ox.min(w - 1);
                let src = self.offset(sx, sy);
                let dst = (oy as usize * pad_to as usize + ox as usize) * 4;
                out[dst..dst + 4].copy_from_slice(&self.data[src..src + 4]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32, a: Rgba8, b: Rgba8) -> Pixmap {
        let mut pm = Pixmap::new(w, h);
        for y in 0..h {
            for x in 0..w {
                pm.set_pixel(x, y, if (x + y) % 2 == 0 { a } else { b });
            }
        }
        pm
    }

    const RED: Rgba8 = [255, 0, 0, 255];
    const BLUE: Rgba8 = [0, 0, 255, 255];

    // ── pixel access ──────────────────────────────────────────────────────

    #[test]
    fn new_pixmap_is_transparent() {
        let pm = Pixmap::new(4, 4);
        assert_eq!(pm.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(pm.pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut pm = Pixmap::new(8, 8);
        pm.set_pixel(2, 5, RED);
        assert_eq!(pm.pixel(2, 5), RED);
        assert_eq!(pm.pixel(5, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn out_of_bounds_write_is_ignored() {
        let mut pm = Pixmap::new(2, 2);
        pm.set_pixel(2, 0, RED);
        pm.set_pixel(0, 2, RED);
        assert!(pm.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn from_pixels_rejects_wrong_length() {
        assert!(Pixmap::from_pixels(2, 2, vec![0; 15]).is_none());
        assert!(Pixmap::from_pixels(2, 2, vec![0; 16]).is_some());
    }

    // ── region_uniform ────────────────────────────────────────────────────

    #[test]
    fn uniform_region_reports_its_color() {
        let mut pm = Pixmap::new(8, 8);
        pm.fill(BLUE);
        assert_eq!(pm.region_uniform(0, 0, 8, 8), Some(BLUE));
        assert_eq!(pm.region_uniform(2, 3, 4, 2), Some(BLUE));
    }

    #[test]
    fn mixed_region_reports_none() {
        let pm = checker(8, 8, RED, BLUE);
        assert_eq!(pm.region_uniform(0, 0, 8, 8), None);
        assert_eq!(pm.region_uniform(0, 0, 2, 1), None);
    }

    #[test]
    fn uniform_subregion_of_mixed_image() {
        let mut pm = checker(8, 8, RED, BLUE);
        for y in 4..8 {
            for x in 4..8 {
                pm.set_pixel(x, y, RED);
            }
        }
        assert_eq!(pm.region_uniform(4, 4, 4, 4), Some(RED));
        assert_eq!(pm.region_uniform(0, 0, 8, 8), None);
    }

    #[test]
    fn uniformity_compares_alpha_too() {
        let mut pm = Pixmap::new(2, 1);
        pm.set_pixel(0, 0, [10, 10, 10, 255]);
        pm.set_pixel(1, 0, [10, 10, 10, 128]);
        assert_eq!(pm.region_uniform(0, 0, 2, 1), None);
    }

    // ── extract_padded ────────────────────────────────────────────────────

    #[test]
    fn extract_full_region_copies_verbatim() {
        let pm = checker(4, 4, RED, BLUE);
        let out = pm.extract_padded(0, 0, 4, 4, 4);
        assert_eq!(out, pm.data());
    }

    #[test]
    fn extract_pads_by_replicating_region_edges() {
        let mut pm = Pixmap::new(4, 4);
        pm.fill(BLUE);
        pm.set_pixel(1, 1, RED); // bottom-right pixel of the 2×2 region

        let out = pm.extract_padded(0, 0, 2, 2, 4);

        // Interior copied.
        assert_eq!(&out[0..4], &BLUE);
        let at = |x: usize, y: usize| &out[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(at(1, 1), &RED);
        // Padding repeats the region's last row/column, not pixels beyond it.
        assert_eq!(at(2, 1), &RED);
        assert_eq!(at(3, 1), &RED);
        assert_eq!(at(1, 2), &RED);
        assert_eq!(at(3, 3), &RED);
        assert_eq!(at(2, 0), &BLUE);
    }
}
