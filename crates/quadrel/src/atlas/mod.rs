//! Tile-grid texture atlas.
//!
//! One square RGBA8 texture divided into fixed 32 px tiles:
//! - tile 0 is reserved solid white and never allocated
//! - allocation is first-fit over a linear occupancy table
//! - when full, the atlas doubles its side; tiles keep their linear index
//!   (their pixel position moves with the new tiles-per-row count)
//! - tiles whose source pixels are a single color skip the atlas entirely

mod grid;
mod store;

pub use store::{AtlasStats, AtlasStore, ImageEntry, TileSlot};

/// Tile edge length in pixels. The grid math assumes this divides the side.
pub const TILE_SIZE: u32 = 32;

/// Smallest accepted atlas side: one row of two tiles (white + one usable).
pub const MIN_ATLAS_SIZE: u32 = 2 * TILE_SIZE;

/// Hard growth ceiling; exceeding it is `RenderError::AtlasExhausted`.
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Default starting side when the caller does not pick one.
pub const DEFAULT_ATLAS_SIZE: u32 = 512;
