//! Quadrel: a batching 2D renderer for sprites and solid shapes.
//!
//! Registered images live as 32 px tiles in one growable atlas texture, so
//! a frame's worth of draws collapses into a handful of indexed draw calls.
//! The `renderer` module owns the public API; the `gpu` module is the seam
//! between the batching logic and wgpu.

pub mod coords;
pub mod pixmap;

pub mod atlas;
pub mod batch;
pub mod frame;
pub mod mask;
pub mod renderer;
pub mod transform;

pub mod error;
pub mod gpu;
pub mod logging;
