//! Coordinate and geometry types shared across the renderer.
//!
//! Canonical world space:
//! - Pixels
//! - Origin bottom-left
//! - +X right, +Y up
//!
//! `Renderer::to_screen` / `Renderer::from_screen` convert between world space
//! and window coordinates (top-left origin, +Y down). The sprite shader
//! converts world space to NDC using a frame-size uniform.

mod affine;
mod color;
mod rect;
mod vec2;

pub use affine::Affine;
pub use color::Color;
pub use rect::Rect;
pub use vec2::Vec2;
