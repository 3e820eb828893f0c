//! Renderer error taxonomy.
//!
//! Errors split into four families:
//! - configuration: rejected constructor parameters
//! - protocol: an operation called in the wrong state
//! - resource: a hard capacity limit was hit
//! - lookup: a key or input the caller supplied does not resolve

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    // ── configuration ─────────────────────────────────────────────────────
    /// Atlas side must be a power of two within `[2 * TILE_SIZE, MAX_ATLAS_SIZE]`.
    #[error("invalid atlas size {0}: must be a power of two in 64..=8192")]
    InvalidAtlasSize(u32),

    /// `max_quads * 4` vertices must stay addressable by 16-bit indices.
    #[error("max_quads {0} exceeds the 16-bit index space (limit 16384)")]
    TooManyQuads(usize),

    #[error("max_quads must be at least 1")]
    ZeroQuads,

    // ── protocol ──────────────────────────────────────────────────────────
    #[error("operation requires an open frame")]
    NotInFrame,

    #[error("begin_frame called while a frame is already open")]
    FrameAlreadyOpen,

    #[error("begin_mask called while a mask is already being built")]
    MaskAlreadyBuilding,

    #[error("end_mask called with no mask being built")]
    NoMaskBuilding,

    #[error("pop_mask called with an empty mask stack")]
    MaskStackEmpty,

    #[error("mask stack cannot be modified while a mask is being built")]
    MaskBuildOpen,

    #[error("mask stack depth limit ({0}) reached")]
    MaskStackOverflow(usize),

    /// `end_frame` found an unfinished mask build or unpopped mask layers.
    #[error("end_frame with unbalanced masks (build in progress: {building}, layers still pushed: {depth})")]
    UnbalancedMasks { building: bool, depth: usize },

    // ── resource ──────────────────────────────────────────────────────────
    /// The atlas is at its maximum size and no tile is free.
    #[error("atlas exhausted at {side}x{side}: cannot grow past {max}x{max}")]
    AtlasExhausted { side: u32, max: u32 },

    // ── lookup ────────────────────────────────────────────────────────────
    #[error("unknown image key {0:?}")]
    UnknownImage(String),

    #[error("image {0:?} has zero width or height")]
    ZeroSizeImage(String),

    // ── backend ───────────────────────────────────────────────────────────
    /// Failure surfaced by the GPU backend (surface lost, device error, ...).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
