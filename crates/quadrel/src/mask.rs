//! Mask stack bookkeeping.
//!
//! Masks are frame-sized single-channel coverage layers. Layer 0 is the
//! permanent full-coverage layer ("no masking"); pushed masks occupy layers
//! `1..=depth`. While a mask is being built, quads draw into layer
//! `depth + 1` and are themselves tested against layer `depth`, which is how
//! nested masks compose multiplicatively.
//!
//! This type tracks indices and the build phase only; layer textures live in
//! the backend and the renderer drives flushes around every transition.

use crate::error::{RenderError, Result};

/// Upper bound on simultaneously pushed mask layers.
pub const MAX_MASK_DEPTH: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MaskPhase {
    Idle,
    Building,
}

pub(crate) struct MaskStack {
    depth: usize,
    phase: MaskPhase,
}

impl MaskStack {
    pub(crate) fn new() -> Self {
        Self {
            depth: 0,
            phase: MaskPhase::Idle,
        }
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub(crate) fn is_building(&self) -> bool {
        self.phase == MaskPhase::Building
    }

    /// True when a frame may close: no build open, no layers pushed.
    #[inline]
    pub(crate) fn is_balanced(&self) -> bool {
        self.depth == 0 && self.phase == MaskPhase::Idle
    }

    /// Layer the next draw call is tested against. The formula holds in both
    /// phases: the layer being built never tests against itself.
    #[inline]
    pub(crate) fn read_layer(&self) -> usize {
        self.depth
    }

    /// Layer receiving coverage while building.
    #[inline]
    pub(crate) fn write_layer(&self) -> usize {
        debug_assert!(self.is_building());
        self.depth + 1
    }

    /// `Idle -> Building`. Returns the layer index to clear and draw into.
    pub(crate) fn begin(&mut self) -> Result<usize> {
        if self.is_building() {
            return Err(RenderError::MaskAlreadyBuilding);
        }
        if self.depth >= MAX_MASK_DEPTH {
            return Err(RenderError::MaskStackOverflow(MAX_MASK_DEPTH));
        }
        self.phase = MaskPhase::Building;
        Ok(self.depth + 1)
    }

    /// `Building -> Idle`, pushing the finished layer onto the stack.
    pub(crate) fn end(&mut self) -> Result<()> {
        if !self.is_building() {
            return Err(RenderError::NoMaskBuilding);
        }
        self.phase = MaskPhase::Idle;
        self.depth += 1;
        Ok(())
    }

    /// Pops the top layer; subsequent draws test against the one below.
    pub(crate) fn pop(&mut self) -> Result<()> {
        if self.is_building() {
            return Err(RenderError::MaskBuildOpen);
        }
        if self.depth == 0 {
            return Err(RenderError::MaskStackEmpty);
        }
        self.depth -= 1;
        Ok(())
    }

    /// Drops every pushed layer at once.
    pub(crate) fn clear(&mut self) -> Result<()> {
        if self.is_building() {
            return Err(RenderError::MaskBuildOpen);
        }
        self.depth = 0;
        Ok(())
    }

    /// Unconditional reset, used when a frame closes over unbalanced state.
    pub(crate) fn reset(&mut self) {
        self.depth = 0;
        self.phase = MaskPhase::Idle;
    }
}
