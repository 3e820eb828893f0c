//! Frame lifecycle state and per-frame counters.

use crate::error::{RenderError, Result};

/// Counters reset by `begin_frame`. Registration work done between frames
/// accumulates into the idle counters and disappears at the next reset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Indexed draw calls issued (flushes that carried quads).
    pub draw_calls: usize,
    /// Quads appended.
    pub quads: usize,
    /// Atlas texture uploads: tile writes plus growth re-placements.
    pub uploads: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FramePhase {
    Idle,
    InFrame,
}

pub(crate) struct FrameState {
    phase: FramePhase,
    width: u32,
    height: u32,
    stats: FrameStats,
}

impl FrameState {
    pub(crate) fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            width: 0,
            height: 0,
            stats: FrameStats::default(),
        }
    }

    /// `Idle -> InFrame`. Remembers the frame size and zeroes the counters.
    pub(crate) fn begin(&mut self, width: u32, height: u32) -> Result<()> {
        if self.phase == FramePhase::InFrame {
            return Err(RenderError::FrameAlreadyOpen);
        }
        self.phase = FramePhase::InFrame;
        self.width = width;
        self.height = height;
        self.stats = FrameStats::default();
        Ok(())
    }

    /// `InFrame -> Idle`. The size sticks around for `to_screen` between
    /// frames.
    pub(crate) fn end(&mut self) -> Result<()> {
        self.require_in_frame()?;
        self.phase = FramePhase::Idle;
        Ok(())
    }

    #[inline]
    pub(crate) fn require_in_frame(&self) -> Result<()> {
        match self.phase {
            FramePhase::InFrame => Ok(()),
            FramePhase::Idle => Err(RenderError::NotInFrame),
        }
    }

    #[inline]
    pub(crate) fn in_frame(&self) -> bool {
        self.phase == FramePhase::InFrame
    }

    /// Most recent frame size in pixels; `(0, 0)` before the first frame.
    #[inline]
    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub(crate) fn stats(&self) -> FrameStats {
        self.stats
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut FrameStats {
        &mut self.stats
    }
}
