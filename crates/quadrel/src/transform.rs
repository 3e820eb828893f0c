//! Transform stack.
//!
//! A current affine plus a save stack, canvas-style: `translate`, `rotate`
//! and `scale` compose onto the current transform in local space, `save`
//! snapshots it and `restore` rolls back. Misuse here is tolerated rather
//! than fatal (logged no-ops), unlike the mask protocol, because transforms
//! carry no GPU state that could be corrupted.

use crate::coords::{Affine, Vec2};

/// Upper bound on nested saves.
pub const MAX_TRANSFORM_DEPTH: usize = 32;

pub(crate) struct TransformStack {
    current: Affine,
    saved: Vec<Affine>,
}

impl TransformStack {
    pub(crate) fn new() -> Self {
        Self {
            current: Affine::IDENTITY,
            saved: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn current(&self) -> Affine {
        self.current
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.saved.len()
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.current = self.current * Affine::translation(delta);
    }

    /// Counter-clockwise rotation in radians (+Y up).
    pub(crate) fn rotate(&mut self, radians: f32) {
        self.current = self.current * Affine::rotation(radians);
    }

    pub(crate) fn scale(&mut self, factor: Vec2) {
        self.current = self.current * Affine::scaling(factor);
    }

    pub(crate) fn save(&mut self) {
        if self.saved.len() >= MAX_TRANSFORM_DEPTH {
            log::warn!("transform save ignored: depth limit {MAX_TRANSFORM_DEPTH} reached");
            return;
        }
        self.saved.push(self.current);
    }

    pub(crate) fn restore(&mut self) {
        match self.saved.pop() {
            Some(t) => self.current = t,
            None => log::warn!("transform restore ignored: nothing saved"),
        }
    }

    /// Back to a single identity entry.
    pub(crate) fn reset(&mut self) {
        self.current = Affine::IDENTITY;
        self.saved.clear();
    }
}
