use super::TILE_SIZE;

/// Occupancy table for the atlas tile grid.
///
/// Tiles are addressed by linear index in row-major order. The index is the
/// stable handle: growth extends the table without renumbering, so a tile's
/// pixel origin changes with `tile_run` but its index never does.
///
/// Invariant: slot 0 (the white tile) is occupied from construction and
/// `free_tiles` refuses to release it.
pub(super) struct TileGrid {
    occupied: Vec<bool>,
    tile_run: u32,
}

impl TileGrid {
    /// `side` must be a non-zero multiple of `TILE_SIZE`.
    pub(super) fn new(side: u32) -> Self {
        debug_assert!(side >= TILE_SIZE && side % TILE_SIZE == 0);
        let tile_run = side / TILE_SIZE;
        let mut occupied = vec![false; (tile_run * tile_run) as usize];
        occupied[0] = true;
        Self { occupied, tile_run }
    }

    #[inline]
    pub(super) fn tile_run(&self) -> u32 {
        self.tile_run
    }

    #[inline]
    pub(super) fn total(&self) -> usize {
        self.occupied.len()
    }

    pub(super) fn used(&self) -> usize {
        self.occupied.iter().filter(|&&o| o).count()
    }

    #[inline]
    pub(super) fn free(&self) -> usize {
        self.total() - self.used()
    }

    /// First-fit scan for a free tile, starting after the white tile.
    /// Does not mark anything.
    pub(super) fn find_free(&self) -> Option<u32> {
        self.occupied[1..]
            .iter()
            .position(|&o| !o)
            .map(|i| i as u32 + 1)
    }

    /// First-fit allocation: finds a free tile and marks it occupied.
    pub(super) fn alloc(&mut self) -> Option<u32> {
        let index = self.find_free()?;
        self.occupied[index as usize] = true;
        Some(index)
    }

    /// Releases tiles back to the pool.
    ///
    /// Tile 0, already-free tiles, and out-of-range indices are ignored, so
    /// releasing the same set twice is harmless.
    pub(super) fn free_tiles<I: IntoIterator<Item = u32>>(&mut self, indices: I) {
        for index in indices {
            if index == 0 {
                continue;
            }
            if let Some(slot) = self.occupied.get_mut(index as usize) {
                *slot = false;
            }
        }
    }

    /// Pixel origin of a tile under the current grid width.
    #[inline]
    pub(super) fn origin(&self, index: u32) -> (u32, u32) {
        (
            (index % self.tile_run) * TILE_SIZE,
            (index / self.tile_run) * TILE_SIZE,
        )
    }

    /// Pixel origin of a tile in a grid that is `tile_run` tiles wide.
    /// Used while re-placing tiles during growth.
    #[inline]
    pub(super) fn origin_for_run(index: u32, tile_run: u32) -> (u32, u32) {
        ((index % tile_run) * TILE_SIZE, (index / tile_run) * TILE_SIZE)
    }

    /// Extends the table for a doubled side. Existing indices keep their
    /// occupancy; new slots start free.
    pub(super) fn grow(&mut self, new_side: u32) {
        debug_assert!(new_side % TILE_SIZE == 0);
        let new_run = new_side / TILE_SIZE;
        debug_assert!(new_run >= self.tile_run);
        self.tile_run = new_run;
        self.occupied.resize((new_run * new_run) as usize, false);
    }

    /// Occupied tile indices in increasing order, including the white tile.
    pub(super) fn occupied_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.occupied
            .iter()
            .enumerate()
            .filter(|&(_, &o)| o)
            .map(|(i, _)| i as u32)
    }
}
