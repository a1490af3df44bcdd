/// Gameplay tuning for the arena layout.
///
/// Keep this separate from runtime/server configuration (ports, channel sizes, etc.).
#[derive(Debug, Clone, Copy)]
pub struct MapTuning {
    /// Cells per side of the square grid (6..=15).
    pub grid_size: usize,

    /// Pixel size of one cell; top/left positions are multiples of this.
    pub cell_px: u32,

    /// Chance (0.0..=1.0) that a free, unreserved cell starts as a breakable wall.
    pub breakable_density: f64,
}

impl MapTuning {
    pub const MIN_GRID_SIZE: usize = 6;
    pub const MAX_GRID_SIZE: usize = 15;

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size.clamp(Self::MIN_GRID_SIZE, Self::MAX_GRID_SIZE);
        self
    }
}

impl Default for MapTuning {
    fn default() -> Self {
        Self {
            grid_size: 11,
            cell_px: 40,
            breakable_density: 0.6,
        }
    }
}
