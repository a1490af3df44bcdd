// Grid model: cell tags, coordinates and pixel/cell transforms.

use super::errors::EngineError;
use std::fmt;

/// One of the four fixed player slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerId {
    P1,
    P2,
    P3,
    P4,
}

impl PlayerId {
    pub const ALL: [PlayerId; 4] = [PlayerId::P1, PlayerId::P2, PlayerId::P3, PlayerId::P4];

    /// Spawn corner for this slot on an `size`×`size` grid.
    pub fn spawn_cell(self, size: usize) -> CellCoords {
        let last = size.saturating_sub(1);
        match self {
            PlayerId::P1 => CellCoords::new(0, 0),
            PlayerId::P2 => CellCoords::new(0, last),
            PlayerId::P3 => CellCoords::new(last, 0),
            PlayerId::P4 => CellCoords::new(last, last),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerId::P1 => "P1",
            PlayerId::P2 => "P2",
            PlayerId::P3 => "P3",
            PlayerId::P4 => "P4",
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowerUpKind {
    SpeedUp,
    ExtraBomb,
    BiggerBlast,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::SpeedUp,
        PowerUpKind::ExtraBomb,
        PowerUpKind::BiggerBlast,
    ];
}

/// Occupant tag of a single grid square. Exactly one per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    WallSolid,
    WallBreakable,
    PlayerSlot(PlayerId),
    BombPresent,
    FireCore,
    FireHorizontal,
    FireVertical,
    PowerUpVisible(PowerUpKind),
}

impl Cell {
    pub fn is_fire(self) -> bool {
        matches!(
            self,
            Cell::FireCore | Cell::FireHorizontal | Cell::FireVertical
        )
    }
}

/// Pixel position of a sprite's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopLeft {
    pub top: u32,
    pub left: u32,
}

impl TopLeft {
    pub fn new(top: u32, left: u32) -> Self {
        Self { top, left }
    }
}

/// Row/column address of a grid square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoords {
    pub row: usize,
    pub col: usize,
}

impl CellCoords {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Neighbour `distance` cells away, or `None` when it would leave a `size`×`size` grid.
    pub fn offset(self, direction: Direction, distance: usize, size: usize) -> Option<Self> {
        let (row, col) = match direction {
            Direction::Up => (self.row.checked_sub(distance)?, self.col),
            Direction::Down => (self.row.checked_add(distance)?, self.col),
            Direction::Left => (self.row, self.col.checked_sub(distance)?),
            Direction::Right => (self.row, self.col.checked_add(distance)?),
        };
        (row < size && col < size).then_some(Self { row, col })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Converts a top-left pixel position into the cell it sits in.
///
/// Callers clamp positions to the grid before converting; the result is not bounds-checked.
pub fn to_cell_coordinates(position: TopLeft, cell_px: u32) -> CellCoords {
    CellCoords {
        row: (position.top / cell_px) as usize,
        col: (position.left / cell_px) as usize,
    }
}

/// Inverse of [`to_cell_coordinates`]: the top-left pixel of a cell.
pub fn to_pixel_coordinates(cell: CellCoords, cell_px: u32) -> TopLeft {
    TopLeft {
        top: cell.row as u32 * cell_px,
        left: cell.col as u32 * cell_px,
    }
}

/// Single cell write produced by a pure component and committed by the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPatch {
    pub at: CellCoords,
    pub cell: Cell,
}

impl CellPatch {
    pub fn new(at: CellCoords, cell: Cell) -> Self {
        Self { at, cell }
    }
}

/// Square grid of cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn filled(size: usize, cell: Cell) -> Self {
        Self {
            size,
            cells: vec![cell; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, at: CellCoords) -> bool {
        at.row < self.size && at.col < self.size
    }

    pub fn read_cell(&self, at: CellCoords) -> Result<Cell, EngineError> {
        if !self.contains(at) {
            return Err(EngineError::OutOfBounds {
                row: at.row,
                col: at.col,
            });
        }
        Ok(self.cells[at.row * self.size + at.col])
    }

    pub fn set_cell(&mut self, at: CellCoords, cell: Cell) -> Result<(), EngineError> {
        if !self.contains(at) {
            return Err(EngineError::OutOfBounds {
                row: at.row,
                col: at.col,
            });
        }
        self.cells[at.row * self.size + at.col] = cell;
        Ok(())
    }

    /// Applies patches in order; later patches win on the same cell.
    ///
    /// Out-of-bounds patches are skipped and returned so the caller can log them.
    pub fn apply_patches(&mut self, patches: &[CellPatch]) -> Vec<EngineError> {
        patches
            .iter()
            .filter_map(|patch| self.set_cell(patch.at, patch.cell).err())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.size.max(1))
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_and_cell_coordinates_round_trip() {
        for cell_px in [1, 32, 40] {
            for row in 0..15 {
                for col in 0..15 {
                    let cell = CellCoords::new(row, col);
                    let px = to_pixel_coordinates(cell, cell_px);
                    assert_eq!(to_cell_coordinates(px, cell_px), cell);
                }
            }
        }
    }

    #[test]
    fn positions_inside_a_cell_map_to_that_cell() {
        let at = to_cell_coordinates(TopLeft::new(79, 41), 40);
        assert_eq!(at, CellCoords::new(1, 1));
    }

    #[test]
    fn read_outside_the_grid_is_out_of_bounds() {
        let grid = Grid::filled(6, Cell::Empty);
        assert_eq!(
            grid.read_cell(CellCoords::new(6, 0)),
            Err(EngineError::OutOfBounds { row: 6, col: 0 })
        );
        assert_eq!(grid.read_cell(CellCoords::new(5, 5)), Ok(Cell::Empty));
    }

    #[test]
    fn patches_apply_in_order_and_report_out_of_bounds() {
        let mut grid = Grid::filled(6, Cell::Empty);
        let at = CellCoords::new(2, 3);
        let errors = grid.apply_patches(&[
            CellPatch::new(at, Cell::BombPresent),
            CellPatch::new(CellCoords::new(9, 9), Cell::FireCore),
            CellPatch::new(at, Cell::FireCore),
        ]);
        assert_eq!(errors, vec![EngineError::OutOfBounds { row: 9, col: 9 }]);
        assert_eq!(grid.read_cell(at), Ok(Cell::FireCore));
    }

    #[test]
    fn offset_stops_at_grid_edges() {
        let origin = CellCoords::new(0, 5);
        assert_eq!(origin.offset(Direction::Up, 1, 6), None);
        assert_eq!(origin.offset(Direction::Right, 1, 6), None);
        assert_eq!(
            origin.offset(Direction::Down, 2, 6),
            Some(CellCoords::new(2, 5))
        );
    }
}
