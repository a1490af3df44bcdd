// Randomized arena generation.

use super::grid::{Cell, CellCoords, Direction, Grid, PlayerId};
use super::tuning::MapTuning;
use rand::Rng;

/// Produces a fresh arena.
///
/// Solid walls sit on cells whose row and column are both odd, which keeps every even row and
/// column a corridor. Each spawn corner and its orthogonal neighbours are left empty; every other
/// free cell becomes a breakable wall with probability `tuning.breakable_density`.
pub fn generate<R: Rng + ?Sized>(tuning: &MapTuning, rng: &mut R) -> Grid {
    let size = tuning
        .grid_size
        .clamp(MapTuning::MIN_GRID_SIZE, MapTuning::MAX_GRID_SIZE);
    let density = tuning.breakable_density.clamp(0.0, 1.0);
    let reserved = reserved_cells(size);

    let mut grid = Grid::filled(size, Cell::Empty);
    for row in 0..size {
        for col in 0..size {
            let at = CellCoords::new(row, col);
            if reserved.contains(&at) {
                continue;
            }
            let cell = if row % 2 == 1 && col % 2 == 1 {
                Cell::WallSolid
            } else if rng.gen_bool(density) {
                Cell::WallBreakable
            } else {
                continue;
            };
            // Coordinates come from the loop bounds, so the write cannot fail.
            let _ = grid.set_cell(at, cell);
        }
    }
    grid
}

/// Spawn corners plus their in-grid orthogonal neighbours.
pub fn reserved_cells(size: usize) -> Vec<CellCoords> {
    let mut cells = Vec::with_capacity(12);
    for id in PlayerId::ALL {
        let corner = id.spawn_cell(size);
        cells.push(corner);
        cells.extend(
            Direction::ALL
                .into_iter()
                .filter_map(|dir| corner.offset(dir, 1, size)),
        );
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tuning(grid_size: usize, breakable_density: f64) -> MapTuning {
        MapTuning {
            grid_size,
            breakable_density,
            ..MapTuning::default()
        }
    }

    #[test]
    fn spawn_corners_always_have_an_empty_neighbour() {
        for seed in 0..20 {
            for size in MapTuning::MIN_GRID_SIZE..=MapTuning::MAX_GRID_SIZE {
                let mut rng = StdRng::seed_from_u64(seed);
                let grid = generate(&tuning(size, 1.0), &mut rng);
                for id in PlayerId::ALL {
                    let corner = id.spawn_cell(size);
                    assert_eq!(grid.read_cell(corner), Ok(Cell::Empty));
                    let open = Direction::ALL
                        .into_iter()
                        .filter_map(|dir| corner.offset(dir, 1, size))
                        .any(|n| grid.read_cell(n) == Ok(Cell::Empty));
                    assert!(open, "corner {corner:?} boxed in on size {size}");
                }
            }
        }
    }

    #[test]
    fn solid_walls_follow_odd_parity() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = generate(&tuning(11, 0.5), &mut rng);
        for (row, cells) in grid.rows().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let odd = row % 2 == 1 && col % 2 == 1;
                assert_eq!(*cell == Cell::WallSolid, odd, "({row}, {col})");
            }
        }
    }

    #[test]
    fn zero_density_leaves_only_solid_walls() {
        let mut rng = StdRng::seed_from_u64(9);
        let grid = generate(&tuning(7, 0.0), &mut rng);
        assert_eq!(grid.count(Cell::WallBreakable), 0);
        assert_eq!(grid.count(Cell::WallSolid), 9);
    }

    #[test]
    fn out_of_range_sizes_are_clamped() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(generate(&tuning(3, 0.5), &mut rng).size(), 6);
        assert_eq!(generate(&tuning(40, 0.5), &mut rng).size(), 15);
    }
}
