// Movement resolution: one cell per step, walls/bombs/fire/other players block.

use super::grid::{Cell, Direction, Grid, PowerUpKind, TopLeft, to_cell_coordinates};
use super::state::Player;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// New top-left position and the power-up lying on the destination, if any.
    Moved {
        to: TopLeft,
        collected: Option<PowerUpKind>,
    },
    /// The move has no effect; this is a valid result, not an error.
    Blocked,
}

/// Computes where `player` ends up after one step in `direction`.
///
/// `is_3d` is cosmetic: the perspective changes how the board is drawn, never what blocks a move.
pub fn resolve_move(
    player: &Player,
    direction: Direction,
    grid: &Grid,
    cell_px: u32,
    is_3d: bool,
) -> MoveOutcome {
    let TopLeft { top, left } = player.top_left;
    let candidate = match direction {
        Direction::Up => top.checked_sub(cell_px).map(|top| TopLeft { top, left }),
        Direction::Down => top.checked_add(cell_px).map(|top| TopLeft { top, left }),
        Direction::Left => left.checked_sub(cell_px).map(|left| TopLeft { top, left }),
        Direction::Right => left.checked_add(cell_px).map(|left| TopLeft { top, left }),
    };
    let Some(candidate) = candidate else {
        return MoveOutcome::Blocked;
    };

    let target = to_cell_coordinates(candidate, cell_px);
    let Ok(occupant) = grid.read_cell(target) else {
        // Leaving the arena.
        return MoveOutcome::Blocked;
    };

    let outcome = match occupant {
        Cell::Empty => MoveOutcome::Moved {
            to: candidate,
            collected: None,
        },
        Cell::PowerUpVisible(kind) => MoveOutcome::Moved {
            to: candidate,
            collected: Some(kind),
        },
        Cell::PlayerSlot(id) if id == player.id => MoveOutcome::Moved {
            to: candidate,
            collected: None,
        },
        Cell::WallSolid
        | Cell::WallBreakable
        | Cell::PlayerSlot(_)
        | Cell::BombPresent
        | Cell::FireCore
        | Cell::FireHorizontal
        | Cell::FireVertical => MoveOutcome::Blocked,
    };

    trace!(
        player_id = %player.id,
        ?direction,
        is_3d,
        row = target.row,
        col = target.col,
        ?outcome,
        "move resolved"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{CellCoords, PlayerId, to_pixel_coordinates};
    use crate::domain::state::SizeConfig;

    const PX: u32 = 40;

    fn player_at(id: PlayerId, row: usize, col: usize) -> Player {
        let mut player = Player::spawn(
            id,
            SizeConfig {
                grid: 8,
                cell_px: PX,
            },
        );
        player.top_left = to_pixel_coordinates(CellCoords::new(row, col), PX);
        player
    }

    fn grid_with(at: CellCoords, cell: Cell) -> Grid {
        let mut grid = Grid::filled(8, Cell::Empty);
        grid.set_cell(at, cell).expect("in bounds");
        grid
    }

    #[test]
    fn walls_bombs_and_fire_block_in_both_perspectives() {
        let player = player_at(PlayerId::P1, 3, 3);
        for cell in [
            Cell::WallSolid,
            Cell::WallBreakable,
            Cell::BombPresent,
            Cell::FireCore,
            Cell::FireVertical,
            Cell::PlayerSlot(PlayerId::P2),
        ] {
            let grid = grid_with(CellCoords::new(3, 4), cell);
            for is_3d in [false, true] {
                assert_eq!(
                    resolve_move(&player, Direction::Right, &grid, PX, is_3d),
                    MoveOutcome::Blocked,
                    "{cell:?} should block"
                );
            }
        }
    }

    #[test]
    fn empty_cells_accept_a_one_cell_step() {
        let player = player_at(PlayerId::P1, 3, 3);
        let grid = Grid::filled(8, Cell::Empty);
        assert_eq!(
            resolve_move(&player, Direction::Up, &grid, PX, false),
            MoveOutcome::Moved {
                to: TopLeft::new(2 * PX, 3 * PX),
                collected: None
            }
        );
    }

    #[test]
    fn power_ups_are_reported_for_collection() {
        let player = player_at(PlayerId::P3, 3, 3);
        let grid = grid_with(
            CellCoords::new(4, 3),
            Cell::PowerUpVisible(PowerUpKind::SpeedUp),
        );
        assert_eq!(
            resolve_move(&player, Direction::Down, &grid, PX, false),
            MoveOutcome::Moved {
                to: TopLeft::new(4 * PX, 3 * PX),
                collected: Some(PowerUpKind::SpeedUp)
            }
        );
    }

    #[test]
    fn own_slot_tag_does_not_block() {
        let player = player_at(PlayerId::P2, 3, 3);
        let grid = grid_with(CellCoords::new(3, 2), Cell::PlayerSlot(PlayerId::P2));
        assert!(matches!(
            resolve_move(&player, Direction::Left, &grid, PX, false),
            MoveOutcome::Moved { .. }
        ));
    }

    #[test]
    fn grid_edges_block() {
        let grid = Grid::filled(8, Cell::Empty);
        let corner = player_at(PlayerId::P1, 0, 0);
        assert_eq!(
            resolve_move(&corner, Direction::Up, &grid, PX, false),
            MoveOutcome::Blocked
        );
        assert_eq!(
            resolve_move(&corner, Direction::Left, &grid, PX, false),
            MoveOutcome::Blocked
        );
        let far = player_at(PlayerId::P4, 7, 7);
        assert_eq!(
            resolve_move(&far, Direction::Down, &grid, PX, false),
            MoveOutcome::Blocked
        );
        assert_eq!(
            resolve_move(&far, Direction::Right, &grid, PX, false),
            MoveOutcome::Blocked
        );
    }
}
