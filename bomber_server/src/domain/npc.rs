// Computer-controlled player: a random walker that drops a bomb next to breakable walls.

use super::actions::GameAction;
use super::grid::{Cell, Direction, PlayerId};
use super::movement::{MoveOutcome, resolve_move};
use super::state::GameSnapshot;
use rand::Rng;
use rand::seq::SliceRandom;

/// Slot the NPC toggle occupies.
pub const NPC_SLOT: PlayerId = PlayerId::P4;

/// Picks the next action for `npc`, or `None` when it has nothing useful to do.
pub fn choose_intent<R: Rng + ?Sized>(
    snapshot: &GameSnapshot,
    npc: PlayerId,
    rng: &mut R,
) -> Option<GameAction> {
    let player = snapshot.players.get(&npc)?;
    let cell_px = snapshot.size.cell_px;
    let here = player.cell(cell_px);

    let near_wall = Direction::ALL
        .into_iter()
        .filter_map(|dir| here.offset(dir, 1, snapshot.grid.size()))
        .any(|n| snapshot.grid.read_cell(n) == Ok(Cell::WallBreakable));
    if near_wall && snapshot.armed_bombs_owned_by(npc) == 0 && rng.gen_bool(0.25) {
        return Some(GameAction::DropBomb { player: npc });
    }

    let open: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| {
            matches!(
                resolve_move(player, *dir, &snapshot.grid, cell_px, snapshot.is_3d),
                MoveOutcome::Moved { .. }
            )
        })
        .collect();
    let direction = *open.choose(rng)?;
    Some(GameAction::RequestMove {
        player: npc,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{CellCoords, Grid};
    use crate::domain::state::Player;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn snapshot_with_npc(grid: Grid) -> GameSnapshot {
        let mut snapshot = GameSnapshot::new(grid, 40);
        snapshot
            .players
            .insert(NPC_SLOT, Player::spawn(NPC_SLOT, snapshot.size));
        snapshot
    }

    #[test]
    fn absent_npc_does_nothing() {
        let snapshot = GameSnapshot::new(Grid::filled(8, Cell::Empty), 40);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_intent(&snapshot, NPC_SLOT, &mut rng), None);
    }

    #[test]
    fn boxed_in_npc_without_walls_stays_put() {
        let mut grid = Grid::filled(8, Cell::Empty);
        grid.set_cell(CellCoords::new(6, 7), Cell::WallSolid)
            .expect("in bounds");
        grid.set_cell(CellCoords::new(7, 6), Cell::WallSolid)
            .expect("in bounds");
        let snapshot = snapshot_with_npc(grid);
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(choose_intent(&snapshot, NPC_SLOT, &mut rng), None);
    }

    #[test]
    fn walker_only_picks_open_directions() {
        let mut grid = Grid::filled(8, Cell::Empty);
        grid.set_cell(CellCoords::new(6, 7), Cell::WallSolid)
            .expect("in bounds");
        let snapshot = snapshot_with_npc(grid);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(
                choose_intent(&snapshot, NPC_SLOT, &mut rng),
                Some(GameAction::RequestMove {
                    player: NPC_SLOT,
                    direction: Direction::Left,
                })
            );
        }
    }

    #[test]
    fn npc_next_to_breakable_wall_eventually_bombs() {
        let mut grid = Grid::filled(8, Cell::Empty);
        grid.set_cell(CellCoords::new(6, 7), Cell::WallBreakable)
            .expect("in bounds");
        let snapshot = snapshot_with_npc(grid);
        let bombed = (0..64).any(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            choose_intent(&snapshot, NPC_SLOT, &mut rng)
                == Some(GameAction::DropBomb { player: NPC_SLOT })
        });
        assert!(bombed);
    }
}
