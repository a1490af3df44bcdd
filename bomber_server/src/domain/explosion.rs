// Bomb placement and blast geometry.
//
// `compute_blast` is pure over the grid it is given. The state machine stores the rays on the bomb
// at detonation so the clear phase replays exactly the cells that were set on fire, even when the
// grid has changed in between (walls broken, overlapping blasts).

use super::grid::{
    Cell, CellCoords, CellPatch, Direction, Grid, PlayerId, PowerUpKind, to_pixel_coordinates,
};
use super::power_ups::PowerUpRoller;
use super::state::{Bomb, BombId, FuseState, Player};
use super::tuning::BombTuning;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlastPhase {
    /// Fuse expired: set cells on fire and catch players.
    Detonation,
    /// Fire clearing: geometry only, nobody is caught.
    Clear,
}

/// Cells touched by one explosion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastRays {
    pub core: CellCoords,
    pub horizontal: Vec<CellCoords>,
    pub vertical: Vec<CellCoords>,
}

impl BlastRays {
    /// Core first, then horizontal arms, then vertical arms.
    pub fn cells(&self) -> impl Iterator<Item = CellCoords> + '_ {
        std::iter::once(self.core)
            .chain(self.horizontal.iter().copied())
            .chain(self.vertical.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blast {
    pub rays: BlastRays,
    pub players_caught: Vec<PlayerId>,
}

/// Grid writes, hidden drops and eliminations caused by a detonation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlastEffects {
    pub patches: Vec<CellPatch>,
    pub drops: Vec<(CellCoords, PowerUpKind)>,
    pub eliminated: Vec<PlayerId>,
}

/// Creates an armed bomb on the owner's cell and the patch marking that cell.
pub fn place_bomb(
    owner: &Player,
    id: BombId,
    tuning: &BombTuning,
    cell_px: u32,
) -> (Bomb, CellPatch) {
    let cell = owner.cell(cell_px);
    let bigger_blast = owner.power_up_count(PowerUpKind::BiggerBlast) as usize;
    let bomb = Bomb {
        id,
        owner: owner.id,
        top_left: to_pixel_coordinates(cell, cell_px),
        explosion_size: tuning.explosion_size + bigger_blast,
        firing_duration: tuning.firing_duration,
        exploding_duration: tuning.exploding_duration,
        fuse: FuseState::Armed,
        rays: None,
    };
    (bomb, CellPatch::new(cell, Cell::BombPresent))
}

/// Casts four arms of up to `explosion_size` cells from `origin`.
///
/// Solid walls stop an arm and are excluded; a breakable wall is the arm's last cell. The grid
/// edge also stops an arm. The origin is always part of the blast as its core.
pub fn compute_blast(
    grid: &Grid,
    players: &BTreeMap<PlayerId, Player>,
    cell_px: u32,
    origin: CellCoords,
    explosion_size: usize,
    phase: BlastPhase,
) -> Blast {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for direction in [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ] {
        let arm = if direction.is_horizontal() {
            &mut horizontal
        } else {
            &mut vertical
        };
        for distance in 1..=explosion_size {
            let Some(at) = origin.offset(direction, distance, grid.size()) else {
                break;
            };
            match grid.read_cell(at) {
                Ok(Cell::WallSolid) | Err(_) => break,
                Ok(Cell::WallBreakable) => {
                    arm.push(at);
                    break;
                }
                Ok(_) => arm.push(at),
            }
        }
    }

    let rays = BlastRays {
        core: origin,
        horizontal,
        vertical,
    };
    let players_caught = match phase {
        BlastPhase::Detonation => players
            .values()
            .filter(|p| p.alive)
            .filter(|p| {
                let cell = p.cell(cell_px);
                rays.cells().any(|at| at == cell)
            })
            .map(|p| p.id)
            .collect(),
        BlastPhase::Clear => Vec::new(),
    };

    Blast {
        rays,
        players_caught,
    }
}

/// Turns a computed blast into grid patches, ledger drops and eliminations.
///
/// Breakable walls roll the allocator before the fire tag overwrites them. Caught players'
/// cells end up `Empty`.
pub fn apply_blast(
    grid: &Grid,
    players: &BTreeMap<PlayerId, Player>,
    cell_px: u32,
    blast: &Blast,
    roller: &mut dyn PowerUpRoller,
) -> BlastEffects {
    let mut effects = BlastEffects::default();
    let arms = blast
        .rays
        .horizontal
        .iter()
        .map(|at| (*at, Cell::FireHorizontal))
        .chain(blast.rays.vertical.iter().map(|at| (*at, Cell::FireVertical)));

    for (at, fire) in arms {
        if grid.read_cell(at) == Ok(Cell::WallBreakable) {
            if let Some(kind) = roller.roll() {
                effects.drops.push((at, kind));
            }
        }
        effects.patches.push(CellPatch::new(at, fire));
    }
    effects
        .patches
        .push(CellPatch::new(blast.rays.core, Cell::FireCore));

    for id in &blast.players_caught {
        if let Some(player) = players.get(id) {
            effects
                .patches
                .push(CellPatch::new(player.cell(cell_px), Cell::Empty));
            effects.eliminated.push(*id);
        }
    }
    effects
}
