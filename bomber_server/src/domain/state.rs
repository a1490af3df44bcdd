// Domain-level entities and the immutable per-action game snapshot.

use super::explosion::BlastRays;
use super::grid::{
    CellCoords, Grid, PlayerId, PowerUpKind, TopLeft, to_cell_coordinates, to_pixel_coordinates,
};
use super::power_ups::PowerUpLedger;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Opaque, monotonically increasing bomb identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BombId(pub u64);

impl fmt::Display for BombId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bomb-{}", self.0)
    }
}

/// Handle the presentation or sync layer attaches to a player (a sprite, a connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderRef(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConfig {
    /// Cells per grid side.
    pub grid: usize,
    /// Pixels per cell side.
    pub cell_px: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub top_left: TopLeft,
    // Registry entries are alive; eliminated players are removed, not kept as dead entries.
    pub alive: bool,
    pub power_ups: BTreeMap<PowerUpKind, u32>,
    pub render_ref: Option<RenderRef>,
}

impl Player {
    /// Fresh player standing on its slot's spawn corner.
    pub fn spawn(id: PlayerId, size: SizeConfig) -> Self {
        Self {
            id,
            top_left: to_pixel_coordinates(id.spawn_cell(size.grid), size.cell_px),
            alive: true,
            power_ups: BTreeMap::new(),
            render_ref: None,
        }
    }

    pub fn cell(&self, cell_px: u32) -> CellCoords {
        to_cell_coordinates(self.top_left, cell_px)
    }

    pub fn power_up_count(&self, kind: PowerUpKind) -> u32 {
        self.power_ups.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuseState {
    Armed,
    Exploding,
    Dissipating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bomb {
    pub id: BombId,
    pub owner: PlayerId,
    pub top_left: TopLeft,
    pub explosion_size: usize,
    pub firing_duration: Duration,
    pub exploding_duration: Duration,
    pub fuse: FuseState,
    /// Rays computed at detonation; replayed when the fire clears.
    pub rays: Option<BlastRays>,
}

impl Bomb {
    pub fn cell(&self, cell_px: u32) -> CellCoords {
        to_cell_coordinates(self.top_left, cell_px)
    }
}

/// One complete, immutable instance of game state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub grid: Grid,
    pub players: BTreeMap<PlayerId, Player>,
    pub bombs: BTreeMap<BombId, Bomb>,
    pub power_ups: PowerUpLedger,
    pub is_3d: bool,
    pub is_side_view: bool,
    pub size: SizeConfig,
    // Bumped when the renderer should replay tile animations.
    pub animation_counter: u64,
    pub next_bomb_id: u64,
}

impl GameSnapshot {
    pub fn new(grid: Grid, cell_px: u32) -> Self {
        let size = SizeConfig {
            grid: grid.size(),
            cell_px,
        };
        Self {
            grid,
            players: BTreeMap::new(),
            bombs: BTreeMap::new(),
            power_ups: PowerUpLedger::default(),
            is_3d: false,
            is_side_view: false,
            size,
            animation_counter: 0,
            next_bomb_id: 1,
        }
    }

    /// Lowest slot id that is neither in play nor `reserved`.
    pub fn lowest_free_slot(&self, reserved: impl Fn(PlayerId) -> bool) -> Option<PlayerId> {
        PlayerId::ALL
            .into_iter()
            .find(|id| !self.players.contains_key(id) && !reserved(*id))
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.values().filter(|p| p.alive)
    }

    pub fn armed_bombs_owned_by(&self, owner: PlayerId) -> usize {
        self.bombs
            .values()
            .filter(|b| b.owner == owner && b.fuse == FuseState::Armed)
            .count()
    }

    /// Armed bomb sitting on `cell`, if any.
    pub fn armed_bomb_at(&self, cell: CellCoords) -> Option<&Bomb> {
        self.bombs
            .values()
            .find(|b| b.fuse == FuseState::Armed && b.cell(self.size.cell_px) == cell)
    }
}
