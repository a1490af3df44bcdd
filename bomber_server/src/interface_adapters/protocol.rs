// Wire protocol DTOs and conversions for public game server messages.
// Internal service-to-service DTOs should live outside this module.

use crate::domain::{Bomb, Cell, Direction, FuseState, GameSnapshot, Player, PowerUpKind};
use crate::use_cases::{ServerState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned slot for the connection after Join is accepted.
    Identity { player_id: String },
    // Join refused (lobby full, match running).
    Rejected { reason: String },
    // Full game snapshot at a given version.
    Snapshot(SnapshotDto),
    // High-level server state transitions (lobby, match running/ended).
    GameState(ServerStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message.
    Join(JoinPayload),
    Move { direction: DirectionDto },
    DropBomb,
    Start,
    ToggleNpc,
    ToggleDimension,
    TogglePerspective,
}

/// Payload for the Join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    Up,
    Right,
    Down,
    Left,
}

impl From<DirectionDto> for Direction {
    fn from(direction: DirectionDto) -> Self {
        match direction {
            DirectionDto::Up => Direction::Up,
            DirectionDto::Right => Direction::Right,
            DirectionDto::Down => Direction::Down,
            DirectionDto::Left => Direction::Left,
        }
    }
}

/// Snapshot sent to clients whenever the game state changes.
///
/// The hidden power-up ledger is never serialized; drops only become visible on the grid.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub version: u64,
    pub grid_size: usize,
    pub cell_px: u32,
    pub is_3d: bool,
    pub is_side_view: bool,
    pub animation_counter: u64,
    pub grid: Vec<Vec<CellDto>>,
    pub players: Vec<PlayerDto>,
    pub bombs: Vec<BombDto>,
}

impl From<WorldUpdate> for SnapshotDto {
    fn from(update: WorldUpdate) -> Self {
        Self::from_snapshot(update.version, &update.snapshot)
    }
}

impl SnapshotDto {
    pub fn from_snapshot(version: u64, snapshot: &GameSnapshot) -> Self {
        Self {
            version,
            grid_size: snapshot.size.grid,
            cell_px: snapshot.size.cell_px,
            is_3d: snapshot.is_3d,
            is_side_view: snapshot.is_side_view,
            animation_counter: snapshot.animation_counter,
            grid: snapshot
                .grid
                .rows()
                .map(|row| row.iter().copied().map(CellDto::from).collect())
                .collect(),
            players: snapshot.players.values().map(PlayerDto::from).collect(),
            bombs: snapshot.bombs.values().map(BombDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellDto {
    Empty,
    WallSolid,
    WallBreakable,
    Player(&'static str),
    Bomb,
    FireCore,
    FireHorizontal,
    FireVertical,
    PowerUp(&'static str),
}

fn power_up_name(kind: PowerUpKind) -> &'static str {
    match kind {
        PowerUpKind::SpeedUp => "speed_up",
        PowerUpKind::ExtraBomb => "extra_bomb",
        PowerUpKind::BiggerBlast => "bigger_blast",
    }
}

impl From<Cell> for CellDto {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => CellDto::Empty,
            Cell::WallSolid => CellDto::WallSolid,
            Cell::WallBreakable => CellDto::WallBreakable,
            Cell::PlayerSlot(id) => CellDto::Player(id.as_str()),
            Cell::BombPresent => CellDto::Bomb,
            Cell::FireCore => CellDto::FireCore,
            Cell::FireHorizontal => CellDto::FireHorizontal,
            Cell::FireVertical => CellDto::FireVertical,
            Cell::PowerUpVisible(kind) => CellDto::PowerUp(power_up_name(kind)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub top: u32,
    pub left: u32,
    pub speed_up: u32,
    pub extra_bomb: u32,
    pub bigger_blast: u32,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.to_string(),
            top: player.top_left.top,
            left: player.top_left.left,
            speed_up: player.power_up_count(PowerUpKind::SpeedUp),
            extra_bomb: player.power_up_count(PowerUpKind::ExtraBomb),
            bigger_blast: player.power_up_count(PowerUpKind::BiggerBlast),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BombDto {
    pub id: u64,
    pub owner: String,
    pub top: u32,
    pub left: u32,
    pub explosion_size: usize,
    pub exploding: bool,
}

impl From<&Bomb> for BombDto {
    fn from(bomb: &Bomb) -> Self {
        Self {
            id: bomb.id.0,
            owner: bomb.owner.to_string(),
            top: bomb.top_left.top,
            left: bomb.top_left.left,
            explosion_size: bomb.explosion_size,
            exploding: bomb.fuse != FuseState::Armed,
        }
    }
}

/// Server lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum ServerStateDto {
    Lobby,
    MatchRunning,
    MatchEnded { winner: Option<String> },
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Lobby => ServerStateDto::Lobby,
            ServerState::MatchRunning => ServerStateDto::MatchRunning,
            ServerState::MatchEnded { winner } => ServerStateDto::MatchEnded {
                winner: winner.map(|id| id.to_string()),
            },
        }
    }
}
