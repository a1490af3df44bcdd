// Closed action vocabulary of the game state machine and the follow-ups it emits.

use super::grid::{Direction, Grid, PlayerId, TopLeft};
use super::state::{BombId, GameSnapshot, RenderRef};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum GameAction {
    /// Puts P1 on its spawn corner.
    StartGame,
    /// Replaces the whole snapshot (mirrored remote state, match reset).
    SetState(Box<GameSnapshot>),
    SetMap {
        grid: Grid,
        animate: bool,
    },
    TriggerAnimation,
    /// Attaches a backing reference and stamps the player onto the grid.
    SetPlayerRef {
        player: PlayerId,
        render_ref: RenderRef,
    },
    /// Validates a step; a successful resolution follows up with `CommitMove`.
    RequestMove {
        player: PlayerId,
        direction: Direction,
    },
    CommitMove {
        player: PlayerId,
        to: TopLeft,
    },
    DropBomb {
        player: PlayerId,
    },
    RemoveBomb {
        bomb: BombId,
    },
    TriggerExplosion {
        bomb: BombId,
    },
    ExplosionComplete {
        bomb: BombId,
    },
    ToggleDimension,
    TogglePerspective,
    ToggleTwoPlayer,
    ToggleNpc,
    AddPlayer {
        player: PlayerId,
    },
    RemovePlayer {
        player: PlayerId,
    },
}

impl GameAction {
    pub fn name(&self) -> &'static str {
        match self {
            GameAction::StartGame => "start_game",
            GameAction::SetState(_) => "set_state",
            GameAction::SetMap { .. } => "set_map",
            GameAction::TriggerAnimation => "trigger_animation",
            GameAction::SetPlayerRef { .. } => "set_player_ref",
            GameAction::RequestMove { .. } => "request_move",
            GameAction::CommitMove { .. } => "commit_move",
            GameAction::DropBomb { .. } => "drop_bomb",
            GameAction::RemoveBomb { .. } => "remove_bomb",
            GameAction::TriggerExplosion { .. } => "trigger_explosion",
            GameAction::ExplosionComplete { .. } => "explosion_complete",
            GameAction::ToggleDimension => "toggle_dimension",
            GameAction::TogglePerspective => "toggle_perspective",
            GameAction::ToggleTwoPlayer => "toggle_two_player",
            GameAction::ToggleNpc => "toggle_npc",
            GameAction::AddPlayer { .. } => "add_player",
            GameAction::RemovePlayer { .. } => "remove_player",
        }
    }
}

/// Scheduled-event token. Each one fires once and turns into exactly one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerToken {
    Fuse(BombId),
    Fire(BombId),
}

impl TimerToken {
    pub fn into_action(self) -> GameAction {
        match self {
            TimerToken::Fuse(bomb) => GameAction::TriggerExplosion { bomb },
            TimerToken::Fire(bomb) => GameAction::ExplosionComplete { bomb },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub after: Duration,
    pub token: TimerToken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Applied right after the current action, before anything else is processed.
    Dispatch(GameAction),
    Schedule(ScheduledTimer),
}

/// Result of applying one action: the next snapshot plus what has to happen next.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub snapshot: GameSnapshot,
    pub follow_ups: Vec<FollowUp>,
}
