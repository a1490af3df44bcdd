// Use-case level inputs/outputs for the lobby world loop.

use crate::domain::{GameAction, GameSnapshot, PlayerId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum GameEvent {
    /// A connection asks for a player slot; the world answers on `reply`.
    Join {
        conn_id: u64,
        reply: oneshot::Sender<Result<PlayerId, JoinError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    /// Regenerates the arena and starts a match with everyone in the lobby.
    Start,
    Action(GameAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    GameFull,
    MatchInProgress,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::GameFull => write!(f, "game is full"),
            JoinError::MatchInProgress => write!(f, "match already running"),
        }
    }
}

impl std::error::Error for JoinError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerState {
    Lobby,
    MatchRunning,
    /// `winner` is `None` when nobody survived.
    MatchEnded { winner: Option<PlayerId> },
}

/// One published snapshot; `version` increases with every accepted change.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub version: u64,
    pub snapshot: Arc<GameSnapshot>,
}
