// Domain-level errors for engine operations. None of them are fatal: the engine keeps the
// current snapshot whenever one is returned.

use super::grid::PlayerId;
use super::state::BombId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleRef {
    Bomb(BombId),
    Player(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    OutOfBounds { row: usize, col: usize },
    // A timer or event pointing at an entity that no longer exists.
    StaleReference(StaleRef),
    InvalidActionForState {
        action: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::OutOfBounds { row, col } => {
                write!(f, "cell ({row}, {col}) is outside the grid")
            }
            EngineError::StaleReference(StaleRef::Bomb(id)) => {
                write!(f, "bomb {id} no longer exists")
            }
            EngineError::StaleReference(StaleRef::Player(id)) => {
                write!(f, "player {id} no longer exists")
            }
            EngineError::InvalidActionForState { action, reason } => {
                write!(f, "{action} rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}
