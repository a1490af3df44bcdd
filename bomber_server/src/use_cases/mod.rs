// Use cases layer: application workflows for the game server.

pub mod engine;
pub mod game;
pub mod lobby;
pub mod schedule;
pub mod types;

pub use engine::{DispatchReport, GameEngine};
pub use lobby::{LobbyError, LobbyHandle, LobbyRegistry, LobbySettings};
pub use types::{GameEvent, JoinError, ServerState, WorldUpdate};
