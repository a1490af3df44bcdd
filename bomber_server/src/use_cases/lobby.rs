// Lobby orchestration for spawning and managing game worlds.

use crate::use_cases::game::{WorldSettings, world_task};
use crate::use_cases::{GameEvent, ServerState, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Gameplay tuning handed to every new world.
    pub world: WorldSettings,
}

/// Errors returned by lobby registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum LobbyError {
    /// Lobby already exists and cannot be re-created.
    AlreadyExists,
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::AlreadyExists => write!(f, "lobby already exists"),
        }
    }
}

impl std::error::Error for LobbyError {}

/// Per-lobby channels.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Identifier clients use to target this lobby.
    pub lobby_id: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized world update.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for high-level server state changes.
    pub server_state_tx: watch::Sender<ServerState>,
    /// Stops the world task when the lobby is dropped from the registry.
    pub shutdown: Arc<Notify>,
}

struct LobbyEntry {
    handle: LobbyHandle,
    // Pinned lobbies survive their last connection leaving.
    pinned: bool,
    connections: usize,
}

/// Thread-safe registry for active lobbies.
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    /// Map of lobby id to active entry.
    lobbies: RwLock<HashMap<String, LobbyEntry>>,
}

impl LobbyRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new lobby and spawns its world task.
    pub async fn create_lobby(
        &self,
        lobby_id: String,
        pinned: bool,
    ) -> Result<LobbyHandle, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists);
        }

        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (server_state_tx, _server_state_rx) =
            watch::channel::<ServerState>(ServerState::Lobby);
        let shutdown = Arc::new(Notify::new());

        let lobby = LobbyHandle {
            lobby_id: Arc::from(lobby_id.clone()),
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            server_state_tx,
            shutdown,
        };

        tokio::spawn(world_task(
            input_rx,
            lobby.world_tx.clone(),
            lobby.server_state_tx.clone(),
            self.settings.world,
            lobby.shutdown.clone(),
        ));

        info!(lobby_id = %lobby.lobby_id, pinned, "lobby created");
        lobbies.insert(
            lobby_id,
            LobbyEntry {
                handle: lobby.clone(),
                pinned,
                connections: 0,
            },
        );
        Ok(lobby)
    }

    /// Returns a lobby handle for the provided id, if it exists.
    pub async fn get_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_id).map(|entry| entry.handle.clone())
    }

    /// Counts a live connection; `None` if the lobby no longer exists.
    pub async fn register_connection(&self, lobby_id: &str) -> Option<usize> {
        let mut lobbies = self.lobbies.write().await;
        let entry = lobbies.get_mut(lobby_id)?;
        entry.connections += 1;
        Some(entry.connections)
    }

    /// Releases a connection and drops unpinned lobbies once nobody is left.
    pub async fn unregister_connection(&self, lobby_id: &str) {
        let mut lobbies = self.lobbies.write().await;
        let Some(entry) = lobbies.get_mut(lobby_id) else {
            return;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections == 0 && !entry.pinned {
            if let Some(entry) = lobbies.remove(lobby_id) {
                entry.handle.shutdown.notify_one();
                info!(lobby_id, "lobby removed after last disconnect");
            }
        }
    }
}
