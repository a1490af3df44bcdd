use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Active lobbies and their world tasks.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Lobby used when a socket does not name one.
    pub default_lobby_id: Arc<str>,
}
