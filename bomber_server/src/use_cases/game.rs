// Lobby world loop: the single writer of game state.
//
// Every input (joins, client intents, timer expiries, NPC ticks) is handled one at a time on this
// task, so actions are totally ordered and each accepted change is published as one snapshot.

use super::engine::{DispatchReport, GameEngine};
use super::schedule::TimerQueue;
use super::types::{GameEvent, JoinError, ServerState, WorldUpdate};
use crate::domain::npc::NPC_SLOT;
use crate::domain::{GameAction, GameConfig, GameSnapshot, PlayerId, RenderRef};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    pub game: GameConfig,
    /// How often the computer-controlled player acts.
    pub npc_interval: Duration,
}

pub async fn world_task(
    input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    server_state_tx: watch::Sender<ServerState>,
    settings: WorldSettings,
    shutdown: Arc<Notify>,
) {
    let engine = GameEngine::new(settings.game);
    run_world(
        engine,
        input_rx,
        world_tx,
        server_state_tx,
        settings.npc_interval,
        shutdown,
    )
    .await;
}

/// Drives `engine` until shutdown or until every input sender is gone.
pub async fn run_world(
    engine: GameEngine,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    server_state_tx: watch::Sender<ServerState>,
    npc_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut world = World::new(engine, world_tx, server_state_tx);
    world.publish();

    let mut npc_tick = tokio::time::interval(npc_interval);
    npc_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let deadline = world.timers.next_deadline();
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the lobby is removed.
                break;
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("input channel closed; world exiting");
                    break;
                };
                world.handle_event(event);
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                world.fire_due_timers();
            }
            _ = npc_tick.tick() => {
                world.drive_npc();
            }
        }

        world.check_match_end();
        world.publish_if_changed();
    }
}

struct World {
    engine: GameEngine,
    timers: TimerQueue,
    // Connected humans by slot; the value is the connection id used as the render reference.
    roster: BTreeMap<PlayerId, u64>,
    state: ServerState,
    started_with: usize,
    version: u64,
    published: Arc<GameSnapshot>,
    world_tx: broadcast::Sender<WorldUpdate>,
    server_state_tx: watch::Sender<ServerState>,
}

impl World {
    fn new(
        engine: GameEngine,
        world_tx: broadcast::Sender<WorldUpdate>,
        server_state_tx: watch::Sender<ServerState>,
    ) -> Self {
        let published = Arc::clone(engine.snapshot());
        Self {
            engine,
            timers: TimerQueue::new(),
            roster: BTreeMap::new(),
            state: ServerState::Lobby,
            started_with: 0,
            version: 0,
            published,
            world_tx,
            server_state_tx,
        }
    }

    fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Join { conn_id, reply } => {
                let result = self.join(conn_id);
                if let Ok(player_id) = result {
                    if reply.send(result).is_err() {
                        // The connection went away while waiting; release the slot again.
                        self.leave(player_id);
                    }
                } else {
                    let _ = reply.send(result);
                }
            }
            GameEvent::Leave { player_id } => self.leave(player_id),
            GameEvent::Start => self.start_match(),
            GameEvent::Action(action) => self.apply_client_action(action),
        }
    }

    fn join(&mut self, conn_id: u64) -> Result<PlayerId, JoinError> {
        if self.state == ServerState::MatchRunning {
            return Err(JoinError::MatchInProgress);
        }
        let slot = self
            .engine
            .snapshot()
            .lowest_free_slot(|id| self.roster.contains_key(&id))
            .ok_or(JoinError::GameFull)?;

        let report = self.engine.dispatch(GameAction::AddPlayer { player: slot });
        self.arm(report);
        self.roster.insert(slot, conn_id);
        info!(player_id = %slot, conn_id, "player joined");
        Ok(slot)
    }

    fn leave(&mut self, player_id: PlayerId) {
        if self.roster.remove(&player_id).is_none() {
            return;
        }
        if self.engine.snapshot().players.contains_key(&player_id) {
            let report = self
                .engine
                .dispatch(GameAction::RemovePlayer { player: player_id });
            self.arm(report);
        }
        info!(player_id = %player_id, "player left");

        if self.roster.is_empty() && self.state != ServerState::Lobby {
            self.set_state(ServerState::Lobby);
        }
    }

    fn start_match(&mut self) {
        if self.state == ServerState::MatchRunning {
            debug!("start ignored; match already running");
            return;
        }

        // Only connected players and the NPC are seated; nothing else survives the reset.
        let mut lineup: Vec<(PlayerId, RenderRef)> = self
            .roster
            .iter()
            .map(|(id, conn_id)| (*id, RenderRef(*conn_id)))
            .collect();
        if self.npc_enabled() {
            lineup.push((NPC_SLOT, RenderRef(0)));
        }
        if lineup.is_empty() {
            warn!("start ignored; nobody in the lobby");
            return;
        }

        let report = self.engine.start_match(&lineup);
        self.arm(report);
        self.started_with = lineup.len();
        info!(players = lineup.len(), "match started");
        self.set_state(ServerState::MatchRunning);
    }

    fn apply_client_action(&mut self, action: GameAction) {
        let allowed = match &action {
            GameAction::RequestMove { .. } | GameAction::DropBomb { .. } => {
                self.state == ServerState::MatchRunning
            }
            GameAction::ToggleNpc => {
                self.state != ServerState::MatchRunning && !self.roster.contains_key(&NPC_SLOT)
            }
            GameAction::ToggleDimension | GameAction::TogglePerspective => true,
            // Remote players take P2 by joining; everything else is engine-internal.
            _ => false,
        };
        if !allowed {
            debug!(action = action.name(), state = ?self.state, "action not allowed now");
            return;
        }
        let report = self.engine.dispatch(action);
        self.arm(report);
    }

    fn fire_due_timers(&mut self) {
        for token in self.timers.pop_due(Instant::now()) {
            let report = self.engine.dispatch(token.into_action());
            self.arm(report);
        }
    }

    fn drive_npc(&mut self) {
        if self.state != ServerState::MatchRunning || !self.npc_enabled() {
            return;
        }
        if let Some(action) = self.engine.npc_intent() {
            let report = self.engine.dispatch(action);
            self.arm(report);
        }
    }

    fn npc_enabled(&self) -> bool {
        !self.roster.contains_key(&NPC_SLOT)
            && self.engine.snapshot().players.contains_key(&NPC_SLOT)
    }

    fn arm(&mut self, report: DispatchReport) {
        let now = Instant::now();
        for timer in report.timers {
            self.timers.schedule(now, timer);
        }
    }

    fn check_match_end(&mut self) {
        if self.state != ServerState::MatchRunning {
            return;
        }
        let snapshot = self.engine.snapshot();
        let alive: Vec<PlayerId> = snapshot.alive_players().map(|p| p.id).collect();
        let over = alive.is_empty() || (self.started_with >= 2 && alive.len() <= 1);
        if !over {
            return;
        }
        let winner = alive.first().copied();
        info!(winner = ?winner, "match ended");
        self.set_state(ServerState::MatchEnded { winner });
    }

    fn set_state(&mut self, state: ServerState) {
        self.state = state.clone();
        // Keep the latest value even when nobody is subscribed yet.
        self.server_state_tx.send_replace(state);
    }

    fn publish_if_changed(&mut self) {
        if !Arc::ptr_eq(&self.published, self.engine.snapshot()) {
            self.version += 1;
            self.publish();
        }
    }

    fn publish(&mut self) {
        self.published = Arc::clone(self.engine.snapshot());
        let _ = self.world_tx.send(WorldUpdate {
            version: self.version,
            snapshot: Arc::clone(&self.published),
        });
    }
}
