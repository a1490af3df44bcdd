use crate::domain::{GameAction, PlayerId};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, SnapshotDto};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_conn_id;
use crate::use_cases::{GameEvent, LobbyHandle, LobbyRegistry, ServerState, WorldUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    ServerStateClosed,
    JoinRequired,
    JoinTimeout,
    JoinRejected,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct LobbyQuery {
    // The lobby id the client wants to join.
    #[serde(default)]
    lobby_id: Option<String>,
}

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each snapshot once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::Snapshot(SnapshotDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize snapshot");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Keep the latest bytes for late joiners and lag recovery.
                world_latest_tx.send_replace(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "snapshot serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_lobby_serializer(lobby: &LobbyHandle) {
    tokio::spawn(world_update_serializer(
        lobby.world_tx.subscribe(),
        lobby.world_bytes_tx.clone(),
        lobby.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> impl IntoResponse {
    let lobby_id = query
        .lobby_id
        .unwrap_or_else(|| state.default_lobby_id.to_string());

    let Some(lobby) = state.lobby_registry.get_lobby(&lobby_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "lobby not found".to_string(),
            }),
        )
            .into_response();
    };

    let lobby_registry = state.lobby_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, lobby, lobby_registry))
}

async fn handle_socket(mut socket: WebSocket, lobby: LobbyHandle, lobby_registry: Arc<LobbyRegistry>) {
    // Connection id correlates logs before a slot exists and doubles as the render reference.
    let conn_id = next_conn_id();
    let span = info_span!(
        "conn",
        conn_id,
        lobby_id = %lobby.lobby_id,
        player_id = tracing::field::Empty
    );
    serve_connection(&mut socket, &lobby, &lobby_registry, conn_id)
        .instrument(span)
        .await;
}

async fn serve_connection(
    socket: &mut WebSocket,
    lobby: &LobbyHandle,
    lobby_registry: &LobbyRegistry,
    conn_id: u64,
) {
    if lobby_registry
        .register_connection(&lobby.lobby_id)
        .await
        .is_none()
    {
        warn!("lobby missing during connection registration");
        let _ = send_close_with_reason(socket, close_code::POLICY, "lobby unavailable").await;
        return;
    }

    match bootstrap_connection(socket, lobby, conn_id).await {
        Ok(mut ctx) => {
            Span::current().record("player_id", ctx.player_id.as_str());
            info!(display_name = %ctx.display_name, "client connected");
            if let Err(e) = run_client_loop(socket, &mut ctx).await {
                warn!(error = ?e, "client loop exited with error");
            }
            // Release the slot even when the loop ended on an error.
            if lobby
                .input_tx
                .send(GameEvent::Leave {
                    player_id: ctx.player_id,
                })
                .await
                .is_err()
            {
                debug!("world already stopped during disconnect");
            }
            info!(
                msgs_in = ctx.msgs_in,
                msgs_out = ctx.msgs_out,
                bytes_in = ctx.bytes_in,
                bytes_out = ctx.bytes_out,
                lag_recoveries = ctx.lag_recovery_count,
                "client disconnected"
            );
        }
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
        }
        Err(NetError::JoinRejected) => {
            info!("join rejected");
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = send_close_with_reason(socket, close_code::POLICY, "bootstrap failed").await;
        }
    }

    lobby_registry.unregister_connection(&lobby.lobby_id).await;
}

struct ConnCtx {
    player_id: PlayerId,
    display_name: String,
    input_tx: mpsc::Sender<GameEvent>,
    world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    server_state_rx: watch::Receiver<ServerState>,
    // Count lag recovery snapshots sent to this client.
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_world_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    lobby: &LobbyHandle,
    conn_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe before any await so no snapshot published after the join is missed.
    let world_bytes_rx = lobby.world_bytes_tx.subscribe();
    let world_latest_rx = lobby.world_latest_tx.subscribe();
    let server_state_rx = lobby.server_state_tx.subscribe();

    let display_name = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Ask the world for a slot; it answers once the player exists in the registry.
    let (reply, reply_rx) = oneshot::channel();
    lobby
        .input_tx
        .send(GameEvent::Join { conn_id, reply })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let player_id = match reply_rx.await.map_err(|_| NetError::InputClosed)? {
        Ok(player_id) => player_id,
        Err(reason) => {
            let _ = send_message(
                socket,
                &ServerMessage::Rejected {
                    reason: reason.to_string(),
                },
            )
            .await;
            let _ = send_close_with_reason(socket, close_code::POLICY, "join rejected").await;
            return Err(NetError::JoinRejected);
        }
    };

    let mut msgs_out = 0;
    let mut bytes_out = 0;
    let initial_state = server_state_rx.borrow().clone();
    let greeting = [
        ServerMessage::Identity {
            player_id: player_id.to_string(),
        },
        ServerMessage::GameState(initial_state.into()),
    ];
    for msg in greeting {
        match send_message(socket, &msg).await {
            Ok(bytes) => {
                msgs_out += 1;
                bytes_out += bytes as u64;
            }
            Err(e) => {
                // Compensate the join so the slot is not held by a dead connection.
                let _ = lobby.input_tx.send(GameEvent::Leave { player_id }).await;
                return Err(e);
            }
        }
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        display_name,
        input_tx: lobby.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        lag_recovery_count: 0,

        msgs_in: 1,
        msgs_out,
        bytes_in: 0,
        bytes_out,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<String, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        match incoming.map_err(NetError::Ws)? {
            Message::Text(text) => {
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) | Err(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                };
                let name: String = payload
                    .display_name
                    .trim()
                    .chars()
                    .take(MAX_DISPLAY_NAME_LEN)
                    .collect();
                return Ok(name);
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Maps a post-join client message onto the event the world task understands.
fn client_event(player_id: PlayerId, msg: ClientMessage) -> Option<GameEvent> {
    let event = match msg {
        ClientMessage::Join(_) => return None,
        ClientMessage::Move { direction } => GameEvent::Action(GameAction::RequestMove {
            player: player_id,
            direction: direction.into(),
        }),
        ClientMessage::DropBomb => GameEvent::Action(GameAction::DropBomb { player: player_id }),
        ClientMessage::Start => GameEvent::Start,
        ClientMessage::ToggleNpc => GameEvent::Action(GameAction::ToggleNpc),
        ClientMessage::ToggleDimension => GameEvent::Action(GameAction::ToggleDimension),
        ClientMessage::TogglePerspective => GameEvent::Action(GameAction::TogglePerspective),
    };
    Some(event)
}

fn forward_event(
    player_id: PlayerId,
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(player_id = %player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Late joiners get the current board right away.
    let latest = ctx.world_latest_rx.borrow().clone();
    if !latest.is_empty() {
        if let LoopControl::Disconnect =
            forward_world_bytes(latest, socket, &mut ctx.msgs_out, &mut ctx.bytes_out).await
        {
            return Ok(());
        }
    }

    let player_id = ctx.player_id;
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        world_bytes_rx,
        world_latest_rx,
        server_state_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_world_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => matches!(
                        forward_world_bytes(bytes, socket, msgs_out, bytes_out).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "snapshots lagged; sending latest");
                        }
                        // Snapshots are complete, so the newest one is a full resync.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            matches!(
                                forward_world_bytes(latest, socket, msgs_out, bytes_out).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            changed_state = server_state_rx.changed() => {
                match changed_state {
                    Ok(()) => {
                        let st = server_state_rx.borrow_and_update().clone();
                        let msg = ServerMessage::GameState(st.into());
                        match send_message(socket, &msg).await {
                            Ok(bytes) => {
                                *msgs_out += 1;
                                *bytes_out += bytes as u64;
                                false
                            }
                            Err(err) => {
                                warn!(error = ?err, "failed to send server state");
                                true
                            }
                        }
                    }
                    Err(_) => {
                        warn!("server state channel closed; disconnecting");
                        fatal = Some(NetError::ServerStateClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: PlayerId,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => match client_event(player_id, msg) {
                        Some(event) => {
                            forward_event(player_id, input_tx, event, last_input_full_log)
                        }
                        None => {
                            // Repeated Join packets keep the existing slot.
                            if should_log(last_invalid_input_log) {
                                warn!(player_id = %player_id, "duplicate join ignored");
                            }
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id = %player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id = %player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id = %player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket.send(Message::Text(world_msg)).await {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}
