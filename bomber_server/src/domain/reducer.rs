// The game state machine: one action in, one snapshot out.
//
// The reducer never mutates the snapshot it is given. It clones it into `next`, applies explicit
// patches, and either returns the whole transition or an error, in which case the caller keeps
// the previous snapshot.

use super::actions::{FollowUp, GameAction, ScheduledTimer, TimerToken, Transition};
use super::errors::{EngineError, StaleRef};
use super::explosion::{BlastPhase, apply_blast, compute_blast, place_bomb};
use super::grid::{Cell, PlayerId, PowerUpKind, to_cell_coordinates};
use super::movement::{MoveOutcome, resolve_move};
use super::power_ups::{PowerUpRoller, collect};
use super::state::{BombId, FuseState, GameSnapshot, Player};
use super::tuning::BombTuning;
use tracing::{debug, info, warn};

/// Inputs the reducer needs beyond the snapshot itself.
pub struct ReduceContext<'a> {
    pub bomb: &'a BombTuning,
    pub roller: &'a mut dyn PowerUpRoller,
}

pub fn reduce(
    snapshot: &GameSnapshot,
    action: GameAction,
    ctx: &mut ReduceContext<'_>,
) -> Result<Transition, EngineError> {
    let mut next = snapshot.clone();
    let mut follow_ups = Vec::new();
    let cell_px = snapshot.size.cell_px;

    match action {
        GameAction::StartGame => {
            next.players
                .insert(PlayerId::P1, Player::spawn(PlayerId::P1, next.size));
        }
        GameAction::SetState(state) => {
            next = *state;
        }
        GameAction::SetMap { grid, animate } => {
            next.size.grid = grid.size();
            next.grid = grid;
            if animate {
                next.animation_counter += 1;
            }
        }
        GameAction::TriggerAnimation => {
            next.animation_counter += 1;
        }
        GameAction::SetPlayerRef { player, render_ref } => {
            let entry = next
                .players
                .get_mut(&player)
                .ok_or(EngineError::StaleReference(StaleRef::Player(player)))?;
            entry.render_ref = Some(render_ref);
            next.grid
                .set_cell(entry.cell(cell_px), Cell::PlayerSlot(player))?;
        }
        GameAction::RequestMove { player, direction } => {
            let entry = snapshot
                .players
                .get(&player)
                .ok_or(EngineError::StaleReference(StaleRef::Player(player)))?;
            if let MoveOutcome::Moved { to, .. } =
                resolve_move(entry, direction, &snapshot.grid, cell_px, snapshot.is_3d)
            {
                follow_ups.push(FollowUp::Dispatch(GameAction::CommitMove { player, to }));
            }
        }
        GameAction::CommitMove { player, to } => {
            let entry = next
                .players
                .get_mut(&player)
                .ok_or(EngineError::StaleReference(StaleRef::Player(player)))?;
            let last = entry.cell(cell_px);
            let dest = to_cell_coordinates(to, cell_px);
            let occupant = next.grid.read_cell(dest)?;

            // The last cell may hold a bomb dropped by this player; only our own tag is cleared.
            if next.grid.read_cell(last) == Ok(Cell::PlayerSlot(player)) {
                next.grid.set_cell(last, Cell::Empty)?;
            }
            if let Cell::PowerUpVisible(kind) = occupant {
                collect(entry, kind);
                info!(player_id = %player, ?kind, "power-up collected");
            }
            next.grid.set_cell(dest, Cell::PlayerSlot(player))?;
            entry.top_left = to;
        }
        GameAction::DropBomb { player } => {
            let owner = next
                .players
                .get(&player)
                .ok_or(EngineError::InvalidActionForState {
                    action: "drop_bomb",
                    reason: "player is not in the game",
                })?;
            let cell = owner.cell(cell_px);
            if next.armed_bomb_at(cell).is_some() {
                return Err(EngineError::InvalidActionForState {
                    action: "drop_bomb",
                    reason: "cell already holds a bomb",
                });
            }
            let capacity =
                ctx.bomb.base_capacity + owner.power_up_count(PowerUpKind::ExtraBomb) as usize;
            if next.armed_bombs_owned_by(player) >= capacity {
                return Err(EngineError::InvalidActionForState {
                    action: "drop_bomb",
                    reason: "bomb capacity reached",
                });
            }

            let id = BombId(next.next_bomb_id);
            let (bomb, patch) = place_bomb(owner, id, ctx.bomb, cell_px);
            next.grid.set_cell(patch.at, patch.cell)?;
            next.next_bomb_id += 1;
            follow_ups.push(FollowUp::Schedule(ScheduledTimer {
                after: bomb.firing_duration,
                token: TimerToken::Fuse(id),
            }));
            info!(
                bomb_id = %id,
                player_id = %player,
                row = cell.row,
                col = cell.col,
                explosion_size = bomb.explosion_size,
                "bomb placed"
            );
            next.bombs.insert(id, bomb);
        }
        GameAction::RemoveBomb { bomb } => {
            next.bombs
                .remove(&bomb)
                .ok_or(EngineError::StaleReference(StaleRef::Bomb(bomb)))?;
        }
        GameAction::TriggerExplosion { bomb } => {
            let current = next
                .bombs
                .get_mut(&bomb)
                .filter(|b| b.fuse == FuseState::Armed)
                .ok_or(EngineError::StaleReference(StaleRef::Bomb(bomb)))?;
            current.fuse = FuseState::Exploding;
            let origin = current.cell(cell_px);
            let blast = compute_blast(
                &snapshot.grid,
                &snapshot.players,
                cell_px,
                origin,
                current.explosion_size,
                BlastPhase::Detonation,
            );
            let effects = apply_blast(
                &snapshot.grid,
                &snapshot.players,
                cell_px,
                &blast,
                &mut *ctx.roller,
            );

            current.rays = Some(blast.rays);
            current.fuse = FuseState::Dissipating;
            follow_ups.push(FollowUp::Schedule(ScheduledTimer {
                after: current.exploding_duration,
                token: TimerToken::Fire(bomb),
            }));

            for (at, kind) in effects.drops {
                debug!(row = at.row, col = at.col, ?kind, "power-up hidden under fire");
                next.power_ups.record(at, kind);
            }
            for err in next.grid.apply_patches(&effects.patches) {
                warn!(error = %err, bomb_id = %bomb, "blast patch skipped");
            }
            for id in effects.eliminated {
                let Some(gone) = next.players.remove(&id) else {
                    continue;
                };
                // A caught player standing on another live bomb must not erase it.
                let cell = gone.cell(cell_px);
                if next.armed_bomb_at(cell).is_some() {
                    next.grid.set_cell(cell, Cell::BombPresent)?;
                }
                info!(player_id = %id, bomb_id = %bomb, "player eliminated");
            }
            info!(bomb_id = %bomb, row = origin.row, col = origin.col, "bomb exploded");
        }
        GameAction::ExplosionComplete { bomb } => {
            let removed = next
                .bombs
                .remove(&bomb)
                .ok_or(EngineError::StaleReference(StaleRef::Bomb(bomb)))?;
            if removed.fuse == FuseState::Armed {
                return Err(EngineError::InvalidActionForState {
                    action: "explosion_complete",
                    reason: "bomb has not exploded",
                });
            }

            let rays = match removed.rays {
                Some(rays) => rays,
                None => {
                    compute_blast(
                        &snapshot.grid,
                        &snapshot.players,
                        cell_px,
                        removed.cell(cell_px),
                        removed.explosion_size,
                        BlastPhase::Clear,
                    )
                    .rays
                }
            };

            for at in rays.cells() {
                match next.grid.read_cell(at) {
                    Ok(cell) if cell.is_fire() => {}
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(error = %err, bomb_id = %bomb, "fire clear skipped");
                        continue;
                    }
                }
                let cleared = if next.armed_bomb_at(at).is_some() {
                    Cell::BombPresent
                } else if let Some(kind) = next.power_ups.take(at) {
                    Cell::PowerUpVisible(kind)
                } else {
                    Cell::Empty
                };
                next.grid.set_cell(at, cleared)?;
            }
            debug!(bomb_id = %bomb, "fire cleared");
        }
        GameAction::ToggleDimension => {
            next.is_3d = !next.is_3d;
        }
        GameAction::TogglePerspective => {
            next.is_side_view = !next.is_side_view;
        }
        GameAction::ToggleTwoPlayer => toggle_slot(&mut next, PlayerId::P2),
        GameAction::ToggleNpc => toggle_slot(&mut next, PlayerId::P4),
        GameAction::AddPlayer { player } => {
            if next.players.contains_key(&player) {
                return Err(EngineError::InvalidActionForState {
                    action: "add_player",
                    reason: "slot already taken",
                });
            }
            next.players.insert(player, Player::spawn(player, next.size));
        }
        GameAction::RemovePlayer { player } => {
            let gone = next
                .players
                .remove(&player)
                .ok_or(EngineError::StaleReference(StaleRef::Player(player)))?;
            // A departed player's own tag would block others forever.
            let cell = gone.cell(cell_px);
            if next.grid.read_cell(cell) == Ok(Cell::PlayerSlot(player)) {
                next.grid.set_cell(cell, Cell::Empty)?;
            }
        }
    }

    Ok(Transition {
        snapshot: next,
        follow_ups,
    })
}

// Two-player and NPC toggles add or drop the whole entity; the grid is left exactly as it is.
fn toggle_slot(next: &mut GameSnapshot, slot: PlayerId) {
    if next.players.remove(&slot).is_none() {
        next.players.insert(slot, Player::spawn(slot, next.size));
    }
}
