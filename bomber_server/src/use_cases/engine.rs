// Serial driver around the reducer: applies an action and its immediate follow-ups in order.

use crate::domain::map_gen;
use crate::domain::npc;
use crate::domain::{
    EngineError, FollowUp, GameAction, GameConfig, GameSnapshot, Player, PlayerId, PowerUpRoller,
    ReduceContext, RenderRef, ScheduledTimer, WeightedRoller, reduce,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a dispatch produced besides the new snapshot.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchReport {
    /// Timers the caller has to arm, in emission order.
    pub timers: Vec<ScheduledTimer>,
    /// Actions that were rejected; each left the snapshot untouched.
    pub errors: Vec<EngineError>,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.timers.extend(other.timers);
        self.errors.extend(other.errors);
    }
}

pub struct GameEngine {
    snapshot: Arc<GameSnapshot>,
    config: GameConfig,
    roller: Box<dyn PowerUpRoller>,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Self {
        Self::with_parts(
            config,
            Box::new(WeightedRoller::from_entropy(config.power_ups)),
            StdRng::from_entropy(),
        )
    }

    /// Builds an engine with an injected drop roller and map rng.
    pub fn with_parts(config: GameConfig, roller: Box<dyn PowerUpRoller>, mut rng: StdRng) -> Self {
        let grid = map_gen::generate(&config.map, &mut rng);
        Self {
            snapshot: Arc::new(GameSnapshot::new(grid, config.map.cell_px)),
            config,
            roller,
            rng,
        }
    }

    pub fn snapshot(&self) -> &Arc<GameSnapshot> {
        &self.snapshot
    }

    /// Applies `action`, then every `Dispatch` follow-up it chains, before returning.
    ///
    /// A rejected action leaves the current snapshot in place. Stale lifecycle events are
    /// expected (a bomb removed by a match reset still has timers in flight) and only logged at
    /// debug level.
    pub fn dispatch(&mut self, action: GameAction) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut queue = VecDeque::from([action]);

        while let Some(action) = queue.pop_front() {
            let name = action.name();
            let mut ctx = ReduceContext {
                bomb: &self.config.bomb,
                roller: self.roller.as_mut(),
            };
            match reduce(&self.snapshot, action, &mut ctx) {
                Ok(transition) => {
                    if transition.snapshot != *self.snapshot {
                        self.snapshot = Arc::new(transition.snapshot);
                    }
                    for follow_up in transition.follow_ups {
                        match follow_up {
                            FollowUp::Dispatch(next) => queue.push_back(next),
                            FollowUp::Schedule(timer) => report.timers.push(timer),
                        }
                    }
                }
                Err(err @ EngineError::StaleReference(_)) => {
                    debug!(action = name, error = %err, "stale action ignored");
                    report.errors.push(err);
                }
                Err(err) => {
                    warn!(action = name, error = %err, "action rejected");
                    report.errors.push(err);
                }
            }
        }
        report
    }

    /// Generates a new arena and installs it through `SetMap`.
    pub fn regenerate_map(&mut self, animate: bool) -> DispatchReport {
        let grid = map_gen::generate(&self.config.map, &mut self.rng);
        self.dispatch(GameAction::SetMap { grid, animate })
    }

    /// Resets the board for a new match with `roster` on their spawn corners.
    ///
    /// Bomb ids keep counting from the previous match so timers still in flight for old bombs
    /// resolve as stale instead of hitting new ones.
    pub fn start_match(&mut self, roster: &[(PlayerId, RenderRef)]) -> DispatchReport {
        let grid = map_gen::generate(&self.config.map, &mut self.rng);
        let mut fresh = GameSnapshot::new(grid, self.config.map.cell_px);
        fresh.is_3d = self.snapshot.is_3d;
        fresh.is_side_view = self.snapshot.is_side_view;
        fresh.animation_counter = self.snapshot.animation_counter + 1;
        fresh.next_bomb_id = self.snapshot.next_bomb_id;
        for (id, _) in roster {
            fresh.players.insert(*id, Player::spawn(*id, fresh.size));
        }

        let mut report = self.dispatch(GameAction::SetState(Box::new(fresh)));
        for (player, render_ref) in roster {
            report.merge(self.dispatch(GameAction::SetPlayerRef {
                player: *player,
                render_ref: *render_ref,
            }));
        }
        report
    }

    /// Next move for the computer-controlled slot, if it is in play.
    pub fn npc_intent(&mut self) -> Option<GameAction> {
        npc::choose_intent(&self.snapshot, npc::NPC_SLOT, &mut self.rng)
    }
}
