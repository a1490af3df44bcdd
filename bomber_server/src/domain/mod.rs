// Pure game rules: grid model, movement, explosions, power-ups and the state machine.

pub mod actions;
pub mod errors;
pub mod explosion;
pub mod grid;
pub mod map_gen;
pub mod movement;
pub mod npc;
pub mod power_ups;
pub mod reducer;
pub mod state;
pub mod tuning;

pub use actions::{FollowUp, GameAction, ScheduledTimer, TimerToken, Transition};
pub use errors::{EngineError, StaleRef};
pub use grid::{Cell, CellCoords, Direction, Grid, PlayerId, PowerUpKind, TopLeft};
pub use power_ups::{PowerUpLedger, PowerUpRoller, WeightedRoller};
pub use reducer::{ReduceContext, reduce};
pub use state::{Bomb, BombId, FuseState, GameSnapshot, Player, RenderRef, SizeConfig};
pub use tuning::GameConfig;
