// Gameplay tuning, grouped per concern.

pub mod bomb;
pub mod map;
pub mod power_up;

pub use bomb::BombTuning;
pub use map::MapTuning;
pub use power_up::PowerUpWeights;

/// Fixed inputs a game engine is constructed with.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameConfig {
    pub map: MapTuning,
    pub bomb: BombTuning,
    pub power_ups: PowerUpWeights,
}
