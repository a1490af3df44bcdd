use std::time::Duration;

/// Gameplay tuning for bombs.
#[derive(Debug, Clone, Copy)]
pub struct BombTuning {
    /// Blast radius in cells before power-ups.
    pub explosion_size: usize,

    /// Fuse length between placement and detonation.
    pub firing_duration: Duration,

    /// How long fire stays on the grid after detonation.
    pub exploding_duration: Duration,

    /// Armed bombs a player may own at once before extra-bomb pickups.
    pub base_capacity: usize,
}

impl Default for BombTuning {
    fn default() -> Self {
        Self {
            explosion_size: 2,
            firing_duration: Duration::from_millis(3000),
            exploding_duration: Duration::from_millis(1000),
            base_capacity: 1,
        }
    }
}
