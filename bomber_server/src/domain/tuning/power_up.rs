/// Relative weights for the power-up draw made when a breakable wall is destroyed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerUpWeights {
    pub none: u32,
    pub speed_up: u32,
    pub extra_bomb: u32,
    pub bigger_blast: u32,
}

impl PowerUpWeights {
    pub fn total(&self) -> u32 {
        self.none + self.speed_up + self.extra_bomb + self.bigger_blast
    }
}

impl Default for PowerUpWeights {
    fn default() -> Self {
        // "No drop" dominates so pickups stay rare.
        Self {
            none: 70,
            speed_up: 10,
            extra_bomb: 10,
            bigger_blast: 10,
        }
    }
}
