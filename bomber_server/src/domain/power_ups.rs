// Power-up allocation and the hidden ledger of drops not yet revealed on the grid.

use super::grid::{CellCoords, PowerUpKind};
use super::state::Player;
use super::tuning::PowerUpWeights;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Source of power-up drops for destroyed breakable walls.
pub trait PowerUpRoller: Send {
    fn roll(&mut self) -> Option<PowerUpKind>;
}

/// Weighted draw over the configured kinds plus a "no drop" outcome.
pub struct WeightedRoller<R = StdRng> {
    weights: PowerUpWeights,
    rng: R,
}

impl WeightedRoller<StdRng> {
    pub fn from_entropy(weights: PowerUpWeights) -> Self {
        Self::new(weights, StdRng::from_entropy())
    }

    pub fn seeded(weights: PowerUpWeights, seed: u64) -> Self {
        Self::new(weights, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> WeightedRoller<R> {
    pub fn new(weights: PowerUpWeights, rng: R) -> Self {
        Self { weights, rng }
    }

    /// Roller that always yields `kind`.
    pub fn always(kind: PowerUpKind, rng: R) -> Self {
        let mut weights = PowerUpWeights {
            none: 0,
            speed_up: 0,
            extra_bomb: 0,
            bigger_blast: 0,
        };
        match kind {
            PowerUpKind::SpeedUp => weights.speed_up = 1,
            PowerUpKind::ExtraBomb => weights.extra_bomb = 1,
            PowerUpKind::BiggerBlast => weights.bigger_blast = 1,
        }
        Self::new(weights, rng)
    }
}

impl<R: Rng + Send> PowerUpRoller for WeightedRoller<R> {
    fn roll(&mut self) -> Option<PowerUpKind> {
        let total = self.weights.total();
        if total == 0 {
            return None;
        }

        let mut pick = self.rng.gen_range(0..total);
        let table = [
            (None, self.weights.none),
            (Some(PowerUpKind::SpeedUp), self.weights.speed_up),
            (Some(PowerUpKind::ExtraBomb), self.weights.extra_bomb),
            (Some(PowerUpKind::BiggerBlast), self.weights.bigger_blast),
        ];
        for (outcome, weight) in table {
            if pick < weight {
                return outcome;
            }
            pick -= weight;
        }
        None
    }
}

/// Sparse row → column → drop mapping. `None` marks an entry that was already revealed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerUpLedger {
    entries: BTreeMap<usize, BTreeMap<usize, Option<PowerUpKind>>>,
}

impl PowerUpLedger {
    pub fn record(&mut self, at: CellCoords, kind: PowerUpKind) {
        self.entries
            .entry(at.row)
            .or_default()
            .insert(at.col, Some(kind));
    }

    #[cfg(test)]
    pub fn peek(&self, at: CellCoords) -> Option<PowerUpKind> {
        self.entries
            .get(&at.row)
            .and_then(|cols| cols.get(&at.col))
            .copied()
            .flatten()
    }

    /// Removes and returns the hidden drop at `at`, leaving a cleared entry behind.
    pub fn take(&mut self, at: CellCoords) -> Option<PowerUpKind> {
        self.entries
            .get_mut(&at.row)
            .and_then(|cols| cols.get_mut(&at.col))
            .and_then(Option::take)
    }
}

/// Credits `kind` to `player`.
pub fn collect(player: &mut Player, kind: PowerUpKind) {
    *player.power_ups.entry(kind).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::PlayerId;
    use crate::domain::state::SizeConfig;

    #[test]
    fn zero_total_weight_never_drops() {
        let weights = PowerUpWeights {
            none: 0,
            speed_up: 0,
            extra_bomb: 0,
            bigger_blast: 0,
        };
        let mut roller = WeightedRoller::seeded(weights, 7);
        assert!((0..50).all(|_| roller.roll().is_none()));
    }

    #[test]
    fn single_weighted_kind_always_drops() {
        let mut roller = WeightedRoller::always(PowerUpKind::ExtraBomb, StdRng::seed_from_u64(1));
        assert!((0..50).all(|_| roller.roll() == Some(PowerUpKind::ExtraBomb)));
    }

    #[test]
    fn default_weights_mostly_skip_drops() {
        let mut roller = WeightedRoller::seeded(PowerUpWeights::default(), 42);
        let drops = (0..1000).filter(|_| roller.roll().is_some()).count();
        assert!(drops > 150 && drops < 450, "drops = {drops}");
    }

    #[test]
    fn ledger_take_consumes_the_entry() {
        let mut ledger = PowerUpLedger::default();
        let at = CellCoords::new(3, 4);
        ledger.record(at, PowerUpKind::SpeedUp);
        assert_eq!(ledger.peek(at), Some(PowerUpKind::SpeedUp));
        assert_eq!(ledger.peek(CellCoords::new(4, 3)), None);

        assert_eq!(ledger.take(at), Some(PowerUpKind::SpeedUp));
        assert_eq!(ledger.take(at), None);
        assert_eq!(ledger.peek(at), None);
    }

    #[test]
    fn collect_increments_the_counter() {
        let size = SizeConfig {
            grid: 8,
            cell_px: 40,
        };
        let mut player = Player::spawn(PlayerId::P2, size);
        collect(&mut player, PowerUpKind::BiggerBlast);
        collect(&mut player, PowerUpKind::BiggerBlast);
        assert_eq!(player.power_up_count(PowerUpKind::BiggerBlast), 2);
        assert_eq!(player.power_up_count(PowerUpKind::SpeedUp), 0);
    }
}
