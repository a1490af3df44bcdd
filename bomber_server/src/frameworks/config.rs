use crate::domain::GameConfig;
use std::{env, str::FromStr, time::Duration};

// Runtime/server settings read from the environment (after `.env` is loaded).

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const DEFAULT_LOBBY_ID: &str = "local";

pub fn http_port() -> u16 {
    env_or("BOMBER_SERVER_PORT", 3001)
}

/// Gameplay tuning with environment overrides applied on top of the defaults.
pub fn game_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.map = config
        .map
        .with_grid_size(env_or("BOMBER_GRID_SIZE", config.map.grid_size));
    config.bomb.explosion_size = env_or("BOMBER_EXPLOSION_SIZE", config.bomb.explosion_size);
    config.bomb.firing_duration = millis_or("BOMBER_FIRING_MS", config.bomb.firing_duration);
    config.bomb.exploding_duration =
        millis_or("BOMBER_EXPLODING_MS", config.bomb.exploding_duration);
    config
}

pub fn npc_interval() -> Duration {
    millis_or("BOMBER_NPC_INTERVAL_MS", Duration::from_millis(400))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env::var(key).ok().as_deref(), default)
}

fn millis_or(key: &str, default: Duration) -> Duration {
    let millis = env_or(key, default.as_millis() as u64);
    // A zero interval would make `tokio::time::interval` panic.
    Duration::from_millis(millis.max(1))
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_missing_or_bad_values() {
        assert_eq!(parse_or::<u16>(None, 3001), 3001);
        assert_eq!(parse_or::<u16>(Some(" 4000 "), 3001), 4000);
        assert_eq!(parse_or::<u16>(Some("not-a-port"), 3001), 3001);
        assert_eq!(parse_or::<usize>(Some("-3"), 2), 2);
    }

    #[test]
    fn defaults_match_tuning() {
        // Assumes the test environment does not set the BOMBER_* overrides.
        let config = game_config();
        assert_eq!(config.map.grid_size, 11);
        assert_eq!(config.bomb.explosion_size, 2);
        assert_eq!(config.bomb.firing_duration, Duration::from_millis(3000));
        assert_eq!(config.bomb.exploding_duration, Duration::from_millis(1000));
        assert_eq!(npc_interval(), Duration::from_millis(400));
    }
}
