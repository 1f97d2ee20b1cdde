//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings shared by every replica of a room.
///
/// Peers that disagree on the timing values still converge, but
/// migration and eviction get slower or noisier, so every client should
/// use the same config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Capacity. Advisory: the transport cannot refuse a subscriber.
    pub max_players: usize,

    /// How often the host heartbeats and followers check for a silent host.
    pub heartbeat_interval: Duration,

    /// Silence after which a host is presumed gone, or a peer is evicted.
    pub heartbeat_timeout: Duration,

    /// Minimum gap between two accepted chat sends.
    pub chat_throttle: Duration,

    /// Chat history length.
    pub max_chat_messages: usize,

    /// Random delay added to the first host-alive check.
    pub host_check_jitter: Duration,

    /// How long a "waiting for one number" announcement stays visible.
    pub announcement_ttl: Duration,

    /// Capacity of the command channel between handles and the actor.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 20,
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(25),
            chat_throttle: Duration::from_secs(2),
            max_chat_messages: 50,
            host_check_jitter: Duration::from_millis(500),
            announcement_ttl: Duration::from_secs(5),
            command_buffer: 64,
        }
    }
}

impl RoomConfig {
    /// Shortest accepted heartbeat interval.
    pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

    /// Clamps out-of-range values so the config is safe to run with.
    ///
    /// - `max_players`, `max_chat_messages`, `command_buffer` at least 1.
    /// - `heartbeat_interval` at least [`Self::MIN_HEARTBEAT_INTERVAL`].
    /// - `heartbeat_timeout` strictly longer than the interval; otherwise
    ///   two and a half intervals.
    /// - `host_check_jitter` at most one interval.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            warn!("max_players is 0, clamping to 1");
            self.max_players = 1;
        }
        if self.max_chat_messages == 0 {
            warn!("max_chat_messages is 0, clamping to 1");
            self.max_chat_messages = 1;
        }
        if self.command_buffer == 0 {
            warn!("command_buffer is 0, clamping to 1");
            self.command_buffer = 1;
        }
        if self.heartbeat_interval < Self::MIN_HEARTBEAT_INTERVAL {
            warn!(
                interval = ?self.heartbeat_interval,
                min = ?Self::MIN_HEARTBEAT_INTERVAL,
                "heartbeat_interval too short, clamping"
            );
            self.heartbeat_interval = Self::MIN_HEARTBEAT_INTERVAL;
        }
        if self.heartbeat_timeout <= self.heartbeat_interval {
            let timeout = self.heartbeat_interval * 5 / 2;
            warn!(
                timeout = ?self.heartbeat_timeout,
                interval = ?self.heartbeat_interval,
                new_timeout = ?timeout,
                "heartbeat_timeout must exceed heartbeat_interval, adjusting"
            );
            self.heartbeat_timeout = timeout;
        }
        if self.host_check_jitter > self.heartbeat_interval {
            warn!(jitter = ?self.host_check_jitter, "host_check_jitter exceeds interval, clamping");
            self.host_check_jitter = self.heartbeat_interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default_matches_room_rules() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 20);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(25));
        assert_eq!(config.chat_throttle, Duration::from_secs(2));
        assert_eq!(config.max_chat_messages, 50);
    }

    #[test]
    fn test_validated_default_unchanged() {
        assert_eq!(RoomConfig::default().validated(), RoomConfig::default());
    }

    #[test]
    fn test_validated_timeout_not_above_interval_adjusted() {
        let config = RoomConfig {
            heartbeat_interval: Duration::from_secs(4),
            heartbeat_timeout: Duration::from_secs(4),
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validated_zero_sizes_clamped() {
        let config = RoomConfig {
            max_players: 0,
            max_chat_messages: 0,
            command_buffer: 0,
            heartbeat_interval: Duration::ZERO,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.max_players, 1);
        assert_eq!(config.max_chat_messages, 1);
        assert_eq!(config.command_buffer, 1);
        assert_eq!(config.heartbeat_interval, RoomConfig::MIN_HEARTBEAT_INTERVAL);
        assert!(config.host_check_jitter <= config.heartbeat_interval);
    }

    #[test]
    fn test_room_config_serde_round_trip() {
        let config = RoomConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RoomConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
