//! Match configuration and identities.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::{BoardSize, Piece};
use crate::types::GameMode;

/// Registry-assigned identity of a running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The other side of a two-player match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opponent {
    pub match_id: MatchId,
    pub user: String,
}

/// Everything needed to start one match.
///
/// ```
/// use std::time::Duration;
/// use chat_tetris_engine::MatchConfig;
/// use chat_tetris_types::GameMode;
///
/// let config = MatchConfig::new("lobby", "alice")
///     .with_mode(GameMode::SinglePlayer)
///     .with_start_delay(Duration::from_secs(3))
///     .with_seed(42);
/// assert_eq!(config.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Chat channel the match is presented in.
    pub channel: String,
    /// User who started the match.
    pub user: String,
    pub mode: GameMode,
    /// Gravity starts only after this delay; snapshots still flow meanwhile.
    pub start_delay: Duration,
    /// Fixed RNG seed. A seed is derived from the clock when unset.
    pub seed: Option<u32>,
    pub size: BoardSize,
    /// Pieces recorded into the history before the first spawn.
    pub preset: Vec<Piece>,
}

impl MatchConfig {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            mode: GameMode::default(),
            start_delay: Duration::ZERO,
            seed: None,
            size: BoardSize::default(),
            preset: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, size: BoardSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_preset(mut self, pieces: impl IntoIterator<Item = Piece>) -> Self {
        self.preset = pieces.into_iter().collect();
        self
    }

    /// The configured seed, or one derived from the wall clock and the match id.
    pub(crate) fn resolve_seed(&self, id: MatchId) -> u32 {
        self.seed.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or_default();
            nanos ^ (id.0 as u32).wrapping_mul(0x9E37_79B9)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::new("general", "bob");
        assert_eq!(config.mode, GameMode::Open);
        assert_eq!(config.start_delay, Duration::ZERO);
        assert_eq!(config.size, BoardSize::default());
        assert!(config.preset.is_empty());
    }

    #[test]
    fn test_fixed_seed_is_used() {
        let config = MatchConfig::new("general", "bob").with_seed(7);
        assert_eq!(config.resolve_seed(MatchId(1)), 7);
        assert_eq!(config.resolve_seed(MatchId(2)), 7);
    }
}
