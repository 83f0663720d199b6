#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawning system responsible for emitting token spawn commands.
//!
//! Spawning is a self-rescheduling loop rather than a fixed-rate timer: each
//! attempt reports the jittered delay until the next one, and an attempt that
//! finds the field full is skipped without breaking the chain.

use std::time::Duration;

use flower_rush_core::{Bounds, Catalog, Command, DifficultyConfig, FieldPosition, SessionState};
use rand::{seq::SliceRandom, Rng};

const DEFAULT_POSITION_PERCENT: Bounds = Bounds::new(10, 90);
const DEFAULT_SIZE_HINT: Bounds = Bounds::new(26, 35);

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    position_percent: Bounds,
    size_hint: Bounds,
}

impl Config {
    /// Creates a new configuration using the provided placement and size ranges.
    #[must_use]
    pub const fn new(position_percent: Bounds, size_hint: Bounds) -> Self {
        Self {
            position_percent,
            size_hint,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION_PERCENT, DEFAULT_SIZE_HINT)
    }
}

/// Outcome of a single spawn attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// A spawn command was emitted.
    Spawned,
    /// The field already held the maximum number of live tokens.
    Skipped,
}

/// Pure system that decides when and what to spawn while a session is playing.
#[derive(Debug)]
pub struct Spawning {
    position_percent: Bounds,
    size_hint: Bounds,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            position_percent: config.position_percent,
            size_hint: config.size_hint,
        }
    }

    /// Draws the delay before the next spawn attempt.
    #[must_use]
    pub fn next_delay<R: Rng + ?Sized>(
        &self,
        difficulty: &DifficultyConfig,
        rng: &mut R,
    ) -> Duration {
        Duration::from_millis(u64::from(difficulty.spawn_interval_ms.sample(rng)))
    }

    /// Runs one spawn attempt.
    ///
    /// Returns `None` when the session is not playing, signalling that the
    /// loop must stop. Otherwise a spawn command is pushed unless the field is
    /// full, and the attempt outcome is returned together with the delay
    /// until the next attempt. The flower kind is drawn from the whole
    /// catalog, not only from the current order.
    pub fn handle<R: Rng + ?Sized>(
        &self,
        state: SessionState,
        live_tokens: usize,
        difficulty: &DifficultyConfig,
        catalog: &Catalog,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) -> Option<(Attempt, Duration)> {
        if state != SessionState::Playing {
            return None;
        }

        let max_active = usize::try_from(difficulty.max_active).unwrap_or(usize::MAX);
        let attempt = match catalog.kinds().choose(rng) {
            Some(kind) if live_tokens < max_active => {
                let position =
                    FieldPosition::new(self.sample_percent(rng), self.sample_percent(rng));
                let size = u8::try_from(self.size_hint.sample(rng)).unwrap_or(u8::MAX);
                let ttl = Duration::from_millis(u64::from(difficulty.token_ttl_ms.sample(rng)));
                out.push(Command::SpawnToken {
                    kind: kind.id().clone(),
                    position,
                    size,
                    ttl,
                });
                Attempt::Spawned
            }
            _ => Attempt::Skipped,
        };

        Some((attempt, self.next_delay(difficulty, rng)))
    }

    fn sample_percent<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        u8::try_from(self.position_percent.sample(rng).min(100)).unwrap_or(100)
    }
}

impl Default for Spawning {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn stops_outside_playing_state() {
        let spawning = Spawning::new(Config::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut commands = Vec::new();

        for state in [SessionState::Menu, SessionState::Finished] {
            let outcome = spawning.handle(
                state,
                0,
                &DifficultyConfig::easy(),
                &Catalog::default(),
                &mut rng,
                &mut commands,
            );
            assert_eq!(outcome, None);
        }
        assert!(commands.is_empty());
    }
}
