//! Difficulty tiers and the parameter bundles attached to them.

use std::{fmt, str::FromStr, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Named difficulty tier a session can be started with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyKey {
    /// Long clock, small orders.
    #[default]
    Easy,
    /// Medium clock, four-line orders.
    Medium,
    /// Short clock, orders spanning the whole catalog.
    Hard,
}

impl DifficultyKey {
    /// Every tier in ascending difficulty.
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Parses a key, falling back to the default tier when it is not recognised.
    ///
    /// The second element reports whether the fallback was taken.
    #[must_use]
    pub fn parse_or_default(value: &str) -> (Self, bool) {
        match value.parse() {
            Ok(key) => (key, false),
            Err(_) => (Self::default(), true),
        }
    }

    /// Lowercase name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a difficulty key is not one of the known tiers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty `{0}`")]
pub struct UnknownDifficulty(String);

impl FromStr for DifficultyKey {
    type Err = UnknownDifficulty;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(UnknownDifficulty(value.to_owned())),
        }
    }
}

/// Inclusive range of whole numbers a value is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest value that may be drawn.
    pub min: u32,
    /// Largest value that may be drawn.
    pub max: u32,
}

impl Bounds {
    /// Creates an inclusive range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Range containing a single value.
    #[must_use]
    pub const fn exactly(value: u32) -> Self {
        Self::new(value, value)
    }

    /// Reports whether `value` lies within the range.
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        self.min <= value && value <= self.max
    }

    /// Reports whether `min` does not exceed `max`.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// Draws a value uniformly from the range.
    ///
    /// An inverted range is sampled as if its ends were swapped.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let low = self.min.min(self.max);
        let high = self.min.max(self.max);
        rng.gen_range(low..=high)
    }

    /// Clamps both ends of the range to at most `limit`.
    #[must_use]
    pub fn clamped_to(&self, limit: u32) -> Self {
        Self::new(self.min.min(limit), self.max.min(limit))
    }
}

/// Immutable parameter bundle selected when a session starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifficultyConfig {
    /// Session length in seconds.
    pub duration_secs: u32,
    /// Delay between spawn attempts, in milliseconds.
    pub spawn_interval_ms: Bounds,
    /// Lifetime of a token that is never activated, in milliseconds.
    pub token_ttl_ms: Bounds,
    /// Upper bound on simultaneously live tokens.
    pub max_active: u32,
    /// Number of distinct flower kinds in an order.
    pub order_items: Bounds,
    /// Quantity required per order line.
    pub item_quantity: Bounds,
    /// Seconds removed from the clock on every miss.
    pub miss_penalty_secs: u32,
    /// Points added on a hit.
    pub hit_points: u32,
    /// Points removed on a miss; the score never drops below zero.
    pub miss_points: u32,
    /// Flat bonus added to the final score.
    pub difficulty_bonus: u32,
}

impl DifficultyConfig {
    /// Parameters for the easy tier.
    #[must_use]
    pub const fn easy() -> Self {
        Self {
            duration_secs: 40,
            spawn_interval_ms: Bounds::new(650, 950),
            token_ttl_ms: Bounds::new(1_800, 2_600),
            max_active: 6,
            order_items: Bounds::exactly(3),
            item_quantity: Bounds::new(1, 3),
            miss_penalty_secs: 2,
            hit_points: 10,
            miss_points: 5,
            difficulty_bonus: 0,
        }
    }

    /// Parameters for the medium tier.
    #[must_use]
    pub const fn medium() -> Self {
        Self {
            duration_secs: 30,
            spawn_interval_ms: Bounds::new(550, 850),
            token_ttl_ms: Bounds::new(1_500, 2_200),
            max_active: 7,
            order_items: Bounds::exactly(4),
            item_quantity: Bounds::new(1, 3),
            miss_penalty_secs: 3,
            hit_points: 10,
            miss_points: 5,
            difficulty_bonus: 25,
        }
    }

    /// Parameters for the hard tier.
    #[must_use]
    pub const fn hard() -> Self {
        Self {
            duration_secs: 20,
            spawn_interval_ms: Bounds::new(450, 750),
            token_ttl_ms: Bounds::new(1_200, 1_800),
            max_active: 8,
            order_items: Bounds::exactly(5),
            item_quantity: Bounds::new(1, 3),
            miss_penalty_secs: 4,
            hit_points: 10,
            miss_points: 5,
            difficulty_bonus: 50,
        }
    }

    /// Reference parameters for the provided tier.
    #[must_use]
    pub const fn preset(key: DifficultyKey) -> Self {
        match key {
            DifficultyKey::Easy => Self::easy(),
            DifficultyKey::Medium => Self::medium(),
            DifficultyKey::Hard => Self::hard(),
        }
    }

    /// Session length.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs as u64)
    }

    /// Time removed from the clock on every miss.
    #[must_use]
    pub const fn miss_penalty(&self) -> Duration {
        Duration::from_secs(self.miss_penalty_secs as u64)
    }

    /// Checks that every range is ordered and every mandatory value is non-zero.
    pub fn validate(&self, key: DifficultyKey) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::ZeroValue {
                difficulty: key,
                field: "duration_secs",
            });
        }
        if self.max_active == 0 {
            return Err(ConfigError::ZeroValue {
                difficulty: key,
                field: "max_active",
            });
        }
        let minimums = [
            ("spawn_interval_ms.min", self.spawn_interval_ms.min),
            ("token_ttl_ms.min", self.token_ttl_ms.min),
            ("order_items.min", self.order_items.min),
            ("item_quantity.min", self.item_quantity.min),
        ];
        if let Some((field, _)) = minimums.into_iter().find(|(_, min)| *min == 0) {
            return Err(ConfigError::ZeroValue {
                difficulty: key,
                field,
            });
        }
        let ranges = [
            ("spawn_interval_ms", self.spawn_interval_ms),
            ("token_ttl_ms", self.token_ttl_ms),
            ("order_items", self.order_items),
            ("item_quantity", self.item_quantity),
        ];
        for (field, bounds) in ranges {
            if !bounds.is_ordered() {
                return Err(ConfigError::InvalidRange {
                    difficulty: key,
                    field,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::easy()
    }
}

/// Parameter bundles for every difficulty tier.
///
/// Tiers omitted from a TOML override keep their reference parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifficultyTable {
    #[serde(default = "DifficultyConfig::easy")]
    easy: DifficultyConfig,
    #[serde(default = "DifficultyConfig::medium")]
    medium: DifficultyConfig,
    #[serde(default = "DifficultyConfig::hard")]
    hard: DifficultyConfig,
}

impl DifficultyTable {
    /// Parses and validates a table from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: Self = toml::from_str(contents)?;
        table.validate()?;
        Ok(table)
    }

    /// Parameters for the provided tier.
    #[must_use]
    pub fn get(&self, key: DifficultyKey) -> &DifficultyConfig {
        match key {
            DifficultyKey::Easy => &self.easy,
            DifficultyKey::Medium => &self.medium,
            DifficultyKey::Hard => &self.hard,
        }
    }

    /// Replaces the parameters of a single tier after validating them.
    pub fn set(&mut self, key: DifficultyKey, config: DifficultyConfig) -> Result<(), ConfigError> {
        config.validate(key)?;
        match key {
            DifficultyKey::Easy => self.easy = config,
            DifficultyKey::Medium => self.medium = config,
            DifficultyKey::Hard => self.hard = config,
        }
        Ok(())
    }

    /// Validates every tier in the table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        DifficultyKey::ALL
            .into_iter()
            .try_for_each(|key| self.get(key).validate(key))
    }
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            easy: DifficultyConfig::easy(),
            medium: DifficultyConfig::medium(),
            hard: DifficultyConfig::hard(),
        }
    }
}

/// Errors raised while loading difficulty parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML text could not be parsed into a table.
    #[error("failed to parse difficulty table")]
    Parse(#[from] toml::de::Error),
    /// A range had its minimum above its maximum.
    #[error("{difficulty}: `{field}` range {min}..={max} is empty")]
    InvalidRange {
        /// Tier holding the invalid range.
        difficulty: DifficultyKey,
        /// Name of the offending field.
        field: &'static str,
        /// Configured minimum.
        min: u32,
        /// Configured maximum.
        max: u32,
    },
    /// A value that must be positive was zero.
    #[error("{difficulty}: `{field}` must be greater than zero")]
    ZeroValue {
        /// Tier holding the invalid value.
        difficulty: DifficultyKey,
        /// Name of the offending field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        DifficultyTable::default()
            .validate()
            .expect("reference parameters validate");
    }

    #[test]
    fn unknown_key_falls_back_to_easy() {
        assert_eq!(
            DifficultyKey::parse_or_default("nightmare"),
            (DifficultyKey::Easy, true)
        );
        assert_eq!(
            DifficultyKey::parse_or_default(" Hard "),
            (DifficultyKey::Hard, false)
        );
    }

    #[test]
    fn partial_toml_keeps_reference_tiers() {
        let contents = r#"
            [hard]
            duration_secs = 15
            spawn_interval_ms = { min = 400, max = 600 }
            token_ttl_ms = { min = 1000, max = 1500 }
            max_active = 10
            order_items = { min = 5, max = 5 }
            item_quantity = { min = 2, max = 3 }
            miss_penalty_secs = 5
            hit_points = 12
            miss_points = 6
            difficulty_bonus = 75
        "#;

        let table = DifficultyTable::from_toml_str(contents).expect("valid table");
        assert_eq!(table.get(DifficultyKey::Hard).duration_secs, 15);
        assert_eq!(table.get(DifficultyKey::Hard).max_active, 10);
        assert_eq!(table.get(DifficultyKey::Easy), &DifficultyConfig::easy());
        assert_eq!(table.get(DifficultyKey::Medium), &DifficultyConfig::medium());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut table = DifficultyTable::default();
        let mut config = DifficultyConfig::easy();
        config.token_ttl_ms = Bounds::new(2_000, 1_000);

        let error = table
            .set(DifficultyKey::Easy, config)
            .expect_err("inverted range must be rejected");
        assert!(matches!(
            error,
            ConfigError::InvalidRange {
                field: "token_ttl_ms",
                ..
            }
        ));
        assert_eq!(table.get(DifficultyKey::Easy), &DifficultyConfig::easy());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut config = DifficultyConfig::medium();
        config.duration_secs = 0;
        assert!(matches!(
            config.validate(DifficultyKey::Medium),
            Err(ConfigError::ZeroValue {
                field: "duration_secs",
                ..
            })
        ));
    }

    #[test]
    fn zero_spawn_interval_is_rejected() {
        let mut config = DifficultyConfig::hard();
        config.spawn_interval_ms = Bounds::new(0, 300);
        assert!(matches!(
            config.validate(DifficultyKey::Hard),
            Err(ConfigError::ZeroValue {
                field: "spawn_interval_ms.min",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        assert!(matches!(
            DifficultyTable::from_toml_str("[easy"),
            Err(ConfigError::Parse(_))
        ));
    }
}
