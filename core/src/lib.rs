#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Flower Rush engine.
//!
//! This crate defines the message surface that connects the host adapter, the
//! authoritative session world, and pure systems. The session controller
//! submits [`Command`] values describing desired mutations, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values for systems and the host presentation surface to react to. Systems
//! consume event streams, read immutable snapshots, and respond exclusively
//! with new command batches.
//!
//! Time never reaches the world implicitly: it arrives through
//! [`Command::Tick`], sourced from a [`Scheduler`] implementation owned by the
//! controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod config;
mod scheduler;

pub use config::{
    Bounds, ConfigError, DifficultyConfig, DifficultyKey, DifficultyTable, UnknownDifficulty,
};
pub use scheduler::{Scheduler, Task, TimerId};

/// Prefix carried by every reward code issued on a winning session.
pub const REWARD_CODE_PREFIX: &str = "FLWR-";

/// Number of random characters following [`REWARD_CODE_PREFIX`].
pub const REWARD_CODE_LENGTH: usize = 6;

/// Characters a reward code may draw from. Visually confusable glyphs
/// (`0`, `O`, `1`, `I`, `L`) are excluded.
pub const REWARD_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Begins a new session, discarding whatever state the world held before.
    StartSession {
        /// Difficulty tier the session was started with.
        difficulty: DifficultyKey,
        /// Parameters governing timing, spawning and scoring for the session.
        config: DifficultyConfig,
        /// Freshly generated order the player must fulfil.
        order: Order,
        /// Instant the session starts at.
        now: Timestamp,
    },
    /// Informs the world of the current instant so it can recompute the clock.
    Tick {
        /// Current instant reported by the scheduler.
        now: Timestamp,
    },
    /// Places a new token on the field.
    SpawnToken {
        /// Flower kind carried by the token.
        kind: FlowerKindId,
        /// Relative on-field placement of the token.
        position: FieldPosition,
        /// Visual size hint forwarded to the presentation surface.
        size: u8,
        /// Lifetime of the token before it expires on its own.
        ttl: Duration,
    },
    /// Removes a token whose time-to-live elapsed.
    ExpireToken {
        /// Token whose lifetime ended.
        token: TokenId,
    },
    /// Resolves a player activation of a token into a hit or a miss.
    ActivateToken {
        /// Token the player activated.
        token: TokenId,
    },
    /// Stores the computed end-of-session summary.
    PublishResult {
        /// Summary computed by the scoring system.
        result: SessionResult,
    },
    /// Returns the world to the menu, clearing all session state.
    ReturnToMenu,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a new session entered the playing state.
    SessionStarted {
        /// Difficulty tier selected for the session.
        difficulty: DifficultyKey,
        /// Instant at which the session expires unless penalties move it earlier.
        end_at: Timestamp,
    },
    /// Carries a re-renderable snapshot of every order line.
    OrderChanged {
        /// Current progress of each order line, in order.
        lines: Vec<OrderLineSnapshot>,
    },
    /// Reports the current integer score.
    ScoreChanged {
        /// Score after the change, never negative.
        score: u32,
    },
    /// Reports the remaining session time after a clock recompute.
    ClockRecomputed {
        /// Remaining time rounded up to whole seconds.
        remaining_secs: u32,
    },
    /// Confirms that a miss moved the session end earlier.
    TimePenaltyApplied {
        /// Amount of time removed from the session.
        penalty: Duration,
        /// Updated end instant of the session.
        end_at: Timestamp,
    },
    /// Confirms that a token was placed on the field.
    TokenSpawned {
        /// Handle assigned to the token.
        token: TokenId,
        /// Flower kind carried by the token.
        kind: FlowerKindId,
        /// Relative on-field placement of the token.
        position: FieldPosition,
        /// Visual size hint for the token.
        size: u8,
        /// Instant at which the token expires unless activated first.
        expires_at: Timestamp,
    },
    /// Reports that an activation matched an unfulfilled order line.
    TokenCollected {
        /// Token that was collected.
        token: TokenId,
        /// Flower kind carried by the token.
        kind: FlowerKindId,
    },
    /// Reports that an activation did not match any unfulfilled order line.
    TokenMissed {
        /// Token that was activated.
        token: TokenId,
        /// Flower kind carried by the token.
        kind: FlowerKindId,
    },
    /// Reports that a token's lifetime elapsed before it was activated.
    TokenExpired {
        /// Token that expired.
        token: TokenId,
    },
    /// Announces that the session left the playing state.
    SessionEnded {
        /// Whether the order was completed before the clock ran out.
        win: bool,
        /// Time left on the clock when the session ended.
        remaining: Duration,
    },
    /// Carries the end-of-session summary for presentation.
    ResultReady {
        /// Summary of the finished session.
        result: SessionResult,
    },
    /// Announces that the world returned to the menu.
    ReturnedToMenu,
}

/// Lifecycle phase of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the player to start a session.
    #[default]
    Menu,
    /// A session is running; spawning and the clock are active.
    Playing,
    /// The session ended and its result is displayed.
    Finished,
}

/// Instant on the session clock measured in milliseconds from an arbitrary origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Origin of the clock.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from milliseconds since the clock origin.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds elapsed since the clock origin.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Moves the timestamp forward by the provided duration.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Moves the timestamp backward by the provided duration, stopping at the origin.
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }

    /// Time elapsed from `earlier` to `self`, or zero when `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Unique handle assigned to a spawned token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    /// Creates a new token handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a flower kind within the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowerKindId(String);

impl FlowerKindId {
    /// Creates an identifier from its textual form.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Immutable catalog entry describing a flower players can collect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowerKind {
    id: FlowerKindId,
    label: String,
    glyph: String,
}

impl FlowerKind {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, glyph: impl Into<String>) -> Self {
        Self {
            id: FlowerKindId::new(id),
            label: label.into(),
            glyph: glyph.into(),
        }
    }

    /// Identifier referenced by order lines and tokens.
    #[must_use]
    pub fn id(&self) -> &FlowerKindId {
        &self.id
    }

    /// Human readable name.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Icon shown on the field and in the order list.
    #[must_use]
    pub fn glyph(&self) -> &str {
        &self.glyph
    }
}

/// Fixed set of flower kinds available to orders and the spawner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    kinds: Vec<FlowerKind>,
}

impl Catalog {
    /// Creates a catalog from the provided entries, keeping the first entry per identifier.
    #[must_use]
    pub fn new(kinds: Vec<FlowerKind>) -> Self {
        let mut unique: Vec<FlowerKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if unique.iter().all(|existing| existing.id != kind.id) {
                unique.push(kind);
            }
        }
        Self { kinds: unique }
    }

    /// Looks up a catalog entry by identifier.
    #[must_use]
    pub fn get(&self, id: &FlowerKindId) -> Option<&FlowerKind> {
        self.kinds.iter().find(|kind| &kind.id == id)
    }

    /// Entries in catalog order.
    #[must_use]
    pub fn kinds(&self) -> &[FlowerKind] {
        &self.kinds
    }

    /// Number of entries in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Reports whether the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            FlowerKind::new("rose", "Rose", "🌹"),
            FlowerKind::new("peony", "Peony", "🌸"),
            FlowerKind::new("daisy", "Daisy", "🌼"),
            FlowerKind::new("tulip", "Tulip", "🌷"),
            FlowerKind::new("lily", "Lily", "🌺"),
        ])
    }
}

/// Single entry of an order: a flower kind and how many of it to collect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLine {
    kind: FlowerKind,
    required: u32,
    collected: u32,
}

impl OrderLine {
    /// Creates an order line with nothing collected yet.
    #[must_use]
    pub fn new(kind: FlowerKind, required: u32) -> Self {
        Self {
            kind,
            required,
            collected: 0,
        }
    }

    /// Flower kind this line asks for.
    #[must_use]
    pub fn kind(&self) -> &FlowerKind {
        &self.kind
    }

    /// Quantity that must be collected to fulfil the line.
    #[must_use]
    pub const fn required(&self) -> u32 {
        self.required
    }

    /// Quantity collected so far; never exceeds [`OrderLine::required`].
    #[must_use]
    pub const fn collected(&self) -> u32 {
        self.collected
    }

    /// Reports whether the line is fully collected.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        self.collected >= self.required
    }

    /// Captures a presentation snapshot of the line.
    #[must_use]
    pub fn snapshot(&self) -> OrderLineSnapshot {
        OrderLineSnapshot {
            kind: self.kind.id.clone(),
            label: self.kind.label.clone(),
            glyph: self.kind.glyph.clone(),
            collected: self.collected,
            required: self.required,
        }
    }
}

/// Shopping list the player must fulfil to win a session.
///
/// The set of lines is fixed at construction; only the collected counters
/// move, and only upward.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Order {
    lines: Vec<OrderLine>,
}

impl Order {
    /// Builds an order, rejecting duplicate kinds and zero quantities.
    pub fn new(lines: Vec<OrderLine>) -> Result<Self, OrderError> {
        for (index, line) in lines.iter().enumerate() {
            if line.required == 0 {
                return Err(OrderError::ZeroQuantity(line.kind.id.clone()));
            }
            if lines[..index]
                .iter()
                .any(|earlier| earlier.kind.id == line.kind.id)
            {
                return Err(OrderError::DuplicateKind(line.kind.id.clone()));
            }
        }
        Ok(Self { lines })
    }

    /// Lines in the order they were generated.
    #[must_use]
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Sum of the required quantities across all lines.
    #[must_use]
    pub fn total_required(&self) -> u32 {
        self.lines.iter().map(OrderLine::required).sum()
    }

    /// Sum of the collected quantities across all lines.
    #[must_use]
    pub fn total_collected(&self) -> u32 {
        self.lines.iter().map(OrderLine::collected).sum()
    }

    /// Reports whether every line is fully collected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(OrderLine::is_fulfilled)
    }

    /// Records one collected flower of `kind`.
    ///
    /// Returns `false`, leaving every counter untouched, when no unfulfilled
    /// line asks for the kind.
    pub fn collect(&mut self, kind: &FlowerKindId) -> bool {
        match self
            .lines
            .iter_mut()
            .find(|line| &line.kind.id == kind && !line.is_fulfilled())
        {
            Some(line) => {
                line.collected += 1;
                true
            }
            None => false,
        }
    }

    /// Captures presentation snapshots of every line.
    #[must_use]
    pub fn snapshot(&self) -> Vec<OrderLineSnapshot> {
        self.lines.iter().map(OrderLine::snapshot).collect()
    }
}

/// Errors raised while assembling an [`Order`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The catalog holds no flower kinds to draw from.
    #[error("flower catalog is empty")]
    EmptyCatalog,
    /// Two lines referenced the same flower kind.
    #[error("order lists flower kind `{}` more than once", .0.as_str())]
    DuplicateKind(FlowerKindId),
    /// A line required zero flowers.
    #[error("order line for `{}` requires zero flowers", .0.as_str())]
    ZeroQuantity(FlowerKindId),
}

/// Re-renderable view of a single order line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLineSnapshot {
    /// Flower kind the line asks for.
    pub kind: FlowerKindId,
    /// Human readable name of the kind.
    pub label: String,
    /// Icon of the kind.
    pub glyph: String,
    /// Quantity collected so far.
    pub collected: u32,
    /// Quantity required.
    pub required: u32,
}

/// Token placement relative to the play field, in whole percent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldPosition {
    left_percent: u8,
    top_percent: u8,
}

impl FieldPosition {
    /// Creates a position, clamping both axes to `0..=100`.
    #[must_use]
    pub fn new(left_percent: u8, top_percent: u8) -> Self {
        Self {
            left_percent: left_percent.min(100),
            top_percent: top_percent.min(100),
        }
    }

    /// Distance from the left edge of the field.
    #[must_use]
    pub const fn left_percent(&self) -> u8 {
        self.left_percent
    }

    /// Distance from the top edge of the field.
    #[must_use]
    pub const fn top_percent(&self) -> u8 {
        self.top_percent
    }
}

/// Read-only copy of the running score counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreSnapshot {
    /// Accumulated score, never negative.
    pub score: u32,
    /// Number of processed activations.
    pub total_clicks: u32,
    /// Number of activations that matched an unfulfilled order line.
    pub correct_clicks: u32,
}

/// Coarse end-of-session rating derived from the final score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rating {
    /// Lowest tier.
    OneStar,
    /// Middle tier.
    TwoStars,
    /// Highest tier.
    ThreeStars,
}

impl Rating {
    /// Final score at or above which a session earns two stars.
    pub const TWO_STAR_THRESHOLD: u32 = 150;
    /// Final score at or above which a session earns three stars.
    pub const THREE_STAR_THRESHOLD: u32 = 300;

    /// Maps a final score onto its rating tier.
    #[must_use]
    pub const fn from_final_score(score: u32) -> Self {
        if score >= Self::THREE_STAR_THRESHOLD {
            Self::ThreeStars
        } else if score >= Self::TWO_STAR_THRESHOLD {
            Self::TwoStars
        } else {
            Self::OneStar
        }
    }

    /// Number of stars awarded.
    #[must_use]
    pub const fn stars(self) -> u8 {
        match self {
            Self::OneStar => 1,
            Self::TwoStars => 2,
            Self::ThreeStars => 3,
        }
    }
}

/// Short code handed to the player after a winning session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RewardCode(String);

impl RewardCode {
    /// Builds a code from its random suffix, rejecting malformed suffixes.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let valid = suffix.len() == REWARD_CODE_LENGTH
            && suffix.bytes().all(|byte| REWARD_CODE_ALPHABET.contains(&byte));
        valid.then(|| Self(format!("{REWARD_CODE_PREFIX}{suffix}")))
    }

    /// Reports whether `code` is a prefix followed by a valid suffix.
    #[must_use]
    pub fn is_well_formed(code: &str) -> bool {
        code.strip_prefix(REWARD_CODE_PREFIX)
            .and_then(Self::from_suffix)
            .is_some()
    }

    /// Full textual form including the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RewardCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// End-of-session summary handed to the presentation surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionResult {
    /// Whether the order was completed before the clock ran out.
    pub win: bool,
    /// Score accumulated from hits and misses during play.
    pub base_score: u32,
    /// Bonus for whole seconds left on the clock.
    pub time_bonus: u32,
    /// Flat bonus attached to the difficulty tier.
    pub difficulty_bonus: u32,
    /// Bonus awarded for completing the order.
    pub win_bonus: u32,
    /// Sum of the base score and all bonuses.
    pub final_score: u32,
    /// Share of activations that were hits, in whole percent.
    pub accuracy_percent: u8,
    /// Number of activations that were hits.
    pub hits: u32,
    /// Number of activations that were misses.
    pub misses: u32,
    /// Whole seconds left on the clock, rounded down; the time bonus basis.
    pub remaining_secs: u32,
    /// Time left as the countdown last showed it, rounded up.
    pub clock_secs: u32,
    /// Rating tier derived from the final score.
    pub rating: Rating,
    /// Code issued on a win; absent on a loss.
    pub reward_code: Option<RewardCode>,
}

/// Rounds a duration up to whole seconds, the way a countdown display reads.
#[must_use]
pub fn whole_seconds_ceil(duration: Duration) -> u32 {
    let millis = duration.as_millis();
    u32::try_from(millis.div_ceil(1_000)).unwrap_or(u32::MAX)
}
