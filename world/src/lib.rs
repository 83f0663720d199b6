#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state management for Flower Rush.
//!
//! The world owns the state machine, the order, the score counters, the
//! live tokens and the session end instant. It never reads a clock or a
//! random source; every input arrives as a [`Command`] and every observable
//! change leaves as an [`Event`]. Commands that make no sense in the current
//! [`SessionState`] are dropped without emitting anything.

use std::{collections::BTreeMap, time::Duration};

use flower_rush_core::{
    whole_seconds_ceil, Command, DifficultyConfig, DifficultyKey, Event, FieldPosition,
    FlowerKindId, Order, ScoreSnapshot, SessionResult, SessionState, Timestamp, TokenId,
};

/// Represents the authoritative Flower Rush session state.
#[derive(Debug, Default)]
pub struct World {
    state: SessionState,
    difficulty: DifficultyKey,
    config: DifficultyConfig,
    order: Order,
    score: ScoreSnapshot,
    tokens: BTreeMap<TokenId, Token>,
    next_token: u32,
    now: Timestamp,
    end_at: Timestamp,
    result: Option<SessionResult>,
}

impl World {
    /// Creates a world waiting in the menu.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn remaining(&self) -> Duration {
        self.end_at.saturating_duration_since(self.now)
    }

    fn emit_clock(&self, out_events: &mut Vec<Event>) {
        out_events.push(Event::ClockRecomputed {
            remaining_secs: whole_seconds_ceil(self.remaining()),
        });
    }

    fn finish_if_expired(&mut self, out_events: &mut Vec<Event>) {
        if self.state == SessionState::Playing && self.end_at <= self.now {
            self.finish(false, out_events);
        }
    }

    fn finish(&mut self, win: bool, out_events: &mut Vec<Event>) {
        self.state = SessionState::Finished;
        self.tokens.clear();
        out_events.push(Event::SessionEnded {
            win,
            remaining: self.remaining(),
        });
    }

    fn clear_session(&mut self) {
        self.order = Order::default();
        self.score = ScoreSnapshot::default();
        self.tokens.clear();
        self.result = None;
    }

    fn spawn_token(
        &mut self,
        kind: FlowerKindId,
        position: FieldPosition,
        size: u8,
        ttl: Duration,
        out_events: &mut Vec<Event>,
    ) {
        if self.tokens.len() >= self.config.max_active as usize {
            return;
        }

        let id = TokenId::new(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        let expires_at = self.now.saturating_add(ttl);
        let _ = self.tokens.insert(
            id,
            Token {
                id,
                kind: kind.clone(),
                position,
                size,
                spawned_at: self.now,
                expires_at,
            },
        );
        out_events.push(Event::TokenSpawned {
            token: id,
            kind,
            position,
            size,
            expires_at,
        });
    }

    fn activate_token(&mut self, token: TokenId, out_events: &mut Vec<Event>) {
        let Some(token) = self.tokens.remove(&token) else {
            return;
        };
        if token.expires_at <= self.now {
            out_events.push(Event::TokenExpired { token: token.id });
            return;
        }

        self.score.total_clicks = self.score.total_clicks.saturating_add(1);

        if self.order.collect(&token.kind) {
            self.score.correct_clicks = self.score.correct_clicks.saturating_add(1);
            self.score.score = self.score.score.saturating_add(self.config.hit_points);
            out_events.push(Event::TokenCollected {
                token: token.id,
                kind: token.kind,
            });
            out_events.push(Event::OrderChanged {
                lines: self.order.snapshot(),
            });
            out_events.push(Event::ScoreChanged {
                score: self.score.score,
            });
            if self.order.is_complete() {
                self.finish(true, out_events);
            }
            return;
        }

        self.score.score = self.score.score.saturating_sub(self.config.miss_points);
        out_events.push(Event::TokenMissed {
            token: token.id,
            kind: token.kind,
        });
        out_events.push(Event::ScoreChanged {
            score: self.score.score,
        });

        let penalty = self.config.miss_penalty();
        self.end_at = self.end_at.saturating_sub(penalty).max(self.now);
        out_events.push(Event::TimePenaltyApplied {
            penalty,
            end_at: self.end_at,
        });
        self.emit_clock(out_events);
        self.finish_if_expired(out_events);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartSession {
            difficulty,
            config,
            order,
            now,
        } => {
            world.clear_session();
            world.state = SessionState::Playing;
            world.now = world.now.max(now);
            world.end_at = world.now.saturating_add(config.duration());
            world.difficulty = difficulty;
            world.config = config;
            world.order = order;

            out_events.push(Event::SessionStarted {
                difficulty,
                end_at: world.end_at,
            });
            out_events.push(Event::OrderChanged {
                lines: world.order.snapshot(),
            });
            out_events.push(Event::ScoreChanged { score: 0 });
            world.emit_clock(out_events);

            if world.order.is_complete() {
                world.finish(true, out_events);
            }
        }
        Command::Tick { now } => {
            world.now = world.now.max(now);
            if world.state == SessionState::Playing {
                world.emit_clock(out_events);
                world.finish_if_expired(out_events);
            }
        }
        Command::SpawnToken {
            kind,
            position,
            size,
            ttl,
        } => {
            if world.state == SessionState::Playing {
                world.spawn_token(kind, position, size, ttl, out_events);
            }
        }
        Command::ExpireToken { token } => {
            if world.state == SessionState::Playing && world.tokens.remove(&token).is_some() {
                out_events.push(Event::TokenExpired { token });
            }
        }
        Command::ActivateToken { token } => {
            if world.state == SessionState::Playing {
                world.activate_token(token, out_events);
            }
        }
        Command::PublishResult { result } => {
            if world.state == SessionState::Finished && world.result.is_none() {
                world.result = Some(result.clone());
                out_events.push(Event::ResultReady { result });
            }
        }
        Command::ReturnToMenu => {
            world.clear_session();
            world.state = SessionState::Menu;
            world.end_at = world.now;
            out_events.push(Event::ReturnedToMenu);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use flower_rush_core::{
        whole_seconds_ceil, DifficultyConfig, DifficultyKey, FieldPosition, FlowerKindId, Order,
        OrderLineSnapshot, ScoreSnapshot, SessionResult, SessionState, Timestamp, TokenId,
    };

    /// Current lifecycle phase.
    #[must_use]
    pub fn state(world: &World) -> SessionState {
        world.state
    }

    /// Difficulty tier of the current or most recent session.
    #[must_use]
    pub fn difficulty(world: &World) -> DifficultyKey {
        world.difficulty
    }

    /// Parameters of the current or most recent session.
    #[must_use]
    pub fn config(world: &World) -> &DifficultyConfig {
        &world.config
    }

    /// Order of the current session; empty in the menu.
    #[must_use]
    pub fn order(world: &World) -> &Order {
        &world.order
    }

    /// Presentation snapshot of every order line.
    #[must_use]
    pub fn order_lines(world: &World) -> Vec<OrderLineSnapshot> {
        world.order.snapshot()
    }

    /// Copy of the score counters.
    #[must_use]
    pub fn score(world: &World) -> ScoreSnapshot {
        world.score
    }

    /// Most recent instant reported to the world.
    #[must_use]
    pub fn now(world: &World) -> Timestamp {
        world.now
    }

    /// Instant at which the session ends unless further penalties apply.
    #[must_use]
    pub fn end_at(world: &World) -> Timestamp {
        world.end_at
    }

    /// Time left on the clock as of the most recent tick.
    #[must_use]
    pub fn remaining(world: &World) -> Duration {
        world.remaining()
    }

    /// Time left on the clock rounded up to whole seconds.
    #[must_use]
    pub fn remaining_secs(world: &World) -> u32 {
        whole_seconds_ceil(world.remaining())
    }

    /// Number of tokens currently on the field.
    #[must_use]
    pub fn live_token_count(world: &World) -> usize {
        world.tokens.len()
    }

    /// Reports whether the token is still on the field.
    #[must_use]
    pub fn is_live(world: &World, token: TokenId) -> bool {
        world.tokens.contains_key(&token)
    }

    /// Captures a read-only view of the tokens on the field.
    #[must_use]
    pub fn token_view(world: &World) -> TokenView {
        let snapshots = world
            .tokens
            .values()
            .map(|token| TokenSnapshot {
                id: token.id,
                kind: token.kind.clone(),
                position: token.position,
                size: token.size,
                spawned_at: token.spawned_at,
                expires_at: token.expires_at,
            })
            .collect();
        TokenView { snapshots }
    }

    /// Summary of the finished session, once published.
    #[must_use]
    pub fn result(world: &World) -> Option<&SessionResult> {
        world.result.as_ref()
    }

    /// Read-only snapshot describing all tokens on the field.
    #[derive(Clone, Debug, Default)]
    pub struct TokenView {
        snapshots: Vec<TokenSnapshot>,
    }

    impl TokenView {
        /// Iterator over the captured token snapshots in handle order.
        pub fn iter(&self) -> impl Iterator<Item = &TokenSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<TokenSnapshot> {
            self.snapshots
        }

        /// Number of captured tokens.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether no token was captured.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }
    }

    /// Immutable representation of a single token used for queries.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct TokenSnapshot {
        /// Handle assigned to the token.
        pub id: TokenId,
        /// Flower kind carried by the token.
        pub kind: FlowerKindId,
        /// Relative on-field placement.
        pub position: FieldPosition,
        /// Visual size hint.
        pub size: u8,
        /// Instant the token was spawned at.
        pub spawned_at: Timestamp,
        /// Instant the token expires at unless activated first.
        pub expires_at: Timestamp,
    }
}

#[derive(Clone, Debug)]
struct Token {
    id: TokenId,
    kind: FlowerKindId,
    position: FieldPosition,
    size: u8,
    spawned_at: Timestamp,
    expires_at: Timestamp,
}
