#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session controller that drives a Flower Rush game instance.
//!
//! A [`Session`] owns one authoritative [`World`], a [`Scheduler`], a seeded
//! random source and the pure systems. Hosts talk to it through three calls,
//! [`Session::start`], [`Session::activate`] and [`Session::reset`], plus
//! [`Session::pump`] to run scheduled work. Every call appends the events the
//! host should render to the provided buffer.
//!
//! The controller owns every timer it schedules. Leaving the playing state
//! cancels the clock loop, the spawn chain and all token expiry timers before
//! any further command reaches the world.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use flower_rush_core::{
    Catalog, Command, DifficultyKey, DifficultyTable, Event, OrderError, Scheduler,
    SessionResult, SessionState, Task, TimerId, TokenId,
};
use flower_rush_system_order_generation::OrderGeneration;
use flower_rush_system_scoring::Scoring;
use flower_rush_system_spawning::{Attempt, Spawning};
use flower_rush_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

pub use flower_rush_clock::{SystemScheduler, VirtualScheduler};

/// Longest interval between two clock recomputes while playing.
pub const CLOCK_RECOMPUTE_PERIOD: Duration = Duration::from_millis(250);

/// Construction parameters for a [`Session`].
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Seed for the random source; `None` draws one from the operating system.
    pub seed: Option<u64>,
    /// Parameters for every difficulty tier.
    pub difficulties: DifficultyTable,
    /// Flower kinds available to orders and the spawner.
    pub catalog: Catalog,
}

impl SessionOptions {
    /// Default options with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Explicit, caller-owned game instance.
#[derive(Debug)]
pub struct Session<S> {
    world: World,
    scheduler: S,
    rng: ChaCha8Rng,
    catalog: Catalog,
    difficulties: DifficultyTable,
    order_generation: OrderGeneration,
    spawning: Spawning,
    scoring: Scoring,
    timers: Timers,
}

impl<S: Scheduler> Session<S> {
    /// Creates a session controller waiting in the menu.
    #[must_use]
    pub fn new(scheduler: S, options: SessionOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            world: World::new(),
            scheduler,
            rng,
            catalog: options.catalog,
            difficulties: options.difficulties,
            order_generation: OrderGeneration,
            spawning: Spawning::default(),
            scoring: Scoring,
            timers: Timers::default(),
        }
    }

    /// Starts a session for the named difficulty.
    ///
    /// Unknown names fall back to the default tier. See [`Session::start_with`].
    pub fn start(&mut self, difficulty: &str, out: &mut Vec<Event>) -> Result<(), OrderError> {
        let (key, fell_back) = DifficultyKey::parse_or_default(difficulty);
        if fell_back {
            warn!(requested = difficulty, fallback = %key, "unknown difficulty");
        }
        self.start_with(key, out)
    }

    /// Starts a session for the provided difficulty tier.
    ///
    /// Any session already in progress is cancelled first. Fails only when
    /// the catalog is empty, in which case nothing changes.
    pub fn start_with(
        &mut self,
        difficulty: DifficultyKey,
        out: &mut Vec<Event>,
    ) -> Result<(), OrderError> {
        let config = self.difficulties.get(difficulty).clone();
        let order = self
            .order_generation
            .generate(&config, &self.catalog, &mut self.rng)
            .map_err(|err| {
                error!(%err, "cannot generate order");
                err
            })?;

        self.timers.cancel_all(&mut self.scheduler);

        let now = self.scheduler.now();
        info!(
            %difficulty,
            lines = order.lines().len(),
            required = order.total_required(),
            "session started"
        );
        self.dispatch(
            Command::StartSession {
                difficulty,
                config: config.clone(),
                order,
                now,
            },
            out,
        );

        if query::state(&self.world) == SessionState::Playing {
            self.schedule_clock_check();
            let delay = self.spawning.next_delay(&config, &mut self.rng);
            self.timers.spawn = Some(self.scheduler.schedule(delay, Task::SpawnAttempt));
        }
        Ok(())
    }

    /// Resolves a player activation of a token.
    ///
    /// Due timers run first, so a token whose lifetime already elapsed is
    /// expired rather than scored. Activations outside play or of tokens
    /// that are no longer on the field are ignored.
    pub fn activate(&mut self, token: TokenId, out: &mut Vec<Event>) {
        self.pump(out);
        if query::state(&self.world) != SessionState::Playing {
            debug!(token = token.get(), "activation outside play ignored");
            return;
        }
        self.tick(out);
        self.dispatch(Command::ActivateToken { token }, out);
    }

    /// Returns to the menu from any state, discarding the current session.
    pub fn reset(&mut self, out: &mut Vec<Event>) {
        self.timers.cancel_all(&mut self.scheduler);
        self.dispatch(Command::ReturnToMenu, out);
        info!("returned to menu");
    }

    /// Runs every scheduled task that is due.
    pub fn pump(&mut self, out: &mut Vec<Event>) {
        while let Some((timer, task)) = self.scheduler.pop_due() {
            self.run(timer, task, out);
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn state(&self) -> SessionState {
        query::state(&self.world)
    }

    /// Summary of the most recent session, once it finished.
    #[must_use]
    pub fn result(&self) -> Option<&SessionResult> {
        query::result(&self.world)
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Flower kinds this session draws from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn run(&mut self, timer: TimerId, task: Task, out: &mut Vec<Event>) {
        match task {
            Task::ClockCheck => {
                if self.timers.clock == Some(timer) {
                    self.timers.clock = None;
                }
                self.tick(out);
                if query::state(&self.world) == SessionState::Playing
                    && self.timers.clock.is_none()
                {
                    self.schedule_clock_check();
                }
            }
            Task::SpawnAttempt => {
                if self.timers.spawn == Some(timer) {
                    self.timers.spawn = None;
                }
                self.tick(out);
                self.attempt_spawn(out);
            }
            Task::ExpireToken(token) => {
                let _ = self.timers.tokens.remove(&token);
                self.tick(out);
                self.dispatch(Command::ExpireToken { token }, out);
            }
        }
    }

    fn attempt_spawn(&mut self, out: &mut Vec<Event>) {
        let config = query::config(&self.world).clone();
        let mut commands = Vec::new();
        let outcome = self.spawning.handle(
            query::state(&self.world),
            query::live_token_count(&self.world),
            &config,
            &self.catalog,
            &mut self.rng,
            &mut commands,
        );

        for command in commands {
            self.dispatch(command, out);
        }

        if let Some((attempt, delay)) = outcome {
            if attempt == Attempt::Skipped {
                debug!("field full, spawn skipped");
            }
            if query::state(&self.world) == SessionState::Playing {
                self.timers.spawn = Some(self.scheduler.schedule(delay, Task::SpawnAttempt));
            }
        }
    }

    fn tick(&mut self, out: &mut Vec<Event>) {
        let now = self.scheduler.now();
        self.dispatch(Command::Tick { now }, out);
    }

    fn schedule_clock_check(&mut self) {
        let delay = CLOCK_RECOMPUTE_PERIOD.min(query::remaining(&self.world));
        self.timers.clock = Some(self.scheduler.schedule(delay, Task::ClockCheck));
    }

    fn dispatch(&mut self, command: Command, out: &mut Vec<Event>) {
        let mut pending = VecDeque::from([command]);
        while let Some(command) = pending.pop_front() {
            let mut events = Vec::new();
            world::apply(&mut self.world, command, &mut events);
            self.react(&events, &mut pending);
            out.extend(events);
        }
    }

    fn react(&mut self, events: &[Event], pending: &mut VecDeque<Command>) {
        for event in events {
            match event {
                Event::TokenSpawned {
                    token,
                    kind,
                    expires_at,
                    ..
                } => {
                    let ttl = expires_at.saturating_duration_since(self.scheduler.now());
                    let timer = self.scheduler.schedule(ttl, Task::ExpireToken(*token));
                    let _ = self.timers.tokens.insert(*token, timer);
                    debug!(token = token.get(), kind = kind.as_str(), ?ttl, "token spawned");
                }
                Event::TokenCollected { token, kind } => {
                    self.timers.cancel_token(&mut self.scheduler, *token);
                    debug!(token = token.get(), kind = kind.as_str(), "hit");
                }
                Event::TokenMissed { token, kind } => {
                    self.timers.cancel_token(&mut self.scheduler, *token);
                    debug!(token = token.get(), kind = kind.as_str(), "miss");
                }
                Event::TokenExpired { token } => {
                    self.timers.cancel_token(&mut self.scheduler, *token);
                    debug!(token = token.get(), "token expired");
                }
                Event::TimePenaltyApplied { penalty, .. } => {
                    if let Some(timer) = self.timers.clock.take() {
                        self.scheduler.cancel(timer);
                    }
                    self.schedule_clock_check();
                    debug!(?penalty, "time penalty applied");
                }
                Event::SessionEnded { win, remaining } => {
                    self.timers.cancel_all(&mut self.scheduler);
                    let score = query::score(&self.world);
                    info!(
                        win,
                        ?remaining,
                        score = score.score,
                        clicks = score.total_clicks,
                        "session finished"
                    );
                }
                Event::ResultReady { result } => {
                    info!(
                        final_score = result.final_score,
                        stars = result.rating.stars(),
                        reward_code = result.reward_code.as_ref().map(|code| code.as_str()),
                        "result ready"
                    );
                }
                _ => {}
            }
        }

        let mut commands = Vec::new();
        self.scoring.handle(
            events,
            query::score(&self.world),
            query::config(&self.world),
            &mut self.rng,
            &mut commands,
        );
        pending.extend(commands);
    }
}

impl Session<VirtualScheduler> {
    /// Advances the virtual clock and runs every task that became due.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.scheduler.advance(dt);
        self.pump(out);
    }
}

#[derive(Debug, Default)]
struct Timers {
    clock: Option<TimerId>,
    spawn: Option<TimerId>,
    tokens: HashMap<TokenId, TimerId>,
}

impl Timers {
    fn cancel_token<S: Scheduler>(&mut self, scheduler: &mut S, token: TokenId) {
        if let Some(timer) = self.tokens.remove(&token) {
            scheduler.cancel(timer);
        }
    }

    fn cancel_all<S: Scheduler>(&mut self, scheduler: &mut S) {
        if let Some(timer) = self.clock.take() {
            scheduler.cancel(timer);
        }
        if let Some(timer) = self.spawn.take() {
            scheduler.cancel(timer);
        }
        for (_, timer) in self.tokens.drain() {
            scheduler.cancel(timer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_all_leaves_nothing_pending() {
        let mut scheduler = VirtualScheduler::new();
        let mut timers = Timers {
            clock: Some(scheduler.schedule(CLOCK_RECOMPUTE_PERIOD, Task::ClockCheck)),
            spawn: Some(scheduler.schedule(Duration::from_millis(700), Task::SpawnAttempt)),
            tokens: HashMap::new(),
        };
        let token = TokenId::new(4);
        let timer = scheduler.schedule(Duration::from_secs(2), Task::ExpireToken(token));
        let _ = timers.tokens.insert(token, timer);

        timers.cancel_all(&mut scheduler);
        timers.cancel_all(&mut scheduler);

        assert_eq!(scheduler.pending(), 0);
        assert!(timers.clock.is_none() && timers.spawn.is_none());
        assert!(timers.tokens.is_empty());
    }
}
