#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! End-of-session scoring and reward code issuance.

use std::time::Duration;

use flower_rush_core::{
    whole_seconds_ceil, Command, DifficultyConfig, Event, Rating, RewardCode, ScoreSnapshot,
    SessionResult, REWARD_CODE_ALPHABET, REWARD_CODE_LENGTH,
};
use rand::Rng;

/// Points awarded per whole second left on the clock.
pub const TIME_BONUS_PER_SECOND: u32 = 5;

/// Points awarded for completing the order.
pub const WIN_BONUS: u32 = 100;

/// Pure system that turns a finished session into a [`SessionResult`].
#[derive(Debug, Default)]
pub struct Scoring;

impl Scoring {
    /// Consumes [`Event::SessionEnded`] and emits [`Command::PublishResult`].
    pub fn handle<R: Rng + ?Sized>(
        &self,
        events: &[Event],
        score: ScoreSnapshot,
        config: &DifficultyConfig,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::SessionEnded { win, remaining } = event {
                let result = self.summarize(*win, *remaining, score, config, rng);
                out.push(Command::PublishResult { result });
            }
        }
    }

    /// Computes the summary of a finished session.
    ///
    /// The final score is the accumulated score plus a time bonus for whole
    /// remaining seconds (rounded down, unlike the countdown), the tier's flat bonus, and the win bonus when the
    /// order was completed. A reward code is drawn only on a win.
    pub fn summarize<R: Rng + ?Sized>(
        &self,
        win: bool,
        remaining: Duration,
        score: ScoreSnapshot,
        config: &DifficultyConfig,
        rng: &mut R,
    ) -> SessionResult {
        let remaining_secs = u32::try_from(remaining.as_secs()).unwrap_or(u32::MAX);
        let time_bonus = remaining_secs.saturating_mul(TIME_BONUS_PER_SECOND);
        let difficulty_bonus = config.difficulty_bonus;
        let win_bonus = if win { WIN_BONUS } else { 0 };
        let final_score = score
            .score
            .saturating_add(time_bonus)
            .saturating_add(difficulty_bonus)
            .saturating_add(win_bonus);

        SessionResult {
            win,
            base_score: score.score,
            time_bonus,
            difficulty_bonus,
            win_bonus,
            final_score,
            accuracy_percent: accuracy_percent(score),
            hits: score.correct_clicks,
            misses: score.total_clicks.saturating_sub(score.correct_clicks),
            remaining_secs,
            clock_secs: whole_seconds_ceil(remaining),
            rating: Rating::from_final_score(final_score),
            reward_code: win.then(|| reward_code(rng)),
        }
    }
}

/// Share of activations that were hits, in whole percent rounded half up.
///
/// Zero when nothing was activated.
#[must_use]
pub fn accuracy_percent(score: ScoreSnapshot) -> u8 {
    if score.total_clicks == 0 {
        return 0;
    }
    let correct = u64::from(score.correct_clicks.min(score.total_clicks));
    let total = u64::from(score.total_clicks);
    let percent = (correct * 100 + total / 2) / total;
    u8::try_from(percent).unwrap_or(100)
}

/// Draws a reward code from the unambiguous alphabet.
pub fn reward_code<R: Rng + ?Sized>(rng: &mut R) -> RewardCode {
    let suffix: String = (0..REWARD_CODE_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..REWARD_CODE_ALPHABET.len());
            char::from(REWARD_CODE_ALPHABET[index])
        })
        .collect();
    RewardCode::from_suffix(&suffix).expect("suffix is drawn from the reward alphabet")
}
