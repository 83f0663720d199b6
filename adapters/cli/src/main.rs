#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Flower Rush sessions with a scripted bot.

mod bot;

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use flower_rush_core::{DifficultyTable, Event, Scheduler, SessionResult, SessionState};
use flower_rush_session::{Session, SessionOptions, SystemScheduler, VirtualScheduler};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bot::Bot;

/// Command-line arguments for the Flower Rush adapter.
#[derive(Debug, Parser)]
#[command(name = "flower-rush", about = "Plays Flower Rush sessions headlessly")]
struct Args {
    /// Difficulty tier: easy, medium or hard.
    #[arg(short, long, default_value = "easy")]
    difficulty: String,
    /// Seed shared by the session and the bot.
    #[arg(short, long)]
    seed: Option<u64>,
    /// Probability that the bot aims for a token the order still needs.
    #[arg(short, long, default_value_t = 0.85, value_parser = parse_probability)]
    accuracy: f64,
    /// TOML file overriding the difficulty tiers.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of sessions to play back to back.
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,
    /// Delay between two bot clicks, in milliseconds.
    #[arg(long, default_value_t = 350)]
    reaction_ms: u64,
    /// Follow the wall clock instead of a virtual one.
    #[arg(long)]
    realtime: bool,
}

fn parse_probability(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{parsed} is outside 0.0..=1.0"))
    }
}

/// Entry point for the Flower Rush command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let difficulties = match &args.config {
        Some(path) => load_table(path)?,
        None => DifficultyTable::default(),
    };
    let options = SessionOptions {
        seed: args.seed,
        difficulties,
        ..SessionOptions::default()
    };
    let reaction = Duration::from_millis(args.reaction_ms.max(1));

    let results = if args.realtime {
        let session = Session::new(SystemScheduler::new(), options);
        play(session, &args, |session: &mut Session<SystemScheduler>, out| {
            let wait = session
                .scheduler()
                .until_next_due()
                .map_or(reaction, |due| due.min(reaction));
            thread::sleep(wait);
            session.pump(out);
        })?
    } else {
        let session = Session::new(VirtualScheduler::new(), options);
        play(session, &args, |session, out| session.advance(reaction, out))?
    };

    let wins = results.iter().filter(|result| result.win).count();
    let best = results
        .iter()
        .map(|result| result.final_score)
        .max()
        .unwrap_or(0);
    println!("{wins}/{} sessions won, best score {best}", results.len());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_table(path: &Path) -> Result<DifficultyTable> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read difficulty table {}", path.display()))?;
    let table = DifficultyTable::from_toml_str(&contents)
        .with_context(|| format!("invalid difficulty table {}", path.display()))?;
    info!(path = %path.display(), "loaded difficulty table");
    Ok(table)
}

fn play<S, F>(mut session: Session<S>, args: &Args, mut step: F) -> Result<Vec<SessionResult>>
where
    S: Scheduler,
    F: FnMut(&mut Session<S>, &mut Vec<Event>),
{
    let mut bot = Bot::new(args.accuracy, args.seed.map(|seed| seed.wrapping_add(1)));
    let reaction = Duration::from_millis(args.reaction_ms.max(1));
    let mut results = Vec::new();

    for round in 1..=args.rounds {
        println!("== round {round} ==");
        let mut hud = Hud::default();
        let mut events = Vec::new();
        session
            .start(&args.difficulty, &mut events)
            .context("failed to start session")?;
        hud.render(&events);
        let mut next_click = session.scheduler().now().saturating_add(reaction);

        while session.state() == SessionState::Playing {
            events.clear();
            step(&mut session, &mut events);
            let now = session.scheduler().now();
            if session.state() == SessionState::Playing && now >= next_click {
                next_click = now.saturating_add(reaction);
                if let Some(token) = bot.choose(session.world()) {
                    session.activate(token, &mut events);
                }
            }
            hud.render(&events);
        }

        match session.result() {
            Some(result) => results.push(result.clone()),
            None => warn!(round, "session finished without a result"),
        }
        events.clear();
        session.reset(&mut events);
    }
    Ok(results)
}

/// Prints the host-facing event stream as plain text.
#[derive(Debug, Default)]
struct Hud {
    last_clock: Option<u32>,
}

impl Hud {
    fn render(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::SessionStarted { difficulty, .. } => {
                    println!("{difficulty} session started");
                }
                Event::OrderChanged { lines } => {
                    let order: Vec<String> = lines
                        .iter()
                        .map(|line| {
                            format!(
                                "{} {} {}/{}",
                                line.glyph, line.label, line.collected, line.required
                            )
                        })
                        .collect();
                    println!("order: {}", order.join(", "));
                }
                Event::ScoreChanged { score } => println!("score: {score}"),
                Event::ClockRecomputed { remaining_secs } => {
                    if self.last_clock != Some(*remaining_secs) {
                        self.last_clock = Some(*remaining_secs);
                        println!(
                            "time: {:02}:{:02}",
                            remaining_secs / 60,
                            remaining_secs % 60
                        );
                    }
                }
                Event::TokenCollected { kind, .. } => println!("hit {}", kind.as_str()),
                Event::TokenMissed { kind, .. } => println!("miss {}", kind.as_str()),
                Event::TimePenaltyApplied { penalty, .. } => {
                    println!("penalty -{}s", penalty.as_secs());
                }
                Event::SessionEnded { win, .. } => {
                    println!("{}", if *win { "order complete!" } else { "time is up" });
                }
                Event::ResultReady { result } => print_result(result),
                _ => {}
            }
        }
    }
}

fn print_result(result: &SessionResult) {
    println!(
        "final score {} ({} base + {} time + {} difficulty + {} win)",
        result.final_score,
        result.base_score,
        result.time_bonus,
        result.difficulty_bonus,
        result.win_bonus
    );
    println!(
        "accuracy {}% ({} hits, {} misses), {}s left, {}",
        result.accuracy_percent,
        result.hits,
        result.misses,
        result.clock_secs,
        "*".repeat(usize::from(result.rating.stars()))
    );
    if let Some(code) = &result.reward_code {
        println!("reward code: {code}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_must_lie_in_unit_interval() {
        assert_eq!(parse_probability("0.5"), Ok(0.5));
        assert!(parse_probability("1.5").is_err());
        assert!(parse_probability("often").is_err());
    }

    #[test]
    fn defaults_play_one_easy_round() {
        let args = Args::parse_from(["flower-rush"]);
        assert_eq!(args.difficulty, "easy");
        assert_eq!(args.rounds, 1);
        assert!(!args.realtime);
    }
}
