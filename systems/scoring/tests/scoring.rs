use std::time::Duration;

use flower_rush_core::{
    Command, DifficultyConfig, Event, Rating, RewardCode, ScoreSnapshot, REWARD_CODE_ALPHABET,
};
use flower_rush_system_scoring::{reward_code, Scoring, TIME_BONUS_PER_SECOND, WIN_BONUS};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn win_adds_every_bonus_and_issues_code() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let score = ScoreSnapshot {
        score: 60,
        total_clicks: 7,
        correct_clicks: 6,
    };

    let result = Scoring.summarize(
        true,
        Duration::from_millis(21_900),
        score,
        &DifficultyConfig::medium(),
        &mut rng,
    );

    assert!(result.win);
    assert_eq!(result.remaining_secs, 21);
    assert_eq!(result.clock_secs, 22, "matches the last countdown reading");
    assert_eq!(result.time_bonus, 21 * TIME_BONUS_PER_SECOND);
    assert_eq!(result.difficulty_bonus, 25);
    assert_eq!(result.win_bonus, WIN_BONUS);
    assert_eq!(result.final_score, 60 + 105 + 25 + 100);
    assert_eq!(result.rating, Rating::TwoStars);
    assert_eq!(result.accuracy_percent, 86);
    assert_eq!((result.hits, result.misses), (6, 1));
    let code = result.reward_code.expect("win issues a code");
    assert!(RewardCode::is_well_formed(code.as_str()), "{code}");
}

#[test]
fn loss_without_clicks_has_no_time_bonus_or_code() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let result = Scoring.summarize(
        false,
        Duration::ZERO,
        ScoreSnapshot::default(),
        &DifficultyConfig::hard(),
        &mut rng,
    );

    assert!(!result.win);
    assert_eq!(result.time_bonus, 0);
    assert_eq!(result.win_bonus, 0);
    assert_eq!(result.final_score, DifficultyConfig::hard().difficulty_bonus);
    assert_eq!(result.accuracy_percent, 0);
    assert_eq!(result.rating, Rating::OneStar);
    assert_eq!(result.reward_code, None);
}

#[test]
fn handle_reacts_only_to_session_end() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut commands = Vec::new();

    Scoring.handle(
        &[
            Event::ScoreChanged { score: 10 },
            Event::SessionEnded {
                win: false,
                remaining: Duration::ZERO,
            },
        ],
        ScoreSnapshot {
            score: 10,
            total_clicks: 1,
            correct_clicks: 1,
        },
        &DifficultyConfig::easy(),
        &mut rng,
        &mut commands,
    );

    assert_eq!(commands.len(), 1);
    match &commands[0] {
        Command::PublishResult { result } => {
            assert_eq!(result.base_score, 10);
            assert_eq!(result.final_score, 10);
        }
        other => panic!("unexpected command emitted: {other:?}"),
    }
}

#[test]
fn reward_codes_use_prefix_and_unambiguous_alphabet() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xf10e);
    for _ in 0..500 {
        let code = reward_code(&mut rng);
        let suffix = code
            .as_str()
            .strip_prefix("FLWR-")
            .expect("code carries the fixed prefix");
        assert_eq!(suffix.len(), 6);
        for byte in suffix.bytes() {
            assert!(byte.is_ascii_uppercase() || byte.is_ascii_digit());
            assert!(REWARD_CODE_ALPHABET.contains(&byte));
            assert!(!b"0O1IL".contains(&byte), "ambiguous character in {code}");
        }
    }
}
