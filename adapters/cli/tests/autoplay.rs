use std::process::{Command, Output};

fn flower_rush(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flower-rush"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch flower-rush")
}

fn summary(output: &Output) -> (u32, u32, u32) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .last()
        .expect("flower-rush printed a summary line");
    let (wins, rest) = line.split_once('/').expect("wins/rounds");
    let (rounds, rest) = rest
        .split_once(" sessions won, best score ")
        .expect("summary wording");
    (
        wins.parse().expect("wins is a number"),
        rounds.parse().expect("rounds is a number"),
        rest.parse().expect("best score is a number"),
    )
}

#[test]
fn seeded_round_prints_result_and_summary() {
    let output = flower_rush(&["--seed", "1", "--rounds", "1"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("== round 1 =="), "{stdout}");
    assert!(stdout.contains("easy session started"));
    assert!(stdout.contains("final score"));

    let (wins, rounds, best) = summary(&output);
    assert_eq!(rounds, 1);
    assert!(wins <= 1);
    if wins == 1 {
        assert!(stdout.contains("reward code: FLWR-"));
        assert!(best >= 100, "a win carries the win bonus");
    }
}

#[test]
fn same_seed_replays_identically() {
    let args = ["--seed", "42", "--rounds", "2", "--difficulty", "hard"];
    let first = flower_rush(&args);
    let second = flower_rush(&args);

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(summary(&first).1, 2);
}

#[test]
fn out_of_range_accuracy_is_rejected() {
    let output = flower_rush(&["--accuracy", "1.5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("1.5"));
}

#[test]
fn missing_config_file_fails_with_context() {
    let output = flower_rush(&["--config", "no/such/difficulties.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read difficulty table"));
}
