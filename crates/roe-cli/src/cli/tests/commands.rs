use super::*;
use crate::cli::commands::Scripted;

#[test]
fn cli_parse_schedule_defaults() {
    match parse(&["roe", "schedule"]) {
        CliCommand::Schedule { policy } => assert_eq!(policy, PolicyArgs::default()),
        _ => panic!("expected Schedule"),
    }
}

#[test]
fn cli_parse_classify() {
    match parse(&["roe", "classify", "404", "429", "503"]) {
        CliCommand::Classify { statuses } => assert_eq!(statuses, vec![404, 429, 503]),
        _ => panic!("expected Classify"),
    }
}

#[test]
fn cli_parse_classify_requires_status() {
    assert!(Cli::try_parse_from(["roe", "classify"]).is_err());
    assert!(Cli::try_parse_from(["roe", "classify", "not-a-code"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["roe", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_parse_simulate() {
    match parse(&["roe", "simulate", "429", "reset", "ok", "--max-attempts", "5"]) {
        CliCommand::Simulate { outcomes, policy } => {
            assert_eq!(
                outcomes,
                vec![Scripted::Status(429), Scripted::Reset, Scripted::Ok]
            );
            assert_eq!(policy.max_attempts, Some(5));
        }
        _ => panic!("expected Simulate"),
    }
}

#[test]
fn cli_parse_simulate_rejects_unknown_outcome() {
    assert!(Cli::try_parse_from(["roe", "simulate", "sometimes"]).is_err());
    assert!(Cli::try_parse_from(["roe", "simulate"]).is_err());
}
