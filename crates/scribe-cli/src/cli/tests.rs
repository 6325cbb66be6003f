use super::*;
use std::path::Path;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_run_with_defaults() {
    match parse(&["scribe", "run", "rec/a", "rec/b"]) {
        CliCommand::Run {
            dirs,
            workers,
            max_retries,
            output,
            quiet,
        } => {
            assert!(!quiet);
            assert_eq!(dirs, vec![PathBuf::from("rec/a"), PathBuf::from("rec/b")]);
            assert_eq!(workers, None);
            assert_eq!(max_retries, None);
            assert_eq!(output, None);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_with_overrides() {
    match parse(&[
        "scribe",
        "run",
        "--workers",
        "8",
        "--max-retries",
        "1",
        "--output",
        "out",
        "--quiet",
        "rec/a",
    ]) {
        CliCommand::Run {
            dirs,
            workers,
            max_retries,
            output,
            quiet,
        } => {
            assert!(quiet);
            assert_eq!(dirs.len(), 1);
            assert_eq!(workers, Some(8));
            assert_eq!(max_retries, Some(1));
            assert_eq!(output.as_deref(), Some(Path::new("out")));
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_run_requires_a_directory() {
    assert!(Cli::try_parse_from(["scribe", "run"]).is_err());
}

#[test]
fn cli_parse_status() {
    assert!(matches!(parse(&["scribe", "status"]), CliCommand::Status));
}

#[test]
fn cli_parse_repair() {
    match parse(&["scribe", "repair", "/data/out"]) {
        CliCommand::Repair { output_dir } => assert_eq!(output_dir, PathBuf::from("/data/out")),
        _ => panic!("expected Repair"),
    }
}

#[test]
fn overrides_replace_config_values() {
    let mut cfg = ScribeConfig::default();
    apply_overrides(&mut cfg, Some(9), Some(0), Some(PathBuf::from("o")));
    assert_eq!(cfg.scheduler.workers, 9);
    assert_eq!(cfg.retry.max_retries, 0);
    assert_eq!(cfg.output_dir, Some(PathBuf::from("o")));

    let mut cfg = ScribeConfig::default();
    apply_overrides(&mut cfg, None, None, None);
    assert_eq!(cfg.scheduler.workers, 4);
    assert_eq!(cfg.output_dir, None);
}
