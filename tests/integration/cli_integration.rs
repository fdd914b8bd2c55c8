//! Integration tests for CLI parsing and command execution

use articast::cli::{Cli, Commands, RunContext};
use articast::config::LimitsConfig;
use articast::tracker::RateLimitTracker;
use clap::Parser;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn parse_run_with_max_items() {
    let cli = Cli::try_parse_from(["articast", "run", "--max-items", "2"]).unwrap();
    match cli.command {
        Commands::Run { max_items } => assert_eq!(max_items, Some(2)),
        _ => panic!("expected run command"),
    }
}

#[test]
fn parse_run_without_override() {
    let cli = Cli::try_parse_from(["articast", "run"]).unwrap();
    match cli.command {
        Commands::Run { max_items } => assert_eq!(max_items, None),
        _ => panic!("expected run command"),
    }
}

#[test]
fn parse_generate_with_all_flags() {
    let cli = Cli::try_parse_from([
        "articast",
        "generate",
        "--url",
        "https://example.com/post",
        "--item-id",
        "987",
        "--notebook-url",
        "https://notebooklm.google.com/notebook/abc",
        "--no-upload",
        "--yes",
    ])
    .unwrap();

    match cli.command {
        Commands::Generate {
            url,
            item_id,
            notebook_url,
            no_upload,
            yes,
        } => {
            assert_eq!(url, "https://example.com/post");
            assert_eq!(item_id.as_deref(), Some("987"));
            assert_eq!(
                notebook_url.as_deref(),
                Some("https://notebooklm.google.com/notebook/abc")
            );
            assert!(no_upload);
            assert!(yes);
        }
        _ => panic!("expected generate command"),
    }
}

#[test]
fn generate_requires_url() {
    assert!(Cli::try_parse_from(["articast", "generate"]).is_err());
}

#[test]
fn parse_score_positional_url() {
    let cli = Cli::try_parse_from(["articast", "score", "https://example.com/post"]).unwrap();
    match cli.command {
        Commands::Score { url } => assert_eq!(url, "https://example.com/post"),
        _ => panic!("expected score command"),
    }
}

#[test]
fn parse_global_logging_flags() {
    let cli = Cli::try_parse_from([
        "articast",
        "--config",
        "custom.toml",
        "--log-level",
        "trace",
        "quota",
    ])
    .unwrap();

    assert_eq!(cli.config.as_deref(), Some(Path::new("custom.toml")));
    assert_eq!(cli.log_level.as_deref(), Some("trace"));
    assert!(matches!(cli.command, Commands::Quota));
}

#[tokio::test]
async fn quota_command_reads_configured_rate_log() {
    let dir = TempDir::new().unwrap();
    let config_file = dir.path().join("articast.toml");
    let rate_log = dir.path().join("rate.json");

    std::fs::write(
        &config_file,
        format!(
            "[limits]\ncount = 5\n\n[paths]\nrate_log = \"{}\"\n",
            rate_log.display()
        ),
    )
    .unwrap();

    let limits = LimitsConfig {
        count: 5,
        ..LimitsConfig::default()
    };
    let tracker = RateLimitTracker::new(&rate_log, limits);
    tracker
        .record_audio_generation("https://example.com/logged")
        .unwrap();

    let context = RunContext::new(Some(&config_file)).unwrap();
    let output = context.execute(&Commands::Quota).await.unwrap();

    assert!(output.contains("Used: 1 of 5"));
    assert!(output.contains("Remaining: 4"));
    assert!(output.contains("https://example.com/logged"));
}
