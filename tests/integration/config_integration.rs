//! Integration tests for configuration loading and validation

use articast::config::Config;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn config_loads_from_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("articast.toml");

    std::fs::write(
        &config_file,
        r#"
[limits]
count = 5
window_hours = 12
retention_days = 14
cooldown_secs = 30

[board]
endpoint = "https://board.example.com/graphql"
api_token = "board-token"
board_id = "1234567890"
max_items = 7

[board.columns]
source_url = "article_link"

[generation]
command = "nlm"
language = "de"
audio_timeout_secs = 1200

[transcode]
bitrate = "192k"

[publish]
endpoint = "https://hosting.example.com/api"
api_token = "publish-token"

[paths]
rate_log = "state/rate.json"
downloads_dir = "episodes"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_file)).unwrap();

    assert_eq!(config.limits.count, 5);
    assert_eq!(config.limits.window_hours, 12);
    assert_eq!(config.limits.retention_days, 14);
    assert_eq!(config.limits.cooldown_secs, 30);

    assert_eq!(config.board.endpoint, "https://board.example.com/graphql");
    assert_eq!(config.board.api_token, "board-token");
    assert_eq!(config.board.board_id, "1234567890");
    assert_eq!(config.board.max_items, 7);
    assert_eq!(config.board.columns.source_url, "article_link");

    assert_eq!(config.generation.command, "nlm");
    assert_eq!(config.generation.language, "de");
    assert_eq!(config.generation.audio_timeout_secs, 1200);

    assert_eq!(config.transcode.bitrate, "192k");

    assert_eq!(config.publish.endpoint, "https://hosting.example.com/api");
    assert_eq!(config.publish.api_token, "publish-token");

    assert_eq!(config.paths.rate_log, PathBuf::from("state/rate.json"));
    assert_eq!(config.paths.downloads_dir, PathBuf::from("episodes"));

    assert_eq!(config.logging.level, "debug");
}

#[test]
fn unset_sections_keep_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("articast.toml");

    std::fs::write(
        &config_file,
        r#"
[limits]
count = 1
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_file)).unwrap();

    assert_eq!(config.limits.count, 1);
    assert_eq!(config.limits.window_hours, 24, "window default");

    assert_eq!(config.board.endpoint, "https://api.monday.com/v2");
    assert_eq!(config.board.max_items, 3);
    assert_eq!(config.board.columns.podcast_link, "podcast_link");

    assert_eq!(config.generation.command, "notebooklm");
    assert_eq!(config.generation.audio_timeout_secs, 900);
    assert_eq!(config.generation.source_retries, 4);

    assert_eq!(config.transcode.command, "ffmpeg");
    assert_eq!(config.transcode.bitrate, "320k");
    assert_eq!(config.transcode.sample_rate, 44100);

    assert_eq!(config.publish.timeout_secs, 600);

    assert_eq!(
        config.paths.rate_log,
        PathBuf::from("logs/audio-generation.json")
    );
}

#[test]
fn load_rejects_retention_shorter_than_window() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("articast.toml");

    std::fs::write(
        &config_file,
        r#"
[limits]
window_hours = 48
retention_days = 1
"#,
    )
    .unwrap();

    let error = Config::load(Some(&config_file)).unwrap_err();
    assert!(error.to_string().contains("retention_days"));
}

#[test]
fn load_rejects_zero_max_items() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("articast.toml");

    std::fs::write(
        &config_file,
        r#"
[board]
max_items = 0
"#,
    )
    .unwrap();

    let error = Config::load(Some(&config_file)).unwrap_err();
    assert!(error.to_string().contains("max_items"));
}

#[test]
fn load_rejects_zero_sample_rate() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("articast.toml");

    std::fs::write(
        &config_file,
        r#"
[transcode]
sample_rate = 0
"#,
    )
    .unwrap();

    assert!(Config::load(Some(&config_file)).is_err());
}

#[test]
fn explicit_config_file_must_exist() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nowhere.toml");

    assert!(Config::load(Some(&missing)).is_err());
}
