//! Integration tests for rate-limit tracking across tracker instances

use articast::config::LimitsConfig;
use articast::tracker::RateLimitTracker;
use chrono::{Duration, Utc};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn limits(count: u32) -> LimitsConfig {
    LimitsConfig {
        count,
        ..LimitsConfig::default()
    }
}

fn write_log(path: &Path, entries: Vec<serde_json::Value>) {
    let log = json!({ "entries": entries });
    std::fs::write(path, serde_json::to_string(&log).unwrap()).unwrap();
}

fn entry(hours_ago: i64, url: &str) -> serde_json::Value {
    json!({
        "timestamp": (Utc::now() - Duration::hours(hours_ago)).to_rfc3339(),
        "runId": "earlier-run",
        "resourceUrl": url,
    })
}

#[test]
fn entries_survive_process_restart() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audio-generation.json");

    let first = RateLimitTracker::new(&log_path, limits(3));
    first
        .record_audio_generation("https://example.com/one")
        .unwrap();
    first
        .record_audio_generation("https://example.com/two")
        .unwrap();

    let second = RateLimitTracker::new(&log_path, limits(3));
    assert_eq!(second.validate_rate_limit().unwrap(), 1);

    let entries = second.window_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].resource_url, "https://example.com/one");
    assert_eq!(entries[1].resource_url, "https://example.com/two");

    // Both records came from the first tracker, so they share its run id.
    assert_eq!(entries[0].run_id, first.run_id());
    assert_eq!(entries[1].run_id, first.run_id());
}

#[test]
fn old_entries_fall_out_of_window() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audio-generation.json");

    write_log(
        &log_path,
        vec![
            entry(25, "https://example.com/stale"),
            entry(1, "https://example.com/recent"),
        ],
    );

    let tracker = RateLimitTracker::new(&log_path, limits(3));
    assert_eq!(tracker.validate_rate_limit().unwrap(), 2);

    let entries = tracker.window_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resource_url, "https://example.com/recent");
}

#[test]
fn record_prunes_entries_past_retention() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audio-generation.json");

    // Default retention is 7 days; 8 days is past it, 2 hours is not.
    write_log(
        &log_path,
        vec![
            entry(8 * 24, "https://example.com/ancient"),
            entry(2, "https://example.com/recent"),
        ],
    );

    let tracker = RateLimitTracker::new(&log_path, limits(3));
    tracker
        .record_audio_generation("https://example.com/new")
        .unwrap();

    let raw = std::fs::read_to_string(&log_path).unwrap();
    let log: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries = log["entries"].as_array().unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["resourceUrl"], "https://example.com/recent");
    assert_eq!(entries[1]["resourceUrl"], "https://example.com/new");
}

#[test]
fn corrupt_log_is_an_error_not_a_reset() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audio-generation.json");
    std::fs::write(&log_path, "not json at all").unwrap();

    let tracker = RateLimitTracker::new(&log_path, limits(3));

    let error = tracker.validate_rate_limit().unwrap_err();
    assert!(error.to_string().contains("corrupt"));

    // Recording must not clobber the unreadable log either.
    assert!(tracker
        .record_audio_generation("https://example.com/x")
        .is_err());
    assert_eq!(
        std::fs::read_to_string(&log_path).unwrap(),
        "not json at all"
    );
}

#[test]
fn missing_log_means_full_quota() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("never-written.json");

    let tracker = RateLimitTracker::new(&log_path, limits(3));
    assert_eq!(tracker.validate_rate_limit().unwrap(), 3);
    assert!(tracker.window_entries().unwrap().is_empty());
}

#[test]
fn exhausted_quota_saturates_at_zero() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audio-generation.json");

    let tracker = RateLimitTracker::new(&log_path, limits(1));
    tracker
        .record_audio_generation("https://example.com/one")
        .unwrap();
    tracker
        .record_audio_generation("https://example.com/two")
        .unwrap();

    assert_eq!(tracker.validate_rate_limit().unwrap(), 0);
}

#[test]
fn log_parent_directories_are_created_on_write() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("nested/state/audio-generation.json");

    let tracker = RateLimitTracker::new(&log_path, limits(3));
    tracker
        .record_audio_generation("https://example.com/one")
        .unwrap();

    assert!(log_path.exists());
}
