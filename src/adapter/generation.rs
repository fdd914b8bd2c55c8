//! Audio generation through the external automation CLI.
//!
//! The generation service is driven by a separately installed automation
//! binary (`notebooklm` by default). Each pipeline operation maps onto one
//! or more CLI subcommands: `create`/`use` manage notebooks, `source add`
//! plus `source wait` feed it the article, `generate audio` starts the
//! episode, `artifact wait` and `download audio` retrieve it. The adapter
//! keeps the current notebook and the last generated title between calls,
//! which is what lets a later `download_audio` act on the notebook the
//! preceding create/open selected.

use super::command::{run_captured, run_checked};
use super::{GenerationAdapter, NotebookHandle};
use crate::config::GenerationConfig;
use crate::error::{CommandError, GenerationError};
use crate::podcast::PodcastDetails;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Base of the notebook URLs written to the board and parsed on resume.
const NOTEBOOK_URL_BASE: &str = "https://notebooklm.google.com/notebook";

/// Marker the CLI prints when the service refuses to process a source.
const REJECTION_MARKER: &str = "UNSUPPORTED_SOURCE";

/// Artifact status that allows downloading.
const STATUS_COMPLETED: &str = "completed";

/// Title used until the service names the episode.
const FALLBACK_TITLE: &str = "Untitled Podcast";

/// Process-level headroom on top of CLI-side wait timeouts.
const WAIT_BUFFER: Duration = Duration::from_secs(30);

/// Longest filename stem derived from an episode title.
const FILENAME_STEM_CHARS: usize = 50;

#[derive(Debug, Deserialize)]
struct AuthStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactList {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
struct Artifact {
    id: String,
    status: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct WaitResult {
    status: String,
}

#[derive(Debug, Default)]
struct SessionState {
    notebook_id: Option<String>,
    last_title: Option<String>,
}

/// `GenerationAdapter` backed by the automation CLI.
pub struct NotebookCliAdapter {
    config: GenerationConfig,
    downloads_dir: PathBuf,
    state: Mutex<SessionState>,
}

impl NotebookCliAdapter {
    pub fn new(config: GenerationConfig, downloads_dir: PathBuf) -> Self {
        Self {
            config,
            downloads_dir,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.config.command)
    }

    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output, CommandError> {
        let mut command = self.command();
        command.args(args);
        run_checked(&mut command, &self.config.command, timeout).await
    }

    async fn select_notebook(&self, notebook_id: &str) -> Result<(), GenerationError> {
        self.run(&["use", notebook_id], self.config.default_timeout())
            .await?;
        Ok(())
    }

    /// Add the source URL to the current notebook, returning the source id
    /// the CLI prints. A rejection marker classifies as invalid resource.
    async fn add_source(&self, source_url: &str) -> Result<String, GenerationError> {
        let output = self
            .run(
                &["source", "add", source_url],
                self.config.source_timeout(),
            )
            .await
            .map_err(|err| match rejection_in_error(&err) {
                Some(reason) => GenerationError::InvalidResource { reason },
                None => err.into(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        id_token(&stdout).ok_or_else(|| {
            GenerationError::Adapter("source add output carried no source id".to_string())
        })
    }

    /// Wait until the source is processed. The ready state can lag the add
    /// by a while, so a failed wait is retried with doubling pauses before
    /// it counts as an error.
    async fn wait_for_source(&self, source_id: &str) -> Result<(), GenerationError> {
        let attempts = self.config.source_retries.max(1);
        let cli_timeout = self.config.source_timeout_secs.to_string();
        let mut pause = self.config.retry_pause();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut command = self.command();
            command.args(["source", "wait", source_id, "--timeout", &cli_timeout]);
            let result = run_checked(
                &mut command,
                &self.config.command,
                self.config.source_timeout() + WAIT_BUFFER,
            )
            .await;
            match result {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if let Some(reason) = rejection_in_error(&err) {
                        return Err(GenerationError::InvalidResource { reason });
                    }
                    if attempt >= attempts {
                        return Err(err.into());
                    }
                    warn!(attempt, source_id, "Source not ready; pausing before retry");
                    tokio::time::sleep(pause).await;
                    pause = pause.saturating_mul(2);
                }
            }
        }
    }

    /// Trigger audio generation and confirm the service observably started.
    /// The audio artifact can lag the trigger, so the trigger is repeated a
    /// few times with a pause. After the attempts run out the source state
    /// is probed once more: a late rejection classifies as invalid
    /// resource, not as a start timeout.
    async fn trigger_generation(&self, source_id: &str) -> Result<(), GenerationError> {
        let attempts = self.config.generation_retries.max(1);
        for attempt in 1..=attempts {
            let mut command = self.command();
            command.args(["generate", "audio", "--json"]);
            let output = run_captured(
                &mut command,
                &self.config.command,
                self.config.default_timeout(),
            )
            .await?;
            if let Some(reason) = rejection_in_output(&output) {
                return Err(GenerationError::InvalidResource { reason });
            }
            if self.latest_audio_artifact().await?.is_some() {
                debug!(attempt, "Audio generation started");
                return Ok(());
            }
            warn!(attempt, "No audio artifact after trigger");
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_pause()).await;
            }
        }
        if let Some(reason) = self.late_source_rejection(source_id).await {
            return Err(GenerationError::InvalidResource { reason });
        }
        Err(GenerationError::StartTimedOut { attempts })
    }

    /// Probe the source for a rejection that surfaced after the add looked
    /// clean. Best-effort: a failed probe reads as no rejection.
    async fn late_source_rejection(&self, source_id: &str) -> Option<String> {
        let mut command = self.command();
        command.args(["source", "wait", source_id, "--timeout", "5"]);
        match run_captured(
            &mut command,
            &self.config.command,
            self.config.default_timeout(),
        )
        .await
        {
            Ok(output) => rejection_in_output(&output),
            Err(_) => None,
        }
    }

    /// Newest audio artifact of the current notebook, if any.
    async fn latest_audio_artifact(&self) -> Result<Option<Artifact>, GenerationError> {
        let output = self
            .run(
                &["artifact", "list", "--type", "audio", "--json"],
                self.config.default_timeout(),
            )
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let list: ArtifactList = serde_json::from_str(&stdout).map_err(|e| {
            GenerationError::Adapter(format!("artifact list returned malformed JSON: {e}"))
        })?;
        Ok(list.artifacts.into_iter().next())
    }

    /// Drive `artifact wait` and report whether the artifact completed.
    /// A failed wait is not conclusive; the caller re-checks the list.
    async fn wait_for_artifact(&self, artifact_id: &str) -> bool {
        let cli_timeout = self.config.audio_timeout_secs.to_string();
        let mut command = self.command();
        command.args([
            "artifact",
            "wait",
            artifact_id,
            "--timeout",
            &cli_timeout,
            "--json",
        ]);
        let result = run_captured(
            &mut command,
            &self.config.command,
            self.config.audio_timeout() + WAIT_BUFFER,
        )
        .await;
        match result {
            Ok(output) if output.status.success() => {
                serde_json::from_slice::<WaitResult>(&output.stdout)
                    .map(|wait| wait.status == STATUS_COMPLETED)
                    .unwrap_or(false)
            }
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "Artifact wait failed");
                false
            }
        }
    }

    /// Download target: sanitized episode title plus the date, as MP3.
    fn output_path(&self, title: &str) -> PathBuf {
        let kept: String = title
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
            .collect();
        let stem: String = kept
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .take(FILENAME_STEM_CHARS)
            .collect();
        let date = Utc::now().format("%Y-%m-%d");
        self.downloads_dir.join(format!("{stem}_{date}.mp3"))
    }
}

#[async_trait]
impl GenerationAdapter for NotebookCliAdapter {
    async fn initialize(&self) -> Result<(), GenerationError> {
        self.run(&["--version"], self.config.default_timeout())
            .await?;

        let output = self
            .run(&["auth", "check", "--json"], self.config.default_timeout())
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let auth: AuthStatus = serde_json::from_str(&stdout).map_err(|e| {
            GenerationError::Adapter(format!("auth check returned malformed JSON: {e}"))
        })?;
        if auth.status != "ok" {
            return Err(GenerationError::Adapter(format!(
                "not authenticated with the generation service (status: {})",
                auth.status
            )));
        }
        info!(command = %self.config.command, "Generation CLI session ready");
        Ok(())
    }

    async fn navigate_to_main_page(&self) -> Result<(), GenerationError> {
        self.run(&["clear"], self.config.default_timeout()).await?;
        self.state.lock().notebook_id = None;
        Ok(())
    }

    async fn create_notebook_and_generate_audio(
        &self,
        source_url: &str,
    ) -> Result<NotebookHandle, GenerationError> {
        // Placeholder until the service names the episode after the trigger.
        let placeholder = format!("Podcast {}", Utc::now().format("%Y%m%d%H%M%S"));
        info!(source_url, "Creating notebook");

        let output = self
            .run(&["create", &placeholder], self.config.default_timeout())
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let notebook_id = id_token(&stdout).ok_or_else(|| {
            GenerationError::Adapter("create output carried no notebook id".to_string())
        })?;
        self.state.lock().notebook_id = Some(notebook_id.clone());

        self.select_notebook(&notebook_id).await?;
        self.run(
            &["language", "set", &self.config.language],
            self.config.default_timeout(),
        )
        .await?;

        let source_id = self.add_source(source_url).await?;
        self.wait_for_source(&source_id).await?;
        self.trigger_generation(&source_id).await?;

        let title = match self.latest_audio_artifact().await? {
            Some(artifact) if !artifact.title.trim().is_empty() => artifact.title,
            _ => placeholder,
        };
        self.state.lock().last_title = Some(title.clone());

        let notebook_url = format!("{NOTEBOOK_URL_BASE}/{notebook_id}");
        info!(notebook_url = %notebook_url, title = %title, "Generation started");
        Ok(NotebookHandle {
            notebook_url,
            title,
        })
    }

    async fn open_existing_notebook(&self, notebook_url: &str) -> Result<(), GenerationError> {
        let notebook_id = notebook_id_from_url(notebook_url)
            .ok_or_else(|| GenerationError::Adapter(format!("not a notebook URL: {notebook_url}")))?;

        self.select_notebook(&notebook_id).await?;
        {
            let mut state = self.state.lock();
            state.notebook_id = Some(notebook_id.clone());
            state.last_title = None;
        }

        // Resumed notebooks usually carry a named artifact already.
        if let Some(artifact) = self.latest_audio_artifact().await? {
            if !artifact.title.trim().is_empty() {
                self.state.lock().last_title = Some(artifact.title);
            }
        }
        info!(notebook_id, "Opened existing notebook");
        Ok(())
    }

    async fn download_audio(&self) -> Result<PathBuf, GenerationError> {
        let (notebook_id, title) = {
            let state = self.state.lock();
            (state.notebook_id.clone(), state.last_title.clone())
        };
        if notebook_id.is_none() {
            return Err(GenerationError::Adapter(
                "no active notebook; create or open one first".to_string(),
            ));
        }

        let artifact = self.latest_audio_artifact().await?.ok_or_else(|| {
            GenerationError::DownloadFailed("no audio artifact in the notebook".to_string())
        })?;

        if artifact.status != STATUS_COMPLETED {
            info!(artifact_id = %artifact.id, "Waiting for audio generation to finish");
            let mut completed = self.wait_for_artifact(&artifact.id).await;
            if !completed {
                // The wait can lose the race with completion; the list is
                // authoritative.
                completed = self
                    .latest_audio_artifact()
                    .await?
                    .is_some_and(|a| a.status == STATUS_COMPLETED);
            }
            if !completed {
                return Err(GenerationError::DownloadFailed(
                    "audio generation did not complete in time".to_string(),
                ));
            }
        }

        tokio::fs::create_dir_all(&self.downloads_dir)
            .await
            .map_err(|e| {
                GenerationError::DownloadFailed(format!(
                    "could not create {}: {e}",
                    self.downloads_dir.display()
                ))
            })?;

        let output_path = self.output_path(title.as_deref().unwrap_or(FALLBACK_TITLE));
        let mut command = self.command();
        command
            .args(["download", "audio"])
            .arg(&output_path)
            .arg("--latest");
        run_checked(
            &mut command,
            &self.config.command,
            self.config.download_timeout(),
        )
        .await?;

        info!(path = %output_path.display(), "Audio downloaded");
        Ok(output_path)
    }

    async fn get_podcast_details(&self) -> Result<PodcastDetails, GenerationError> {
        let title = self
            .state
            .lock()
            .last_title
            .clone()
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        // A missing summary degrades to a stock description.
        let description = match self.run(&["summary"], self.config.default_timeout()).await {
            Ok(output) => String::from_utf8_lossy(&output.stdout).trim().to_string(),
            Err(err) => {
                warn!(error = %err, "Notebook summary unavailable");
                String::new()
            }
        };
        let description = if description.is_empty() {
            "Generated podcast".to_string()
        } else {
            description
        };

        Ok(PodcastDetails { title, description })
    }
}

/// First plausible identifier in CLI output. Create and source commands
/// print the new object's id; tokens of 10+ id characters qualify, which
/// skips ordinary words in the surrounding text.
fn id_token(output: &str) -> Option<String> {
    output
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .find(|token| token.len() >= 10)
        .map(str::to_string)
}

/// Notebook id segment of a notebook URL.
fn notebook_id_from_url(url: &str) -> Option<String> {
    let start = url.find("notebook/")? + "notebook/".len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

/// Line of CLI output carrying the rejection marker, if any.
fn rejection_in_output(output: &Output) -> Option<String> {
    for stream in [&output.stdout, &output.stderr] {
        let text = String::from_utf8_lossy(stream);
        if let Some(line) = text.lines().find(|line| line.contains(REJECTION_MARKER)) {
            return Some(line.trim().to_string());
        }
    }
    None
}

fn rejection_in_error(err: &CommandError) -> Option<String> {
    match err {
        CommandError::Failed { stderr_tail, .. } => stderr_tail
            .lines()
            .find(|line| line.contains(REJECTION_MARKER))
            .map(|line| line.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable stand-in for the automation CLI.
    fn fake_cli(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("fake-nlm");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn adapter_with(dir: &TempDir, body: &str) -> NotebookCliAdapter {
        let mut config = GenerationConfig::default();
        config.command = fake_cli(dir, body);
        config.retry_pause_secs = 0;
        NotebookCliAdapter::new(config, dir.path().join("downloads"))
    }

    #[test]
    fn test_id_token_picks_identifier_out_of_prose() {
        let id = id_token("Created notebook a1b2c3d4e5f6 for you").unwrap();
        assert_eq!(id, "a1b2c3d4e5f6");
        assert_eq!(id_token("all short words here"), None);
    }

    #[test]
    fn test_notebook_id_from_url() {
        assert_eq!(
            notebook_id_from_url("https://notebooklm.google.com/notebook/abc-DEF_123?x=1"),
            Some("abc-DEF_123".to_string())
        );
        assert_eq!(notebook_id_from_url("https://example.com/other"), None);
        assert_eq!(notebook_id_from_url("https://x/notebook/"), None);
    }

    #[test]
    fn test_output_path_sanitizes_title() {
        let config = GenerationConfig::default();
        let adapter = NotebookCliAdapter::new(config, PathBuf::from("/tmp/dl"));
        let path = adapter.output_path("Rust: Fearless   Concurrency!");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Rust_Fearless_Concurrency_"));
        assert!(name.ends_with(".mp3"));
        assert!(!name.contains(':'));
        assert!(!name.contains('!'));
    }

    #[tokio::test]
    async fn test_initialize_accepts_authenticated_cli() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(
            &dir,
            r#"case "$1" in
  --version) echo "0.9.1" ;;
  auth) echo '{"status": "ok"}' ;;
esac"#,
        );
        adapter.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_rejects_unauthenticated_cli() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(
            &dir,
            r#"case "$1" in
  --version) echo "0.9.1" ;;
  auth) echo '{"status": "expired"}' ;;
esac"#,
        );
        let err = adapter.initialize().await.unwrap_err();
        assert!(matches!(err, GenerationError::Adapter(msg) if msg.contains("expired")));
    }

    #[tokio::test]
    async fn test_create_runs_the_full_command_sequence() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("calls.log");
        let body = format!(
            r#"echo "$@" >> {log}
case "$1" in
  create) echo "notebook nb0123456789 created" ;;
  source)
    if [ "$2" = "add" ]; then echo "source src0123456789 added"; fi ;;
  artifact) echo '{{"artifacts": [{{"id": "art0123456789", "status": "generating", "title": "Fearless Concurrency"}}]}}' ;;
esac"#,
            log = log.display()
        );
        let adapter = adapter_with(&dir, &body);

        let handle = adapter
            .create_notebook_and_generate_audio("https://example.com/post")
            .await
            .unwrap();
        assert_eq!(
            handle.notebook_url,
            "https://notebooklm.google.com/notebook/nb0123456789"
        );
        assert_eq!(handle.title, "Fearless Concurrency");

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert!(lines[0].starts_with("create Podcast"));
        assert_eq!(lines[1], "use nb0123456789");
        assert_eq!(lines[2], "language set en");
        assert_eq!(lines[3], "source add https://example.com/post");
        assert!(lines[4].starts_with("source wait src0123456789"));
        assert_eq!(lines[5], "generate audio --json");
    }

    #[tokio::test]
    async fn test_rejected_source_maps_to_invalid_resource() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(
            &dir,
            r#"case "$1" in
  create) echo "notebook nb0123456789 created" ;;
  source)
    if [ "$2" = "add" ]; then
      echo "UNSUPPORTED_SOURCE: paywalled content" >&2
      exit 1
    fi ;;
esac"#,
        );

        let err = adapter
            .create_notebook_and_generate_audio("https://example.com/paywalled")
            .await
            .unwrap_err();
        match err {
            GenerationError::InvalidResource { reason } => {
                assert!(reason.contains("paywalled content"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trigger_without_artifact_times_out_with_attempts() {
        let dir = TempDir::new().unwrap();
        let mut config = GenerationConfig::default();
        config.command = fake_cli(
            &dir,
            r#"case "$1" in
  create) echo "notebook nb0123456789 created" ;;
  source)
    if [ "$2" = "add" ]; then echo "source src0123456789 added"; fi ;;
  artifact) echo '{"artifacts": []}' ;;
esac"#,
        );
        config.retry_pause_secs = 0;
        config.generation_retries = 2;
        let adapter = NotebookCliAdapter::new(config, dir.path().join("downloads"));

        let err = adapter
            .create_notebook_and_generate_audio("https://example.com/post")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::StartTimedOut { attempts: 2 }
        ));
    }

    #[tokio::test]
    async fn test_download_requires_a_notebook() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, "exit 0");
        let err = adapter.download_audio().await.unwrap_err();
        assert!(matches!(err, GenerationError::Adapter(_)));
    }

    #[tokio::test]
    async fn test_open_and_download_completed_artifact() {
        let dir = TempDir::new().unwrap();
        let body = r#"case "$1" in
  artifact)
    if [ "$2" = "list" ]; then
      echo '{"artifacts": [{"id": "art0123456789", "status": "completed", "title": "Old Episode"}]}'
    fi ;;
  download) : > "$3" ;;
esac"#;
        let adapter = adapter_with(&dir, body);

        adapter
            .open_existing_notebook("https://notebooklm.google.com/notebook/nb0123456789")
            .await
            .unwrap();
        let path = adapter.download_audio().await.unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Old_Episode_"));
        assert!(path.exists());

        let details = adapter.get_podcast_details().await.unwrap();
        assert_eq!(details.title, "Old Episode");
        assert_eq!(details.description, "Generated podcast");
    }

    #[tokio::test]
    async fn test_open_rejects_foreign_urls() {
        let dir = TempDir::new().unwrap();
        let adapter = adapter_with(&dir, "exit 0");
        let err = adapter
            .open_existing_notebook("https://example.com/not-a-notebook")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Adapter(_)));
    }
}
