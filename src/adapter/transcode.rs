//! MP3 transcoding through the ffmpeg binary.
//!
//! The generation service hands back WAV audio; the hosting platform wants
//! MP3. This shells out to ffmpeg with the bitrate, quality, sample-rate
//! and channel settings from configuration. Input that is already MP3 is
//! copied through unchanged.

use super::command::run_checked;
use super::{AudioTranscoder, TranscodeOptions, TranscodeOutput};
use crate::config::TranscodeConfig;
use crate::error::TranscodeError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Transcoder backed by ffmpeg with the libmp3lame encoder.
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Output file path: the input's stem with an `.mp3` extension, placed
    /// in the options' output directory.
    fn output_path(
        &self,
        input: &Path,
        options: &TranscodeOptions,
    ) -> Result<PathBuf, TranscodeError> {
        let stem = input.file_stem().ok_or_else(|| TranscodeError::Io {
            path: input.to_path_buf(),
            reason: "input file has no name".to_string(),
        })?;
        let mut name = stem.to_os_string();
        name.push(".mp3");
        Ok(options.output_dir.join(name))
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn convert(
        &self,
        input: &Path,
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError> {
        tokio::fs::create_dir_all(&options.output_dir)
            .await
            .map_err(|e| TranscodeError::Io {
                path: options.output_dir.clone(),
                reason: e.to_string(),
            })?;

        let output_path = self.output_path(input, options)?;
        let input_bytes = file_size(input).await?;

        let already_mp3 = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
        if already_mp3 {
            if input != output_path {
                tokio::fs::copy(input, &output_path)
                    .await
                    .map_err(|e| TranscodeError::Io {
                        path: output_path.clone(),
                        reason: e.to_string(),
                    })?;
            }
            info!(input = %input.display(), "Input is already MP3; copied through");
            return Ok(TranscodeOutput {
                output_path,
                input_bytes,
                output_bytes: input_bytes,
            });
        }

        debug!(
            input = %input.display(),
            output = %output_path.display(),
            "Converting audio to MP3"
        );

        let quality = self.config.quality.to_string();
        let sample_rate = self.config.sample_rate.to_string();
        let channels = self.config.channels.to_string();

        let mut command = Command::new(&self.config.command);
        command
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-b:a", self.config.bitrate.as_str()])
            .args(["-q:a", quality.as_str()])
            .args(["-ar", sample_rate.as_str()])
            .args(["-ac", channels.as_str()])
            .args(["-codec:a", "libmp3lame"])
            .arg(&output_path);

        run_checked(&mut command, &self.config.command, self.config.timeout()).await?;

        let output_bytes = file_size(&output_path).await?;
        info!(
            input_bytes,
            output_bytes,
            output = %output_path.display(),
            "Transcoding finished"
        );

        Ok(TranscodeOutput {
            output_path,
            input_bytes,
            output_bytes,
        })
    }
}

async fn file_size(path: &Path) -> Result<u64, TranscodeError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| TranscodeError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(metadata.len())
}
