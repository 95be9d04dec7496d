use anyhow::Context;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use super::{MediaExtractor, MediaInfo};
use crate::config::YtDlpConfig;
use crate::Result;

/// Output name pattern for files written by yt-dlp inside a job directory
const OUTPUT_TEMPLATE: &str = "%(title).80B-%(id)s.%(ext)s";

/// Extractor backed by the yt-dlp command line tool
pub struct YtDlpExtractor {
    yt_dlp_path: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &YtDlpConfig, timeout: Duration) -> Self {
        Self {
            yt_dlp_path: config.binary.clone(),
            extra_args: config.extra_args.clone(),
            timeout,
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Run yt-dlp with the configured extra arguments, bounded by the timeout
    async fn run(&self, args: Vec<OsString>) -> Result<Output> {
        tracing::debug!("Running {} {:?}", self.yt_dlp_path, args);

        let command = Command::new(&self.yt_dlp_path)
            .args(&self.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| {
                anyhow::anyhow!("yt-dlp did not finish within {}s", self.timeout.as_secs())
            })?
            .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        if !output.status.success() {
            anyhow::bail!("{}", error_message(&output.stderr));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(&self, url: &str) -> Result<MediaInfo> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self
            .run(vec![
                "--dump-json".into(),
                "--no-playlist".into(),
                "--no-warnings".into(),
                url.into(),
            ])
            .await?;

        let info: MediaInfo = serde_json::from_slice(&output.stdout)
            .context("yt-dlp returned malformed JSON")?;

        tracing::debug!("yt-dlp reported {} formats for {}", info.formats.len(), url);
        Ok(info)
    }

    async fn download_audio(&self, url: &str, output_dir: &Path, bitrate_kbps: u32) -> Result<()> {
        tracing::debug!("Downloading audio as {}kbps MP3 for: {}", bitrate_kbps, url);

        self.run(vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            format!("{}K", bitrate_kbps).into(),
            "--no-playlist".into(),
            "--quiet".into(),
            "--output".into(),
            output_dir.join(OUTPUT_TEMPLATE).into_os_string(),
            url.into(),
        ])
        .await?;

        Ok(())
    }

    async fn download_format(&self, url: &str, format_id: &str, output_dir: &Path) -> Result<()> {
        tracing::debug!("Downloading format {} for: {}", format_id, url);

        self.run(vec![
            "--format".into(),
            format_id.into(),
            "--no-playlist".into(),
            "--quiet".into(),
            "--output".into(),
            output_dir.join(OUTPUT_TEMPLATE).into_os_string(),
            url.into(),
        ])
        .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Last meaningful stderr line, stripped of yt-dlp's "ERROR:" prefix
fn error_message(stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let line = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("yt-dlp exited with an error");

    line.strip_prefix("ERROR:")
        .map(str::trim)
        .unwrap_or(line)
        .to_string()
}
