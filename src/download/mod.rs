use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::Config;
use crate::extractors::{MediaExtractor, MediaInfo, StreamDescriptor};
use crate::utils::sanitize_title;
use crate::DownloaderError;

/// What the user asked to download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl MediaKind {
    /// Only the exact value "audio" selects audio; anything else is video
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some("audio") => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }
}

/// Direct link for a chosen format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDownload {
    pub download_url: String,
    pub filename: String,
    pub filesize: u64,
    pub title: String,
}

/// Map a format id back to its direct URL.
///
/// Audio requests whose id is unknown (such as the synthetic MP3 entry) fall
/// back to the first audio-only mp3/m4a stream. Only that first candidate is
/// considered; if it has no URL the request is `NotFound`.
pub fn resolve_download(
    info: &MediaInfo,
    format_id: &str,
    kind: MediaKind,
) -> Result<ResolvedDownload, DownloaderError> {
    let exact = info
        .formats
        .iter()
        .find(|format| format.format_id == format_id)
        .filter(|format| !format.url.is_empty());

    let chosen = match (exact, kind) {
        (Some(format), _) => Some(format),
        (None, MediaKind::Audio) => fallback_audio(&info.formats),
        (None, MediaKind::Video) => None,
    }
    .filter(|format| !format.url.is_empty())
    .ok_or_else(|| DownloaderError::NotFound("Download URL not found".to_string()))?;

    let title = info.title.clone().unwrap_or_else(|| "video".to_string());

    Ok(ResolvedDownload {
        download_url: chosen.url.clone(),
        filename: download_filename(&title, kind.extension()),
        filesize: chosen.size(),
        title,
    })
}

fn fallback_audio(formats: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    formats
        .iter()
        .find(|format| format.is_audio_only() && format.ext_is(&["mp3", "m4a"]))
}

/// "<sanitized title>.<ext>", using "video" when nothing of the title survives
pub fn download_filename(title: &str, extension: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() { "video" } else { stem.as_str() };
    format!("{}.{}", stem, extension)
}

/// A finished local download; its job directory is removed on drop
#[derive(Debug)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    job_dir: TempDir,
}

impl DownloadedFile {
    pub fn job_dir(&self) -> &Path {
        self.job_dir.path()
    }
}

/// Runs extraction and local downloads on behalf of the HTTP layer
#[derive(Clone)]
pub struct Downloader {
    extractor: Arc<dyn MediaExtractor>,
    temp_root: PathBuf,
    max_file_size: u64,
    audio_bitrate_kbps: u32,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn MediaExtractor>, config: &Config) -> Self {
        Self {
            extractor,
            temp_root: config.temp_root(),
            max_file_size: config.download.max_file_size,
            audio_bitrate_kbps: config.download.audio_bitrate_kbps,
        }
    }

    /// Extract metadata, reporting failures as `ExtractionFailure`
    pub async fn extract(&self, url: &str) -> Result<MediaInfo, DownloaderError> {
        tracing::info!("Extracting media information from URL: {}", url);

        self.extractor.extract(url).await.map_err(|err| {
            tracing::warn!("{} could not extract {}: {:#}", self.extractor.name(), url, err);
            DownloaderError::ExtractionFailure(format!("{:#}", err))
        })
    }

    /// Resolve `format_id` of `url` to a direct download link
    pub async fn resolve(
        &self,
        url: &str,
        format_id: &str,
        kind: MediaKind,
    ) -> Result<ResolvedDownload, DownloaderError> {
        let info = self.extract(url).await?;
        resolve_download(&info, format_id, kind)
    }

    /// Download (and for audio, transcode) into a fresh job directory
    pub async fn download_to_file(
        &self,
        url: &str,
        format_id: &str,
        kind: MediaKind,
    ) -> Result<DownloadedFile, DownloaderError> {
        let info = self.extract(url).await?;
        let title = info.title.as_deref().unwrap_or("video");

        let job_id = Uuid::new_v4().simple().to_string();
        let job_dir = self.create_job_dir(&job_id).await?;
        let is_audio = kind == MediaKind::Audio || is_audio_format_id(format_id);

        tracing::info!(
            job_id = %job_id,
            "Downloading {} ({}) into {}",
            url,
            if is_audio { "audio" } else { format_id },
            job_dir.path().display()
        );

        let result = if is_audio {
            self.extractor
                .download_audio(url, job_dir.path(), self.audio_bitrate_kbps)
                .await
        } else {
            self.extractor
                .download_format(url, format_id, job_dir.path())
                .await
        };
        result.map_err(|err| DownloaderError::DownloadFailure(format!("Download failed: {:#}", err)))?;

        let path = find_output(job_dir.path(), is_audio).await?;
        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|err| DownloaderError::DownloadFailure(format!("Cannot read downloaded file: {}", err)))?
            .len();

        if size == 0 {
            return Err(DownloaderError::DownloadFailure("Downloaded file is empty".to_string()));
        }

        if size > self.max_file_size {
            return Err(DownloaderError::DownloadFailure(format!(
                "File exceeds the {} limit",
                crate::utils::format_file_size(self.max_file_size)
            )));
        }

        let extension = if is_audio {
            "mp3"
        } else {
            path.extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or(MediaKind::Video.extension())
        };
        let filename = download_filename(title, extension);

        tracing::info!(job_id = %job_id, "Downloaded {} ({} bytes)", filename, size);

        Ok(DownloadedFile {
            path,
            filename,
            size,
            job_dir,
        })
    }

    async fn create_job_dir(&self, job_id: &str) -> Result<TempDir, DownloaderError> {
        tokio::fs::create_dir_all(&self.temp_root)
            .await
            .map_err(|err| {
                DownloaderError::DownloadFailure(format!(
                    "Cannot create {}: {}",
                    self.temp_root.display(),
                    err
                ))
            })?;

        tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(&self.temp_root)
            .map_err(|err| DownloaderError::DownloadFailure(format!("Cannot create job directory: {}", err)))
    }
}

/// Format ids that mean "audio" even when the request says video
fn is_audio_format_id(format_id: &str) -> bool {
    format_id.starts_with("bestaudio") || format_id.to_lowercase().contains("audio")
}

/// Locate the file yt-dlp produced, preferring an MP3 for audio jobs
async fn find_output(job_dir: &Path, want_mp3: bool) -> Result<PathBuf, DownloaderError> {
    let not_found = || DownloaderError::DownloadFailure("Downloaded file not found".to_string());

    let mut entries = tokio::fs::read_dir(job_dir).await.map_err(|_| not_found())?;
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_partial = path
            .extension()
            .is_some_and(|ext| ext == "part" || ext == "ytdl");
        if path.is_file() && !is_partial {
            files.push(path);
        }
    }
    files.sort();

    let mp3 = files
        .iter()
        .position(|path| path.extension().is_some_and(|ext| ext == "mp3"));

    match (want_mp3, mp3) {
        (true, Some(index)) => Ok(files.swap_remove(index)),
        (true, None) => Err(not_found()),
        (false, _) => files.into_iter().next().ok_or_else(not_found),
    }
}
