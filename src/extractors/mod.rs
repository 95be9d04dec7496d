use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use url::Url;

pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use crate::Result;

/// Containers offered as video downloads
pub const VIDEO_CONTAINERS: &[&str] = &["mp4", "webm", "mkv"];

/// One stream variant reported by the extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Opaque identifier, unique within one extraction response
    #[serde(default)]
    pub format_id: String,

    /// Container extension (mp4, webm, m4a, ...)
    #[serde(default)]
    pub ext: Option<String>,

    /// Human readable resolution such as "1280x720" or "audio only"
    #[serde(default)]
    pub resolution: Option<String>,

    /// Frame height in pixels; anything non-numeric or negative becomes `None`
    #[serde(default, deserialize_with = "deserialize_height")]
    pub height: Option<u32>,

    /// Declared size in bytes, 0 when unknown
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize: u64,

    /// Estimated size in bytes, 0 when unknown
    #[serde(default, deserialize_with = "deserialize_size")]
    pub filesize_approx: u64,

    #[serde(default)]
    pub acodec: Option<String>,

    #[serde(default)]
    pub vcodec: Option<String>,

    /// Average audio bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,

    /// yt-dlp's own preference rank
    #[serde(default)]
    pub quality: Option<f64>,

    /// Direct stream URL, may be empty
    #[serde(default)]
    pub url: String,
}

impl StreamDescriptor {
    /// Declared size, falling back to the approximate one
    pub fn size(&self) -> u64 {
        if self.filesize > 0 {
            self.filesize
        } else {
            self.filesize_approx
        }
    }

    /// yt-dlp marks a missing track with the literal codec "none"
    pub fn has_audio_codec(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }

    pub fn has_no_video_codec(&self) -> bool {
        self.vcodec.as_deref() == Some("none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio_codec() && self.has_no_video_codec()
    }

    pub fn ext_is(&self, candidates: &[&str]) -> bool {
        self.ext
            .as_deref()
            .is_some_and(|ext| candidates.contains(&ext))
    }

    /// Container in upper case, "Unknown" when absent
    pub fn ext_upper(&self) -> String {
        self.ext
            .as_deref()
            .unwrap_or("Unknown")
            .to_uppercase()
    }
}

/// Metadata and stream list for one media page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub title: Option<String>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub uploader: Option<String>,

    #[serde(default)]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub view_count: Option<u64>,

    #[serde(default, deserialize_with = "deserialize_formats")]
    pub formats: Vec<StreamDescriptor>,
}

impl MediaInfo {
    /// Descriptors in the containers offered as video downloads
    pub fn video_candidates(&self) -> Vec<StreamDescriptor> {
        self.formats
            .iter()
            .filter(|format| format.ext_is(VIDEO_CONTAINERS))
            .cloned()
            .collect()
    }
}

/// Boundary to the library that turns a page URL into stream descriptors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Resolve a page URL into metadata and its stream descriptors
    async fn extract(&self, url: &str) -> Result<MediaInfo>;

    /// Download the best audio of `url` and transcode it to an MP3 in `output_dir`
    async fn download_audio(&self, url: &str, output_dir: &Path, bitrate_kbps: u32) -> Result<()>;

    /// Download the variant `format_id` of `url` into `output_dir`
    async fn download_format(&self, url: &str, format_id: &str, output_dir: &Path) -> Result<()>;

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        anyhow::bail!("URL has no host: {}", url);
    }

    Ok(parsed)
}

fn deserialize_height<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let height = match value {
        Some(serde_json::Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|h| *h >= 0.0).map(|h| h as u64)),
        Some(serde_json::Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    Ok(height.and_then(|h| u32::try_from(h).ok()))
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|size| *size > 0.0).map_or(0, |size| size as u64))
}

fn deserialize_formats<'de, D>(deserializer: D) -> std::result::Result<Vec<StreamDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<StreamDescriptor>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_height_normalization() {
        let parsed: Vec<StreamDescriptor> = serde_json::from_value(json!([
            {"format_id": "a", "height": 720},
            {"format_id": "b", "height": 480.0},
            {"format_id": "c", "height": null},
            {"format_id": "d", "height": -1},
            {"format_id": "e", "height": "1080"},
            {"format_id": "f", "height": "tall"},
            {"format_id": "g"},
        ]))
        .unwrap();

        let heights: Vec<_> = parsed.iter().map(|f| f.height).collect();
        assert_eq!(
            heights,
            vec![Some(720), Some(480), None, None, Some(1080), None, None]
        );
    }

    #[test]
    fn test_size_prefers_declared() {
        let declared = StreamDescriptor {
            filesize: 10,
            filesize_approx: 20,
            ..Default::default()
        };
        let approx = StreamDescriptor {
            filesize_approx: 20,
            ..Default::default()
        };
        assert_eq!(declared.size(), 10);
        assert_eq!(approx.size(), 20);
        assert_eq!(StreamDescriptor::default().size(), 0);
    }

    #[test]
    fn test_null_sizes_and_formats() {
        let info: MediaInfo = serde_json::from_value(json!({
            "title": "clip",
            "formats": null,
        }))
        .unwrap();
        assert!(info.formats.is_empty());

        let format: StreamDescriptor = serde_json::from_value(json!({
            "format_id": "18",
            "filesize": null,
            "filesize_approx": 1234.7,
        }))
        .unwrap();
        assert_eq!(format.size(), 1234);
    }

    #[test]
    fn test_codec_predicates() {
        let audio = StreamDescriptor {
            acodec: Some("mp4a.40.2".into()),
            vcodec: Some("none".into()),
            ..Default::default()
        };
        let muxed = StreamDescriptor {
            acodec: Some("mp4a.40.2".into()),
            vcodec: Some("avc1".into()),
            ..Default::default()
        };
        let video_only = StreamDescriptor {
            acodec: Some("none".into()),
            vcodec: Some("vp9".into()),
            ..Default::default()
        };
        assert!(audio.is_audio_only());
        assert!(!muxed.is_audio_only());
        assert!(!video_only.has_audio_codec());
        // yt-dlp omits codecs it could not detect
        assert!(StreamDescriptor::default().has_audio_codec());
        assert!(!StreamDescriptor::default().has_no_video_codec());
    }

    #[test]
    fn test_video_candidates() {
        let info = MediaInfo {
            formats: ["mp4", "m4a", "webm", "mkv", "3gp"]
                .iter()
                .map(|ext| StreamDescriptor {
                    format_id: ext.to_string(),
                    ext: Some(ext.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let ids: Vec<_> = info
            .video_candidates()
            .into_iter()
            .map(|f| f.format_id)
            .collect();
        assert_eq!(ids, vec!["mp4", "webm", "mkv"]);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("http://example.com/video").is_ok());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("https://").is_err());
    }
}
