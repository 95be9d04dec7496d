use serde::Serialize;

use crate::extractors::StreamDescriptor;

/// Format id yt-dlp understands as "best audio, else best overall"
pub const BEST_AUDIO_FORMAT_ID: &str = "bestaudio/best";

/// Bitrate of the synthetic MP3 option
pub const MP3_BITRATE_KBPS: u32 = 192;

const AUDIO_CONTAINERS: &[&str] = &["mp3", "m4a", "webm"];

/// An audio download choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioOption {
    pub format_id: String,
    pub ext: String,
    /// 0 until the file is actually produced
    pub filesize: u64,
    pub url: String,
    pub abr: f64,
    pub quality_label: String,
    pub quality_display: String,
}

impl AudioOption {
    /// The "convert the best audio to MP3" entry, resolved at download time
    pub fn mp3_conversion() -> Self {
        Self {
            format_id: BEST_AUDIO_FORMAT_ID.to_string(),
            ext: "mp3".to_string(),
            filesize: 0,
            url: String::new(),
            abr: f64::from(MP3_BITRATE_KBPS),
            quality_label: "MP3 Audio".to_string(),
            quality_display: format!("High Quality MP3 ({}kbps)", MP3_BITRATE_KBPS),
        }
    }

    fn from_descriptor(format: &StreamDescriptor) -> Self {
        let ext = format.ext.clone().unwrap_or_default();
        let abr = format.abr.unwrap_or_default();
        let upper = ext.to_uppercase();

        Self {
            format_id: format.format_id.clone(),
            filesize: format.size(),
            url: format.url.clone(),
            abr,
            quality_label: format!("{} Audio", upper),
            quality_display: format!("{}kbps {}", abr, upper),
            ext,
        }
    }
}

/// Synthetic MP3 entry followed by the audio-only, non-webm streams in input order.
///
/// WebM audio is skipped since the MP3 conversion covers it. Duplicates in the
/// input are passed through untouched.
pub fn build_audio_options(formats: &[StreamDescriptor]) -> Vec<AudioOption> {
    std::iter::once(AudioOption::mp3_conversion())
        .chain(
            formats
                .iter()
                .filter(|format| format.ext_is(AUDIO_CONTAINERS) && format.is_audio_only())
                .filter(|format| !format.ext_is(&["webm"]))
                .map(AudioOption::from_descriptor),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(id: &str, ext: &str, abr: f64) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            ext: Some(ext.to_string()),
            acodec: Some("opus".to_string()),
            vcodec: Some("none".to_string()),
            abr: Some(abr),
            filesize_approx: 4096,
            url: format!("https://cdn.example.com/{id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_synthetic_entry_always_first() {
        let options = build_audio_options(&[]);
        assert_eq!(options, vec![AudioOption::mp3_conversion()]);
        assert_eq!(options[0].format_id, "bestaudio/best");
        assert_eq!(options[0].quality_display, "High Quality MP3 (192kbps)");
        assert_eq!(options[0].abr, 192.0);
        assert!(options[0].url.is_empty());
    }

    #[test]
    fn test_webm_is_excluded() {
        let formats = vec![audio("251", "webm", 160.0), audio("140", "m4a", 129.5)];
        let options = build_audio_options(&formats);

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].format_id, "bestaudio/best");
        assert_eq!(options[1].format_id, "140");
        assert_eq!(options[1].quality_label, "M4A Audio");
        assert_eq!(options[1].quality_display, "129.5kbps M4A");
        assert_eq!(options[1].filesize, 4096);
    }

    #[test]
    fn test_streams_with_video_are_excluded() {
        let mut muxed = audio("18", "mp4", 96.0);
        muxed.vcodec = Some("avc1".to_string());
        let mut silent = audio("139", "m4a", 48.0);
        silent.acodec = Some("none".to_string());
        let mut unknown_video = audio("x", "m4a", 48.0);
        unknown_video.vcodec = None;

        let options = build_audio_options(&[muxed, silent, unknown_video]);
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_duplicates_pass_through_in_order() {
        let formats = vec![
            audio("140", "m4a", 128.0),
            audio("mp3-1", "mp3", 320.0),
            audio("140", "m4a", 128.0),
        ];
        let ids: Vec<_> = build_audio_options(&formats)
            .into_iter()
            .map(|o| o.format_id)
            .collect();
        assert_eq!(ids, vec!["bestaudio/best", "140", "mp3-1", "140"]);
    }

    #[test]
    fn test_missing_bitrate_displays_zero() {
        let mut format = audio("140", "m4a", 0.0);
        format.abr = None;
        let options = build_audio_options(&[format]);
        assert_eq!(options[1].quality_display, "0kbps M4A");
    }
}
