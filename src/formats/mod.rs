//! Reduction of raw stream lists into what the front-end shows.
//!
//! Video descriptors collapse into at most three quality tiers (Low,
//! Standard, High), each represented by its tallest stream. Audio gets one
//! synthetic "convert to MP3" entry plus whatever audio-only streams exist.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub mod audio;

pub use audio::{build_audio_options, AudioOption};

use crate::extractors::{MediaInfo, StreamDescriptor};
use crate::utils::truncate_description;

/// User-facing quality bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierName {
    Low,
    Standard,
    High,
    #[serde(rename = "Best Available")]
    BestAvailable,
    Available,
}

impl TierName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Low => "Low",
            TierName::Standard => "Standard",
            TierName::High => "High",
            TierName::BestAvailable => "Best Available",
            TierName::Available => "Available",
        }
    }
}

impl std::fmt::Display for TierName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TierRange {
    name: TierName,
    heights: RangeInclusive<u32>,
    label: &'static str,
}

/// Partition applied in this order; ranges are inclusive and do not overlap
const TIERS: [TierRange; 3] = [
    TierRange {
        name: TierName::Low,
        heights: 0..=480,
        label: "Low Quality (480p)",
    },
    TierRange {
        name: TierName::Standard,
        heights: 481..=720,
        label: "Standard Quality (720p)",
    },
    TierRange {
        name: TierName::High,
        heights: 721..=u32::MAX,
        label: "High Quality (1080p+)",
    },
];

/// A classified video option; the descriptor is a copy of the chosen stream
/// whose `filesize` already holds the declared or approximate size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityTier {
    #[serde(rename = "quality_label")]
    pub tier: TierName,

    #[serde(rename = "quality_display")]
    pub display_label: String,

    #[serde(flatten)]
    pub descriptor: StreamDescriptor,
}

impl QualityTier {
    fn new(tier: TierName, display_label: impl Into<String>, descriptor: &StreamDescriptor) -> Self {
        let mut descriptor = descriptor.clone();
        descriptor.filesize = descriptor.size();
        Self {
            tier,
            display_label: display_label.into(),
            descriptor,
        }
    }

    pub fn format_id(&self) -> &str {
        &self.descriptor.format_id
    }

    pub fn height(&self) -> Option<u32> {
        self.descriptor.height
    }
}

/// Collapse video descriptors into Low/Standard/High tiers.
///
/// The input is expected to be limited to video containers already. When no
/// descriptor has a usable height every input entry is returned labelled
/// "Available", so a non-empty input never yields an empty result.
pub fn classify(formats: &[StreamDescriptor]) -> Vec<QualityTier> {
    let mut ranked: Vec<(u32, &StreamDescriptor)> = formats
        .iter()
        .filter_map(|format| format.height.filter(|h| *h > 0).map(|h| (h, format)))
        .collect();

    if ranked.is_empty() {
        return formats
            .iter()
            .map(|format| {
                QualityTier::new(
                    TierName::Available,
                    format!("Format ({})", format.ext_upper()),
                    format,
                )
            })
            .collect();
    }

    // stable, so equal heights keep their input order
    ranked.sort_by_key(|(height, _)| *height);

    let mut tiers: Vec<QualityTier> = TIERS
        .iter()
        .filter_map(|range| {
            tallest(ranked.iter().filter(|(height, _)| range.heights.contains(height)))
                .map(|format| QualityTier::new(range.name, range.label, format))
        })
        .collect();

    if tiers.is_empty() {
        if let Some((height, format)) = ranked.last() {
            tiers.push(QualityTier::new(
                TierName::BestAvailable,
                format!("Best Quality ({}p)", height),
                format,
            ));
        }
    }

    tiers
}

/// First descriptor holding the maximum height
fn tallest<'a, I>(candidates: I) -> Option<&'a StreamDescriptor>
where
    I: Iterator<Item = &'a (u32, &'a StreamDescriptor)>,
{
    let mut best: Option<&'a (u32, &'a StreamDescriptor)> = None;
    for entry in candidates {
        if best.map_or(true, |current| entry.0 > current.0) {
            best = Some(entry);
        }
    }
    best.map(|(_, format)| *format)
}

/// Body of a successful `/api/search`
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub title: String,
    pub duration: f64,
    pub thumbnail: String,
    pub formats: Vec<QualityTier>,
    pub audio_formats: Vec<AudioOption>,
    pub uploader: String,
    pub view_count: u64,
    pub description: String,
}

impl SearchResponse {
    pub fn from_media(info: &MediaInfo) -> Self {
        Self {
            title: info
                .title
                .clone()
                .unwrap_or_else(|| "Unknown Title".to_string()),
            duration: info.duration.unwrap_or_default(),
            thumbnail: info.thumbnail.clone().unwrap_or_default(),
            formats: classify(&info.video_candidates()),
            audio_formats: build_audio_options(&info.formats),
            uploader: info
                .uploader
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            view_count: info.view_count.unwrap_or_default(),
            description: info
                .description
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(truncate_description)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, height: Option<u32>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            ext: Some("mp4".to_string()),
            height,
            vcodec: Some("avc1".to_string()),
            acodec: Some("none".to_string()),
            ..Default::default()
        }
    }

    fn summary(tiers: &[QualityTier]) -> Vec<(TierName, Option<u32>)> {
        tiers.iter().map(|t| (t.tier, t.height())).collect()
    }

    #[test]
    fn test_three_tiers() {
        let formats: Vec<_> = [1080, 360, 720, 480]
            .iter()
            .map(|h| video(&h.to_string(), Some(*h)))
            .collect();

        let tiers = classify(&formats);
        assert_eq!(
            summary(&tiers),
            vec![
                (TierName::Low, Some(480)),
                (TierName::Standard, Some(720)),
                (TierName::High, Some(1080)),
            ]
        );
        assert_eq!(tiers[0].display_label, "Low Quality (480p)");
        assert_eq!(tiers[1].display_label, "Standard Quality (720p)");
        assert_eq!(tiers[2].display_label, "High Quality (1080p+)");
    }

    #[test]
    fn test_only_low_heights() {
        let formats = vec![video("160", Some(144)), video("133", Some(240))];
        let tiers = classify(&formats);
        assert_eq!(summary(&tiers), vec![(TierName::Low, Some(240))]);
        assert_eq!(tiers[0].format_id(), "133");
    }

    #[test]
    fn test_empty_input() {
        assert!(classify(&[]).is_empty());
    }

    #[test]
    fn test_no_valid_heights_keeps_every_entry() {
        let mut unknown = video("x", None);
        unknown.ext = None;
        let formats = vec![video("a", Some(0)), unknown, video("b", None)];

        let tiers = classify(&formats);
        assert_eq!(tiers.len(), 3);
        assert!(tiers.iter().all(|t| t.tier == TierName::Available));
        assert_eq!(tiers[0].display_label, "Format (MP4)");
        assert_eq!(tiers[1].display_label, "Format (UNKNOWN)");
        assert_eq!(tiers[2].format_id(), "b");
    }

    #[test]
    fn test_unranked_entries_are_dropped_when_others_are_valid() {
        let formats = vec![video("a", None), video("b", Some(0)), video("c", Some(1440))];
        let tiers = classify(&formats);
        assert_eq!(summary(&tiers), vec![(TierName::High, Some(1440))]);
    }

    #[test]
    fn test_boundaries() {
        let formats = vec![video("a", Some(481)), video("b", Some(721)), video("c", Some(1))];
        let tiers = classify(&formats);
        assert_eq!(
            summary(&tiers),
            vec![
                (TierName::Low, Some(1)),
                (TierName::Standard, Some(481)),
                (TierName::High, Some(721)),
            ]
        );
    }

    #[test]
    fn test_equal_heights_pick_first_in_input_order() {
        let formats = vec![video("first", Some(720)), video("second", Some(720))];
        let tiers = classify(&formats);
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].format_id(), "first");
    }

    #[test]
    fn test_tier_names_are_unique_and_in_range() {
        let formats: Vec<_> = (1..=25)
            .map(|i| video(&i.to_string(), Some(i * 97)))
            .collect();
        let tiers = classify(&formats);

        let mut names: Vec<_> = tiers.iter().map(|t| t.tier).collect();
        names.dedup();
        assert_eq!(names.len(), tiers.len());
        for tier in &tiers {
            let range = TIERS.iter().find(|r| r.name == tier.tier).unwrap();
            assert!(range.heights.contains(&tier.height().unwrap()));
        }
    }

    #[test]
    fn test_input_is_not_modified() {
        let formats = vec![video("a", Some(360)), video("b", Some(720))];
        let before = formats.clone();
        let _ = classify(&formats);
        assert_eq!(formats, before);
    }

    #[test]
    fn test_tier_serialization_is_flat() {
        let tiers = classify(&[video("22", Some(720))]);
        let value = serde_json::to_value(&tiers[0]).unwrap();
        assert_eq!(value["format_id"], "22");
        assert_eq!(value["height"], 720);
        assert_eq!(value["quality_label"], "Standard");
        assert_eq!(value["quality_display"], "Standard Quality (720p)");

        let best = serde_json::to_value(TierName::BestAvailable).unwrap();
        assert_eq!(best, "Best Available");
    }

    #[test]
    fn test_tier_reports_approximate_size() {
        let formats = vec![StreamDescriptor {
            filesize: 0,
            filesize_approx: 5_000_000,
            ..video("22", Some(720))
        }];

        let tiers = classify(&formats);
        let value = serde_json::to_value(&tiers[0]).unwrap();
        assert_eq!(value["filesize"], 5_000_000);
        assert_eq!(formats[0].filesize, 0);

        let declared = classify(&[StreamDescriptor {
            filesize: 1_000,
            filesize_approx: 5_000_000,
            ..video("22", Some(720))
        }]);
        assert_eq!(declared[0].descriptor.filesize, 1_000);
    }

    #[test]
    fn test_search_response_defaults() {
        let info = MediaInfo {
            description: Some("x".repeat(300)),
            formats: vec![
                video("18", Some(360)),
                StreamDescriptor {
                    format_id: "140".to_string(),
                    ext: Some("m4a".to_string()),
                    acodec: Some("mp4a.40.2".to_string()),
                    vcodec: Some("none".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let response = SearchResponse::from_media(&info);
        assert_eq!(response.title, "Unknown Title");
        assert_eq!(response.uploader, "Unknown");
        assert_eq!(response.view_count, 0);
        assert_eq!(response.description.chars().count(), 203);
        assert!(response.description.ends_with("..."));
        assert_eq!(response.formats.len(), 1);
        assert_eq!(response.audio_formats.len(), 2);
        assert_eq!(response.audio_formats[1].format_id, "140");
    }
}
