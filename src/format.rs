//! Format negotiation: raw yt-dlp format records -> ranked user-facing choices
//!
//! Raw extraction metadata is noisy: dozens of near-duplicate renditions,
//! container/codec combinations and placeholder storyboard tracks. The
//! negotiator reduces that to a small monotonic ladder the user can pick from,
//! while keeping enough information (composite `video+audio` format ids) for
//! the downloader to fetch and mux the right streams.

use serde::Deserialize;

use crate::core::config;

/// One raw format record as reported by `yt-dlp --dump-json`.
///
/// yt-dlp encodes "no codec" as the literal string `"none"`, hence the
/// `has_video`/`has_audio` helpers instead of plain `Option` checks.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub format_note: Option<String>,
}

impl RawFormat {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|v| v != "none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|a| a != "none")
    }

    /// Storyboard entries are thumbnail grids, not playable renditions.
    fn is_storyboard(&self) -> bool {
        self.format_note
            .as_deref()
            .is_some_and(|note| note.to_lowercase().contains("storyboard"))
    }
}

/// A user-selectable video quality derived from the raw records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFormat {
    /// yt-dlp format selector; possibly a composite `"video+audio"` pair
    pub format_id: String,
    /// Display label, e.g. `"1080p"`
    pub resolution: String,
    pub height: u32,
    pub fps: u32,
    /// Estimated size in bytes, 0 if unknown
    pub filesize: u64,
}

impl VideoFormat {
    /// Button label: resolution plus an fps suffix for high-frame-rate tracks.
    pub fn label(&self) -> String {
        if self.fps > 30 {
            format!("{} {}fps", self.resolution, self.fps)
        } else {
            self.resolution.clone()
        }
    }
}

/// A user-selectable MP3 bitrate derived from the best audio-only track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Source format id of the best audio-only track
    pub format_id: String,
    /// Requested target bitrate (advisory; transcoding happens downstream)
    pub bitrate_kbps: u32,
    /// Estimated size of the source track in bytes, 0 if unknown
    pub filesize: u64,
}

impl AudioFormat {
    pub fn label(&self) -> String {
        format!("MP3 {}kbps", self.bitrate_kbps)
    }
}

/// Deserializes the `formats` array entry by entry, discarding entries that
/// do not parse as a format record. A bad entry never fails the whole probe.
pub fn parse_raw_formats(values: &[serde_json::Value]) -> Vec<RawFormat> {
    values
        .iter()
        .filter_map(|value| match serde_json::from_value::<RawFormat>(value.clone()) {
            Ok(fmt) => Some(fmt),
            Err(e) => {
                log::debug!("Discarding malformed format record: {}", e);
                None
            }
        })
        .collect()
}

/// Finds the audio-only record with the highest reported bitrate.
///
/// When `require_bitrate` is false a missing bitrate counts as 0 (used when
/// picking a muxing partner for video-only tracks); when true, records
/// without a bitrate are excluded entirely (the audio ladder needs a known
/// source bitrate).
fn best_audio(records: &[RawFormat], require_bitrate: bool) -> Option<&RawFormat> {
    records
        .iter()
        .filter(|f| !f.has_video() && f.has_audio())
        .filter(|f| !require_bitrate || f.abr.is_some())
        .max_by(|a, b| {
            let abr_a = a.abr.unwrap_or(0.0);
            let abr_b = b.abr.unwrap_or(0.0);
            abr_a.partial_cmp(&abr_b).unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Derives the deduplicated, descending video quality ladder.
///
/// One descriptor per distinct height; the first record seen in input order
/// wins for its height. Video-only tracks are composited with the best
/// audio-only track (`"{video}+{audio}"`) so the downloader can mux them.
pub fn derive_video_formats(records: &[RawFormat]) -> Vec<VideoFormat> {
    let best = best_audio(records, false);

    let mut seen_heights: Vec<u32> = Vec::new();
    let mut formats: Vec<VideoFormat> = Vec::new();

    for record in records {
        if !record.has_video() || record.is_storyboard() {
            continue;
        }
        let Some(height) = record.height.filter(|h| *h > 0) else {
            continue;
        };
        if seen_heights.contains(&height) {
            continue;
        }
        seen_heights.push(height);

        let format_id = if record.has_audio() {
            record.format_id.clone()
        } else if let Some(audio) = best {
            format!("{}+{}", record.format_id, audio.format_id)
        } else {
            record.format_id.clone()
        };

        let fps = record
            .fps
            .map(|f| f.round() as u32)
            .filter(|f| *f > 0)
            .unwrap_or(config::formats::DEFAULT_FPS);

        formats.push(VideoFormat {
            format_id,
            resolution: format!("{}p", height),
            height,
            fps,
            filesize: record.filesize.unwrap_or(0),
        });
    }

    // Stable sort keeps input order among (impossible) equal heights
    formats.sort_by(|a, b| b.height.cmp(&a.height));
    formats
}

/// Derives the fixed MP3 bitrate ladder over the best audio-only track.
///
/// Returns exactly 3 entries when any audio-only track with a known bitrate
/// exists, otherwise an empty list. The target bitrates are requested, not
/// native; transcoding is the download engine's job.
pub fn derive_audio_formats(records: &[RawFormat]) -> Vec<AudioFormat> {
    let Some(best) = best_audio(records, true) else {
        return Vec::new();
    };

    config::formats::AUDIO_BITRATE_LADDER
        .iter()
        .map(|&bitrate_kbps| AudioFormat {
            format_id: best.format_id.clone(),
            bitrate_kbps,
            filesize: best.filesize.unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn video(id: &str, height: u32, fps: Option<f64>) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            vcodec: Some("avc1".to_string()),
            acodec: Some("none".to_string()),
            height: Some(height),
            fps,
            abr: None,
            filesize: Some(1_000_000),
            format_note: None,
        }
    }

    fn audio(id: &str, abr: Option<f64>) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            vcodec: Some("none".to_string()),
            acodec: Some("opus".to_string()),
            height: None,
            fps: None,
            abr,
            filesize: Some(500_000),
            format_note: None,
        }
    }

    #[test]
    fn dedups_by_height_first_seen_wins() {
        let records = vec![video("v720", 720, Some(30.0)), video("v720hi", 720, Some(60.0)), audio("a1", Some(128.0))];
        let formats = derive_video_formats(&records);

        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].resolution, "720p");
        // First 720p record in input order wins, composited with the audio track
        assert_eq!(formats[0].format_id, "v720+a1");
        assert_eq!(formats[0].fps, 30);
    }

    #[test]
    fn no_two_descriptors_share_a_height() {
        let records = vec![
            video("a", 1080, None),
            video("b", 720, None),
            video("c", 1080, None),
            video("d", 360, None),
            video("e", 720, None),
        ];
        let formats = derive_video_formats(&records);
        let mut heights: Vec<u32> = formats.iter().map(|f| f.height).collect();
        let before = heights.len();
        heights.dedup();
        assert_eq!(heights.len(), before);
    }

    #[test]
    fn sorted_descending_by_height() {
        let records = vec![video("low", 360, None), video("hi", 1080, None), video("mid", 720, None)];
        let heights: Vec<u32> = derive_video_formats(&records).iter().map(|f| f.height).collect();
        assert_eq!(heights, vec![1080, 720, 360]);
    }

    #[test]
    fn skips_storyboards_and_heightless_records() {
        let mut sb = video("sb", 480, None);
        sb.format_note = Some("Storyboard".to_string());
        let mut no_height = video("nh", 0, None);
        no_height.height = None;
        let zero_height = video("zh", 0, None);

        let formats = derive_video_formats(&[sb, no_height, zero_height, video("ok", 480, None)]);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_id, "ok");
    }

    #[test]
    fn muxed_track_keeps_its_own_id() {
        let mut muxed = video("muxed", 720, None);
        muxed.acodec = Some("mp4a".to_string());
        let records = vec![muxed, audio("a1", Some(160.0))];

        assert_eq!(derive_video_formats(&records)[0].format_id, "muxed");
    }

    #[test]
    fn video_only_without_any_audio_falls_back_to_own_id() {
        let formats = derive_video_formats(&[video("v1", 720, None)]);
        assert_eq!(formats[0].format_id, "v1");
    }

    #[test]
    fn picks_highest_bitrate_audio_for_compositing() {
        let records = vec![video("v", 1080, None), audio("lo", Some(64.0)), audio("hi", Some(160.0))];
        assert_eq!(derive_video_formats(&records)[0].format_id, "v+hi");
    }

    #[test]
    fn fps_defaults_to_30_when_missing_or_zero() {
        let formats = derive_video_formats(&[video("a", 1080, None), video("b", 720, Some(0.0))]);
        assert!(formats.iter().all(|f| f.fps == 30));
    }

    #[test]
    fn hfr_label_carries_fps_suffix() {
        let formats = derive_video_formats(&[video("a", 720, Some(60.0))]);
        assert_eq!(formats[0].label(), "720p 60fps");

        let formats = derive_video_formats(&[video("b", 720, Some(30.0))]);
        assert_eq!(formats[0].label(), "720p");
    }

    #[test]
    fn audio_ladder_has_exactly_three_entries() {
        let records = vec![video("v", 720, None), audio("a1", Some(128.0))];
        let formats = derive_audio_formats(&records);

        let bitrates: Vec<u32> = formats.iter().map(|f| f.bitrate_kbps).collect();
        assert_eq!(bitrates, vec![128, 256, 320]);
        assert!(formats.iter().all(|f| f.format_id == "a1"));
        assert!(formats.iter().all(|f| f.filesize == 500_000));
    }

    #[test]
    fn audio_ladder_is_empty_without_audio_only_tracks() {
        assert!(derive_audio_formats(&[video("v", 720, None)]).is_empty());
    }

    #[test]
    fn audio_ladder_requires_a_known_bitrate() {
        // abr missing: usable as a muxing partner but not for the ladder
        let records = vec![audio("a1", None)];
        assert!(derive_audio_formats(&records).is_empty());
        assert_eq!(derive_video_formats(&[video("v", 720, None), audio("a1", None)])[0].format_id, "v+a1");
    }

    #[test]
    fn parse_discards_malformed_entries() {
        let values = vec![
            json!({"format_id": "v1", "vcodec": "avc1", "acodec": "none", "height": 720}),
            json!("not a record"),
            json!(42),
            json!({"vcodec": "avc1"}), // missing format_id
            json!({"format_id": "a1", "vcodec": "none", "acodec": "opus", "abr": 128.0}),
        ];
        let records = parse_raw_formats(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].format_id, "v1");
        assert_eq!(records[1].format_id, "a1");
    }
}
