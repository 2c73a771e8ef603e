// Picker entries for the UI and validation of the user's stream choice.
use super::*;
use std::collections::HashMap;

const BEST_VIDEO_SELECTOR: &str = "bestvideo[ext!=webm]";
const BEST_AUDIO_SELECTOR: &str = "bestaudio[ext!=webm]";
const WEBM_CONTAINER: &str = "webm";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatChoice {
    pub format_id: String,
    pub itag: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum DownloadSelection {
    Best,
    #[serde(rename_all = "camelCase")]
    Custom {
        video_format_id: String,
        audio_format_id: String,
    },
}

impl DownloadSelection {
    /// Nothing picked means best quality; a half-picked pair is rejected.
    pub fn from_picks(video: Option<&str>, audio: Option<&str>) -> Result<Self, String> {
        let video = non_empty(video);
        let audio = non_empty(audio);
        match (video, audio) {
            (None, None) => Ok(Self::Best),
            (Some(video), Some(audio)) => Ok(Self::Custom {
                video_format_id: video.to_string(),
                audio_format_id: audio.to_string(),
            }),
            _ => Err("Select video and audio quality".to_string()),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    /// yt-dlp `-f` selectors for the video and audio downloads.
    pub fn selectors(&self) -> (&str, &str) {
        match self {
            Self::Best => (BEST_VIDEO_SELECTOR, BEST_AUDIO_SELECTOR),
            Self::Custom {
                video_format_id,
                audio_format_id,
            } => (video_format_id.as_str(), audio_format_id.as_str()),
        }
    }
}

fn number_text(value: Option<f64>) -> String {
    value
        .filter(|value| *value > 0.0)
        .map(|value| value.to_string())
        .unwrap_or_default()
}

fn display_or_mime<'a>(value: Option<&'a str>, format: &'a StreamFormat) -> &'a str {
    non_empty(value).unwrap_or(format.mime_type.as_str())
}

/// Collapses duplicates: a repeated key keeps the slot of its first
/// occurrence and takes the value of its last.
fn dedupe_by_key<'a, F>(
    formats: impl Iterator<Item = &'a StreamFormat>,
    key: F,
) -> Vec<&'a StreamFormat>
where
    F: Fn(&StreamFormat) -> String,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<&StreamFormat> = Vec::new();
    for format in formats {
        let slot_key = key(format);
        match slots.get(&slot_key).copied() {
            Some(index) => unique[index] = format,
            None => {
                slots.insert(slot_key, unique.len());
                unique.push(format);
            }
        }
    }
    unique
}

pub fn video_choices(formats: &[StreamFormat]) -> Vec<FormatChoice> {
    let candidates = formats
        .iter()
        .filter(|format| format.kind() == StreamKind::VideoOnly);
    dedupe_by_key(candidates, |format| {
        format!(
            "{}|{}|{}|{}",
            display_or_mime(Some(format.quality_label.as_str()), format),
            number_text(format.fps),
            format.container,
            format.codecs
        )
    })
    .into_iter()
    .map(|format| {
        let fps = number_text(format.fps);
        let fps = if fps.is_empty() { fps } else { format!("{fps}fps") };
        FormatChoice {
            format_id: format.format_id.clone(),
            itag: format.itag,
            label: format!(
                "{} | {} | {} | {}",
                display_or_mime(Some(format.quality_label.as_str()), format),
                fps,
                format.container,
                format.codecs
            ),
        }
    })
    .collect()
}

pub fn audio_choices(formats: &[StreamFormat]) -> Vec<FormatChoice> {
    let candidates = formats
        .iter()
        .filter(|format| format.kind() == StreamKind::AudioOnly);
    dedupe_by_key(candidates, |format| {
        format!(
            "{}|{}|{}|{}",
            display_or_mime(format.audio_quality.as_deref(), format),
            format.container,
            format.codecs,
            number_text(Some(format.bitrate))
        )
    })
    .into_iter()
    .map(|format| {
        let bitrate = if format.bitrate > 0.0 {
            format!("{}kbps", format.bitrate.round() as i64)
        } else {
            String::new()
        };
        FormatChoice {
            format_id: format.format_id.clone(),
            itag: format.itag,
            label: format!(
                "{} | {} | {} | {}",
                display_or_mime(format.audio_quality.as_deref(), format),
                format.container,
                format.codecs,
                bitrate
            ),
        }
    })
    .collect()
}

fn is_webm(format: &StreamFormat) -> bool {
    format.container.eq_ignore_ascii_case(WEBM_CONTAINER)
}

fn best_of_kind(formats: &[StreamFormat], kind: StreamKind) -> Option<&StreamFormat> {
    formats
        .iter()
        .rev()
        .find(|format| format.kind() == kind && !is_webm(format))
}

/// The streams the best-quality selectors resolve to: yt-dlp lists formats
/// worst first, so this is the last non-webm video-only and audio-only entry.
/// Ranking keeps that order within each kind.
pub fn default_pair(formats: &[StreamFormat]) -> Option<(&StreamFormat, &StreamFormat)> {
    let video = best_of_kind(formats, StreamKind::VideoOnly)?;
    let audio = best_of_kind(formats, StreamKind::AudioOnly)?;
    Some((video, audio))
}
