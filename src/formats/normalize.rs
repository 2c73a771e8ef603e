// Canonical stream format and the label/codec synthesis from raw records.
use super::*;

pub const MALFORMED_LABEL: &str = "Error - Formato incorrecto";
pub const UNKNOWN_MIME_TYPE: &str = "unknown/unknown";
pub const AUDIO_ONLY_LABEL: &str = "audio only";
const STANDARD_DYNAMIC_RANGE: &str = "SDR";
const LABEL_SEPARATOR: &str = " · ";
const AUDIO_SEPARATOR: &str = " | ";
const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    pub itag: i64,
    pub format_id: String,
    pub container: String,
    pub quality_label: String,
    pub mime_type: String,
    pub fps: Option<f64>,
    pub codecs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_quality: Option<String>,
    pub bitrate: f64,
    pub has_video: bool,
    pub has_audio: bool,
}

impl StreamFormat {
    pub fn kind(&self) -> StreamKind {
        StreamKind::from_flags(self.has_video, self.has_audio)
    }

    pub fn is_playable(&self) -> bool {
        self.kind() != StreamKind::Neither
    }

    /// Stand-in for a record that could not be decoded.
    pub fn degraded(format_id: String, container: String) -> Self {
        Self {
            itag: parse_leading_integer(&format_id),
            format_id,
            container,
            quality_label: MALFORMED_LABEL.to_string(),
            mime_type: UNKNOWN_MIME_TYPE.to_string(),
            fps: None,
            codecs: String::new(),
            audio_quality: None,
            bitrate: 0.0,
            has_video: false,
            has_audio: false,
        }
    }
}

/// Builds the display-ready format for one validated record.
pub fn normalize(raw: &RawFormatRecord) -> StreamFormat {
    let kind = raw.kind();
    let container = raw.container();
    let mime_type = if container.is_empty() {
        UNKNOWN_MIME_TYPE.to_string()
    } else if kind.has_video() {
        format!("video/{container}")
    } else {
        format!("audio/{container}")
    };

    StreamFormat {
        itag: raw.itag(),
        format_id: raw.format_id_text(),
        quality_label: quality_label(raw),
        mime_type,
        container,
        fps: raw.fps,
        codecs: simplified_codec(raw),
        audio_quality: audio_quality(raw),
        bitrate: resolve_bitrate(raw),
        has_video: kind.has_video(),
        has_audio: kind.has_audio(),
    }
}

/// Validates and normalizes one JSON record; malformed input degrades
/// instead of failing so the rest of the batch survives.
pub fn normalize_value(value: &Value) -> StreamFormat {
    match RawFormatRecord::from_value(value) {
        Ok(raw) => normalize(&raw),
        Err(error) => {
            log::warn!("{error}");
            let format_id = value
                .get("format_id")
                .and_then(|id| RawIdentifier::deserialize(id).ok())
                .map(|id| id.as_text())
                .unwrap_or_default();
            let container = non_empty(value.get("ext").and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_default();
            StreamFormat::degraded(format_id, container)
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| *value > 0.0)
}

fn first_segment(tag: &str) -> &str {
    tag.split('.').next().unwrap_or(tag)
}

fn known_video_codec(segment: &str) -> Option<&'static str> {
    match segment.to_ascii_lowercase().as_str() {
        "avc1" => Some("H.264"),
        "vp9" => Some("VP9"),
        "av01" => Some("AV1"),
        _ => None,
    }
}

fn known_audio_codec(segment: &str) -> Option<&'static str> {
    match segment.to_ascii_lowercase().as_str() {
        "mp4a" => Some("AAC"),
        "opus" => Some("OPUS"),
        _ => None,
    }
}

fn size_in_megabytes(bytes: f64) -> f64 {
    (bytes / BYTES_PER_MEGABYTE * 10.0).round() / 10.0
}

pub(crate) fn quality_label(raw: &RawFormatRecord) -> String {
    let Some(vcodec) = raw.video_codec() else {
        return raw.note().unwrap_or(AUDIO_ONLY_LABEL).to_string();
    };

    let mut parts: Vec<String> = Vec::new();
    let width = raw.width.filter(|value| *value > 0);
    let height = raw.height.filter(|value| *value > 0);

    match (width, height) {
        (Some(width), Some(height)) => {
            if width >= 3840 && height >= 2160 {
                parts.push("4K".to_string());
            } else if width >= 2560 && height >= 1440 {
                parts.push("2K".to_string());
            }
            parts.push(format!("{width}x{height}"));
        }
        (None, Some(height)) => parts.push(format!("{height}p")),
        _ => {
            if let Some(note) = raw.note().filter(|note| note.contains('p')) {
                parts.push(note.to_string());
            }
        }
    }

    if let Some(fps) = positive(raw.fps).filter(|fps| *fps > 30.0) {
        parts.push(format!("{fps}fps"));
    }

    let segment = first_segment(vcodec);
    parts.push(known_video_codec(segment).unwrap_or(segment).to_string());

    if let Some(range) = non_empty(raw.dynamic_range.as_deref())
        .filter(|range| !range.eq_ignore_ascii_case(STANDARD_DYNAMIC_RANGE))
    {
        parts.push(range.to_string());
    }

    if let Some(bytes) = positive(raw.filesize).or(positive(raw.filesize_approx)) {
        parts.push(format!("~{}MB", size_in_megabytes(bytes)));
    }

    parts.join(LABEL_SEPARATOR)
}

pub(crate) fn audio_quality(raw: &RawFormatRecord) -> Option<String> {
    let acodec = raw.audio_codec()?;
    let mut parts: Vec<String> = Vec::new();

    let segment = first_segment(acodec);
    if segment.eq_ignore_ascii_case("mp4a") {
        parts.push("AAC".to_string());
    } else {
        parts.push(segment.to_uppercase());
    }

    if let Some(channels) = raw.audio_channels.filter(|value| *value > 0) {
        parts.push(format!("{channels}ch"));
    }

    if let Some(bitrate) = positive(raw.abr).or(positive(raw.tbr)) {
        parts.push(format!("{} kbps", bitrate.round() as i64));
    }

    Some(parts.join(AUDIO_SEPARATOR))
}

/// Short codec summary. Unmapped tags keep their full text, version suffix
/// included.
pub(crate) fn simplified_codec(raw: &RawFormatRecord) -> String {
    if let Some(vcodec) = raw.video_codec() {
        return known_video_codec(first_segment(vcodec))
            .unwrap_or(vcodec)
            .to_string();
    }
    if let Some(acodec) = raw.audio_codec() {
        return known_audio_codec(first_segment(acodec))
            .unwrap_or(acodec)
            .to_string();
    }
    String::new()
}

pub(crate) fn resolve_bitrate(raw: &RawFormatRecord) -> f64 {
    let video_bitrate = positive(raw.vbr).or_else(|| {
        if raw.kind() == StreamKind::VideoOnly {
            positive(raw.tbr)
        } else {
            None
        }
    });
    positive(raw.abr)
        .or(positive(raw.tbr))
        .or(video_bitrate)
        .unwrap_or(0.0)
}
