// Typed view of one yt-dlp format entry, decoded once per record.
use super::*;

pub(crate) const NO_STREAM_SENTINEL: &str = "none";

/// Format identifier as yt-dlp reports it: usually text (`"137"`, `"251-drc"`,
/// `"hls-1080p"`), occasionally a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawIdentifier {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawIdentifier {
    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.trim().to_string(),
        }
    }

    /// Leading-integer parse: `"251-drc"` gives 251, `"hls-1080p"` gives 0.
    pub fn leading_integer(&self) -> i64 {
        match self {
            Self::Integer(value) => *value,
            Self::Float(value) if value.is_finite() => value.trunc() as i64,
            Self::Float(_) => 0,
            Self::Text(value) => parse_leading_integer(value),
        }
    }
}

pub(crate) fn parse_leading_integer(value: &str) -> i64 {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|parsed| parsed * sign)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormatRecord {
    pub format_id: Option<RawIdentifier>,
    pub ext: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub tbr: Option<f64>,
    pub abr: Option<f64>,
    pub vbr: Option<f64>,
    pub audio_channels: Option<u32>,
    pub dynamic_range: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
    pub format_note: Option<String>,
}

impl RawFormatRecord {
    /// Decodes one entry of the `formats` array. Any field holding the wrong
    /// JSON type makes the whole record malformed.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        Self::deserialize(value).map_err(|error| format!("Malformed format record: {error}"))
    }

    pub fn kind(&self) -> StreamKind {
        StreamKind::from_flags(
            codec_tag(self.vcodec.as_deref()).is_some(),
            codec_tag(self.acodec.as_deref()).is_some(),
        )
    }

    pub fn video_codec(&self) -> Option<&str> {
        codec_tag(self.vcodec.as_deref())
    }

    pub fn audio_codec(&self) -> Option<&str> {
        codec_tag(self.acodec.as_deref())
    }

    pub fn container(&self) -> String {
        non_empty(self.ext.as_deref())
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn format_id_text(&self) -> String {
        self.format_id
            .as_ref()
            .map(RawIdentifier::as_text)
            .unwrap_or_default()
    }

    pub fn itag(&self) -> i64 {
        self.format_id
            .as_ref()
            .map(RawIdentifier::leading_integer)
            .unwrap_or(0)
    }

    pub fn note(&self) -> Option<&str> {
        non_empty(self.format_note.as_deref())
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A codec tag counts only when it is non-empty and not the `none` sentinel.
pub(crate) fn codec_tag(value: Option<&str>) -> Option<&str> {
    non_empty(value).filter(|tag| !tag.eq_ignore_ascii_case(NO_STREAM_SENTINEL))
}
