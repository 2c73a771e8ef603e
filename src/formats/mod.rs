use serde::{Deserialize, Serialize};
use serde_json::Value;

mod normalize;
mod rank;
mod record;
mod selection;

pub use normalize::*;
pub use rank::*;
pub use record::*;
pub use selection::*;

pub const EMBED_URL_PREFIX: &str = "https://www.youtube.com/embed/";

/// Ranked formats for one video plus its embeddable preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatList {
    pub url: String,
    pub info: Vec<StreamFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl FormatList {
    pub fn video_choices(&self) -> Vec<FormatChoice> {
        video_choices(&self.info)
    }

    pub fn audio_choices(&self) -> Vec<FormatChoice> {
        audio_choices(&self.info)
    }

    pub fn default_pair(&self) -> Option<(&StreamFormat, &StreamFormat)> {
        default_pair(&self.info)
    }

    pub fn find(&self, format_id: &str) -> Option<&StreamFormat> {
        let wanted = format_id.trim();
        self.info.iter().find(|format| format.format_id == wanted)
    }
}

pub(crate) fn text_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    non_empty(payload.get(key).and_then(Value::as_str))
}

/// Normalizes every entry independently, keeping input order.
pub fn normalize_all(records: &[Value]) -> Vec<StreamFormat> {
    records.iter().map(normalize_value).collect()
}

/// Turns a `yt-dlp -J` payload into the list the UI shows: normalized,
/// stripped of entries carrying no stream, ranked.
pub fn build_format_list(payload: &Value) -> Result<FormatList, String> {
    let video_id = text_field(payload, "id")
        .ok_or_else(|| "yt-dlp response did not include a video id.".to_string())?;

    let records = payload
        .get("formats")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut playable = Vec::with_capacity(records.len());
    for format in normalize_all(records) {
        if format.is_playable() {
            playable.push(format);
        } else {
            log::debug!(
                "Skipping format {:?} without audio or video ({})",
                format.format_id,
                format.quality_label
            );
        }
    }
    let info = rank_formats(playable);
    log::info!(
        "Prepared {} of {} formats for video {video_id}",
        info.len(),
        records.len()
    );

    Ok(FormatList {
        url: format!("{EMBED_URL_PREFIX}{video_id}"),
        info,
        title: text_field(payload, "title").map(str::to_string),
        author: text_field(payload, "uploader")
            .or_else(|| text_field(payload, "channel"))
            .map(str::to_string),
    })
}
