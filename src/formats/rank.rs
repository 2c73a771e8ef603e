// Presentation order for format lists: muxed, video-only, audio-only, neither.
use super::*;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamKind {
    Muxed,
    VideoOnly,
    AudioOnly,
    Neither,
}

impl StreamKind {
    pub fn from_flags(has_video: bool, has_audio: bool) -> Self {
        match (has_video, has_audio) {
            (true, true) => Self::Muxed,
            (true, false) => Self::VideoOnly,
            (false, true) => Self::AudioOnly,
            (false, false) => Self::Neither,
        }
    }

    pub fn has_video(self) -> bool {
        matches!(self, Self::Muxed | Self::VideoOnly)
    }

    pub fn has_audio(self) -> bool {
        matches!(self, Self::Muxed | Self::AudioOnly)
    }

    /// Lower is more useful.
    pub fn rank(self) -> u8 {
        match self {
            Self::Muxed => 0,
            Self::VideoOnly => 1,
            Self::AudioOnly => 2,
            Self::Neither => 3,
        }
    }
}

/// Anything the ranker can order. Raw records and normalized formats both
/// qualify, so ranking can run before or after normalization.
pub trait HasCapabilities {
    fn stream_kind(&self) -> StreamKind;
}

impl HasCapabilities for StreamKind {
    fn stream_kind(&self) -> StreamKind {
        *self
    }
}

impl HasCapabilities for StreamFormat {
    fn stream_kind(&self) -> StreamKind {
        self.kind()
    }
}

impl HasCapabilities for RawFormatRecord {
    fn stream_kind(&self) -> StreamKind {
        self.kind()
    }
}

pub fn compare<T: HasCapabilities>(left: &T, right: &T) -> Ordering {
    left.stream_kind().rank().cmp(&right.stream_kind().rank())
}

/// Stable: formats in the same category keep the extractor's order.
pub fn rank_formats_in_place<T: HasCapabilities>(formats: &mut [T]) {
    formats.sort_by(|left, right| compare(left, right));
}

pub fn rank_formats<T: HasCapabilities>(mut formats: Vec<T>) -> Vec<T> {
    rank_formats_in_place(&mut formats);
    formats
}
