use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Matches watch URLs and short links of the remote video platform.
const REMOTE_VIDEO_PATTERN: &str = r"^https?://(www\.)?(youtube\.com/watch\?v=|youtu\.be/)";

fn remote_video_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(REMOTE_VIDEO_PATTERN).expect("remote video pattern is valid"))
}

/// Where a media item is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// Remote video page, fetched through yt-dlp.
    Youtube,
    /// Path on the local filesystem.
    LocalFile,
}

impl MediaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSource::Youtube => "youtube",
            MediaSource::LocalFile => "local_file",
        }
    }
}

/// Opaque identifier of something to broadcast: a remote video URL or a local path.
///
/// The text is never rewritten once stored; the only interpretation applied to it
/// is [`MediaItem::source`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaItem(String);

impl MediaItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source(&self) -> MediaSource {
        if is_remote_video(&self.0) {
            MediaSource::Youtube
        } else {
            MediaSource::LocalFile
        }
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaItem {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaItem {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub fn is_remote_video(path: &str) -> bool {
    remote_video_regex().is_match(path)
}
