//! Configuration loaded from the environment (and an optional `.env` file).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::MediaItem;

pub const DEFAULT_FALLBACK_VIDEO: &str = "videos/News_Intro.mp4";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// RTMP ingest endpoint plus stream key.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub rtmp_url: String,
    pub stream_key: String,
}

impl Destination {
    pub fn new(rtmp_url: impl Into<String>, stream_key: impl Into<String>) -> Self {
        Self {
            rtmp_url: rtmp_url.into(),
            stream_key: stream_key.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.rtmp_url.is_empty() && !self.stream_key.is_empty()
    }

    /// Full publish URL handed to the encoder. Contains the secret key.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.rtmp_url.trim_end_matches('/'), self.stream_key)
    }

    /// Publish URL with the stream key masked, safe for logs.
    pub fn redacted(&self) -> String {
        format!("{}/****", self.rtmp_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("rtmp_url", &self.rtmp_url)
            .field("stream_key", &"****")
            .finish()
    }
}

/// Encoder quality settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Maximum video height requested from remote sources.
    pub max_height: u32,
    /// Video bitrate cap in kbps.
    pub video_bitrate: u32,
    /// Rate-control buffer in kbps.
    pub buffer_size: u32,
    /// Keyframe interval in frames (2 seconds at 30fps).
    pub gop_size: u32,
    pub crf: u32,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    pub audio_sample_rate: u32,
    pub video_preset: String,
    pub pixel_format: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            max_height: 1080,
            video_bitrate: 8000,
            buffer_size: 16000,
            gop_size: 60,
            crf: 18,
            audio_bitrate: 320,
            audio_sample_rate: 48000,
            video_preset: String::from("medium"),
            pixel_format: String::from("yuv420p"),
        }
    }
}

/// Paths of the external tools the adapters invoke.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub ytdlp: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            ytdlp: PathBuf::from("yt-dlp"),
        }
    }
}

/// Configuration for the broadcast service.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    pub destination: Destination,
    /// Token required for write operations; `None` disables authentication.
    pub auth_token: Option<String>,
    /// Played whenever the playlist is empty.
    pub fallback_item: MediaItem,
    pub tools: ToolPaths,
    pub encoder: EncoderSettings,
}

impl ChannelConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let defaults = EncoderSettings::default();
        let encoder = EncoderSettings {
            max_height: parsed(&lookup, "STREAM_MAX_HEIGHT", defaults.max_height)?,
            video_bitrate: parsed(&lookup, "STREAM_VIDEO_BITRATE", defaults.video_bitrate)?,
            buffer_size: parsed(&lookup, "STREAM_BUFFER_SIZE", defaults.buffer_size)?,
            gop_size: parsed(&lookup, "STREAM_GOP_SIZE", defaults.gop_size)?,
            crf: parsed(&lookup, "STREAM_CRF", defaults.crf)?,
            audio_bitrate: parsed(&lookup, "STREAM_AUDIO_BITRATE", defaults.audio_bitrate)?,
            audio_sample_rate: parsed(
                &lookup,
                "STREAM_AUDIO_SAMPLE_RATE",
                defaults.audio_sample_rate,
            )?,
            video_preset: or("STREAM_VIDEO_PRESET", &defaults.video_preset),
            pixel_format: or("STREAM_PIXEL_FORMAT", &defaults.pixel_format),
        };

        Ok(Self {
            addr: or("ADDR", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 8080)?,
            destination: Destination::new(
                required("YOUTUBE_RTMP_URL")?,
                required("YOUTUBE_STREAM_KEY")?,
            ),
            auth_token: lookup("MYCHANNEL_AUTH_TOKEN").filter(|token| !token.is_empty()),
            fallback_item: MediaItem::new(or("FALLBACK_VIDEO", DEFAULT_FALLBACK_VIDEO)),
            tools: ToolPaths {
                ffmpeg: PathBuf::from(or("FFMPEG_PATH", "ffmpeg")),
                ffprobe: PathBuf::from(or("FFPROBE_PATH", "ffprobe")),
                ytdlp: PathBuf::from(or("YTDLP_PATH", "yt-dlp")),
            },
            encoder,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
