//! Media duration lookup through ffprobe (local files) and yt-dlp (remote videos).

use crate::config::ToolPaths;
use crate::domain::{MediaItem, MediaSource};
use crate::ports::command::CommandRunner;
use crate::ports::duration::DurationProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct ProbeDurationProvider<R> {
    runner: R,
    ffprobe: PathBuf,
    ytdlp: PathBuf,
}

impl<R: CommandRunner> ProbeDurationProvider<R> {
    pub fn new(runner: R, tools: &ToolPaths) -> Self {
        Self {
            runner,
            ffprobe: tools.ffprobe.clone(),
            ytdlp: tools.ytdlp.clone(),
        }
    }

    async fn local_duration(&self, item: &MediaItem) -> f64 {
        let args = ffprobe_args(item.as_str());
        let Some(stdout) = self.capture(&self.ffprobe, &args, item).await else {
            return 0.0;
        };
        match stdout.trim().parse::<f64>() {
            Ok(seconds) => seconds,
            Err(_) => {
                warn!(item = %item, output = stdout.trim(), "Unparseable ffprobe duration");
                0.0
            }
        }
    }

    async fn remote_duration(&self, item: &MediaItem) -> f64 {
        let args = ytdlp_args(item.as_str());
        let Some(stdout) = self.capture(&self.ytdlp, &args, item).await else {
            return 0.0;
        };
        parse_clock_duration(stdout.trim()).unwrap_or_else(|| {
            warn!(item = %item, output = stdout.trim(), "Unparseable yt-dlp duration");
            0.0
        })
    }

    /// Stdout of a successful run, or `None` after logging why there is none.
    async fn capture(&self, program: &Path, args: &[String], item: &MediaItem) -> Option<String> {
        match self.runner.run(program, args).await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    item = %item,
                    program = %program.display(),
                    status = %output.status,
                    stderr = stderr.trim(),
                    "Duration lookup failed"
                );
                None
            }
            Err(e) => {
                warn!(item = %item, program = %program.display(), error = %e, "Could not run duration lookup");
                None
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> DurationProvider for ProbeDurationProvider<R> {
    async fn resolve(&self, item: &MediaItem) -> f64 {
        let seconds = match item.source() {
            MediaSource::Youtube => self.remote_duration(item).await,
            MediaSource::LocalFile => self.local_duration(item).await,
        };
        debug!(item = %item, seconds, "Resolved duration");
        seconds
    }
}

fn ffprobe_args(path: &str) -> Vec<String> {
    [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
        path,
    ]
    .map(String::from)
    .to_vec()
}

fn ytdlp_args(url: &str) -> Vec<String> {
    ["--get-duration", "--no-warnings", url]
        .map(String::from)
        .to_vec()
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds.
pub fn parse_clock_duration(text: &str) -> Option<f64> {
    let parts = text
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let seconds = match parts.as_slice() {
        [s] => Some(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        _ => None,
    }?;
    Some(seconds as f64)
}
