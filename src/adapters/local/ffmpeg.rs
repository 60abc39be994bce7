//! Encoder adapter: pushes a media item to the RTMP ingest with ffmpeg.
//!
//! Local files are read by ffmpeg directly. Remote videos are downloaded by yt-dlp
//! and piped into ffmpeg, so the whole pipeline runs under `sh -c` in its own
//! process group and is signalled as a unit.

use crate::application::process_handle::ProcessScope;
use crate::config::{Destination, EncoderSettings, ToolPaths};
use crate::domain::{MediaItem, MediaSource, RecordOutcome};
use crate::ports::encoder::{EncodeOutcome, Encoder};
use crate::ports::process::{LaunchSpec, ProcessLifecycle};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const STDERR_TAIL_LINES: usize = 20;
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FfmpegEncoder {
    tools: ToolPaths,
    settings: EncoderSettings,
    grace_period: Duration,
}

impl FfmpegEncoder {
    pub fn new(tools: ToolPaths, settings: EncoderSettings) -> Self {
        Self {
            tools,
            settings,
            grace_period: Duration::from_secs(1),
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Codec and rate-control arguments shared by both pipelines.
    pub fn quality_args(&self) -> Vec<String> {
        let s = &self.settings;
        vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            s.video_preset.clone(),
            "-crf".into(),
            s.crf.to_string(),
            "-maxrate".into(),
            format!("{}k", s.video_bitrate),
            "-bufsize".into(),
            format!("{}k", s.buffer_size),
            "-pix_fmt".into(),
            s.pixel_format.clone(),
            "-g".into(),
            s.gop_size.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            format!("{}k", s.audio_bitrate),
            "-ar".into(),
            s.audio_sample_rate.to_string(),
        ]
    }

    fn ffmpeg_command(&self, input: &str, endpoint: &str) -> String {
        let mut words = vec![
            shell_quote(&self.tools.ffmpeg.to_string_lossy()),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-re".to_string(),
            "-i".to_string(),
            shell_quote(input),
        ];
        words.extend(self.quality_args().iter().map(|arg| shell_quote(arg)));
        words.push("-f".to_string());
        words.push("flv".to_string());
        words.push(shell_quote(endpoint));
        words.join(" ")
    }

    /// Shell command line that streams `item` to `destination`.
    pub fn pipeline(&self, item: &MediaItem, destination: &Destination) -> String {
        let endpoint = destination.endpoint();
        match item.source() {
            MediaSource::LocalFile => {
                format!("exec {}", self.ffmpeg_command(item.as_str(), &endpoint))
            }
            MediaSource::Youtube => {
                let format = format!("best[height<={}]", self.settings.max_height);
                format!(
                    "{} -f {} -o - {} | {}",
                    shell_quote(&self.tools.ytdlp.to_string_lossy()),
                    shell_quote(&format),
                    shell_quote(item.as_str()),
                    self.ffmpeg_command("pipe:0", &endpoint)
                )
            }
        }
    }

    pub fn launch_spec(&self, item: &MediaItem, destination: &Destination) -> LaunchSpec {
        LaunchSpec::new("sh")
            .arg("-c")
            .arg(self.pipeline(item, destination))
    }

    /// Stop a process this encoder started after termination was already requested.
    async fn stop_own_child(
        &self,
        lifecycle: &dyn ProcessLifecycle,
        child: &mut Child,
        pid: u32,
    ) -> std::io::Result<ExitStatus> {
        if let Err(e) = lifecycle.graceful_stop(pid) {
            warn!(pid, error = %e, "Graceful stop of late encoder failed");
        }
        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                if let Err(e) = lifecycle.force_stop(pid) {
                    warn!(pid, error = %e, "Force kill of late encoder failed");
                }
                child.wait().await
            }
        }
    }

    /// Wait for the rest of the process group once its leader has exited.
    async fn reap_group(&self, lifecycle: &dyn ProcessLifecycle, pid: u32) {
        let deadline = tokio::time::Instant::now() + self.grace_period;
        while lifecycle.is_alive(pid) {
            if tokio::time::Instant::now() >= deadline {
                warn!(pid, "Encoder pipeline outlived its shell, killing process group");
                if let Err(e) = lifecycle.force_stop(pid) {
                    warn!(pid, error = %e, "Force kill of encoder pipeline failed");
                }
                return;
            }
            tokio::time::sleep(REAP_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn run(
        &self,
        item: &MediaItem,
        destination: &Destination,
        scope: ProcessScope,
    ) -> EncodeOutcome {
        let generation = scope.id();
        if !destination.is_complete() {
            error!(generation = %generation, "RTMP URL or stream key not configured, skipping {}", item);
            return EncodeOutcome::Skipped;
        }
        if scope.is_cancelled() {
            info!(generation = %generation, item = %item, "Termination requested before encoder start");
            return EncodeOutcome::Cancelled;
        }

        let lifecycle = scope.lifecycle();
        let spec = self.launch_spec(item, destination);
        let mut child = match lifecycle.start(&spec) {
            Ok(child) => child,
            Err(e) => {
                error!(generation = %generation, item = %item, error = %e, "Failed to start encoder");
                return EncodeOutcome::Failed(format!("failed to start encoder: {e}"));
            }
        };

        let stderr = child
            .stderr
            .take()
            .map(|stderr| collect_stderr(stderr, destination.stream_key.clone()));

        let status = match child.id() {
            Some(pid) => {
                info!(
                    generation = %generation,
                    pid,
                    item = %item,
                    destination = %destination.redacted(),
                    "Encoder started"
                );
                let status = match scope.record_process_id(pid) {
                    RecordOutcome::Recorded => child.wait().await,
                    RecordOutcome::TerminationPending | RecordOutcome::Stale => {
                        info!(generation = %generation, pid, "Termination already requested, stopping encoder");
                        self.stop_own_child(lifecycle.as_ref(), &mut child, pid).await
                    }
                };
                self.reap_group(lifecycle.as_ref(), pid).await;
                status
            }
            None => child.wait().await,
        };

        let tail = match stderr {
            Some(task) => task.await.unwrap_or_default(),
            None => VecDeque::new(),
        };

        match status {
            Ok(status) if status.success() => {
                info!(generation = %generation, item = %item, "Encoder finished");
                EncodeOutcome::Completed
            }
            Ok(status) if scope.is_cancelled() => {
                info!(generation = %generation, item = %item, %status, "Encoder stopped");
                EncodeOutcome::Cancelled
            }
            Ok(status) => {
                let reason = last_stderr_summary(&tail)
                    .unwrap_or_else(|| format!("encoder exited with {status}"));
                error!(generation = %generation, item = %item, %status, reason = %reason, "Encoder failed");
                EncodeOutcome::Failed(reason)
            }
            Err(e) => {
                error!(generation = %generation, item = %item, error = %e, "Waiting for encoder failed");
                EncodeOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Single-quote `word` for `sh`.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn sanitize_line(line: &str, stream_key: &str) -> String {
    if stream_key.is_empty() {
        line.to_string()
    } else {
        line.replace(stream_key, "****")
    }
}

fn collect_stderr(stderr: ChildStderr, stream_key: String) -> JoinHandle<VecDeque<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = sanitize_line(&line, &stream_key);
            if line.trim().is_empty() {
                continue;
            }
            debug!(target: "mychannel::encoder", "{}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    })
}

/// Last informative stderr line, skipping the generic trailers ffmpeg prints on failure.
fn last_stderr_summary(tail: &VecDeque<String>) -> Option<String> {
    tail.iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| {
            let lc = line.to_ascii_lowercase();
            !lc.contains("broken pipe") && !lc.contains("conversion failed")
        })
        .or_else(|| tail.back().map(|line| line.trim()))
        .map(str::to_string)
}
