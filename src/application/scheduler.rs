use crate::application::process_handle::{ProcessHandle, ProcessScope};
use crate::config::Destination;
use crate::domain::{GenerationId, MediaItem, Playlist};
use crate::ports::duration::DurationProvider;
use crate::ports::encoder::{EncodeOutcome, Encoder};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Delays used by the scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTimings {
    /// Pause after spawning the encoder, before the playback wait starts.
    pub startup_delay: Duration,
    /// Interval between termination checks while waiting out the item.
    pub tick: Duration,
    /// Time an interrupted encoder gets before it is killed.
    pub grace_period: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(1),
            tick: Duration::from_secs(1),
            grace_period: Duration::from_secs(1),
        }
    }
}

/// The spawned encode attempt of one generation.
pub struct EncodeTask {
    generation: GenerationId,
    handle: JoinHandle<EncodeOutcome>,
}

impl EncodeTask {
    pub fn spawn<E>(
        encoder: Arc<E>,
        item: MediaItem,
        destination: Destination,
        scope: ProcessScope,
    ) -> Self
    where
        E: Encoder + ?Sized + 'static,
    {
        let generation = scope.id();
        let handle = tokio::spawn(async move { encoder.run(&item, &destination, scope).await });
        Self { generation, handle }
    }

    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Wait for the encoder to finish. A panicked task is logged and reported as failed.
    pub async fn join(self) -> EncodeOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(generation = %self.generation, error = %e, "Encode task did not complete");
                EncodeOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Summary of one pass through the scheduling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub generation: GenerationId,
    pub item: MediaItem,
    pub fallback: bool,
    pub duration: f64,
    pub interrupted: bool,
    pub outcome: EncodeOutcome,
}

/// Drives the channel: picks the next item, starts its encode and waits it out.
pub struct Scheduler<D, E: ?Sized> {
    playlist: Arc<Playlist>,
    process: Arc<ProcessHandle>,
    durations: D,
    encoder: Arc<E>,
    destination: Destination,
    fallback: MediaItem,
    timings: SchedulerTimings,
}

impl<D, E> Scheduler<D, E>
where
    D: DurationProvider,
    E: Encoder + ?Sized + 'static,
{
    pub fn new(
        playlist: Arc<Playlist>,
        process: Arc<ProcessHandle>,
        durations: D,
        encoder: Arc<E>,
        destination: Destination,
        fallback: MediaItem,
    ) -> Self {
        Self {
            playlist,
            process,
            durations,
            encoder,
            destination,
            fallback,
            timings: SchedulerTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: SchedulerTimings) -> Self {
        self.timings = timings;
        self
    }

    pub async fn run(&self) {
        info!(fallback = %self.fallback, "Scheduler started");
        loop {
            let iteration = self.run_iteration().await;
            debug!(generation = %iteration.generation, outcome = ?iteration.outcome, "Iteration finished");
        }
    }

    pub async fn run_iteration(&self) -> Iteration {
        let (item, fallback) = self.next_item();
        let duration = sanitize_duration(self.durations.resolve(&item).await);
        let generation = self.process.begin_generation(item.clone());
        info!(
            generation = %generation,
            item = %item,
            source = item.source().as_str(),
            duration,
            fallback,
            "Now playing"
        );

        let task = EncodeTask::spawn(
            self.encoder.clone(),
            item.clone(),
            self.destination.clone(),
            self.process.scope(generation),
        );

        let interrupted = self.wait_out(duration).await;
        if interrupted {
            info!(generation = %generation, item = %item, "Playback interrupted");
        }

        let outcome = task.join().await;
        match &outcome {
            EncodeOutcome::Failed(reason) => {
                warn!(generation = %generation, item = %item, reason = %reason, "Encode failed")
            }
            other => debug!(generation = %generation, outcome = ?other, "Encode finished"),
        }

        Iteration {
            generation,
            item,
            fallback,
            duration,
            interrupted,
            outcome,
        }
    }

    /// Head of the playlist (requeued at the back), or the fallback when empty.
    fn next_item(&self) -> (MediaItem, bool) {
        match self.playlist.pop_front() {
            Some(item) => {
                self.playlist.push_back(item.clone());
                (item, false)
            }
            None => (self.fallback.clone(), true),
        }
    }

    /// Sleep through the item's playback, checking for termination every tick.
    /// Returns whether termination was requested.
    async fn wait_out(&self, duration: f64) -> bool {
        tokio::time::sleep(self.timings.startup_delay).await;

        let ticks = duration.floor() as u64;
        for _ in 0..ticks {
            if self.process.should_terminate() {
                return true;
            }
            tokio::time::sleep(self.timings.tick).await;
        }

        if self.process.should_terminate() {
            return true;
        }
        let remainder = Duration::from_millis(((duration - duration.floor()) * 1000.0) as u64);
        if !remainder.is_zero() {
            tokio::time::sleep(remainder).await;
        }
        false
    }
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}
