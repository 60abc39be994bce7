//! Ownership of the running encode process and the two-phase interruption protocol.
//!
//! All per-generation state (id, item, process id, termination token) lives in a
//! single structure behind one lock, so readers never see a termination flag paired
//! with another generation's process id. Requests that name a generation are fenced:
//! once the scheduler has begun generation `N + 1`, anything aimed at `N` is dropped.

use crate::domain::{Generation, GenerationId, MediaItem, RecordOutcome};
use crate::ports::process::ProcessLifecycle;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time a process gets to exit after the graceful stop before it is killed.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct GenerationState {
    id: GenerationId,
    item: Option<MediaItem>,
    process_id: Option<u32>,
    termination: CancellationToken,
}

impl GenerationState {
    fn idle() -> Self {
        Self {
            id: GenerationId::IDLE,
            item: None,
            process_id: None,
            termination: CancellationToken::new(),
        }
    }
}

pub struct ProcessHandle {
    state: Mutex<GenerationState>,
    lifecycle: Arc<dyn ProcessLifecycle>,
    /// Command-line fragment identifying our encoder processes (the publish endpoint).
    kill_pattern: Option<String>,
    grace_period: Duration,
}

impl ProcessHandle {
    pub fn new(lifecycle: Arc<dyn ProcessLifecycle>, kill_pattern: Option<String>) -> Self {
        Self {
            state: Mutex::new(GenerationState::idle()),
            lifecycle,
            kill_pattern: kill_pattern.filter(|pattern| !pattern.is_empty()),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn lifecycle(&self) -> Arc<dyn ProcessLifecycle> {
        self.lifecycle.clone()
    }

    fn lock(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a fresh generation for `item`, discarding the previous one.
    pub fn begin_generation(&self, item: MediaItem) -> GenerationId {
        let mut state = self.lock();
        let id = state.id.next();
        *state = GenerationState {
            id,
            item: Some(item),
            process_id: None,
            termination: CancellationToken::new(),
        };
        debug!(generation = %id, "Began generation");
        id
    }

    /// Capability handed to the encoder of generation `id`.
    ///
    /// A scope for a generation that is no longer current starts out cancelled.
    pub fn scope(self: &Arc<Self>, id: GenerationId) -> ProcessScope {
        let token = {
            let state = self.lock();
            if state.id == id {
                state.termination.clone()
            } else {
                let token = CancellationToken::new();
                token.cancel();
                token
            }
        };
        ProcessScope {
            handle: self.clone(),
            id,
            token,
        }
    }

    pub fn current(&self) -> Generation {
        let state = self.lock();
        Generation {
            id: state.id,
            item: state.item.clone(),
            process_id: state.process_id,
            termination_requested: state.termination.is_cancelled(),
        }
    }

    pub fn current_id(&self) -> GenerationId {
        self.lock().id
    }

    pub fn record_process_id(&self, id: GenerationId, pid: u32) -> RecordOutcome {
        let mut state = self.lock();
        if state.id != id {
            debug!(generation = %id, current = %state.id, pid, "Ignoring process id for stale generation");
            return RecordOutcome::Stale;
        }
        state.process_id = Some(pid);
        if state.termination.is_cancelled() {
            RecordOutcome::TerminationPending
        } else {
            RecordOutcome::Recorded
        }
    }

    /// Flag the current generation for termination and return its id.
    pub fn request_termination(&self) -> GenerationId {
        let state = self.lock();
        state.termination.cancel();
        info!(generation = %state.id, "Termination requested");
        state.id
    }

    /// Flag generation `id` for termination, unless a newer generation has begun.
    pub fn request_termination_for(&self, id: GenerationId) -> bool {
        let state = self.lock();
        if state.id != id {
            debug!(generation = %id, current = %state.id, "Dropping termination request for stale generation");
            return false;
        }
        state.termination.cancel();
        info!(generation = %id, "Termination requested");
        true
    }

    pub fn should_terminate(&self) -> bool {
        self.lock().termination.is_cancelled()
    }

    /// Run the kill protocol against the current generation.
    pub async fn terminate(&self) {
        let id = self.current_id();
        self.terminate_generation(id).await;
    }

    /// Best-effort kill protocol for generation `id`.
    ///
    /// Graceful stop, grace period, forced kill of the process group if it is still
    /// alive, then a pattern kill of anything still pushing to our endpoint. Every
    /// failure is logged. Once the scheduler has moved past `id` the remaining steps
    /// are skipped, as they would hit the next generation's encoder.
    pub async fn terminate_generation(&self, id: GenerationId) {
        let pid = {
            let state = self.lock();
            if state.id != id {
                debug!(generation = %id, current = %state.id, "Not terminating stale generation");
                return;
            }
            state.process_id
        };

        match pid {
            Some(pid) => {
                info!(generation = %id, pid, "Stopping encoder");
                if let Err(e) = self.lifecycle.graceful_stop(pid) {
                    warn!(generation = %id, pid, error = %e, "Graceful stop failed");
                }
            }
            None => info!(generation = %id, "No encoder process recorded, relying on pattern kill"),
        }

        tokio::time::sleep(self.grace_period).await;

        if self.current_id() != id {
            debug!(generation = %id, "Generation ended during grace period");
            return;
        }

        if let Some(pid) = pid {
            if self.lifecycle.is_alive(pid) {
                warn!(generation = %id, pid, "Encoder ignored graceful stop, killing process group");
                if let Err(e) = self.lifecycle.force_stop(pid) {
                    warn!(generation = %id, pid, error = %e, "Force kill failed");
                }
            } else {
                debug!(generation = %id, pid, "Encoder exited after graceful stop");
            }
        }

        if let Some(pattern) = &self.kill_pattern {
            match self.lifecycle.kill_matching(pattern) {
                Ok(true) => info!(generation = %id, "Pattern kill removed leftover encoder processes"),
                Ok(false) => debug!(generation = %id, "Pattern kill found no encoder processes"),
                Err(e) => warn!(generation = %id, error = %e, "Pattern kill failed"),
            }
        }
    }
}

/// One generation's view of the [`ProcessHandle`], given to its encoder.
#[derive(Clone)]
pub struct ProcessScope {
    handle: Arc<ProcessHandle>,
    id: GenerationId,
    token: CancellationToken,
}

impl ProcessScope {
    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once termination is requested for this generation.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn record_process_id(&self, pid: u32) -> RecordOutcome {
        self.handle.record_process_id(self.id, pid)
    }

    pub fn lifecycle(&self) -> Arc<dyn ProcessLifecycle> {
        self.handle.lifecycle()
    }
}

impl std::fmt::Debug for ProcessScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessScope")
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
