//! Operations exposed to operators and agents, shared by the HTTP and MCP surfaces.

use crate::application::process_handle::ProcessHandle;
use crate::domain::{GenerationId, MediaItem, MediaSource, Playlist};
use crate::ports::duration::DurationProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStatus {
    pub is_streaming: bool,
    pub queue_size: usize,
    pub fallback_video: MediaItem,
    pub now_playing: Option<MediaItem>,
    pub generation: GenerationId,
    pub process_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceValidation {
    pub source: MediaItem,
    #[serde(rename = "is_valid")]
    pub valid: bool,
    pub duration: f64,
    pub source_type: MediaSource,
}

#[derive(Clone)]
pub struct ControlPlane {
    playlist: Arc<Playlist>,
    process: Arc<ProcessHandle>,
    durations: Arc<dyn DurationProvider>,
    fallback: MediaItem,
}

impl ControlPlane {
    pub fn new(
        playlist: Arc<Playlist>,
        process: Arc<ProcessHandle>,
        durations: Arc<dyn DurationProvider>,
        fallback: MediaItem,
    ) -> Self {
        Self {
            playlist,
            process,
            durations,
            fallback,
        }
    }

    pub fn fallback(&self) -> &MediaItem {
        &self.fallback
    }

    pub fn enqueue(&self, item: MediaItem) {
        info!(item = %item, "Added to queue");
        self.playlist.push_back(item);
    }

    /// Put `item` at the head of the playlist without touching the current item.
    pub fn enqueue_front(&self, item: MediaItem) {
        info!(item = %item, "Added to front of queue");
        self.playlist.push_front(item);
    }

    /// Put `item` at the head of the playlist and cut the current item short.
    /// Put `item` at the head of the playlist and cut the item on air short.
    ///
    /// Only the generation that was on air when `item` arrived is interrupted. If the
    /// scheduler already moved on, possibly to `item` itself, nothing is killed.
    pub async fn enqueue_priority(&self, item: MediaItem) {
        let on_air = self.process.current_id();
        info!(item = %item, generation = %on_air, "Added priority item, interrupting current stream");
        self.playlist.push_front(item);
        if self.process.request_termination_for(on_air) {
            self.process.terminate_generation(on_air).await;
        }
    }

    pub fn clear(&self) {
        let dropped = self.playlist.len();
        self.playlist.clear();
        info!(dropped, "Queue cleared");
    }

    pub fn list_all(&self) -> Vec<MediaItem> {
        self.playlist.snapshot()
    }

    /// Flag the current generation and run the kill protocol against it.
    pub async fn interrupt_current(&self) -> GenerationId {
        let id = self.process.request_termination();
        self.process.terminate_generation(id).await;
        id
    }

    pub fn is_streaming(&self) -> bool {
        !self.process.should_terminate()
    }

    pub fn status(&self) -> StreamStatus {
        let generation = self.process.current();
        StreamStatus {
            is_streaming: !generation.termination_requested,
            queue_size: self.playlist.len(),
            fallback_video: self.fallback.clone(),
            now_playing: generation.item,
            generation: generation.id,
            process_id: generation.process_id,
        }
    }

    pub async fn resolve_duration(&self, item: &MediaItem) -> f64 {
        self.durations.resolve(item).await
    }

    /// A source is playable when its duration can be resolved.
    pub async fn validate_source(&self, item: MediaItem) -> SourceValidation {
        let duration = self.resolve_duration(&item).await;
        SourceValidation {
            source_type: item.source(),
            valid: duration > 0.0,
            duration,
            source: item,
        }
    }
}
