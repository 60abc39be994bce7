use crate::application::process_handle::ProcessScope;
use crate::config::Destination;
use crate::domain::MediaItem;
use async_trait::async_trait;

/// How an encode attempt ended. Purely informational: the scheduler logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    Completed,
    /// Interrupted before or while running.
    Cancelled,
    /// Not attempted (e.g. incomplete destination).
    Skipped,
    Failed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Push `item` to `destination`, returning once the encode process has exited.
    ///
    /// The spawned process id should be reported through `scope` as soon as it is known.
    async fn run(
        &self,
        item: &MediaItem,
        destination: &Destination,
        scope: ProcessScope,
    ) -> EncodeOutcome;
}
