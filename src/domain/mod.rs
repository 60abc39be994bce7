//! Domain layer - Pure broadcast state: media items, the playlist, generations.

pub mod generation;
pub mod media;
pub mod playlist;

pub use generation::{Generation, GenerationId, RecordOutcome};
pub use media::{MediaItem, MediaSource};
pub use playlist::Playlist;
