use super::media::MediaItem;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe double-ended queue of pending media items.
///
/// Every operation, snapshots included, goes through the same lock, so all
/// operations are totally ordered with respect to each other.
#[derive(Debug, Default)]
pub struct Playlist {
    items: Mutex<VecDeque<MediaItem>>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = MediaItem>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MediaItem>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push_back(&self, item: MediaItem) {
        self.lock().push_back(item);
    }

    /// Prepend an item so that it is the next one popped.
    pub fn push_front(&self, item: MediaItem) {
        self.lock().push_front(item);
    }

    /// Remove and return the head, or `None` when the playlist is empty.
    pub fn pop_front(&self) -> Option<MediaItem> {
        self.lock().pop_front()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Point-in-time copy of the playlist, head first.
    pub fn snapshot(&self) -> Vec<MediaItem> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
