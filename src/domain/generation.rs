use super::media::MediaItem;
use serde::Serialize;
use std::fmt;

/// Monotonic identifier of one scheduler iteration's encode attempt.
///
/// Generation `0` is the idle state before the scheduler's first iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct GenerationId(u64);

impl GenerationId {
    pub const IDLE: GenerationId = GenerationId(0);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point-in-time view of the current generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub id: GenerationId,
    /// Item being played, unset before the first iteration.
    pub item: Option<MediaItem>,
    /// Identity of the spawned encode process, if it became known.
    pub process_id: Option<u32>,
    pub termination_requested: bool,
}

/// Result of reporting a spawned process to its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Stored, but termination was already requested for this generation.
    TerminationPending,
    /// The generation is no longer current; nothing stored.
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_ordered() {
        let first = GenerationId::IDLE.next();
        assert!(first > GenerationId::IDLE);
        assert_eq!(first.next().value(), 2);
        assert_eq!(first.to_string(), "#1");
    }
}
