//! mychannel - Playlist-driven live broadcast service
//!
//! Hexagonal Architecture:
//! - domain/: Pure broadcast state (media items, playlist, generations)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (ffmpeg, probes, signals, HTTP/MCP)
//! - application/: Scheduler, process handle and control plane
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::{ControlPlane, ProcessHandle, Scheduler};
pub use config::ChannelConfig;
pub use domain::{MediaItem, Playlist};
