//! Application layer - Services that drive the channel through the ports.

pub mod control;
pub mod process_handle;
pub mod scheduler;

pub use control::{ControlPlane, SourceValidation, StreamStatus};
pub use process_handle::{ProcessHandle, ProcessScope};
pub use scheduler::{EncodeTask, Iteration, Scheduler, SchedulerTimings};
