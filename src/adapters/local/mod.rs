//! Local adapters for single-host deployment.

pub mod command;
pub mod ffmpeg;
pub mod http;
pub mod probe;
pub mod signals;

pub use command::TokioCommandRunner;
pub use ffmpeg::FfmpegEncoder;
pub use probe::ProbeDurationProvider;
pub use signals::UnixProcessLifecycle;
