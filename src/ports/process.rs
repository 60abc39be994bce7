use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Child;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("process {0} does not exist")]
    NoSuchProcess(u32),
    #[error("not permitted to signal process {0}")]
    PermissionDenied(u32),
    #[error("signalling process {pid} failed: {source}")]
    Os { pid: u32, source: io::Error },
    #[error("pattern kill failed: {0}")]
    PatternKill(io::Error),
}

/// Program and arguments of a long-running encode process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// OS-level lifecycle of encode processes.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLifecycle: Send + Sync {
    /// Spawn the process as the leader of a new process group.
    fn start(&self, spec: &LaunchSpec) -> io::Result<Child>;

    /// Ask the process to stop (SIGTERM).
    fn graceful_stop(&self, pid: u32) -> Result<(), SignalError>;

    /// Kill the process and its whole process group (SIGKILL).
    fn force_stop(&self, pid: u32) -> Result<(), SignalError>;

    fn is_alive(&self, pid: u32) -> bool;

    /// Kill every process whose command line contains `pattern`.
    /// Returns whether anything matched.
    fn kill_matching(&self, pattern: &str) -> Result<bool, SignalError>;
}
