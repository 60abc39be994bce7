use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;

/// Runs a short-lived external program to completion and captures its output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> io::Result<Output>;
}
