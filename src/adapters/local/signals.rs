//! Process lifecycle on Unix: process groups, `kill(2)` and `pkill`.

use crate::ports::process::{LaunchSpec, ProcessLifecycle, SignalError};
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command as TokioCommand};

/// Lifecycle backed by real OS processes.
///
/// Every encoder is started as the leader of its own process group, so its pid
/// doubles as the group id and a pipeline can be signalled as a unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixProcessLifecycle;

impl ProcessLifecycle for UnixProcessLifecycle {
    fn start(&self, spec: &LaunchSpec) -> io::Result<Child> {
        TokioCommand::new(&spec.program)
            .args(&spec.args)
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
    }

    fn graceful_stop(&self, pid: u32) -> Result<(), SignalError> {
        match signal_group(pid, libc::SIGTERM) {
            Err(SignalError::NoSuchProcess(_)) => signal(pid, libc::SIGTERM),
            other => other,
        }
    }

    fn force_stop(&self, pid: u32) -> Result<(), SignalError> {
        let process = signal(pid, libc::SIGKILL);
        let group = signal_group(pid, libc::SIGKILL);
        match (process, group) {
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(SignalError::NoSuchProcess(_)), Err(e)) => Err(e),
            (Err(e), _) => Err(e),
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        // Signal 0 probes for existence. EPERM still means something is there.
        let probe = |target: libc::pid_t| {
            let ret = unsafe { libc::kill(target, 0) };
            ret == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
        };
        match to_pid(pid) {
            Some(target) => probe(target) || probe(-target),
            None => false,
        }
    }

    fn kill_matching(&self, pattern: &str) -> Result<bool, SignalError> {
        let status = std::process::Command::new("pkill")
            .arg("-9")
            .arg("-f")
            .arg(escape_extended_regex(pattern))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(SignalError::PatternKill)?;

        // pkill: 0 = something matched, 1 = nothing matched.
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(SignalError::PatternKill(io::Error::other(format!(
                "pkill exited with {status}"
            )))),
        }
    }
}

fn to_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|pid| *pid > 1)
}

fn signal(pid: u32, sig: libc::c_int) -> Result<(), SignalError> {
    let target = to_pid(pid).ok_or(SignalError::NoSuchProcess(pid))?;
    let ret = unsafe { libc::kill(target, sig) };
    check(ret, pid)
}

fn signal_group(pgid: u32, sig: libc::c_int) -> Result<(), SignalError> {
    let target = to_pid(pgid).ok_or(SignalError::NoSuchProcess(pgid))?;
    let ret = unsafe { libc::killpg(target, sig) };
    check(ret, pgid)
}

fn check(ret: libc::c_int, pid: u32) -> Result<(), SignalError> {
    if ret == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Err(SignalError::NoSuchProcess(pid)),
        Some(libc::EPERM) => Err(SignalError::PermissionDenied(pid)),
        _ => Err(SignalError::Os { pid, source: err }),
    }
}

/// Escape POSIX extended-regex metacharacters so `pkill -f` matches `text` literally.
fn escape_extended_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if ".[]()*+?{}|^$\\".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_extended_regex() {
        assert_eq!(
            escape_extended_regex("rtmp://a.rtmp.youtube.com/live2/ab-cd"),
            r"rtmp://a\.rtmp\.youtube\.com/live2/ab-cd"
        );
        assert_eq!(escape_extended_regex("a(b)|c*"), r"a\(b\)\|c\*");
    }

    #[test]
    fn test_refuses_to_signal_init_or_everything() {
        let lifecycle = UnixProcessLifecycle;
        assert!(matches!(lifecycle.graceful_stop(0), Err(SignalError::NoSuchProcess(0))));
        assert!(matches!(lifecycle.force_stop(1), Err(SignalError::NoSuchProcess(1))));
        assert!(!lifecycle.is_alive(0));
    }

    #[tokio::test]
    async fn test_graceful_stop_ends_process_group() {
        let lifecycle = UnixProcessLifecycle;
        let spec = LaunchSpec::new("sh").arg("-c").arg("sleep 30 | sleep 30");
        let mut child = lifecycle.start(&spec).unwrap();
        let pid = child.id().unwrap();
        assert!(lifecycle.is_alive(pid));

        lifecycle.graceful_stop(pid).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());

        for _ in 0..50 {
            if !lifecycle.is_alive(pid) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("process group {pid} still alive");
    }

    #[tokio::test]
    async fn test_force_stop_kills_term_resistant_process() {
        let lifecycle = UnixProcessLifecycle;
        let spec = LaunchSpec::new("sh")
            .arg("-c")
            .arg("trap '' TERM; while :; do sleep 1; done");
        let mut child = lifecycle.start(&spec).unwrap();
        let pid = child.id().unwrap();

        lifecycle.force_stop(pid).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
