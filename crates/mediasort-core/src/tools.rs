//! External tool invocation with bounded waits.
//!
//! Every external inspector (exiftool, mdls, mediainfo) is reached through
//! the [`CommandRunner`] seam so the metadata facade can be exercised in
//! tests without the binaries installed. Failures and timeouts surface as
//! `None` and are downgraded to empty metadata by the caller; they never
//! escape as errors.

use log::debug;
use std::env;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Default budget for a single external tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Capability interface for running an external inspection tool.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, waiting at most the runner's timeout.
    ///
    /// Returns trimmed stdout, or `None` if the program could not be spawned,
    /// timed out, or produced unreadable output. Never retried.
    fn run(&self, program: &str, args: &[&str]) -> Option<String>;
}

/// Real subprocess runner. The child is killed when the budget elapses.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| debug!("Command failed to spawn: {} - {}", program, e))
            .ok()?;

        let mut stdout = child.stdout.take()?;
        let (tx, rx) = mpsc::channel();

        // Drain stdout on a helper thread so the timeout also covers a child
        // that spawned but never finishes writing.
        let reader = thread::spawn(move || {
            let mut buffer = String::new();
            let _ = stdout.read_to_string(&mut buffer);
            let _ = tx.send(buffer);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(output) => {
                let _ = child.wait();
                let _ = reader.join();
                Some(output.trim().to_string())
            }
            Err(_) => {
                debug!("Command timed out after {:?}: {}", self.timeout, program);
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                None
            }
        }
    }
}

/// Check whether an external tool is available.
///
/// Scans PATH plus the common Homebrew prefixes, since app bundles on macOS
/// often run with a restricted PATH.
pub fn tool_available(name: &str) -> bool {
    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            if is_executable(&dir.join(name)) {
                return true;
            }
        }
    }

    ["/opt/homebrew/bin", "/usr/local/bin"]
        .iter()
        .any(|prefix| is_executable(&Path::new(prefix).join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
