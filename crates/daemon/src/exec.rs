//! usbip command execution
//!
//! The daemon never interprets usbip's exit status at this layer: the tool
//! routinely emits useful text on non-zero exit (missing usb.ids, partial
//! failures), so callers always get the captured output and decide
//! themselves. The [`CommandRunner`] trait is the seam that lets the
//! monitor be driven by scripted outputs in tests.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Captured result of one usbip invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Combined stdout and stderr text
    pub text: String,
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the usbip executable with a subcommand argument list
pub trait CommandRunner {
    fn run(&self, args: &[&str]) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Production runner: spawns the configured usbip executable with a hard
/// timeout. Timeout expiry is a transient failure, not a hang.
pub struct UsbipRunner {
    program: PathBuf,
    timeout: Duration,
}

impl UsbipRunner {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

impl CommandRunner for UsbipRunner {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running command: {} {}", self.program.display(), args.join(" "));

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| Error::Timeout {
            args: args.join(" "),
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|source| Error::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let code = output.status.code();
        if code != Some(0) {
            debug!("Command exited with status {:?}", code);
        }

        Ok(CommandOutput { text, code })
    }
}

/// Locate the usbip executable.
///
/// An explicit path (CLI flag or config, tilde-expanded) must itself be
/// executable; otherwise every `PATH` entry is searched for `usbip`.
pub fn find_usbip(user_path: Option<&str>) -> Result<PathBuf> {
    if let Some(raw) = user_path {
        let expanded = shellexpand::tilde(raw);
        let path = PathBuf::from(expanded.as_ref());
        if is_executable(&path) {
            return Ok(path);
        }
        return Err(Error::UsbipNotFound);
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            let candidate = dir.join("usbip");
            if is_executable(&candidate) {
                return Ok(candidate);
            }
        }
    }

    Err(Error::UsbipNotFound)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn success_is_exit_code_zero() {
        let ok = CommandOutput {
            text: String::new(),
            code: Some(0),
        };
        let failed = CommandOutput {
            text: String::new(),
            code: Some(1),
        };
        let killed = CommandOutput {
            text: String::new(),
            code: None,
        };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!killed.success());
    }

    #[test]
    fn explicit_path_is_used_when_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_executable(dir.path(), "usbip");
        let found = find_usbip(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn explicit_path_must_be_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usbip");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(find_usbip(Some(path.to_str().unwrap())).is_err());
    }

    #[test]
    fn path_search_finds_the_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_executable(dir.path(), "usbip");

        let original = std::env::var_os("PATH");
        unsafe {
            std::env::set_var("PATH", dir.path());
        }
        let found = find_usbip(None);
        unsafe {
            match original {
                Some(p) => std::env::set_var("PATH", p),
                None => std::env::remove_var("PATH"),
            }
        }

        assert_eq!(found.unwrap(), path);
    }
}
