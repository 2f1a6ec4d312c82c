//! Systemd service integration
//!
//! Minimal sd-notify support over `NOTIFY_SOCKET`. The daemon reports
//! readiness once monitoring starts, pushes the current attachment status
//! so it shows up in `systemctl status`, and announces shutdown. All of it
//! is a no-op when not running under systemd with `Type=notify`.

use std::env;
use std::os::unix::net::UnixDatagram;

use anyhow::{Context, Result};
use tracing::debug;

fn notify(message: &str) -> Result<()> {
    if let Ok(socket_path) = env::var("NOTIFY_SOCKET") {
        let socket = UnixDatagram::unbound().context("Failed to create Unix socket")?;
        socket
            .send_to(message.as_bytes(), &socket_path)
            .with_context(|| format!("Failed to send '{}' notification to systemd", message))?;
        debug!("Notified systemd: {}", message);
    } else {
        debug!("NOTIFY_SOCKET not set, skipping systemd notification");
    }
    Ok(())
}

/// Notify systemd that monitoring has started
pub fn notify_ready() -> Result<()> {
    notify("READY=1")
}

/// Notify systemd that the daemon is shutting down
pub fn notify_stopping() -> Result<()> {
    notify("STOPPING=1")
}

/// Push the current device status to `systemctl status`
pub fn notify_status(status: &str) -> Result<()> {
    notify(&format!("STATUS={}", status))
}

/// Check if running under systemd
pub fn is_systemd() -> bool {
    env::var("NOTIFY_SOCKET").is_ok()
}
