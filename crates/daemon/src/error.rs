//! Daemon error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The local vhci kernel module is missing. This is the one condition
    /// the daemon cannot recover from; it terminates with exit code 2.
    #[error(
        "failed to open vhci_driver: the vhci-hcd kernel module is not loaded (try: sudo modprobe vhci-hcd)"
    )]
    VhciDriverMissing,

    #[error(
        "could not find usbip executable; specify it with --usbip-path or make sure it is in PATH"
    )]
    UsbipNotFound,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("usbip {args} timed out after {seconds}s")]
    Timeout { args: String, seconds: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
