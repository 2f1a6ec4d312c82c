//! usbip-auto-attach
//!
//! Daemon that monitors a remote USB/IP export and automatically attaches
//! the device whenever it is available but not attached, so a detachable
//! device reappears after reboots, reconnects, or host-side re-exports.

mod config;
mod error;
mod exec;
mod logging;
mod monitor;
mod service;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{error, info, warn};
use usbip::DeviceIdentifier;

use config::DaemonConfig;
use monitor::{Monitor, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "usbip-auto-attach")]
#[command(
    author,
    version,
    about = "Keep a remote USB/IP device attached to this machine"
)]
#[command(long_about = "
Monitors a remote usbip host and automatically (re-)attaches one of its
exported USB devices whenever it is available but not currently attached.
Runs until interrupted; state is kept in memory for the run only.

EXAMPLES:
    # Monitor by bus id (recommended: attachment is verified)
    usbip-auto-attach 192.168.1.1 -b 1-2

    # Monitor by device id (attach success cannot be verified)
    usbip-auto-attach 192.168.1.1 -d 0123456789abcdef

    # Use an explicit usbip binary and debug logging
    usbip-auto-attach 192.168.1.1 -b 1-2 --usbip-path /usr/local/sbin/usbip -v

CONFIGURATION:
    The daemon looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usbip-auto-attach/config.toml
    3. /etc/usbip-auto-attach/config.toml
    4. Built-in defaults

EXIT CODES:
    0  normal shutdown, help, or version
    1  argument, configuration, or usbip discovery error
    2  the vhci-hcd kernel module is not loaded (run: sudo modprobe vhci-hcd)
")]
struct Args {
    /// IP address or hostname of the remote usbip host
    #[arg(value_name = "HOST")]
    host: String,

    /// Bus id of the device to monitor (e.g. 1-2)
    #[arg(
        short = 'b',
        long,
        value_name = "BUSID",
        conflicts_with = "device",
        required_unless_present = "device"
    )]
    busid: Option<String>,

    /// Device id on the remote host. Availability and attach success checks
    /// are less reliable than with --busid
    #[arg(short = 'd', long, value_name = "DEVID")]
    device: Option<String>,

    /// Full path to the usbip executable (searches PATH if not given)
    #[arg(long, value_name = "PATH")]
    usbip_path: Option<String>,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,
}

const EXIT_VHCI_MISSING: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(
                e.downcast_ref::<error::Error>(),
                Some(error::Error::VhciDriverMissing)
            ) {
                error!("{:#}", e);
                ExitCode::from(EXIT_VHCI_MISSING)
            } else {
                eprintln!("Error: {:#}", e);
                ExitCode::from(1)
            }
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.save_config {
        let config = DaemonConfig::default();
        let path = DaemonConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        DaemonConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        DaemonConfig::load_or_default()
    };

    let log_level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(&config.daemon.log_level)
    };
    logging::setup_logging(log_level).context("Failed to setup logging")?;

    info!("usbip-auto-attach v{}", env!("CARGO_PKG_VERSION"));
    if service::is_systemd() {
        info!("Running under systemd supervision");
    }

    let device = if let Some(busid) = &args.busid {
        DeviceIdentifier::bus_id(busid)?
    } else if let Some(devid) = &args.device {
        DeviceIdentifier::dev_id(devid)?
    } else {
        // clap enforces required_unless_present
        anyhow::bail!("either --busid or --device is required");
    };

    let usbip_path = exec::find_usbip(
        args.usbip_path
            .as_deref()
            .or(config.daemon.usbip_path.as_deref()),
    )?;
    info!("Using usbip executable: {}", usbip_path.display());

    if device.is_bus_id() {
        info!("Monitoring host {} for bus id {}", args.host, device);
    } else {
        info!(
            "Monitoring host {} for device id {} (attach success cannot be verified for device ids)",
            args.host, device
        );
    }

    let runner = exec::UsbipRunner::new(usbip_path, config.monitor.command_timeout());
    let mut monitor = Monitor::new(
        runner,
        device,
        MonitorConfig {
            host: args.host,
            poll_interval: config.monitor.poll_interval(),
            attach_grace: config.monitor.attach_grace(),
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = service::notify_ready() {
        warn!("Failed to notify systemd of readiness: {:#}", e);
    }

    let result = monitor.run(shutdown_rx).await;

    if let Err(e) = service::notify_stopping() {
        warn!("Failed to notify systemd of shutdown: {:#}", e);
    }

    result.map_err(Into::into)
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to wait for Ctrl+C: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}
