//! Device monitoring loop and attach orchestration
//!
//! One `Monitor` watches one device on one host. Each cycle queries
//! `usbip port`, evaluates the parsed facts, attaches when the device is
//! available, and records the resulting status. The only mutable state is
//! `last_status` (plus the last warning text, kept to avoid repeating the
//! same failure line every few seconds), and it is written only after a
//! cycle fully completes.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use usbip::{AttachmentStatus, DeviceIdentifier, PollFacts, evaluate, parser};

use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::service;

/// Diagnostic usbip prints when the vhci-hcd kernel module is not loaded.
/// Seeing it on a failed attach is fatal: no amount of retrying fixes a
/// missing kernel module.
const VHCI_ERROR_SIGNATURE: &str = "open vhci_driver";

/// Timing and target settings for one monitor
pub struct MonitorConfig {
    /// Remote usbip host address
    pub host: String,
    /// Wait between poll cycles
    pub poll_interval: Duration,
    /// Wait between issuing an attach request and re-checking the port
    /// listing
    pub attach_grace: Duration,
}

pub struct Monitor<R: CommandRunner> {
    runner: R,
    device: DeviceIdentifier,
    host: String,
    poll_interval: Duration,
    attach_grace: Duration,
    last_status: AttachmentStatus,
    last_error: Option<String>,
    error_reported: bool,
}

impl<R: CommandRunner> Monitor<R> {
    pub fn new(runner: R, device: DeviceIdentifier, config: MonitorConfig) -> Self {
        Self {
            runner,
            device,
            host: config.host,
            poll_interval: config.poll_interval,
            attach_grace: config.attach_grace,
            last_status: AttachmentStatus::Unknown,
            last_error: None,
            error_reported: false,
        }
    }

    pub fn last_status(&self) -> AttachmentStatus {
        self.last_status
    }

    /// Poll until the shutdown flag flips.
    ///
    /// The inter-cycle wait races the sleep against the shutdown channel,
    /// so cancellation interrupts a multi-second wait immediately instead
    /// of being noticed at the next cycle boundary. The only error that
    /// ends the loop is the fatal vhci condition.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        while !*shutdown.borrow() {
            let status = self.poll_once().await?;

            if status != self.last_status {
                if status == AttachmentStatus::Attached {
                    info!("Device {} is now attached", self.device);
                }
                let summary = format!("device {}: {}", self.device, status);
                if let Err(e) = service::notify_status(&summary) {
                    debug!("systemd status notification failed: {:#}", e);
                }
                self.last_status = status;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("Shutdown requested, monitor exiting");
        Ok(())
    }

    /// Run one full cycle: query, evaluate, maybe attach.
    ///
    /// The remembered failure text is forgotten only after a cycle in
    /// which no query failed, so a host that stays down warns once and
    /// then repeats at debug, whichever query keeps failing.
    async fn poll_once(&mut self) -> Result<AttachmentStatus> {
        self.error_reported = false;
        let status = self.poll_cycle().await?;
        if !self.error_reported {
            self.last_error = None;
        }
        Ok(status)
    }

    async fn poll_cycle(&mut self) -> Result<AttachmentStatus> {
        let attached = match self.runner.run(&["port"]).await {
            Ok(out) => {
                // usbip emits status text even on non-zero exit; parse
                // whatever came back.
                parser::is_attached(&out.text, &self.device)
            }
            Err(e) => {
                self.report_error(format!("Error checking attachment state: {}", e));
                return Ok(AttachmentStatus::NotAttached);
            }
        };

        if attached {
            debug!("Device {} is attached", self.device);
            return Ok(AttachmentStatus::Attached);
        }

        if self.last_status == AttachmentStatus::Attached {
            info!("Device {} is now detached", self.device);
        } else {
            debug!("Device {} not attached", self.device);
        }

        let listed = match &self.device {
            DeviceIdentifier::BusId(busid) => {
                debug!("Checking availability of bus id {} on {}", busid, self.host);
                let listed = match self.runner.run(&["list", "-r", self.host.as_str()]).await {
                    Ok(out) => parser::is_listed(&out.text, busid),
                    Err(e) => {
                        self.report_error(format!("Error listing exportable devices: {}", e));
                        false
                    }
                };
                Some(listed)
            }
            DeviceIdentifier::DevId(_) => {
                debug!("Availability check skipped for device ids");
                None
            }
        };

        let eval = evaluate(&self.device, PollFacts { attached, listed });

        if !eval.attempt_attach {
            if eval.status == AttachmentStatus::NotAvailable {
                if self.last_status != AttachmentStatus::NotAvailable {
                    info!(
                        "Device {} is not available on host {}",
                        self.device, self.host
                    );
                } else {
                    debug!(
                        "Device {} is not available on host {}",
                        self.device, self.host
                    );
                }
            }
            return Ok(eval.status);
        }

        if self.last_status != AttachmentStatus::Available {
            info!(
                "Device {} is available on {}, attempting attach",
                self.device, self.host
            );
        } else {
            debug!(
                "Device {} is available on {}, attempting attach",
                self.device, self.host
            );
        }

        self.attach().await
    }

    /// Issue the attach request and decide whether it worked.
    ///
    /// For bus ids the attach command's exit code is not trusted either
    /// way: after the grace period, the port listing is the authoritative
    /// verdict, since usbip can report success before the kernel-side
    /// attachment completes (and vice versa). For device ids there is no
    /// reliable re-verification query, so the exit code is all we have.
    async fn attach(&mut self) -> Result<AttachmentStatus> {
        let mut args = vec!["attach", "-r", self.host.as_str()];
        match &self.device {
            DeviceIdentifier::BusId(busid) => {
                args.push("-b");
                args.push(busid.as_str());
            }
            DeviceIdentifier::DevId(devid) => {
                args.push("-d");
                args.push(devid.as_str());
            }
        }

        let result = match self.runner.run(&args).await {
            Ok(out) => out,
            Err(e) => {
                warn!("Attach command failed to run: {}", e);
                return Ok(AttachmentStatus::AttachFailed);
            }
        };

        if !result.success() {
            if result.text.contains(VHCI_ERROR_SIGNATURE) {
                return Err(Error::VhciDriverMissing);
            }
            debug!(
                "Attach command exited with status {:?}:\n{}",
                result.code, result.text
            );
        }

        match &self.device {
            DeviceIdentifier::BusId(_) => {
                tokio::time::sleep(self.attach_grace).await;
                let attached = match self.runner.run(&["port"]).await {
                    Ok(out) => parser::is_attached(&out.text, &self.device),
                    Err(e) => {
                        warn!("Error re-checking attachment after attach: {}", e);
                        false
                    }
                };
                if attached {
                    info!("Attach of device {} succeeded", self.device);
                    Ok(AttachmentStatus::AttachSucceeded)
                } else {
                    warn!("Failed to attach device {}", self.device);
                    Ok(AttachmentStatus::AttachFailed)
                }
            }
            DeviceIdentifier::DevId(_) => {
                if result.success() {
                    info!(
                        "Attach of device {} succeeded (unverified: device-id attachments cannot be re-checked)",
                        self.device
                    );
                    Ok(AttachmentStatus::AttachSucceeded)
                } else {
                    warn!("Failed to attach device {}", self.device);
                    Ok(AttachmentStatus::AttachFailed)
                }
            }
        }
    }

    fn report_error(&mut self, message: String) {
        self.error_reported = true;
        if self.last_error.as_deref() == Some(message.as_str()) {
            debug!("{}", message);
        } else {
            warn!("{}", message);
            self.last_error = Some(message);
        }
    }
}
