//! Attachment-state evaluation
//!
//! One evaluation per poll cycle: the facts parsed out of the usbip output
//! go in, a status and an attach decision come out. Pure data in, pure data
//! out; the daemon owns the loop and the side effects.

use std::fmt;

use crate::device::DeviceIdentifier;

/// Attachment status of the monitored device
///
/// Exactly one status is current at any time. `Unknown` is the initial
/// status only and is never re-entered. `NotAttached` is held for a cycle
/// whose port query failed outright: such a cycle deliberately ends early,
/// with no availability check and no attach attempt. Facts that could not
/// be gathered are not guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentStatus {
    Unknown,
    Attached,
    NotAttached,
    /// Not attached, but exported by the remote host (or assumed so for
    /// device ids, whose exportability cannot be queried)
    Available,
    NotAvailable,
    AttachSucceeded,
    AttachFailed,
}

impl fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttachmentStatus::Unknown => "unknown",
            AttachmentStatus::Attached => "attached",
            AttachmentStatus::NotAttached => "not attached",
            AttachmentStatus::Available => "available",
            AttachmentStatus::NotAvailable => "not available",
            AttachmentStatus::AttachSucceeded => "attach succeeded",
            AttachmentStatus::AttachFailed => "attach failed",
        };
        f.write_str(text)
    }
}

/// Facts gathered in one poll cycle, derived fresh each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFacts {
    /// The port listing showed the device as attached
    pub attached: bool,
    /// The export listing showed the bus id; `None` when no listing was
    /// taken (device-id sessions, or the device was already attached)
    pub listed: Option<bool>,
}

/// Outcome of evaluating one cycle's facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: AttachmentStatus,
    /// Whether an attach should be attempted in this same cycle. Only an
    /// `Available` status triggers an attempt.
    pub attempt_attach: bool,
}

/// Decide what this cycle's facts mean for the monitored device.
///
/// Device-id sessions are optimistic: exportability cannot be determined
/// from the listing query, so a detached device is always considered
/// available and an attach is always attempted.
pub fn evaluate(id: &DeviceIdentifier, facts: PollFacts) -> Evaluation {
    if facts.attached {
        return Evaluation {
            status: AttachmentStatus::Attached,
            attempt_attach: false,
        };
    }

    let available = match id {
        DeviceIdentifier::DevId(_) => true,
        DeviceIdentifier::BusId(_) => facts.listed.unwrap_or(false),
    };

    if available {
        Evaluation {
            status: AttachmentStatus::Available,
            attempt_attach: true,
        }
    } else {
        Evaluation {
            status: AttachmentStatus::NotAvailable,
            attempt_attach: false,
        }
    }
}
