//! Types and parsers for the `usbip(8)` command-line tool
//!
//! The usbip tool has no machine-readable interface; its free-text output
//! *is* the protocol boundary. This crate provides total, side-effect-free
//! parsers over that text, the device identifier types, and the
//! attachment-state evaluation used by the auto-attach daemon. Nothing in
//! here spawns a process or touches I/O, so every matching rule can be
//! tested against literal fixture strings.
//!
//! # Example
//!
//! ```
//! use usbip::{DeviceIdentifier, parser};
//!
//! let port_output = "\
//! Imported USB devices
//! ====================
//! Port 00: <Port in Use> at Full Speed(12Mbps)
//!        unknown vendor : unknown product (1234:5678)
//!        1-1 -> usbip://192.168.1.1:3240/7-4
//!            -> remote bus/dev 007/004
//! ";
//!
//! let device = DeviceIdentifier::bus_id("7-4").unwrap();
//! assert!(parser::is_attached(port_output, &device));
//!
//! // The local port path before the arrow is not the remote bus id.
//! let local = DeviceIdentifier::bus_id("1-1").unwrap();
//! assert!(!parser::is_attached(port_output, &local));
//! ```

pub mod device;
pub mod parser;
pub mod reconcile;

pub use device::{DeviceIdentifier, IdentifierError};
pub use parser::{is_attached, is_listed};
pub use reconcile::{AttachmentStatus, Evaluation, PollFacts, evaluate};
