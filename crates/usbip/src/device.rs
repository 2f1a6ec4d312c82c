//! Device identifier types

use std::fmt;
use thiserror::Error;

/// Errors from constructing a [`DeviceIdentifier`]
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Bus id did not have the `N-M[.K...]` shape
    #[error("invalid bus id '{0}': expected the form N-M[.K...], e.g. 1-2 or 1-2.3")]
    InvalidBusId(String),

    /// Device id was empty
    #[error("device id must not be empty")]
    EmptyDevId,
}

/// Identifier of the remote device being monitored
///
/// Exactly one identifier is active per monitoring session, and its kind
/// never changes for the life of the process. The two kinds are not
/// comparable: a bus id names a physical port position on the remote host
/// (`1-2.3`), while a device id is an opaque host-assigned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdentifier {
    /// Hierarchical USB bus path on the remote host
    BusId(String),
    /// Opaque host-assigned device id
    DevId(String),
}

impl DeviceIdentifier {
    /// Create a bus-id identifier, validating the `N-M[.K...]` shape
    pub fn bus_id(raw: &str) -> Result<Self, IdentifierError> {
        if is_valid_bus_id(raw) {
            Ok(DeviceIdentifier::BusId(raw.to_string()))
        } else {
            Err(IdentifierError::InvalidBusId(raw.to_string()))
        }
    }

    /// Create a device-id identifier; the value is opaque and accepted verbatim
    pub fn dev_id(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            Err(IdentifierError::EmptyDevId)
        } else {
            Ok(DeviceIdentifier::DevId(raw.to_string()))
        }
    }

    /// The raw identifier value
    pub fn value(&self) -> &str {
        match self {
            DeviceIdentifier::BusId(v) | DeviceIdentifier::DevId(v) => v,
        }
    }

    pub fn is_bus_id(&self) -> bool {
        matches!(self, DeviceIdentifier::BusId(_))
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Check the `N-M[.K...]` bus path shape: a bus number, a dash, then one or
/// more dot-separated port numbers.
fn is_valid_bus_id(raw: &str) -> bool {
    let Some((bus, ports)) = raw.split_once('-') else {
        return false;
    };
    if bus.is_empty() || !bus.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    !ports.is_empty()
        && ports
            .split('.')
            .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
}
