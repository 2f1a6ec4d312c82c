//! Parsers for the text output of `usbip port` and `usbip list -r`
//!
//! Both functions are total: malformed, truncated, or error-banner input is
//! never an error, it simply fails to match. Lines longer than
//! [`MAX_LINE_LEN`] bytes are treated as non-matching rather than parsed.

use crate::device::DeviceIdentifier;

/// Longest line the parsers will consider. Real usbip output stays well
/// under this; anything longer is garbage and treated as a non-match.
pub const MAX_LINE_LEN: usize = 512;

/// Marker preceding the remote selector in a `usbip port` attachment record.
/// The path *before* the arrow is the local virtual port, not the remote
/// device, and must never be matched.
const REMOTE_MARKER: &str = "-> usbip://";

/// Prefix of a device-id remote selector
const DEVID_MARKER: &str = "devid=";

/// Does the `usbip port` output show this device as currently attached?
///
/// Scans line by line. For a bus id, a line matches when it carries a
/// `-> usbip://<host>/<path>` marker whose first path segment equals the
/// bus id exactly (so `7-4` does not match `7-40`, and a query string or
/// trailing text after the segment is fine). For a device id, a line
/// matches when it carries a `devid=<value>` token whose value equals the
/// id exactly.
pub fn is_attached(port_output: &str, id: &DeviceIdentifier) -> bool {
    lines(port_output).any(|line| {
        let line = line.trim();
        match id {
            DeviceIdentifier::BusId(busid) => has_remote_bus_id(line, busid),
            DeviceIdentifier::DevId(devid) => has_devid_token(line, devid),
        }
    })
}

/// Does the `usbip list -r <host>` output show this bus id as exportable?
///
/// A line matches when, after trimming leading whitespace, it starts with
/// the literal `<busid>:`. The colon requirement rules out prefix matches:
/// `7-4` matches neither `7-40:` nor `x7-4:`.
pub fn is_listed(list_output: &str, busid: &str) -> bool {
    lines(list_output).any(|line| {
        line.trim_start()
            .strip_prefix(busid)
            .is_some_and(|rest| rest.starts_with(':'))
    })
}

fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.split('\n').filter(|line| line.len() <= MAX_LINE_LEN)
}

/// Match the remote bus id field of an attachment record line
fn has_remote_bus_id(line: &str, busid: &str) -> bool {
    let Some(marker) = line.find(REMOTE_MARKER) else {
        return false;
    };
    // Path starts after the first '/' past the host[:port] part.
    let after_scheme = &line[marker + REMOTE_MARKER.len()..];
    let Some(slash) = after_scheme.find('/') else {
        return false;
    };
    let Some(rest) = after_scheme[slash + 1..].strip_prefix(busid) else {
        return false;
    };
    // Exact segment: the id must be followed by end-of-line, whitespace,
    // or a query-string delimiter, so "7-4" never matches "7-40".
    match rest.chars().next() {
        None => true,
        Some(c) => c == '?' || c.is_whitespace(),
    }
}

/// Match a `devid=<value>` selector as an exact contiguous token
fn has_devid_token(line: &str, devid: &str) -> bool {
    let mut rest = line;
    while let Some(pos) = rest.find(DEVID_MARKER) {
        let value = &rest[pos + DEVID_MARKER.len()..];
        let token = value.split_whitespace().next().unwrap_or("");
        if token == devid {
            return true;
        }
        rest = value;
    }
    false
}
