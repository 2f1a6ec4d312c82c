//! Parser tests against realistic usbip output captures
//!
//! Fixtures mirror real `usbip port` and `usbip list -r` output, including
//! the banner lines, multi-line attachment records, and the hwdata error
//! the tool prints on hosts without usb.ids installed.
//!
//! Run with: `cargo test -p usbip --test parser_tests`

use usbip::{DeviceIdentifier, parser};

const PORT_OUTPUT_BUSID: &str = "\
Imported USB devices
====================
Port 00: <Port in Use> at Full Speed(12Mbps)
       unknown vendor : unknown product (1234:5678)
       1-1 -> usbip://192.168.1.1:3240/7-4
           -> remote bus/dev 007/004
Port 01: <Port in Use> at High Speed(480Mbps)
       Other Vendor : Other Product (aaaa:bbbb)
        2-2 -> usbip://192.168.1.1:3240/8-1 bus/dev 008/002
";

const PORT_OUTPUT_DEVID: &str = "\
Imported USB devices
====================
Port 01: <Port in Use> at High Speed(480Mbps)
       Example Corp : Example Device (abcd:ef01)
       3-2 -> usbip://10.0.0.5:3240/devid=0123456789abcdef
           -> remote bus/dev 001/002
Port 02: <Port in Use> at Super Speed(5Gbps)
        Another Corp : Another Device (beef:cafe)
         4-1 -> usbip://10.0.0.5:3240/devid=fedcba9876543210 bus/dev 002/003
";

const PORT_OUTPUT_EMPTY: &str = "\
Imported USB devices
====================
";

const PORT_OUTPUT_ERROR: &str = "\
Imported USB devices
====================
usbip: error: failed to open /usr/share/hwdata//usb.ids
";

const LIST_OUTPUT: &str = "\
Exportable USB devices
======================
 - 127.0.0.1
        7-4: unknown vendor : unknown product (2e8a:000f)
           : USB\\VID_2E8A&PID_000F\\D83ACDDEF8D410EB
           : (Defined at Interface level) (00/00/00)
        1-2: Some other device (1111:2222)
           : ...
usbip: error: failed to open /usr/share/hwdata//usb.ids
";

const LIST_OUTPUT_OTHER_DEVICE: &str = "\
Exportable USB devices
======================
 - 127.0.0.1
        1-2: Some other device (1111:2222)
           : ...
usbip: error: failed to open /usr/share/hwdata//usb.ids
";

const LIST_OUTPUT_EMPTY: &str = "\
Exportable USB devices
======================
 - 127.0.0.1
usbip: error: failed to open /usr/share/hwdata//usb.ids
";

const LIST_OUTPUT_NO_HOST: &str = "\
Exportable USB devices
======================
usbip: error: failed to open /usr/share/hwdata//usb.ids
";

fn bus(id: &str) -> DeviceIdentifier {
    DeviceIdentifier::bus_id(id).unwrap()
}

fn dev(id: &str) -> DeviceIdentifier {
    DeviceIdentifier::dev_id(id).unwrap()
}

#[test]
fn attached_bus_ids_are_found() {
    assert!(parser::is_attached(PORT_OUTPUT_BUSID, &bus("7-4")));
    assert!(parser::is_attached(PORT_OUTPUT_BUSID, &bus("8-1")));
}

#[test]
fn local_port_path_is_not_the_remote_bus_id() {
    // 1-1 appears on a record line, but only before the arrow.
    assert!(!parser::is_attached(PORT_OUTPUT_BUSID, &bus("1-1")));
    assert!(!parser::is_attached(PORT_OUTPUT_BUSID, &bus("2-2")));
}

#[test]
fn absent_bus_id_is_not_attached() {
    assert!(!parser::is_attached(PORT_OUTPUT_BUSID, &bus("9-9")));
    assert!(!parser::is_attached(PORT_OUTPUT_BUSID, &bus("7-40")));
}

#[test]
fn bus_id_prefix_of_a_longer_id_is_not_attached() {
    let out = "1-1 -> usbip://192.168.1.1:3240/7-40\n";
    assert!(!parser::is_attached(out, &bus("7-4")));
    assert!(parser::is_attached(out, &bus("7-40")));
}

#[test]
fn banner_only_and_error_output_never_match() {
    assert!(!parser::is_attached(PORT_OUTPUT_EMPTY, &bus("7-4")));
    assert!(!parser::is_attached(PORT_OUTPUT_ERROR, &bus("7-4")));
    assert!(!parser::is_attached(PORT_OUTPUT_EMPTY, &dev("0123456789abcdef")));
    assert!(!parser::is_attached(PORT_OUTPUT_ERROR, &dev("0123456789abcdef")));
}

#[test]
fn attached_device_ids_are_found() {
    assert!(parser::is_attached(PORT_OUTPUT_DEVID, &dev("0123456789abcdef")));
    assert!(parser::is_attached(PORT_OUTPUT_DEVID, &dev("fedcba9876543210")));
}

#[test]
fn device_id_requires_exact_token_match() {
    assert!(!parser::is_attached(PORT_OUTPUT_DEVID, &dev("deadbeefdeadbeef")));
    // Prefixes and extensions of a listed id must not match.
    assert!(!parser::is_attached(PORT_OUTPUT_DEVID, &dev("0123456789")));
    assert!(!parser::is_attached(PORT_OUTPUT_DEVID, &dev("0123456789abcdef00")));
}

#[test]
fn exported_bus_ids_are_listed() {
    assert!(parser::is_listed(LIST_OUTPUT, "7-4"));
    assert!(parser::is_listed(LIST_OUTPUT, "1-2"));
    assert!(!parser::is_listed(LIST_OUTPUT, "9-9"));
}

#[test]
fn listing_does_not_match_prefixes() {
    let out = "        7-40: something (1111:2222)\n";
    assert!(!parser::is_listed(out, "7-4"));
    assert!(parser::is_listed(out, "7-40"));
}

#[test]
fn listing_without_the_device_is_negative() {
    assert!(!parser::is_listed(LIST_OUTPUT_OTHER_DEVICE, "7-4"));
    assert!(parser::is_listed(LIST_OUTPUT_OTHER_DEVICE, "1-2"));
}

#[test]
fn empty_listings_are_negative() {
    assert!(!parser::is_listed(LIST_OUTPUT_EMPTY, "7-4"));
    assert!(!parser::is_listed(LIST_OUTPUT_NO_HOST, "7-4"));
    assert!(!parser::is_listed("", "7-4"));
}

#[test]
fn parsing_is_idempotent() {
    let first = parser::is_attached(PORT_OUTPUT_BUSID, &bus("7-4"));
    let second = parser::is_attached(PORT_OUTPUT_BUSID, &bus("7-4"));
    assert_eq!(first, second);

    let first = parser::is_listed(LIST_OUTPUT, "7-4");
    let second = parser::is_listed(LIST_OUTPUT, "7-4");
    assert_eq!(first, second);
}

#[test]
fn output_without_trailing_newline_still_matches() {
    let out = "Imported USB devices\n====================\n1-1 -> usbip://h/7-4";
    assert!(parser::is_attached(out, &bus("7-4")));
    assert!(parser::is_listed("7-4: device", "7-4"));
}
