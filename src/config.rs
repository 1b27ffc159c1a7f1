//! Application-wide constants and compile-time configuration.
//!
//! Protocol constants, timing parameters, and buffer sizing live here
//! so they can be tuned in one place.

// USB device identity

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0010;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "usb2usb";
pub const USB_PRODUCT: &str = "USB-to-USB HID Bridge";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms). 1 ms = 1000 Hz for lowest latency.
pub const USB_HID_POLL_MS: u8 = 1;

// Keystroke log

/// Capacity of the rolling typed-text log (bytes). When the log is
/// full the oldest character is discarded.
pub const LOG_CAPACITY: usize = 128;

// Replay

/// Pause between synthetic keystrokes during replay (ms). Paces the
/// burst like a physical keyboard so the upstream host sees distinct
/// key presses.
pub const REPLAY_KEY_DELAY_MS: u64 = 50;

/// Unshifted characters the two leading key slots must read, with
/// Shift and Alt held, to start a replay of the log.
pub const REPLAY_HOTKEY: [u8; 2] = *b"pb";

// Host port

/// Most simultaneous HID interfaces tracked across polled devices.
pub const MAX_HOST_INTERFACES: usize = 4;

/// Largest raw interrupt-transfer payload accepted from a polled
/// device (boot keyboard reports are 8 bytes, mice 3-4).
pub const HOST_REPORT_MAX_BYTES: usize = 16;

/// Depth of the event channel between the host engine and the bridge.
pub const HOST_EVENT_QUEUE_DEPTH: usize = 16;
