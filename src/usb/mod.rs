//! USB subsystem glue (embedded builds only).
//!
//! The RP2040's native USB controller is driven by `embassy-usb` as a
//! **composite device** with two HID interfaces:
//!
//! - Interface 0: Keyboard (boot protocol)
//! - Interface 1: Mouse    (boot protocol)
//!
//! The PIO-driven second root port runs the USB host engine that polls
//! the downstream keyboard/mouse; its callbacks land in [`host`] and
//! cross to the bridge over a channel.

pub mod hid_device;
pub mod host;
