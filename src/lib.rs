//! Host-testable library surface for usb2usb.
//!
//! Everything that does not touch hardware lives here: the boot-protocol
//! report codec and scan-code tables, the keystroke log, the replay
//! engine, and the bridge orchestrator that ties host-side input to
//! device-side output.
//!
//! Usage: `cargo test` (host, default features).
//!
//! The embedded binary (`main.rs`, built with `--features embedded`)
//! wires these modules to Embassy on the RP2040: the native USB
//! controller runs the device stack, the PIO-driven root port runs the
//! host engine that feeds `usb::host`.

#![cfg_attr(not(test), no_std)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod hid;

#[cfg(feature = "embedded")]
pub mod usb;
