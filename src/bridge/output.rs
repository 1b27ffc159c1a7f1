//! Outgoing-report sink trait.

use core::future::Future;

use crate::error::SinkError;
use crate::hid::HidReport;

/// Async sink for reports headed to the upstream host.
///
/// Abstracts the device-side HID interface so the bridge and replay
/// engine can be exercised on the host with mock sinks.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap
/// allocation.
pub trait ReportSink {
    /// True when the interface can accept a report right now.
    ///
    /// The bridge polls this once per emission attempt and drops the
    /// report when it is false - reports are never queued for later.
    fn is_ready(&self) -> bool;

    /// Send one report upstream.
    fn send(&mut self, report: &HidReport) -> impl Future<Output = Result<(), SinkError>>;
}
