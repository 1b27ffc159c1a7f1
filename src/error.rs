//! Unified error types for usb2usb.
//!
//! We avoid `alloc` - all variants carry only fixed-size data and
//! implement `defmt::Format` when the feature is enabled.

/// Errors surfaced by an outgoing-report sink.
///
/// None of these is fatal: the bridge treats every variant as "drop
/// this cycle's output" and carries on (there is no error-reporting
/// channel upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// USB write or endpoint error.
    Io,
    /// Interface not configured or bus suspended.
    NotReady,
    /// Endpoint still busy with the previous report.
    Busy,
}
