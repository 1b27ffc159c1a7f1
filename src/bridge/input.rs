//! Host-port surface: what the USB host engine delivers and what the
//! bridge asks of it.
//!
//! The engine notifies mount/unmount of HID interfaces on polled
//! devices and hands over raw interrupt transfers. Report delivery is
//! explicitly re-armed: after every received report (and once at
//! mount for bridged protocols) the bridge must request the next one
//! or the device goes quiet.

use heapless::Vec;

use crate::bridge::output::ReportSink;
use crate::bridge::replay::KeyPacer;
use crate::bridge::{Bridge, Disposition};
use crate::config;

/// One event from the USB host engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    /// A HID interface finished enumeration. `protocol` is the boot
    /// interface protocol from the interface descriptor.
    Mounted {
        dev_addr: u8,
        instance: u8,
        protocol: u8,
    },
    /// The interface (or the whole device) went away.
    Unmounted { dev_addr: u8, instance: u8 },
    /// One interrupt-IN transfer worth of raw report bytes.
    Report {
        dev_addr: u8,
        instance: u8,
        data: Vec<u8, { config::HOST_REPORT_MAX_BYTES }>,
    },
}

/// Services the bridge calls back into on the host engine.
pub trait HostPort {
    /// Arm the next interrupt-IN transfer for an interface. Returns
    /// false when the engine rejects the request.
    fn request_report(&mut self, dev_addr: u8, instance: u8) -> bool;
}

/// Feed one host-side event through the bridge.
///
/// Returns the report disposition for `Report` events; mount/unmount
/// bookkeeping yields `None`.
pub async fn dispatch_host_event<S, P, H, const N: usize>(
    bridge: &mut Bridge<S, P, N>,
    port: &mut H,
    event: HostEvent,
) -> Option<Disposition>
where
    S: ReportSink,
    P: KeyPacer,
    H: HostPort,
{
    match event {
        HostEvent::Mounted {
            dev_addr,
            instance,
            protocol,
        } => {
            // Only bridged protocols get polled at all.
            if bridge.attach_interface(dev_addr, instance, protocol) {
                port.request_report(dev_addr, instance);
            }
            None
        }
        HostEvent::Unmounted { dev_addr, instance } => {
            bridge.detach_interface(dev_addr, instance);
            None
        }
        HostEvent::Report {
            dev_addr,
            instance,
            data,
        } => {
            let disposition = bridge.on_report(dev_addr, instance, &data).await;
            // Keep the reports coming regardless of what this one did.
            port.request_report(dev_addr, instance);
            Some(disposition)
        }
    }
}
