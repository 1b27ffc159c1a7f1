//! Host-port glue - connects the USB host engine on the PIO root port
//! to the bridge.
//!
//! The engine's polling loop runs on the second core and must never
//! block, so both directions are decoupled through channels:
//!
//! - engine -> bridge: [`HostEvent`]s (mount/unmount/raw reports),
//!   pushed by the callback functions below with `try_send`.
//! - bridge -> engine: [`ReportRequest`]s re-arming report delivery,
//!   drained by the engine between polls.

use crate::bridge::input::{dispatch_host_event, HostEvent, HostPort};
use crate::bridge::output::ReportSink;
use crate::bridge::replay::KeyPacer;
use crate::bridge::Bridge;
use crate::config;
use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use heapless::Vec;

static HOST_EVENTS: Channel<
    CriticalSectionRawMutex,
    HostEvent,
    { config::HOST_EVENT_QUEUE_DEPTH },
> = Channel::new();

static REPORT_REQUESTS: Channel<
    CriticalSectionRawMutex,
    ReportRequest,
    { config::HOST_EVENT_QUEUE_DEPTH },
> = Channel::new();

/// One queued "arm the next interrupt transfer" request for the
/// engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportRequest {
    pub dev_addr: u8,
    pub instance: u8,
}

/// Receiver half of the re-arm queue, for the engine's polling loop.
pub fn report_request_receiver() -> Receiver<
    'static,
    CriticalSectionRawMutex,
    ReportRequest,
    { config::HOST_EVENT_QUEUE_DEPTH },
> {
    REPORT_REQUESTS.receiver()
}

/// Invoked by the engine when a HID interface finishes enumeration.
///
/// The report descriptor offered by the engine is ignored: only the
/// boot-protocol layouts are bridged, selected by `protocol`.
pub fn on_device_mounted(dev_addr: u8, instance: u8, protocol: u8, _desc_report: &[u8]) {
    info!(
        "[{}] HID interface {} mounted, protocol {}",
        dev_addr, instance, protocol
    );
    push_event(HostEvent::Mounted {
        dev_addr,
        instance,
        protocol,
    });
}

/// Invoked by the engine when an interface goes away.
pub fn on_device_unmounted(dev_addr: u8, instance: u8) {
    info!("[{}] HID interface {} unmounted", dev_addr, instance);
    push_event(HostEvent::Unmounted { dev_addr, instance });
}

/// Invoked by the engine for each completed interrupt-IN transfer.
pub fn on_report_received(dev_addr: u8, instance: u8, report: &[u8]) {
    let Ok(data) = Vec::from_slice(report) else {
        warn!("host report too large: {} bytes", report.len());
        return;
    };
    push_event(HostEvent::Report {
        dev_addr,
        instance,
        data,
    });
}

fn push_event(event: HostEvent) {
    // try_send keeps the engine's polling loop non-blocking; when the
    // bridge is behind (e.g. mid-replay) the event is dropped in
    // favour of newer input.
    if HOST_EVENTS.try_send(event).is_err() {
        warn!("host event queue full - dropping event");
    }
}

/// [`HostPort`] that queues re-arm requests for the engine.
pub struct ChannelHostPort;

impl HostPort for ChannelHostPort {
    fn request_report(&mut self, dev_addr: u8, instance: u8) -> bool {
        REPORT_REQUESTS
            .try_send(ReportRequest { dev_addr, instance })
            .is_ok()
    }
}

/// Drain host events into the bridge. Runs forever on the
/// host-processing executor; a replay in progress blocks this loop,
/// so input arriving meanwhile queues up to the channel depth and is
/// then shed.
pub async fn run_host_pump<S, P, const N: usize>(
    bridge: &mut Bridge<S, P, N>,
    port: &mut ChannelHostPort,
) -> !
where
    S: ReportSink,
    P: KeyPacer,
{
    info!("host event pump started");
    let events = HOST_EVENTS.receiver();
    loop {
        let event = events.receive().await;
        let _ = dispatch_host_event(bridge, port, event).await;
    }
}
