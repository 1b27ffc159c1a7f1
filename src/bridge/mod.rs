//! Bridge orchestrator - ties host-observed input to device-emitted
//! output.
//!
//! Every keyboard report from the polled device is decoded, checked
//! for the replay hotkey, mined for a loggable character, and
//! re-encoded onto the upstream interface. Mouse reports pass through
//! untouched. All mutable state (the keystroke log, the mounted-
//! interface registry, the previous-report snapshot) lives in the
//! [`Bridge`] and is written only by the host-input path.

pub mod input;
pub mod keylog;
pub mod output;
pub mod replay;

use heapless::Vec;

use crate::config;
use crate::hid::keyboard::KeyboardReport;
use crate::hid::mouse::MouseReport;
use crate::hid::{self, HidReport, KeySlot, ReportKind};
use keylog::KeystrokeLog;
use output::ReportSink;
use replay::KeyPacer;

/// What the bridge did with one input cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Disposition {
    /// Report re-encoded and sent upstream.
    Forwarded,
    /// Replay hotkey held; the log was typed out instead of the report.
    Replayed { reports: usize },
    /// Upstream interface not ready (or the write failed); the report
    /// was dropped for this cycle, not queued.
    Dropped,
    /// Unknown interface or unparseable payload; nothing happened.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct MountedInterface {
    dev_addr: u8,
    instance: u8,
    kind: ReportKind,
}

/// The bridge state machine. `N` is the keystroke-log capacity.
pub struct Bridge<S, P, const N: usize> {
    sink: S,
    pacer: P,
    log: KeystrokeLog<N>,
    interfaces: Vec<MountedInterface, { config::MAX_HOST_INTERFACES }>,
    /// Last keyboard report forwarded, for key-down edge detection.
    prev_keys: KeyboardReport,
}

impl<S, P, const N: usize> Bridge<S, P, N>
where
    S: ReportSink,
    P: KeyPacer,
{
    pub fn new(sink: S, pacer: P) -> Self {
        Self {
            sink,
            pacer,
            log: KeystrokeLog::new(),
            interfaces: Vec::new(),
            prev_keys: KeyboardReport::default(),
        }
    }

    /// The typed-text log (read-only).
    pub fn log(&self) -> &KeystrokeLog<N> {
        &self.log
    }

    /// Register a mounted HID interface. Returns true when the
    /// interface protocol is bridged (boot keyboard or mouse) and the
    /// registry accepted it; such interfaces are worth polling.
    pub fn attach_interface(&mut self, dev_addr: u8, instance: u8, protocol: u8) -> bool {
        let Some(kind) = ReportKind::from_interface_protocol(protocol) else {
            return false;
        };
        // A re-mount of the same address/instance replaces the stale
        // entry.
        self.detach_interface(dev_addr, instance);
        self.interfaces
            .push(MountedInterface {
                dev_addr,
                instance,
                kind,
            })
            .is_ok()
    }

    /// Forget an interface on unmount. Unknown pairs are a no-op.
    pub fn detach_interface(&mut self, dev_addr: u8, instance: u8) {
        if let Some(pos) = self
            .interfaces
            .iter()
            .position(|m| m.dev_addr == dev_addr && m.instance == instance)
        {
            self.interfaces.swap_remove(pos);
        }
    }

    fn kind_of(&self, dev_addr: u8, instance: u8) -> Option<ReportKind> {
        self.interfaces
            .iter()
            .find(|m| m.dev_addr == dev_addr && m.instance == instance)
            .map(|m| m.kind)
    }

    /// Process one raw report from the host port.
    pub async fn on_report(&mut self, dev_addr: u8, instance: u8, data: &[u8]) -> Disposition {
        let Some(kind) = self.kind_of(dev_addr, instance) else {
            return Disposition::Ignored;
        };
        match hid::classify_report(kind, data) {
            Some(HidReport::Keyboard(report)) => self.process_keyboard(report).await,
            Some(HidReport::Mouse(report)) => self.process_mouse(report).await,
            None => Disposition::Ignored,
        }
    }

    /// Decode, trigger-check, log and forward one keyboard report.
    ///
    /// A pure-release report (all key slots zero) is still forwarded -
    /// the upstream host needs it to clear its pressed-key state.
    pub async fn process_keyboard(&mut self, report: KeyboardReport) -> Disposition {
        let slots = hid::decode_keys(&report);

        // Layout-corrected usages go out on the wire.
        let mut logical = report;
        for (dst, slot) in logical.keycodes.iter_mut().zip(slots.iter()) {
            *dst = slot.usage;
        }

        if replay_hotkey(&slots, &report) {
            let reports = replay::replay_log(&self.log, &mut self.sink, &mut self.pacer).await;
            self.prev_keys = logical;
            return Disposition::Replayed { reports };
        }

        // Log the primary slot's character on its key-down edge only;
        // held keys and releases never re-log.
        let primary = slots[0];
        if primary.cased != 0 && !self.prev_keys.contains_key(primary.usage) {
            self.log.append(primary.cased);
        }
        self.prev_keys = logical;

        self.emit(HidReport::Keyboard(logical)).await
    }

    /// Forward one mouse report verbatim - buttons and deltas
    /// unchanged.
    pub async fn process_mouse(&mut self, report: MouseReport) -> Disposition {
        self.emit(HidReport::Mouse(report)).await
    }

    async fn emit(&mut self, report: HidReport) -> Disposition {
        // Send now or drop this cycle; reports are never buffered.
        if !self.sink.is_ready() {
            return Disposition::Dropped;
        }
        match self.sink.send(&report).await {
            Ok(()) => Disposition::Forwarded,
            Err(_) => Disposition::Dropped,
        }
    }
}

/// Replay hotkey: the two leading key slots read 'p' then 'b'
/// (unshifted) while both Shift and Alt are held. Anything less -
/// one modifier, one matching key - does not arm it.
fn replay_hotkey(slots: &[KeySlot; 6], report: &KeyboardReport) -> bool {
    slots[0].plain == config::REPLAY_HOTKEY[0]
        && slots[1].plain == config::REPLAY_HOTKEY[1]
        && report.shift()
        && report.alt()
}

#[cfg(test)]
mod tests {
    use super::input::{dispatch_host_event, HostEvent, HostPort};
    use super::*;
    use crate::error::SinkError;
    use crate::hid::keyboard::{MOD_LEFT_ALT, MOD_LEFT_SHIFT, MOD_RIGHT_ALT, MOD_RIGHT_SHIFT};
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    // Usage codes used throughout: h=0x0b, i=0x0c, p=0x13, b=0x05.
    const KEY_H: u8 = 0x0b;
    const KEY_I: u8 = 0x0c;
    const KEY_P: u8 = 0x13;
    const KEY_B: u8 = 0x05;

    struct MockSink {
        ready: Arc<AtomicBool>,
        sent: Arc<Mutex<Vec<HidReport>>>,
    }

    impl MockSink {
        fn new() -> (Self, Arc<AtomicBool>, Arc<Mutex<Vec<HidReport>>>) {
            let ready = Arc::new(AtomicBool::new(true));
            let sent = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    ready: ready.clone(),
                    sent: sent.clone(),
                },
                ready,
                sent,
            )
        }
    }

    impl ReportSink for MockSink {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::Relaxed)
        }

        fn send(&mut self, report: &HidReport) -> impl Future<Output = Result<(), SinkError>> {
            self.sent.lock().unwrap().push(report.clone());
            core::future::ready(Ok(()))
        }
    }

    struct MockPacer {
        pauses: Arc<Mutex<Vec<u64>>>,
    }

    impl MockPacer {
        fn new() -> (Self, Arc<Mutex<Vec<u64>>>) {
            let pauses = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    pauses: pauses.clone(),
                },
                pauses,
            )
        }
    }

    impl KeyPacer for MockPacer {
        fn pause_ms(&mut self, millis: u64) -> impl Future<Output = ()> {
            self.pauses.lock().unwrap().push(millis);
            core::future::ready(())
        }
    }

    struct MockPort {
        requests: Arc<Mutex<Vec<(u8, u8)>>>,
    }

    impl MockPort {
        fn new() -> (Self, Arc<Mutex<Vec<(u8, u8)>>>) {
            let requests = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    requests: requests.clone(),
                },
                requests,
            )
        }
    }

    impl HostPort for MockPort {
        fn request_report(&mut self, dev_addr: u8, instance: u8) -> bool {
            self.requests.lock().unwrap().push((dev_addr, instance));
            true
        }
    }

    // Minimal blocking executor - every mock future resolves on the
    // first poll.
    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: f is not moved after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => panic!("mock future returned Pending unexpectedly"),
            }
        }
    }

    type TestBridge = Bridge<MockSink, MockPacer, 16>;

    fn test_bridge() -> (
        TestBridge,
        Arc<AtomicBool>,
        Arc<Mutex<Vec<HidReport>>>,
        Arc<Mutex<Vec<u64>>>,
    ) {
        let (sink, ready, sent) = MockSink::new();
        let (pacer, pauses) = MockPacer::new();
        (Bridge::new(sink, pacer), ready, sent, pauses)
    }

    fn key_report(modifier: u8, keycodes: [u8; 6]) -> KeyboardReport {
        KeyboardReport {
            modifier,
            reserved: 0,
            keycodes,
        }
    }

    fn press(key: u8) -> KeyboardReport {
        key_report(0, [key, 0, 0, 0, 0, 0])
    }

    fn release() -> KeyboardReport {
        key_report(0, [0; 6])
    }

    fn trigger_report() -> KeyboardReport {
        key_report(MOD_LEFT_SHIFT | MOD_LEFT_ALT, [KEY_P, KEY_B, 0, 0, 0, 0])
    }

    // ------------------------------------------------------------------
    // Passthrough
    // ------------------------------------------------------------------

    #[test]
    fn keyboard_passthrough_preserves_report() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        let report = key_report(MOD_LEFT_SHIFT, [KEY_H, KEY_I, 0, 0, 0, 0]);

        let d = block_on(bridge.process_keyboard(report));
        assert_eq!(d, Disposition::Forwarded);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], HidReport::Keyboard(report));
    }

    #[test]
    fn release_report_is_forwarded_not_dropped() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        block_on(bridge.process_keyboard(press(KEY_H)));

        let d = block_on(bridge.process_keyboard(release()));
        assert_eq!(d, Disposition::Forwarded);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], HidReport::Keyboard(release()));
    }

    #[test]
    fn mouse_passthrough_is_faithful() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        let report = MouseReport {
            buttons: 0x05,
            x: -17,
            y: 42,
            wheel: -1,
        };

        let d = block_on(bridge.process_mouse(report));
        assert_eq!(d, Disposition::Forwarded);

        let sent = sent.lock().unwrap();
        // The decoded motion goes out unchanged - no synthetic
        // movement is substituted.
        assert_eq!(sent[0], HidReport::Mouse(report));
    }

    // ------------------------------------------------------------------
    // Keystroke logging
    // ------------------------------------------------------------------

    #[test]
    fn key_down_edges_accumulate_in_order() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        for key in [KEY_H, KEY_I] {
            block_on(bridge.process_keyboard(press(key)));
            block_on(bridge.process_keyboard(release()));
        }

        let logged: Vec<u8> = bridge.log().iter().copied().collect();
        assert_eq!(logged, b"hi");
    }

    #[test]
    fn held_key_is_logged_once() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        block_on(bridge.process_keyboard(press(KEY_H)));
        // Same key still down in a subsequent report.
        block_on(bridge.process_keyboard(press(KEY_H)));
        block_on(bridge.process_keyboard(release()));

        assert_eq!(bridge.log().len(), 1);
    }

    #[test]
    fn shifted_press_logs_cased_character() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        block_on(bridge.process_keyboard(key_report(MOD_RIGHT_SHIFT, [KEY_H, 0, 0, 0, 0, 0])));

        let logged: Vec<u8> = bridge.log().iter().copied().collect();
        assert_eq!(logged, b"H");
    }

    #[test]
    fn non_printable_keys_are_not_logged() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        // F1 (0x3a) and a release: nothing printable.
        block_on(bridge.process_keyboard(press(0x3a)));
        block_on(bridge.process_keyboard(release()));

        assert!(bridge.log().is_empty());
    }

    // ------------------------------------------------------------------
    // Replay trigger
    // ------------------------------------------------------------------

    #[test]
    fn hotkey_replays_log_and_suppresses_passthrough() {
        let (mut bridge, _ready, sent, pauses) = test_bridge();
        for key in [KEY_H, KEY_I] {
            block_on(bridge.process_keyboard(press(key)));
            block_on(bridge.process_keyboard(release()));
        }
        sent.lock().unwrap().clear();

        let d = block_on(bridge.process_keyboard(trigger_report()));
        assert_eq!(d, Disposition::Replayed { reports: 2 });

        let sent = sent.lock().unwrap();
        // Exactly the two replayed keystrokes - the trigger report
        // itself never reaches the upstream host.
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            HidReport::Keyboard(key_report(0, [KEY_H, 0, 0, 0, 0, 0]))
        );
        assert_eq!(
            sent[1],
            HidReport::Keyboard(key_report(0, [KEY_I, 0, 0, 0, 0, 0]))
        );
        // One fixed pause after each keystroke.
        assert_eq!(
            pauses.lock().unwrap().as_slice(),
            &[config::REPLAY_KEY_DELAY_MS; 2]
        );
    }

    #[test]
    fn replay_does_not_grow_the_log() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        for key in [KEY_H, KEY_I] {
            block_on(bridge.process_keyboard(press(key)));
            block_on(bridge.process_keyboard(release()));
        }
        assert_eq!(bridge.log().len(), 2);

        block_on(bridge.process_keyboard(trigger_report()));
        assert_eq!(bridge.log().len(), 2);
    }

    #[test]
    fn replay_reproduces_shift_state() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        // Type 'H' (shifted) then '1'.
        block_on(bridge.process_keyboard(key_report(MOD_LEFT_SHIFT, [KEY_H, 0, 0, 0, 0, 0])));
        block_on(bridge.process_keyboard(release()));
        block_on(bridge.process_keyboard(press(0x1e)));
        block_on(bridge.process_keyboard(release()));
        sent.lock().unwrap().clear();

        block_on(bridge.process_keyboard(trigger_report()));

        let sent = sent.lock().unwrap();
        assert_eq!(
            sent[0],
            HidReport::Keyboard(key_report(MOD_LEFT_SHIFT, [KEY_H, 0, 0, 0, 0, 0]))
        );
        assert_eq!(
            sent[1],
            HidReport::Keyboard(key_report(0, [0x1e, 0, 0, 0, 0, 0]))
        );
    }

    #[test]
    fn replay_skips_unmappable_characters() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        bridge.log.append(0x01); // no key types SOH
        bridge.log.append(b'a');

        let d = block_on(bridge.process_keyboard(trigger_report()));
        assert_eq!(d, Disposition::Replayed { reports: 1 });
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn hotkey_requires_every_condition() {
        let cases = [
            // Shift only
            key_report(MOD_LEFT_SHIFT, [KEY_P, KEY_B, 0, 0, 0, 0]),
            // Alt only
            key_report(MOD_RIGHT_ALT, [KEY_P, KEY_B, 0, 0, 0, 0]),
            // No modifiers
            key_report(0, [KEY_P, KEY_B, 0, 0, 0, 0]),
            // Wrong second key ('p' + 'x')
            key_report(MOD_LEFT_SHIFT | MOD_LEFT_ALT, [KEY_P, 0x1b, 0, 0, 0, 0]),
            // Wrong first key ('x' + 'b')
            key_report(MOD_LEFT_SHIFT | MOD_LEFT_ALT, [0x1b, KEY_B, 0, 0, 0, 0]),
            // Keys swapped
            key_report(MOD_LEFT_SHIFT | MOD_LEFT_ALT, [KEY_B, KEY_P, 0, 0, 0, 0]),
        ];
        for report in cases {
            let (mut bridge, _ready, _sent, _) = test_bridge();
            let d = block_on(bridge.process_keyboard(report));
            assert_eq!(d, Disposition::Forwarded, "must not trigger: {report:?}");
        }
    }

    #[test]
    fn hotkey_accepts_right_hand_modifiers() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        let report = key_report(MOD_RIGHT_SHIFT | MOD_RIGHT_ALT, [KEY_P, KEY_B, 0, 0, 0, 0]);
        let d = block_on(bridge.process_keyboard(report));
        assert_eq!(d, Disposition::Replayed { reports: 0 });
    }

    // ------------------------------------------------------------------
    // Channel readiness
    // ------------------------------------------------------------------

    #[test]
    fn unready_sink_drops_without_error_or_requeue() {
        let (mut bridge, ready, sent, _) = test_bridge();
        ready.store(false, Ordering::Relaxed);

        let d = block_on(bridge.process_keyboard(press(KEY_H)));
        assert_eq!(d, Disposition::Dropped);
        assert!(sent.lock().unwrap().is_empty());

        // Next ready cycle resumes normal emission; the dropped report
        // is not resent.
        ready.store(true, Ordering::Relaxed);
        let d = block_on(bridge.process_keyboard(press(KEY_I)));
        assert_eq!(d, Disposition::Forwarded);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            HidReport::Keyboard(key_report(0, [KEY_I, 0, 0, 0, 0, 0]))
        );
    }

    #[test]
    fn unready_sink_still_logs_the_keystroke() {
        let (mut bridge, ready, _sent, _) = test_bridge();
        ready.store(false, Ordering::Relaxed);

        block_on(bridge.process_keyboard(press(KEY_H)));
        assert_eq!(bridge.log().len(), 1);
    }

    // ------------------------------------------------------------------
    // Interface registry and host-event dispatch
    // ------------------------------------------------------------------

    #[test]
    fn report_from_unknown_interface_is_ignored() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        let d = block_on(bridge.on_report(1, 0, &[0, 0, KEY_H, 0, 0, 0, 0, 0]));
        assert_eq!(d, Disposition::Ignored);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn unbridged_protocol_is_not_attached() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        // Protocol 0 = None (e.g. a vendor HID interface).
        assert!(!bridge.attach_interface(1, 0, 0));
        let d = block_on(bridge.on_report(1, 0, &[0u8; 8]));
        assert_eq!(d, Disposition::Ignored);
    }

    #[test]
    fn truncated_report_is_ignored() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        assert!(bridge.attach_interface(1, 0, 1));
        let d = block_on(bridge.on_report(1, 0, &[0, 0, KEY_H]));
        assert_eq!(d, Disposition::Ignored);
    }

    #[test]
    fn detach_stops_bridging() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        assert!(bridge.attach_interface(1, 0, 2));
        bridge.detach_interface(1, 0);
        let d = block_on(bridge.on_report(1, 0, &[0, 5, 5, 0]));
        assert_eq!(d, Disposition::Ignored);
    }

    #[test]
    fn mount_event_arms_report_delivery() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        let (mut port, requests) = MockPort::new();

        let out = block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Mounted {
                dev_addr: 1,
                instance: 0,
                protocol: 1,
            },
        ));
        assert_eq!(out, None);
        assert_eq!(requests.lock().unwrap().as_slice(), &[(1, 0)]);
    }

    #[test]
    fn mount_of_unbridged_protocol_is_not_armed() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        let (mut port, requests) = MockPort::new();

        block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Mounted {
                dev_addr: 1,
                instance: 0,
                protocol: 0,
            },
        ));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[test]
    fn every_report_rearms_delivery() {
        let (mut bridge, _ready, sent, _) = test_bridge();
        let (mut port, requests) = MockPort::new();

        block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Mounted {
                dev_addr: 2,
                instance: 1,
                protocol: 1,
            },
        ));

        let mut data = heapless::Vec::new();
        data.extend_from_slice(&[0, 0, KEY_H, 0, 0, 0, 0, 0]).unwrap();
        let out = block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Report {
                dev_addr: 2,
                instance: 1,
                data,
            },
        ));
        assert_eq!(out, Some(Disposition::Forwarded));
        // Once at mount, once after the report.
        assert_eq!(requests.lock().unwrap().as_slice(), &[(2, 1), (2, 1)]);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn unmount_event_detaches() {
        let (mut bridge, _ready, _sent, _) = test_bridge();
        let (mut port, _requests) = MockPort::new();

        block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Mounted {
                dev_addr: 1,
                instance: 0,
                protocol: 2,
            },
        ));
        block_on(dispatch_host_event(
            &mut bridge,
            &mut port,
            HostEvent::Unmounted {
                dev_addr: 1,
                instance: 0,
            },
        ));

        let d = block_on(bridge.on_report(1, 0, &[0, 1, 1, 0]));
        assert_eq!(d, Disposition::Ignored);
    }
}
