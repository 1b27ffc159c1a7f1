//! Replay engine - types the keystroke log back out as synthetic
//! key presses.
//!
//! Each logged character becomes one single-key report (with Left
//! Shift when the inverse table asks for it) followed by a fixed
//! pause, pacing the burst like a physical keyboard so the upstream
//! host registers each press. The engine only reads the log; nothing
//! it emits is ever appended back (the log is written solely by the
//! host-input path).

use core::future::Future;

use crate::bridge::keylog::KeystrokeLog;
use crate::bridge::output::ReportSink;
use crate::config;
use crate::hid::keyboard::{KeyboardReport, MOD_LEFT_SHIFT};
use crate::hid::{keymap, HidReport};

/// Injected wait capability for inter-keystroke pacing.
///
/// Keeps the engine free of a direct timer dependency: the embedded
/// build passes an `embassy-time` pacer, tests pass a recording mock,
/// and a non-blocking redesign could reschedule instead of pausing.
pub trait KeyPacer {
    fn pause_ms(&mut self, millis: u64) -> impl Future<Output = ()>;
}

/// Type the whole log through `sink`, oldest character first.
///
/// Characters the inverse table cannot produce are skipped. Emission
/// is readiness-gated per report: an unready sink drops that keystroke
/// but the pacing cadence continues. Returns the number of reports
/// actually sent.
///
/// Blocks the calling context for roughly `log.len()` times the
/// configured delay; host input arriving meanwhile is not polled.
pub async fn replay_log<S, P, const N: usize>(
    log: &KeystrokeLog<N>,
    sink: &mut S,
    pacer: &mut P,
) -> usize
where
    S: ReportSink,
    P: KeyPacer,
{
    let mut emitted = 0;

    for &ch in log.iter() {
        let (needs_shift, usage) = keymap::ascii_to_keycode(ch);
        if usage == 0 {
            continue;
        }

        let mut report = KeyboardReport::default();
        if needs_shift {
            report.modifier = MOD_LEFT_SHIFT;
        }
        report.keycodes[0] = usage;

        if sink.is_ready() && sink.send(&HidReport::Keyboard(report)).await.is_ok() {
            emitted += 1;
        }

        pacer.pause_ms(config::REPLAY_KEY_DELAY_MS).await;
    }

    emitted
}
