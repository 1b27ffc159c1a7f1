//! HID report types and the host-to-device translation codec.
//!
//! Only the fixed boot-protocol keyboard and mouse layouts are
//! handled; report descriptors offered at mount time are ignored.

pub mod keyboard;
pub mod keymap;
pub mod mouse;


use keyboard::KeyboardReport;
use mouse::MouseReport;

/// Report IDs on the upstream device interface.
pub const REPORT_ID_KEYBOARD: u8 = 1;
pub const REPORT_ID_MOUSE: u8 = 2;

/// What kind of reports a mounted HID interface delivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportKind {
    Keyboard,
    Mouse,
}

impl ReportKind {
    /// Classify a mounted interface by its boot interface protocol
    /// (1 = keyboard, 2 = mouse). Anything else is not bridged.
    pub fn from_interface_protocol(protocol: u8) -> Option<Self> {
        match protocol {
            1 => Some(ReportKind::Keyboard),
            2 => Some(ReportKind::Mouse),
            _ => None,
        }
    }
}

/// One outgoing HID report for the upstream device interface.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
}

impl HidReport {
    pub fn report_id(&self) -> u8 {
        match self {
            HidReport::Keyboard(_) => REPORT_ID_KEYBOARD,
            HidReport::Mouse(_) => REPORT_ID_MOUSE,
        }
    }

    /// Serialise the payload into `buf`, returning the bytes written.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(k) => k.serialize(buf),
            HidReport::Mouse(m) => m.serialize(buf),
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, HidReport::Keyboard(_))
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self, HidReport::Mouse(_))
    }
}

/// Parse a raw interrupt transfer according to the interface kind it
/// arrived on. Truncated payloads yield `None`.
pub fn classify_report(kind: ReportKind, data: &[u8]) -> Option<HidReport> {
    match kind {
        ReportKind::Keyboard => KeyboardReport::from_bytes(data).map(HidReport::Keyboard),
        ReportKind::Mouse => MouseReport::from_bytes(data).map(HidReport::Mouse),
    }
}

/// One decoded key slot: the (layout-corrected) usage code plus its
/// unshifted and shift-cased ASCII renderings. Zero ASCII means the
/// slot is empty or does not print.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySlot {
    pub usage: u8,
    pub plain: u8,
    pub cased: u8,
}

/// Decode all six key slots of a keyboard report against the scan-code
/// tables. The cased rendering honours the report's own Shift state;
/// there is no failure mode - unmapped usages decode to ASCII 0.
pub fn decode_keys(report: &KeyboardReport) -> [KeySlot; 6] {
    let shifted = report.shift();
    let mut slots = [KeySlot::default(); 6];
    for (slot, &raw) in slots.iter_mut().zip(report.keycodes.iter()) {
        let usage = keymap::logical_usage(raw);
        slot.usage = usage;
        slot.plain = keymap::keycode_to_ascii(usage, false);
        slot.cased = keymap::keycode_to_ascii(usage, shifted);
    }
    slots
}
