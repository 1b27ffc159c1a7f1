//! Scan-code translation tables (US layout).
//!
//! Two 128-entry statics cover the printable range of the HID
//! Keyboard/Keypad usage page:
//!
//! - [`KEYCODE_TO_ASCII`]: usage code -> (unshifted ASCII, shifted ASCII)
//! - [`ASCII_TO_KEYCODE`]: ASCII byte -> (needs-shift flag, usage code)
//!
//! The inverse table is derived from the forward table at compile time,
//! preferring the lowest usage code when several keys type the same
//! character (main row beats keypad), so encoding a character and
//! decoding the resulting report always returns the original character.
//! Unmapped entries are the zero sentinel on both sides.

/// Entries per table (covers the 7-bit ASCII range and the usage codes
/// that decode into it).
pub const TABLE_LEN: usize = 128;

/// HID usage code for the Enter key.
pub const KEY_ENTER: u8 = 0x28;

/// Usage code -> (unshifted, shifted) ASCII. Zero means "not printable".
pub static KEYCODE_TO_ASCII: [(u8, u8); TABLE_LEN] = build_forward();

/// ASCII byte -> (needs-shift, usage code). Usage zero means "no key
/// types this character".
pub static ASCII_TO_KEYCODE: [(bool, u8); TABLE_LEN] = build_inverse();

const DIGIT_ROW: [u8; 10] = *b"1234567890";
const DIGIT_ROW_SHIFTED: [u8; 10] = *b"!@#$%^&*()";

/// The two ASCII renderings of a single usage code.
const fn ascii_pair(usage: u8) -> (u8, u8) {
    match usage {
        // Letter block: a..z / A..Z
        0x04..=0x1d => (b'a' + (usage - 0x04), b'A' + (usage - 0x04)),
        // Digit row: 1..9, 0 with the symbol row above it
        0x1e..=0x27 => {
            let i = (usage - 0x1e) as usize;
            (DIGIT_ROW[i], DIGIT_ROW_SHIFTED[i])
        }
        0x28 => (b'\r', b'\r'), // Enter
        0x29 => (0x1b, 0x1b),   // Escape
        0x2a => (0x08, 0x08),   // Backspace
        0x2b => (b'\t', b'\t'), // Tab
        0x2c => (b' ', b' '),   // Space
        0x2d => (b'-', b'_'),
        0x2e => (b'=', b'+'),
        0x2f => (b'[', b'{'),
        0x30 => (b']', b'}'),
        0x31 => (b'\\', b'|'),
        0x33 => (b';', b':'),
        0x34 => (b'\'', b'"'),
        0x35 => (b'`', b'~'),
        0x36 => (b',', b'<'),
        0x37 => (b'.', b'>'),
        0x38 => (b'/', b'?'),
        // Keypad block (shift state does not change these)
        0x54 => (b'/', b'/'),
        0x55 => (b'*', b'*'),
        0x56 => (b'-', b'-'),
        0x57 => (b'+', b'+'),
        0x58 => (b'\r', b'\r'),
        0x59..=0x61 => (b'1' + (usage - 0x59), 0),
        0x62 => (b'0', 0),
        0x63 => (b'.', 0),
        _ => (0, 0),
    }
}

const fn build_forward() -> [(u8, u8); TABLE_LEN] {
    let mut table = [(0u8, 0u8); TABLE_LEN];
    let mut usage = 0;
    while usage < TABLE_LEN {
        table[usage] = ascii_pair(usage as u8);
        usage += 1;
    }
    table
}

const fn build_inverse() -> [(bool, u8); TABLE_LEN] {
    let mut table = [(false, 0u8); TABLE_LEN];
    let mut usage = 0;
    while usage < TABLE_LEN {
        let pair = ascii_pair(usage as u8);
        let plain = pair.0;
        let shifted = pair.1;
        if plain != 0 && (plain as usize) < TABLE_LEN && table[plain as usize].1 == 0 {
            table[plain as usize] = (false, usage as u8);
        }
        if shifted != 0
            && shifted != plain
            && (shifted as usize) < TABLE_LEN
            && table[shifted as usize].1 == 0
        {
            table[shifted as usize] = (true, usage as u8);
        }
        usage += 1;
    }
    // Line feed types Enter, same as carriage return.
    table[b'\n' as usize] = (false, KEY_ENTER);
    table
}

/// ASCII for a usage code, honouring the shift state. Returns 0 for
/// anything that does not print.
pub fn keycode_to_ascii(usage: u8, shifted: bool) -> u8 {
    if (usage as usize) >= TABLE_LEN {
        return 0;
    }
    let (plain, cased) = KEYCODE_TO_ASCII[usage as usize];
    if shifted {
        cased
    } else {
        plain
    }
}

/// (needs-shift, usage code) that types an ASCII byte. Usage 0 means
/// the character cannot be typed on this layout.
pub fn ascii_to_keycode(ch: u8) -> (bool, u8) {
    if (ch as usize) >= TABLE_LEN {
        return (false, 0);
    }
    ASCII_TO_KEYCODE[ch as usize]
}

/// Physical-to-logical usage remap applied before table lookup.
///
/// With the `colemak` feature the polled keyboard is assumed to carry
/// Colemak keycaps; the remap folds its scan codes back onto the US
/// table. Identity otherwise.
#[cfg(not(feature = "colemak"))]
#[inline]
pub fn logical_usage(usage: u8) -> u8 {
    usage
}

#[cfg(feature = "colemak")]
pub fn logical_usage(usage: u8) -> u8 {
    if (usage as usize) >= TABLE_LEN {
        return usage;
    }
    match COLEMAK_REMAP[usage as usize] {
        0 => usage,
        mapped => mapped,
    }
}

/// Colemak scan code -> US-layout usage. Zero entries are unchanged.
#[cfg(feature = "colemak")]
static COLEMAK_REMAP: [u8; TABLE_LEN] = [
    0, 0, 0, 0, 0, 0, 0, 22, //
    9, 23, 7, 0, 24, 17, 8, 12, //
    0, 14, 28, 51, 0, 19, 21, 10, //
    15, 0, 0, 0, 13, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 18, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, //
];
