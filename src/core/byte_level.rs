//! Byte-to-visible-character codec for byte-level BPE.
//!
//! GPT-2-family vocabularies are written over a fixed alphabet of 256
//! printable Unicode code points, one per byte value. Encoding expands every
//! UTF-8 byte of the input into its visible character (so BPE can merge over
//! a `char` sequence while still covering arbitrary bytes); decoding inverts
//! the mapping back to bytes before UTF-8 assembly.
//!
//! # Mapping strategy
//!
//! Bytes that are already printable and safe map to themselves, the rest are
//! relocated into an unused printable region starting at U+0100:
//!
//! - Bytes 33-126 (`!` to `~`): map to themselves
//! - Bytes 161-172 (`¡` to `¬`): map to themselves
//! - Bytes 174-255 (`®` to `ÿ`): map to themselves
//! - Everything else (0-32, 127-160, 173): maps to U+0100 onwards
//!
//! Space (0x20) therefore becomes `Ġ` (U+0120), which is why GPT-2 token
//! strings look like `"Ġthe"`. The table is fixed for the program lifetime
//! and bijective in both directions.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Byte to visible character mapping (256 entries).
static BYTE_TO_CHAR: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut mapping = ['\0'; 256];

    let mut direct: Vec<u8> = Vec::new();
    direct.extend(33u8..=126);
    direct.extend(161u8..=172);
    direct.extend(174u8..=255);

    for &b in &direct {
        mapping[b as usize] = b as char;
    }

    // Relocate the remaining bytes to U+0100 onwards.
    let mut next_char = 256u32;
    for b in 0u8..=255 {
        if !direct.contains(&b) {
            mapping[b as usize] = char::from_u32(next_char).unwrap();
            next_char += 1;
        }
    }

    mapping
});

/// Visible character to byte mapping (reverse of [`BYTE_TO_CHAR`]).
static CHAR_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_CHAR
        .iter()
        .enumerate()
        .map(|(byte, &ch)| (ch, byte as u8))
        .collect()
});

/// Cached one-character strings, one per byte value.
static CHAR_STRINGS: LazyLock<[String; 256]> =
    LazyLock::new(|| std::array::from_fn(|b| BYTE_TO_CHAR[b].to_string()));

/// Visible character for a byte value.
#[inline]
pub fn byte_to_char(byte: u8) -> char {
    BYTE_TO_CHAR[byte as usize]
}

/// Byte value for a visible character, if it belongs to the alphabet.
#[inline]
pub fn char_to_byte(ch: char) -> Option<u8> {
    CHAR_TO_BYTE.get(&ch).copied()
}

/// Cached one-character string for a byte value.
#[inline]
pub fn byte_to_str(byte: u8) -> &'static str {
    &CHAR_STRINGS[byte as usize]
}

/// Whether `ch` is one of the 256 visible alphabet characters.
#[inline]
pub fn is_visible_char(ch: char) -> bool {
    CHAR_TO_BYTE.contains_key(&ch)
}

/// Expand `text` into visible characters with an index map back to the
/// source.
///
/// Appends one visible character per UTF-8 byte of `text` to `chars`, and for
/// each appended character the byte offset in `text` of the code point that
/// produced it to `offsets`. Every byte of a multi-byte code point shares the
/// code point's starting offset, so downstream consumers can tell which
/// pieces belong to one code point. Output length equals `text.len()` and is
/// at most 4x the number of code points.
pub fn expand_with_offsets(text: &str, chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    chars.reserve(text.len());
    offsets.reserve(text.len());
    let mut buf = [0u8; 4];
    for (start, ch) in text.char_indices() {
        for &b in ch.encode_utf8(&mut buf).as_bytes() {
            chars.push(BYTE_TO_CHAR[b as usize]);
            offsets.push(start);
        }
    }
}

/// Expand raw text into its visible-character form.
#[inline]
pub fn expand(text: &str) -> String {
    text.bytes().map(|b| BYTE_TO_CHAR[b as usize]).collect()
}

/// Map a visible-character string back to raw bytes, appending to `out`.
///
/// Characters outside the 256-entry alphabet are passed through as their own
/// UTF-8 bytes, so the inverse is total over arbitrary token strings.
pub fn visible_to_bytes(piece: &str, out: &mut Vec<u8>) {
    let mut buf = [0u8; 4];
    for ch in piece.chars() {
        match CHAR_TO_BYTE.get(&ch) {
            Some(&b) => out.push(b),
            None => out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes()),
        }
    }
}
