//! Optional text normalization applied before pre-tokenization.
//!
//! Normalizers are tagged variants rather than trait objects so the engine
//! dispatches without a vtable per call. A normalizer that reshapes the text
//! shifts every downstream offset into the normalized string; callers that
//! need original-text offsets should not configure one.

use std::borrow::Cow;
use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Text rewrite applied once per encode call, before splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Unicode canonical composition (NFC).
    Nfc,
    /// ASCII-aware full lowercasing.
    Lowercase,
}

impl Normalizer {
    /// Produce the normalized form, borrowing when the text is already
    /// normalized.
    pub fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Normalizer::Nfc => {
                if is_nfc(text) {
                    Cow::Borrowed(text)
                } else {
                    Cow::Owned(text.nfc().collect())
                }
            }
            Normalizer::Lowercase => {
                if text.chars().all(|c| !c.is_uppercase()) {
                    Cow::Borrowed(text)
                } else {
                    Cow::Owned(text.to_lowercase())
                }
            }
        }
    }
}
