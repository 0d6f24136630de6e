//! Word-span splitting applied before the merge loop.
//!
//! A pre-tokenizer cuts the (normalized) text into atomic word spans; BPE
//! then runs over each span independently, so merges never cross a span
//! boundary. Splitters are tagged variants for vtable-free dispatch. The
//! produced spans are non-overlapping and ascending; characters not covered
//! by any span are simply dropped from the encoding.

use fancy_regex::Regex;
use thiserror::Error;

use super::word::Span;

/// GPT-2 / RoBERTa split pattern: contractions, letter runs, digit runs,
/// punctuation runs (each optionally swallowing one leading space), and
/// whitespace runs. The trailing-space lookahead keeps a single space glued
/// to the following word instead of forming its own span.
pub const GPT2_SPLIT_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Errors raised while building a pre-tokenizer.
#[derive(Error, Debug)]
pub enum PreTokenizerError {
    #[error("split pattern failed to compile: {0}")]
    Pattern(#[from] Box<fancy_regex::Error>),
}

/// Splits text into word spans.
#[derive(Debug)]
pub enum PreTokenizer {
    /// Regex splitter over the GPT-2 pattern (or a caller-supplied one).
    Pattern(Box<Regex>),
    /// Maximal runs of non-whitespace; whitespace itself is dropped.
    WhitespaceRuns,
}

impl PreTokenizer {
    /// The standard GPT-2 / CodeGen / RoBERTa splitter.
    pub fn gpt2() -> Result<Self, PreTokenizerError> {
        Self::pattern(GPT2_SPLIT_PATTERN)
    }

    /// A splitter over a custom regex pattern.
    pub fn pattern(pattern: &str) -> Result<Self, PreTokenizerError> {
        let regex = Regex::new(pattern).map_err(Box::new)?;
        Ok(PreTokenizer::Pattern(Box::new(regex)))
    }

    /// Split `text` into ascending, non-overlapping word spans.
    ///
    /// Matches the regex engine fails to produce (backtracking limits on
    /// pathological input) are dropped rather than failing the encode.
    pub fn split(&self, text: &str) -> Vec<Span> {
        match self {
            PreTokenizer::Pattern(regex) => regex
                .find_iter(text)
                .filter_map(|m| m.ok())
                .filter(|m| !m.as_str().is_empty())
                .map(|m| Span::new(m.start(), m.end() - m.start()))
                .collect(),
            PreTokenizer::WhitespaceRuns => {
                let mut spans = Vec::new();
                let mut start = None;
                for (i, ch) in text.char_indices() {
                    if ch.is_whitespace() {
                        if let Some(s) = start.take() {
                            spans.push(Span::new(s, i - s));
                        }
                    } else if start.is_none() {
                        start = Some(i);
                    }
                }
                if let Some(s) = start {
                    spans.push(Span::new(s, text.len() - s));
                }
                spans
            }
        }
    }
}
