//! Merge-rule table loaded from a GPT-2 style `merges.txt`.
//!
//! The file starts with a header line (e.g. `#version: 0.2`) which is
//! ignored. Every following line is one rule of the form `left SP right`
//! with exactly one ASCII space; the line's position defines the rule's rank,
//! starting at 1. Lower rank merges first. Trailing blank lines are
//! tolerated; a malformed line anywhere else aborts loading.
//!
//! Pairs are stored under the single key `"left right"` — rule halves can
//! never contain a space (the file format forbids it), so the joined form is
//! unambiguous and lets the merge loop probe with one reusable scratch
//! buffer.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a merges file.
#[derive(Error, Debug)]
pub enum MergesError {
    #[error("invalid merge rule at line {line}: {content:?}")]
    InvalidRule { line: usize, content: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered map from a merge pair to its rank.
#[derive(Debug, Clone, Default)]
pub struct Merges {
    ranks: FxHashMap<String, u32>,
}

impl Merges {
    /// Parse merges from text. The first line is always treated as a header.
    pub fn from_str(data: &str) -> Result<Self, MergesError> {
        let mut lines: Vec<&str> = data.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        let mut ranks = FxHashMap::default();
        let mut rank = 0u32;
        for (idx, line) in lines.iter().enumerate().skip(1) {
            let mut halves = line.split(' ');
            let (left, right) = match (halves.next(), halves.next(), halves.next()) {
                (Some(l), Some(r), None) if !l.is_empty() && !r.is_empty() => (l, r),
                _ => {
                    return Err(MergesError::InvalidRule {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            };
            rank += 1;
            // Duplicate rules keep their first (lowest) rank.
            ranks.entry(format!("{left} {right}")).or_insert(rank);
        }

        Ok(Self { ranks })
    }

    /// Load merges from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MergesError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_str(&data)
    }

    /// Rank of a pair given in joined `"left right"` form.
    #[inline]
    pub fn rank_of_joined(&self, pair: &str) -> Option<u32> {
        self.ranks.get(pair).copied()
    }

    /// Rank of a `(left, right)` pair.
    pub fn rank_of(&self, left: &str, right: &str) -> Option<u32> {
        let mut key = String::with_capacity(left.len() + right.len() + 1);
        key.push_str(left);
        key.push(' ');
        key.push_str(right);
        self.rank_of_joined(&key)
    }

    /// Number of rules.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
