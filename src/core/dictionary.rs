//! RoBERTa occurrence-rank dictionary.
//!
//! RoBERTa checkpoints ship a `dict.txt` whose lines are `id count` pairs,
//! whitespace separated, ordered by corpus frequency. The line position is
//! the token's occurrence rank (0-based); the second field is its occurrence
//! count. The table is read-only after construction and is not consulted by
//! encode or decode — it exists for downstream scoring.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading an occurrence dictionary.
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("invalid dictionary entry at line {line}: {content:?}")]
    InvalidEntry { line: usize, content: String },
    #[error("duplicate dictionary id {id} at line {line}")]
    DuplicateId { id: u32, line: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bijection between vocabulary ids and occurrence ranks, plus id → count.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceRanks {
    id_to_rank: FxHashMap<u32, u32>,
    rank_to_id: Vec<u32>,
    id_to_count: FxHashMap<u32, u64>,
}

impl OccurrenceRanks {
    /// Parse a dictionary from text. Blank lines are skipped.
    pub fn from_str(data: &str) -> Result<Self, DictionaryError> {
        let mut this = Self::default();

        for (idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = || DictionaryError::InvalidEntry {
                line: idx + 1,
                content: line.to_string(),
            };

            let mut fields = line.split_whitespace();
            let (id, count) = match (fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(count), None) => (
                    id.parse::<u32>().map_err(|_| invalid())?,
                    count.parse::<u64>().map_err(|_| invalid())?,
                ),
                _ => return Err(invalid()),
            };

            let rank = this.rank_to_id.len() as u32;
            if this.id_to_rank.insert(id, rank).is_some() {
                return Err(DictionaryError::DuplicateId { id, line: idx + 1 });
            }
            this.rank_to_id.push(id);
            this.id_to_count.insert(id, count);
        }

        Ok(this)
    }

    /// Load a dictionary from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_str(&data)
    }

    /// Occurrence rank of a vocabulary id.
    #[inline]
    pub fn rank_of(&self, id: u32) -> Option<u32> {
        self.id_to_rank.get(&id).copied()
    }

    /// Vocabulary id at an occurrence rank.
    #[inline]
    pub fn id_at(&self, rank: u32) -> Option<u32> {
        self.rank_to_id.get(rank as usize).copied()
    }

    /// Occurrence count of a vocabulary id.
    #[inline]
    pub fn count_of(&self, id: u32) -> Option<u64> {
        self.id_to_count.get(&id).copied()
    }

    /// Number of dictionary entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.rank_to_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rank_to_id.is_empty()
    }
}
