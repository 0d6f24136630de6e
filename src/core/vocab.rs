//! Vocabulary and added-token storage.
//!
//! The vocabulary is a JSON object mapping token strings to integer ids, the
//! format GPT-2 / CodeGen / RoBERTa checkpoints ship as `vocab.json`:
//!
//! ```text
//! { "!": 0, "\"": 1, ..., "Ġthe": 262, ... }
//! ```
//!
//! Token strings are written over the visible-character alphabet (see
//! [`super::byte_level`]), e.g. `"Ġthe"` is `" the"` after the inverse
//! mapping. Duplicate keys are rejected at parse time — `serde_json` would
//! otherwise silently keep the last occurrence and the resulting id map
//! would depend on file order.

use rustc_hash::FxHashMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a vocabulary file.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("invalid vocabulary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate vocabulary token: {0:?}")]
    DuplicateToken(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable token <-> id store.
///
/// The forward map is authoritative; the reverse map is derived at load time.
/// If two tokens share an id (undefined per the file format), the reverse map
/// keeps the first one seen.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    token_to_id: FxHashMap<String, u32>,
    id_to_token: FxHashMap<u32, String>,
}

impl Vocab {
    /// Build from an existing map.
    pub fn from_map(token_to_id: FxHashMap<String, u32>) -> Self {
        let mut id_to_token = FxHashMap::default();
        for (token, &id) in &token_to_id {
            id_to_token.entry(id).or_insert_with(|| token.clone());
        }
        Self {
            token_to_id,
            id_to_token,
        }
    }

    /// Parse a JSON vocabulary object from raw bytes.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, VocabError> {
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        let token_to_id = deserializer.deserialize_map(VocabVisitor)?;
        deserializer.end()?;
        Ok(Self::from_map(token_to_id))
    }

    /// Load a JSON vocabulary from a file path.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let data = std::fs::read(path)?;
        Self::from_json_slice(&data)
    }

    /// Id for a token string.
    #[inline]
    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Token string for an id.
    #[inline]
    pub fn token_of(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(&id).map(|s| s.as_str())
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Number of distinct token strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }

    /// Largest id plus one, counting every id slot from zero.
    pub fn id_span(&self) -> usize {
        self.id_to_token
            .keys()
            .max()
            .map_or(0, |&max| max as usize + 1)
    }
}

struct VocabVisitor;

impl<'de> Visitor<'de> for VocabVisitor {
    type Value = FxHashMap<String, u32>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object mapping token strings to integer ids")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map =
            FxHashMap::with_capacity_and_hasher(access.size_hint().unwrap_or(0), Default::default());
        while let Some((token, id)) = access.next_entry::<String, u32>()? {
            if map.contains_key(&token) {
                return Err(de::Error::custom(format!(
                    "duplicate vocabulary token: {token:?}"
                )));
            }
            map.insert(token, id);
        }
        Ok(map)
    }
}

/// Side map of whole-word tokens that bypass BPE.
///
/// An added token matches only when it equals the *entire* current word span;
/// substrings never match. The engine consults this map before byte-level
/// expansion and before the cache.
#[derive(Debug, Clone, Default)]
pub struct AddedTokens {
    token_to_id: FxHashMap<String, u32>,
    id_to_token: FxHashMap<u32, String>,
}

impl AddedTokens {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut this = Self::default();
        for (token, id) in pairs {
            let token = token.into();
            this.id_to_token.entry(id).or_insert_with(|| token.clone());
            this.token_to_id.insert(token, id);
        }
        this
    }

    #[inline]
    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    #[inline]
    pub fn token_of(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(&id).map(|s| s.as_str())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    /// Token strings, for building a literal matcher.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.token_to_id.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_object() {
        let vocab = Vocab::from_json_slice(r#"{"Hello": 15496, "ĠWorld": 2159}"#.as_bytes()).unwrap();
        assert_eq!(vocab.id_of("Hello"), Some(15496));
        assert_eq!(vocab.id_of("ĠWorld"), Some(2159));
        assert_eq!(vocab.token_of(15496), Some("Hello"));
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.id_span(), 15497);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = Vocab::from_json_slice(br#"{"a": 1, "a": 2}"#).unwrap_err();
        assert!(matches!(err, VocabError::Json(_)));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_non_object() {
        assert!(Vocab::from_json_slice(br#"[1, 2]"#).is_err());
        assert!(Vocab::from_json_slice(br#"{"a": "b"}"#).is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(Vocab::from_json_slice(br#"{"a": 1} {"b": 2}"#).is_err());
    }

    #[test]
    fn duplicate_ids_keep_first_reverse_entry() {
        // Undefined by the format; the reverse map must still be stable.
        let vocab = Vocab::from_json_slice(br#"{"a": 7, "b": 7}"#).unwrap();
        assert_eq!(vocab.id_of("a"), Some(7));
        assert_eq!(vocab.id_of("b"), Some(7));
        assert!(vocab.token_of(7).is_some());
    }

    #[test]
    fn added_tokens_round_trip() {
        let added = AddedTokens::from_pairs([("<mask>", 50264u32), ("<pad>", 1)]);
        assert_eq!(added.id_of("<mask>"), Some(50264));
        assert_eq!(added.token_of(1), Some("<pad>"));
        assert_eq!(added.id_of("<mask"), None);
        assert_eq!(added.len(), 2);
    }
}
