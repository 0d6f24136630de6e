//! slivr — byte-level BPE tokenizer engine with exact offset tracking.
//!
//! Implements the GPT-2 / CodeGen / RoBERTa tokenizer family: a JSON
//! vocabulary plus an ordered merges file drive a priority-queue merge loop
//! over the byte-visible alphabet, producing parallel token-string /
//! token-id / byte-offset sequences that invert exactly.
//!
//! Features:
//! - Linked-list + min-heap merge loop (no quadratic rescans on long words)
//! - Byte-offset tracking through UTF-8 expansion, down to shared offsets
//!   for the pieces of one code point
//! - Capacity queries: token counting, budget-bounded encoding, and
//!   prefix/suffix fitting that never splits a code point
//! - Whole-word added tokens, BOS/EOS/UNK handling, RoBERTa occurrence
//!   ranks
//! - Bounded concurrent word cache, rayon batch APIs, UTF-8 safe streaming
//!   decode
//!
//! ```no_run
//! use slivr::Tokenizer;
//!
//! let tokenizer = Tokenizer::from_files("vocab.json", "merges.txt")?;
//! let tokens = tokenizer.encode("The quick brown fox");
//! for token in &tokens {
//!     println!("{} {:?} @{}+{}", token.id, token.value, token.offset.index, token.offset.length);
//! }
//! let text = tokenizer.decode(&tokenizer.encode_to_ids("The quick brown fox"));
//! # Ok::<(), slivr::TokenizerError>(())
//! ```

pub mod core;

pub use crate::core::{
    AddedTokens, DecodeOptions, DictionaryError, EncodeOptions, Merges, MergesError, Normalizer,
    OccurrenceRanks, PreTokenizer, PreTokenizerError, Span, StreamingDecoder, Token, Tokenizer,
    TokenizerError, Vocab, VocabError, DEFAULT_CACHE_SIZE, GPT2_SPLIT_PATTERN, MAX_CACHE_KEY_LEN,
};
