//! Core tokenization engine.
//!
//! The pipeline is `prefix space → normalize → pre-tokenize → per-word BPE`,
//! with per-word results memoized and reassembled under original-text byte
//! offsets. The components, leaves first:
//!
//! - [`byte_level`]: the fixed bijection between bytes and 256 printable
//!   code points that lets BPE run over arbitrary input
//! - [`Vocab`] / [`AddedTokens`]: token <-> id tables (JSON vocabulary)
//! - [`Merges`]: ordered merge rules from a `merges.txt`
//! - [`OccurrenceRanks`]: the RoBERTa frequency-dictionary overlay
//! - [`Normalizer`] / [`PreTokenizer`]: tagged-variant text rewrite and
//!   word-span splitting
//! - `word`: the linked-list + min-heap merge loop producing [`Token`]s
//! - `cache`: bounded concurrent memoization of short-word encodings
//! - [`Tokenizer`]: orchestration, capacity queries, and the decoder
//! - [`StreamingDecoder`]: UTF-8 safe id-by-id decoding

pub mod byte_level;
mod cache;
mod dictionary;
mod merges;
mod normalizer;
mod pretokenizer;
mod streaming;
mod tokenizer;
mod vocab;
mod word;

pub use cache::{DEFAULT_CACHE_SIZE, MAX_CACHE_KEY_LEN};
pub use dictionary::{DictionaryError, OccurrenceRanks};
pub use merges::{Merges, MergesError};
pub use normalizer::Normalizer;
pub use pretokenizer::{PreTokenizer, PreTokenizerError, GPT2_SPLIT_PATTERN};
pub use streaming::StreamingDecoder;
pub use tokenizer::{DecodeOptions, EncodeOptions, Tokenizer, TokenizerError};
pub use vocab::{AddedTokens, Vocab, VocabError};
pub use word::{Span, Token};
