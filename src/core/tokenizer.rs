//! The tokenizer engine: orchestration, capacity queries, and decoding.
//!
//! An encode call runs `prefix space → normalize → split → per-word encode`
//! and reassembles the per-word results with their offsets re-based into the
//! input text. Word encodings come from the added-token map, the word cache,
//! or the merge loop, in that order. Decoding walks ids back through the
//! inverse codec and is total: unknown ids are dropped, invalid UTF-8 is
//! replaced.
//!
//! All tables are read-only after construction; the word cache is the only
//! shared mutable state, so one `Tokenizer` serves concurrent encode calls
//! without further locking. Batch methods parallelize across texts with
//! rayon, never within one text.

use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::byte_level;
use super::cache::{WordCache, DEFAULT_CACHE_SIZE};
use super::dictionary::{DictionaryError, OccurrenceRanks};
use super::merges::{Merges, MergesError};
use super::normalizer::Normalizer;
use super::pretokenizer::{PreTokenizer, PreTokenizerError};
use super::vocab::{AddedTokens, Vocab, VocabError};
use super::word::{encode_word, Span, Token};

/// Errors surfaced by construction and the argument-checked operations.
///
/// Encode and decode never fail on content: unknown pieces become the UNK
/// token (when configured) or are dropped, and malformed byte sequences
/// decode lossily.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Vocab(#[from] VocabError),
    #[error(transparent)]
    Merges(#[from] MergesError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    PreTokenizer(#[from] PreTokenizerError),
    #[error("special token matcher build error: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),
}

/// Per-call encode switches. Construction-time defaults apply when the plain
/// (non-`_with`) operations are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Synthesize a leading space before encoding; offsets are re-based so
    /// they still point into the caller's text.
    pub add_prefix_space: bool,
    /// Prepend the zero-length BOS token.
    pub add_bos: bool,
    /// Append the zero-length EOS token.
    pub add_eos: bool,
    /// Split into word spans first; when off, the whole text is one span.
    pub pre_tokenize: bool,
    /// Run the configured normalizer first.
    pub normalize: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            add_prefix_space: false,
            add_bos: false,
            add_eos: false,
            pre_tokenize: true,
            normalize: true,
        }
    }
}

/// Per-call decode switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Emit the BOS/EOS/UNK strings instead of dropping them.
    pub with_special_tokens: bool,
    /// The encoding was produced with a synthesized prefix space; strip one
    /// leading ASCII space from the first non-special token.
    pub has_prefix_space: bool,
}

/// Result of a budget-limited encode.
#[derive(Debug, Clone)]
struct BoundedEncoding {
    tokens: Vec<Token>,
    /// Byte length of the text prefix the tokens cover.
    text_length: usize,
}

/// Input after prefix-space synthesis and normalization.
struct Prepared<'a> {
    src: Cow<'a, str>,
    /// 1 when a leading space was synthesized, else 0.
    prefix: usize,
}

impl Prepared<'_> {
    /// Byte length in the coordinates offsets are reported in.
    fn reference_len(&self) -> usize {
        self.src.len() - self.prefix
    }
}

/// Byte-level BPE tokenizer of the GPT-2 / CodeGen / RoBERTa family.
///
/// Built from a JSON vocabulary and an ordered merges file; produces parallel
/// token-string / id / byte-offset sequences and inverts them exactly.
///
/// Offsets refer to the text the caller passed in. A configured normalizer
/// that reshapes the text shifts offsets into the normalized form instead —
/// callers that need caller-text offsets should not configure one.
#[derive(Debug)]
pub struct Tokenizer {
    vocab: Vocab,
    merges: Merges,
    added: AddedTokens,
    normalizer: Option<Normalizer>,
    pre_tokenizer: PreTokenizer,
    cache: WordCache,
    cache_size: usize,
    bos: Option<(u32, String)>,
    eos: Option<(u32, String)>,
    unk: Option<(u32, String)>,
    occurrence: Option<OccurrenceRanks>,
    defaults: EncodeOptions,
    /// Literal matcher over added + special token strings, for
    /// [`Tokenizer::encode_with_special`].
    special_matcher: Option<AhoCorasick>,
    special_strings: Vec<String>,
}

impl Tokenizer {
    /// Create a tokenizer over the given tables with the GPT-2 splitter and
    /// no normalizer.
    pub fn new(vocab: Vocab, merges: Merges) -> Result<Self, TokenizerError> {
        Ok(Self {
            vocab,
            merges,
            added: AddedTokens::default(),
            normalizer: None,
            pre_tokenizer: PreTokenizer::gpt2()?,
            cache: WordCache::new(DEFAULT_CACHE_SIZE),
            cache_size: DEFAULT_CACHE_SIZE,
            bos: None,
            eos: None,
            unk: None,
            occurrence: None,
            defaults: EncodeOptions::default(),
            special_matcher: None,
            special_strings: Vec::new(),
        })
    }

    /// Load vocabulary and merges from their standard files.
    pub fn from_files(
        vocab_path: impl AsRef<Path>,
        merges_path: impl AsRef<Path>,
    ) -> Result<Self, TokenizerError> {
        let vocab = Vocab::from_json_file(vocab_path)?;
        let merges = Merges::from_file(merges_path)?;
        debug!(
            vocab_tokens = vocab.len(),
            merge_rules = merges.len(),
            "loaded tokenizer tables"
        );
        Self::new(vocab, merges)
    }

    /// Register whole-word tokens that bypass BPE.
    pub fn with_added_tokens<I, S>(mut self, pairs: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.added = AddedTokens::from_pairs(pairs);
        self.rebuild_special_matcher()?;
        Ok(self)
    }

    /// Designate the UNK token; it must exist in the vocabulary.
    pub fn with_unk_token(mut self, token: &str) -> Result<Self, TokenizerError> {
        self.unk = Some((self.require_vocab_token(token, "UNK")?, token.to_string()));
        self.rebuild_special_matcher()?;
        Ok(self)
    }

    /// Designate the BOS token; it must exist in the vocabulary.
    pub fn with_bos_token(mut self, token: &str) -> Result<Self, TokenizerError> {
        self.bos = Some((self.require_vocab_token(token, "BOS")?, token.to_string()));
        self.rebuild_special_matcher()?;
        Ok(self)
    }

    /// Designate the EOS token; it must exist in the vocabulary.
    pub fn with_eos_token(mut self, token: &str) -> Result<Self, TokenizerError> {
        self.eos = Some((self.require_vocab_token(token, "EOS")?, token.to_string()));
        self.rebuild_special_matcher()?;
        Ok(self)
    }

    /// Install a normalizer. Absence means the text is used as-is.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Replace the word splitter.
    pub fn with_pre_tokenizer(mut self, pre_tokenizer: PreTokenizer) -> Self {
        self.pre_tokenizer = pre_tokenizer;
        self
    }

    /// Resize the word cache (dropping current entries).
    pub fn with_cache_size(mut self, capacity: usize) -> Self {
        self.cache_size = capacity;
        self.cache = WordCache::new(capacity);
        self
    }

    /// Attach a RoBERTa occurrence-rank dictionary.
    pub fn with_occurrence_ranks(mut self, ranks: OccurrenceRanks) -> Self {
        self.occurrence = Some(ranks);
        self
    }

    /// Set the defaults used by the plain (non-`_with`) operations.
    pub fn with_defaults(mut self, defaults: EncodeOptions) -> Result<Self, TokenizerError> {
        self.check_flags(&defaults)?;
        self.defaults = defaults;
        Ok(self)
    }

    fn require_vocab_token(&self, token: &str, role: &str) -> Result<u32, TokenizerError> {
        self.vocab.id_of(token).ok_or_else(|| {
            TokenizerError::InvalidConfig(format!(
                "{role} token {token:?} is not in the vocabulary"
            ))
        })
    }

    fn check_flags(&self, opts: &EncodeOptions) -> Result<(), TokenizerError> {
        if opts.add_bos && self.bos.is_none() {
            return Err(TokenizerError::InvalidConfig(
                "add_bos requested but no BOS token is configured".to_string(),
            ));
        }
        if opts.add_eos && self.eos.is_none() {
            return Err(TokenizerError::InvalidConfig(
                "add_eos requested but no EOS token is configured".to_string(),
            ));
        }
        Ok(())
    }

    fn rebuild_special_matcher(&mut self) -> Result<(), TokenizerError> {
        let mut strings: Vec<String> = self.added.strings().map(str::to_string).collect();
        for special in [&self.bos, &self.eos, &self.unk].into_iter().flatten() {
            if !strings.iter().any(|s| s == &special.1) {
                strings.push(special.1.clone());
            }
        }
        self.special_matcher = if strings.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&strings)?)
        };
        self.special_strings = strings;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------

    /// Encode with the construction-time defaults.
    pub fn encode(&self, text: &str) -> Vec<Token> {
        self.encode_unchecked(text, &self.defaults)
    }

    /// Encode with explicit options.
    pub fn encode_with(
        &self,
        text: &str,
        opts: EncodeOptions,
    ) -> Result<Vec<Token>, TokenizerError> {
        self.check_flags(&opts)?;
        Ok(self.encode_unchecked(text, &opts))
    }

    /// Encode to ids with the construction-time defaults.
    pub fn encode_to_ids(&self, text: &str) -> Vec<u32> {
        self.encode(text).into_iter().map(|t| t.id).collect()
    }

    /// Encode to ids with explicit options.
    pub fn encode_to_ids_with(
        &self,
        text: &str,
        opts: EncodeOptions,
    ) -> Result<Vec<u32>, TokenizerError> {
        Ok(self
            .encode_with(text, opts)?
            .into_iter()
            .map(|t| t.id)
            .collect())
    }

    /// Number of tokens `text` encodes to, with the defaults.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Number of tokens `text` encodes to, with explicit options.
    pub fn count_tokens_with(
        &self,
        text: &str,
        opts: EncodeOptions,
    ) -> Result<usize, TokenizerError> {
        Ok(self.encode_with(text, opts)?.len())
    }

    /// Apply prefix-space synthesis and normalization.
    fn prepare<'a>(&self, text: &'a str, opts: &EncodeOptions) -> Prepared<'a> {
        if opts.add_prefix_space {
            let mut buffer = String::with_capacity(text.len() + 1);
            buffer.push(' ');
            buffer.push_str(text);
            let src = match (&self.normalizer, opts.normalize) {
                (Some(normalizer), true) => match normalizer.normalize(&buffer) {
                    Cow::Borrowed(_) => buffer,
                    Cow::Owned(normalized) => normalized,
                },
                _ => buffer,
            };
            Prepared {
                src: Cow::Owned(src),
                prefix: 1,
            }
        } else {
            let src = match (&self.normalizer, opts.normalize) {
                (Some(normalizer), true) => normalizer.normalize(text),
                _ => Cow::Borrowed(text),
            };
            Prepared { src, prefix: 0 }
        }
    }

    fn encode_unchecked(&self, text: &str, opts: &EncodeOptions) -> Vec<Token> {
        let prepared = self.prepare(text, opts);
        let src: &str = &prepared.src;
        let prefix = prepared.prefix;
        let reference_len = prepared.reference_len();

        let mut tokens = Vec::new();
        if let Some((id, value)) = opts.add_bos.then_some(()).and(self.bos.as_ref()) {
            tokens.push(Token::new(*id, value.clone(), Span::new(0, 0)));
        }

        for span in self.word_spans(src, opts) {
            let sub = self.encode_span(&src[span.index..span.end()]);
            push_rebased(&mut tokens, sub, span.index, prefix);
        }

        if let Some((id, value)) = opts.add_eos.then_some(()).and(self.eos.as_ref()) {
            tokens.push(Token::new(*id, value.clone(), Span::new(reference_len, 0)));
        }
        tokens
    }

    fn word_spans(&self, src: &str, opts: &EncodeOptions) -> Vec<Span> {
        if opts.pre_tokenize {
            self.pre_tokenizer.split(src)
        } else if src.is_empty() {
            Vec::new()
        } else {
            vec![Span::new(0, src.len())]
        }
    }

    /// Encode one word span; offsets are relative to the span start.
    fn encode_span(&self, word: &str) -> Vec<Token> {
        // Whole-span added tokens win over everything, including the cache.
        if let Some(id) = self.added.id_of(word) {
            return vec![Token::new(id, word, Span::new(0, word.len()))];
        }
        if let Some(tokens) = self.cache.get(word) {
            return tokens;
        }
        let unk = self.unk.as_ref().map(|(id, s)| (*id, s.as_str()));
        let tokens = encode_word(word, &self.vocab, &self.merges, unk);
        self.cache.put(word, &tokens);
        tokens
    }

    // ------------------------------------------------------------------
    // Capacity queries
    // ------------------------------------------------------------------

    /// Encode at most `max_tokens` tokens with the defaults; returns the ids
    /// and the byte length of the text they cover.
    ///
    /// The result is always a prefix of the unbounded id sequence, and a
    /// multi-symbol code point is never split: tokens sharing a source index
    /// are kept or dropped together.
    pub fn encode_to_ids_bounded(
        &self,
        text: &str,
        max_tokens: usize,
    ) -> Result<(Vec<u32>, usize), TokenizerError> {
        self.encode_to_ids_bounded_with(text, max_tokens, self.defaults)
    }

    /// [`Tokenizer::encode_to_ids_bounded`] with explicit options.
    pub fn encode_to_ids_bounded_with(
        &self,
        text: &str,
        max_tokens: usize,
        opts: EncodeOptions,
    ) -> Result<(Vec<u32>, usize), TokenizerError> {
        let bounded = self.encode_prefix(text, max_tokens, &opts)?;
        let ids = bounded.tokens.into_iter().map(|t| t.id).collect();
        Ok((ids, bounded.text_length))
    }

    /// Byte length of the longest text prefix that encodes to at most
    /// `max_tokens` tokens, plus that token count, with the defaults.
    ///
    /// The returned length equals `text.len()` exactly when the whole text
    /// fits the budget.
    pub fn index_of_token_count(
        &self,
        text: &str,
        max_tokens: usize,
    ) -> Result<(usize, usize), TokenizerError> {
        self.index_of_token_count_with(text, max_tokens, self.defaults)
    }

    /// [`Tokenizer::index_of_token_count`] with explicit options.
    pub fn index_of_token_count_with(
        &self,
        text: &str,
        max_tokens: usize,
        opts: EncodeOptions,
    ) -> Result<(usize, usize), TokenizerError> {
        let bounded = self.encode_prefix(text, max_tokens, &opts)?;
        Ok((bounded.text_length, bounded.tokens.len()))
    }

    /// Byte index from which the text suffix encodes to at most `max_tokens`
    /// tokens, plus that token count, with the defaults.
    pub fn last_index_of_token_count(
        &self,
        text: &str,
        max_tokens: usize,
    ) -> Result<(usize, usize), TokenizerError> {
        self.last_index_of_token_count_with(text, max_tokens, self.defaults)
    }

    /// [`Tokenizer::last_index_of_token_count`] with explicit options.
    pub fn last_index_of_token_count_with(
        &self,
        text: &str,
        max_tokens: usize,
        opts: EncodeOptions,
    ) -> Result<(usize, usize), TokenizerError> {
        self.check_bounded_args(max_tokens, &opts)?;

        let prepared = self.prepare(text, &opts);
        let src: &str = &prepared.src;
        let prefix = prepared.prefix;
        let reference_len = prepared.reference_len();

        let bos = usize::from(opts.add_bos);
        let eos = usize::from(opts.add_eos);
        let budget = max_tokens.saturating_sub(eos);

        // Gather whole spans from the back until the budget is exceeded.
        let spans = self.word_spans(src, &opts);
        let mut rev_chunks: Vec<Vec<Token>> = Vec::new();
        let mut gathered = 0usize;
        let mut consumed_all = true;
        for span in spans.iter().rev() {
            if gathered > budget {
                consumed_all = false;
                break;
            }
            let sub = self.encode_span(&src[span.index..span.end()]);
            let mut rebased = Vec::with_capacity(sub.len());
            push_rebased(&mut rebased, sub, span.index, prefix);
            gathered += rebased.len();
            rev_chunks.push(rebased);
        }

        if consumed_all && bos + gathered + eos <= max_tokens {
            return Ok((0, bos + gathered + eos));
        }

        let tail: Vec<Token> = rev_chunks.into_iter().rev().flatten().collect();
        let mut start = tail.len().saturating_sub(budget);
        // Never start mid code point: skip forward past any group that
        // shares its source index with an excluded token.
        while start > 0 && start < tail.len() && tail[start].offset.index == tail[start - 1].offset.index
        {
            start += 1;
        }

        let text_index = if start < tail.len() {
            tail[start].offset.index
        } else {
            reference_len
        };
        Ok((text_index, tail.len() - start + eos))
    }

    fn check_bounded_args(
        &self,
        max_tokens: usize,
        opts: &EncodeOptions,
    ) -> Result<(), TokenizerError> {
        self.check_flags(opts)?;
        if max_tokens == 0 {
            return Err(TokenizerError::InvalidArgument(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn encode_prefix(
        &self,
        text: &str,
        max_tokens: usize,
        opts: &EncodeOptions,
    ) -> Result<BoundedEncoding, TokenizerError> {
        self.check_bounded_args(max_tokens, opts)?;

        let prepared = self.prepare(text, opts);
        let src: &str = &prepared.src;
        let prefix = prepared.prefix;
        let reference_len = prepared.reference_len();

        let bos = usize::from(opts.add_bos);
        let eos = usize::from(opts.add_eos);
        let budget = max_tokens.saturating_sub(bos);

        let mut content: Vec<Token> = Vec::new();
        let mut consumed_all = true;
        for span in self.word_spans(src, opts) {
            // One token past the budget is enough to resolve the cut.
            if content.len() > budget {
                consumed_all = false;
                break;
            }
            let sub = self.encode_span(&src[span.index..span.end()]);
            push_rebased(&mut content, sub, span.index, prefix);
        }

        if consumed_all && bos + content.len() + eos <= max_tokens {
            let mut tokens = Vec::with_capacity(bos + content.len() + eos);
            if let Some((id, value)) = opts.add_bos.then_some(()).and(self.bos.as_ref()) {
                tokens.push(Token::new(*id, value.clone(), Span::new(0, 0)));
            }
            tokens.extend(content);
            if let Some((id, value)) = opts.add_eos.then_some(()).and(self.eos.as_ref()) {
                tokens.push(Token::new(*id, value.clone(), Span::new(reference_len, 0)));
            }
            return Ok(BoundedEncoding {
                tokens,
                text_length: reference_len,
            });
        }

        // Truncate; never cut between tokens that share a source index.
        let mut cut = budget.min(content.len());
        while cut > 0 && cut < content.len() && content[cut].offset.index == content[cut - 1].offset.index
        {
            cut -= 1;
        }
        let text_length = if cut == 0 { 0 } else { content[cut - 1].offset.end() };

        let mut tokens = Vec::with_capacity(bos + cut);
        if let Some((id, value)) = opts.add_bos.then_some(()).and(self.bos.as_ref()) {
            tokens.push(Token::new(*id, value.clone(), Span::new(0, 0)));
        }
        content.truncate(cut);
        tokens.extend(content);

        Ok(BoundedEncoding { tokens, text_length })
    }

    // ------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------

    /// Decode ids with the default options (special tokens dropped).
    pub fn decode(&self, ids: &[u32]) -> String {
        self.decode_with(ids, DecodeOptions::default())
    }

    /// Decode ids to text.
    ///
    /// Total over arbitrary ids: unknown ids are dropped and byte sequences
    /// that do not form valid UTF-8 decode with replacement characters.
    pub fn decode_with(&self, ids: &[u32], opts: DecodeOptions) -> String {
        let mut bytes: Vec<u8> = Vec::with_capacity(ids.len() * 4);
        let mut first_content = true;

        for &id in ids {
            if let Some(special) = self.special_string_of(id) {
                if opts.with_special_tokens {
                    bytes.extend_from_slice(special.as_bytes());
                }
                continue;
            }
            if let Some(token) = self.added.token_of(id) {
                let token = if first_content && opts.has_prefix_space {
                    token.strip_prefix(' ').unwrap_or(token)
                } else {
                    token
                };
                bytes.extend_from_slice(token.as_bytes());
                first_content = false;
                continue;
            }
            if let Some(token) = self.vocab.token_of(id) {
                let mark = bytes.len();
                byte_level::visible_to_bytes(token, &mut bytes);
                if first_content && opts.has_prefix_space && bytes.get(mark) == Some(&b' ') {
                    bytes.remove(mark);
                }
                first_content = false;
            }
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }

    // ------------------------------------------------------------------
    // Literal special-token path
    // ------------------------------------------------------------------

    /// Encode text in which added/special token strings may appear literally.
    ///
    /// Matched occurrences emit their ids directly; the text between them is
    /// encoded with the defaults, minus BOS/EOS injection.
    pub fn encode_with_special(&self, text: &str) -> Vec<u32> {
        let segment_opts = EncodeOptions {
            add_bos: false,
            add_eos: false,
            ..self.defaults
        };
        let Some(matcher) = &self.special_matcher else {
            return self
                .encode_unchecked(text, &segment_opts)
                .into_iter()
                .map(|t| t.id)
                .collect();
        };

        let mut result = Vec::new();
        let mut last_end = 0usize;
        for m in matcher.find_iter(text) {
            if m.start() > last_end {
                result.extend(
                    self.encode_unchecked(&text[last_end..m.start()], &segment_opts)
                        .into_iter()
                        .map(|t| t.id),
                );
            }
            let matched = &self.special_strings[m.pattern().as_usize()];
            if let Some(id) = self
                .added
                .id_of(matched)
                .or_else(|| self.special_id_of_string(matched))
            {
                result.push(id);
            }
            last_end = m.end();
        }
        if last_end < text.len() {
            result.extend(
                self.encode_unchecked(&text[last_end..], &segment_opts)
                    .into_iter()
                    .map(|t| t.id),
            );
        }
        result
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    /// Encode many texts in parallel with the defaults.
    pub fn encode_batch(&self, texts: &[String]) -> Vec<Vec<Token>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Encode many texts to ids in parallel with the defaults.
    pub fn encode_to_ids_batch(&self, texts: &[String]) -> Vec<Vec<u32>> {
        texts
            .par_iter()
            .map(|text| self.encode_to_ids(text))
            .collect()
    }

    /// Decode many id lists in parallel with the default options.
    pub fn decode_batch(&self, id_lists: &[Vec<u32>]) -> Vec<String> {
        id_lists.par_iter().map(|ids| self.decode(ids)).collect()
    }

    // ------------------------------------------------------------------
    // Lookups and accessors
    // ------------------------------------------------------------------

    /// Id for a token string (vocabulary, then added tokens). Strings with
    /// characters outside the visible alphabet are simply absent.
    pub fn map_token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.id_of(token).or_else(|| self.added.id_of(token))
    }

    /// Token string for an id (vocabulary, then added tokens).
    pub fn map_id_to_token(&self, id: u32) -> Option<&str> {
        self.vocab.token_of(id).or_else(|| self.added.token_of(id))
    }

    fn special_string_of(&self, id: u32) -> Option<&str> {
        [&self.bos, &self.eos, &self.unk]
            .into_iter()
            .flatten()
            .find(|(special_id, _)| *special_id == id)
            .map(|(_, s)| s.as_str())
    }

    fn special_id_of_string(&self, token: &str) -> Option<u32> {
        [&self.bos, &self.eos, &self.unk]
            .into_iter()
            .flatten()
            .find(|(_, s)| s == token)
            .map(|(id, _)| *id)
    }

    /// Total id range: largest known id plus one, across vocabulary, added,
    /// and special tokens.
    pub fn vocab_size(&self) -> usize {
        let mut size = self.vocab.id_span();
        for id in self
            .added
            .strings()
            .filter_map(|s| self.added.id_of(s))
            .chain(self.special_ids())
        {
            size = size.max(id as usize + 1);
        }
        size
    }

    fn special_ids(&self) -> impl Iterator<Item = u32> + '_ {
        [&self.bos, &self.eos, &self.unk]
            .into_iter()
            .flatten()
            .map(|(id, _)| *id)
    }

    pub fn bos_token_id(&self) -> Option<u32> {
        self.bos.as_ref().map(|(id, _)| *id)
    }

    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos.as_ref().map(|(id, _)| *id)
    }

    pub fn unk_token_id(&self) -> Option<u32> {
        self.unk.as_ref().map(|(id, _)| *id)
    }

    /// The text form offsets refer to: the configured normalizer's output,
    /// or the input itself when none is configured.
    pub fn normalized<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.normalizer {
            Some(normalizer) => normalizer.normalize(text),
            None => Cow::Borrowed(text),
        }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn merges(&self) -> &Merges {
        &self.merges
    }

    pub fn added_tokens(&self) -> &AddedTokens {
        &self.added
    }

    /// Occurrence rank of an id, when a dictionary is attached.
    pub fn occurrence_rank_of(&self, id: u32) -> Option<u32> {
        self.occurrence.as_ref()?.rank_of(id)
    }

    /// Id at an occurrence rank, when a dictionary is attached.
    pub fn id_of_occurrence_rank(&self, rank: u32) -> Option<u32> {
        self.occurrence.as_ref()?.id_at(rank)
    }

    /// Occurrence count of an id, when a dictionary is attached.
    pub fn occurrence_count_of(&self, id: u32) -> Option<u64> {
        self.occurrence.as_ref()?.count_of(id)
    }

    /// Drop every cached word encoding.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached word encodings.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// Re-base span-relative tokens by `base`, then fold a synthesized prefix
/// space back out of the offsets: every index moves left by one (clamped at
/// zero) and the token that covered the space gives up that byte.
fn push_rebased(out: &mut Vec<Token>, sub: Vec<Token>, base: usize, prefix: usize) {
    for mut token in sub {
        token.offset.index += base;
        if prefix > 0 {
            if token.offset.index == 0 {
                token.offset.length = token.offset.length.saturating_sub(1);
            } else {
                token.offset.index -= 1;
            }
        }
        out.push(token);
    }
}
