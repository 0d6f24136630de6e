//! Per-word BPE merge loop.
//!
//! A word span is expanded through the byte-visible codec into one symbol
//! per UTF-8 byte, then merged bottom-up: a doubly linked list (flat index
//! arrays) tracks the live pieces while a min-heap orders candidate merges
//! by (rank, leftmost). Entries are validated at pop time — a piece consumed
//! by an earlier merge has length zero, and a piece that grew since the
//! candidate was pushed no longer matches the recorded combined length —
//! so stale heap entries are simply skipped. This keeps each merge O(log n)
//! instead of rescanning the pair list, which matters for the long
//! identifiers source-code input produces.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::byte_level;
use super::merges::Merges;
use super::vocab::Vocab;

/// Byte range into the text an encoding was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the first code unit.
    pub index: usize,
    /// Length in bytes. Special tokens use zero.
    pub length: usize,
}

impl Span {
    #[inline]
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// One past the last covered byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.index + self.length
    }
}

/// One emitted token: id, vocabulary string, and source byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: u32,
    pub value: String,
    pub offset: Span,
}

impl Token {
    #[inline]
    pub fn new(id: u32, value: impl Into<String>, offset: Span) -> Self {
        Self {
            id,
            value: value.into(),
            offset,
        }
    }
}

/// Candidate merge between two live pieces.
///
/// Ordered by (rank, left position): equal-rank candidates resolve leftmost
/// first, reproducing the reference "most frequent pair, leftmost" rule.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    rank: u32,
    left: u32,
    right: u32,
    /// Combined piece length (in symbols) when the candidate was pushed;
    /// a mismatch at pop time marks the entry stale.
    combined_len: u32,
}

const NONE: u32 = u32::MAX;

/// Encode one word span into tokens.
///
/// `word` is the span text (a substring of the normalized input); offsets in
/// the returned tokens are relative to the span start and tile it end to
/// end. Pieces absent from the vocabulary emit `unk` when configured and are
/// dropped otherwise. Merge rules apply even when their combined piece is
/// not itself a vocabulary entry — lookup happens only at emission.
pub fn encode_word(
    word: &str,
    vocab: &Vocab,
    merges: &Merges,
    unk: Option<(u32, &str)>,
) -> Vec<Token> {
    let mut chars: Vec<char> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    byte_level::expand_with_offsets(word, &mut chars, &mut offsets);

    let n = chars.len();
    match n {
        0 => return Vec::new(),
        1 => {
            let piece = byte_level::byte_to_str(word.as_bytes()[0]).to_string();
            let span = Span::new(0, word.len());
            return match vocab.id_of(&piece) {
                Some(id) => vec![Token::new(id, piece, span)],
                None => match unk {
                    Some((unk_id, unk_str)) => vec![Token::new(unk_id, unk_str, span)],
                    None => Vec::new(),
                },
            };
        }
        _ => {}
    }

    // Flat-array doubly linked list over the symbols. Node i's piece always
    // begins at symbol i (merges extend the left node and zero the right, so
    // nodes never move); only the length changes.
    let mut piece_len: Vec<u32> = vec![1; n];
    let mut prev: Vec<u32> = (0..n as u32).map(|i| i.checked_sub(1).unwrap_or(NONE)).collect();
    let mut next: Vec<u32> = (1..=n as u32).map(|i| if i < n as u32 { i } else { NONE }).collect();

    let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::with_capacity(n);
    let mut pair_key = String::new();

    let piece_of = |start: u32, len: u32, chars: &[char], out: &mut String| {
        out.clear();
        for &c in &chars[start as usize..(start + len) as usize] {
            out.push(c);
        }
    };

    // Seed with every adjacent symbol pair that has a merge rule.
    for i in 0..n - 1 {
        pair_key.clear();
        pair_key.push(chars[i]);
        pair_key.push(' ');
        pair_key.push(chars[i + 1]);
        if let Some(rank) = merges.rank_of_joined(&pair_key) {
            heap.push(Reverse(Candidate {
                rank,
                left: i as u32,
                right: (i + 1) as u32,
                combined_len: 2,
            }));
        }
    }

    let mut left_buf = String::new();
    let mut right_buf = String::new();

    while let Some(Reverse(c)) = heap.pop() {
        let (l, r) = (c.left as usize, c.right as usize);
        // Stale: either endpoint already consumed, or a neighbor grew.
        if piece_len[l] == 0 || piece_len[r] == 0 {
            continue;
        }
        if c.combined_len != piece_len[l] + piece_len[r] {
            continue;
        }

        // Merge right into left.
        piece_len[l] += piece_len[r];
        piece_len[r] = 0;
        let after = next[r];
        next[l] = after;
        if after != NONE {
            prev[after as usize] = c.left;
        }

        // New candidates on both sides of the grown piece.
        piece_of(c.left, piece_len[l], &chars, &mut left_buf);

        let before = prev[l];
        if before != NONE {
            let b = before as usize;
            piece_of(before, piece_len[b], &chars, &mut right_buf);
            pair_key.clear();
            pair_key.push_str(&right_buf);
            pair_key.push(' ');
            pair_key.push_str(&left_buf);
            if let Some(rank) = merges.rank_of_joined(&pair_key) {
                heap.push(Reverse(Candidate {
                    rank,
                    left: before,
                    right: c.left,
                    combined_len: piece_len[b] + piece_len[l],
                }));
            }
        }
        if after != NONE {
            let a = after as usize;
            piece_of(after, piece_len[a], &chars, &mut right_buf);
            pair_key.clear();
            pair_key.push_str(&left_buf);
            pair_key.push(' ');
            pair_key.push_str(&right_buf);
            if let Some(rank) = merges.rank_of_joined(&pair_key) {
                heap.push(Reverse(Candidate {
                    rank,
                    left: c.left,
                    right: after,
                    combined_len: piece_len[l] + piece_len[a],
                }));
            }
        }
    }

    // Walk the surviving pieces. A piece's span runs from its own first
    // source offset to the next live piece's first source offset, so the
    // spans tile the word even when one code point expanded to several
    // symbols.
    let mut tokens = Vec::new();
    let mut cur = 0u32;
    while cur != NONE {
        let i = cur as usize;
        let len_sym = piece_len[i] as usize;
        let following = next[i];

        let start = offsets[i];
        let end = if following != NONE {
            offsets[following as usize]
        } else {
            word.len()
        };
        let span = Span::new(start, end - start);

        let piece: String = chars[i..i + len_sym].iter().collect();
        match vocab.id_of(&piece) {
            Some(id) => tokens.push(Token::new(id, piece, span)),
            None => {
                if let Some((unk_id, unk_str)) = unk {
                    tokens.push(Token::new(unk_id, unk_str, span));
                }
            }
        }
        cur = following;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn vocab_of(entries: &[(&str, u32)]) -> Vocab {
        let map: FxHashMap<String, u32> =
            entries.iter().map(|(s, id)| (s.to_string(), *id)).collect();
        Vocab::from_map(map)
    }

    fn merges_of(rules: &[&str]) -> Merges {
        let mut text = String::from("#version: test\n");
        for rule in rules {
            text.push_str(rule);
            text.push('\n');
        }
        Merges::from_str(&text).unwrap()
    }

    #[test]
    fn empty_word_is_empty() {
        let vocab = vocab_of(&[]);
        let merges = merges_of(&[]);
        assert!(encode_word("", &vocab, &merges, None).is_empty());
    }

    #[test]
    fn single_char_word() {
        let vocab = vocab_of(&[("a", 64)]);
        let merges = merges_of(&[]);
        let tokens = encode_word("a", &vocab, &merges, None);
        assert_eq!(tokens, vec![Token::new(64, "a", Span::new(0, 1))]);
    }

    #[test]
    fn single_unknown_char_emits_unk() {
        let vocab = vocab_of(&[]);
        let merges = merges_of(&[]);
        let tokens = encode_word("a", &vocab, &merges, Some((0, "<unk>")));
        assert_eq!(tokens, vec![Token::new(0, "<unk>", Span::new(0, 1))]);
        assert!(encode_word("a", &vocab, &merges, None).is_empty());
    }

    #[test]
    fn chain_merges_to_one_token() {
        let vocab = vocab_of(&[("Hello", 15496)]);
        let merges = merges_of(&["H e", "He l", "Hel l", "Hell o"]);
        let tokens = encode_word("Hello", &vocab, &merges, None);
        assert_eq!(tokens, vec![Token::new(15496, "Hello", Span::new(0, 5))]);
    }

    #[test]
    fn rank_order_beats_position() {
        // "ab" is learned after "bc": with input "abc" the leftmost pair
        // would win on position, but rank decides first.
        let vocab = vocab_of(&[("a", 1), ("bc", 2), ("abc", 3)]);
        let merges = merges_of(&["b c", "a b"]);
        let tokens = encode_word("abc", &vocab, &merges, None);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(1, "a", Span::new(0, 1)));
        assert_eq!(tokens[1], Token::new(2, "bc", Span::new(1, 2)));
    }

    #[test]
    fn equal_rank_resolves_leftmost() {
        // One rule, applicable twice: both applications happen, left first,
        // and the stale second-seed entry for the middle pair is skipped.
        let vocab = vocab_of(&[("aa", 5)]);
        let merges = merges_of(&["a a"]);
        let tokens = encode_word("aaaa", &vocab, &merges, None);
        assert_eq!(
            tokens,
            vec![
                Token::new(5, "aa", Span::new(0, 2)),
                Token::new(5, "aa", Span::new(2, 2)),
            ]
        );
    }

    #[test]
    fn merge_without_vocab_entry_still_applies() {
        // "ab" has a rule but no id; the grown piece then merges to "abc",
        // which does. Emission only consults the vocabulary at the end.
        let vocab = vocab_of(&[("abc", 9)]);
        let merges = merges_of(&["a b", "ab c"]);
        let tokens = encode_word("abc", &vocab, &merges, None);
        assert_eq!(tokens, vec![Token::new(9, "abc", Span::new(0, 3))]);
    }

    #[test]
    fn unknown_piece_falls_to_unk_or_drops() {
        let vocab = vocab_of(&[("b", 2)]);
        let merges = merges_of(&[]);
        let with_unk = encode_word("ab", &vocab, &merges, Some((7, "<unk>")));
        assert_eq!(
            with_unk,
            vec![
                Token::new(7, "<unk>", Span::new(0, 1)),
                Token::new(2, "b", Span::new(1, 1)),
            ]
        );
        let without = encode_word("ab", &vocab, &merges, None);
        assert_eq!(without, vec![Token::new(2, "b", Span::new(1, 1))]);
    }

    #[test]
    fn multibyte_offsets_tile_the_word() {
        // "é" expands to two symbols sharing source offset 0; unmerged, the
        // first piece gets length 0 and the second carries the code point.
        let vocab = vocab_of(&[("Ã", 10), ("©", 11)]);
        let merges = merges_of(&[]);
        let tokens = encode_word("é", &vocab, &merges, None);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].offset, Span::new(0, 0));
        assert_eq!(tokens[1].offset, Span::new(0, 2));
    }

    #[test]
    fn merged_multibyte_spans_whole_code_point() {
        let vocab = vocab_of(&[("Ã©", 12)]);
        let merges = merges_of(&["Ã ©"]);
        let tokens = encode_word("é", &vocab, &merges, None);
        assert_eq!(tokens, vec![Token::new(12, "Ã©", Span::new(0, 2))]);
    }

    #[test]
    fn space_word_uses_visible_form() {
        let vocab = vocab_of(&[("ĠHello", 18435)]);
        let merges = merges_of(&["Ġ H", "ĠH e", "ĠHe l", "ĠHel l", "ĠHell o"]);
        let tokens = encode_word(" Hello", &vocab, &merges, None);
        assert_eq!(
            tokens,
            vec![Token::new(18435, "ĠHello", Span::new(0, 6))]
        );
    }
}
