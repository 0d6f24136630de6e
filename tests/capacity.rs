//! Capacity queries: counting, bounded encoding, and prefix/suffix fitting.
//!
//! The vocabulary here is singles-only (every alphabet character is its own
//! token), which makes token counts predictable: one token per byte of
//! covered text. Multi-byte behavior is exercised through emoji, whose four
//! pieces share a source offset and must travel together.

use slivr::{core::byte_level, EncodeOptions, Merges, Tokenizer, TokenizerError, Vocab};

fn singles_vocab_json() -> String {
    let mut json = String::from("{");
    for b in 0u8..=255 {
        json.push_str(&serde_json::to_string(byte_level::byte_to_str(b)).unwrap());
        json.push_str(&format!(": {},", b as u32));
    }
    json.push_str(r#""<|endoftext|>": 50256}"#);
    json
}

fn singles() -> Tokenizer {
    let vocab = Vocab::from_json_slice(singles_vocab_json().as_bytes()).unwrap();
    let merges = Merges::from_str("#version: 0.2\n").unwrap();
    Tokenizer::new(vocab, merges)
        .unwrap()
        .with_bos_token("<|endoftext|>")
        .unwrap()
        .with_eos_token("<|endoftext|>")
        .unwrap()
}

#[test]
fn zero_budget_is_an_invalid_argument() {
    let tokenizer = singles();
    assert!(matches!(
        tokenizer.encode_to_ids_bounded("abc", 0),
        Err(TokenizerError::InvalidArgument(_))
    ));
    assert!(matches!(
        tokenizer.index_of_token_count("abc", 0),
        Err(TokenizerError::InvalidArgument(_))
    ));
    assert!(matches!(
        tokenizer.last_index_of_token_count("abc", 0),
        Err(TokenizerError::InvalidArgument(_))
    ));
}

#[test]
fn bounded_ids_are_a_prefix_of_the_full_encoding() {
    let tokenizer = singles();
    let text = "The quick brown fox.";
    let full = tokenizer.encode_to_ids(text);
    for max in 1..=full.len() + 2 {
        let (ids, _) = tokenizer.encode_to_ids_bounded(text, max).unwrap();
        assert!(ids.len() <= max);
        assert_eq!(ids[..], full[..ids.len()], "max = {max}");
    }
}

#[test]
fn bounded_reports_the_text_length_reached() {
    let tokenizer = singles();
    let (ids, covered) = tokenizer.encode_to_ids_bounded("abcdef", 4).unwrap();
    assert_eq!(ids.len(), 4);
    assert_eq!(covered, 4);

    let (ids, covered) = tokenizer.encode_to_ids_bounded("abc", 10).unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(covered, 3);
}

#[test]
fn index_of_token_count_reports_full_length_iff_it_fits() {
    let tokenizer = singles();
    let text = "The quick brown fox.";
    let count = tokenizer.count_tokens(text);

    let (length, n) = tokenizer.index_of_token_count(text, count).unwrap();
    assert_eq!((length, n), (text.len(), count));
    let (length, n) = tokenizer.index_of_token_count(text, count + 50).unwrap();
    assert_eq!((length, n), (text.len(), count));

    let (length, n) = tokenizer.index_of_token_count(text, count - 1).unwrap();
    assert!(length < text.len());
    assert_eq!(n, count - 1);
}

#[test]
fn prefix_and_suffix_bracket_every_split_point() {
    let tokenizer = singles();
    let text = "The quick brown fox.";
    let count = tokenizer.count_tokens(text);
    assert_eq!(count, text.len());

    for k in 1..=count {
        let (prefix_len, prefix_count) = tokenizer.index_of_token_count(text, k).unwrap();
        let (suffix_index, suffix_count) = tokenizer
            .last_index_of_token_count(text, count - k + 1)
            .unwrap();
        assert_eq!(prefix_count, k);
        assert_eq!(suffix_count, count - k + 1);
        // The two views overlap on exactly one token.
        assert_eq!(prefix_count + suffix_count, count + 1);
        assert_eq!(suffix_index + 1, prefix_len);
    }
}

#[test]
fn last_index_of_full_fit_starts_at_zero() {
    let tokenizer = singles();
    let (index, count) = tokenizer.last_index_of_token_count("abc", 10).unwrap();
    assert_eq!((index, count), (0, 3));
}

#[test]
fn truncation_never_splits_a_code_point() {
    let tokenizer = singles();
    let text = "😀😂";
    let full = tokenizer.encode_to_ids(text);
    assert_eq!(full.len(), 8);

    // Budgets inside the first emoji produce nothing.
    for max in 1..4 {
        let (ids, covered) = tokenizer.encode_to_ids_bounded(text, max).unwrap();
        assert!(ids.is_empty(), "max = {max}");
        assert_eq!(covered, 0);
    }
    // Budget 4 takes exactly the first emoji; 5..7 cannot take more.
    for max in 4..8 {
        let (ids, covered) = tokenizer.encode_to_ids_bounded(text, max).unwrap();
        assert_eq!(ids.len(), 4, "max = {max}");
        assert_eq!(covered, 4);
    }
    let (ids, covered) = tokenizer.encode_to_ids_bounded(text, 8).unwrap();
    assert_eq!(ids, full);
    assert_eq!(covered, text.len());
}

#[test]
fn suffix_fitting_never_splits_a_code_point() {
    let tokenizer = singles();
    let text = "😀😂";
    for max in 1..4 {
        let (index, count) = tokenizer.last_index_of_token_count(text, max).unwrap();
        assert_eq!((index, count), (text.len(), 0), "max = {max}");
    }
    for max in 4..8 {
        let (index, count) = tokenizer.last_index_of_token_count(text, max).unwrap();
        assert_eq!((index, count), (4, 4), "max = {max}");
    }
    assert_eq!(
        tokenizer.last_index_of_token_count(text, 8).unwrap(),
        (0, 8)
    );
}

#[test]
fn bounded_encode_counts_bos_and_eos() {
    let tokenizer = singles();
    let opts = EncodeOptions {
        add_bos: true,
        add_eos: true,
        ..EncodeOptions::default()
    };
    let text = "abcd";

    // Everything fits: bos + 4 + eos.
    let (ids, covered) = tokenizer
        .encode_to_ids_bounded_with(text, 6, opts)
        .unwrap();
    assert_eq!(ids.len(), 6);
    assert_eq!(ids[0], 50256);
    assert_eq!(*ids.last().unwrap(), 50256);
    assert_eq!(covered, 4);

    // Truncated: bos survives, eos is dropped.
    let (ids, covered) = tokenizer
        .encode_to_ids_bounded_with(text, 4, opts)
        .unwrap();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[0], 50256);
    assert_ne!(*ids.last().unwrap(), 50256);
    assert_eq!(covered, 3);
}

#[test]
fn suffix_fitting_counts_eos() {
    let tokenizer = singles();
    let opts = EncodeOptions {
        add_bos: true,
        add_eos: true,
        ..EncodeOptions::default()
    };
    // Suffix keeps EOS (it reaches the end); BOS only when everything fits.
    let (index, count) = tokenizer
        .last_index_of_token_count_with("abcd", 3, opts)
        .unwrap();
    assert_eq!((index, count), (2, 3));
    let (index, count) = tokenizer
        .last_index_of_token_count_with("abcd", 6, opts)
        .unwrap();
    assert_eq!((index, count), (0, 6));
}

#[test]
fn bounded_with_misconfigured_flags_is_rejected() {
    let vocab = Vocab::from_json_slice(singles_vocab_json().as_bytes()).unwrap();
    let merges = Merges::from_str("#\n").unwrap();
    let bare = Tokenizer::new(vocab, merges).unwrap();
    let opts = EncodeOptions {
        add_bos: true,
        ..EncodeOptions::default()
    };
    assert!(matches!(
        bare.encode_to_ids_bounded_with("abc", 2, opts),
        Err(TokenizerError::InvalidConfig(_))
    ));
}
