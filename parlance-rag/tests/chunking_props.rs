//! Property tests for chunk coverage, overlap and determinism.

use parlance_rag::{Chunk, Chunker, Document, FixedSizeChunker, SeparatorChunker, chunk_text};
use proptest::prelude::*;

/// Text with plenty of separators and some multibyte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-z]{1,12}",
            Just(" ".to_string()),
            Just(". ".to_string()),
            Just("\n".to_string()),
            Just("\n\n".to_string()),
            Just("héllo".to_string()),
            Just("日本語".to_string()),
        ],
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

/// `(chunk_size, overlap)` with `overlap < chunk_size`.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

fn assert_covers(chunks: &[Chunk], text: &str, size: usize, overlap: usize) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        assert!(chunks.is_empty());
        return;
    }

    assert_eq!(chunks[0].char_start, 0);
    assert_eq!(chunks.last().unwrap().char_end, chars.len());
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert!(chunk.char_len() > 0 && chunk.char_len() <= size);
        let expected: String = chars[chunk.char_start..chunk.char_end].iter().collect();
        assert_eq!(chunk.text, expected);
    }
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].char_start, pair[0].char_end - overlap, "overlap must be exact");
        assert!(pair[1].char_end > pair[0].char_end, "no chunk is contained in its predecessor");
    }
}

/// Contiguous windows that overlap by exactly `overlap` characters and
/// together cover the whole document.
mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn fixed_windows_cover_text_with_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_window(),
        ) {
            let chunks = chunk_text("doc.txt", &text, size, overlap).unwrap();
            assert_covers(&chunks, &text, size, overlap);
        }

        #[test]
        fn separator_windows_cover_text_with_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_window(),
        ) {
            let chunker = SeparatorChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc.txt", text.clone()));
            assert_covers(&chunks, &text, size, overlap);
        }
    }
}

/// Chunking the same input twice yields identical chunks.
mod prop_chunk_determinism {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn chunking_is_deterministic(
            text in arb_text(),
            (size, overlap) in arb_window(),
        ) {
            let document = Document::new("doc.txt", text).with_metadata("lang", "en");
            let fixed = FixedSizeChunker::new(size, overlap).unwrap();
            let separator = SeparatorChunker::new(size, overlap).unwrap();
            prop_assert_eq!(fixed.chunk(&document), fixed.chunk(&document));
            prop_assert_eq!(separator.chunk(&document), separator.chunk(&document));
        }
    }
}

#[test]
fn fixed_windows_match_the_worked_example() {
    let chunks = chunk_text("doc.txt", "AAAA BBBB CCCC DDDD", 9, 3).unwrap();
    let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.char_start, c.char_end)).collect();
    assert_eq!(spans, vec![(0, 9), (6, 15), (12, 19)]);
    assert_eq!(chunks[0].text, "AAAA BBBB");
    assert_eq!(chunks[2].text, "CC DDDD");
}
