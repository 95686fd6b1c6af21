//! Property and scenario tests for the header-context chunker.

use docrag::{Chunker, Document, HeaderContextChunker};
use proptest::prelude::*;

fn doc(text: &str) -> Document {
    Document::new("test.txt", text).unwrap()
}

/// **Property: the cursor strictly advances and chunk spans tile the
/// text.** For any word-shaped input and reasonable window parameters,
/// consecutive spans leave no gap, overlap by at most the configured
/// overlap, and start/end at the text's boundaries.
mod prop_spans {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn spans_tile_the_input(
            words in proptest::collection::vec("[a-z]{1,8}", 50..400),
            target in 400usize..1000,
            overlap in 0usize..120,
        ) {
            let text = words.join(" ");
            let total = text.chars().count();
            let chunks = HeaderContextChunker.chunk(&doc(&text), target, overlap).unwrap();

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start, 0);
            prop_assert_eq!(chunks.last().unwrap().end, total);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert!(chunk.start < chunk.end);
            }
            for pair in chunks.windows(2) {
                // Strict cursor advancement: termination is structural.
                prop_assert!(pair[1].start > pair[0].start);
                // No gap between consecutive spans.
                prop_assert!(pair[1].start <= pair[0].end);
                // Actual overlap never exceeds the configured overlap.
                prop_assert!(pair[0].end - pair[1].start <= overlap);
            }
        }

        /// Degenerate parameters (overlap at or past the window) must
        /// still terminate with strictly advancing spans.
        #[test]
        fn degenerate_windows_terminate(
            words in proptest::collection::vec("[a-z]{1,8}", 10..80),
            target in 1usize..40,
            overlap in 0usize..80,
        ) {
            let text = words.join(" ");
            let chunks = HeaderContextChunker.chunk(&doc(&text), target, overlap).unwrap();
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
            }
        }
    }
}

#[test]
fn short_text_yields_exactly_one_chunk() {
    let text = "A fifty character string for the chunker to keep.";
    let chunks = HeaderContextChunker.chunk(&doc(text), 800, 100).unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text.trim());
    assert!(!chunks[0].has_header);
    assert_eq!(chunks[0].sequence_index, 0);
    assert_eq!(chunks[0].id, "test.txt_0");
}

#[test]
fn empty_text_yields_no_chunks() {
    let chunks = HeaderContextChunker.chunk(&doc(""), 800, 100).unwrap();
    assert!(chunks.is_empty());

    let blank = HeaderContextChunker.chunk(&doc("   \n\n  "), 800, 100).unwrap();
    assert!(blank.is_empty());
}

#[test]
fn later_chunks_carry_the_header_prefix() {
    let mut text =
        String::from("Tarte aux pommes de grand-mère\nUne recette familiale classique.\n\n");
    for i in 0..40 {
        text.push_str(&format!(
            "Paragraphe {i}: mélanger la farine et le beurre, puis ajouter les pommes \
             coupées en fines tranches avant la cuisson au four.\n\n"
        ));
    }

    let chunks = HeaderContextChunker.chunk(&doc(&text), 800, 100).unwrap();
    assert!(chunks.len() > 1);

    assert!(!chunks[0].has_header);
    assert!(!chunks[0].text.starts_with("[DOCUMENT CONTEXT]"));
    for chunk in &chunks[1..] {
        assert!(chunk.has_header);
        assert!(chunk.text.starts_with("[DOCUMENT CONTEXT]\n"));
        assert!(chunk.text.contains("Tarte aux pommes"));
    }
}

#[test]
fn visible_text_stays_near_the_target_size() {
    let mut text = String::from("Titre du document\n\n");
    for _ in 0..200 {
        text.push_str("Une phrase assez banale qui remplit le document. ");
    }

    let target = 800;
    let chunks = HeaderContextChunker.chunk(&doc(&text), target, 100).unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        // Span length is the visible (pre-prefix) window.
        assert!(chunk.end - chunk.start <= target);
    }
}

#[test]
fn cuts_prefer_sentence_boundaries() {
    let mut text = String::new();
    for i in 0..80 {
        text.push_str(&format!("Sentence number {i} ends cleanly here.\n"));
    }

    let chunks = HeaderContextChunker.chunk(&doc(&text), 800, 100).unwrap();
    assert!(chunks.len() > 1);
    // Every non-final chunk ends at a line or sentence boundary, never
    // mid-word.
    for chunk in &chunks[..chunks.len() - 1] {
        let visible = chunk.text.rsplit("[END CONTEXT]\n\n").next().unwrap();
        let tail: String =
            visible.chars().skip(visible.chars().count().saturating_sub(20)).collect();
        assert!(
            visible.trim_end().ends_with('.'),
            "chunk did not end at a sentence boundary: {tail:?}"
        );
    }
}
