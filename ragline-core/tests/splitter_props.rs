//! Property tests for recursive text splitting.

use proptest::prelude::*;
use ragline_core::chunking::TextSplitter;

/// Generate realistic prose: words joined by spaces, newlines, paragraph
/// breaks, and sentence ends. Returns the text and the words it contains.
fn arb_words_and_text() -> impl Strategy<Value = (String, Vec<String>)> {
    proptest::collection::vec(
        ("[a-z]{1,10}", prop_oneof![Just(" "), Just("\n"), Just("\n\n"), Just(". ")]),
        1..60,
    )
    .prop_map(|pairs| {
        let mut text = String::new();
        let mut words = Vec::new();
        for (word, separator) in pairs {
            text.push_str(&word);
            text.push_str(separator);
            words.push(word);
        }
        (text, words)
    })
}

/// **Feature: ragline-core, Property 1: Chunk size bound**
/// *For any* input text and valid splitter parameters, every emitted chunk
/// SHALL contain at most `chunk_size` characters and SHALL NOT be empty.
mod prop_chunk_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn chunks_are_bounded_and_non_empty(
            (text, _words) in arb_words_and_text(),
            chunk_size in 24usize..=100,
            chunk_overlap in 0usize..12,
        ) {
            let splitter = TextSplitter::new(chunk_size, chunk_overlap).unwrap();
            let chunks = splitter.split(&text).unwrap();

            prop_assert!(!chunks.is_empty());
            for chunk in &chunks {
                let chars = chunk.chars().count();
                prop_assert!(
                    chars <= chunk_size,
                    "chunk of {} chars exceeds chunk_size {}",
                    chars,
                    chunk_size,
                );
                prop_assert!(!chunk.trim().is_empty());
            }
        }
    }
}

/// **Feature: ragline-core, Property 2: Chunks are verbatim slices**
/// *For any* input text, every emitted chunk SHALL appear verbatim as a
/// substring of the input, so no chunk ever invents or reorders text.
mod prop_chunks_are_substrings {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn every_chunk_is_a_substring_of_the_input(
            (text, _words) in arb_words_and_text(),
            chunk_size in 24usize..=100,
            chunk_overlap in 0usize..12,
        ) {
            let splitter = TextSplitter::new(chunk_size, chunk_overlap).unwrap();
            let chunks = splitter.split(&text).unwrap();

            for chunk in &chunks {
                prop_assert!(
                    text.contains(chunk.as_str()),
                    "chunk {:?} is not a substring of the input",
                    chunk,
                );
            }
        }
    }
}

/// **Feature: ragline-core, Property 3: No text is lost**
/// *For any* input text, every word of the input SHALL appear in at least
/// one emitted chunk.
mod prop_word_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn every_word_lands_in_some_chunk(
            (text, words) in arb_words_and_text(),
            chunk_size in 24usize..=100,
            chunk_overlap in 0usize..12,
        ) {
            let splitter = TextSplitter::new(chunk_size, chunk_overlap).unwrap();
            let chunks = splitter.split(&text).unwrap();

            for word in &words {
                prop_assert!(
                    chunks.iter().any(|chunk| chunk.contains(word.as_str())),
                    "word {:?} missing from all {} chunks",
                    word,
                    chunks.len(),
                );
            }
        }
    }
}
