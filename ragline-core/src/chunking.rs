//! Recursive character text splitting.
//!
//! [`TextSplitter`] breaks source text into chunks of at most `chunk_size`
//! characters, preferring paragraph, line, and sentence boundaries over
//! mid-word cuts, and carrying up to `chunk_overlap` trailing characters of
//! context into the next chunk.

use crate::error::{RaglineError, Result};

/// Separator ladder tried coarsest-first. Text that none of these can break
/// is cut at character boundaries.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits text into bounded, overlapping chunks.
///
/// Sizes are counted in characters, not bytes, so multi-byte text never
/// produces an out-of-bounds cut. Emitted chunks are trimmed of surrounding
/// whitespace and are never empty.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_core::TextSplitter;
///
/// let splitter = TextSplitter::new(1000, 200)?;
/// let chunks = splitter.split(&text)?;
/// ```
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a new `TextSplitter`.
    ///
    /// # Errors
    ///
    /// Returns [`RaglineError::Config`] if `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RaglineError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RaglineError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    ///
    /// # Errors
    ///
    /// Returns [`RaglineError::EmptyInput`] when `text` is empty or contains
    /// only whitespace.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(RaglineError::EmptyInput);
        }

        let fragments = split_recursive(text, self.chunk_size, self.chunk_overlap, &SEPARATORS);
        Ok(merge_fragments(fragments, self.chunk_size, self.chunk_overlap))
    }
}

/// Break text into fragments of at most `chunk_size` characters, trying each
/// separator in turn and keeping the separator attached to the preceding
/// fragment. Fragments no separator can shorten are cut at character
/// boundaries with `chunk_overlap` carried between cuts.
fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return split_by_chars(text, chunk_size, chunk_overlap);
    };

    let pieces = split_keeping_separator(text, separator);
    if pieces.len() <= 1 {
        return split_recursive(text, chunk_size, chunk_overlap, rest);
    }

    let mut fragments = Vec::new();
    for piece in pieces {
        if piece.chars().count() <= chunk_size {
            fragments.push(piece.to_string());
        } else {
            fragments.extend(split_recursive(piece, chunk_size, chunk_overlap, rest));
        }
    }
    fragments
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment, so that concatenating the segments reproduces the input.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-boundary splitting with overlap, for text with no usable separators.
fn split_by_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let total = boundaries.len();
    if total == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        let byte_start = boundaries[start];
        let byte_end = if end == total { text.len() } else { boundaries[end] };
        chunks.push(text[byte_start..byte_end].to_string());
        if end == total {
            break;
        }
        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 {
            break;
        }
        start += step;
    }
    chunks
}

/// Merge fragments greedily into chunks of at most `chunk_size` characters.
///
/// When a chunk fills up it is emitted (trimmed), and whole fragments are
/// retained from its tail, up to `chunk_overlap` characters, as the prefix
/// of the next chunk.
fn merge_fragments(fragments: Vec<String>, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<(String, usize)> = Vec::new();
    let mut window_len = 0usize;

    for fragment in fragments {
        let fragment_len = fragment.chars().count();

        if window_len + fragment_len > chunk_size && !window.is_empty() {
            emit_window(&window, &mut chunks);
            while window_len > chunk_overlap
                || (window_len + fragment_len > chunk_size && window_len > 0)
            {
                let (_, dropped_len) = window.remove(0);
                window_len -= dropped_len;
            }
        }

        window_len += fragment_len;
        window.push((fragment, fragment_len));
    }

    emit_window(&window, &mut chunks);
    chunks
}

fn emit_window(window: &[(String, usize)], chunks: &mut Vec<String>) {
    let joined: String = window.iter().map(|(fragment, _)| fragment.as_str()).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
