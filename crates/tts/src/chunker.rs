//! Text chunking at linguistic boundaries
//!
//! The synthesis endpoint accepts a bounded number of characters per
//! request. Longer text is split at sentence ends where possible, at word
//! boundaries otherwise, and only as a last resort mid-word. Splits never
//! drop characters and never produce an empty chunk.

use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into ordered chunks of at most `budget` characters.
///
/// Per chunk, the scan walks backward from the budget boundary looking for
/// sentence-ending punctuation (`.`, `?`, `!`) followed by a space and
/// splits there; failing that it splits at the last space; failing that it
/// hard-splits at the budget boundary, aligned to a grapheme cluster.
pub fn chunk_text(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    loop {
        if rest.chars().count() <= budget {
            chunks.push(rest.to_string());
            break;
        }

        let boundary = char_boundary(rest, budget);
        let window = &rest[..boundary];

        if let Some(split) = sentence_split(window) {
            chunks.push(window[..split].trim_end().to_string());
            rest = &rest[split..];
        } else if let Some(space) = last_usable_space(window) {
            chunks.push(window[..space].to_string());
            rest = &rest[space + 1..];
        } else {
            let cut = grapheme_floor(rest, boundary);
            chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
    }

    chunks
}

/// Byte index after `chars` characters
fn char_boundary(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// Byte index just past the last `<punct><space>` pair in the window.
///
/// Punctuation and space are ASCII, so byte scanning is UTF-8 safe.
fn sentence_split(window: &str) -> Option<usize> {
    let bytes = window.as_bytes();
    for i in (0..bytes.len().saturating_sub(1)).rev() {
        if matches!(bytes[i], b'.' | b'?' | b'!') && bytes[i + 1] == b' ' {
            return Some(i + 2);
        }
    }
    None
}

/// Last space that leaves a non-empty chunk before it
fn last_usable_space(window: &str) -> Option<usize> {
    match window.rfind(' ') {
        Some(0) | None => None,
        Some(space) => Some(space),
    }
}

/// Largest grapheme-cluster boundary at or below `byte_limit`, always
/// leaving at least one grapheme in the chunk
fn grapheme_floor(text: &str, byte_limit: usize) -> usize {
    let mut cut = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let end = idx + grapheme.len();
        if end > byte_limit {
            break;
        }
        cut = end;
    }

    if cut == 0 {
        text.graphemes(true)
            .next()
            .map(|g| g.len())
            .unwrap_or(text.len())
    } else {
        cut
    }
}
