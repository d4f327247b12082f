//! Overlapping sliding-window text chunker.
//!
//! Splits document text into windows of at most `chunk_size` characters.
//! Each window prefers to end on a sentence, paragraph, line, or word
//! boundary, and consecutive windows overlap by `overlap` characters so
//! facts straddling a boundary survive in at least one chunk.
//!
//! Sizes are measured in Unicode scalar values, never bytes, so multibyte
//! text is never split inside a character.

use crate::models::NewChunk;

/// Break points tried in order when a window has to end early.
const SEPARATORS: [&str; 5] = [". ", ".\n", "\n\n", "\n", " "];

/// Split text into overlapping chunks.
///
/// Returns no chunks for blank text and a single chunk when the trimmed
/// text fits in one window.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        if end < chars.len() {
            if let Some(brk) = find_break(&chars[start..end], chunk_size / 2) {
                end = start + brk;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Always advance, even when the overlap would swallow the window.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Chunk `text` and tag every piece with `source` and a contiguous index.
pub fn load_text(text: &str, source: &str, chunk_size: usize, overlap: usize) -> Vec<NewChunk> {
    chunk_text(text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| NewChunk::new(piece, source, i))
        .collect()
}

/// Find the end offset (exclusive) of the last separator in `window` that
/// starts beyond `min_pos`. Separators are tried in priority order.
fn find_break(window: &[char], min_pos: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let sep: Vec<char> = sep.chars().collect();
        if window.len() < sep.len() {
            continue;
        }
        let last = (0..=window.len() - sep.len())
            .rev()
            .find(|&i| window[i..i + sep.len()] == sep[..]);
        if let Some(pos) = last {
            if pos > min_pos {
                return Some(pos + sep.len());
            }
        }
    }
    None
}
