//! Message splitting for the Discord character limit
//!
//! Replies longer than the limit are split into chunks. Fenced code blocks
//! are re-fenced in every chunk they span, so a split block stays
//! syntactically valid in each message.

/// Overhead of re-opening and re-closing a fence around a code chunk
const FENCE_OVERHEAD: usize = 6;

/// Split `text` into chunks of at most `char_limit` characters.
///
/// Chunks alternate between plain text and code-block segments along ```
/// boundaries; code segments are wrapped in fresh fences per chunk.
pub fn split_message(text: &str, char_limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= char_limit {
        return vec![text.to_string()];
    }

    let code_limit = char_limit.saturating_sub(FENCE_OVERHEAD).max(1);

    let mut chunks = Vec::new();
    let mut in_code_block = false;

    for part in text.split("```") {
        let limit = if in_code_block { code_limit } else { char_limit };
        for piece in chunk_chars(part, limit) {
            if in_code_block {
                chunks.push(format!("```{}```", piece));
            } else {
                chunks.push(piece);
            }
        }
        in_code_block = !in_code_block;
    }

    chunks
}

/// Split a string into pieces of at most `limit` characters, skipping
/// empty pieces
fn chunk_chars(s: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in s.chars() {
        if count == limit {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
