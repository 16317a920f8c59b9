//! Splits a corpus into pieces that fit the model's context window.
//!
//! Sizes are estimated, not tokenized: [`CharRatioEstimator`] assumes
//! [`CHARS_PER_TOKEN`] characters per token, a rough average for English
//! prose and source code. Swapping in a real tokenizer only means providing
//! another [`TokenEstimator`]; the greedy line packing stays the same.

use crate::corpus::FILE_HEADER_PREFIX;

/// Characters assumed to make up one token
pub const CHARS_PER_TOKEN: usize = 4;

/// Converts a token budget into the character budget of one chunk
pub fn max_chars_for_tokens(max_tokens: usize) -> usize {
    max_tokens.max(1) * CHARS_PER_TOKEN
}

/// Measures text in the unit the token budget is expressed in
pub trait TokenEstimator {
    /// Largest piece, in characters, that fits `max_tokens`
    fn char_budget(&self, max_tokens: usize) -> usize;

    /// Size of `text` in characters
    fn measure(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Fixed characters-per-token ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct CharRatioEstimator;

impl TokenEstimator for CharRatioEstimator {
    fn char_budget(&self, max_tokens: usize) -> usize {
        max_chars_for_tokens(max_tokens)
    }
}

/// Splits `text` into chunks of at most `max_tokens * 4` characters
pub fn split_into_chunks(text: &str, max_tokens: usize) -> Vec<String> {
    split_with_estimator(text, max_tokens, &CharRatioEstimator)
}

/// Greedy line packing with a pluggable size measure
///
/// Lines keep their trailing `\n`, so joining the result gives back `text`
/// exactly. The terminator of a chunk's last line is not charged against the
/// budget. A line longer than the whole budget is cut into budget-sized
/// pieces, each emitted as its own chunk, with the terminator kept on the
/// last piece.
///
/// A `// Archivo:` header line never ends a chunk when the line after it can
/// join it in the next one, and a buffer of blank lines is folded into the
/// previous chunk instead of becoming a chunk of its own.
pub fn split_with_estimator<E: TokenEstimator>(text: &str, max_tokens: usize, estimator: &E) -> Vec<String> {
    let max_chars = estimator.char_budget(max_tokens).max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split_inclusive('\n') {
        let (content, terminator) = split_terminator(line);
        let content_len = estimator.measure(content);

        if current_len + content_len <= max_chars {
            current.push_str(line);
            current_len += estimator.measure(line);
            continue;
        }

        if !current.is_empty() {
            match trailing_header_start(&current) {
                Some(at) if estimator.measure(&current[at..]) + content_len <= max_chars => {
                    let header = current.split_off(at);
                    flush(&mut chunks, std::mem::replace(&mut current, header));
                    current_len = estimator.measure(&current) + estimator.measure(line);
                    current.push_str(line);
                    continue;
                }
                _ => {
                    flush(&mut chunks, std::mem::take(&mut current));
                    current_len = 0;
                }
            }
        }

        if content_len > max_chars {
            let mut pieces = hard_split(content, max_chars);
            if let Some(last) = pieces.last_mut() {
                last.push_str(terminator);
            }
            chunks.extend(pieces);
        } else {
            current.push_str(line);
            current_len = estimator.measure(line);
        }
    }

    if !current.is_empty() {
        flush(&mut chunks, current);
    }

    chunks
}

/// Separates a line from its `\n` or `\r\n` terminator
fn split_terminator(line: &str) -> (&str, &str) {
    let content = line.strip_suffix('\n').unwrap_or(line);
    let content = content.strip_suffix('\r').unwrap_or(content);
    line.split_at(content.len())
}

/// Byte offset of a trailing file header, together with the blank lines
/// before it, when something else precedes them in `buffer`
fn trailing_header_start(buffer: &str) -> Option<usize> {
    let mut offset = 0;
    let mut lines = Vec::new();
    for line in buffer.split_inclusive('\n') {
        lines.push((offset, line));
        offset += line.len();
    }

    let (mut start, last) = lines.pop()?;
    if !last.starts_with(FILE_HEADER_PREFIX) {
        return None;
    }
    while let Some((at, line)) = lines.pop() {
        if !line.trim().is_empty() {
            break;
        }
        start = at;
    }
    (start > 0).then_some(start)
}

/// Pushes a finished buffer, folding blank-only buffers into the previous chunk
fn flush(chunks: &mut Vec<String>, buffer: String) {
    match chunks.last_mut() {
        Some(previous) if buffer.trim().is_empty() => previous.push_str(&buffer),
        _ => chunks.push(buffer),
    }
}

/// Cuts a single line into pieces of `max_chars` characters
fn hard_split(line: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}
