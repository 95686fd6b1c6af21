//! Boundary-aware document chunking with shared header context.
//!
//! [`HeaderContextChunker`] extracts a short header from the start of a
//! document and prefixes it to every chunk after the first, so that a
//! chunk retrieved in isolation still carries the document's framing.
//! Within each window it prefers to cut at a paragraph break, then a line
//! break, then a sentence end.

use crate::document::{Chunk, Document};
use crate::error::Result;

/// Upper bound on extracted header text, in characters. The actual budget
/// also never exceeds a third of the target chunk size, so the prefix
/// cannot swallow the chunk window.
const HEADER_MAX_CHARS: usize = 300;

/// Minimum header size before a structural marker stops the scan.
const HEADER_MIN_BEFORE_MARKER: usize = 100;

/// Markers that end the header once enough content has accumulated.
const HEADER_STOP_MARKERS: [&str; 4] = ["##", "###", "Instructions", "Étapes"];

/// Delimiters around the header block prefixed to chunks.
const HEADER_OPEN: &str = "[DOCUMENT CONTEXT]\n";
const HEADER_CLOSE: &str = "\n[END CONTEXT]\n\n";

/// Candidate break points within a window, best first.
const BREAKS: [&str; 5] = ["\n\n", "\n", ". ", "? ", "! "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text, spans, and sequence
/// indices but no embeddings. Embeddings are attached during indexing.
pub trait Chunker: Send + Sync {
    /// Split a document into ordered chunks.
    ///
    /// `target_size` and `overlap` are measured in characters. The cursor
    /// must advance on every iteration regardless of the parameter
    /// combination. Empty text yields an empty `Vec`; indexing treats that
    /// as a validation error, not success.
    fn chunk(&self, document: &Document, target_size: usize, overlap: usize)
    -> Result<Vec<Chunk>>;
}

/// Splits text into overlapping windows, carrying document-header context
/// into every chunk after the first.
///
/// The header's length is subtracted from the effective window so the
/// visible chunk length stays close to `target_size`.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{Chunker, HeaderContextChunker};
///
/// let chunks = HeaderContextChunker.chunk(&document, 800, 100)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderContextChunker;

impl Chunker for HeaderContextChunker {
    fn chunk(
        &self,
        document: &Document,
        target_size: usize,
        overlap: usize,
    ) -> Result<Vec<Chunk>> {
        let text = document.text.as_str();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        // Text that fits one window becomes exactly one chunk, with no
        // header prefix: the chunk already carries its own context.
        let total = text.chars().count();
        if total <= target_size {
            let body = text.trim();
            if body.is_empty() {
                return Ok(Vec::new());
            }
            let chunk = Chunk::new(&document.filename, &document.id, 0, body)?
                .with_span(0, total);
            return Ok(vec![chunk]);
        }

        let header = extract_header(text, HEADER_MAX_CHARS.min(target_size / 3));
        let header_prefix = if header.is_empty() {
            String::new()
        } else {
            format!("{HEADER_OPEN}{header}{HEADER_CLOSE}")
        };
        let prefix_len = header_prefix.chars().count();

        // The effective window keeps the visible chunk length near
        // target_size once the header prefix is attached. Floor of one
        // character guarantees forward progress even when the header
        // swallows the whole window.
        let effective = target_size.saturating_sub(prefix_len).max(1);

        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut sequence_index = 0usize;

        while start < total {
            let mut end = (start + effective).min(total);
            if end < total {
                if let Some(cut) = find_break(&chars[start..end], effective) {
                    end = start + cut;
                }
            }

            let window: String = chars[start..end].iter().collect();
            let body = window.trim();
            if !body.is_empty() {
                let has_header = sequence_index > 0 && !header_prefix.is_empty();
                let chunk_text = if has_header {
                    format!("{header_prefix}{body}")
                } else {
                    body.to_string()
                };
                let chunk = Chunk::new(&document.filename, &document.id, sequence_index, chunk_text)?
                    .with_span(start, end)
                    .with_header(has_header);
                chunks.push(chunk);
                sequence_index += 1;
            }

            // Step past the window minus the overlap. Degenerate windows
            // fall back to single-character steps so the cursor always
            // moves and termination is guaranteed.
            let next = end.saturating_sub(overlap);
            start = if next <= start { start + 1 } else { next };
        }

        Ok(chunks)
    }
}

/// Extract a short header from the document's leading non-empty lines.
///
/// Stops early when a structural marker (heading or numbered step) shows
/// up after the header has already accumulated some minimum content.
fn extract_header(text: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }

    let mut lines = Vec::new();
    let mut size = 0;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if size > HEADER_MIN_BEFORE_MARKER && is_structural_marker(line) {
            break;
        }
        size += line.chars().count();
        lines.push(line);
        if size >= budget {
            break;
        }
    }

    let header = lines.join("\n");
    if header.chars().count() > budget {
        // A single overlong line can blow past the budget; cap it so the
        // prefix never swallows the chunk window.
        header.chars().take(budget).collect()
    } else {
        header
    }
}

/// Whether a line looks like a section heading or a numbered step.
fn is_structural_marker(line: &str) -> bool {
    if HEADER_STOP_MARKERS.iter().any(|marker| line.contains(marker)) {
        return true;
    }
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(digit), Some('.' | ')')) if digit.is_ascii_digit()
    )
}

/// Find the best cut inside a window, as a character offset from the
/// window start, or `None` when no acceptable break point exists.
///
/// Only break points past the halfway mark of the effective window are
/// accepted, so chunks never collapse to tiny fragments.
fn find_break(window: &[char], effective: usize) -> Option<usize> {
    let window_str: String = window.iter().collect();
    let floor = effective / 2;

    for separator in BREAKS {
        if let Some(byte_idx) = window_str.rfind(separator) {
            let char_idx = window_str[..byte_idx].chars().count();
            if char_idx > floor {
                return Some(char_idx + separator.chars().count());
            }
        }
    }

    None
}
