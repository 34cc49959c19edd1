//! Fixed-size character windowing for large documents.
//!
//! Boundaries are deliberately dumb: windows are cut every `max_chars`
//! characters with no regard for sentences or headings. Counting happens in
//! characters rather than bytes so multi-byte text never splits inside a code
//! point, and the windows partition the source exactly: concatenating them in
//! index order reproduces the input byte for byte.

/// One window of a larger document, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position of this window within the document.
    pub index: usize,
    /// Exact slice of the source text covered by this window.
    pub content: String,
    /// Number of windows the document was split into.
    pub total: usize,
}

/// Split `text` into consecutive windows of at most `max_chars` characters.
///
/// Text that fits in one window comes back as a single chunk, and empty text
/// yields one chunk with empty content so callers always receive at least one
/// window. Every window except the last holds exactly `max_chars` characters.
/// A zero `max_chars` is a caller bug and panics.
pub fn chunk(text: &str, max_chars: usize) -> Vec<Chunk> {
    assert!(max_chars > 0, "max_chars must be greater than zero");

    let mut contents = Vec::new();
    let mut remaining = text;
    loop {
        let split = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(offset, _)| offset)
            .unwrap_or(remaining.len());
        let (head, tail) = remaining.split_at(split);
        contents.push(head.to_string());
        if tail.is_empty() {
            break;
        }
        remaining = tail;
    }

    let total = contents.len();
    contents
        .into_iter()
        .enumerate()
        .map(|(offset, content)| Chunk {
            index: offset + 1,
            content,
            total,
        })
        .collect()
}
