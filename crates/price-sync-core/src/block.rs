//! Balanced-delimiter scanning over loosely structured source text.
//!
//! Only delimiter balance is tracked. Quote characters get no special
//! treatment, so a brace inside a string literal counts like any other.

/// Index of the delimiter closing the region opened at `open_at`.
///
/// `open_at` must point at an `open` byte. Returns `None` when the region
/// never closes.
pub fn matching_close(text: &str, open_at: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open_at) != Some(&open) {
        return None;
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open_at) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// The balanced `{...}` block opening at `open_at`, braces included.
pub fn block_at(text: &str, open_at: usize) -> Option<&str> {
    let end = matching_close(text, open_at, b'{', b'}')?;
    Some(&text[open_at..=end])
}

/// All top-level `{...}` blocks of `text`, in source order.
///
/// A close brace at depth zero is ignored. An opening brace that never
/// closes produces no block, but well-formed blocks nested inside the
/// unclosed region are still found.
pub fn extract_blocks(text: &str) -> Vec<&str> {
    let mut open = Vec::new();
    let mut pairs = Vec::new();

    for (i, &b) in text.as_bytes().iter().enumerate() {
        match b {
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    pairs.push((start, i));
                }
            }
            _ => {}
        }
    }

    // Closed pairs are nested or disjoint; keep the outermost ones.
    pairs.sort_unstable();
    let mut blocks = Vec::new();
    let mut covered_to = None;
    for (start, end) in pairs {
        if covered_to.is_some_and(|to| start < to) {
            continue;
        }
        blocks.push(&text[start..=end]);
        covered_to = Some(end);
    }

    blocks
}
