//! Character-bounded text helpers. Limits count chars, never bytes.

/// Marker appended to display blocks cut by [`trim_for_display`].
pub const DISPLAY_TRUNCATION_MARKER: &str = "\n...(truncated)";

/// First `max_chars` chars of `text` and whether anything was cut.
/// A limit of 0 means unlimited.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    if max_chars == 0 {
        return (text, false);
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Trim surrounding whitespace, then cut to `max_chars` with a marker.
pub fn trim_for_display(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match truncate_chars(trimmed, max_chars) {
        (head, true) => format!("{}{}", head, DISPLAY_TRUNCATION_MARKER),
        (head, false) => head.to_string(),
    }
}
