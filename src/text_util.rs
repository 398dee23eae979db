/// Number of characters kept in a field excerpt.
pub const EXCERPT_CHARS: usize = 150;

/// Appended to an excerpt when the source text was cut.
pub const TRUNCATION_MARKER: &str = "...";

/// Take the first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, so multi-byte characters are never split.
/// The truncation marker is only appended when something was dropped.
///
/// # Examples
///
/// ```
/// use cvsearch::text_util::excerpt;
///
/// assert_eq!(excerpt("Rust, Go", 150), "Rust, Go");
/// assert_eq!(excerpt("abcdef", 3), "abc...");
/// ```
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut out = text[..byte_idx].to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(excerpt("Python, SQL", EXCERPT_CHARS), "Python, SQL");
    }

    #[test]
    fn exact_length_has_no_marker() {
        let text = "a".repeat(EXCERPT_CHARS);
        assert_eq!(excerpt(&text, EXCERPT_CHARS), text);
    }

    #[test]
    fn long_text_is_cut_and_marked() {
        let text = "b".repeat(EXCERPT_CHARS + 20);
        let out = excerpt(&text, EXCERPT_CHARS);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            out.chars().count(),
            EXCERPT_CHARS + TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn multibyte_characters_are_not_split() {
        let text = "é".repeat(10);
        assert_eq!(excerpt(&text, 4), "éééé...");
    }

    #[test]
    fn empty_text() {
        assert_eq!(excerpt("", 10), "");
        assert_eq!(excerpt("abc", 0), "...");
    }

    #[test]
    fn single_line_collapses_whitespace() {
        assert_eq!(single_line("a\n  b\tc "), "a b c");
    }
}
