//! Text helpers for description truncation

use std::borrow::Cow;

/// Suffix appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Trim `text` and cut it to `max` characters followed by [`ELLIPSIS`].
///
/// Counts characters, not bytes, so multi-byte text is never split.
/// Text of at most `max` characters is returned trimmed but otherwise unchanged.
pub fn truncate_chars(text: &str, max: usize) -> Cow<'_, str> {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max) {
        Some((cut, _)) => Cow::Owned(format!("{}{ELLIPSIS}", &trimmed[..cut])),
        None => Cow::Borrowed(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_unchanged() {
        assert_eq!(truncate_chars("  hello  ", 75), "hello");
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(75);
        assert_eq!(truncate_chars(&s, 75), s);
    }

    #[test]
    fn long_text_cut() {
        let s = "b".repeat(90);
        let out = truncate_chars(&s, 60);
        assert_eq!(out, format!("{}...", "b".repeat(60)));
    }

    #[test]
    fn multibyte_chars_safe() {
        let s = "课".repeat(80);
        let out = truncate_chars(&s, 75);
        assert_eq!(out.chars().count(), 78);
        assert!(out.ends_with(ELLIPSIS));
    }
}
