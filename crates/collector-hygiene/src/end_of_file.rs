//! Final newline normalization.
//!
//! Only the text after the last `\n` is examined. If it has content, a
//! newline is appended; if it is blank, it is removed. A file that already
//! ends in a newline is left alone, even when it ends in several.

/// Returns the normalized text, or `None` if the file should not be touched.
///
/// # Examples
///
/// ```
/// use collector_hygiene::end_of_file::normalize;
///
/// assert_eq!(normalize("a\nb").as_deref(), Some("a\nb\n"));
/// assert_eq!(normalize("a\n  "), Some("a\n".to_string()));
/// assert_eq!(normalize("a\n"), None);
/// ```
#[must_use]
pub fn normalize(text: &str) -> Option<String> {
    let (head, last_line) = match text.rsplit_once('\n') {
        Some((head, last)) => (Some(head), last),
        None => (None, text),
    };

    if last_line.is_empty() {
        return None;
    }

    let mut lines: Vec<&str> = head.map(|h| h.split('\n').collect()).unwrap_or_default();
    if !last_line.trim().is_empty() {
        lines.push(last_line);
    }
    lines.push("");

    Some(lines.join("\n"))
}
