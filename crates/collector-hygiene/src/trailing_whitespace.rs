//! Trailing whitespace removal.

/// Strips trailing whitespace from every `\n`-separated line.
///
/// Line terminators are preserved except for a `\r` before `\n`, which
/// counts as whitespace.
///
/// # Examples
///
/// ```
/// use collector_hygiene::trailing_whitespace::trim;
///
/// assert_eq!(trim("a  \nb\t\n"), "a\nb\n");
/// ```
#[must_use]
pub fn trim(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like [`trim`], but returns `None` when nothing changes.
#[must_use]
pub fn fix(text: &str) -> Option<String> {
    let trimmed = trim(text);
    (trimmed != text).then_some(trimmed)
}
