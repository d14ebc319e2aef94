//! Small text helpers shared by the analyzer and the novelty tracker.

/// Marker appended to text cut by [`truncate_chars`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Cut `text` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
///
/// # Examples
///
/// ```
/// use llama_pile::text_util::truncate_chars;
///
/// assert_eq!(truncate_chars("short", 10), "short");
/// assert_eq!(truncate_chars("abcdef", 3), "abc... [truncated]");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Lines of `text` that contain a colon, trimmed.
///
/// ```
/// use llama_pile::text_util::key_value_lines;
///
/// let lines: Vec<_> = key_value_lines("intro\n topic: space \nbye").collect();
/// assert_eq!(lines, vec!["topic: space"]);
/// ```
pub fn key_value_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| l.contains(':')).map(str::trim)
}

/// Split each colon line into a trimmed `(key, value)` pair.
///
/// The split happens at the first colon. Lines whose key is empty are
/// skipped.
///
/// ```
/// use llama_pile::text_util::key_value_pairs;
///
/// let pairs = key_value_pairs("topic: space\n: orphan\ntime: 12:30");
/// assert_eq!(pairs, vec![("topic", "space"), ("time", "12:30")]);
/// ```
pub fn key_value_pairs(text: &str) -> Vec<(&str, &str)> {
    key_value_lines(text)
        .filter_map(|line| {
            let (k, v) = line.split_once(':')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k, v.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let out = truncate_chars("héllo wörld", 4);
        assert_eq!(out, format!("héll{TRUNCATION_MARKER}"));
    }

    #[test]
    fn exact_length_is_not_truncated() {
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn lines_without_colon_are_dropped() {
        let lines: Vec<_> = key_value_lines("no pairs here\nstill none").collect();
        assert!(lines.is_empty());
    }
}
