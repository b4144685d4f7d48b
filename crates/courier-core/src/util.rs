/// Shorten a string for log output, keeping the first `max` characters.
///
/// Character-based, so it never splits a multi-byte code point.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} chars)", &s[..cut], s[cut..].chars().count()),
    }
}
