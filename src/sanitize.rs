//! Free-text cleanup for untrusted request fields.

/// Coalesces absent text to empty and bounds its length.
///
/// Text longer than `max_len` characters is cut to one character short of
/// the limit, so the cleaned value never reaches `max_len` itself. The cut
/// is by character, not byte, and the result is stable under a second pass.
#[must_use]
pub fn clean(text: Option<&str>, max_len: usize) -> String {
    let text = text.unwrap_or_default();

    if text.chars().count() > max_len {
        text.chars().take(max_len.saturating_sub(1)).collect()
    } else {
        text.to_string()
    }
}
