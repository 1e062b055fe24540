use crate::error::{ErrorKind, Result};

/// Makes a category or author name safe to use as a single directory name.
///
/// Keeps letters, digits, spaces, `.`, `-` and `_`; everything else (path
/// separators, brackets, reserved punctuation) is dropped before trimming
/// surrounding whitespace. Fails if nothing usable is left, which includes
/// names consisting only of dots.
pub fn sanitize_segment(name: &str) -> Result<String> {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        exn::bail!(ErrorKind::InvalidSegment(name.to_string()));
    }
    Ok(trimmed.to_string())
}
