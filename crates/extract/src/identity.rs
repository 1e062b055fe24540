//! Gallery identity from filenames.

use crate::consts::{AUTHOR_REGEX, DEFAULT_SENTINELS, DIGITS_REGEX, ID_SUFFIX_REGEX};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::ffi::OsStr;
use std::path::Path;
use tracing::instrument;

/// The "no author" marker uploaders put in the author bracket.
///
/// Matching is case-insensitive across every accepted spelling; the first
/// spelling is the canonical one, used whenever an author has to be made up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentinel {
    spellings: Vec<String>,
}
impl Default for Sentinel {
    fn default() -> Self {
        Self {
            spellings: DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
impl Sentinel {
    pub fn new<S: Into<String>>(spellings: impl IntoIterator<Item = S>) -> Result<Self> {
        let spellings: Vec<String> =
            spellings.into_iter().map(Into::into).filter(|s: &String| !s.trim().is_empty()).collect();
        if spellings.is_empty() {
            exn::bail!(ErrorKind::EmptySentinel);
        }
        Ok(Self { spellings })
    }

    /// The spelling used when a placeholder author has to be synthesized.
    pub fn canonical(&self) -> &str {
        // Construction guarantees at least one spelling.
        self.spellings.first().map(String::as_str).unwrap_or(DEFAULT_SENTINELS[0])
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_uppercase();
        self.spellings.iter().any(|s| s.to_uppercase() == candidate)
    }
}

/// Splits a filename into its base and extension (including the dot).
///
/// Leading dots belong to the base, so `.hidden` has no extension while
/// `archive.tar.cbz` splits into `archive.tar` and `.cbz`.
pub fn split_extension(filename: &str) -> (&str, &str) {
    let leading = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading..].rfind('.') {
        Some(index) => filename.split_at(leading + index),
        None => (filename, ""),
    }
}

/// Case-insensitive extension check. `extension` may be given with or without
/// its leading dot.
pub fn matches_extension(filename: &str, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    let (_, found) = split_extension(filename);
    !wanted.is_empty() && found.len() > 1 && found[1..].eq_ignore_ascii_case(wanted)
}

/// Final path component as UTF-8.
pub fn file_name(path: &Path) -> Result<&str> {
    path.file_name().and_then(OsStr::to_str).ok_or_raise(|| ErrorKind::InvalidFilename(path.to_path_buf()))
}

/// Extracts the logical gallery ID from a filename.
///
/// An explicit `(12345)` directly before the extension wins. Otherwise the
/// *last* run of digits anywhere in the name is used, which will misfire on
/// titles that happen to end in a number. Returns `None` if the name contains
/// no digits, or the digits don't fit in a `u64`.
///
/// Decimal digits of any script count, so `タイトル２` yields `2`.
#[instrument(level = "trace")]
pub fn extract_id(filename: &str) -> Option<u64> {
    let (base, _) = split_extension(filename);
    if let Some(captures) = ID_SUFFIX_REGEX.captures(base) {
        return captures.get(1).and_then(|m| parse_digits(m.as_str()));
    }
    DIGITS_REGEX.find_iter(base).last().and_then(|m| parse_digits(m.as_str()))
}

fn parse_digits(digits: &str) -> Option<u64> {
    digits.chars().try_fold(0u64, |id, c| id.checked_mul(10)?.checked_add(digit_value(c)?))
}

/// Value of a decimal digit from any script. Unicode keeps each script's
/// digits in runs of ten consecutive code points, zero first.
fn digit_value(c: char) -> Option<u64> {
    if let Some(d) = c.to_digit(10) {
        return Some(d.into());
    }
    let is_digit = |c: char| DIGITS_REGEX.is_match(c.encode_utf8(&mut [0; 4]));
    if !is_digit(c) {
        return None;
    }
    let preceding = (0..u32::from(c)).rev().map_while(char::from_u32).take_while(|&p| is_digit(p)).count();
    Some((preceding % 10) as u64)
}

/// Extracts a best-effort author from the leading bracket(s) of a filename.
///
/// - `[Artist] Title` and `[Artist][Group] Title` yield `Artist`; the second
///   bracket is a circle/group and never counts as the author.
/// - When the first bracket is the `sentinel`, the group is the best we have:
///   `[N_A][Group] Title` yields `Group` and a lone `[N_A] Title` yields the
///   sentinel as written.
/// - No leading bracket at all yields `None`.
#[instrument(level = "trace", skip(sentinel))]
pub fn extract_author(filename: &str, sentinel: &Sentinel) -> Option<String> {
    let captures = AUTHOR_REGEX.captures(filename)?;
    let first = captures.get(1)?.as_str();
    let second = captures.get(2).map(|m| m.as_str());
    match second {
        Some(group) if sentinel.matches(first) => Some(group.to_string()),
        _ => Some(first.to_string()),
    }
}
