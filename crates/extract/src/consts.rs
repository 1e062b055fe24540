use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Placeholder author spellings used by uploaders when the author is unknown.
pub(crate) const DEFAULT_SENTINELS: [&str; 2] = ["N_A", "N／A"];

// Explicit `(12345)` suffix at the very end of the extension-less name.
// `\d` is Unicode-aware, so full-width and other decimal digits count.
regex!(ID_SUFFIX_REGEX, r"\((\d+)\)$");
// Any run of digits, used as a degraded fallback (last match wins).
regex!(DIGITS_REGEX, r"\d+");
// One or two leading bracket groups: `[Author]` or `[Author][Group]`.
regex!(AUTHOR_REGEX, r"^\[([^\]]+)\](?:\[([^\]]+)\])?");
