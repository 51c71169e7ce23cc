// ECF player code extraction from raw (possibly HTML-wrapped) roster cells.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// A normalized ECF player code: six digits and a letter (`123456A`) or a
/// letter and five or six digits (`A12345`), always uppercase.
///
/// Only [`extract_code`] constructs one, so holding a `PlayerCode` means the
/// row is enrichable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerCode(String);

impl PlayerCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn code_regex() -> &'static Regex {
    static CODE_RE: OnceLock<Regex> = OnceLock::new();
    CODE_RE.get_or_init(|| {
        Regex::new(r"(?i)\b([0-9]{6}[A-Z]|[A-Z][0-9]{5,6})\b").expect("player code regex is valid")
    })
}

/// Find the first player code anywhere in `raw` and return it uppercased.
///
/// Matching is case-insensitive and needs word boundaries on both sides, so
/// codes embedded in anchor markup (`...?player_no=123456A">123456A</a>`) are
/// still found.
pub fn extract_code(raw: &str) -> Option<PlayerCode> {
    code_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| PlayerCode(m.as_str().to_ascii_uppercase()))
}
