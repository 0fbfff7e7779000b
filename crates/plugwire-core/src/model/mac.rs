// ── Hardware address ──
//
// Devices report their MAC under several keys and in several formats.
// MacAddress normalizes to bare upper-case hex so comparisons and glob
// patterns work regardless of separators or case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to upper-case alphanumerics (AABBCC001122).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref(), |c| c.is_ascii_alphanumeric()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Match against a glob pattern: `?` is one character, `*` any run.
    ///
    /// Separators and case in the pattern are ignored, so
    /// `"aa:bb:cc:??:??:??"` matches every address with that vendor prefix.
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = normalize(pattern, |c| c.is_ascii_alphanumeric() || c == '?' || c == '*');
        glob_match(pattern.as_bytes(), self.0.as_bytes())
    }

    /// True if any of `patterns` matches.
    pub fn matches_any<S: AsRef<str>>(&self, patterns: &[S]) -> bool {
        patterns.iter().any(|p| self.matches(p.as_ref()))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

fn normalize(raw: &str, keep: impl Fn(char) -> bool) -> String {
    raw.chars()
        .filter(|&c| keep(c))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Iterative glob match with single-star backtracking.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
