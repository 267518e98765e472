//! Wildcard matching of signatures against catalog entries
//!
//! Catalog entries are patterns in which `#` stands for any run of zero or
//! more characters; every other character matches itself. Matching is
//! anchored at both ends.
//!
//! The match is decided with a table over (candidate index, pattern index)
//! filled from the back, so wildcard-dense patterns cost O(n * m) instead of
//! the exponential blow-up of plain backtracking.

/// The wildcard token
pub const WILDCARD: char = '#';

/// A catalog entry prepared for repeated matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    chars: Vec<char>,
    has_wildcard: bool,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let has_wildcard = chars.contains(&WILDCARD);
        Self {
            chars,
            has_wildcard,
        }
    }

    /// True if the pattern contains no `#` and can only match itself
    pub fn is_literal(&self) -> bool {
        !self.has_wildcard
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if !self.has_wildcard {
            return candidate.chars().eq(self.chars.iter().copied());
        }
        let candidate: Vec<char> = candidate.chars().collect();
        match_table(&candidate, &self.chars)
    }
}

/// `table[i][j]` answers "does `candidate[i..]` match `pattern[j..]`"
fn match_table(candidate: &[char], pattern: &[char]) -> bool {
    let n = candidate.len();
    let m = pattern.len();
    let width = m + 1;
    let mut table = vec![false; (n + 1) * width];
    let at = |i: usize, j: usize| i * width + j;

    // Empty pattern matches only the empty candidate
    table[at(n, m)] = true;

    for i in (0..=n).rev() {
        for j in (0..m).rev() {
            table[at(i, j)] = if pattern[j] == WILDCARD {
                // Consume nothing, or consume one char and keep the wildcard
                table[at(i, j + 1)] || (i < n && table[at(i + 1, j)])
            } else {
                i < n && candidate[i] == pattern[j] && table[at(i + 1, j + 1)]
            };
        }
    }

    table[at(0, 0)]
}

/// Does `candidate` match `pattern`, with `#` as a wildcard in `pattern`
///
/// ```
/// use sigtriage::pattern::matches;
///
/// assert!(matches("axyzc", "a#c"));
/// assert!(!matches("ab", "a#c"));
/// ```
pub fn matches(candidate: &str, pattern: &str) -> bool {
    WildcardPattern::new(pattern).matches(candidate)
}

/// True iff `signature` matches at least one of the catalog entries
pub fn is_known<I, S>(signature: &str, catalog_entries: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    catalog_entries
        .into_iter()
        .any(|entry| matches(signature, entry.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_cases() {
        assert!(matches("ac", "a#c"));
        assert!(matches("axyzc", "a#c"));
        assert!(!matches("ab", "a#c"));
        assert!(matches("", "#"));
        assert!(!matches("x", ""));
    }

    #[test]
    fn test_empty_pattern_matches_only_empty() {
        assert!(matches("", ""));
        assert!(!matches(" ", ""));
    }

    #[test]
    fn test_literal_is_anchored() {
        assert!(matches("Error: undeclared identifier", "Error: undeclared identifier"));
        assert!(!matches("Error: undeclared identifier at foo", "Error: undeclared identifier"));
        assert!(!matches("Error: undeclared", "Error: undeclared identifier"));
    }

    #[test]
    fn test_trailing_and_leading_wildcards() {
        assert!(matches("Error: undeclared identifier at foo", "Error: undeclared identifier#"));
        assert!(matches("TypeError: bad", "#Error: bad"));
        assert!(matches("anything at all", "#"));
        assert!(matches("", "###"));
    }

    #[test]
    fn test_wildcard_does_not_skip_literal_chars() {
        assert!(!matches("abd", "a#c#"));
        assert!(matches("abcd", "a#c#"));
        assert!(!matches("a", "a#a"));
        assert!(matches("aa", "a#a"));
    }

    #[test]
    fn test_unicode_characters_are_single_units() {
        assert!(matches("é", "#"));
        assert!(matches("aéc", "a#c"));
        assert!(!matches("aéc", "a#d"));
    }

    #[test]
    fn test_adversarial_pattern_is_fast() {
        let candidate = "a".repeat(2_000);
        let pattern = format!("{}b", "#a".repeat(40));
        let started = std::time::Instant::now();
        assert!(!matches(&candidate, &pattern));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_is_known() {
        let catalog = ["segfault", "Error: stack too deep#"];
        assert!(is_known("segfault", catalog));
        assert!(is_known("Error: stack too deep when compiling inline assembly", catalog));
        assert!(!is_known("Error: undeclared identifier", catalog));
        assert!(!is_known("segfault", Vec::<String>::new()));
    }

    #[test]
    fn test_prepared_pattern_literal_flag() {
        assert!(WildcardPattern::new("Error: x").is_literal());
        assert!(!WildcardPattern::new("Error: #").is_literal());
    }
}
