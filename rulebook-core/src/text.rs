//! Small text helpers shared by the navigation, table and extractor layers.

use regex::Regex;
use std::sync::LazyLock;

static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Collapse every run of whitespace (including newlines and no-break
/// spaces) into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, collapse non-alphanumeric runs to `_`, trim separators.
///
/// `"Exp. Points"` becomes `"exp_points"`, `"Magic-User"` becomes `"magic_user"`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_ALNUM_RUN
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Join paragraphs the way every extractor renders `description`.
pub fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  Cleric \t\n  Spells\u{a0} "), "Cleric Spells");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn slugifies_headers() {
        assert_eq!(slugify("Exp. Points"), "exp_points");
        assert_eq!(slugify("Magic-User"), "magic_user");
        assert_eq!(slugify("  No. of Attacks "), "no_of_attacks");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("Dmg."), "dmg");
    }
}
