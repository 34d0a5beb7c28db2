//! Section/Part Locator
//!
//! Both lookups return `None` for "not present"; callers treat that as an
//! empty range.

use super::stream::ContentNode;
use regex::Regex;
use std::sync::LazyLock;

static TRAILING_PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+$").unwrap());

/// Lowercased, whitespace-collapsed form used for heading comparison.
pub(crate) fn normalize_heading(text: &str) -> String {
    crate::text::collapse_whitespace(text).to_lowercase()
}

/// `PART {n}:` prefix, uppercased.
pub(crate) fn part_prefix(part: u32) -> String {
    format!("PART {part}:")
}

pub(crate) fn starts_part(node: &ContentNode<'_>, prefix: &str) -> bool {
    node.is_part_title() && node.text().to_uppercase().starts_with(prefix)
}

/// Position of the heading whose normalized title equals `name`.
pub fn find_section(nodes: &[ContentNode<'_>], name: &str) -> Option<usize> {
    let target = normalize_heading(name);
    let found = nodes.iter().position(|node| {
        node.heading()
            .is_some_and(|heading| normalize_heading(heading) == target)
    });
    if found.is_none() {
        log::debug!("Section heading not found: {name}");
    }
    found
}

/// Position of the `PART {part}:` title.
///
/// Styled headings are preferred and accepted whatever their text ends in.
/// The unstyled fallback skips titles ending in a page number, which is how
/// table-of-contents entries repeat the part titles.
pub fn find_part(nodes: &[ContentNode<'_>], part: u32) -> Option<usize> {
    let prefix = part_prefix(part);
    let found = nodes
        .iter()
        .position(|node| node.is_heading() && starts_part(node, &prefix))
        .or_else(|| {
            nodes.iter().position(|node| {
                starts_part(node, &prefix) && !TRAILING_PAGE_NUMBER.is_match(node.text().trim())
            })
        });
    if found.is_none() {
        log::debug!("Part title not found: {prefix}");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::navigation::{flatten, FontFaceHeadingDetector};

    fn heading(text: &str) -> Element {
        Element::new("p").with_child(
            Element::new("font")
                .with_attr("face", "SoutaneBlack")
                .with_text(text),
        )
    }

    fn para(text: &str) -> Element {
        Element::new("p").with_text(text)
    }

    #[test]
    fn section_lookup_ignores_case_and_spacing() {
        let body = Element::new("body")
            .with_child(para("Cleric Spells"))
            .with_child(heading("  Cleric   Spells "));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        assert_eq!(find_section(&nodes, "cleric spells"), Some(1));
        assert_eq!(find_section(&nodes, "cleric"), None);
    }

    #[test]
    fn unstyled_part_lookup_rejects_contents_entries() {
        let body = Element::new("body")
            .with_child(para("PART 2: EQUIPMENT ..... 14"))
            .with_child(para("PART 2: EQUIPMENT"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        assert_eq!(find_part(&nodes, 2), Some(1));
        assert_eq!(find_part(&nodes, 3), None);
    }

    #[test]
    fn styled_part_title_may_end_in_digits() {
        let body = Element::new("body")
            .with_child(para("PART 9: APPENDIX ..... 180"))
            .with_child(heading("PART 9: APPENDIX 2"))
            .with_child(para("PART 9: APPENDIX"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        assert_eq!(find_part(&nodes, 9), Some(1));
    }

    #[test]
    fn styled_part_title_wins_over_unstyled() {
        let body = Element::new("body")
            .with_child(para("Part 6: Monsters"))
            .with_child(heading("PART 6: MONSTERS"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        assert_eq!(find_part(&nodes, 6), Some(1));
    }

    #[test]
    fn part_number_prefix_is_exact() {
        let body = Element::new("body").with_child(para("PART 10: APPENDIX"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        assert_eq!(find_part(&nodes, 1), None);
        assert_eq!(find_part(&nodes, 10), Some(0));
    }
}
