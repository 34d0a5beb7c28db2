//! Block Segmenter
//!
//! Ranges are returned as sub-slices of the flattened stream, so segmenting
//! never copies nodes and blocks are contiguous by construction.

use super::locator::{find_part, find_section, normalize_heading, part_prefix, starts_part};
use super::stream::ContentNode;
use indexmap::IndexMap;

/// A heading and the nodes that belong to it. The heading node itself is not
/// part of `body`.
#[derive(Debug, Clone, Copy)]
pub struct Block<'n, 'a> {
    pub heading: &'n str,
    pub body: &'n [ContentNode<'a>],
}

impl<'n, 'a> Block<'n, 'a> {
    pub fn tables(&self) -> impl Iterator<Item = &'n ContentNode<'a>> {
        self.body.iter().filter(|node| node.is_table())
    }

    pub fn first_table(&self) -> Option<&'n ContentNode<'a>> {
        self.body.iter().find(|node| node.is_table())
    }

    /// Non-empty paragraph texts in order.
    pub fn paragraphs(&self) -> Vec<&'n str> {
        self.body
            .iter()
            .filter(|node| node.is_paragraph() && !node.text().is_empty())
            .map(|node| node.text())
            .collect()
    }
}

/// Nodes after the `start` heading, up to the `stop` heading when given or
/// the next heading of any kind otherwise.
pub fn elements_between<'n, 'a>(
    nodes: &'n [ContentNode<'a>],
    start: &str,
    stop: Option<&str>,
) -> &'n [ContentNode<'a>] {
    let Some(start_idx) = find_section(nodes, start) else {
        return &[];
    };
    let rest = &nodes[start_idx + 1..];
    let stop = stop.map(normalize_heading);

    let end = rest
        .iter()
        .position(|node| match (node.heading(), stop.as_deref()) {
            (Some(heading), Some(stop)) => normalize_heading(heading) == stop,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Nodes after the `PART {start}:` title, up to the `PART {end}:` title when
/// given or the end of the stream otherwise.
pub fn elements_between_parts<'n, 'a>(
    nodes: &'n [ContentNode<'a>],
    start: u32,
    end: Option<u32>,
) -> &'n [ContentNode<'a>] {
    let Some(start_idx) = find_part(nodes, start) else {
        return &[];
    };
    let rest = &nodes[start_idx + 1..];
    let Some(end) = end else {
        return rest;
    };

    let prefix = part_prefix(end);
    let stop = rest
        .iter()
        .position(|node| starts_part(node, &prefix))
        .unwrap_or(rest.len());
    &rest[..stop]
}

/// Cut `range` at every heading. Nodes before the first heading are dropped.
pub fn segment_into_blocks<'n, 'a>(range: &'n [ContentNode<'a>]) -> Vec<Block<'n, 'a>> {
    let mut blocks = Vec::new();
    let mut current: Option<(&'n str, usize)> = None;

    for (idx, node) in range.iter().enumerate() {
        let Some(heading) = node.heading() else {
            continue;
        };
        if let Some((prev, body_start)) = current {
            blocks.push(Block {
                heading: prev,
                body: &range[body_start..idx],
            });
        }
        current = Some((heading, idx + 1));
    }

    if let Some((heading, body_start)) = current {
        blocks.push(Block {
            heading,
            body: &range[body_start..],
        });
    }
    blocks
}

/// Heading title → body, over the whole range. A repeated title keeps its
/// first position and the body of its last occurrence.
pub fn collect_sections<'n, 'a>(
    range: &'n [ContentNode<'a>],
) -> IndexMap<&'n str, &'n [ContentNode<'a>]> {
    segment_into_blocks(range)
        .into_iter()
        .map(|block| (block.heading, block.body))
        .collect()
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

    fn rulebook() -> Element {
        Element::new("body")
            .with_child(para("PART 1: INTRODUCTION ..... 1"))
            .with_child(para("PART 2: CHARACTERS ..... 3"))
            .with_child(heading("PART 1: INTRODUCTION"))
            .with_child(para("intro text"))
            .with_child(heading("PART 2: CHARACTERS"))
            .with_child(para("loose text"))
            .with_child(heading("Dwarves"))
            .with_child(para("Dwarves are short."))
            .with_child(Element::new("table"))
            .with_child(heading("Elves"))
            .with_child(para("Elves are tall."))
            .with_child(heading("Humans"))
            .with_child(para("PART 3: EQUIPMENT"))
            .with_child(heading("Weapons"))
    }

    #[test]
    fn elements_between_stops_at_next_heading() {
        let body = rulebook();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let dwarves = elements_between(&nodes, "Dwarves", None);
        assert_eq!(dwarves.len(), 2);
        assert!(dwarves[1].is_table());

        let to_humans = elements_between(&nodes, "dwarves", Some("HUMANS"));
        assert_eq!(to_humans.len(), 4);
        assert!(to_humans.iter().all(|n| n.heading() != Some("Humans")));

        assert!(elements_between(&nodes, "Gnomes", None).is_empty());
    }

    #[test]
    fn parts_bound_by_unstyled_titles() {
        let body = rulebook();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let part2 = elements_between_parts(&nodes, 2, Some(3));
        assert_eq!(part2.first().map(|n| n.text()), Some("loose text"));
        assert_eq!(part2.last().map(|n| n.heading()), Some(Some("Humans")));

        let to_end = elements_between_parts(&nodes, 2, None);
        assert_eq!(to_end.last().map(|n| n.heading()), Some(Some("Weapons")));

        assert!(elements_between_parts(&nodes, 9, None).is_empty());
    }

    #[test]
    fn blocks_are_contiguous_and_skip_headless_prefix() {
        let body = rulebook();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();
        let part2 = elements_between_parts(&nodes, 2, Some(3));

        let blocks = segment_into_blocks(part2);
        let headings: Vec<&str> = blocks.iter().map(|b| b.heading).collect();
        assert_eq!(headings, vec!["Dwarves", "Elves", "Humans"]);
        assert_eq!(blocks[0].body.len(), 2);
        assert_eq!(blocks[0].paragraphs(), vec!["Dwarves are short."]);
        assert!(blocks[0].first_table().is_some());
        assert!(blocks[2].body.is_empty());

        let total: usize = blocks.iter().map(|b| b.body.len() + 1).sum();
        assert_eq!(total, part2.len() - 1);
    }

    #[test]
    fn collect_sections_keys_by_heading() {
        let body = rulebook();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let sections = collect_sections(&nodes);
        assert_eq!(sections.get("Elves").map(|b| b.len()), Some(1));
        assert_eq!(sections.get_index(0).map(|(k, _)| *k), Some("PART 1: INTRODUCTION"));
    }
}
