//! Treasure types, magic item tables and the magic item catalog
//!
//! The catalog is prose: a `Name: first sentence` paragraph opens an item and
//! later paragraphs continue it. Only category blocks after the detail start
//! block are read, so the summary lists earlier in the Part are not captured.

use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::TreasureSections;
use crate::navigation::{elements_between_parts, segment_into_blocks, Block, ContentNode};
use crate::tables::{first_table_rows, table_to_rows, TablePayload};
use crate::text::{collapse_whitespace, join_paragraphs};
use crate::types::{MagicItem, MagicItemTable, MagicItemWarning, TableWarning, TreasureTypes};
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

static ITEM_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]{2,120}):\s*(.+)$").unwrap());

fn named<'b, 'n, 'a>(
    blocks: &'b [Block<'n, 'a>],
    names: &'b [String],
) -> impl Iterator<Item = &'b Block<'n, 'a>> {
    blocks
        .iter()
        .filter(move |block| names.iter().any(|name| name == block.heading))
}

/// First table of the first block with each treasure type name.
pub fn parse_treasure_types(blocks: &[Block<'_, '_>], names: &[String]) -> TreasureTypes {
    let mut out = TreasureTypes::new();
    for block in named(blocks, names) {
        if out.contains_key(block.heading) {
            continue;
        }
        let payload = TablePayload::from_rows(&first_table_rows(block.body));
        out.insert(block.heading.to_string(), payload);
    }
    out
}

/// Every non-empty table in the table sections.
pub fn parse_magic_item_tables(blocks: &[Block<'_, '_>], sections: &[String]) -> Vec<MagicItemTable> {
    named(blocks, sections)
        .flat_map(|block| {
            block.tables().filter_map(move |node| {
                let rows = table_to_rows(node.element);
                if rows.is_empty() {
                    return None;
                }
                let TablePayload { headers, rows } = TablePayload::from_rows(&rows);
                Some(MagicItemTable {
                    section: block.heading.to_string(),
                    warnings: TableWarning::check(&headers, &rows),
                    headers,
                    rows,
                })
            })
        })
        .collect()
}

fn finish_item(mut item: MagicItem, max_words: usize) -> MagicItem {
    item.description = join_paragraphs(&item.description_paragraphs);
    if item.name.split_whitespace().count() > max_words {
        item.warnings.push(MagicItemWarning::ProseLikeName);
    }
    item
}

/// Split one category block's paragraphs into items.
fn split_items(block: &Block<'_, '_>, max_words: usize, out: &mut Vec<MagicItem>) {
    let mut current: Option<MagicItem> = None;

    for text in block.paragraphs() {
        match ITEM_ENTRY.captures(text) {
            Some(caps) => {
                if let Some(done) = current.take() {
                    out.push(finish_item(done, max_words));
                }
                let first = collapse_whitespace(&caps[2]);
                current = Some(MagicItem {
                    name: collapse_whitespace(&caps[1]),
                    category: block.heading.to_string(),
                    description_paragraphs: if first.is_empty() { Vec::new() } else { vec![first] },
                    description: String::new(),
                    warnings: Vec::new(),
                });
            }
            None => {
                if let Some(item) = current.as_mut() {
                    item.description_paragraphs.push(text.to_string());
                }
            }
        }
    }

    if let Some(done) = current {
        out.push(finish_item(done, max_words));
    }
}

pub fn parse_magic_items(blocks: &[Block<'_, '_>], sections: &TreasureSections) -> Vec<MagicItem> {
    let mut items = Vec::new();
    let Some(start) = blocks
        .iter()
        .position(|block| block.heading == sections.detail_start)
    else {
        log::debug!("Magic item detail start '{}' not found", sections.detail_start);
        return items;
    };

    for block in named(&blocks[start + 1..], &sections.item_categories) {
        split_items(block, sections.prose_name_max_words, &mut items);
    }
    items
}

pub struct TreasureExtractor<'c> {
    sections: &'c TreasureSections,
}

impl<'c> TreasureExtractor<'c> {
    pub fn new(sections: &'c TreasureSections) -> Self {
        Self { sections }
    }
}

impl Extractor for TreasureExtractor<'_> {
    fn name(&self) -> &'static str {
        "treasure"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let sections = self.sections;
        let part = elements_between_parts(nodes, sections.part, Some(sections.end_part));
        let blocks = segment_into_blocks(part);

        let treasure_types = parse_treasure_types(&blocks, &sections.treasure_types);
        let tables = parse_magic_item_tables(&blocks, &sections.table_sections);
        let items = parse_magic_items(&blocks, sections);

        let mut out = RecordSets::new();
        out.insert(
            "treasure_types".into(),
            to_record_set("treasure_types", &treasure_types)?,
        );
        out.insert(
            "magic_item_tables".into(),
            to_record_set("magic_item_tables", &tables)?,
        );
        out.insert("magic_items".into(), to_record_set("magic_items", &items)?);
        Ok(out)
    }
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

    fn table(rows: &[&[&str]]) -> Element {
        rows.iter().fold(Element::new("table"), |table, row| {
            table.with_child(row.iter().fold(Element::new("tr"), |tr, cell| {
                tr.with_child(Element::new("td").with_text(cell))
            }))
        })
    }

    fn part7() -> Element {
        [
            heading("PART 7: TREASURE"),
            heading("Lair Treasures"),
            table(&[&["Type", "100's of CP"], &["A", "50%: 5d6"], &["", ""]]),
            heading("Lair Treasures"),
            table(&[&["Duplicate", "ignored"], &["x", "y"]]),
            heading("Potions"),
            table(&[&["d%", "Potion"], &["01-03", "Clairaudience"]]),
            table(&[&["Header only"]]),
            para("Clairaudience: summary list entry that must not be captured."),
            heading("Using Magic Items"),
            para("Using: general rules are not items either."),
            heading("Potions"),
            para("Clairaudience: This potion lets the user hear."),
            para("It lasts one turn."),
            para("Diminution: The drinker shrinks."),
            heading("Rare Items"),
            para("Some long name that reads like a sentence in the prose: and more"),
            heading("PART 8: THE ADVENTURE"),
            heading("Potions"),
            para("Healing: Outside the Part."),
        ]
        .into_iter()
        .fold(Element::new("body"), |body, child| body.with_child(child))
    }

    fn extract() -> RecordSets {
        let body = part7();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();
        let sections = TreasureSections::default();
        TreasureExtractor::new(&sections)
            .extract(&nodes, &RecordSets::new())
            .unwrap()
    }

    #[test]
    fn treasure_types_keep_first_occurrence() {
        let out = extract();
        let types = &out["treasure_types"];
        assert_eq!(types.as_object().unwrap().len(), 1);
        assert_eq!(types["Lair Treasures"]["headers"][1], "100's of CP");
        assert_eq!(types["Lair Treasures"]["rows"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn magic_item_tables_flag_missing_rows() {
        let out = extract();
        let tables = out["magic_item_tables"].as_array().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0]["section"], "Potions");
        assert_eq!(tables[0]["rows"][0][1], "Clairaudience");
        assert!(tables[0]["warnings"].as_array().unwrap().is_empty());
        assert_eq!(tables[1]["warnings"][0], "missing_rows");
    }

    #[test]
    fn items_only_after_detail_start_within_categories() {
        let out = extract();
        let items: Vec<MagicItem> = serde_json::from_value(out["magic_items"].clone()).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Clairaudience",
                "Diminution",
                "Some long name that reads like a sentence in the prose"
            ]
        );

        assert_eq!(items[0].category, "Potions");
        assert_eq!(
            items[0].description,
            "This potion lets the user hear.\n\nIt lasts one turn."
        );
        assert!(items[0].warnings.is_empty());
        assert_eq!(items[2].warnings, vec![MagicItemWarning::ProseLikeName]);
    }

    #[test]
    fn missing_detail_start_yields_no_items() {
        let sections = TreasureSections {
            detail_start: "Nowhere".to_string(),
            ..TreasureSections::default()
        };
        let body = part7();
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();
        let blocks = segment_into_blocks(elements_between_parts(&nodes, 7, Some(8)));
        assert!(parse_magic_items(&blocks, &sections).is_empty());
    }
}
