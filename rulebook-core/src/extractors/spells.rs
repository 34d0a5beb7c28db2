//! Spell lists and the alphabetical spell catalog
//!
//! Catalog entries start at a paragraph with a bold name and a `Range:`
//! label. The class/level and duration line follows within a few elements;
//! everything after it up to the next entry is description.

use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::{SpellSections, TaggedSection};
use crate::navigation::{elements_between, ContentNode};
use crate::tables::{table_to_rows, TablePayload};
use crate::text::{collapse_whitespace, join_paragraphs, slugify};
use crate::types::{Spell, SpellListEntry, SpellLists, SpellWarning};
use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static CLASS_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Cleric|Magic-User)\s*(\d+)").unwrap());
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)").unwrap());

const LEVEL_WORDS: &[(&str, u32)] = &[
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
];

const RANGE_LABEL: &str = "Range:";
const DURATION_LABEL: &str = "Duration:";

/// Level announced by a "First Level Cleric Spells" style paragraph.
pub fn parse_level_word(text: &str) -> Option<u32> {
    let lowered = collapse_whitespace(text).to_lowercase();
    LEVEL_WORDS
        .iter()
        .find(|(word, _)| {
            lowered
                .strip_prefix(word)
                .is_some_and(|rest| rest.starts_with(' '))
        })
        .map(|(_, level)| *level)
        .or_else(|| {
            LEADING_NUMBER
                .captures(&lowered)
                .and_then(|caps| caps[1].parse().ok())
        })
}

/// Level → names for one class list. A level paragraph arms the next table,
/// whose second column holds the names.
pub fn parse_spell_list_section(
    nodes: &[ContentNode<'_>],
    heading: &str,
) -> BTreeMap<u32, Vec<String>> {
    let mut out = BTreeMap::new();
    let mut current_level = None;

    for node in elements_between(nodes, heading, None) {
        if node.is_paragraph() {
            let text = node.text();
            if text.contains("Level") && text.contains("Spells") {
                current_level = parse_level_word(text);
            }
        } else if node.is_table() {
            let Some(level) = current_level.take() else {
                continue;
            };
            let names = table_to_rows(node.element)
                .into_iter()
                .filter_map(|row| row.get(1).map(|name| collapse_whitespace(name)))
                .filter(|name| !name.is_empty())
                .collect();
            out.insert(level, names);
        }
    }
    out
}

pub fn parse_spell_lists(nodes: &[ContentNode<'_>], lists: &[TaggedSection]) -> SpellLists {
    let mut spell_lists = SpellLists::default();

    for section in lists {
        let levels = parse_spell_list_section(nodes, &section.heading);
        for (level, names) in &levels {
            for name in names {
                spell_lists.all.push(SpellListEntry {
                    class: section.tag.clone(),
                    level: *level,
                    name: name.clone(),
                    reversible: name.ends_with('*'),
                    name_clean: name.trim_end_matches('*').to_string(),
                });
            }
        }

        let keyed: IndexMap<String, Vec<String>> = levels
            .into_iter()
            .map(|(level, names)| (level.to_string(), names))
            .collect();
        match section.tag.as_str() {
            "cleric" => spell_lists.cleric = keyed,
            "magic_user" => spell_lists.magic_user = keyed,
            other => log::warn!("Spell list class '{other}' has no slot in spell_lists"),
        }
    }
    spell_lists
}

/// Class levels and duration from the meta line. Class tokens are only read
/// before the `Duration:` label.
fn parse_meta_line(text: &str) -> (IndexMap<String, u32>, String) {
    let (class_part, duration) = match text.split_once(DURATION_LABEL) {
        Some((class_part, duration)) => (class_part, collapse_whitespace(duration)),
        None => (text, String::new()),
    };

    let class_levels: IndexMap<String, u32> = CLASS_LEVEL
        .captures_iter(class_part)
        .filter_map(|caps| Some((slugify(&caps[1]), caps[2].parse().ok()?)))
        .collect();
    (class_levels, duration)
}

fn is_entry_start(node: &ContentNode<'_>) -> bool {
    node.is_paragraph() && node.text().contains(RANGE_LABEL) && node.element.find_first("b").is_some()
}

/// Entries of the alphabetical catalog under `heading`.
pub fn parse_spells(nodes: &[ContentNode<'_>], heading: &str, meta_lookahead: usize) -> Vec<Spell> {
    let section = elements_between(nodes, heading, None);
    let starts: Vec<usize> = section
        .iter()
        .enumerate()
        .filter(|(_, node)| is_entry_start(node))
        .map(|(idx, _)| idx)
        .collect();

    let mut spells = Vec::with_capacity(starts.len());
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(section.len());
        let head = &section[start];
        let Some(bold) = head.element.find_first("b") else {
            continue;
        };

        let name = bold.joined_text();
        let mut warnings = Vec::new();

        let range = head
            .text()
            .split_once(RANGE_LABEL)
            .map(|(_, rest)| collapse_whitespace(rest))
            .unwrap_or_default();
        if range.is_empty() {
            warnings.push(SpellWarning::MissingRange);
        }

        let lookahead_end = end.min(start + 1 + meta_lookahead);
        let meta = (start + 1..lookahead_end).find(|&idx| {
            let node = &section[idx];
            node.is_paragraph() && node.text().contains(DURATION_LABEL)
        });
        let (class_levels, duration) = match meta {
            Some(idx) => parse_meta_line(section[idx].text()),
            None => {
                warnings.push(SpellWarning::MissingClassDurationLine);
                (IndexMap::new(), String::new())
            }
        };
        if class_levels.is_empty() {
            warnings.push(SpellWarning::MissingClassLevels);
        }
        if duration.is_empty() {
            warnings.push(SpellWarning::MissingDuration);
        }

        let description_start = meta.map_or(start + 1, |idx| idx + 1);
        let mut paragraphs = Vec::new();
        let mut embedded_tables = Vec::new();
        for node in &section[description_start..end] {
            if node.is_paragraph() && !node.text().is_empty() {
                paragraphs.push(node.text().to_string());
            } else if node.is_table() {
                let rows = table_to_rows(node.element);
                if !rows.is_empty() {
                    embedded_tables.push(TablePayload::from_rows(&rows));
                }
            }
        }

        spells.push(Spell {
            name_clean: name.trim_end_matches('*').to_string(),
            reversible: name.ends_with('*'),
            name,
            range,
            duration,
            class_levels,
            description: join_paragraphs(&paragraphs),
            description_paragraphs: paragraphs,
            embedded_tables,
            warnings,
        });
    }
    spells
}

pub struct SpellsExtractor<'c> {
    sections: &'c SpellSections,
}

impl<'c> SpellsExtractor<'c> {
    pub fn new(sections: &'c SpellSections) -> Self {
        Self { sections }
    }
}

impl Extractor for SpellsExtractor<'_> {
    fn name(&self) -> &'static str {
        "spells"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let spells = parse_spells(nodes, &self.sections.catalog, self.sections.meta_lookahead);
        let spell_lists = parse_spell_lists(nodes, &self.sections.class_lists);

        let mut out = RecordSets::new();
        out.insert("spells".into(), to_record_set("spells", &spells)?);
        out.insert("spell_lists".into(), to_record_set("spell_lists", &spell_lists)?);
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

    fn entry(name: &str, range: &str) -> Element {
        Element::new("p")
            .with_child(Element::new("b").with_text(name))
            .with_text(&format!("\tRange: {range}"))
    }

    fn list_table(names: &[&str]) -> Element {
        names.iter().enumerate().fold(Element::new("table"), |table, (i, name)| {
            table.with_child(
                Element::new("tr")
                    .with_child(Element::new("td").with_text(&(i + 1).to_string()))
                    .with_child(Element::new("td").with_text(name)),
            )
        })
    }

    #[test]
    fn level_words_and_numbers() {
        assert_eq!(parse_level_word("First Level Cleric Spells"), Some(1));
        assert_eq!(parse_level_word("  sixth  Level Magic-User Spells"), Some(6));
        assert_eq!(parse_level_word("3rd Level Spells"), Some(3));
        assert_eq!(parse_level_word("Firstly Level Spells"), None);
    }

    #[test]
    fn meta_line_reads_classes_before_duration() {
        let (levels, duration) = parse_meta_line("Cleric 1, Magic-User 2 Duration: 2 turns (Cleric 9)");
        assert_eq!(levels.get("cleric"), Some(&1));
        assert_eq!(levels.get("magic_user"), Some(&2));
        assert_eq!(levels.len(), 2);
        assert_eq!(duration, "2 turns (Cleric 9)");

        let (levels, duration) = parse_meta_line("Magic-User 3");
        assert_eq!(levels.get("magic_user"), Some(&3));
        assert_eq!(duration, "");
    }

    #[test]
    fn spell_lists_collect_per_level() {
        let body = Element::new("body")
            .with_child(heading("Cleric Spells"))
            .with_child(para("First Level Cleric Spells"))
            .with_child(list_table(&["Cure Light Wounds*", "Light*"]))
            .with_child(list_table(&["Ignored"]))
            .with_child(para("Second Level Cleric Spells"))
            .with_child(list_table(&["Bless*"]))
            .with_child(heading("Magic-User Spells"))
            .with_child(para("First Level Magic-User Spells"))
            .with_child(list_table(&["Sleep"]));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let lists = parse_spell_lists(&nodes, &SpellSections::default().class_lists);
        assert_eq!(lists.cleric["1"], vec!["Cure Light Wounds*", "Light*"]);
        assert_eq!(lists.cleric["2"], vec!["Bless*"]);
        assert_eq!(lists.magic_user["1"], vec!["Sleep"]);
        assert_eq!(lists.all.len(), 4);
        assert!(lists.all[0].reversible);
        assert_eq!(lists.all[0].name_clean, "Cure Light Wounds");
        assert_eq!(lists.all[3].class, "magic_user");
    }

    #[test]
    fn catalog_entries_split_at_range_sentinel() {
        let body = Element::new("body")
            .with_child(heading("All Spells, in Alphabetical Order"))
            .with_child(para("Spells are listed alphabetically."))
            .with_child(entry("Bless*", "50'"))
            .with_child(para("Cleric 2 Duration: 1 minute/level"))
            .with_child(para("This spell gives a bonus."))
            .with_child(Element::new("table").with_child(
                Element::new("tr")
                    .with_child(Element::new("td").with_text("Roll"))
                    .with_child(Element::new("td").with_text("Result")),
            ))
            .with_child(para("Reversed, it is Bane."))
            .with_child(entry("Sleep", ""))
            .with_child(para("Sleep puts creatures to sleep."))
            .with_child(heading("Monsters"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let spells = parse_spells(&nodes, "All Spells, in Alphabetical Order", 4);
        assert_eq!(spells.len(), 2);

        let bless = &spells[0];
        assert_eq!(bless.name, "Bless*");
        assert_eq!(bless.name_clean, "Bless");
        assert!(bless.reversible);
        assert_eq!(bless.range, "50'");
        assert_eq!(bless.duration, "1 minute/level");
        assert_eq!(bless.class_levels.get("cleric"), Some(&2));
        assert_eq!(bless.description_paragraphs.len(), 2);
        assert_eq!(bless.description, "This spell gives a bonus.\n\nReversed, it is Bane.");
        assert_eq!(bless.embedded_tables.len(), 1);
        assert!(bless.warnings.is_empty());

        let sleep = &spells[1];
        assert_eq!(
            sleep.warnings,
            vec![
                SpellWarning::MissingRange,
                SpellWarning::MissingClassDurationLine,
                SpellWarning::MissingClassLevels,
                SpellWarning::MissingDuration,
            ]
        );
        assert_eq!(sleep.description_paragraphs, vec!["Sleep puts creatures to sleep."]);
    }

    #[test]
    fn meta_line_beyond_lookahead_is_missed() {
        let mut body = Element::new("body")
            .with_child(heading("All Spells, in Alphabetical Order"))
            .with_child(entry("Light*", "120'"));
        for i in 0..4 {
            body = body.with_child(para(&format!("filler {i}")));
        }
        body = body.with_child(para("Cleric 1 Duration: 6 turns"));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let spells = parse_spells(&nodes, "All Spells, in Alphabetical Order", 4);
        assert_eq!(spells.len(), 1);
        assert!(spells[0]
            .warnings
            .contains(&SpellWarning::MissingClassDurationLine));
        assert_eq!(spells[0].description_paragraphs.len(), 5);
    }
}
