//! Monster stat blocks and descriptions
//!
//! Each block of the monster Part is one candidate. Its stat block is the
//! first table with an `Armor Class:` label row; label rows become fields.
//! A candidate without a stat block is kept only when it has prose, and a
//! `See X` sentence in that prose marks it as a cross-reference stub.

use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::MonsterSections;
use crate::navigation::{elements_between_parts, segment_into_blocks, Block, ContentNode};
use crate::tables::{table_to_rows, Record, Row, TablePayload};
use crate::text::{collapse_whitespace, join_paragraphs, slugify};
use crate::types::{Monster, MonsterWarning};
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

pub const CORE_FIELDS: &[&str] = &[
    "armor_class",
    "hit_dice",
    "no_of_attacks",
    "damage",
    "movement",
    "no_appearing",
    "save_as",
    "morale",
    "treasure_type",
    "xp",
];

const STAT_SENTINEL: &str = "Armor Class:";
const AGE_TABLE_MARKER: &str = "Age Table";

static SEE_REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSee\s+(.+?)(?:\.|$)").unwrap());

fn is_stat_table(rows: &[Row]) -> bool {
    rows.iter()
        .any(|row| row.first().is_some_and(|cell| cell.contains(STAT_SENTINEL)))
}

fn is_age_table(rows: &[Row]) -> bool {
    rows.first()
        .and_then(|row| row.first())
        .is_some_and(|cell| cell.contains(AGE_TABLE_MARKER))
}

/// `Label:` rows to `label -> value`, multi-column values joined with ` | `.
pub fn parse_stat_rows(rows: &[Row]) -> Record {
    let mut stats = Record::new();
    for row in rows {
        let Some((label, values)) = row.split_first() else {
            continue;
        };
        let label = collapse_whitespace(label);
        let Some(label) = label.strip_suffix(':') else {
            continue;
        };
        stats.insert(slugify(label), collapse_whitespace(&values.join(" | ")));
    }
    stats
}

/// Core fields absent or empty in `stats`, sorted.
pub fn missing_core_fields(stats: &Record) -> Vec<String> {
    let mut missing: Vec<String> = CORE_FIELDS
        .iter()
        .filter(|field| stats.get(**field).is_none_or(|value| value.is_empty()))
        .map(|field| field.to_string())
        .collect();
    missing.sort();
    missing
}

/// Target of the first `See X` redirect in `prose`.
pub fn find_cross_reference(prose: &str) -> Option<String> {
    SEE_REDIRECT
        .captures(prose)
        .map(|caps| collapse_whitespace(&caps[1]))
}

/// Build a monster from one block, or `None` when there is nothing to keep.
pub fn parse_monster(block: &Block<'_, '_>) -> Option<Monster> {
    let mut stat_table: Option<(usize, Vec<Row>)> = None;
    let mut age_tables = Vec::new();

    for (idx, node) in block.body.iter().enumerate() {
        if !node.is_table() {
            continue;
        }
        let rows = table_to_rows(node.element);
        if rows.is_empty() {
            continue;
        }
        if stat_table.is_none() && is_stat_table(&rows) {
            stat_table = Some((idx, rows));
        } else if is_age_table(&rows) {
            age_tables.push(TablePayload::from_rows(&rows));
        }
    }

    let name = block.heading.to_string();
    let Some((stat_idx, stat_rows)) = stat_table else {
        let paragraphs: Vec<String> = block.paragraphs().into_iter().map(str::to_string).collect();
        if paragraphs.is_empty() {
            return None;
        }
        let mut warnings = vec![MonsterWarning::MissingStatBlock];
        let cross_reference = find_cross_reference(&paragraphs.join(" "));
        if cross_reference.is_some() {
            warnings.push(MonsterWarning::CrossReferenceOnly);
        }
        return Some(Monster {
            name,
            stat_block: Record::new(),
            description: join_paragraphs(&paragraphs),
            description_paragraphs: paragraphs,
            dragon_age_tables: Vec::new(),
            cross_reference,
            warnings,
        });
    };

    let stat_block = parse_stat_rows(&stat_rows);
    let mut warnings = Vec::new();
    let missing = missing_core_fields(&stat_block);
    if !missing.is_empty() {
        warnings.push(MonsterWarning::MissingCoreFields(missing));
    }

    let paragraphs: Vec<String> = block.body[stat_idx + 1..]
        .iter()
        .filter(|node| node.is_paragraph() && !node.text().is_empty())
        .map(|node| node.text().to_string())
        .collect();

    Some(Monster {
        name,
        stat_block,
        description: join_paragraphs(&paragraphs),
        description_paragraphs: paragraphs,
        dragon_age_tables: age_tables,
        cross_reference: None,
        warnings,
    })
}

pub fn parse_monsters(nodes: &[ContentNode<'_>], sections: &MonsterSections) -> Vec<Monster> {
    let part = elements_between_parts(nodes, sections.part, Some(sections.end_part));
    segment_into_blocks(part)
        .iter()
        .filter(|block| !sections.skip_blocks.iter().any(|skip| skip == block.heading))
        .filter_map(parse_monster)
        .collect()
}

pub struct MonstersExtractor<'c> {
    sections: &'c MonsterSections,
}

impl<'c> MonstersExtractor<'c> {
    pub fn new(sections: &'c MonsterSections) -> Self {
        Self { sections }
    }
}

impl Extractor for MonstersExtractor<'_> {
    fn name(&self) -> &'static str {
        "monsters"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let monsters = parse_monsters(nodes, self.sections);
        let with_warnings = monsters.iter().filter(|m| !m.warnings.is_empty()).count();
        log::debug!("{} monsters, {} with warnings", monsters.len(), with_warnings);

        let mut out = RecordSets::new();
        out.insert("monsters".into(), to_record_set("monsters", &monsters)?);
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

    fn full_stat_table() -> Element {
        table(&[
            &["Armor Class:", "14 (11)"],
            &["Hit Dice:", "1"],
            &["No. of Attacks:", "1 weapon"],
            &["Damage:", "1d8 or by weapon"],
            &["Movement:", "40'"],
            &["No. Appearing:", "2d4, Wild 1d10"],
            &["Save As:", "Fighter: 1"],
            &["Morale:", "8"],
            &["Treasure Type:", "Q, R each; D in lair"],
            &["XP:", "25"],
        ])
    }

    fn part6(blocks: Vec<Element>) -> Vec<Element> {
        let mut out = vec![heading("PART 6: MONSTERS"), para("Intro to monsters.")];
        out.extend(blocks);
        out.push(heading("PART 7: TREASURE"));
        out
    }

    fn parse(children: Vec<Element>) -> Vec<Monster> {
        let body = children
            .into_iter()
            .fold(Element::new("body"), |body, child| body.with_child(child));
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();
        parse_monsters(&nodes, &MonsterSections::default())
    }

    #[test]
    fn stat_rows_join_multi_column_values() {
        let rows = vec![
            vec!["Armor Class:".to_string(), "13".to_string(), "15".to_string()],
            vec!["Notes".to_string(), "ignored".to_string()],
            vec!["Hit  Dice :".to_string()],
        ];
        let stats = parse_stat_rows(&rows);
        assert_eq!(stats["armor_class"], "13 | 15");
        assert_eq!(stats["hit_dice"], "");
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn complete_stat_block_has_no_warnings() {
        let monsters = parse(part6(vec![
            heading("Orc"),
            full_stat_table(),
            para("Orcs are a race of warlike humanoids."),
            para("They hate daylight."),
        ]));
        assert_eq!(monsters.len(), 1);
        let orc = &monsters[0];
        assert_eq!(orc.name, "Orc");
        assert_eq!(orc.stat_block["no_appearing"], "2d4, Wild 1d10");
        assert!(orc.warnings.is_empty());
        assert_eq!(orc.description_paragraphs.len(), 2);
        assert_eq!(orc.cross_reference, None);
    }

    #[test]
    fn missing_core_fields_are_sorted() {
        let monsters = parse(part6(vec![
            heading("Blink Dog"),
            table(&[&["Armor Class:", "15"], &["Hit Dice:", "4"], &["Morale:", ""]]),
        ]));
        assert_eq!(
            monsters[0].warnings[0].to_string(),
            "missing_core_fields:damage,morale,movement,no_appearing,no_of_attacks,save_as,treasure_type,xp"
        );
    }

    #[test]
    fn cross_reference_stub_and_empty_blocks() {
        let monsters = parse(part6(vec![
            heading("Monster Descriptions"),
            para("How to read the entries."),
            heading("Bat, Giant"),
            para("See Bat."),
            heading("Empty Block"),
            heading("Dragon, Red"),
            full_stat_table(),
            table(&[&["Red Dragon Age Table", "1", "2"], &["Hit Dice", "9", "10"]]),
            para("Red dragons breathe fire."),
        ]));
        let names: Vec<&str> = monsters.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Bat, Giant", "Dragon, Red"]);

        let bat = &monsters[0];
        assert_eq!(bat.cross_reference.as_deref(), Some("Bat"));
        assert_eq!(
            bat.warnings,
            vec![MonsterWarning::MissingStatBlock, MonsterWarning::CrossReferenceOnly]
        );
        assert!(bat.stat_block.is_empty());

        let dragon = &monsters[1];
        assert_eq!(dragon.dragon_age_tables.len(), 1);
        assert_eq!(dragon.dragon_age_tables[0].rows.len(), 1);
        assert_eq!(dragon.description, "Red dragons breathe fire.");
    }

    #[test]
    fn prose_without_redirect_is_flagged_only_missing() {
        let monsters = parse(part6(vec![heading("Lycanthrope"), para("Lycanthropes are humans.")]));
        assert_eq!(monsters[0].warnings, vec![MonsterWarning::MissingStatBlock]);
        assert_eq!(monsters[0].cross_reference, None);
    }
}
