//! Rules reference tables: equipment, vehicles, class progression, saving
//! throws, thief abilities, attack bonus and turning undead.

use super::attack_bonus::{parse_attack_bonus, ATTACK_BONUS};
use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::RulesSections;
use crate::navigation::{elements_between, ContentNode};
use crate::tables::{
    all_table_rows, first_table_rows, rows_to_records, rows_to_records_merged_header,
    table_to_rows, Record,
};
use crate::text::slugify;
use crate::types::{TurningUndead, UndeadColumn};
use anyhow::Result;
use indexmap::IndexMap;

pub const SAVING_THROWS: &str = "saving_throws";

pub fn parse_first_table(nodes: &[ContentNode<'_>], heading: &str) -> Vec<Record> {
    rows_to_records(&first_table_rows(elements_between(nodes, heading, None)))
}

/// Records of every table under `heading`, concatenated.
pub fn parse_all_tables(nodes: &[ContentNode<'_>], heading: &str) -> Vec<Record> {
    all_table_rows(elements_between(nodes, heading, None))
        .iter()
        .flat_map(|rows| rows_to_records(rows))
        .collect()
}

/// First table of each vehicle heading, rows tagged with the section's category.
pub fn parse_vehicles(nodes: &[ContentNode<'_>], sections: &RulesSections) -> Vec<Record> {
    sections
        .vehicles
        .iter()
        .flat_map(|section| {
            parse_first_table(nodes, &section.heading)
                .into_iter()
                .map(move |mut record| {
                    record.insert("category".to_string(), section.tag.clone());
                    record
                })
        })
        .collect()
}

/// Class progression tables keyed by class slug. Their headers often span
/// two rows.
pub fn parse_class_tables(
    nodes: &[ContentNode<'_>],
    classes: &[String],
) -> IndexMap<String, Vec<Record>> {
    let mut out = IndexMap::new();
    for class in classes {
        let rows = first_table_rows(elements_between(nodes, class, None));
        if rows.is_empty() {
            continue;
        }
        out.insert(slugify(class), rows_to_records_merged_header(&rows));
    }
    out
}

/// A paragraph that is exactly a class name arms the next table.
pub fn parse_saving_throws(
    nodes: &[ContentNode<'_>],
    heading: &str,
    classes: &[String],
) -> IndexMap<String, Vec<Record>> {
    let mut out = IndexMap::new();
    let mut armed: Option<String> = None;

    for node in elements_between(nodes, heading, None) {
        if node.is_paragraph() {
            if classes.iter().any(|class| class == node.text()) {
                armed = Some(slugify(node.text()));
            }
        } else if node.is_table() {
            if let Some(class) = armed.take() {
                out.insert(class, rows_to_records(&table_to_rows(node.element)));
            }
        }
    }
    out
}

/// The turning undead table may sit anywhere, including inside another
/// table's cell, so every table element in the document is considered.
pub fn parse_turning_undead(
    nodes: &[ContentNode<'_>],
    first_header: &str,
    marker: &str,
) -> TurningUndead {
    let mut tables = Vec::new();
    for node in nodes {
        node.element.descendants_named("table", &mut tables);
    }

    for table in tables {
        let rows = table_to_rows(table);
        let Some(header) = rows.first() else {
            continue;
        };
        if header.first().map(String::as_str) != Some(first_header)
            || !header.iter().any(|cell| cell == marker)
        {
            continue;
        }

        let hit_dice_row = rows.get(1).map(Vec::as_slice).unwrap_or_default();
        let undead_columns = header
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, name)| UndeadColumn {
                name: name.clone(),
                hit_dice: hit_dice_row.get(idx - 1).cloned().unwrap_or_default(),
            })
            .collect();

        let level_key = slugify(first_header);
        let records = rows
            .iter()
            .skip(2)
            .filter(|row| row.first().is_some_and(|cell| !cell.trim().is_empty()))
            .map(|row| {
                let mut record = Record::new();
                record.insert(level_key.clone(), row[0].clone());
                for (idx, undead) in header.iter().enumerate().skip(1) {
                    record.insert(slugify(undead), row.get(idx).cloned().unwrap_or_default());
                }
                record
            })
            .collect();

        return TurningUndead {
            undead_columns,
            rows: records,
        };
    }
    TurningUndead::default()
}

pub struct RulesTablesExtractor<'c> {
    sections: &'c RulesSections,
}

impl<'c> RulesTablesExtractor<'c> {
    pub fn new(sections: &'c RulesSections) -> Self {
        Self { sections }
    }
}

impl Extractor for RulesTablesExtractor<'_> {
    fn name(&self) -> &'static str {
        "rules_tables"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let s = self.sections;
        let mut out = RecordSets::new();

        let weapons = parse_first_table(nodes, &s.weapons);
        out.insert("weapons".into(), to_record_set("weapons", &weapons)?);
        let armor = parse_first_table(nodes, &s.armor);
        out.insert("armor".into(), to_record_set("armor", &armor)?);
        let equipment = parse_all_tables(nodes, &s.equipment);
        out.insert("equipment".into(), to_record_set("equipment", &equipment)?);
        let vehicles = parse_vehicles(nodes, s);
        out.insert("vehicles".into(), to_record_set("vehicles", &vehicles)?);

        let class_tables = parse_class_tables(nodes, &s.class_tables);
        out.insert("class_tables".into(), to_record_set("class_tables", &class_tables)?);
        let saving_throws = parse_saving_throws(nodes, &s.saving_throws, &s.saving_throw_classes);
        out.insert(SAVING_THROWS.into(), to_record_set(SAVING_THROWS, &saving_throws)?);
        let thief_abilities = parse_first_table(nodes, &s.thief_abilities);
        out.insert(
            "thief_abilities".into(),
            to_record_set("thief_abilities", &thief_abilities)?,
        );

        let attack_bonus = parse_attack_bonus(
            nodes,
            &s.attack_bonus,
            &s.attack_bonus_terminator,
            &s.attack_bonus_sentinel,
        );
        out.insert(ATTACK_BONUS.into(), to_record_set(ATTACK_BONUS, &attack_bonus)?);

        let turning_undead = parse_turning_undead(
            nodes,
            &s.turning_undead_first_header,
            &s.turning_undead_marker,
        );
        out.insert(
            "turning_undead".into(),
            to_record_set("turning_undead", &turning_undead)?,
        );
        Ok(out)
    }
}
