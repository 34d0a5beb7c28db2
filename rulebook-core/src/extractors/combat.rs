//! Combat reference tables
//!
//! Tables are taken from named blocks in their Parts. The attack bonus and
//! saving throw tables are re-assembled from the rules table record sets when
//! those are available, either from this run or from storage.

use super::attack_bonus::ATTACK_BONUS;
use super::engine::{to_record_set, Extractor, RecordSets};
use super::rules_tables::SAVING_THROWS;
use crate::config::{CombatSections, PartTables};
use crate::navigation::{collect_sections, elements_between_parts, ContentNode};
use crate::tables::{table_to_rows, Row, TablePayload};
use crate::types::{CombatTable, TableWarning};
use anyhow::Result;
use serde_json::{Map, Value};

const ATTACK_BONUS_TABLE: &str = "Attack Bonus Table";

/// Tables of the named blocks in one Part range, in the order the names are
/// configured. A block title repeated inside the Part reads its last body.
pub fn parse_part_tables(nodes: &[ContentNode<'_>], source: &PartTables) -> Vec<CombatTable> {
    let part = elements_between_parts(nodes, source.part, Some(source.end_part));
    let blocks = collect_sections(part);
    let mut out = Vec::new();
    for name in &source.sections {
        let Some(body) = blocks.get(name.as_str()) else {
            continue;
        };
        for node in body.iter().filter(|node| node.is_table()) {
            let rows = table_to_rows(node.element);
            if rows.is_empty() {
                continue;
            }
            let TablePayload { headers, rows } = TablePayload::from_rows(&rows);
            let rows: Vec<Vec<Value>> = rows
                .into_iter()
                .map(|row| row.into_iter().map(Value::String).collect())
                .collect();
            out.push(CombatTable {
                table_name: name.clone(),
                source_section: name.clone(),
                source_part: source.part,
                warnings: TableWarning::check(&headers, &rows),
                headers,
                rows,
            });
        }
    }
    out
}

/// Cells keep their stored shape; only absent and null values become `""`.
fn cell_value(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(other) => other.clone(),
    }
}

/// Records as a positional table, headers from the first record's keys.
/// `None` when there are no object records.
pub fn records_to_table(records: &[Value]) -> Option<(Row, Vec<Vec<Value>>)> {
    let first: &Map<String, Value> = records.first()?.as_object()?;
    let headers: Row = first.keys().cloned().collect();
    let rows = records
        .iter()
        .filter_map(Value::as_object)
        .map(|record| {
            headers
                .iter()
                .map(|header| cell_value(record.get(header)))
                .collect()
        })
        .collect();
    Some((headers, rows))
}

/// Derived tables from the attack bonus and per-class saving throw records.
pub fn derived_tables(upstream: &RecordSets, sections: &CombatSections) -> Vec<CombatTable> {
    let mut out = Vec::new();
    let derived = |table_name: String,
                   source_section: &str,
                   (headers, rows): (Row, Vec<Vec<Value>>)| {
        CombatTable {
            table_name,
            source_section: source_section.to_string(),
            source_part: sections.derived_source_part,
            warnings: TableWarning::check(&headers, &rows),
            headers,
            rows,
        }
    };

    if let Some(table) = upstream
        .get(ATTACK_BONUS)
        .and_then(Value::as_array)
        .and_then(|records| records_to_table(records))
    {
        out.push(derived(
            ATTACK_BONUS_TABLE.to_string(),
            &sections.attack_bonus_source_section,
            table,
        ));
    }

    if let Some(classes) = upstream.get(SAVING_THROWS).and_then(Value::as_object) {
        for (class, records) in classes {
            let Some(table) = records.as_array().and_then(|records| records_to_table(records))
            else {
                continue;
            };
            out.push(derived(
                format!("Saving Throws ({class})"),
                &sections.saving_throw_source_section,
                table,
            ));
        }
    }
    out
}

pub struct CombatTablesExtractor<'c> {
    sections: &'c CombatSections,
}

impl<'c> CombatTablesExtractor<'c> {
    pub fn new(sections: &'c CombatSections) -> Self {
        Self { sections }
    }
}

impl Extractor for CombatTablesExtractor<'_> {
    fn name(&self) -> &'static str {
        "combat_tables"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[ATTACK_BONUS, SAVING_THROWS]
    }

    fn extract(&self, nodes: &[ContentNode<'_>], upstream: &RecordSets) -> Result<RecordSets> {
        let mut tables: Vec<CombatTable> = self
            .sections
            .sources
            .iter()
            .flat_map(|source| parse_part_tables(nodes, source))
            .collect();
        tables.extend(derived_tables(upstream, self.sections));

        let mut out = RecordSets::new();
        out.insert("combat_tables".into(), to_record_set("combat_tables", &tables)?);
        Ok(out)
    }
}
