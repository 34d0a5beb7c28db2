//! Wandering monster tables from the adventure Part

use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::EncounterSections;
use crate::navigation::{elements_between_parts, segment_into_blocks, Block, ContentNode};
use crate::tables::{table_to_rows, TablePayload};
use crate::types::{EncounterTable, EncounterTables, TableWarning};
use anyhow::Result;

/// Every non-empty table of `block`, numbered from 1 within the block.
pub fn block_encounter_tables(block: &Block<'_, '_>) -> Vec<EncounterTable> {
    block
        .tables()
        .map(|node| table_to_rows(node.element))
        .filter(|rows| !rows.is_empty())
        .enumerate()
        .map(|(idx, rows)| {
            let TablePayload { headers, rows } = TablePayload::from_rows(&rows);
            EncounterTable {
                table_name: format!("{} #{}", block.heading, idx + 1),
                source_section: block.heading.to_string(),
                warnings: TableWarning::check(&headers, &rows),
                headers,
                rows,
            }
        })
        .collect()
}

pub fn parse_encounters(nodes: &[ContentNode<'_>], sections: &EncounterSections) -> EncounterTables {
    let part = elements_between_parts(nodes, sections.part, Some(sections.end_part));
    let mut out = EncounterTables::default();
    for block in segment_into_blocks(part) {
        if block.heading == sections.dungeon {
            out.dungeon.extend(block_encounter_tables(&block));
        } else if block.heading == sections.wilderness {
            out.wilderness.extend(block_encounter_tables(&block));
        }
    }
    out
}

pub struct EncountersExtractor<'c> {
    sections: &'c EncounterSections,
}

impl<'c> EncountersExtractor<'c> {
    pub fn new(sections: &'c EncounterSections) -> Self {
        Self { sections }
    }
}

impl Extractor for EncountersExtractor<'_> {
    fn name(&self) -> &'static str {
        "encounters"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let tables = parse_encounters(nodes, self.sections);
        let mut out = RecordSets::new();
        out.insert(
            "encounter_tables".into(),
            to_record_set("encounter_tables", &tables)?,
        );
        Ok(out)
    }
}
