//! Race and class write-ups from the character Part

use super::engine::{to_record_set, Extractor, RecordSets};
use crate::config::CharacterSections;
use crate::navigation::{elements_between_parts, segment_into_blocks, Block, ContentNode};
use crate::text::{collapse_whitespace, join_paragraphs, slugify};
use crate::types::{CharacterEntry, CharacterWarning};
use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static LABELED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]{2,40}):\s*(.+)$").unwrap());

/// `Label: value` paragraphs keyed by label slug. A repeated label keeps the
/// last value.
pub fn labeled_fields(paragraphs: &[String]) -> IndexMap<String, String> {
    paragraphs
        .iter()
        .filter_map(|text| LABELED_FIELD.captures(text))
        .map(|caps| (slugify(&caps[1]), collapse_whitespace(&caps[2])))
        .collect()
}

pub fn parse_entry(block: &Block<'_, '_>) -> CharacterEntry {
    let paragraphs: Vec<String> = block.paragraphs().into_iter().map(str::to_string).collect();
    let fields = labeled_fields(&paragraphs);

    let mut warnings = Vec::new();
    if fields.is_empty() {
        warnings.push(CharacterWarning::NoLabeledFields);
    }
    if paragraphs.is_empty() {
        warnings.push(CharacterWarning::EmptyDescription);
    }

    CharacterEntry {
        name: block.heading.to_string(),
        fields,
        description: join_paragraphs(&paragraphs),
        description_paragraphs: paragraphs,
        warnings,
    }
}

fn entries_named(blocks: &[Block<'_, '_>], names: &[String]) -> Vec<CharacterEntry> {
    blocks
        .iter()
        .filter(|block| names.iter().any(|name| name == block.heading))
        .map(parse_entry)
        .collect()
}

pub struct CharactersExtractor<'c> {
    sections: &'c CharacterSections,
}

impl<'c> CharactersExtractor<'c> {
    pub fn new(sections: &'c CharacterSections) -> Self {
        Self { sections }
    }
}

impl Extractor for CharactersExtractor<'_> {
    fn name(&self) -> &'static str {
        "characters"
    }

    fn extract(&self, nodes: &[ContentNode<'_>], _upstream: &RecordSets) -> Result<RecordSets> {
        let sections = self.sections;
        let part = elements_between_parts(nodes, sections.part, Some(sections.end_part));
        let blocks = segment_into_blocks(part);

        let races = entries_named(&blocks, &sections.races);
        let classes = entries_named(&blocks, &sections.classes);

        let mut out = RecordSets::new();
        out.insert("races".into(), to_record_set("races", &races)?);
        out.insert("classes".into(), to_record_set("classes", &classes)?);
        Ok(out)
    }
}
