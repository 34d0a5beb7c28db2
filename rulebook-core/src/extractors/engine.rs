use crate::config::{ExtractionConfig, PipelineConfig};
use crate::error::RulebookError;
use crate::navigation::ContentNode;
use crate::storage::RecordStorage;
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::time::{Duration, Instant};

use super::characters::CharactersExtractor;
use super::combat::CombatTablesExtractor;
use super::encounters::EncountersExtractor;
use super::monsters::MonstersExtractor;
use super::rules_tables::RulesTablesExtractor;
use super::spells::SpellsExtractor;
use super::treasure::TreasureExtractor;

/// Named record sets, in production order.
pub type RecordSets = IndexMap<String, Value>;

/// One entity family's extraction over the flattened stream.
pub trait Extractor {
    fn name(&self) -> &'static str;

    /// Record sets this extractor reads from earlier stages. A missing
    /// dependency is not an error; the extractor omits what it would derive.
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    fn extract(&self, nodes: &[ContentNode<'_>], upstream: &RecordSets) -> Result<RecordSets>;
}

/// Serialize a typed record set into the shared JSON representation.
pub fn to_record_set<T: Serialize>(name: &str, records: &T) -> Result<Value> {
    serde_json::to_value(records).map_err(|source| {
        RulebookError::Serialization {
            name: name.to_string(),
            source,
        }
        .into()
    })
}

/// Number of first-class records in a record set, for reporting.
///
/// Arrays count their items; `rows` payloads count their rows; keyed groups
/// sum the counts of their members.
pub fn record_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => match map.get("rows") {
            Some(Value::Array(rows)) => rows.len(),
            _ => map
                .iter()
                .filter(|(key, _)| key.as_str() != "all")
                .map(|(_, member)| match member {
                    Value::Array(items) => items.len(),
                    Value::Object(inner) => match inner.get("rows") {
                        Some(Value::Array(rows)) => rows.len(),
                        _ => inner.values().filter_map(Value::as_array).map(Vec::len).sum(),
                    },
                    _ => 0,
                })
                .sum(),
        },
        _ => 0,
    }
}

/// Build an extractor stage by its pipeline name.
pub fn build_extractor<'c>(
    name: &str,
    config: &'c ExtractionConfig,
) -> Result<Box<dyn Extractor + 'c>> {
    let sections = &config.sections;
    let extractor: Box<dyn Extractor + 'c> = match name {
        "rules_tables" => Box::new(RulesTablesExtractor::new(&sections.rules)),
        "spells" => Box::new(SpellsExtractor::new(&sections.spells)),
        "monsters" => Box::new(MonstersExtractor::new(&sections.monsters)),
        "treasure" => Box::new(TreasureExtractor::new(&sections.treasure)),
        "characters" => Box::new(CharactersExtractor::new(&sections.characters)),
        "encounters" => Box::new(EncountersExtractor::new(&sections.encounters)),
        "combat_tables" => Box::new(CombatTablesExtractor::new(&sections.combat)),
        other => return Err(RulebookError::UnknownExtractor(other.to_string()).into()),
    };
    Ok(extractor)
}

/// Runs the configured extractor stages in order over one flattened stream.
pub struct ExtractionEngine<'c> {
    config: &'c ExtractionConfig,
    pipeline: &'c PipelineConfig,
    pub stage_timings: RefCell<Vec<(String, Duration)>>,
}

impl<'c> ExtractionEngine<'c> {
    pub fn new(config: &'c ExtractionConfig) -> Self {
        Self::with_pipeline(config, &config.pipeline)
    }

    pub fn with_pipeline(config: &'c ExtractionConfig, pipeline: &'c PipelineConfig) -> Self {
        Self {
            config,
            pipeline,
            stage_timings: RefCell::new(Vec::new()),
        }
    }

    /// Run every enabled stage. Dependencies are served from this run's
    /// output first, then from `storage`.
    pub fn run(&self, nodes: &[ContentNode<'_>], storage: &dyn RecordStorage) -> Result<RecordSets> {
        log::info!("Running extraction pipeline over {} content nodes", nodes.len());
        self.stage_timings.borrow_mut().clear();

        let mut produced = RecordSets::new();
        for stage in &self.pipeline.stages {
            if !stage.enabled {
                log::info!("Skipping disabled stage: {}", stage.name);
                continue;
            }

            let extractor = build_extractor(&stage.name, self.config)?;
            let upstream = Self::resolve_dependencies(extractor.as_ref(), &produced, storage)?;

            let started = Instant::now();
            let output = extractor.extract(nodes, &upstream)?;
            self.stage_timings
                .borrow_mut()
                .push((stage.name.clone(), started.elapsed()));

            for (name, value) in output {
                log::info!("{}: {} -> {} records", stage.name, name, record_count(&value));
                produced.insert(name, value);
            }
        }
        Ok(produced)
    }

    fn resolve_dependencies(
        extractor: &dyn Extractor,
        produced: &RecordSets,
        storage: &dyn RecordStorage,
    ) -> Result<RecordSets> {
        let mut upstream = RecordSets::new();
        for &dependency in extractor.depends_on() {
            let value = match produced.get(dependency) {
                Some(value) => Some(value.clone()),
                None => storage.load(dependency)?,
            };
            match value {
                Some(value) => {
                    upstream.insert(dependency.to_string(), value);
                }
                None => log::debug!(
                    "{}: dependency {} not available",
                    extractor.name(),
                    dependency
                ),
            }
        }
        Ok(upstream)
    }
}
