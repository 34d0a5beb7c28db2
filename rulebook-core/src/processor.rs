use crate::config::{ExtractionConfig, NormalizationConfig, PipelineConfig};
use crate::error::RulebookError;
use crate::extractors::{record_count, to_record_set, ExtractionEngine, RecordSets};
use crate::navigation::{flatten, ContentNode, FontFaceHeadingDetector};
use crate::normalize::{ScalarNormalizer, VALIDATION_REPORT};
use crate::preprocessors::{HtmlPreprocessor, Preprocessor};
use crate::storage::{FileStorage, MemoryStorage, RecordStorage};
use crate::validation::{CrossReferenceValidator, ValidationReport, ValidationStatus, VALIDATED_SETS};
use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

pub const DATA_README: &str = "README.md";

/// Known record sets and their one-line descriptions for the data README.
const FILE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("armor", "Armor and shield equipment table."),
    ("attack_bonus", "Attack bonus progression table."),
    ("class_tables", "Class progression tables (cleric/fighter/magic-user)."),
    ("classes", "Class prose descriptions and labeled fields."),
    ("combat_tables", "Combat-reference tables with source metadata."),
    ("encounter_tables", "Dungeon and wilderness encounter tables."),
    ("equipment", "General equipment tables."),
    ("magic_item_tables", "Random generation and magic-item roll tables."),
    ("magic_items", "Magic item entries parsed from prose sections."),
    ("monsters", "Monster records with stat blocks, descriptions, and warnings."),
    ("races", "Race prose descriptions and labeled fields."),
    ("saving_throws", "Saving throw progression by class."),
    ("spell_lists", "Spell indexes by class and level."),
    ("spells", "Individual spell records with metadata and descriptions."),
    ("thief_abilities", "Thief ability progression table."),
    ("treasure_types", "Treasure type and value tables."),
    ("turning_undead", "Cleric turning-undead progression table."),
    ("vehicles", "Land and water vehicle tables."),
    ("weapons", "Weapon table with per-item `category` values."),
    (VALIDATION_REPORT, "Cross-file validation report and unresolved warnings."),
];

/// Data directory README listing every stored record set.
pub fn data_readme(names: &[String]) -> String {
    let mut readme = String::from(
        "# Data Outputs\n\nStructured JSON record sets extracted from the rulebook export.\n\n## Files\n\n",
    );
    for name in names {
        let description = FILE_DESCRIPTIONS
            .iter()
            .find(|(known, _)| known == name)
            .map(|(_, description)| *description)
            .unwrap_or("Extracted record set.");
        readme.push_str(&format!("- `{name}.json`: {description}\n"));
    }
    readme.push_str(
        "\n## Notes\n\n\
         - String normalization collapses layout whitespace artifacts.\n\
         - Comma-formatted numbers (e.g. `1,000`) are converted to integers.\n\
         - Numeric ranges (e.g. `1-3`) are converted to integer lists.\n\
         - Records carry `warnings` arrays for partial or degraded parses.\n\
         - Encounter-to-monster references are validated heuristically.\n",
    );
    readme
}

/// Collects timings for pipeline steps when enabled
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        self.record(step_name, start.elapsed());
        result
    }

    pub fn record(&mut self, step_name: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        log::debug!("{}: {}ms", step_name, elapsed.as_millis());
        self.timings.push((step_name.to_string(), elapsed));
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    /// Aligned `step ... ms (pct%)` lines plus a total, empty when disabled.
    pub fn summary_lines(&self) -> Vec<String> {
        if !self.enabled || self.timings.is_empty() {
            return Vec::new();
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let total_secs = total.as_secs_f64().max(f64::EPSILON);
        let mut lines: Vec<String> = self
            .timings
            .iter()
            .map(|(step, duration)| {
                format!(
                    "{:.<35} {}ms ({:.1}%)",
                    step,
                    duration.as_millis(),
                    duration.as_secs_f64() / total_secs * 100.0
                )
            })
            .collect();
        lines.push(format!("{:.<35} {}ms", "Total", total.as_millis()));
        lines
    }
}

/// What a run produced, for the caller to report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub record_counts: IndexMap<String, usize>,
    pub critical_count: usize,
    pub warning_count: usize,
    pub status: ValidationStatus,
}

impl RunSummary {
    fn new(record_counts: IndexMap<String, usize>, report: &ValidationReport) -> Self {
        Self {
            record_counts,
            critical_count: report.summary.critical_count,
            warning_count: report.summary.warning_count,
            status: report.summary.status,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }
}

pub struct RulebookProcessor {
    preprocessor: Box<dyn Preprocessor>,
    storage: Box<dyn RecordStorage>,
}

impl RulebookProcessor {
    /// Create RulebookProcessor with full dependency injection
    pub fn new_with_dependencies(
        preprocessor: Box<dyn Preprocessor>,
        storage: Box<dyn RecordStorage>,
    ) -> Self {
        Self {
            preprocessor,
            storage,
        }
    }

    /// HTML preprocessor writing record sets into `data_dir`
    pub fn new_cli(data_dir: impl AsRef<Path>) -> Result<Self> {
        let storage = FileStorage::new(data_dir)?;
        log::info!("Record sets are stored in {}", storage.data_dir().display());
        Ok(Self::new_with_dependencies(
            Box::new(HtmlPreprocessor::new()),
            Box::new(storage),
        ))
    }

    /// HTML preprocessor with in-memory storage
    pub fn new_in_memory() -> Self {
        Self::new_with_dependencies(Box::new(HtmlPreprocessor::new()), Box::new(MemoryStorage::new()))
    }

    pub fn storage(&self) -> &dyn RecordStorage {
        self.storage.as_ref()
    }

    /// Run the configured pipeline over one rulebook export
    pub fn run(&self, input_path: &Path, config: &ExtractionConfig) -> Result<RunSummary> {
        self.run_with_profiler(
            input_path,
            config,
            &config.pipeline,
            &mut StepProfiler::new(false),
        )
    }

    /// Load, flatten, extract, normalize and persist, then validate every
    /// stored record set. Stages outside `pipeline` keep whatever an earlier
    /// run stored.
    pub fn run_with_profiler(
        &self,
        input_path: &Path,
        config: &ExtractionConfig,
        pipeline: &PipelineConfig,
        profiler: &mut StepProfiler,
    ) -> Result<RunSummary> {
        log::info!("Processing rulebook: {}", input_path.display());

        if !self.preprocessor.supports_file_type(input_path) {
            return Err(RulebookError::UnsupportedInput {
                path: input_path.display().to_string(),
                preprocessor: self.preprocessor.name().to_string(),
            }
            .into());
        }
        let document = profiler.time_step("1. Read and parse input", || {
            self.preprocessor.process_file(input_path)
        })?;
        let body = profiler.time_step("2. Locate body", || self.preprocessor.body(&document))?;

        let detector = FontFaceHeadingDetector::new(&config.heading.font_face);
        let nodes: Vec<ContentNode<'_>> =
            profiler.time_step("3. Flatten", || flatten(body, &detector).collect());
        log::info!("Flattened {} content nodes", nodes.len());

        let mut sets = self.extract(&nodes, config, pipeline, profiler)?;

        profiler.time_step("5. Normalize", || {
            ScalarNormalizer::new(&config.normalization).normalize_all(&mut sets)
        });

        let record_counts = profiler.time_step("6. Persist", || self.persist(&sets))?;
        let report = profiler.time_step("7. Validate", || self.validate_stored(config))?;

        Ok(RunSummary::new(record_counts, &report))
    }

    /// Run the extractor stages of `pipeline` over an already flattened stream
    pub fn extract(
        &self,
        nodes: &[ContentNode<'_>],
        config: &ExtractionConfig,
        pipeline: &PipelineConfig,
        profiler: &mut StepProfiler,
    ) -> Result<RecordSets> {
        let engine = ExtractionEngine::with_pipeline(config, pipeline);
        let sets = engine.run(nodes, self.storage.as_ref())?;
        for (stage, elapsed) in engine.stage_timings.borrow().iter() {
            profiler.record(&format!("4. Extract {stage}"), *elapsed);
        }
        Ok(sets)
    }

    fn persist(&self, sets: &RecordSets) -> Result<IndexMap<String, usize>> {
        let mut counts = IndexMap::new();
        for (name, records) in sets {
            self.storage.store(name, records)?;
            counts.insert(name.clone(), record_count(records));
        }
        log::info!("Stored {} record sets", counts.len());
        Ok(counts)
    }

    /// Re-normalize every stored record set except the validation report.
    /// Returns the names rewritten.
    pub fn normalize_stored(&self, config: &NormalizationConfig) -> Result<Vec<String>> {
        let normalizer = ScalarNormalizer::new(config);
        let mut rewritten = Vec::new();
        for name in self.storage.list()? {
            if name == VALIDATION_REPORT {
                continue;
            }
            let Some(records) = self.storage.load(&name)? else {
                continue;
            };
            let normalized = normalizer.normalize_record_set(&name, records);
            self.storage.store(&name, &normalized)?;
            rewritten.push(name);
        }
        log::info!("Normalized {} stored record sets", rewritten.len());
        Ok(rewritten)
    }

    /// Validate the stored record sets, then store the report and the data
    /// README next to them.
    pub fn validate_stored(&self, config: &ExtractionConfig) -> Result<ValidationReport> {
        let mut sets = RecordSets::new();
        for &name in VALIDATED_SETS {
            if let Some(records) = self.storage.load(name)? {
                sets.insert(name.to_string(), records);
            }
        }

        let report = CrossReferenceValidator::new(&config.validation).validate(&sets);
        if !report.passed() {
            log::warn!(
                "Validation failed with {} critical issues",
                report.summary.critical_count
            );
        }

        self.storage
            .store(VALIDATION_REPORT, &to_record_set(VALIDATION_REPORT, &report)?)?;
        self.storage
            .store_text(DATA_README, &data_readme(&self.storage.list()?))?;
        Ok(report)
    }
}
