//! Cross-Reference Validator
//!
//! Checks produced record sets against each other: spell list names against
//! the spell catalog, encounter table cells against monster names, and the
//! shape of the combat tables. Only the spell list check can escalate to a
//! critical issue. Encounter matching is a loose tokenization and is
//! expected to over-report, so it only ever warns.

use crate::config::ValidationConfig;
use crate::extractors::RecordSets;
use crate::types::{
    CharacterWarning, MagicItemWarning, MonsterWarning, SpellWarning, TableWarning, WarningKind,
};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

static NON_ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());
static LEADING_ROLL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+d\d+|\d+-\d+|\d+|d%)\s+").unwrap());
static CANDIDATE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,/;]|\bor\b|\band\b").unwrap());
static ALIAS_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\bor\b|\band\b").unwrap());

const NOTES: [&str; 2] = [
    "Encounter-reference matching uses heuristic tokenization and may over-report unresolved aliases.",
    "Non-critical warnings should be reviewed before downstream strict linking.",
];

/// Lowercase, non-alphanumeric runs to one space, trimmed.
pub fn canonical_name(text: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_parentheticals(text: &str) -> String {
    squash(&PARENTHETICAL.replace_all(text, ""))
}

/// Canonical aliases of one monster name: the full name, the name without
/// parenthetical qualifiers, and each comma/or/and fragment of the latter.
pub fn monster_aliases(name: &str) -> BTreeSet<String> {
    let name = squash(name);
    let mut aliases = BTreeSet::new();
    if name.is_empty() {
        return aliases;
    }
    aliases.insert(canonical_name(&name));

    let base = strip_parentheticals(&name);
    aliases.insert(canonical_name(&base));
    for fragment in ALIAS_SPLIT.split(&base) {
        aliases.insert(canonical_name(fragment));
    }
    aliases.retain(|alias| !alias.is_empty());
    aliases
}

/// Canonical reference fragments of one encounter table cell.
pub fn encounter_candidates(cell: &str, min_len: usize) -> Vec<String> {
    let text = squash(cell);
    if text.is_empty() {
        return Vec::new();
    }
    let text = LEADING_ROLL.replace(&text, "");
    CANDIDATE_SPLIT
        .split(&text)
        .map(strip_parentheticals)
        .filter(|fragment| fragment.chars().count() >= min_len)
        .map(|fragment| canonical_name(&fragment))
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Pass => f.write_str("pass"),
            ValidationStatus::Fail => f.write_str("fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub check: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub critical_count: usize,
    pub warning_count: usize,
    pub status: ValidationStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellListCheck {
    pub listed: usize,
    pub resolved: usize,
    pub missing_sample: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterRefCheck {
    pub candidates: usize,
    pub resolved: usize,
    pub unresolved_sample: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatTableCheck {
    pub count: usize,
    pub malformed: Vec<String>,
}

/// Warning tag counts per entity family.
pub type WarningTally = IndexMap<String, BTreeMap<String, usize>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationChecks {
    pub spell_list_names: SpellListCheck,
    pub encounter_monster_refs: EncounterRefCheck,
    pub combat_tables: CombatTableCheck,
    pub extraction_warnings: WarningTally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    pub checks: ValidationChecks,
    pub issues: Vec<ValidationIssue>,
    pub notes: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.summary.status == ValidationStatus::Pass
    }
}

/// Record sets the validator reads.
pub const VALIDATED_SETS: &[&str] = &[
    "spells",
    "spell_lists",
    "monsters",
    "encounter_tables",
    "combat_tables",
    "magic_items",
    "magic_item_tables",
    "races",
    "classes",
];

fn array<'v>(sets: &'v RecordSets, name: &str) -> &'v [Value] {
    sets.get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field<'v>(record: &'v Value, field: &str) -> &'v str {
    record.get(field).and_then(Value::as_str).unwrap_or_default()
}

pub struct CrossReferenceValidator<'c> {
    config: &'c ValidationConfig,
}

impl<'c> CrossReferenceValidator<'c> {
    pub fn new(config: &'c ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, sets: &RecordSets) -> ValidationReport {
        let mut issues = Vec::new();

        let spell_list_names = self.check_spell_lists(sets, &mut issues);
        let encounter_monster_refs = self.check_encounter_refs(sets, &mut issues);
        let combat_tables = Self::check_combat_tables(sets, &mut issues);
        let extraction_warnings = Self::tally_warnings(sets);

        let critical_count = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Critical)
            .count();
        let warning_count = issues.len() - critical_count;
        let status = if critical_count == 0 {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };
        log::info!(
            "Validation {}: {} critical, {} warnings",
            status,
            critical_count,
            warning_count
        );

        ValidationReport {
            summary: ValidationSummary {
                critical_count,
                warning_count,
                status,
            },
            checks: ValidationChecks {
                spell_list_names,
                encounter_monster_refs,
                combat_tables,
                extraction_warnings,
            },
            issues,
            notes: NOTES.iter().map(|note| note.to_string()).collect(),
        }
    }

    fn check_spell_lists(&self, sets: &RecordSets, issues: &mut Vec<ValidationIssue>) -> SpellListCheck {
        let known: BTreeSet<String> = array(sets, "spells")
            .iter()
            .map(|spell| canonical_name(str_field(spell, "name_clean")))
            .filter(|name| !name.is_empty())
            .collect();
        let listed: BTreeSet<String> = sets
            .get("spell_lists")
            .and_then(|lists| lists.get("all"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|entry| canonical_name(str_field(entry, "name_clean")))
            .filter(|name| !name.is_empty())
            .collect();
        let missing: Vec<String> = listed.difference(&known).cloned().collect();

        if !missing.is_empty() {
            let severity = if missing.len() > self.config.spell_missing_critical_threshold {
                Severity::Critical
            } else {
                Severity::Warning
            };
            issues.push(ValidationIssue {
                severity,
                check: "spell_list_references".to_string(),
                message: format!("{} spell list names missing from spells.json", missing.len()),
            });
        }

        SpellListCheck {
            listed: listed.len(),
            resolved: listed.len() - missing.len(),
            missing_sample: missing
                .into_iter()
                .take(self.config.missing_sample_limit)
                .collect(),
        }
    }

    /// Every canonical fragment of every encounter table cell, skipping the
    /// die roll column of tables that have headers.
    pub fn collect_encounter_candidates(&self, encounters: &Value) -> BTreeSet<String> {
        let mut candidates = BTreeSet::new();
        let Some(groups) = encounters.as_object() else {
            return candidates;
        };
        for table in groups.values().filter_map(Value::as_array).flatten() {
            let has_headers = table
                .get("headers")
                .and_then(Value::as_array)
                .is_some_and(|headers| !headers.is_empty());
            let start_col = usize::from(has_headers);
            let rows = table.get("rows").and_then(Value::as_array).into_iter().flatten();
            for row in rows.filter_map(Value::as_array) {
                // Normalized numbers and ranges never name a monster.
                for cell in row.iter().skip(start_col).filter_map(Value::as_str) {
                    candidates.extend(encounter_candidates(cell, self.config.min_fragment_len));
                }
            }
        }
        candidates
    }

    fn check_encounter_refs(&self, sets: &RecordSets, issues: &mut Vec<ValidationIssue>) -> EncounterRefCheck {
        let candidates = sets
            .get("encounter_tables")
            .map(|encounters| self.collect_encounter_candidates(encounters))
            .unwrap_or_default();
        let aliases: BTreeSet<String> = array(sets, "monsters")
            .iter()
            .flat_map(|monster| monster_aliases(str_field(monster, "name")))
            .collect();
        let unresolved: Vec<String> = candidates.difference(&aliases).cloned().collect();

        if !unresolved.is_empty() {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                check: "encounter_monster_references".to_string(),
                message: format!(
                    "{} encounter references not matched to monster aliases",
                    unresolved.len()
                ),
            });
        }

        EncounterRefCheck {
            candidates: candidates.len(),
            resolved: candidates.len() - unresolved.len(),
            unresolved_sample: unresolved
                .into_iter()
                .take(self.config.unresolved_sample_limit)
                .collect(),
        }
    }

    fn check_combat_tables(sets: &RecordSets, issues: &mut Vec<ValidationIssue>) -> CombatTableCheck {
        let tables = array(sets, "combat_tables");
        let is_empty = |table: &Value, field: &str| {
            table
                .get(field)
                .and_then(Value::as_array)
                .is_none_or(|items| items.is_empty())
        };
        let malformed: Vec<String> = tables
            .iter()
            .filter(|table| is_empty(*table, "headers") || is_empty(*table, "rows"))
            .map(|table| {
                table
                    .get("table_name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string()
            })
            .collect();

        if !malformed.is_empty() {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                check: "combat_table_structure".to_string(),
                message: format!("{} combat tables have missing headers/rows", malformed.len()),
            });
        }

        CombatTableCheck {
            count: tables.len(),
            malformed,
        }
    }

    fn tally<'v, W: WarningKind>(records: impl Iterator<Item = &'v Value>) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        let tags = records
            .filter_map(|record| record.get("warnings").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_str);
        for raw in tags {
            match raw.parse::<W>() {
                Ok(warning) => *counts.entry(warning.tag().to_string()).or_insert(0) += 1,
                Err(_) => log::warn!("Ignoring unrecognised warning tag '{}'", raw),
            }
        }
        counts
    }

    /// Warning tag counts per family, for information only.
    pub fn tally_warnings(sets: &RecordSets) -> WarningTally {
        let encounter_tables = sets
            .get("encounter_tables")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|groups| groups.values())
            .filter_map(Value::as_array)
            .flatten();
        let tables = array(sets, "magic_item_tables")
            .iter()
            .chain(array(sets, "combat_tables"))
            .chain(encounter_tables);
        let characters = array(sets, "races").iter().chain(array(sets, "classes"));

        let mut tally = WarningTally::new();
        tally.insert(
            "monsters".into(),
            Self::tally::<MonsterWarning>(array(sets, "monsters").iter()),
        );
        tally.insert(
            "spells".into(),
            Self::tally::<SpellWarning>(array(sets, "spells").iter()),
        );
        tally.insert(
            "magic_items".into(),
            Self::tally::<MagicItemWarning>(array(sets, "magic_items").iter()),
        );
        tally.insert("characters".into(), Self::tally::<CharacterWarning>(characters));
        tally.insert("tables".into(), Self::tally::<TableWarning>(tables));
        tally
    }
}
