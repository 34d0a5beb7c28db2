use crate::error::RulebookError;
use crate::tables::{Record, Row, TablePayload};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ===== WARNING TAGS =====
// Each entity family has a closed set of warning kinds. They serialize as
// snake_case tags and parse back, so the validator can tally them without
// matching on free-form strings.

/// Common view over the per-family warning enums.
pub trait WarningKind: fmt::Display + FromStr {
    /// Tag without any payload, used as the tally key.
    fn tag(&self) -> &'static str;
}

macro_rules! warning_tags {
    ($name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl WarningKind for $name {
            fn tag(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.tag())
            }
        }

        impl FromStr for $name {
            type Err = RulebookError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(RulebookError::UnknownWarning(other.to_string())),
                }
            }
        }
    };
}

warning_tags!(SpellWarning {
    MissingRange => "missing_range",
    MissingClassDurationLine => "missing_class_duration_line",
    MissingClassLevels => "missing_class_levels",
    MissingDuration => "missing_duration",
});

warning_tags!(MagicItemWarning {
    ProseLikeName => "prose_like_name",
});

warning_tags!(CharacterWarning {
    NoLabeledFields => "no_labeled_fields",
    EmptyDescription => "empty_description",
});

warning_tags!(TableWarning {
    MissingHeaders => "missing_headers",
    MissingRows => "missing_rows",
});

impl TableWarning {
    pub fn check<R>(headers: &[String], rows: &[R]) -> Vec<TableWarning> {
        let mut warnings = Vec::new();
        if headers.is_empty() {
            warnings.push(TableWarning::MissingHeaders);
        }
        if rows.is_empty() {
            warnings.push(TableWarning::MissingRows);
        }
        warnings
    }
}

/// Monster warnings. `MissingCoreFields` carries the sorted field names and
/// renders as `missing_core_fields:armor_class,xp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonsterWarning {
    MissingStatBlock,
    CrossReferenceOnly,
    MissingCoreFields(Vec<String>),
}

const MISSING_CORE_FIELDS: &str = "missing_core_fields";

impl WarningKind for MonsterWarning {
    fn tag(&self) -> &'static str {
        match self {
            MonsterWarning::MissingStatBlock => "missing_stat_block",
            MonsterWarning::CrossReferenceOnly => "cross_reference_only",
            MonsterWarning::MissingCoreFields(_) => MISSING_CORE_FIELDS,
        }
    }
}

impl fmt::Display for MonsterWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonsterWarning::MissingCoreFields(fields) => {
                write!(f, "{}:{}", MISSING_CORE_FIELDS, fields.join(","))
            }
            other => f.write_str(other.tag()),
        }
    }
}

impl FromStr for MonsterWarning {
    type Err = RulebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing_stat_block" => Ok(MonsterWarning::MissingStatBlock),
            "cross_reference_only" => Ok(MonsterWarning::CrossReferenceOnly),
            _ => match s.split_once(':') {
                Some((MISSING_CORE_FIELDS, fields)) => Ok(MonsterWarning::MissingCoreFields(
                    fields
                        .split(',')
                        .filter(|field| !field.is_empty())
                        .map(str::to_string)
                        .collect(),
                )),
                _ => Err(RulebookError::UnknownWarning(s.to_string())),
            },
        }
    }
}

impl Serialize for MonsterWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonsterWarning {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ===== RULES TABLES =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackBonusRow {
    pub fighter_level: String,
    pub cleric_or_thief_level: String,
    pub magic_user_level: String,
    pub monster_hit_dice: String,
    pub attack_bonus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndeadColumn {
    pub name: String,
    pub hit_dice: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurningUndead {
    pub undead_columns: Vec<UndeadColumn>,
    pub rows: Vec<Record>,
}

// ===== SPELLS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    pub name_clean: String,
    pub reversible: bool,
    pub range: String,
    pub duration: String,
    /// Class slug (`cleric`, `magic_user`) to spell level.
    pub class_levels: IndexMap<String, u32>,
    pub description_paragraphs: Vec<String>,
    pub description: String,
    pub embedded_tables: Vec<TablePayload>,
    pub warnings: Vec<SpellWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellListEntry {
    pub class: String,
    pub level: u32,
    pub name: String,
    pub reversible: bool,
    pub name_clean: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellLists {
    /// Level (as a string key) to spell names.
    pub cleric: IndexMap<String, Vec<String>>,
    pub magic_user: IndexMap<String, Vec<String>>,
    pub all: Vec<SpellListEntry>,
}

// ===== MONSTERS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub name: String,
    pub stat_block: Record,
    pub description: String,
    pub description_paragraphs: Vec<String>,
    pub dragon_age_tables: Vec<TablePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<String>,
    pub warnings: Vec<MonsterWarning>,
}

// ===== TREASURE =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicItem {
    pub name: String,
    pub category: String,
    pub description_paragraphs: Vec<String>,
    pub description: String,
    pub warnings: Vec<MagicItemWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicItemTable {
    pub section: String,
    pub headers: Row,
    pub rows: Vec<Row>,
    pub warnings: Vec<TableWarning>,
}

/// Treasure type section name to its table.
pub type TreasureTypes = IndexMap<String, TablePayload>;

// ===== CHARACTERS & ENCOUNTERS =====

/// A race or class write-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub name: String,
    pub fields: IndexMap<String, String>,
    pub description_paragraphs: Vec<String>,
    pub description: String,
    pub warnings: Vec<CharacterWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterTable {
    pub table_name: String,
    pub source_section: String,
    pub headers: Row,
    pub rows: Vec<Row>,
    pub warnings: Vec<TableWarning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterTables {
    pub dungeon: Vec<EncounterTable>,
    pub wilderness: Vec<EncounterTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTable {
    pub table_name: String,
    pub source_section: String,
    pub source_part: u32,
    pub headers: Row,
    /// Parsed cells are strings; cells re-assembled from stored record sets
    /// keep whatever shape normalization gave them.
    pub rows: Vec<Vec<Value>>,
    pub warnings: Vec<TableWarning>,
}
