use crate::error::RulebookError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Everything the extraction pipeline consults about the rulebook layout.
///
/// Every section name and Part number defaults to the values of the Basic
/// Fantasy rulebook export, so an empty YAML file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub heading: HeadingConfig,
    /// Pipeline configuration - defines which extractors run and in what order
    pub pipeline: PipelineConfig,
    pub sections: SectionsConfig,
    pub normalization: NormalizationConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Font face whose presence inside a paragraph marks a section heading
    pub font_face: String,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            font_face: "SoutaneBlack".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extractor stages to run in order
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Name of the extractor
    pub name: String,
    /// Whether this stage is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl StageConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: [
                "rules_tables",
                "spells",
                "monsters",
                "treasure",
                "characters",
                "encounters",
                "combat_tables",
            ]
            .into_iter()
            .map(StageConfig::new)
            .collect(),
        }
    }
}

impl PipelineConfig {
    /// Pipeline restricted to a single stage.
    pub fn only(stage: &str) -> Self {
        Self {
            stages: vec![StageConfig::new(stage)],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionsConfig {
    pub rules: RulesSections,
    pub spells: SpellSections,
    pub monsters: MonsterSections,
    pub treasure: TreasureSections,
    pub characters: CharacterSections,
    pub encounters: EncounterSections,
    pub combat: CombatSections,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedSection {
    pub heading: String,
    pub tag: String,
}

impl TaggedSection {
    fn new(heading: &str, tag: &str) -> Self {
        Self {
            heading: heading.to_string(),
            tag: tag.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSections {
    pub weapons: String,
    pub armor: String,
    pub equipment: String,
    /// Vehicle table headings, each tagged with the `category` its rows get
    pub vehicles: Vec<TaggedSection>,
    /// Class headings whose first table is the progression table
    pub class_tables: Vec<String>,
    pub saving_throws: String,
    /// Paragraph texts that announce the next saving throw table
    pub saving_throw_classes: Vec<String>,
    pub thief_abilities: String,
    pub attack_bonus: String,
    /// Text after which the attack bonus heading stops listing tokens
    pub attack_bonus_terminator: String,
    /// Token that opens the attack bonus token stream
    pub attack_bonus_sentinel: String,
    /// First header cell of the turning undead table
    pub turning_undead_first_header: String,
    /// Header cell that must also be present in the turning undead table
    pub turning_undead_marker: String,
}

impl Default for RulesSections {
    fn default() -> Self {
        Self {
            weapons: "Weapons".to_string(),
            armor: "Armor and Shields".to_string(),
            equipment: "Equipment".to_string(),
            vehicles: vec![
                TaggedSection::new("Land Transportation", "land"),
                TaggedSection::new("Water Transportation", "water"),
            ],
            class_tables: strings(&["Cleric", "Fighter", "Magic-User"]),
            saving_throws: "Saving Throw Tables by Class".to_string(),
            saving_throw_classes: strings(&["Cleric", "Fighter", "Magic-User", "Thief"]),
            thief_abilities: "Thief Abilities".to_string(),
            attack_bonus: "Attack Bonus Table".to_string(),
            attack_bonus_terminator: "To roll \"to hit,\"".to_string(),
            attack_bonus_sentinel: "NM".to_string(),
            turning_undead_first_header: "Cleric Level".to_string(),
            turning_undead_marker: "Skeleton".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellSections {
    /// Spell list headings tagged with their class key
    pub class_lists: Vec<TaggedSection>,
    /// Heading of the alphabetical spell catalog
    pub catalog: String,
    /// How many elements after an entry header are searched for the
    /// class/duration line
    pub meta_lookahead: usize,
}

impl Default for SpellSections {
    fn default() -> Self {
        Self {
            class_lists: vec![
                TaggedSection::new("Cleric Spells", "cleric"),
                TaggedSection::new("Magic-User Spells", "magic_user"),
            ],
            catalog: "All Spells, in Alphabetical Order".to_string(),
            meta_lookahead: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterSections {
    pub part: u32,
    pub end_part: u32,
    /// Blocks inside the part that are not monsters
    pub skip_blocks: Vec<String>,
}

impl Default for MonsterSections {
    fn default() -> Self {
        Self {
            part: 6,
            end_part: 7,
            skip_blocks: strings(&["PART 6: MONSTERS", "Monster Descriptions"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasureSections {
    pub part: u32,
    pub end_part: u32,
    pub treasure_types: Vec<String>,
    /// Blocks whose tables are magic item roll tables
    pub table_sections: Vec<String>,
    /// Blocks whose prose lists magic items
    pub item_categories: Vec<String>,
    /// Item prose is only collected after this block
    pub detail_start: String,
    /// Item names longer than this are flagged as prose-like
    pub prose_name_max_words: usize,
}

impl Default for TreasureSections {
    fn default() -> Self {
        Self {
            part: 7,
            end_part: 8,
            treasure_types: strings(&[
                "Lair Treasures",
                "Individual Treasures",
                "Unguarded Treasures",
            ]),
            table_sections: strings(&[
                "Magic Item Generation",
                "Magic Weapons",
                "Magic Armor",
                "Potions",
                "Scrolls",
                "Wands, Staves and Rods",
                "Miscellaneous Items",
                "Miscellaneous Item Effects",
                "Rare Items",
                "Devices of Summoning Elementals",
            ]),
            item_categories: strings(&[
                "Magic Weapons",
                "Magic Armor",
                "Potions",
                "Scrolls",
                "Wands, Staves and Rods",
                "Miscellaneous Item Effects",
                "Rare Items",
                "Devices of Summoning Elementals",
            ]),
            detail_start: "Using Magic Items".to_string(),
            prose_name_max_words: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSections {
    pub part: u32,
    pub end_part: u32,
    pub races: Vec<String>,
    pub classes: Vec<String>,
}

impl Default for CharacterSections {
    fn default() -> Self {
        Self {
            part: 2,
            end_part: 3,
            races: strings(&["Dwarves", "Elves", "Halflings", "Humans"]),
            classes: strings(&["Cleric", "Fighter", "Magic-User", "Thief"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterSections {
    pub part: u32,
    pub end_part: u32,
    pub dungeon: String,
    pub wilderness: String,
}

impl Default for EncounterSections {
    fn default() -> Self {
        Self {
            part: 8,
            end_part: 9,
            dungeon: "Dungeon Encounters".to_string(),
            wilderness: "Wilderness Encounters".to_string(),
        }
    }
}

/// A Part range and the block names to take tables from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartTables {
    pub part: u32,
    pub end_part: u32,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSections {
    pub sources: Vec<PartTables>,
    /// Provenance stamped on tables re-assembled from other record sets
    pub derived_source_part: u32,
    pub attack_bonus_source_section: String,
    pub saving_throw_source_section: String,
}

impl Default for CombatSections {
    fn default() -> Self {
        Self {
            sources: vec![
                PartTables {
                    part: 2,
                    end_part: 3,
                    sections: strings(&["Missile Weapon Ranges", "Siege Engines"]),
                },
                PartTables {
                    part: 5,
                    end_part: 6,
                    sections: strings(&["Monster Reactions"]),
                },
            ],
            derived_source_part: 5,
            attack_bonus_source_section: "How to Attack".to_string(),
            saving_throw_source_section: "Saving Throw Tables by Class".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Tidy tabs and runs of spaces in every string before scalar conversion
    pub collapse_whitespace: bool,
    /// Ranges spanning more than this many values stay strings
    pub max_range_span: u64,
    pub category_folding: Vec<CategoryFoldingConfig>,
}

/// Header-row folding for one record set: a row with `name_field` set and
/// every tracked field blank becomes the `category` of the rows below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFoldingConfig {
    pub record_set: String,
    pub name_field: String,
    pub tracked_fields: Vec<String>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            max_range_span: 10_000,
            category_folding: vec![CategoryFoldingConfig {
                record_set: "weapons".to_string(),
                name_field: "weapon".to_string(),
                tracked_fields: strings(&["price", "size", "weight", "dmg"]),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// More missing spell-list names than this is a critical issue
    pub spell_missing_critical_threshold: usize,
    pub missing_sample_limit: usize,
    pub unresolved_sample_limit: usize,
    /// Encounter fragments shorter than this are not treated as references
    pub min_fragment_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            spell_missing_critical_threshold: 15,
            missing_sample_limit: 20,
            unresolved_sample_limit: 30,
            min_fragment_len: 3,
        }
    }
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    Default,
    /// The file could not be read or parsed; defaults are in effect.
    Fallback { path: String, reason: String },
}

impl ExtractionConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let load = || -> Result<Self> {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        };
        load().map_err(|source| {
            RulebookError::ConfigLoad {
                path: path.to_string(),
                source,
            }
            .into()
        })
    }

    /// Load config with fallback to default, reporting which one was used
    pub fn load_with_fallback(path: Option<&str>) -> (Self, ConfigSource) {
        let Some(p) = path else {
            return (Self::default(), ConfigSource::Default);
        };
        match Self::load_from_file(p) {
            Ok(config) => (config, ConfigSource::File(p.to_string())),
            Err(err) => {
                log::warn!("{err}; using defaults");
                let source = ConfigSource::Fallback {
                    path: p.to_string(),
                    reason: format!("{err:#}"),
                };
                (Self::default(), source)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
