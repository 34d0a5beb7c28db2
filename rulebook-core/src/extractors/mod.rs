// Heuristic domain extractors - one module per entity family:
// - engine.rs: Extractor trait, ExtractionEngine and shared helpers
// - rules_tables.rs: equipment, class, saving throw and turning undead tables
// - attack_bonus.rs: token-stream parser for the attack bonus table
// - spells.rs: spell lists and the alphabetical spell catalog
// - monsters.rs: monster stat blocks and descriptions
// - treasure.rs: treasure types, magic item tables and item prose
// - characters.rs: race and class write-ups
// - encounters.rs: dungeon and wilderness encounter tables
// - combat.rs: combat reference tables, partly derived from other record sets

pub mod attack_bonus;
pub mod characters;
pub mod combat;
pub mod encounters;
pub mod engine;
pub mod monsters;
pub mod rules_tables;
pub mod spells;
pub mod treasure;

pub use engine::*;
