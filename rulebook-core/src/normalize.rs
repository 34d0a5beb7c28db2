//! Scalar Normalizer
//!
//! Rewrites every string leaf of a record set: whitespace cleanup first, then
//! comma-grouped integers to numbers and `a-b` ranges to inclusive lists.
//! Record sets with a folding rule then have their category header rows
//! folded into the rows below. Running it on its own output changes nothing.

use crate::config::{CategoryFoldingConfig, NormalizationConfig};
use crate::extractors::RecordSets;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub const VALIDATION_REPORT: &str = "validation_report";

static COMMA_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,3}(?:,[0-9]{3})+$").unwrap());
static INT_RANGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)-([0-9]+)$").unwrap());
static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Tabs and space runs become one space and every line is trimmed. Line
/// breaks are kept, so paragraph separators survive.
pub fn clean_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| HORIZONTAL_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();
    lines.join("\n").trim().to_string()
}

/// `"1,225"` to `1225`. Groups after the first must be exactly three digits.
pub fn parse_comma_int(text: &str) -> Option<u64> {
    if !COMMA_INT.is_match(text) {
        return None;
    }
    text.replace(',', "").parse().ok()
}

/// `"1-3"` to `[1, 2, 3]`, with an end of `00` read as 100. Descending ranges
/// and ranges longer than `max_span` values are not converted.
pub fn parse_numeric_range(text: &str, max_span: u64) -> Option<Vec<u64>> {
    let caps = INT_RANGE.captures(text)?;
    let start: u64 = caps[1].parse().ok()?;
    let mut end: u64 = caps[2].parse().ok()?;
    if end == 0 {
        end = 100;
    }
    if start > end || end - start >= max_span {
        return None;
    }
    Some((start..=end).collect())
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

fn is_category_header(row: &Map<String, Value>, folding: &CategoryFoldingConfig) -> bool {
    !is_blank(row.get(&folding.name_field))
        && folding
            .tracked_fields
            .iter()
            .all(|field| is_blank(row.get(field)))
}

/// Drop category header rows and stamp their name as `category` on the rows
/// that follow, up to the next header. An existing `category` is kept.
pub fn fold_category_headers(rows: Vec<Value>, folding: &CategoryFoldingConfig) -> Vec<Value> {
    let mut out = Vec::with_capacity(rows.len());
    let mut current: Option<Value> = None;

    for mut row in rows {
        if let Value::Object(fields) = &mut row {
            if is_category_header(fields, folding) {
                current = fields.get(&folding.name_field).map(|name| match name {
                    Value::String(text) => Value::String(text.trim().to_string()),
                    other => other.clone(),
                });
                continue;
            }
            if let Some(category) = &current {
                fields
                    .entry("category")
                    .or_insert_with(|| category.clone());
            }
        }
        out.push(row);
    }
    out
}

pub struct ScalarNormalizer<'c> {
    config: &'c NormalizationConfig,
}

impl<'c> ScalarNormalizer<'c> {
    pub fn new(config: &'c NormalizationConfig) -> Self {
        Self { config }
    }

    pub fn normalize_scalar(&self, text: String) -> Value {
        let text = if self.config.collapse_whitespace {
            clean_whitespace(&text)
        } else {
            text
        };
        if let Some(number) = parse_comma_int(&text) {
            return Value::from(number);
        }
        if let Some(range) = parse_numeric_range(&text, self.config.max_range_span) {
            return Value::from(range);
        }
        Value::String(text)
    }

    /// Recurse through mappings and sequences; non-string leaves pass through.
    pub fn normalize_value(&self, value: Value) -> Value {
        match value {
            Value::String(text) => self.normalize_scalar(text),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.normalize_value(item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, self.normalize_value(item)))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn normalize_record_set(&self, name: &str, value: Value) -> Value {
        let normalized = self.normalize_value(value);
        let folding = self
            .config
            .category_folding
            .iter()
            .find(|folding| folding.record_set == name);
        match (folding, normalized) {
            (Some(folding), Value::Array(rows)) => {
                Value::Array(fold_category_headers(rows, folding))
            }
            (_, other) => other,
        }
    }

    /// Normalize every record set in place except the validation report.
    pub fn normalize_all(&self, sets: &mut RecordSets) {
        for (name, value) in sets.iter_mut() {
            if name == VALIDATION_REPORT {
                continue;
            }
            *value = self.normalize_record_set(name, value.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(name: &str, value: Value) -> Value {
        let config = NormalizationConfig::default();
        ScalarNormalizer::new(&config).normalize_record_set(name, value)
    }

    #[test]
    fn ranges_and_comma_integers() {
        let cleaned = normalize(
            "sample",
            json!({
                "level": "1-3",
                "percentile": "98-00",
                "padded": "01-03",
                "xp": "1,225",
                "big": "12,000,000",
                "dice": "1d6",
                "threshold": "8+",
                "descending": "5-2",
                "odd_grouping": "12,34",
                "plain": "42",
            }),
        );
        assert_eq!(cleaned["level"], json!([1, 2, 3]));
        assert_eq!(cleaned["percentile"], json!([98, 99, 100]));
        assert_eq!(cleaned["padded"], json!([1, 2, 3]));
        assert_eq!(cleaned["xp"], json!(1225));
        assert_eq!(cleaned["big"], json!(12_000_000));
        assert_eq!(cleaned["dice"], "1d6");
        assert_eq!(cleaned["threshold"], "8+");
        assert_eq!(cleaned["descending"], "5-2");
        assert_eq!(cleaned["odd_grouping"], "12,34");
        assert_eq!(cleaned["plain"], "42");
    }

    #[test]
    fn wide_ranges_stay_strings() {
        assert_eq!(parse_numeric_range("1-10000", 10_000).map(|r| r.len()), Some(10_000));
        assert_eq!(parse_numeric_range("1-10001", 10_000), None);
        assert_eq!(parse_numeric_range("1-99999999999999999999999", 10_000), None);
    }

    #[test]
    fn whitespace_cleanup_keeps_paragraphs() {
        assert_eq!(
            clean_whitespace("  First\tline   here \n\nSecond  para  "),
            "First line here\n\nSecond para"
        );
        assert_eq!(normalize("x", json!(" 1,000\t")), json!(1000));
    }

    #[test]
    fn weapon_header_rows_fold_into_category() {
        let cleaned = normalize(
            "weapons",
            json!([
                {"weapon": "Axes", "price": "", "size": "", "weight": "", "dmg": ""},
                {"weapon": "Hand Axe", "price": "4 gp", "size": "S", "weight": "5", "dmg": "1d6"},
                {"weapon": "Bows", "price": "", "size": "", "weight": "", "dmg": ""},
                {"weapon": "Shortbow", "price": "25 gp", "size": "M", "weight": "2", "dmg": ""},
            ]),
        );
        let rows = cleaned.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["weapon"], "Hand Axe");
        assert_eq!(rows[0]["category"], "Axes");
        assert_eq!(rows[1]["weapon"], "Shortbow");
        assert_eq!(rows[1]["category"], "Bows");
    }

    #[test]
    fn folding_keeps_existing_category_and_leading_rows() {
        let config = NormalizationConfig::default();
        let rows = fold_category_headers(
            vec![
                json!({"weapon": "Club", "price": "3 gp"}),
                json!({"weapon": "Swords", "price": null}),
                json!({"weapon": "Scimitar", "price": "10 gp", "category": "Curved"}),
                json!({"weapon": "Longsword", "price": "10 gp"}),
            ],
            &config.category_folding[0],
        );
        assert_eq!(rows.len(), 3);
        assert!(rows[0].get("category").is_none());
        assert_eq!(rows[1]["category"], "Curved");
        assert_eq!(rows[2]["category"], "Swords");
    }

    #[test]
    fn folding_only_applies_to_configured_sets() {
        let cleaned = normalize(
            "armor",
            json!([{"weapon": "Axes", "price": "", "size": "", "weight": "", "dmg": ""}]),
        );
        assert_eq!(cleaned.as_array().unwrap().len(), 1);
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let config = NormalizationConfig::default();
        let normalizer = ScalarNormalizer::new(&config);
        let mut sets = RecordSets::new();
        sets.insert(
            "weapons".into(),
            json!([
                {"weapon": "Daggers", "price": "", "size": "", "weight": "", "dmg": ""},
                {"weapon": "Dagger", "price": "2 gp", "size": "S", "weight": "1", "dmg": "1d4"},
            ]),
        );
        sets.insert(
            "class_tables".into(),
            json!({"fighter": [{"level": "1-2", "exp": "2,000", "notes": " a\t b "}]}),
        );
        sets.insert(VALIDATION_REPORT.into(), json!({"notes": ["1-3"]}));

        normalizer.normalize_all(&mut sets);
        let once = sets.clone();
        normalizer.normalize_all(&mut sets);

        assert_eq!(once, sets);
        assert_eq!(sets["class_tables"]["fighter"][0]["level"], json!([1, 2]));
        assert_eq!(sets["class_tables"]["fighter"][0]["notes"], "a b");
        assert_eq!(sets[VALIDATION_REPORT]["notes"][0], "1-3");
        assert_eq!(sets["weapons"][0]["category"], "Daggers");
    }
}
