//! Attack bonus table parser
//!
//! The attack bonus table is not a real table in the export: its cells are
//! line-broken runs inside the heading paragraph. Each row is a run of level
//! and hit dice tokens closed by a `+N` bonus token, and the run length
//! varies because low and high rows omit some class columns.

use crate::navigation::{find_section, ContentNode};
use crate::text::collapse_whitespace;
use crate::types::AttackBonusRow;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const ATTACK_BONUS: &str = "attack_bonus";

static BONUS_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\d+$").unwrap());

/// Why token consumption stopped before the end of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The sentinel row ran out of tokens before its two values.
    TruncatedSentinelRow { position: usize },
    /// A bonus token appeared where a field run should start.
    BonusWithoutFields { position: usize, token: String },
    /// The stream ended inside a field run.
    UnterminatedRun { position: usize },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::TruncatedSentinelRow { position } => {
                write!(f, "sentinel row at token {position} is missing its values")
            }
            HaltReason::BonusWithoutFields { position, token } => {
                write!(f, "bonus token '{token}' at {position} has no preceding fields")
            }
            HaltReason::UnterminatedRun { position } => {
                write!(f, "field run starting at token {position} has no bonus token")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackBonusParse {
    pub rows: Vec<AttackBonusRow>,
    pub halt: Option<HaltReason>,
}

pub fn is_bonus_token(token: &str) -> bool {
    BONUS_TOKEN.is_match(token)
}

/// Tokens of the attack bonus heading paragraph: text before `terminator`,
/// one token per non-blank line, starting at the first `sentinel` token.
pub fn attack_bonus_tokens(raw_text: &str, terminator: &str, sentinel: &str) -> Vec<String> {
    let block = raw_text.split(terminator).next().unwrap_or_default();
    let lines: Vec<String> = block
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.iter().position(|line| line == sentinel) {
        Some(start) => lines[start..].to_vec(),
        None => Vec::new(),
    }
}

/// Assign a field run to columns by its length.
fn row_from_fields(fields: &[String], bonus: &str) -> Option<AttackBonusRow> {
    let mut row = AttackBonusRow {
        attack_bonus: bonus.to_string(),
        ..AttackBonusRow::default()
    };
    match fields {
        [fighter, cleric_or_thief, magic_user, hit_dice] => {
            row.fighter_level = fighter.clone();
            row.cleric_or_thief_level = cleric_or_thief.clone();
            row.magic_user_level = magic_user.clone();
            row.monster_hit_dice = hit_dice.clone();
        }
        [fighter, cleric_or_thief, hit_dice] => {
            row.fighter_level = fighter.clone();
            row.cleric_or_thief_level = cleric_or_thief.clone();
            row.monster_hit_dice = hit_dice.clone();
        }
        [fighter, hit_dice] => {
            row.fighter_level = fighter.clone();
            row.monster_hit_dice = hit_dice.clone();
        }
        [hit_dice] => row.monster_hit_dice = hit_dice.clone(),
        _ => return None,
    }
    Some(row)
}

/// Consume rows from `tokens`. Parsing stops at the first malformed point and
/// keeps the rows read so far.
pub fn parse_attack_bonus_tokens(tokens: &[String], sentinel: &str) -> AttackBonusParse {
    let mut parse = AttackBonusParse::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if token == sentinel {
            let (Some(hit_dice), Some(bonus)) = (tokens.get(i + 1), tokens.get(i + 2)) else {
                parse.halt = Some(HaltReason::TruncatedSentinelRow { position: i });
                break;
            };
            parse.rows.push(AttackBonusRow {
                fighter_level: sentinel.to_string(),
                monster_hit_dice: hit_dice.clone(),
                attack_bonus: bonus.clone(),
                ..AttackBonusRow::default()
            });
            i += 3;
            continue;
        }

        if is_bonus_token(token) {
            parse.halt = Some(HaltReason::BonusWithoutFields {
                position: i,
                token: token.clone(),
            });
            break;
        }

        let run_start = i;
        while i < tokens.len() && !is_bonus_token(&tokens[i]) {
            i += 1;
        }
        let Some(bonus) = tokens.get(i) else {
            parse.halt = Some(HaltReason::UnterminatedRun { position: run_start });
            break;
        };
        i += 1;

        if let Some(row) = row_from_fields(&tokens[run_start..i - 1], bonus) {
            parse.rows.push(row);
        }
    }

    parse
}

/// Rows of the attack bonus table found under `heading`.
pub fn parse_attack_bonus(
    nodes: &[ContentNode<'_>],
    heading: &str,
    terminator: &str,
    sentinel: &str,
) -> Vec<AttackBonusRow> {
    let Some(idx) = find_section(nodes, heading) else {
        return Vec::new();
    };
    let tokens = attack_bonus_tokens(nodes[idx].raw_text().trim(), terminator, sentinel);
    let parse = parse_attack_bonus_tokens(&tokens, sentinel);
    if let Some(reason) = &parse.halt {
        log::warn!(
            "Attack bonus parse halted after {} rows: {}",
            parse.rows.len(),
            reason
        );
    }
    parse.rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::navigation::{flatten, FontFaceHeadingDetector};

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn sentinel_row_takes_next_two_tokens() {
        let parse = parse_attack_bonus_tokens(&tokens(&["NM", "1", "0"]), "NM");
        assert_eq!(parse.halt, None);
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].fighter_level, "NM");
        assert_eq!(parse.rows[0].monster_hit_dice, "1");
        assert_eq!(parse.rows[0].attack_bonus, "0");
        assert_eq!(parse.rows[0].cleric_or_thief_level, "");
    }

    #[test]
    fn run_length_selects_columns() {
        let parse = parse_attack_bonus_tokens(
            &tokens(&[
                "NM", "1", "+0",
                "1", "1-2", "1-3", "1", "+1",
                "2-3", "3-4", "2", "+2",
                "4", "5", "+3",
                "9", "+4",
            ]),
            "NM",
        );
        assert_eq!(parse.halt, None);
        assert_eq!(parse.rows.len(), 5);

        let four = &parse.rows[1];
        assert_eq!(
            (
                four.fighter_level.as_str(),
                four.cleric_or_thief_level.as_str(),
                four.magic_user_level.as_str(),
                four.monster_hit_dice.as_str(),
                four.attack_bonus.as_str(),
            ),
            ("1", "1-2", "1-3", "1", "+1")
        );

        let three = &parse.rows[2];
        assert_eq!(three.cleric_or_thief_level, "3-4");
        assert_eq!(three.magic_user_level, "");
        assert_eq!(three.monster_hit_dice, "2");

        let two = &parse.rows[3];
        assert_eq!((two.fighter_level.as_str(), two.monster_hit_dice.as_str()), ("4", "5"));

        let one = &parse.rows[4];
        assert_eq!((one.fighter_level.as_str(), one.monster_hit_dice.as_str()), ("", "9"));
    }

    #[test]
    fn overlong_run_is_skipped_not_fatal() {
        let parse = parse_attack_bonus_tokens(
            &tokens(&["a", "b", "c", "d", "e", "+1", "7", "+2"]),
            "NM",
        );
        assert_eq!(parse.halt, None);
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.rows[0].monster_hit_dice, "7");
    }

    #[test]
    fn bonus_in_field_position_halts() {
        let parse = parse_attack_bonus_tokens(
            &tokens(&["NM", "1", "+0", "2", "+1", "+2", "3", "+3"]),
            "NM",
        );
        assert_eq!(parse.rows.len(), 2);
        assert_eq!(
            parse.halt,
            Some(HaltReason::BonusWithoutFields {
                position: 5,
                token: "+2".to_string()
            })
        );
    }

    #[test]
    fn truncated_streams_halt() {
        let parse = parse_attack_bonus_tokens(&tokens(&["NM", "1"]), "NM");
        assert!(parse.rows.is_empty());
        assert_eq!(parse.halt, Some(HaltReason::TruncatedSentinelRow { position: 0 }));

        let parse = parse_attack_bonus_tokens(&tokens(&["NM", "1", "+0", "1", "2"]), "NM");
        assert_eq!(parse.rows.len(), 1);
        assert_eq!(parse.halt, Some(HaltReason::UnterminatedRun { position: 3 }));
    }

    #[test]
    fn tokens_start_at_sentinel_and_stop_at_terminator() {
        let raw = "Attack Bonus Table\nFighter\n  Level \n\nNM\n1\n+0\nTo roll \"to hit,\" the player\n2\n";
        assert_eq!(
            attack_bonus_tokens(raw, "To roll \"to hit,\"", "NM"),
            tokens(&["NM", "1", "+0"])
        );
        assert!(attack_bonus_tokens("no sentinel here", "To roll", "NM").is_empty());
    }

    #[test]
    fn parses_from_heading_paragraph() {
        let heading = Element::new("p")
            .with_child(
                Element::new("font")
                    .with_attr("face", "SoutaneBlack")
                    .with_text("Attack Bonus Table"),
            )
            .with_child(Element::new("br"))
            .with_text("NM")
            .with_child(Element::new("br"))
            .with_text("Up to 1")
            .with_child(Element::new("br"))
            .with_text("+0")
            .with_child(Element::new("br"))
            .with_text("1")
            .with_child(Element::new("br"))
            .with_text("1")
            .with_child(Element::new("br"))
            .with_text("+1");
        let body = Element::new("body").with_child(heading);
        let detector = FontFaceHeadingDetector::default();
        let nodes: Vec<_> = flatten(&body, &detector).collect();

        let rows = parse_attack_bonus(&nodes, "Attack Bonus Table", "To roll \"to hit,\"", "NM");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].monster_hit_dice, "Up to 1");
        assert_eq!(rows[1].fighter_level, "1");
        assert_eq!(rows[1].monster_hit_dice, "1");
        assert!(parse_attack_bonus(&nodes, "Missing", "x", "NM").is_empty());
    }
}
