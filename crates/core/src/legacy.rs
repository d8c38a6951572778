//! Lenient readers for exported documents.
//!
//! Older exports abbreviate game fields (`h`, `a`, `hs`, `as`) and key
//! penalties by a single `"{championship}_{season}_{team}"` string. These
//! readers accept both shapes and normalize them to the canonical types.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    document::{Game, MatchdayBlock, PenaltyEntry, PenaltyKey},
    error::CoreError,
};

/// Deserialize a top-level section, treating an absent or null section as empty.
pub fn section<T: DeserializeOwned + Default>(root: &Value, name: &str) -> Result<T, CoreError> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| CoreError::Serialization(format!("section `{name}`: {e}"))),
    }
}

/// The `matches` section as raw blocks, so each can fail on its own.
pub fn raw_blocks(root: &Value) -> Result<Vec<Value>, CoreError> {
    match root.get("matches") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(blocks)) => Ok(blocks.clone()),
        Some(other) => Err(CoreError::InvalidData(format!(
            "`matches` must be an array, found {}",
            kind(other)
        ))),
    }
}

pub fn parse_block(value: &Value) -> Result<MatchdayBlock, CoreError> {
    let context = describe_block(value);
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::InvalidData(format!("matchday block is {}", kind(value))))?;

    let championship = match obj.get("championship") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            return Err(CoreError::InvalidData(format!("blank championship in {context}")));
        }
        _ => {
            return Err(CoreError::MissingField {
                field: "championship",
                context,
            });
        }
    };
    let season = required_int(obj.get("season"), "season", &context)?;
    let matchday = required_int(obj.get("matchday"), "matchday", &context)?;
    let exempt = optional_text(first_of(obj, &["exempt", "exemptTeam"]), "exempt", &context)?;

    let games = match obj.get("games") {
        Some(Value::Array(games)) => games
            .iter()
            .map(|g| parse_game(g, &context))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(CoreError::InvalidData(format!(
                "`games` in {context} is {}",
                kind(other)
            )));
        }
        None => {
            return Err(CoreError::MissingField {
                field: "games",
                context,
            });
        }
    };

    Ok(MatchdayBlock {
        championship,
        season,
        matchday,
        exempt,
        games,
    })
}

fn parse_game(value: &Value, context: &str) -> Result<Game, CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::InvalidData(format!("game in {context} is {}", kind(value))))?;

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(CoreError::InvalidData(format!(
                "game id in {context} is {}",
                kind(other)
            )));
        }
    };

    Ok(Game {
        id,
        home_team: optional_text(first_of(obj, &["homeTeam", "h"]), "homeTeam", context)?
            .unwrap_or_default(),
        away_team: optional_text(first_of(obj, &["awayTeam", "a"]), "awayTeam", context)?
            .unwrap_or_default(),
        home_score: optional_int(first_of(obj, &["homeScore", "hs"]), "homeScore", context)?,
        away_score: optional_int(first_of(obj, &["awayScore", "as"]), "awayScore", context)?,
    })
}

/// Penalties in either the structured list form or the legacy string-keyed map.
pub fn parse_penalties(root: &Value) -> Result<Vec<(PenaltyKey, i64)>, CoreError> {
    match root.get("penalties") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(_)) => {
            let entries: Vec<PenaltyEntry> = section(root, "penalties")?;
            Ok(entries
                .into_iter()
                .map(|e| (PenaltyKey::new(e.championship, e.season, e.team_name), e.points))
                .collect())
        }
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, points)| {
                let points = points.as_i64().ok_or_else(|| {
                    CoreError::InvalidData(format!("penalty `{key}` has non-integer points"))
                })?;
                Ok((parse_penalty_key(key)?, points))
            })
            .collect(),
        Some(other) => Err(CoreError::InvalidData(format!(
            "`penalties` must be an array or object, found {}",
            kind(other)
        ))),
    }
}

/// Split a legacy `"{championship}_{season}_{team}"` key at its first two
/// underscores. The team name keeps any further underscores; a championship
/// containing one cannot be recovered and fails on the season parse.
pub fn parse_penalty_key(key: &str) -> Result<PenaltyKey, CoreError> {
    let invalid = || CoreError::InvalidData(format!("malformed penalty key `{key}`"));

    let (championship, rest) = key.split_once('_').ok_or_else(invalid)?;
    let (season, team_name) = rest.split_once('_').ok_or_else(invalid)?;
    if championship.is_empty() || team_name.is_empty() {
        return Err(invalid());
    }
    let season: i64 = season.parse().map_err(|_| invalid())?;

    Ok(PenaltyKey::new(championship, season, team_name))
}

/// Best-effort coordinates for log lines about a block that may not parse.
pub fn describe_block(value: &Value) -> String {
    let field = |name: &str| match value.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "?".to_string(),
    };
    format!(
        "{} s{} md{}",
        field("championship"),
        field("season"),
        field("matchday")
    )
}

fn first_of<'a>(obj: &'a serde_json::Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n))
}

fn required_int(value: Option<&Value>, field: &'static str, context: &str) -> Result<i64, CoreError> {
    optional_int(value, field, context)?.ok_or_else(|| CoreError::MissingField {
        field,
        context: context.to_string(),
    })
}

fn optional_int(value: Option<&Value>, field: &str, context: &str) -> Result<Option<i64>, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| CoreError::InvalidData(format!("`{field}` in {context} is not an integer"))),
        // Hand-edited exports sometimes quote numbers.
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::InvalidData(format!("`{field}` in {context} is not an integer: {s:?}"))),
        Some(other) => Err(CoreError::InvalidData(format!(
            "`{field}` in {context} is {}",
            kind(other)
        ))),
    }
}

fn optional_text(value: Option<&Value>, field: &str, context: &str) -> Result<Option<String>, CoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CoreError::InvalidData(format!(
            "`{field}` in {context} is {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
