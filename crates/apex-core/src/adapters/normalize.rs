//! Field extraction and heuristics shared by every provider adapter.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::{Abbreviation, GameStatus, GameType, TeamRecord, TeamRef, UtcDateTime};

/// First tokens that start a two-word city name.
const CITY_PREFIXES: &[&str] = &[
    "los", "las", "new", "san", "santa", "st.", "st", "saint", "golden", "oklahoma", "kansas",
    "tampa", "green", "salt", "bay",
];

/// Short forms some providers use for well-known teams.
const TEAM_ALIASES: &[(&str, &str)] = &[
    ("la lakers", "Los Angeles Lakers"),
    ("la clippers", "Los Angeles Clippers"),
    ("gs warriors", "Golden State Warriors"),
    ("ny knicks", "New York Knicks"),
    ("phila 76ers", "Philadelphia 76ers"),
    ("no pelicans", "New Orleans Pelicans"),
    ("sa spurs", "San Antonio Spurs"),
    ("okc thunder", "Oklahoma City Thunder"),
];

const CANCELLED_TERMS: &[&str] = &["cancel", "abandoned"];
const POSTPONED_TERMS: &[&str] = &["postponed", "delayed", "suspended"];
const FINISHED_TERMS: &[&str] = &["final", "completed", "complete", "finished", "full time", "ended"];
const LIVE_TERMS: &[&str] = &[
    "in progress",
    "in_progress",
    "live",
    "halftime",
    "half time",
    "qtr",
    "quarter",
    "period",
    "overtime",
    "inning",
];

/// Short soccer/hockey status codes that only match as the whole string.
const EXACT_STATUS_CODES: &[(&str, GameStatus)] = &[
    ("ft", GameStatus::Finished),
    ("aet", GameStatus::Finished),
    ("pen", GameStatus::Finished),
    ("ht", GameStatus::Live),
    ("1h", GameStatus::Live),
    ("2h", GameStatus::Live),
    ("canc", GameStatus::Cancelled),
    ("pst", GameStatus::Postponed),
];

/// String at a JSON pointer. Numbers are rendered; blanks count as absent.
pub fn str_at(raw: &Value, pointer: &str) -> Option<String> {
    match raw.pointer(pointer)? {
        Value::String(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Unsigned integer at a JSON pointer, accepting numeric strings.
pub fn u32_at(raw: &Value, pointer: &str) -> Option<u32> {
    match raw.pointer(pointer)? {
        Value::Number(number) => number.as_u64().and_then(|value| u32::try_from(value).ok()),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Float at a JSON pointer, accepting numeric strings.
pub fn f64_at(raw: &Value, pointer: &str) -> Option<f64> {
    let value = match raw.pointer(pointer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    };
    value.filter(|value: &f64| value.is_finite())
}

pub fn bool_at(raw: &Value, pointer: &str) -> Option<bool> {
    match raw.pointer(pointer)? {
        Value::Bool(value) => Some(*value),
        Value::String(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "active" | "1" => Some(true),
            "false" | "no" | "inactive" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Expands provider short forms such as `LA Lakers`.
pub fn expand_team_alias(name: &str) -> String {
    let trimmed = name.trim();
    let lowered = trimmed.to_ascii_lowercase();
    TEAM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map_or_else(|| trimmed.to_owned(), |(_, full)| (*full).to_owned())
}

/// City implied by a display name: two tokens after a known prefix, else one.
pub fn derive_city(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => String::new(),
        [first, second, ..] if CITY_PREFIXES.contains(&first.to_ascii_lowercase().as_str()) => {
            format!("{first} {second}")
        }
        [first, ..] => (*first).to_owned(),
    }
}

/// Initials of the name truncated to three, or the first three letters of
/// the city when the name has fewer than three tokens.
pub fn derive_abbreviation(name: &str, city: &str) -> Option<Abbreviation> {
    let initials: String = name
        .split_whitespace()
        .filter_map(|token| token.chars().find(char::is_ascii_alphanumeric))
        .collect();

    let candidate = if initials.len() >= 3 {
        initials.chars().take(3).collect()
    } else {
        let city_letters: String = city
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(3)
            .collect();
        if city_letters.is_empty() {
            initials
        } else {
            city_letters
        }
    };

    Abbreviation::new(&candidate).ok()
}

/// Provider abbreviation when valid, otherwise the derived one.
pub fn resolve_abbreviation(provided: Option<&str>, name: &str, city: &str) -> Option<Abbreviation> {
    provided
        .and_then(|value| Abbreviation::new(value).ok())
        .or_else(|| derive_abbreviation(name, city))
}

/// Team reference with a best-effort abbreviation.
pub fn team_ref(id: Option<String>, name: Option<String>, abbreviation: Option<String>) -> TeamRef {
    let name = name.map(|name| expand_team_alias(&name));
    let abbreviation = abbreviation
        .and_then(|value| Abbreviation::new(&value).ok())
        .or_else(|| {
            name.as_deref()
                .and_then(|name| derive_abbreviation(name, &derive_city(name)))
        });
    TeamRef {
        id,
        name,
        abbreviation,
    }
}

/// Maps free-form provider status text onto the canonical status.
pub fn parse_status(text: &str) -> GameStatus {
    let lowered = text.trim().to_ascii_lowercase();

    if let Some((_, status)) = EXACT_STATUS_CODES.iter().find(|(code, _)| *code == lowered) {
        return *status;
    }

    let vocabularies = [
        (GameStatus::Cancelled, CANCELLED_TERMS),
        (GameStatus::Postponed, POSTPONED_TERMS),
        (GameStatus::Finished, FINISHED_TERMS),
        (GameStatus::Live, LIVE_TERMS),
    ];
    vocabularies
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| lowered.contains(term)))
        .map_or(GameStatus::Scheduled, |(status, _)| *status)
}

pub fn parse_game_type(text: &str) -> GameType {
    let lowered = text.trim().to_ascii_lowercase();
    if lowered.contains("pre") || lowered.contains("exhibition") {
        GameType::Preseason
    } else if lowered.contains("post") || lowered.contains("playoff") || lowered.contains("final") {
        GameType::Postseason
    } else if lowered.contains("regular") || lowered == "2" {
        GameType::Regular
    } else {
        GameType::Other
    }
}

/// Parses a provider date, returning the calendar day and, when the input
/// carries a time of day, the UTC instant.
pub fn parse_date(text: &str) -> Option<(Date, Option<UtcDateTime>)> {
    let text = text.trim();

    if let Ok(value) = OffsetDateTime::parse(text, &Rfc3339) {
        let utc = UtcDateTime::from_offset_datetime(value);
        return Some((utc.into_inner().date(), Some(utc)));
    }

    let primitive = PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day]T[hour]:[minute]Z"))
        .or_else(|_| {
            PrimitiveDateTime::parse(
                text,
                format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            )
        });
    if let Ok(value) = primitive {
        let utc = UtcDateTime::from_offset_datetime(value.assume_utc());
        return Some((value.date(), Some(utc)));
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(text, format_description!("[month]/[day]/[year]")))
        .or_else(|_| {
            Date::parse(
                text,
                format_description!("[month padding:none]/[day padding:none]/[year]"),
            )
        })
        .ok()
        .map(|date| (date, None))
}

/// Splits or joins player names so all three forms are present.
pub fn player_names(
    full: Option<String>,
    first: Option<String>,
    last: Option<String>,
) -> Option<(String, String, String)> {
    match (full, first, last) {
        (Some(full), Some(first), Some(last)) => Some((full, first, last)),
        (Some(full), _, _) => {
            let mut tokens = full.split_whitespace();
            let first = tokens.next()?.to_owned();
            let last = tokens.collect::<Vec<_>>().join(" ");
            Some((full, first, last))
        }
        (None, Some(first), last) => {
            let last = last.unwrap_or_default();
            let full = if last.is_empty() {
                first.clone()
            } else {
                format!("{first} {last}")
            };
            Some((full, first, last))
        }
        (None, None, Some(last)) => Some((last.clone(), String::new(), last)),
        (None, None, None) => None,
    }
}

/// American moneyline: `+150` -> 150.0, `-110` -> -110.0; `N/A`, `TBD` and
/// blanks are absent.
pub fn parse_moneyline(text: &str) -> Option<f64> {
    let cleaned = clean_odds_text(text)?;
    let numeric: String = cleaned
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(*ch, '-' | '+' | '.'))
        .collect();
    numeric
        .trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// First signed decimal in a spread or total string (`O 220.5` -> 220.5).
/// A pick'em spread (`PK`) is 0.0.
pub fn parse_line(text: &str) -> Option<f64> {
    let cleaned = clean_odds_text(text)?;
    if matches!(cleaned.to_ascii_lowercase().as_str(), "pk" | "pick" | "even") {
        return Some(0.0);
    }

    let chars: Vec<char> = cleaned.chars().collect();
    let start = chars.iter().enumerate().position(|(index, ch)| {
        ch.is_ascii_digit()
            || (matches!(*ch, '-' | '+')
                && chars.get(index + 1).is_some_and(char::is_ascii_digit))
    })?;

    let mut end = start + 1;
    let mut seen_dot = false;
    while let Some(ch) = chars.get(end) {
        if ch.is_ascii_digit() {
            end += 1;
        } else if *ch == '.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }

    chars[start..end]
        .iter()
        .collect::<String>()
        .trim_start_matches('+')
        .trim_end_matches('.')
        .parse()
        .ok()
}

/// Record summary such as `45-37` or `10-5-2` (wins-losses-ties).
pub fn parse_record(summary: &str) -> Option<TeamRecord> {
    let parts: Vec<u32> = summary
        .trim()
        .split('-')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [wins, losses] => Some(TeamRecord::new(*wins, *losses, 0, None)),
        [wins, losses, ties] => Some(TeamRecord::new(*wins, *losses, *ties, None)),
        _ => None,
    }
}

fn clean_odds_text(text: &str) -> Option<String> {
    let cleaned = text.trim().replace('\u{2212}', "-");
    match cleaned.to_ascii_lowercase().as_str() {
        "" | "n/a" | "na" | "tbd" | "-" | "off" => None,
        _ => Some(cleaned),
    }
}
