//! Sport activity enumerations and display metadata.
//!
//! Same static-table approach as the social platforms: sport display names
//! and emoji live in one table rather than scattered case-dispatch. The
//! "upcoming"/"past" predicates are pure date comparisons.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportType {
    Crossfit,
    Hyrox,
    Running,
    Ocr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunSubType {
    Road,
    Trail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Benchmark,
    Workout,
    Event,
}

pub struct SportMeta {
    pub display_name: &'static str,
    pub emoji: &'static str,
}

pub static SPORT_TABLE: &[(SportType, SportMeta)] = &[
    (SportType::Crossfit, SportMeta { display_name: "Crossfit", emoji: "\u{1F3CB}\u{FE0F}" }),
    (SportType::Hyrox, SportMeta { display_name: "Hyrox", emoji: "\u{26A1}" }),
    (SportType::Running, SportMeta { display_name: "Running", emoji: "\u{1F3C3}" }),
    (SportType::Ocr, SportMeta { display_name: "OCR", emoji: "\u{1F9D7}" }),
];

impl SportType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "crossfit" => Some(SportType::Crossfit),
            "hyrox" => Some(SportType::Hyrox),
            "running" => Some(SportType::Running),
            "ocr" => Some(SportType::Ocr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportType::Crossfit => "crossfit",
            SportType::Hyrox => "hyrox",
            SportType::Running => "running",
            SportType::Ocr => "ocr",
        }
    }

    pub fn meta(&self) -> &'static SportMeta {
        // Every variant has a table row; the fallback is unreachable but
        // keeps the lookup total.
        SPORT_TABLE
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, m)| m)
            .unwrap_or(&SPORT_TABLE[0].1)
    }

    pub fn all_names() -> Vec<&'static str> {
        SPORT_TABLE.iter().map(|(s, _)| s.as_str()).collect()
    }
}

impl RunSubType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "road" => Some(RunSubType::Road),
            "trail" => Some(RunSubType::Trail),
            _ => None,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            RunSubType::Road => "Road",
            RunSubType::Trail => "Trail",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RunSubType::Road => "\u{1F6E3}\u{FE0F}",
            RunSubType::Trail => "\u{26F0}\u{FE0F}",
        }
    }
}

impl ActivityCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "benchmark" => Some(ActivityCategory::Benchmark),
            "workout" => Some(ActivityCategory::Workout),
            "event" => Some(ActivityCategory::Event),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Benchmark => "benchmark",
            ActivityCategory::Workout => "workout",
            ActivityCategory::Event => "event",
        }
    }
}

/// "Trail Running", "OCR", "Crossfit", ... for the stored string pair.
pub fn sport_display_name(sport_type: &str, sub_type: Option<&str>) -> String {
    match SportType::parse(sport_type) {
        Some(SportType::Running) => match sub_type.and_then(RunSubType::parse) {
            Some(sub) => format!("{} Running", sub.badge()),
            None => "Running".to_string(),
        },
        Some(sport) => sport.meta().display_name.to_string(),
        None => capitalize(sport_type),
    }
}

pub fn sport_emoji(sport_type: &str) -> &'static str {
    SportType::parse(sport_type)
        .map(|s| s.meta().emoji)
        .unwrap_or("\u{1F3C5}")
}

/// "21:34 min" style rendering of a result value.
pub fn formatted_value(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{} {}", value, unit)
    }
}

/// Only events can be upcoming; today's event still counts.
pub fn is_upcoming(category: &str, date: NaiveDate, today: NaiveDate) -> bool {
    category == "event" && date >= today
}

pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_sport_parse_includes_ocr() {
        assert_eq!(SportType::parse("ocr"), Some(SportType::Ocr));
        assert_eq!(SportType::parse("swimming"), None);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(sport_display_name("crossfit", None), "Crossfit");
        assert_eq!(sport_display_name("ocr", None), "OCR");
        assert_eq!(sport_display_name("running", None), "Running");
        assert_eq!(sport_display_name("running", Some("trail")), "Trail Running");
        assert_eq!(sport_display_name("running", Some("road")), "Road Running");
    }

    #[test]
    fn test_category_parse_uses_workout_not_result() {
        assert_eq!(ActivityCategory::parse("workout"), Some(ActivityCategory::Workout));
        assert_eq!(ActivityCategory::parse("result"), None);
    }

    #[test]
    fn test_upcoming_requires_event_category() {
        let today = d(2026, 8, 27);
        assert!(is_upcoming("event", d(2026, 9, 1), today));
        assert!(is_upcoming("event", today, today));
        assert!(!is_upcoming("event", d(2026, 8, 1), today));
        assert!(!is_upcoming("workout", d(2026, 9, 1), today));
    }

    #[test]
    fn test_past_is_strictly_before_today() {
        let today = d(2026, 8, 27);
        assert!(is_past(d(2026, 8, 26), today));
        assert!(!is_past(today, today));
        assert!(!is_past(d(2026, 8, 28), today));
    }

    #[test]
    fn test_formatted_value() {
        assert_eq!(formatted_value("21:34", "min"), "21:34 min");
        assert_eq!(formatted_value("42", ""), "42");
    }
}
