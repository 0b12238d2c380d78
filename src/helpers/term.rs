use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::HubError;

static NON_ENGLISH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_ /&.]").expect("static regex"));
static SECTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+$").expect("static regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Season {
    Fall,
    Spring,
    Summer,
}

impl Season {
    pub fn code(self) -> &'static str {
        match self {
            Season::Fall => "10",
            Season::Spring => "20",
            Season::Summer => "30",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Fall => "Fall Semester",
            Season::Spring => "Spring Semester",
            Season::Summer => "Summer Session",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "10" => Some(Season::Fall),
            "20" => Some(Season::Spring),
            "30" => Some(Season::Summer),
            _ => None,
        }
    }

    /// Spring runs through May, Summer covers June and July, Fall the rest
    pub fn of_month(month: u32) -> Self {
        if month > 7 {
            Season::Fall
        } else if month < 6 {
            Season::Spring
        } else {
            Season::Summer
        }
    }
}

/// Academic term in the `YYYYSS` format, e.g. `202410` for Fall 2024
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TermCode {
    pub year: i32,
    pub season: Season,
}

impl TermCode {
    pub fn new(year: i32, season: Season) -> Self {
        Self { year, season }
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.season.name(), self.year)
    }
}

impl fmt::Display for TermCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{}", self.year, self.season.code())
    }
}

impl FromStr for TermCode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HubError::InvalidTerm(s.to_string());

        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year = s[..4].parse::<i32>().map_err(|_| invalid())?;
        let season = Season::from_code(&s[4..]).ok_or_else(invalid)?;
        Ok(TermCode { year, season })
    }
}

impl Serialize for TermCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn term_code(today: NaiveDate) -> TermCode {
    TermCode::new(today.year(), Season::of_month(today.month()))
}

/// Term code for the local date at the moment of the call
pub fn current_term_code() -> TermCode {
    let now = Local::now().date_naive();
    let term = term_code(now);
    debug!("Current term for {} is {}", now, term);
    term
}

/// Drops non-English characters and the trailing section number from a course name
pub fn clean_course_name(name: &str) -> String {
    let english = NON_ENGLISH.replace_all(name, "");
    SECTION_NUMBER
        .replace(english.trim(), "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 15).unwrap()
    }

    #[test]
    fn months_map_to_seasons() {
        for month in 8..=12 {
            assert_eq!(term_code(date(2024, month)).to_string(), "202410");
        }
        for month in 1..=5 {
            assert_eq!(term_code(date(2024, month)).to_string(), "202420");
        }
        for month in 6..=7 {
            assert_eq!(term_code(date(2024, month)).to_string(), "202430");
        }
    }

    #[test]
    fn season_boundaries_are_inclusive() {
        let last_spring = NaiveDate::from_ymd_opt(2017, 5, 31).unwrap();
        let first_summer = NaiveDate::from_ymd_opt(2017, 6, 1).unwrap();
        let first_fall = NaiveDate::from_ymd_opt(2017, 8, 1).unwrap();
        assert_eq!(term_code(last_spring).season, Season::Spring);
        assert_eq!(term_code(first_summer).season, Season::Summer);
        assert_eq!(term_code(first_fall).season, Season::Fall);
    }

    #[test]
    fn term_code_parses_and_names() {
        let term: TermCode = "201710".parse().unwrap();
        assert_eq!(term, TermCode::new(2017, Season::Fall));
        assert_eq!(term.name(), "Fall Semester 2017");
        assert_eq!(term.to_string(), "201710");
    }

    #[test]
    fn malformed_term_codes_are_rejected() {
        for bad in ["", "2017", "201740", "20171O", "2017100", "abcd10"] {
            assert!(matches!(bad.parse::<TermCode>(), Err(HubError::InvalidTerm(_))), "{bad}");
        }
    }

    #[test]
    fn course_name_loses_symbols_and_section() {
        assert_eq!(clean_course_name("Intro to C++ 101"), "Intro to C");
        assert_eq!(
            clean_course_name("  Calculus & Analytic Geometry I/II 0302 "),
            "Calculus & Analytic Geometry I/II"
        );
        assert_eq!(clean_course_name("Engl. 101 (Writing)"), "Engl. 101 Writing");
    }

    #[test]
    fn course_name_strips_non_ascii() {
        assert_eq!(clean_course_name("مقدمة Programming 1"), "Programming");
    }

    #[test]
    fn course_name_can_reduce_to_empty() {
        assert_eq!(clean_course_name("+++ 123"), "");
        assert_eq!(clean_course_name(""), "");
    }
}
