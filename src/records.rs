//! Staff and publication records as they appear in the workbook tables,
//! plus the journal tiers, publication keys and year filter built on them

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref TCI_REGEX: Regex = Regex::new(r"(?i)^tci\s*(?:group)?\s*-?\s*([12])$").unwrap();
    static ref SCOPUS_REGEX: Regex =
        Regex::new(r"(?i)^scopus(?:\s*-?\s*q[1-4](?:\s*-\s*q?[1-4])?)?$").unwrap();
}

/// Journal database classification of a publication
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum JournalTier {
    Scopus,
    TciGroup1,
    TciGroup2,
}

impl JournalTier {
    /// Every tier, highest score first
    pub const ALL: [JournalTier; 3] = [
        JournalTier::Scopus,
        JournalTier::TciGroup1,
        JournalTier::TciGroup2,
    ];

    pub fn score(&self) -> f64 {
        match self {
            JournalTier::Scopus => 1.0,
            JournalTier::TciGroup1 => 0.8,
            JournalTier::TciGroup2 => 0.6,
        }
    }

    /// Label written to the research table
    pub fn label(&self) -> &'static str {
        match self {
            JournalTier::Scopus => "Scopus Q1-4",
            JournalTier::TciGroup1 => "TCI Group 1",
            JournalTier::TciGroup2 => "TCI Group 2",
        }
    }

    /// Accepts the canonical labels and the short forms found in older sheets
    /// ("TCI1", "TCI-2", "Scopus Q3").
    ///
    /// # Arguments
    /// * `label` - Tier text as typed or stored, surrounding spaces ignored
    ///
    /// # Returns
    /// * `Option<JournalTier>` - The tier, or None for an unknown database
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(caps) = TCI_REGEX.captures(label) {
            return match &caps[1] {
                "1" => Some(JournalTier::TciGroup1),
                _ => Some(JournalTier::TciGroup2),
            };
        }
        if SCOPUS_REGEX.is_match(label) {
            return Some(JournalTier::Scopus);
        }
        None
    }
}

impl fmt::Display for JournalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the masters table
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct StaffRecord {
    pub name: String,
    pub program: String,
    pub faculty: String,
}

impl StaffRecord {
    pub fn create(name: &str, program: &str, faculty: &str) -> Self {
        StaffRecord {
            name: name.trim().to_string(),
            program: program.trim().to_string(),
            faculty: faculty.trim().to_string(),
        }
    }

    /// Program code, or None for blank and placeholder entries
    pub fn program_key(&self) -> Option<&str> {
        group_key(&self.program)
    }

    pub fn faculty_key(&self) -> Option<&str> {
        group_key(&self.faculty)
    }
}

fn group_key(value: &str) -> Option<&str> {
    let value = value.trim();
    match value {
        "" | "-" | "--" | "N/A" => None,
        _ => Some(value),
    }
}

/// One row of the research table
///
/// A publication with several staff authors is stored as several rows that
/// differ only in `author_name`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PublicationRecord {
    pub title: String,
    pub year: i32,
    pub journal_tier: String,
    pub score: f64,
    pub author_name: String,
    #[serde(default)]
    pub external_author: Option<String>,
}

impl PublicationRecord {
    pub fn create(title: &str, year: i32, tier: JournalTier, author_name: &str) -> Self {
        PublicationRecord {
            title: title.trim().to_string(),
            year,
            journal_tier: tier.label().to_string(),
            score: tier.score(),
            author_name: author_name.trim().to_string(),
            external_author: None,
        }
    }

    pub fn key(&self) -> PublicationKey {
        PublicationKey {
            title: self.title.trim().to_string(),
            year: Some(self.year),
            journal_tier: Some(self.journal_tier.trim().to_string()),
        }
    }
}

/// Identity of a publication across its co-author rows
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct PublicationKey {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub journal_tier: Option<String>,
}

impl PublicationKey {
    pub fn by_title(title: &str) -> Self {
        PublicationKey {
            title: title.trim().to_string(),
            year: None,
            journal_tier: None,
        }
    }

    /// True when the record has this title and, where set, this year and tier.
    /// A `None` year or tier matches any value.
    pub fn matches(&self, record: &PublicationRecord) -> bool {
        if record.title.trim() != self.title.trim() {
            return false;
        }
        if let Some(year) = self.year {
            if record.year != year {
                return false;
            }
        }
        if let Some(tier) = &self.journal_tier {
            if record.journal_tier.trim() != tier.trim() {
                return false;
            }
        }
        true
    }

    /// Selection label "{year} | {title} | {tier}"
    pub fn label(&self) -> String {
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        let tier = self.journal_tier.clone().unwrap_or_default();
        format!("{} | {} | {}", year, self.title, tier)
    }

    /// Inverse of `label`. The title sits between the first and the last
    /// separator so titles containing " | " survive.
    ///
    /// # Arguments
    /// * `label` - A "{year} | {title} | {tier}" selection label
    ///
    /// # Returns
    /// * `Option<PublicationKey>` - None when a separator or the title is missing
    ///   or the year is not a number. An empty tier segment stays `Some("")` so
    ///   it selects only rows with a blank tier.
    pub fn from_label(label: &str) -> Option<Self> {
        let (year, rest) = label.split_once(" | ")?;
        let (title, tier) = rest.rsplit_once(" | ")?;
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let year = year.trim();
        let year = if year.is_empty() {
            None
        } else {
            Some(year.parse::<i32>().ok()?)
        };
        let tier = tier.trim();

        Some(PublicationKey {
            title: title.to_string(),
            year,
            journal_tier: Some(tier.to_string()),
        })
    }
}

impl fmt::Display for PublicationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Year selection applied before aggregation
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    /// Query-string form of the filter.
    ///
    /// # Arguments
    /// * `value` - The `year` query value, if present
    ///
    /// # Returns
    /// * `YearFilter` - `All` for a missing, empty, "All" or unparsable value
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => YearFilter::All,
            Some(v) if v.eq_ignore_ascii_case("all") => YearFilter::All,
            Some(v) => v.parse().map(YearFilter::Year).unwrap_or(YearFilter::All),
        }
    }

    pub fn includes(&self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => *y == year,
        }
    }

    pub fn as_query(&self) -> String {
        match self {
            YearFilter::All => "All".to_string(),
            YearFilter::Year(y) => y.to_string(),
        }
    }
}

/// Lenient number parsing used for sheet cells: anything unreadable is zero
pub fn coerce_f64(value: &str) -> f64 {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub fn coerce_year(value: &str) -> i32 {
    let value = value.trim();
    value
        .parse::<i32>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i32))
        .unwrap_or(0)
}
