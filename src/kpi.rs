//! KPI aggregation per program and per faculty
//!
//! For a group with deduplicated score total `T`, headcount `n` and target
//! denominator `x`:
//!
//! ```text
//! kpi = ((T / n) * 100 / x) * 5
//! ```
//!
//! optionally capped at 5.0, then rounded to two decimals. Every group on
//! the roster appears in the output, with `kpi = 0.0` when it has no
//! publications.

use crate::config::{HeadcountMode, KpiSettings};
use crate::join::JoinedPublication;
use crate::records::{StaffRecord, YearFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Highest KPI a group can reach
pub const KPI_MAX: f64 = 5.0;

/// Doctoral program with the highest target
pub const DOCTORAL_PROGRAM: &str = "Ph.D-Admin";

/// Graduate programs with a target of 40
pub const GRADUATE_PROGRAMS: [&str; 6] = [
    "G-Dip TH",
    "G-Dip Inter",
    "M.Ed-Admin",
    "M.Ed-LMS",
    "MBA",
    "MPH",
];

/// Faculties with a target of 30
pub const HEALTH_FACULTIES: [&str; 2] = ["Public Health", "Nursing"];

/// The grouping dimension of a KPI table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Program,
    Faculty,
}

impl GroupKind {
    /// Accepts singular and plural forms ("program", "programs")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "program" | "programs" => Some(GroupKind::Program),
            "faculty" | "faculties" => Some(GroupKind::Faculty),
            _ => None,
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            GroupKind::Program => "programs",
            GroupKind::Faculty => "faculties",
        }
    }

    /// Denominator `x` (programs) or `y` (faculties) for a group
    pub fn target(&self, group: &str) -> u32 {
        match self {
            GroupKind::Program => program_target(group),
            GroupKind::Faculty => faculty_target(group),
        }
    }

    fn key<'a>(&self, staff: &'a StaffRecord) -> Option<&'a str> {
        match self {
            GroupKind::Program => staff.program_key(),
            GroupKind::Faculty => staff.faculty_key(),
        }
    }

    fn joined_key<'a>(&self, row: &'a JoinedPublication) -> Option<&'a str> {
        match self {
            GroupKind::Program => row.program.as_deref(),
            GroupKind::Faculty => row.faculty.as_deref(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Program => f.write_str("program"),
            GroupKind::Faculty => f.write_str("faculty"),
        }
    }
}

pub fn program_target(program: &str) -> u32 {
    let program = program.trim();
    if program == DOCTORAL_PROGRAM {
        60
    } else if GRADUATE_PROGRAMS.contains(&program) {
        40
    } else {
        20
    }
}

pub fn faculty_target(faculty: &str) -> u32 {
    if HEALTH_FACULTIES.contains(&faculty.trim()) {
        30
    } else {
        20
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scale a deduplicated score total to the 0-5 range
///
/// A zero headcount is treated as one.
pub fn kpi_score(total_score: f64, headcount: u32, target: u32, clamp: bool) -> f64 {
    let n = headcount.max(1) as f64;
    let x = target.max(1) as f64;
    let raw = ((total_score / n) * 100.0 / x) * 5.0;
    let kpi = if clamp { raw.min(KPI_MAX) } else { raw };
    round2(kpi.max(0.0))
}

/// One line of a program or faculty KPI table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KpiRow {
    pub kind: GroupKind,
    pub group: String,
    /// Faculty the program belongs to; None on faculty rows
    pub faculty: Option<String>,
    pub headcount: u32,
    pub target: u32,
    /// Distinct titles counted for the group
    pub publications: usize,
    pub total_score: f64,
    pub kpi: f64,
}

/// Headcount per group, from the roster or the frozen tables
pub fn headcounts(
    kind: GroupKind,
    staff: &[StaffRecord],
    settings: &KpiSettings,
) -> BTreeMap<String, u32> {
    let mut members: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for s in staff {
        if let Some(group) = kind.key(s) {
            members.entry(group).or_default().insert(s.name.trim());
        }
    }

    let fixed = match kind {
        GroupKind::Program => &settings.fixed_programs,
        GroupKind::Faculty => &settings.fixed_faculties,
    };

    members
        .into_iter()
        .map(|(group, names)| {
            let roster_count = names.len() as u32;
            let n = match settings.headcount {
                HeadcountMode::Roster => roster_count,
                HeadcountMode::Fixed => fixed.get(group).copied().unwrap_or(roster_count),
            };
            (group.to_string(), n.max(1))
        })
        .collect()
}

/// Build the KPI table for one grouping
///
/// Rows are deduplicated on `(title, group)` so co-authors from the same
/// group count a paper once. Rows are returned in group-name order.
pub fn aggregate(
    kind: GroupKind,
    staff: &[StaffRecord],
    joined: &[JoinedPublication],
    year: YearFilter,
    settings: &KpiSettings,
) -> Vec<KpiRow> {
    let counts = headcounts(kind, staff, settings);

    let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
    if kind == GroupKind::Program {
        for s in staff {
            if let (Some(program), Some(faculty)) = (s.program_key(), s.faculty_key()) {
                parent.entry(program).or_insert(faculty);
            }
        }
    }

    let mut totals: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for row in joined.iter().filter(|r| year.includes(r.publication.year)) {
        let Some(group) = kind.joined_key(row) else {
            continue;
        };
        if !seen.insert((row.publication.title.trim(), group)) {
            continue;
        }
        let entry = totals.entry(group).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += row.publication.score;
    }

    counts
        .into_iter()
        .map(|(group, headcount)| {
            let (publications, total) = totals.get(group.as_str()).copied().unwrap_or((0, 0.0));
            let target = kind.target(&group);
            KpiRow {
                kind,
                faculty: parent.get(group.as_str()).map(|f| f.to_string()),
                headcount,
                target,
                publications,
                total_score: (total * 10_000.0).round() / 10_000.0,
                kpi: kpi_score(total, headcount, target, settings.clamp),
                group,
            }
        })
        .collect()
}
