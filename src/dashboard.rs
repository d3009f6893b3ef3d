//! Everything one dashboard view shows, computed from a single snapshot

use crate::config::KpiSettings;
use crate::gap::{self, GapPlan};
use crate::join::{self, JoinedPublication};
use crate::kpi::{self, GroupKind, KpiRow, round2};
use crate::records::{PublicationRecord, StaffRecord, YearFilter};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Institution-wide figures over distinct titles
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub publications: usize,
    pub total_score: f64,
    pub staff: usize,
    pub average_per_staff: f64,
}

/// Score total of distinct titles in one year
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub publications: usize,
    pub total_score: f64,
}

/// Per-author totals; every row counts, co-authored or not
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthorScore {
    pub name: String,
    pub program: String,
    pub faculty: String,
    pub publications: usize,
    pub total_score: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub year: YearFilter,
    pub years: Vec<i32>,
    pub summary: Summary,
    pub trend: Vec<YearPoint>,
    pub programs: Vec<KpiRow>,
    pub faculties: Vec<KpiRow>,
    pub authors: Vec<AuthorScore>,
    pub mismatches: Vec<PublicationRecord>,
    pub unmatched_authors: Vec<String>,
}

impl Dashboard {
    pub fn build(
        staff: &[StaffRecord],
        publications: &[PublicationRecord],
        year: YearFilter,
        settings: &KpiSettings,
    ) -> Self {
        let outcome = join::resolve(staff, publications);
        let filtered: Vec<&PublicationRecord> =
            publications.iter().filter(|p| year.includes(p.year)).collect();

        Dashboard {
            year,
            years: available_years(publications),
            summary: summarize(staff, &filtered),
            trend: trend(&filtered),
            programs: kpi::aggregate(GroupKind::Program, staff, &outcome.rows, year, settings),
            faculties: kpi::aggregate(GroupKind::Faculty, staff, &outcome.rows, year, settings),
            authors: author_scores(staff, &outcome.rows, year),
            unmatched_authors: outcome.unmatched_authors(),
            mismatches: outcome.mismatches,
        }
    }

    pub fn rows(&self, kind: GroupKind) -> &[KpiRow] {
        match kind {
            GroupKind::Program => &self.programs,
            GroupKind::Faculty => &self.faculties,
        }
    }

    /// Gap plan for one group, if the roster knows it
    pub fn gap(&self, kind: GroupKind, group: &str) -> Option<(&KpiRow, GapPlan)> {
        let row = self.rows(kind).iter().find(|r| r.group == group.trim())?;
        Some((row, gap::plan_for(row)))
    }
}

/// Sorted distinct positive years across all rows
pub fn available_years(publications: &[PublicationRecord]) -> Vec<i32> {
    publications
        .iter()
        .map(|p| p.year)
        .filter(|y| *y > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First row of each distinct title
fn distinct_titles<'a>(rows: &[&'a PublicationRecord]) -> Vec<&'a PublicationRecord> {
    let mut seen = HashSet::new();
    rows.iter()
        .copied()
        .filter(|p| seen.insert(p.title.trim()))
        .collect()
}

fn summarize(staff: &[StaffRecord], filtered: &[&PublicationRecord]) -> Summary {
    let unique = distinct_titles(filtered);
    let total: f64 = unique.iter().map(|p| p.score).sum();
    let headcount = staff
        .iter()
        .map(|s| s.name.trim())
        .filter(|n| !n.is_empty())
        .collect::<HashSet<_>>()
        .len();

    Summary {
        publications: unique.len(),
        total_score: round2(total),
        staff: headcount,
        average_per_staff: round2(total / headcount.max(1) as f64),
    }
}

fn trend(filtered: &[&PublicationRecord]) -> Vec<YearPoint> {
    let mut by_year: BTreeMap<i32, (usize, f64)> = BTreeMap::new();
    for p in distinct_titles(filtered) {
        let entry = by_year.entry(p.year).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += p.score;
    }
    by_year
        .into_iter()
        .filter(|(year, _)| *year > 0)
        .map(|(year, (publications, total))| YearPoint {
            year,
            publications,
            total_score: round2(total),
        })
        .collect()
}

/// Every roster member, highest total first
fn author_scores(
    staff: &[StaffRecord],
    joined: &[JoinedPublication],
    year: YearFilter,
) -> Vec<AuthorScore> {
    let mut totals: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for row in joined
        .iter()
        .filter(|r| r.matched && year.includes(r.publication.year))
    {
        let entry = totals
            .entry(row.publication.author_name.trim())
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += row.publication.score;
    }

    let mut seen = HashSet::new();
    let mut authors: Vec<AuthorScore> = staff
        .iter()
        .filter(|s| seen.insert(s.name.trim()))
        .map(|s| {
            let (publications, total) = totals.get(s.name.trim()).copied().unwrap_or((0, 0.0));
            AuthorScore {
                name: s.name.trim().to_string(),
                program: s.program.clone(),
                faculty: s.faculty.clone(),
                publications,
                total_score: round2(total),
            }
        })
        .collect();
    authors.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.name.cmp(&b.name))
    });
    authors
}
