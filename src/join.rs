//! Attach program and faculty to research rows by author name

use crate::records::{PublicationRecord, StaffRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// A research row with the affiliation of its author, when one was found
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct JoinedPublication {
    pub publication: PublicationRecord,
    pub program: Option<String>,
    pub faculty: Option<String>,
    pub matched: bool,
}

/// Every research row plus the ones whose author is not on the roster
#[derive(Clone, Debug, Default, Serialize)]
pub struct JoinOutcome {
    pub rows: Vec<JoinedPublication>,
    pub mismatches: Vec<PublicationRecord>,
}

impl JoinOutcome {
    /// Distinct unmatched author names, sorted
    pub fn unmatched_authors(&self) -> Vec<String> {
        self.mismatches
            .iter()
            .map(|p| p.author_name.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Exact, case-sensitive match after trimming both sides
///
/// A roster that repeats a name keeps its first entry. An empty program or
/// faculty on the roster stays `None` on the joined row, but the row still
/// counts as matched.
pub fn resolve(staff: &[StaffRecord], publications: &[PublicationRecord]) -> JoinOutcome {
    let mut roster: HashMap<&str, &StaffRecord> = HashMap::with_capacity(staff.len());
    for member in staff {
        let name = member.name.trim();
        if name.is_empty() {
            continue;
        }
        if roster.contains_key(name) {
            log::warn!("Roster lists `{}` more than once; using the first entry", name);
            continue;
        }
        roster.insert(name, member);
    }

    let mut outcome = JoinOutcome::default();
    for publication in publications {
        match roster.get(publication.author_name.trim()) {
            Some(member) => outcome.rows.push(JoinedPublication {
                publication: publication.clone(),
                program: member.program_key().map(str::to_string),
                faculty: member.faculty_key().map(str::to_string),
                matched: true,
            }),
            None => {
                outcome.mismatches.push(publication.clone());
                outcome.rows.push(JoinedPublication {
                    publication: publication.clone(),
                    program: None,
                    faculty: None,
                    matched: false,
                });
            }
        }
    }

    if !outcome.mismatches.is_empty() {
        log::warn!(
            "{} research rows name an author missing from the roster",
            outcome.mismatches.len()
        );
    }
    outcome
}
