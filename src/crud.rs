//! Submitting and deleting publications
//!
//! Both operations write through the `CachedStore`, which drops its cached
//! tables afterwards.

use crate::cache::CachedStore;
use crate::config::DuplicatePolicy;
use crate::error::{KpiError, Result};
use crate::records::{JournalTier, PublicationKey, PublicationRecord};
use crate::store::ResearchStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A publication as entered on the submit form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub title: String,
    pub year: i32,
    /// Tier label, e.g. "TCI Group 1"
    pub journal_tier: String,
    /// Staff names, one research row each
    pub authors: Vec<String>,
    #[serde(default)]
    pub external_author: Option<String>,
}

/// Result of a successful submit
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub title: String,
    pub score: f64,
    pub rows_appended: usize,
}

impl Submission {
    /// Check the form and expand it into one row per distinct author
    pub fn into_rows(self, roster: &BTreeSet<String>) -> Result<Vec<PublicationRecord>> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(KpiError::Validation("title cannot be empty".to_string()));
        }
        if self.year <= 0 {
            return Err(KpiError::Validation(format!("invalid year {}", self.year)));
        }
        let tier = JournalTier::parse(&self.journal_tier).ok_or_else(|| {
            KpiError::Validation(format!("unknown journal tier `{}`", self.journal_tier))
        })?;

        let mut seen = HashSet::new();
        let authors: Vec<&str> = self
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty() && seen.insert(*a))
            .collect();
        if authors.is_empty() {
            return Err(KpiError::Validation(
                "select at least one author".to_string(),
            ));
        }
        if let Some(unknown) = authors.iter().find(|a| !roster.contains(**a)) {
            return Err(KpiError::Validation(format!(
                "`{}` is not on the staff roster",
                unknown
            )));
        }

        let external = self
            .external_author
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(authors
            .into_iter()
            .map(|author| {
                let mut row = PublicationRecord::create(title, self.year, tier, author);
                row.external_author = external.clone();
                row
            })
            .collect())
    }
}

/// Validate, apply the duplicate-title policy, append
///
/// Nothing is written when any check fails.
pub fn submit<S: ResearchStore>(
    store: &mut CachedStore<S>,
    submission: Submission,
    policy: DuplicatePolicy,
) -> Result<SubmitReceipt> {
    let roster: BTreeSet<String> = store
        .staff()?
        .iter()
        .map(|s| s.name.trim().to_string())
        .collect();
    let rows = submission.into_rows(&roster)?;
    let title = rows[0].title.clone();

    if policy == DuplicatePolicy::Reject {
        let existing = store.publications()?;
        if existing.iter().any(|p| p.title.trim() == title) {
            log::warn!("Rejected duplicate submission `{}`", title);
            return Err(KpiError::Duplicate(title));
        }
    }

    store.append_publications(&rows)?;
    log::info!("Recorded `{}` for {} author(s)", title, rows.len());

    Ok(SubmitReceipt {
        score: rows[0].score,
        rows_appended: rows.len(),
        title,
    })
}

/// Remove every co-author row of one publication
pub fn delete<S: ResearchStore>(
    store: &mut CachedStore<S>,
    key: &PublicationKey,
) -> Result<usize> {
    if key.title.trim().is_empty() {
        return Err(KpiError::Validation("title cannot be empty".to_string()));
    }
    let removed = store.delete_publications(key)?;
    if removed == 0 {
        return Err(KpiError::NotFound(key.to_string()));
    }
    log::info!("Deleted {} rows for `{}`", removed, key.title);
    Ok(removed)
}

/// Distinct `(title, year, tier)` identities, newest year first
pub fn entries(publications: &[PublicationRecord]) -> Vec<PublicationKey> {
    let mut keys: Vec<PublicationKey> = publications
        .iter()
        .filter(|p| !p.title.trim().is_empty())
        .map(PublicationRecord::key)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    keys.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.journal_tier.cmp(&b.journal_tier))
    });
    keys
}
