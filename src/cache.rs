//! Time-bounded read cache in front of a `ResearchStore`
//!
//! Each table read is kept for `ttl`. Writes go straight to the store and
//! drop both cached tables, so the next read sees the write.

use crate::error::Result;
use crate::records::{PublicationKey, PublicationRecord, StaffRecord};
use crate::store::ResearchStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Cached<T> {
    loaded_at: Instant,
    value: Arc<T>,
}

impl<T> Cached<T> {
    fn fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() < ttl
    }
}

/// Both tables as read at one point in time
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub staff: Arc<Vec<StaffRecord>>,
    pub publications: Arc<Vec<PublicationRecord>>,
}

pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    staff: Option<Cached<Vec<StaffRecord>>>,
    publications: Option<Cached<Vec<PublicationRecord>>>,
}

impl<S: ResearchStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        CachedStore {
            inner,
            ttl,
            staff: None,
            publications: None,
        }
    }

    pub fn staff(&mut self) -> Result<Arc<Vec<StaffRecord>>> {
        if let Some(cached) = self.staff.as_ref().filter(|c| c.fresh(self.ttl)) {
            return Ok(Arc::clone(&cached.value));
        }
        let value = Arc::new(self.inner.load_staff()?);
        self.staff = Some(Cached {
            loaded_at: Instant::now(),
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    pub fn publications(&mut self) -> Result<Arc<Vec<PublicationRecord>>> {
        if let Some(cached) = self.publications.as_ref().filter(|c| c.fresh(self.ttl)) {
            return Ok(Arc::clone(&cached.value));
        }
        let value = Arc::new(self.inner.load_publications()?);
        self.publications = Some(Cached {
            loaded_at: Instant::now(),
            value: Arc::clone(&value),
        });
        Ok(value)
    }

    pub fn snapshot(&mut self) -> Result<Snapshot> {
        Ok(Snapshot {
            staff: self.staff()?,
            publications: self.publications()?,
        })
    }

    /// Cleared whether or not the write succeeded; a failed write may still
    /// have touched the store.
    pub fn append_publications(&mut self, rows: &[PublicationRecord]) -> Result<()> {
        let result = self.inner.append_publications(rows);
        self.clear();
        result
    }

    pub fn delete_publications(&mut self, key: &PublicationKey) -> Result<usize> {
        let result = self.inner.delete_publications(key);
        self.clear();
        result
    }

    pub fn clear(&mut self) {
        if self.staff.is_some() || self.publications.is_some() {
            log::debug!("Clearing read cache for {}", self.inner.describe());
        }
        self.staff = None;
        self.publications = None;
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}
