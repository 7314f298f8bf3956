//! Per-sync accounting

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::operation::Bucket;
use crate::models::{EntityId, ItemId, RecordId};
use crate::store::StoreError;

/// Attempted/succeeded counts for one diff bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub attempted: usize,
    pub succeeded: usize,
}

impl BucketStats {
    pub fn failed(&self) -> usize {
        self.attempted.saturating_sub(self.succeeded)
    }
}

/// A store call that did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Catalog entity the call was about
    pub entity_id: EntityId,
    /// Bucket the call belonged to
    pub bucket: Bucket,
    /// Record the call addressed (none for creates)
    pub record_id: Option<RecordId>,
    /// What the store answered
    pub error: StoreError,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} failed: {}", self.bucket, self.entity_id, self.error)
    }
}

/// Outcome accounting for one call to the sync executor
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub owner_id: ItemId,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub deletes: BucketStats,
    pub creates: BucketStats,
    pub updates: BucketStats,
    pub failures: Vec<SyncFailure>,
    /// Set when a fatal store response stopped the sync early
    pub aborted: bool,
}

impl SyncReport {
    pub fn new(owner_id: ItemId) -> Self {
        Self {
            owner_id,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            deletes: BucketStats::default(),
            creates: BucketStats::default(),
            updates: BucketStats::default(),
            failures: Vec::new(),
            aborted: false,
        }
    }

    pub fn stats(&self, bucket: Bucket) -> &BucketStats {
        match bucket {
            Bucket::Delete => &self.deletes,
            Bucket::Create => &self.creates,
            Bucket::Update => &self.updates,
        }
    }

    fn stats_mut(&mut self, bucket: Bucket) -> &mut BucketStats {
        match bucket {
            Bucket::Delete => &mut self.deletes,
            Bucket::Create => &mut self.creates,
            Bucket::Update => &mut self.updates,
        }
    }

    pub(crate) fn record_success(&mut self, bucket: Bucket) {
        let stats = self.stats_mut(bucket);
        stats.attempted += 1;
        stats.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, failure: SyncFailure) {
        self.stats_mut(failure.bucket).attempted += 1;
        self.failures.push(failure);
    }

    /// Store calls issued
    pub fn total_calls(&self) -> usize {
        self.deletes.attempted + self.creates.attempted + self.updates.attempted
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }

    /// Failures from one bucket
    pub fn failures_in(&self, bucket: Bucket) -> impl Iterator<Item = &SyncFailure> {
        self.failures.iter().filter(move |f| f.bucket == bucket)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {}/{} deleted, {}/{} created, {}/{} updated in {}ms",
            self.owner_id,
            self.deletes.succeeded,
            self.deletes.attempted,
            self.creates.succeeded,
            self.creates.attempted,
            self.updates.succeeded,
            self.updates.attempted,
            self.elapsed.as_millis()
        );
        if !self.failures.is_empty() {
            summary.push_str(&format!(" ({} failed)", self.failures.len()));
        }
        if self.aborted {
            summary.push_str(" [aborted]");
        }
        summary
    }
}
