//! Errors returned by a relation sync that did not fully apply

use super::report::{SyncFailure, SyncReport};
use crate::models::{AssociationRecord, EntityId};

/// Some store calls failed; the rest were applied
///
/// `baseline` is the original set adjusted for the calls that went through.
/// Syncing the same edited set against it again retries exactly the failed
/// calls.
#[derive(Debug, Clone)]
pub struct PartialSyncError<E> {
    pub baseline: Vec<AssociationRecord<E>>,
    pub report: SyncReport,
}

impl<E> PartialSyncError<E> {
    pub fn failures(&self) -> &[SyncFailure] {
        &self.report.failures
    }

    pub fn failed_entities(&self) -> Vec<EntityId> {
        self.report.failures.iter().map(|f| f.entity_id).collect()
    }
}

impl<E> std::fmt::Display for PartialSyncError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let details: Vec<String> = self.report.failures.iter().map(|f| f.to_string()).collect();
        write!(
            f,
            "partial sync for {}: {} of {} operations failed ({})",
            self.report.owner_id,
            self.report.failures.len(),
            self.report.total_calls(),
            details.join("; ")
        )
    }
}

impl<E: std::fmt::Debug> std::error::Error for PartialSyncError<E> {}

/// Why a sync did not fully apply
#[derive(Debug, Clone)]
pub enum SyncError<E> {
    /// Individual calls failed; see the failures for what to retry
    Partial(PartialSyncError<E>),
    /// The store returned data that cannot be trusted. Calls after it were
    /// not issued; `baseline` covers only the calls confirmed before it.
    Fatal {
        failure: SyncFailure,
        baseline: Vec<AssociationRecord<E>>,
        report: SyncReport,
    },
    /// The owning item has not been created yet, nothing was sent
    MissingOwner,
}

impl<E> SyncError<E> {
    /// Confirmed baseline after the failed sync, if any call was attempted
    pub fn baseline(&self) -> Option<&[AssociationRecord<E>]> {
        match self {
            SyncError::Partial(partial) => Some(&partial.baseline),
            SyncError::Fatal { baseline, .. } => Some(baseline),
            SyncError::MissingOwner => None,
        }
    }

    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncError::Partial(partial) => Some(&partial.report),
            SyncError::Fatal { report, .. } => Some(report),
            SyncError::MissingOwner => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Fatal { .. })
    }
}

impl<E> std::fmt::Display for SyncError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Partial(partial) => write!(f, "{}", partial),
            SyncError::Fatal { failure, report, .. } => {
                write!(f, "sync for {} aborted: {}", report.owner_id, failure)
            }
            SyncError::MissingOwner => {
                write!(f, "cannot sync relations before the owning item is created")
            }
        }
    }
}

impl<E: std::fmt::Debug> std::error::Error for SyncError<E> {}

impl<E> From<PartialSyncError<E>> for SyncError<E> {
    fn from(err: PartialSyncError<E>) -> Self {
        SyncError::Partial(err)
    }
}
