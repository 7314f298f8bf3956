//! Sync executor
//!
//! Applies a relation diff against a [`RelationStore`] one record at a time:
//! deletes, then creates, then updates. A failing call never stops the calls
//! after it (unless the store returns malformed data and the config says to
//! abort). Whatever happens, the returned baseline only reflects calls the
//! store confirmed.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::diff::diff;
use super::error::{PartialSyncError, SyncError};
use super::operation::{RelationOperation, build_operations};
use super::report::{SyncFailure, SyncReport};
use crate::config::SyncConfig;
use crate::models::{AssociationRecord, EntityId, ItemId, RecordId, RemoteId};
use crate::store::{RelationStore, StoreError};

/// Result of a fully applied sync
#[derive(Debug, Clone)]
pub struct SyncOutcome<E> {
    /// The edited set with server ids filled in
    pub baseline: Vec<AssociationRecord<E>>,
    pub report: SyncReport,
}

/// Confirmed effect of one store call
enum Effect {
    Deleted(RecordId),
    Created(RemoteId),
    Updated,
}

/// Remote calls that went through, per bucket. Deletes are tracked per
/// record since a baseline may hold one entity more than once.
#[derive(Default)]
struct Applied {
    deleted: HashSet<RecordId>,
    created: HashMap<EntityId, RemoteId>,
    updated: HashSet<EntityId>,
}

impl Applied {
    fn record(&mut self, entity_id: EntityId, effect: Effect) {
        match effect {
            Effect::Deleted(id) => {
                self.deleted.insert(id);
            }
            Effect::Created(id) => {
                self.created.insert(entity_id, id);
            }
            Effect::Updated => {
                self.updated.insert(entity_id);
            }
        }
    }
}

/// Reconciles relation sets against an injected Relation Store
#[derive(Debug)]
pub struct SyncExecutor<S> {
    store: S,
    config: SyncConfig,
}

impl<S> SyncExecutor<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Make the remote set for `owner_id` match `current`, given that it
    /// currently matches `original`.
    ///
    /// On success the new baseline is `current` with draft ids replaced by
    /// server ids. On failure the error carries `original` adjusted for the
    /// calls that succeeded.
    pub async fn sync<E>(
        &self,
        owner_id: ItemId,
        original: &[AssociationRecord<E>],
        current: &[AssociationRecord<E>],
    ) -> Result<SyncOutcome<E>, SyncError<E>>
    where
        E: Clone + Send + Sync + 'static,
        S: RelationStore<E>,
    {
        let started = Instant::now();
        let mut report = SyncReport::new(owner_id);
        let plan = diff(original, current);

        if !plan.has_changes() {
            log::debug!("Relations for {} unchanged, nothing to sync", owner_id);
            let baseline = fold_baseline(owner_id, original, current, &Applied::default());
            return Ok(SyncOutcome { baseline, report });
        }

        log::info!(
            "Syncing relations for {}: {} delete, {} create, {} update",
            owner_id,
            plan.to_delete.len(),
            plan.to_add.len(),
            plan.to_update.len()
        );

        let mut applied = Applied::default();
        let mut fatal = None;

        for operation in build_operations(owner_id, &plan) {
            let entity_id = operation.entity_id();
            let bucket = operation.bucket();

            match self.apply::<E>(&operation).await {
                Ok(effect) => {
                    log::debug!("{} of {} applied", bucket, entity_id);
                    report.record_success(bucket);
                    applied.record(entity_id, effect);
                }
                Err(error) => {
                    let failure = SyncFailure {
                        entity_id,
                        bucket,
                        record_id: operation.record_id(),
                        error,
                    };

                    if failure.error.is_fatal() && self.config.abort_on_fatal {
                        log::error!("Aborting relation sync for {}: {}", owner_id, failure);
                        report.record_failure(failure.clone());
                        report.aborted = true;
                        fatal = Some(failure);
                        break;
                    }

                    log::warn!(
                        "Relation sync for {} ({}): {}",
                        owner_id,
                        failure.error.kind(),
                        failure
                    );
                    report.record_failure(failure);
                }
            }
        }

        report.elapsed = started.elapsed();
        let baseline = fold_baseline(owner_id, original, current, &applied);
        log::info!("Relation sync {}", report.summary());

        if let Some(failure) = fatal {
            return Err(SyncError::Fatal {
                failure,
                baseline,
                report,
            });
        }

        if report.failures.is_empty() {
            Ok(SyncOutcome { baseline, report })
        } else {
            Err(PartialSyncError { baseline, report }.into())
        }
    }

    /// Issue one store call and check what came back
    async fn apply<E>(&self, operation: &RelationOperation) -> Result<Effect, StoreError>
    where
        E: Send + 'static,
        S: RelationStore<E>,
    {
        match *operation {
            RelationOperation::Delete { entity_id, id } => {
                let Some(remote_id) = id.remote() else {
                    log::debug!("{} was never persisted, nothing to delete", entity_id);
                    return Ok(Effect::Deleted(id));
                };

                match RelationStore::<E>::delete_by_id(&self.store, remote_id).await {
                    Ok(()) => Ok(Effect::Deleted(id)),
                    Err(StoreError::NotFound { .. }) if self.config.missing_delete_is_success => {
                        log::info!("Record {} for {} already gone", remote_id, entity_id);
                        Ok(Effect::Deleted(id))
                    }
                    Err(error) => Err(error),
                }
            }
            RelationOperation::Create {
                owner_id,
                entity_id,
                is_primary,
            } => {
                let created =
                    RelationStore::<E>::create(&self.store, owner_id, entity_id, is_primary)
                        .await?;

                let Some(remote_id) = created.remote_id() else {
                    return Err(StoreError::Malformed(format!(
                        "create of {} returned no persisted id",
                        entity_id
                    )));
                };
                if created.entity_id != entity_id {
                    return Err(StoreError::Malformed(format!(
                        "create of {} returned a record for {}",
                        entity_id, created.entity_id
                    )));
                }
                Ok(Effect::Created(remote_id))
            }
            RelationOperation::Update {
                entity_id,
                id,
                is_primary,
            } => {
                let Some(remote_id) = id.remote() else {
                    return Err(StoreError::Validation(format!(
                        "{} has no persisted record to update",
                        entity_id
                    )));
                };

                let updated =
                    RelationStore::<E>::update_by_id(&self.store, remote_id, is_primary).await?;

                let expected = RecordId::Persisted(remote_id);
                if updated.id != expected || updated.is_primary != is_primary {
                    return Err(StoreError::Malformed(format!(
                        "update of record {} returned id {} with primary={}",
                        remote_id, updated.id, updated.is_primary
                    )));
                }
                Ok(Effect::Updated)
            }
        }
    }
}

/// Build the baseline that matches what the store confirmed.
///
/// Walks `current` in display order: matched entities keep the baseline id
/// and take the edited flag only if no update was needed or the update went
/// through; added entities appear only if their create succeeded. Baseline
/// records whose delete did not go through are appended in their original
/// order, including extra records for an entity the baseline holds twice.
fn fold_baseline<E: Clone>(
    owner_id: ItemId,
    original: &[AssociationRecord<E>],
    current: &[AssociationRecord<E>],
    applied: &Applied,
) -> Vec<AssociationRecord<E>> {
    let mut by_entity: HashMap<EntityId, &AssociationRecord<E>> =
        HashMap::with_capacity(original.len());
    for record in original {
        by_entity.entry(record.entity_id).or_insert(record);
    }
    let mut seen: HashSet<EntityId> = HashSet::with_capacity(current.len());
    let mut baseline = Vec::with_capacity(current.len().max(original.len()));

    for record in current {
        if !seen.insert(record.entity_id) {
            continue;
        }

        match by_entity.get(&record.entity_id) {
            Some(previous) => {
                let flag_confirmed = previous.is_primary == record.is_primary
                    || applied.updated.contains(&record.entity_id);
                if flag_confirmed {
                    baseline.push(AssociationRecord {
                        id: previous.id,
                        owner_id: Some(owner_id),
                        ..record.clone()
                    });
                } else {
                    baseline.push((*previous).clone());
                }
            }
            None => {
                if let Some(id) = applied.created.get(&record.entity_id) {
                    baseline.push(AssociationRecord {
                        id: RecordId::Persisted(*id),
                        owner_id: Some(owner_id),
                        ..record.clone()
                    });
                }
            }
        }
    }

    let mut first_seen: HashSet<EntityId> = HashSet::with_capacity(original.len());
    for record in original {
        let matched = first_seen.insert(record.entity_id) && seen.contains(&record.entity_id);
        if !matched && !applied.deleted.contains(&record.id) {
            baseline.push(record.clone());
        }
    }

    baseline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Color;
    use crate::relations::Bucket;
    use crate::store::{MemoryRelationStore, StoreCall};
    use std::sync::Arc;

    type Record = AssociationRecord<Color>;

    const OWNER: ItemId = ItemId(1);

    fn draft(entity: u64, primary: bool) -> Record {
        AssociationRecord::draft(EntityId(entity), primary)
    }

    fn flags(records: &[Record]) -> Vec<(u64, bool)> {
        records.iter().map(|r| (r.entity_id.0, r.is_primary)).collect()
    }

    async fn seeded(store: &MemoryRelationStore, rows: &[(u64, bool)]) -> Vec<Record> {
        let mut records = Vec::new();
        for (entity, primary) in rows {
            records.push(store.seed(OWNER, EntityId(*entity), *primary).await);
        }
        records
    }

    #[tokio::test]
    async fn test_add_new_primary_scenario() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true)]).await;
        let mut current = original.clone();
        current[0].is_primary = false;
        current.push(draft(2, true));

        let outcome = executor.sync(OWNER, &original, &current).await.unwrap();

        assert_eq!(flags(&outcome.baseline), vec![(1, false), (2, true)]);
        assert_eq!(outcome.baseline[0].id, original[0].id);
        assert_eq!(outcome.baseline[1].id, RecordId::Persisted(2));
        assert_eq!(outcome.baseline[1].owner_id, Some(OWNER));
        assert!(outcome.report.is_success());

        let remote = executor.store().records_for::<Color>(OWNER).await;
        assert_eq!(flags(&remote), vec![(1, false), (2, true)]);
    }

    #[tokio::test]
    async fn test_calls_run_delete_create_update() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true), (2, false)]).await;
        // Drop 2, demote 1, add 3 as primary
        let current = vec![
            AssociationRecord {
                is_primary: false,
                ..original[0].clone()
            },
            draft(3, true),
        ];

        executor.sync(OWNER, &original, &current).await.unwrap();

        assert_eq!(
            executor.store().calls().await,
            vec![
                StoreCall::Delete { id: 2 },
                StoreCall::Create {
                    owner_id: OWNER,
                    entity_id: EntityId(3),
                    is_primary: true,
                },
                StoreCall::Update { id: 1, is_primary: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_second_sync_makes_no_calls() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, false)]).await;
        let current = vec![original[0].clone(), draft(2, true)];

        let first = executor.sync(OWNER, &original, &current).await.unwrap();
        executor.store().clear_calls().await;
        let second = executor.sync(OWNER, &first.baseline, &first.baseline).await.unwrap();

        assert!(executor.store().calls().await.is_empty());
        assert_eq!(second.report.total_calls(), 0);
        assert_eq!(second.baseline, first.baseline);
    }

    #[tokio::test]
    async fn test_one_failed_create_is_contained() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        executor
            .store()
            .fail_create(EntityId(3), StoreError::Network("timeout".into()))
            .await;
        let current = vec![draft(2, false), draft(3, false), draft(4, true)];

        let err = executor.sync(OWNER, &[], &current).await.unwrap_err();

        let SyncError::Partial(partial) = err else {
            panic!("expected partial sync");
        };
        assert_eq!(flags(&partial.baseline), vec![(2, false), (4, true)]);
        assert!(partial.baseline.iter().all(|r| !r.id.is_draft()));
        assert_eq!(partial.failed_entities(), vec![EntityId(3)]);
        assert_eq!(partial.failures()[0].bucket, Bucket::Create);
        assert_eq!(partial.report.creates.succeeded, 2);
        assert_eq!(executor.store().calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_record() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, false), (2, false), (3, false)]).await;
        executor
            .store()
            .fail_delete(1, StoreError::Network("reset".into()))
            .await;
        let current = vec![original[2].clone()];

        let err = executor.sync(OWNER, &original, &current).await.unwrap_err();

        let baseline = err.baseline().unwrap();
        // 2 went away, 1 is still persisted and must not be dropped
        assert_eq!(flags(baseline), vec![(3, false), (1, false)]);
        let report = err.report().unwrap();
        assert_eq!(report.stats(Bucket::Delete).attempted, 2);
        assert_eq!(report.stats(Bucket::Delete).succeeded, 1);
        assert_eq!(report.failures[0].record_id, Some(RecordId::Persisted(1)));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_flag() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true)]).await;
        executor
            .store()
            .fail_update(1, StoreError::NotFound { id: 1 })
            .await;
        let current = vec![
            AssociationRecord {
                is_primary: false,
                ..original[0].clone()
            },
            draft(2, true),
        ];

        let err = executor.sync(OWNER, &original, &current).await.unwrap_err();

        // Mirrors the store: both flags are set remotely
        assert_eq!(flags(err.baseline().unwrap()), vec![(1, true), (2, true)]);
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_buckets() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true), (2, false)]).await;
        executor
            .store()
            .fail_delete(2, StoreError::Network("down".into()))
            .await;
        let current = vec![
            AssociationRecord {
                is_primary: false,
                ..original[0].clone()
            },
            draft(3, false),
        ];

        let err = executor.sync(OWNER, &original, &current).await.unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.total_calls(), 3);
        assert_eq!(report.creates.succeeded, 1);
        assert_eq!(report.updates.succeeded, 1);
        assert_eq!(flags(err.baseline().unwrap()), vec![(1, false), (3, false), (2, false)]);
    }

    #[tokio::test]
    async fn test_missing_delete_counts_as_success_when_configured() {
        let config = SyncConfig::builder().missing_delete_is_success(true).build();
        let executor = SyncExecutor::with_config(MemoryRelationStore::new(), config);
        let original: Vec<Record> =
            vec![AssociationRecord::persisted(77, OWNER, EntityId(1), false)];

        let outcome = executor.sync(OWNER, &original, &[]).await.unwrap();

        assert!(outcome.baseline.is_empty());
        assert_eq!(outcome.report.deletes.succeeded, 1);
    }

    #[tokio::test]
    async fn test_missing_delete_fails_by_default() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original: Vec<Record> =
            vec![AssociationRecord::persisted(77, OWNER, EntityId(1), false)];

        let err = executor.sync(OWNER, &original, &[]).await.unwrap_err();

        assert_eq!(err.baseline().unwrap().len(), 1);
        assert_eq!(
            err.report().unwrap().failures[0].error,
            StoreError::NotFound { id: 77 }
        );
    }

    #[tokio::test]
    async fn test_duplicate_baseline_entity_is_deleted() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, false), (1, false)]).await;
        let current = vec![original[1].clone()];

        let outcome = executor.sync(OWNER, &original, &current).await.unwrap();

        assert_eq!(executor.store().calls().await, vec![StoreCall::Delete { id: 2 }]);
        let ids: Vec<RecordId> = outcome.baseline.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId::Persisted(1)]);
        let remote = executor.store().records_for::<Color>(OWNER).await;
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].id, RecordId::Persisted(1));
    }

    #[tokio::test]
    async fn test_failed_duplicate_delete_stays_in_baseline() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true), (1, false)]).await;
        executor
            .store()
            .fail_delete(2, StoreError::Network("timeout".into()))
            .await;
        let current = vec![original[0].clone()];

        let err = executor.sync(OWNER, &original, &current).await.unwrap_err();

        let ids: Vec<RecordId> = err.baseline().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RecordId::Persisted(1), RecordId::Persisted(2)]);
        assert_eq!(err.report().unwrap().failures[0].record_id, Some(RecordId::Persisted(2)));
    }

    #[tokio::test]
    async fn test_sync_through_shared_store() {
        let store = Arc::new(MemoryRelationStore::new());
        let executor = SyncExecutor::new(Arc::clone(&store));
        let current = vec![draft(4, true)];

        let outcome = executor.sync(OWNER, &[], &current).await.unwrap();

        assert_eq!(outcome.baseline[0].id, RecordId::Persisted(1));
        assert_eq!(flags(&store.records_for::<Color>(OWNER).await), vec![(4, true)]);
    }

    #[test]
    fn test_executor_keeps_config() {
        let executor = SyncExecutor::with_config(MemoryRelationStore::new(), SyncConfig::lenient());
        assert_eq!(executor.config(), &SyncConfig::lenient());
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        assert!(!executor.config().missing_delete_is_success);
    }

    #[tokio::test]
    async fn test_malformed_create_aborts() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = seeded(executor.store(), &[(1, true)]).await;
        executor.store().malform_create(EntityId(2)).await;
        let current = vec![
            AssociationRecord {
                is_primary: false,
                ..original[0].clone()
            },
            draft(2, true),
            draft(3, false),
        ];

        let err = executor.sync(OWNER, &original, &current).await.unwrap_err();

        let SyncError::Fatal { failure, baseline, report } = err else {
            panic!("expected fatal error");
        };
        assert_eq!(failure.entity_id, EntityId(2));
        assert!(failure.error.is_fatal());
        assert!(report.aborted);
        // Nothing after the bad create was sent
        assert_eq!(report.total_calls(), 1);
        assert_eq!(flags(&baseline), vec![(1, true)]);
    }

    #[tokio::test]
    async fn test_malformed_create_continues_when_configured() {
        let config = SyncConfig::builder().abort_on_fatal(false).build();
        let executor = SyncExecutor::with_config(MemoryRelationStore::new(), config);
        executor.store().malform_create(EntityId(2)).await;
        let current = vec![draft(2, false), draft(3, false)];

        let err = executor.sync(OWNER, &[], &current).await.unwrap_err();

        assert!(matches!(err, SyncError::Partial(_)));
        assert_eq!(flags(err.baseline().unwrap()), vec![(3, false)]);
    }

    #[tokio::test]
    async fn test_draft_in_baseline_is_not_deleted_remotely() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let original = vec![draft(5, false)];

        let outcome = executor.sync(OWNER, &original, &[]).await.unwrap();

        assert!(outcome.baseline.is_empty());
        assert!(executor.store().calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_payload_survives_sync() {
        let executor = SyncExecutor::new(MemoryRelationStore::new());
        let red = Color::new(EntityId(9), "Red", "#ff0000");
        let current = vec![AssociationRecord::from_entity(&red)];

        let outcome = executor.sync(OWNER, &[], &current).await.unwrap();

        assert_eq!(outcome.baseline[0].entity.as_ref(), Some(&red));
    }
}
