//! Bulk application of one validation action to many pending messages.
//!
//! Resolutions run with bounded concurrency and are best-effort: one failing
//! entry never aborts the batch, and the report lists every id in the order
//! the caller gave them.

use std::sync::Arc;

use futures::{stream, StreamExt};
use tracing::info;

use tribune_shared::{PendingMessageId, UserId, ValidationAction};

use crate::error::Result;
use crate::validation::{Resolution, ValidationWorkflow};

/// Default number of in-flight resolutions.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Per-entry outcomes of a bulk run, in caller order.
#[derive(Debug)]
pub struct BulkReport {
    pub outcomes: Vec<(PendingMessageId, Result<Resolution>)>,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

pub struct BulkCoordinator {
    workflow: Arc<ValidationWorkflow>,
    concurrency: usize,
}

impl BulkCoordinator {
    pub fn new(workflow: Arc<ValidationWorkflow>, concurrency: usize) -> Self {
        Self {
            workflow,
            concurrency: concurrency.max(1),
        }
    }

    /// Apply `action` to every id in `ids`.
    ///
    /// Duplicate ids are processed like any other entry; the second
    /// occurrence resolves against whatever state the first left behind.
    pub async fn validate_batch(
        &self,
        ids: &[PendingMessageId],
        action: &ValidationAction,
        reviewer: &UserId,
    ) -> BulkReport {
        let outcomes = stream::iter(ids.iter().copied())
            .map(|id| {
                let workflow = Arc::clone(&self.workflow);
                let action = action.clone();
                let reviewer = reviewer.clone();
                async move {
                    let result = workflow.validate(id, action, &reviewer).await;
                    (id, result)
                }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = BulkReport { outcomes };
        info!(
            total = report.outcomes.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            reviewer = %reviewer,
            "bulk validation finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateCatalog;
    use crate::error::CoreError;
    use tribune_shared::{NewPendingMessage, PendingSource, Priority};
    use tribune_store::MemoryStore;

    fn coordinator() -> (BulkCoordinator, Arc<ValidationWorkflow>) {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(TemplateCatalog::new(store.clone()));
        let workflow = Arc::new(ValidationWorkflow::new(
            store.clone(),
            store.clone(),
            store,
            catalog,
        ));
        (
            BulkCoordinator::new(workflow.clone(), DEFAULT_CONCURRENCY),
            workflow,
        )
    }

    fn draft(content: &str) -> NewPendingMessage {
        NewPendingMessage {
            source: PendingSource::Freeform {
                content: content.to_string(),
            },
            target_audience: Vec::new(),
            category: "announcement".to_string(),
            tags: Vec::new(),
            priority: Priority::Medium,
            estimated_reach: 100,
            created_by: UserId::new("creator-1"),
            scheduled_for: None,
            context: None,
        }
    }

    #[tokio::test]
    async fn test_batch_reports_in_caller_order() {
        let (coordinator, workflow) = coordinator();
        let a = workflow.create_pending(draft("first")).unwrap();
        let b = workflow.create_pending(draft("second")).unwrap();
        let ghost = PendingMessageId::new();

        let ids = vec![a.id, ghost, b.id];
        let report = coordinator
            .validate_batch(&ids, &ValidationAction::Approve, &UserId::new("reviewer-1"))
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].0, a.id);
        assert_eq!(report.outcomes[1].0, ghost);
        assert_eq!(report.outcomes[2].0, b.id);
        assert!(matches!(
            report.outcomes[1].1,
            Err(CoreError::PendingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_duplicate_id_second_loses() {
        let (coordinator, workflow) = coordinator();
        let a = workflow.create_pending(draft("only once")).unwrap();

        let report = coordinator
            .validate_batch(
                &[a.id, a.id],
                &ValidationAction::Approve,
                &UserId::new("reviewer-1"),
            )
            .await;

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_report() {
        let (coordinator, _) = coordinator();
        let report = coordinator
            .validate_batch(&[], &ValidationAction::Approve, &UserId::new("reviewer-1"))
            .await;
        assert_eq!(report.outcomes.len(), 0);
        assert_eq!(report.succeeded(), 0);
    }
}
