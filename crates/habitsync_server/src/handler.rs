//! The authenticated sync call.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use habitsync_engine::{ChangeCollector, Reconciler};
use habitsync_protocol::{SyncRequest, SyncResponse};
use habitsync_store::EntityStore;
use std::sync::Arc;
use uuid::Uuid;

/// Handler for sync requests from an already authenticated user.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    config: ServerConfig,
    reconciler: Reconciler,
    collector: ChangeCollector,
}

impl RequestHandler {
    /// Creates a handler over `store`.
    pub fn new(store: Arc<EntityStore>, config: ServerConfig) -> Self {
        Self {
            config,
            reconciler: Reconciler::new(Arc::clone(&store)),
            collector: ChangeCollector::new(store),
        }
    }

    /// Applies the pushed changes, then returns everything the user has not
    /// seen since `last_pulled_at`, including the changes just pushed.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidRequest`] for a bad cursor, an oversized batch
    ///   or an invalid entity; nothing is committed
    /// - [`ServerError::Storage`] if the commit fails; nothing is committed
    #[tracing::instrument(
        skip(self, user, request),
        fields(user = %user, cursor = request.cursor(), items = request.changes.item_count())
    )]
    pub fn handle_sync(&self, user: Uuid, request: SyncRequest) -> ServerResult<SyncResponse> {
        request.validate()?;

        let items = request.changes.item_count();
        if items > self.config.max_push_batch {
            return Err(ServerError::InvalidRequest(format!(
                "too many items: {} > {}",
                items, self.config.max_push_batch
            )));
        }

        let cursor = request.cursor();
        let report = self.reconciler.apply(user, &request.changes, cursor)?;
        let response = self.collector.collect(user, cursor)?;

        tracing::info!(
            sequence = report.sequence,
            timestamp = response.timestamp,
            pulled = response.changes.item_count(),
            "sync complete"
        );

        Ok(response)
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The store behind this handler.
    pub fn store(&self) -> &Arc<EntityStore> {
        self.reconciler.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitsync_testkit::{delete_habits, habit, upsert_habits, TestStore};

    fn create_handler(config: ServerConfig) -> (TestStore, RequestHandler) {
        let fixture = TestStore::memory();
        let handler = RequestHandler::new(Arc::clone(&fixture.store), config);
        (fixture, handler)
    }

    #[test]
    fn first_sync_with_no_changes() {
        let (_, handler) = create_handler(ServerConfig::default());
        let response = handler
            .handle_sync(Uuid::new_v4(), SyncRequest::default())
            .unwrap();
        assert!(response.changes.is_empty());
        assert!(response.timestamp > 0);
    }

    #[test]
    fn pushed_habit_comes_back() {
        let (_, handler) = create_handler(ServerConfig::default());
        let jog = habit("Jog");
        let request = SyncRequest::new(0, upsert_habits([jog.clone()]));

        let response = handler.handle_sync(Uuid::new_v4(), request).unwrap();
        let titles: Vec<_> = response
            .changes
            .habits
            .updated
            .iter()
            .map(|h| h.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Jog"]);
    }

    #[test]
    fn batch_limit() {
        let (fixture, handler) = create_handler(ServerConfig::new().with_max_push_batch(2));
        let user = Uuid::new_v4();

        let mut changes = upsert_habits([habit("a"), habit("b")]);
        changes.habits.deleted.push("x".into());
        let err = handler
            .handle_sync(user, SyncRequest::new(0, changes))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
        assert_eq!(fixture.stats().unwrap().last_sequence, 0);

        let ok = handler.handle_sync(user, SyncRequest::new(0, delete_habits(["x", "y"])));
        assert!(ok.is_ok());
    }

    #[test]
    fn negative_cursor() {
        let (_, handler) = create_handler(ServerConfig::default());
        let err = handler
            .handle_sync(Uuid::new_v4(), SyncRequest::pull(-1))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
