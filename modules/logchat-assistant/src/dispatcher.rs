use std::sync::Arc;

use tracing::{error, info};

use crate::descriptor::QueryDescriptor;
use crate::error::PipelineError;
use crate::store::DocumentStore;
use crate::types::ResultSet;

/// Routes a classified descriptor to exactly one store operation.
pub struct QueryDispatcher {
    store: Arc<dyn DocumentStore>,
}

impl QueryDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, descriptor: QueryDescriptor) -> Result<ResultSet, PipelineError> {
        let kind = descriptor.kind();
        info!(kind, "Executing query");

        let result = match descriptor {
            QueryDescriptor::Aggregate { pipeline, .. } => {
                self.store.aggregate(pipeline).await.map(ResultSet::Rows)
            }
            QueryDescriptor::Find(query) | QueryDescriptor::Fallback(query) => {
                self.store.find(query).await.map(ResultSet::Rows)
            }
            QueryDescriptor::Count(filter) => self.store.count(filter).await.map(ResultSet::Count),
        };

        match result {
            Ok(results) => {
                info!(kind, rows = results.len(), "Query executed");
                Ok(results)
            }
            Err(e) => {
                error!(kind, error = %e, "Query execution failed");
                Err(PipelineError::Execution(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{classify, FindQuery, FALLBACK_LIMIT};
    use crate::testing::{MockStore, StoreCall};
    use crate::types::JsonObject;
    use serde_json::json;

    fn obj(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn aggregate_routes_once_to_aggregation() {
        let store = Arc::new(MockStore::new().with_rows(vec![obj(json!({"_id": "completed", "n": 4}))]));
        let dispatcher = QueryDispatcher::new(store.clone());
        let descriptor = classify(json!({
            "aggregate": "logs",
            "pipeline": [{"$group": {"_id": "$status", "n": {"$sum": 1}}}]
        }))
        .unwrap();

        let results = dispatcher.execute(descriptor).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            store.calls(),
            vec![StoreCall::Aggregate(vec![obj(
                json!({"$group": {"_id": "$status", "n": {"$sum": 1}}})
            )])]
        );
    }

    #[tokio::test]
    async fn find_routes_with_defaults() {
        let store = Arc::new(MockStore::new());
        let dispatcher = QueryDispatcher::new(store.clone());
        let descriptor = classify(json!({"find": {"query": {"status": "completed"}}})).unwrap();

        dispatcher.execute(descriptor).await.unwrap();

        assert_eq!(
            store.calls(),
            vec![StoreCall::Find(FindQuery {
                filter: obj(json!({"status": "completed"})),
                projection: None,
                sort: None,
                limit: 0,
            })]
        );
    }

    #[tokio::test]
    async fn negative_find_limit_stays_bounded() {
        let rows = (0..10).map(|i| obj(json!({"recordCount": i}))).collect();
        let store = Arc::new(MockStore::new().with_rows(rows));
        let dispatcher = QueryDispatcher::new(store.clone());
        let descriptor = classify(json!({"find": {"sort": {"recordCount": -1}, "limit": -3}})).unwrap();

        let results = dispatcher.execute(descriptor).await.unwrap();

        assert_eq!(results.len(), 3);
        match &store.calls()[0] {
            StoreCall::Find(query) => assert_eq!(query.limit, 3),
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn count_returns_single_integer() {
        let store = Arc::new(MockStore::new().with_count(17));
        let dispatcher = QueryDispatcher::new(store.clone());
        let descriptor = classify(json!({"count": {"status": "failed"}})).unwrap();

        let results = dispatcher.execute(descriptor).await.unwrap();

        assert_eq!(results, ResultSet::Count(17));
        assert_eq!(store.calls(), vec![StoreCall::Count(obj(json!({"status": "failed"})))]);
    }

    #[tokio::test]
    async fn unrecognized_shape_routes_to_capped_find() {
        let store = Arc::new(MockStore::new());
        let dispatcher = QueryDispatcher::new(store.clone());
        let descriptor = classify(json!({"status": "completed"})).unwrap();

        dispatcher.execute(descriptor).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            StoreCall::Find(query) => {
                assert_eq!(query.filter, obj(json!({"status": "completed"})));
                assert_eq!(query.limit, FALLBACK_LIMIT);
            }
            other => panic!("expected find, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_is_execution_error() {
        let store = Arc::new(MockStore::new().failing("connection refused"));
        let dispatcher = QueryDispatcher::new(store);
        let descriptor = classify(json!({"count": {}})).unwrap();

        let err = dispatcher.execute(descriptor).await.unwrap_err();

        assert!(matches!(err, PipelineError::Execution(msg) if msg.contains("connection refused")));
    }
}
