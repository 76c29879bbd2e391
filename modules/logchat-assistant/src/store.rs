// DocumentStore — the document-database operations the dispatcher needs.
//
// MongoStore (mongo.rs) is the production implementation; MockStore
// (testing.rs) records calls and returns canned rows.

use anyhow::Result;
use async_trait::async_trait;

use crate::descriptor::FindQuery;
use crate::types::JsonObject;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run an aggregation pipeline and return every resulting row.
    async fn aggregate(&self, pipeline: Vec<JsonObject>) -> Result<Vec<JsonObject>>;

    /// Filtered, projected, sorted, limited read. `query.limit == 0` is unbounded.
    async fn find(&self, query: FindQuery) -> Result<Vec<JsonObject>>;

    /// Number of documents matching `filter`.
    async fn count(&self, filter: JsonObject) -> Result<u64>;
}
