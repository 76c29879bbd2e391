use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection, Database};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use logchat_common::{Config, LogchatError};

use crate::descriptor::FindQuery;
use crate::store::DocumentStore;
use crate::types::JsonObject;

/// Database used when neither config nor the connection string names one.
const FALLBACK_DATABASE: &str = "test";

/// MongoDB-backed [`DocumentStore`].
///
/// Nothing connects until the first query. The first caller connects and
/// pings; concurrent first callers wait on the same initialization, and the
/// resulting handle is reused for the life of the store. A failed
/// initialization is not cached, so the next query tries again.
pub struct MongoStore {
    uri: String,
    database: Option<String>,
    collection_name: String,
    handles: OnceCell<Handles>,
}

struct Handles {
    database: Database,
    collection: Collection<Document>,
}

/// What `logchat check` prints.
#[derive(Debug)]
pub struct ConnectionReport {
    pub database: String,
    pub collections: Vec<String>,
    pub collection: String,
    pub document_count: u64,
}

impl MongoStore {
    pub fn new(
        uri: impl Into<String>,
        database: Option<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database,
            collection_name: collection_name.into(),
            handles: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.mongodb_uri,
            config.mongodb_database.clone(),
            &config.collection_name,
        )
    }

    async fn connect(&self) -> Result<Database, LogchatError> {
        let client = Client::with_uri_str(&self.uri)
            .await
            .map_err(|e| LogchatError::Database(format!("invalid MongoDB URI: {e}")))?;

        let db = match &self.database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(FALLBACK_DATABASE)),
        };

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LogchatError::Database(format!("MongoDB ping failed: {e}")))?;

        info!(database = db.name(), collection = %self.collection_name, "Connected to MongoDB");
        Ok(db)
    }

    async fn handles(&self) -> Result<&Handles, LogchatError> {
        self.handles
            .get_or_try_init(|| async {
                let database = self.connect().await?;
                let collection = database.collection::<Document>(&self.collection_name);
                Ok(Handles { database, collection })
            })
            .await
    }

    /// The memoized collection handle.
    async fn collection(&self) -> Result<&Collection<Document>, LogchatError> {
        Ok(&self.handles().await?.collection)
    }

    /// Connect, list collections, and count the target collection.
    pub async fn check(&self) -> Result<ConnectionReport> {
        let handles = self.handles().await?;
        let collections = handles
            .database
            .list_collection_names()
            .await
            .context("listing collections")?;
        let document_count = handles
            .collection
            .estimated_document_count()
            .await
            .context("counting documents")?;

        Ok(ConnectionReport {
            database: handles.database.name().to_string(),
            collections,
            collection: self.collection_name.clone(),
            document_count,
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(&self, pipeline: Vec<JsonObject>) -> Result<Vec<JsonObject>> {
        let stages = pipeline
            .into_iter()
            .map(to_document)
            .collect::<Result<Vec<_>>>()?;
        debug!(stages = stages.len(), "MongoDB aggregate");

        let cursor = self.collection().await?.aggregate(stages).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(to_json_object).collect())
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<JsonObject>> {
        debug!(limit = query.limit, "MongoDB find");

        let mut action = self.collection().await?.find(to_document(query.filter)?);
        if let Some(projection) = query.projection {
            action = action.projection(to_document(projection)?);
        }
        if let Some(sort) = query.sort {
            action = action.sort(to_document(sort)?);
        }
        if query.limit > 0 {
            action = action.limit(i64::try_from(query.limit).unwrap_or(i64::MAX));
        }

        let docs: Vec<Document> = action.await?.try_collect().await?;
        Ok(docs.into_iter().map(to_json_object).collect())
    }

    async fn count(&self, filter: JsonObject) -> Result<u64> {
        debug!("MongoDB count");
        Ok(self
            .collection()
            .await?
            .count_documents(to_document(filter)?)
            .await?)
    }
}

/// Parse a JSON object as MongoDB extended JSON, so `{"$oid": ...}` and
/// `{"$date": ...}` become real BSON values.
pub fn to_document(obj: JsonObject) -> Result<Document> {
    match Bson::try_from(serde_json::Value::Object(obj))? {
        Bson::Document(doc) => Ok(doc),
        other => Err(anyhow!("expected a document, got {:?}", other.element_type())),
    }
}

/// Relaxed extended JSON view of a result row.
pub fn to_json_object(doc: Document) -> JsonObject {
    match Bson::Document(doc).into_relaxed_extjson() {
        serde_json::Value::Object(obj) => obj,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn extended_json_filters_become_bson_types() {
        let oid = ObjectId::new();
        let filter = json!({"_id": {"$oid": oid.to_hex()}, "recordCount": {"$gt": 10}});
        let doc = to_document(filter.as_object().cloned().unwrap()).unwrap();
        assert_eq!(doc.get_object_id("_id").unwrap(), oid);
        assert!(doc.get_document("recordCount").unwrap().contains_key("$gt"));
    }

    #[test]
    fn rows_round_trip_to_relaxed_json_in_key_order() {
        let row = to_json_object(doc! { "_id": "Deal68", "avg": 124029.16, "n": 3_i64 });
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "avg", "n"]);
        assert_eq!(row["avg"], json!(124029.16));
        assert_eq!(row["n"], json!(3));
    }

    #[test]
    fn store_does_not_connect_on_construction() {
        let store = MongoStore::new("mongodb://localhost:1", None, "logs");
        assert!(store.handles.get().is_none());
    }

    #[tokio::test]
    async fn failed_connect_is_not_memoized() {
        let store = MongoStore::new(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=50",
            None,
            "logs",
        );

        assert!(store.count(JsonObject::new()).await.is_err());
        assert!(store.handles.get().is_none());
        assert!(store.count(JsonObject::new()).await.is_err());
        assert!(store.handles.get().is_none());
    }
}
