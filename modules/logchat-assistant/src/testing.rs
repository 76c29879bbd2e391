// Test doubles for the two external capabilities.
//
// - ScriptedCompleter (TextCompleter) — queued replies, records every request
// - MockStore (DocumentStore) — canned rows/count, records every call,
//   optional failure injection
//
// Neither touches the network, so the whole pipeline runs under `cargo test`.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::completion::{CompletionRequest, TextCompleter};
use crate::descriptor::FindQuery;
use crate::store::DocumentStore;
use crate::types::JsonObject;

// ---------------------------------------------------------------------------
// ScriptedCompleter
// ---------------------------------------------------------------------------

/// Replies in the order they were queued. An exhausted script is an error,
/// so a test that triggers an unexpected completion call fails loudly.
pub struct ScriptedCompleter {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompleter {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for ScriptedCompleter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextCompleter for ScriptedCompleter {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("ScriptedCompleter: no reply queued")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Aggregate(Vec<JsonObject>),
    Find(FindQuery),
    Count(JsonObject),
}

/// Returns the same rows for every aggregate/find and the same number for
/// every count. `failing` makes every operation return an error.
pub struct MockStore {
    rows: Vec<JsonObject>,
    count: u64,
    failure: Option<String>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            count: 0,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rows(mut self, rows: Vec<JsonObject>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: StoreCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(message) => Err(anyhow!("MockStore: {message}")),
            None => Ok(()),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn aggregate(&self, pipeline: Vec<JsonObject>) -> Result<Vec<JsonObject>> {
        self.record(StoreCall::Aggregate(pipeline))?;
        Ok(self.rows.clone())
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<JsonObject>> {
        let limit = query.limit;
        self.record(StoreCall::Find(query))?;
        let rows = self.rows.iter().cloned();
        Ok(if limit > 0 {
            rows.take(limit as usize).collect()
        } else {
            rows.collect()
        })
    }

    async fn count(&self, filter: JsonObject) -> Result<u64> {
        self.record(StoreCall::Count(filter))?;
        Ok(self.count)
    }
}
