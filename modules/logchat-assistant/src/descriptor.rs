//! Descriptor repair and classification.
//!
//! Models sometimes answer with single-quoted pseudo-JSON. Repair is a blind
//! textual normalization: wrap the text in `[...]` and turn every `'` into
//! `"`. That also rewrites apostrophes inside string values, so
//! `{'name': 'O'Brien'}` becomes unparseable. The behavior is pinned by the
//! tests below; changing it changes which model outputs are accepted.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::types::JsonObject;

/// Row cap for descriptors that match none of the recognized shapes.
pub const FALLBACK_LIMIT: u64 = 20;

/// A filtered, projected, sorted and limited read. `limit == 0` is unbounded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindQuery {
    pub filter: JsonObject,
    pub projection: Option<JsonObject>,
    pub sort: Option<JsonObject>,
    pub limit: u64,
}

/// A parsed query, classified by shape. Consumed by exactly one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDescriptor {
    /// `{ aggregate: <collection>, pipeline: [...] }`
    Aggregate {
        collection: Option<String>,
        pipeline: Vec<JsonObject>,
    },
    /// `{ find: { query, projection, sort, limit } }`
    Find(FindQuery),
    /// `{ count: <filter> }`
    Count(JsonObject),
    /// Any other object, read as a filter capped at [`FALLBACK_LIMIT`] rows.
    Fallback(FindQuery),
}

impl QueryDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryDescriptor::Aggregate { .. } => "aggregate",
            QueryDescriptor::Find(_) => "find",
            QueryDescriptor::Count(_) => "count",
            QueryDescriptor::Fallback(_) => "fallback",
        }
    }
}

/// Wrap in a one-element array and replace every single quote with a double quote.
pub fn repair(text: &str) -> String {
    format!("[{text}]").replace('\'', "\"")
}

/// Repair `text`, parse it, and classify the first element.
pub fn repair_and_parse(text: &str) -> Result<QueryDescriptor, PipelineError> {
    let repaired = repair(text);
    let mut elements: Vec<Value> = serde_json::from_str(&repaired)
        .map_err(|e| PipelineError::MalformedDescriptor(format!("not valid JSON after repair: {e}")))?;

    if elements.len() > 1 {
        warn!(count = elements.len(), "Descriptor text held several values, using the first");
    }
    if elements.is_empty() {
        return Err(PipelineError::MalformedDescriptor("descriptor text is empty".into()));
    }

    let descriptor = classify(elements.swap_remove(0))?;
    debug!(kind = descriptor.kind(), "Classified descriptor");
    Ok(descriptor)
}

/// Decide which of the four shapes `value` has. Key presence is checked in
/// fixed priority: `aggregate`, then `find`, then `count`.
pub fn classify(value: Value) -> Result<QueryDescriptor, PipelineError> {
    let mut obj = match value {
        Value::Object(obj) => obj,
        other => return Err(malformed(format!("expected an object, got {}", type_name(&other)))),
    };

    if obj.contains_key("aggregate") {
        let collection = obj.get("aggregate").and_then(Value::as_str).map(str::to_string);
        let pipeline = match obj.remove("pipeline") {
            Some(Value::Array(stages)) => stages
                .into_iter()
                .enumerate()
                .map(|(i, stage)| match stage {
                    Value::Object(stage) => Ok(stage),
                    other => Err(malformed(format!(
                        "pipeline stage {i} is {}, expected an object",
                        type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(malformed(format!("pipeline is {}, expected an array", type_name(&other))))
            }
            None => return Err(malformed("aggregate descriptor has no pipeline")),
        };
        return Ok(QueryDescriptor::Aggregate { collection, pipeline });
    }

    if let Some(find) = obj.remove("find") {
        let mut spec = match find {
            Value::Object(spec) => spec,
            Value::Null => JsonObject::new(),
            other => return Err(malformed(format!("find is {}, expected an object", type_name(&other)))),
        };
        return Ok(QueryDescriptor::Find(FindQuery {
            filter: object_field(&mut spec, "query")?.unwrap_or_default(),
            projection: object_field(&mut spec, "projection")?.filter(|p| !p.is_empty()),
            sort: object_field(&mut spec, "sort")?.filter(|s| !s.is_empty()),
            limit: limit_field(spec.remove("limit"))?,
        }));
    }

    if let Some(count) = obj.remove("count") {
        return match count {
            Value::Object(filter) => Ok(QueryDescriptor::Count(filter)),
            Value::Null => Ok(QueryDescriptor::Count(JsonObject::new())),
            other => Err(malformed(format!("count is {}, expected a filter object", type_name(&other)))),
        };
    }

    Ok(QueryDescriptor::Fallback(FindQuery {
        filter: obj,
        projection: None,
        sort: None,
        limit: FALLBACK_LIMIT,
    }))
}

fn object_field(spec: &mut JsonObject, key: &str) -> Result<Option<JsonObject>, PipelineError> {
    match spec.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(other) => Err(malformed(format!("find.{key} is {}, expected an object", type_name(&other)))),
    }
}

/// Missing, null and zero mean "no limit". A negative limit bounds the read
/// by its magnitude, as MongoDB treats `limit(-n)`.
fn limit_field(value: Option<Value>) -> Result<u64, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => Ok(match n.as_i64() {
            Some(i) => i.unsigned_abs(),
            None => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.abs() as u64))
                .unwrap_or(0),
        }),
        Some(other) => Err(malformed(format!("find.limit is {}, expected a number", type_name(&other)))),
    }
}

fn malformed(msg: impl Into<String>) -> PipelineError {
    PipelineError::MalformedDescriptor(msg.into())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
