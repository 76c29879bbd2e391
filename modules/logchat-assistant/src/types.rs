use serde::Serialize;

use crate::chart::ChartSpec;
use crate::error::PipelineError;

/// A JSON object with insertion-ordered keys. Key order matters: the chart
/// heuristic picks fields by their position in the first row.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Question
// ---------------------------------------------------------------------------

/// Free text from a caller. Only emptiness is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn parse(text: impl Into<String>) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased text used for keyword matching.
    pub fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ResultSet
// ---------------------------------------------------------------------------

/// Raw output of one store round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultSet {
    Rows(Vec<JsonObject>),
    Count(u64),
}

impl ResultSet {
    pub fn rows(&self) -> Option<&[JsonObject]> {
        match self {
            ResultSet::Rows(rows) => Some(rows),
            ResultSet::Count(_) => None,
        }
    }

    /// Number of rows, or 1 for a count.
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Rows(rows) => rows.len(),
            ResultSet::Count(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResultSet::Rows(rows) if rows.is_empty())
    }

    /// Pretty JSON as shown to the narration model.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string())
    }
}

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub response: String,
    pub chart_data: Option<ChartSpec>,
}

impl Answer {
    /// Text-only answer, used for guidance and error responses.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            chart_data: None,
        }
    }
}
