use std::sync::Arc;

use tracing::{debug, error};

use crate::chart;
use crate::completion::{CompletionRequest, TextCompleter};
use crate::error::PipelineError;
use crate::prompts;
use crate::types::{Answer, Question, ResultSet};

const EMPTY_NARRATION: &str = "No response generated";

/// Narrates a result set and attaches a chart when the heuristic allows.
pub struct ResultFormatter {
    completer: Arc<dyn TextCompleter>,
    model: String,
    temperature: f32,
    collection: String,
}

impl ResultFormatter {
    pub fn new(
        completer: Arc<dyn TextCompleter>,
        model: impl Into<String>,
        temperature: f32,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            completer,
            model: model.into(),
            temperature,
            collection: collection.into(),
        }
    }

    pub async fn format(&self, question: &Question, results: &ResultSet) -> Result<Answer, PipelineError> {
        let request = CompletionRequest::new(&self.model, self.temperature)
            .system(prompts::system_prompt(&self.collection))
            .user(prompts::narration_instruction(question, &results.to_pretty_json()));

        let narration = self.completer.complete(request).await.map_err(|e| {
            error!(error = %e, "Result narration failed");
            PipelineError::Formatting(e.to_string())
        })?;

        let response = match narration.trim() {
            "" => EMPTY_NARRATION.to_string(),
            text => text.to_string(),
        };

        let chart_data = chart::chart_for(question, results);
        debug!(charted = chart_data.is_some(), "Formatted answer");

        Ok(Answer {
            response,
            chart_data,
        })
    }
}
