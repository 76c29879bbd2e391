use std::sync::Arc;

use ai_client::{strip_code_blocks, truncate_to_char_boundary};
use tracing::{debug, error};

use crate::completion::{CompletionRequest, TextCompleter};
use crate::error::PipelineError;
use crate::prompts;
use crate::types::Question;

/// Turns a question into descriptor text via one completion call.
pub struct QuerySynthesizer {
    completer: Arc<dyn TextCompleter>,
    model: String,
    temperature: f32,
    collection: String,
}

impl QuerySynthesizer {
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

    /// Ask the model for a query descriptor.
    ///
    /// The returned text has any code fence removed and is guaranteed to parse
    /// as strict JSON. Repair happens later; text that only becomes valid after
    /// repair (single-quoted keys, say) is rejected here.
    pub async fn synthesize(&self, question: &Question) -> Result<String, PipelineError> {
        let request = CompletionRequest::new(&self.model, self.temperature)
            .system(prompts::system_prompt(&self.collection))
            .user(prompts::synthesis_instruction(question, &self.collection));

        let raw = self.completer.complete(request).await.map_err(|e| {
            error!(error = %e, "Query synthesis completion failed");
            PipelineError::Synthesis(e.to_string())
        })?;

        let text = strip_code_blocks(&raw);
        debug!(descriptor = truncate_to_char_boundary(text, 2000), "Synthesized descriptor");

        if let Err(e) = serde_json::from_str::<serde_json::Value>(text) {
            error!(error = %e, "Synthesized descriptor is not valid JSON");
            return Err(PipelineError::Synthesis(format!("invalid JSON from model: {e}")));
        }

        Ok(text.to_string())
    }
}
