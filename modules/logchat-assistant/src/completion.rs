// TextCompleter — the one seam between the pipeline and a language model.
//
// Synthesis, narration and clarification each build a CompletionRequest and
// get back raw text. Tests inject ScriptedCompleter (see testing.rs) instead
// of talking to a provider.

use ai_client::{Agent, Message, OpenAi, PromptBuilder};
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature,
        }
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }
}

#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Return the model's single text completion for `request`.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[async_trait]
impl TextCompleter for OpenAi {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.clone()
            .with_model(request.model)
            .prompt("")
            .messages(request.messages)
            .temperature(request.temperature)
            .send()
            .await
    }
}
