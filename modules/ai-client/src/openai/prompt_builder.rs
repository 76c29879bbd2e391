use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::{Message, PromptBuilder};

use super::types::*;
use super::OpenAi;

const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct OpenAiPromptBuilder {
    agent: OpenAi,
    input: String,
    preamble: Option<String>,
    temperature: Option<f32>,
    messages: Vec<Message>,
}

impl OpenAiPromptBuilder {
    pub(crate) fn new(agent: OpenAi, input: String) -> Self {
        Self {
            agent,
            input,
            preamble: None,
            temperature: None,
            messages: Vec::new(),
        }
    }

    fn build_request(&self) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(ref preamble) = self.preamble {
            messages.push(WireMessage::system(preamble));
        }

        messages.extend(self.messages.iter().map(WireMessage::from));

        if !self.input.is_empty() {
            messages.push(WireMessage::user(&self.input));
        }

        let model = &self.agent.model;
        let request = ChatRequest::new(model).messages(messages);

        if is_reasoning_model(model) {
            request.max_completion_tokens(DEFAULT_MAX_TOKENS)
        } else {
            let request = request.max_tokens(DEFAULT_MAX_TOKENS);
            match self.temperature {
                Some(temp) => request.temperature(temp),
                None => request,
            }
        }
    }
}

#[async_trait]
impl PromptBuilder for OpenAiPromptBuilder {
    fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    async fn send(self) -> Result<String> {
        let request = self.build_request();
        let response = self.agent.client().chat(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}
