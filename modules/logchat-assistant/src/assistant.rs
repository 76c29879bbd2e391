use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ai_client::OpenAi;
use tracing::{error, info, warn};

use logchat_common::Config;

use crate::completion::{CompletionRequest, TextCompleter};
use crate::demo::{self, CONFIG_GUIDANCE};
use crate::descriptor;
use crate::dispatcher::QueryDispatcher;
use crate::error::{PipelineError, EMPTY_QUESTION_GUIDANCE};
use crate::formatter::ResultFormatter;
use crate::mongo::MongoStore;
use crate::prompts;
use crate::store::DocumentStore;
use crate::synthesizer::QuerySynthesizer;
use crate::types::{Answer, Question};

pub const CLARIFY_FALLBACK: &str =
    "I'm having trouble understanding your question. Could you rephrase it or provide more details?";
const CLARIFY_EMPTY: &str = "I need more information to answer that question.";

/// Entry points for answering questions about the logs collection.
///
/// Each call runs the stages in order (synthesize, repair and parse, execute,
/// format) with its own state; the only thing shared between concurrent calls
/// is the store's connection handle.
pub struct Assistant {
    synthesizer: QuerySynthesizer,
    dispatcher: QueryDispatcher,
    formatter: ResultFormatter,
    completer: Arc<dyn TextCompleter>,
    narration_model: String,
    narration_temperature: f32,
    collection: String,
    api_key_valid: bool,
    demo_mode: bool,
    stage_timeout: Option<Duration>,
}

impl Assistant {
    pub fn new(
        config: &Config,
        completer: Arc<dyn TextCompleter>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let collection = config.collection_name.clone();
        Self {
            synthesizer: QuerySynthesizer::new(
                completer.clone(),
                &config.synthesis_model,
                config.synthesis_temperature,
                &collection,
            ),
            dispatcher: QueryDispatcher::new(store),
            formatter: ResultFormatter::new(
                completer.clone(),
                &config.narration_model,
                config.narration_temperature,
                &collection,
            ),
            completer,
            narration_model: config.narration_model.clone(),
            narration_temperature: config.narration_temperature,
            collection,
            api_key_valid: config.has_valid_api_key(),
            demo_mode: config.demo_mode,
            stage_timeout: config.stage_timeout,
        }
    }

    /// Production wiring: OpenAI for completions, MongoDB for the store.
    pub fn from_config(config: &Config) -> Self {
        let mut openai = OpenAi::new(&config.openai_api_key, &config.synthesis_model);
        if let Some(ref url) = config.openai_base_url {
            openai = openai.with_base_url(url);
        }
        Self::new(
            config,
            Arc::new(openai),
            Arc::new(MongoStore::from_config(config)),
        )
    }

    /// Answer a question. Never fails: every error becomes guidance text in
    /// `Answer::response` with no chart.
    pub async fn process_question(&self, text: &str) -> Answer {
        let question = match Question::parse(text) {
            Ok(question) => question,
            Err(e) => return Answer::text(e.guidance()),
        };

        if !self.api_key_valid {
            warn!("OpenAI API key missing or invalid, skipping pipeline");
            return demo::unconfigured_answer(question.as_str(), self.demo_mode);
        }

        match self.answer(&question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Failed to process question");
                Answer::text(e.guidance())
            }
        }
    }

    /// The pipeline itself, with typed errors.
    pub async fn answer(&self, question: &Question) -> Result<Answer, PipelineError> {
        info!(question = %question, "Processing question");

        let descriptor_text = self
            .within(self.synthesizer.synthesize(question), PipelineError::Synthesis)
            .await?;

        let descriptor = descriptor::repair_and_parse(&descriptor_text)?;

        let results = self
            .within(self.dispatcher.execute(descriptor), PipelineError::Execution)
            .await?;

        self.within(self.formatter.format(question, &results), PipelineError::Formatting)
            .await
    }

    /// Ask the model whether a question is answerable from the collection,
    /// returning its explanation or clarifying questions. Skips query
    /// synthesis and execution entirely.
    pub async fn handle_ambiguous_question(&self, text: &str) -> String {
        let question = match Question::parse(text) {
            Ok(question) => question,
            Err(_) => return EMPTY_QUESTION_GUIDANCE.to_string(),
        };

        if !self.api_key_valid {
            return CONFIG_GUIDANCE.to_string();
        }

        let request = CompletionRequest::new(&self.narration_model, self.narration_temperature)
            .system(prompts::clarification_prompt(&self.collection))
            .user(question.as_str());

        let reply = self
            .within(
                async {
                    self.completer
                        .complete(request)
                        .await
                        .map_err(|e| PipelineError::Formatting(e.to_string()))
                },
                PipelineError::Formatting,
            )
            .await;

        match reply {
            Ok(text) if text.trim().is_empty() => CLARIFY_EMPTY.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Clarification failed");
                CLARIFY_FALLBACK.to_string()
            }
        }
    }

    /// Apply the configured stage timeout, turning expiry into `on_timeout`.
    async fn within<T>(
        &self,
        stage: impl Future<Output = Result<T, PipelineError>>,
        on_timeout: fn(String) -> PipelineError,
    ) -> Result<T, PipelineError> {
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, stage)
                .await
                .map_err(|_| on_timeout(format!("timed out after {}s", limit.as_secs())))?,
            None => stage.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXECUTION_GUIDANCE, SYNTHESIS_GUIDANCE, UNEXPECTED_GUIDANCE};
    use crate::descriptor::FindQuery;
    use crate::testing::{MockStore, ScriptedCompleter};
    use crate::types::JsonObject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const VALID_KEY: &str = "sk-test-0123456789abcdefghij";

    fn config() -> Config {
        Config {
            openai_api_key: VALID_KEY.to_string(),
            ..Config::default()
        }
    }

    fn assistant(config: &Config, completer: Arc<ScriptedCompleter>, store: Arc<MockStore>) -> Assistant {
        Assistant::new(config, completer, store)
    }

    #[tokio::test]
    async fn empty_question_makes_no_calls() {
        let completer = Arc::new(ScriptedCompleter::new());
        let store = Arc::new(MockStore::new());
        let assistant = assistant(&config(), completer.clone(), store.clone());

        let answer = assistant.process_question("  ").await;

        assert_eq!(answer, Answer::text(EMPTY_QUESTION_GUIDANCE));
        assert!(completer.requests().is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_key_short_circuits() {
        let completer = Arc::new(ScriptedCompleter::new());
        let store = Arc::new(MockStore::new());
        let config = Config::default();
        let assistant = assistant(&config, completer.clone(), store.clone());

        let answer = assistant.process_question("How many logs?").await;
        let clarification = assistant.handle_ambiguous_question("How many logs?").await;

        assert_eq!(answer, Answer::text(CONFIG_GUIDANCE));
        assert_eq!(clarification, CONFIG_GUIDANCE);
        assert!(completer.requests().is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_maps_to_guidance() {
        let completer = Arc::new(ScriptedCompleter::new().reply("I cannot help with that."));
        let store = Arc::new(MockStore::new());
        let assistant = assistant(&config(), completer, store.clone());

        let answer = assistant.process_question("weather in Paris").await;

        assert_eq!(answer, Answer::text(SYNTHESIS_GUIDANCE));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_descriptor_maps_to_execution_guidance() {
        let completer = Arc::new(ScriptedCompleter::new().reply(r#"{"name": "O'Brien"}"#));
        let store = Arc::new(MockStore::new());
        let assistant = assistant(&config(), completer, store.clone());

        let answer = assistant.process_question("logs for O'Brien").await;

        assert_eq!(answer, Answer::text(EXECUTION_GUIDANCE));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn narration_failure_maps_to_unexpected_guidance() {
        let completer = Arc::new(
            ScriptedCompleter::new()
                .reply(r#"{"count": {"status": "failed"}}"#)
                .fail("503"),
        );
        let store = Arc::new(MockStore::new().with_count(3));
        let assistant = assistant(&config(), completer, store);

        let answer = assistant.process_question("count failed").await;

        assert_eq!(answer, Answer::text(UNEXPECTED_GUIDANCE));
    }

    #[tokio::test]
    async fn clarification_uses_narration_model_and_suffix() {
        let completer = Arc::new(ScriptedCompleter::new().reply("  Which client do you mean?  "));
        let assistant = assistant(&config(), completer.clone(), Arc::new(MockStore::new()));

        let reply = assistant.handle_ambiguous_question("show me the thing").await;

        assert_eq!(reply, "Which client do you mean?");
        let request = &completer.requests()[0];
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert!(request.messages[0].content.contains("evaluating if a question can be answered"));
        assert_eq!(request.messages[1].content, "show me the thing");
    }

    #[tokio::test]
    async fn clarification_failure_uses_fallback() {
        let completer = Arc::new(ScriptedCompleter::new().fail("down"));
        let assistant = assistant(&config(), completer, Arc::new(MockStore::new()));

        assert_eq!(assistant.handle_ambiguous_question("x").await, CLARIFY_FALLBACK);
    }

    #[tokio::test]
    async fn empty_clarification_uses_placeholder() {
        let completer = Arc::new(ScriptedCompleter::new().reply(""));
        let assistant = assistant(&config(), completer, Arc::new(MockStore::new()));

        assert_eq!(assistant.handle_ambiguous_question("x").await, CLARIFY_EMPTY);
    }

    struct SlowCompleter;

    #[async_trait::async_trait]
    impl TextCompleter for SlowCompleter {
        async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("{}".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_timeout_maps_to_synthesis_error() {
        let config = Config {
            stage_timeout: Some(Duration::from_secs(5)),
            ..config()
        };
        let assistant = Assistant::new(&config, Arc::new(SlowCompleter), Arc::new(MockStore::new()));
        let question = Question::parse("count logs").unwrap();

        let err = assistant.answer(&question).await.unwrap_err();

        assert!(matches!(err, PipelineError::Synthesis(msg) if msg.contains("timed out")));
    }

    fn timed_config() -> Config {
        Config {
            stage_timeout: Some(Duration::from_secs(5)),
            ..config()
        }
    }

    /// Answers every read after a minute.
    struct SlowStore;

    #[async_trait::async_trait]
    impl DocumentStore for SlowStore {
        async fn aggregate(&self, _pipeline: Vec<JsonObject>) -> anyhow::Result<Vec<JsonObject>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn find(&self, _query: FindQuery) -> anyhow::Result<Vec<JsonObject>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn count(&self, _filter: JsonObject) -> anyhow::Result<u64> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0)
        }
    }

    /// Returns a count descriptor at once, then stalls on every later call.
    struct SlowNarration {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextCompleter for SlowNarration {
        async fn complete(&self, _request: CompletionRequest) -> anyhow::Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(r#"{"count": {"status": "failed"}}"#.to_string());
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn execution_timeout_maps_to_execution_guidance() {
        let completer = Arc::new(ScriptedCompleter::new().reply(r#"{"count": {"status": "failed"}}"#));
        let assistant = Assistant::new(&timed_config(), completer.clone(), Arc::new(SlowStore));

        let err = assistant
            .answer(&Question::parse("count failed").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Execution(msg) if msg.contains("timed out")));

        let completer = Arc::new(ScriptedCompleter::new().reply(r#"{"count": {"status": "failed"}}"#));
        let assistant = Assistant::new(&timed_config(), completer.clone(), Arc::new(SlowStore));

        let answer = assistant.process_question("count failed").await;

        assert_eq!(answer, Answer::text(EXECUTION_GUIDANCE));
        assert_eq!(completer.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn narration_timeout_maps_to_unexpected_guidance() {
        let slow_narration = || Arc::new(SlowNarration { calls: AtomicUsize::new(0) });
        let store = Arc::new(MockStore::new().with_count(3));

        let assistant = Assistant::new(&timed_config(), slow_narration(), store.clone());
        let err = assistant
            .answer(&Question::parse("count failed").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Formatting(msg) if msg.contains("timed out")));

        let assistant = Assistant::new(&timed_config(), slow_narration(), store.clone());
        let answer = assistant.process_question("count failed").await;

        assert_eq!(answer, Answer::text(UNEXPECTED_GUIDANCE));
        assert_eq!(store.calls().len(), 2);
    }
}
