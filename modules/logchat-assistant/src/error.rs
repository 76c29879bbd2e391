use thiserror::Error;

pub const SYNTHESIS_GUIDANCE: &str = "I'm sorry, I couldn't understand how to query the database for that question. Could you rephrase it or provide more details?";
pub const EXECUTION_GUIDANCE: &str = "I understood your question, but encountered an error when querying the database. This might be due to invalid query syntax or missing data.";
pub const UNEXPECTED_GUIDANCE: &str = "I'm sorry, I encountered an unexpected error while processing your question. Please try again with a different question.";
pub const EMPTY_QUESTION_GUIDANCE: &str = "Message is required";

/// Failure of one pipeline stage. None of these are retried; each is turned
/// into user-facing text by [`PipelineError::guidance`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("failed to generate database query: {0}")]
    Synthesis(String),

    #[error("malformed query descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("failed to execute database query: {0}")]
    Execution(String),

    #[error("failed to format query results: {0}")]
    Formatting(String),
}

impl PipelineError {
    /// The text shown to the user in place of an answer.
    ///
    /// The descriptor is parsed as part of execution, so a malformed one
    /// reads as a failed query rather than a misunderstood question.
    pub fn guidance(&self) -> &'static str {
        match self {
            PipelineError::EmptyQuestion => EMPTY_QUESTION_GUIDANCE,
            PipelineError::Synthesis(_) => SYNTHESIS_GUIDANCE,
            PipelineError::MalformedDescriptor(_) | PipelineError::Execution(_) => {
                EXECUTION_GUIDANCE
            }
            PipelineError::Formatting(_) => UNEXPECTED_GUIDANCE,
        }
    }
}
