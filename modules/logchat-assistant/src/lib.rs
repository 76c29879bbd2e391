pub mod assistant;
pub mod chart;
pub mod completion;
pub mod demo;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod mongo;
pub mod prompts;
pub mod store;
pub mod synthesizer;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod types;

pub use assistant::Assistant;
pub use chart::{ChartSpec, ChartType};
pub use completion::{CompletionRequest, TextCompleter};
pub use descriptor::{FindQuery, QueryDescriptor};
pub use error::PipelineError;
pub use mongo::MongoStore;
pub use store::DocumentStore;
pub use types::{Answer, JsonObject, Question, ResultSet};
