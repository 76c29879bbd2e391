use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use logchat_assistant::{Assistant, MongoStore};
use logchat_common::Config;

#[derive(Parser)]
#[command(name = "logchat")]
#[command(about = "Ask natural-language questions about the MongoDB logs collection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question; prints `{ response, chartData }` as JSON
    Ask {
        /// The question, e.g. "average TOTAL_JOBS_SENT_TO_INDEX by client"
        question: Vec<String>,
    },

    /// Ask whether a question can be answered, without querying the database
    Clarify {
        question: Vec<String>,
    },

    /// Connect to MongoDB and list the database's collections
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("logchat=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    match cli.command {
        Commands::Ask { question } => {
            let assistant = Assistant::from_config(&config);
            let answer = assistant.process_question(&question.join(" ")).await;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Clarify { question } => {
            let assistant = Assistant::from_config(&config);
            println!("{}", assistant.handle_ambiguous_question(&question.join(" ")).await);
        }
        Commands::Check => {
            let report = MongoStore::from_config(&config).check().await?;
            info!(database = %report.database, "MongoDB connection OK");
            println!("Database: {}", report.database);
            println!("Collections:");
            for name in &report.collections {
                println!(" - {name}");
            }
            println!("{}: {} documents", report.collection, report.document_count);
        }
    }

    Ok(())
}
