use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}
