use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelReplyError {
    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Login required: {0}")]
    LoginRequired(String),

    #[error("Scraper error: {0}")]
    Scraper(String),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("Rate limited, retry after backoff")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State error: {0}")]
    State(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ReelReplyError {
    /// Errors that may succeed if the same call is issued again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReelReplyError::Messaging(_)
                | ReelReplyError::LoginRequired(_)
                | ReelReplyError::RateLimited
                | ReelReplyError::Http(_)
        )
    }
}
