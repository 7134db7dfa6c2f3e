use thiserror::Error;

/// Errors raised by session setup and the conversation store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("no OpenAI API key found in the secrets file, OPENAI_API_KEY, or session input")]
    MissingCredential,

    #[error("message is empty")]
    EmptyInput,

    #[error("no user message is waiting for a reply")]
    NoPendingTurn,

    #[error("a reply is still outstanding for the previous message")]
    TurnInProgress,

    #[error("config error: {0}")]
    Config(String),
}

/// A failed call to the completion provider.
///
/// Every variant is recoverable: the turn still completes with the fixed
/// apology text and the message here is shown once as a transient notice.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("authentication rejected ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("provider returned no content")]
    EmptyResponse,

    #[error("refusing to send an empty transcript")]
    EmptyTranscript,

    #[error("request task aborted: {0}")]
    Aborted(String),
}

impl CompletionError {
    /// Short stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Network(_) => "network",
            CompletionError::Timeout => "timeout",
            CompletionError::Authentication { .. } => "authentication",
            CompletionError::RateLimited(_) => "rate_limited",
            CompletionError::Provider { .. } => "provider",
            CompletionError::MalformedResponse(_) => "malformed_response",
            CompletionError::EmptyResponse => "empty_response",
            CompletionError::EmptyTranscript => "empty_transcript",
            CompletionError::Aborted(_) => "aborted",
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout
        } else if err.is_decode() {
            CompletionError::MalformedResponse(err.to_string())
        } else {
            CompletionError::Network(err.to_string())
        }
    }
}
