pub mod openai;

pub use openai::OpenAIClient;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::params::RequestParameters;
use crate::state::ChatMessage;

/// A remote service that turns a transcript into the next assistant reply.
///
/// Implementations send exactly one request per call and never retry.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        transcript: &[ChatMessage],
        params: &RequestParameters,
    ) -> Result<String, CompletionError>;
}
