pub mod ai;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod params;
pub mod persona;
pub mod state;
pub mod turn;

// Re-export main types for convenience
pub use ai::{CompletionProvider, OpenAIClient};
pub use config::Config;
pub use conversation::ConversationStore;
pub use credentials::{ApiKey, CredentialResolver, KeySource};
pub use error::{ChatError, CompletionError};
pub use params::RequestParameters;
pub use state::{ChatMessage, ChatRole, Exchange};
pub use turn::{ChatSession, DisplaySurface, TurnOutcome, TurnState};
