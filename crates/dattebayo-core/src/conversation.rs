//! Append-only transcript plus the paired display history.

use tracing::debug;

use crate::error::ChatError;
use crate::persona::SYSTEM_PROMPT;
use crate::state::{ChatMessage, ChatRole, Exchange};

/// Owns the transcript sent to the provider and the history shown to the user.
///
/// Both sequences only ever grow. The store assumes a single writer; callers
/// must not start a new turn while a reply is outstanding.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    transcript: Vec<ChatMessage>,
    history: Vec<Exchange>,
    pending_user: Option<String>,
}

impl ConversationStore {
    /// A store with the persona instruction already seeded.
    pub fn new() -> Self {
        let mut store = Self::default();
        store.initialize();
        store
    }

    /// Seed the system message. No-op once the transcript exists.
    pub fn initialize(&mut self) {
        if self.transcript.is_empty() {
            self.transcript.push(ChatMessage::system(SYSTEM_PROMPT));
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.transcript.is_empty()
    }

    pub fn append_user(&mut self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.pending_user.is_some() {
            return Err(ChatError::TurnInProgress);
        }
        self.initialize();

        self.transcript.push(ChatMessage::user(text));
        self.pending_user = Some(text.to_string());
        debug!(messages = self.transcript.len(), "appended user message");
        Ok(())
    }

    /// Answer the pending user message and record the pair for display.
    pub fn append_assistant(&mut self, text: &str) -> Result<(), ChatError> {
        let user = self.pending_user.take().ok_or(ChatError::NoPendingTurn)?;

        self.transcript.push(ChatMessage::assistant(text));
        self.history.push(Exchange {
            user,
            assistant: text.to_string(),
        });
        debug!(turns = self.history.len(), "appended assistant message");
        Ok(())
    }

    pub fn snapshot_for_request(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn pending_user(&self) -> Option<&str> {
        self.pending_user.as_deref()
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    pub fn last_role(&self) -> Option<ChatRole> {
        self.transcript.last().map(|m| m.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seeds_system_prompt() {
        let store = ConversationStore::new();
        assert_eq!(store.transcript().len(), 1);
        assert_eq!(store.transcript()[0].role, ChatRole::System);
        assert_eq!(store.transcript()[0].content, SYSTEM_PROMPT);
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut store = ConversationStore::default();
        assert!(!store.is_initialized());
        store.initialize();
        store.initialize();
        assert_eq!(store.transcript().len(), 1);

        store.append_user("Hi").unwrap();
        store.append_assistant("Dattebayo!").unwrap();
        store.initialize();
        assert_eq!(store.transcript().len(), 3);
    }

    #[test]
    fn test_blank_input_leaves_store_untouched() {
        let mut store = ConversationStore::new();
        assert_eq!(store.append_user(""), Err(ChatError::EmptyInput));
        assert_eq!(store.append_user("  \n\t "), Err(ChatError::EmptyInput));
        assert_eq!(store.transcript().len(), 1);
        assert!(store.history().is_empty());
        assert!(store.pending_user().is_none());
    }

    #[test]
    fn test_exchange_recorded_on_assistant_reply() {
        let mut store = ConversationStore::new();
        store.append_user("How do I bake a brownie?").unwrap();
        store.append_assistant("Dattebayo!! ... Believe it!").unwrap();

        assert_eq!(
            store.history().last(),
            Some(&Exchange {
                user: "How do I bake a brownie?".to_string(),
                assistant: "Dattebayo!! ... Believe it!".to_string(),
            })
        );
        assert_eq!(store.last_role(), Some(ChatRole::Assistant));
    }

    #[test]
    fn test_assistant_without_user_is_rejected() {
        let mut store = ConversationStore::new();
        assert_eq!(store.append_assistant("hello"), Err(ChatError::NoPendingTurn));
        assert_eq!(store.transcript().len(), 1);
    }

    #[test]
    fn test_second_user_message_waits_for_reply() {
        let mut store = ConversationStore::new();
        store.append_user("first").unwrap();
        assert_eq!(store.append_user("second"), Err(ChatError::TurnInProgress));
        assert_eq!(store.transcript().len(), 2);
    }

    #[test]
    fn test_append_user_seeds_uninitialized_store() {
        let mut store = ConversationStore::default();
        store.append_user("Teach me a shortcut").unwrap();
        assert_eq!(store.transcript()[0].role, ChatRole::System);
        assert_eq!(store.transcript().len(), 2);
    }

    #[test]
    fn test_transcript_only_grows() {
        let mut store = ConversationStore::new();
        let mut previous = store.transcript().to_vec();

        for i in 0..4 {
            let _ = store.append_user(&format!("question {}", i));
            let _ = store.append_user("");
            let _ = store.append_assistant(&format!("answer {}", i));
            let _ = store.append_assistant("stray");

            let current = store.transcript();
            assert!(current.len() >= previous.len());
            assert_eq!(&current[..previous.len()], previous.as_slice());
            previous = current.to_vec();
        }

        let assistants = store
            .transcript()
            .iter()
            .filter(|m| m.role == ChatRole::Assistant)
            .count();
        assert_eq!(store.history().len(), assistants);
        assert_eq!(store.turn_count(), 4);
    }
}
