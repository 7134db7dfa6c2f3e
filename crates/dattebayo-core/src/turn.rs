//! One user submission through to its transcript update.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::CompletionProvider;
use crate::conversation::ConversationStore;
use crate::error::{ChatError, CompletionError};
use crate::params::RequestParameters;
use crate::persona::FAILURE_TEXT;
use crate::state::{ChatMessage, Exchange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub reply: Option<Exchange>,
    /// Raw provider error, shown once and never stored in the history.
    pub transient_error: Option<String>,
}

impl TurnOutcome {
    fn idle() -> Self {
        Self {
            state: TurnState::AwaitingInput,
            reply: None,
            transient_error: None,
        }
    }
}

/// What the core needs from whatever is showing the conversation.
#[async_trait]
pub trait DisplaySurface: Send {
    async fn user_input(&mut self) -> Option<String>;
    fn selected_model(&self) -> String;
    fn selected_temperature(&self) -> f32;
    fn render_history(&mut self, history: &[Exchange]);
    fn render_busy_indicator(&mut self, busy: bool);
    fn render_transient_error(&mut self, message: &str);
}

/// Record the user's text and return the transcript to send.
///
/// Returns `None` (and leaves the store alone) for blank input.
pub fn begin_turn(store: &mut ConversationStore, input: Option<&str>) -> Option<Vec<ChatMessage>> {
    let text = input?;
    match store.append_user(text) {
        Ok(()) => Some(store.snapshot_for_request().to_vec()),
        Err(e) => {
            debug!("No turn started: {}", e);
            None
        }
    }
}

/// Close the turn opened by [`begin_turn`]. Failures still get a reply.
pub fn finish_turn(
    store: &mut ConversationStore,
    result: Result<String, CompletionError>,
) -> TurnOutcome {
    let (reply_text, transient_error) = match result {
        Ok(text) => (text, None),
        Err(e) => {
            warn!(kind = e.kind(), "completion failed: {}", e);
            (FAILURE_TEXT.to_string(), Some(format!("API error: {}", e)))
        }
    };

    if let Err(e) = store.append_assistant(&reply_text) {
        warn!("Dropping reply with no pending user message: {}", e);
        return TurnOutcome::idle();
    }

    info!(turns = store.turn_count(), failed = transient_error.is_some(), "turn completed");
    TurnOutcome {
        state: TurnState::Completed,
        reply: store.history().last().cloned(),
        transient_error,
    }
}

/// Run a whole turn against a surface, waiting on the provider in place.
pub async fn run_turn(
    store: &mut ConversationStore,
    provider: &dyn CompletionProvider,
    surface: &mut dyn DisplaySurface,
) -> TurnOutcome {
    let input = surface.user_input().await;
    let snapshot = match begin_turn(store, input.as_deref()) {
        Some(snapshot) => snapshot,
        None => return TurnOutcome::idle(),
    };
    let params = RequestParameters::new(surface.selected_model(), surface.selected_temperature());

    surface.render_busy_indicator(true);
    let result = provider.complete(&snapshot, &params).await;
    surface.render_busy_indicator(false);

    let outcome = finish_turn(store, result);
    if let Some(message) = &outcome.transient_error {
        surface.render_transient_error(message);
    }
    surface.render_history(store.history());
    outcome
}

/// A conversation plus at most one outstanding provider request.
///
/// The request runs on its own tokio task so the caller can keep drawing.
pub struct ChatSession {
    store: ConversationStore,
    provider: Arc<dyn CompletionProvider>,
    in_flight: Option<JoinHandle<Result<String, CompletionError>>>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store: ConversationStore::new(),
            provider,
            in_flight: None,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn history(&self) -> &[Exchange] {
        self.store.history()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a turn. Must be called from within a tokio runtime.
    pub fn submit(&mut self, input: &str, params: RequestParameters) -> Result<(), ChatError> {
        if self.is_busy() {
            return Err(ChatError::TurnInProgress);
        }
        let snapshot = begin_turn(&mut self.store, Some(input)).ok_or(ChatError::EmptyInput)?;

        let provider = Arc::clone(&self.provider);
        self.in_flight = Some(tokio::spawn(async move {
            provider.complete(&snapshot, &params).await
        }));
        Ok(())
    }

    /// Finish the turn if its request has come back; never blocks.
    pub async fn poll(&mut self) -> Option<TurnOutcome> {
        let finished = self.in_flight.as_ref().is_some_and(|h| h.is_finished());
        if !finished {
            return None;
        }
        self.wait().await
    }

    /// Wait for the outstanding request, if any, and finish the turn.
    pub async fn wait(&mut self) -> Option<TurnOutcome> {
        let handle = self.in_flight.take()?;
        let result = handle
            .await
            .unwrap_or_else(|e| Err(CompletionError::Aborted(e.to_string())));
        Some(finish_turn(&mut self.store, result))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::persona::SYSTEM_PROMPT;
    use crate::state::ChatRole;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        calls: AtomicUsize,
        seen_lengths: Mutex<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                seen_lengths: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            transcript: &[ChatMessage],
            _params: &RequestParameters,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(transcript[0].role, ChatRole::System);
            assert_eq!(transcript.last().map(|m| m.role), Some(ChatRole::User));
            self.seen_lengths.lock().unwrap().push(transcript.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::EmptyResponse))
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        input: Option<String>,
        busy_events: Vec<bool>,
        errors: Vec<String>,
        renders: usize,
        last_history: Vec<Exchange>,
    }

    impl RecordingSurface {
        fn with_input(text: &str) -> Self {
            Self {
                input: Some(text.to_string()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl DisplaySurface for RecordingSurface {
        async fn user_input(&mut self) -> Option<String> {
            self.input.take()
        }

        fn selected_model(&self) -> String {
            "gpt-4".to_string()
        }

        fn selected_temperature(&self) -> f32 {
            0.5
        }

        fn render_history(&mut self, history: &[Exchange]) {
            self.renders += 1;
            self.last_history = history.to_vec();
        }

        fn render_busy_indicator(&mut self, busy: bool) {
            self.busy_events.push(busy);
        }

        fn render_transient_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_successful_turn_records_exchange() {
        let mut store = ConversationStore::new();
        let provider = ScriptedProvider::new(vec![Ok("Dattebayo!! ... Believe it!".into())]);
        let mut surface = RecordingSurface::with_input("How do I bake a brownie?");

        let outcome = run_turn(&mut store, &provider, &mut surface).await;

        assert_eq!(outcome.state, TurnState::Completed);
        assert!(outcome.transient_error.is_none());
        assert_eq!(
            surface.last_history.last(),
            Some(&Exchange {
                user: "How do I bake a brownie?".into(),
                assistant: "Dattebayo!! ... Believe it!".into(),
            })
        );
        assert_eq!(surface.busy_events, vec![true, false]);
        assert!(surface.errors.is_empty());
        assert_eq!(store.last_role(), Some(ChatRole::Assistant));
    }

    #[tokio::test]
    async fn test_failed_turn_appends_apology_and_reports_once() {
        let mut store = ConversationStore::new();
        let provider = ScriptedProvider::new(vec![Err(CompletionError::Network(
            "connection refused".into(),
        ))]);
        let mut surface = RecordingSurface::with_input("Teach me a shortcut to study better");

        let outcome = run_turn(&mut store, &provider, &mut surface).await;

        assert_eq!(outcome.state, TurnState::Completed);
        assert_eq!(surface.errors.len(), 1);
        assert!(surface.errors[0].contains("connection refused"));
        assert_eq!(store.history().last().unwrap().assistant, FAILURE_TEXT);
        assert!(!store.history().last().unwrap().assistant.contains("connection refused"));
        assert_eq!(store.transcript().last().unwrap().role, ChatRole::Assistant);
        assert_eq!(store.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut store = ConversationStore::new();
        let provider = ScriptedProvider::new(vec![Ok("unused".into())]);

        for input in [None, Some(""), Some("   ")] {
            let mut surface = RecordingSurface {
                input: input.map(str::to_string),
                ..RecordingSurface::default()
            };
            let outcome = run_turn(&mut store, &provider, &mut surface).await;
            assert_eq!(outcome.state, TurnState::AwaitingInput);
            assert!(surface.busy_events.is_empty());
            assert_eq!(surface.renders, 0);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.transcript().len(), 1);
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn test_every_request_carries_full_transcript() {
        let mut store = ConversationStore::new();
        let provider = ScriptedProvider::new(vec![
            Ok("one".into()),
            Err(CompletionError::Timeout),
            Ok("three".into()),
        ]);

        for question in ["a", "b", "c"] {
            let mut surface = RecordingSurface::with_input(question);
            run_turn(&mut store, &provider, &mut surface).await;
        }

        assert_eq!(*provider.seen_lengths.lock().unwrap(), vec![2, 4, 6]);
        assert_eq!(store.transcript()[0].content, SYSTEM_PROMPT);
        assert_eq!(store.history().len(), 3);
        let assistants = store
            .transcript()
            .iter()
            .filter(|m| m.role == ChatRole::Assistant)
            .count();
        assert_eq!(assistants, 3);
    }

    #[test]
    fn test_finish_without_begin_is_noop() {
        let mut store = ConversationStore::new();
        let outcome = finish_turn(&mut store, Ok("orphan".into()));
        assert_eq!(outcome.state, TurnState::AwaitingInput);
        assert_eq!(store.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_session_allows_one_request_at_a_time() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Believe it!".into())]));
        let mut session = ChatSession::new(provider.clone());

        session.submit("first", RequestParameters::default()).unwrap();
        assert!(session.is_busy());
        assert_eq!(
            session.submit("second", RequestParameters::default()),
            Err(ChatError::TurnInProgress)
        );

        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome.reply.unwrap().assistant, "Believe it!");
        assert!(!session.is_busy());
        assert_eq!(session.history().len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_rejects_blank_submit() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let mut session = ChatSession::new(provider);

        assert_eq!(
            session.submit("  ", RequestParameters::default()),
            Err(ChatError::EmptyInput)
        );
        assert!(!session.is_busy());
        assert!(session.poll().await.is_none());
        assert_eq!(session.store().transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_session_poll_eventually_completes() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(CompletionError::RateLimited(
            "slow down".into(),
        ))]));
        let mut session = ChatSession::new(provider);
        session.submit("hello", RequestParameters::default()).unwrap();

        let outcome = loop {
            if let Some(outcome) = session.poll().await {
                break outcome;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(outcome.reply.unwrap().assistant, FAILURE_TEXT);
        assert!(outcome.transient_error.unwrap().contains("slow down"));
    }
}
