use std::sync::Arc;

use anyhow::Result;
use dattebayo_core::{
    ApiKey, ChatError, ChatSession, Config, CredentialResolver, Exchange, KeySource,
    OpenAIClient, RequestParameters,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Settings,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Request settings
    pub params: RequestParameters,

    // Conversation; None until an API key is known
    pub session: Option<ChatSession>,
    pub key_source: Option<KeySource>,
    pub transient_error: Option<String>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,     // inner height of the chat pane
    pub chat_max_scroll: u16, // wrapped line count minus height, as last rendered
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,

    config: Config,
    resolver: CredentialResolver,
}

impl App {
    pub fn new(config: Config, resolver: CredentialResolver, params: RequestParameters) -> Result<Self> {
        let mut app = Self::disconnected(config, resolver, params);

        match app.resolver.resolve() {
            Ok((key, source)) => app.connect(key, source)?,
            Err(ChatError::MissingCredential) => {
                info!("No API key found; asking for one");
                app.show_api_key_input = true;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(app)
    }

    fn disconnected(config: Config, resolver: CredentialResolver, params: RequestParameters) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::Input,

            input: String::new(),
            input_cursor: 0,

            params,

            session: None,
            key_source: None,
            transient_error: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_max_scroll: 0,
            chat_area: None,

            animation_frame: 0,

            show_model_picker: false,
            available_models: OpenAIClient::list_models(),
            model_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,

            config,
            resolver,
        }
    }

    #[cfg(test)]
    pub fn with_provider(
        params: RequestParameters,
        provider: Arc<dyn dattebayo_core::CompletionProvider>,
    ) -> Self {
        let mut app = Self::disconnected(Config::new(), CredentialResolver::default(), params);
        app.session = Some(ChatSession::new(provider));
        app.key_source = Some(KeySource::Session);
        app
    }

    fn connect(&mut self, key: ApiKey, source: KeySource) -> Result<()> {
        let client = OpenAIClient::with_options(key, self.config.api_base(), self.config.request_timeout())?;
        info!(source = source.label(), api_base = client.base_url(), "provider client ready");
        self.session = Some(ChatSession::new(Arc::new(client)));
        self.key_source = Some(source);
        Ok(())
    }

    /// Use the typed key for this session only.
    pub fn submit_api_key(&mut self) -> Result<()> {
        let entered = self.api_key_input.trim().to_string();
        if entered.is_empty() {
            return Ok(());
        }
        self.resolver.set_session_key(entered);
        let (key, source) = self.resolver.resolve()?;
        self.connect(key, source)?;

        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        Ok(())
    }

    /// Leaving the key prompt without a key ends the program.
    pub fn cancel_api_key(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        if self.session.is_none() {
            self.should_quit = true;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_busy())
    }

    pub fn history(&self) -> &[Exchange] {
        self.session.as_ref().map(|s| s.history()).unwrap_or(&[])
    }

    /// Send the current input. Blank input and submits while busy are ignored.
    pub fn submit_input(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.submit(&self.input, self.params.clone()) {
            Ok(()) => {
                self.input.clear();
                self.input_cursor = 0;
                self.transient_error = None;
                self.animation_frame = 0;
                self.scroll_chat_to_bottom();
            }
            Err(e) => debug!("Submit ignored: {}", e),
        }
    }

    /// Pick up a finished reply, if there is one.
    pub async fn poll_reply(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(outcome) = session.poll().await {
            if let Some(message) = outcome.transient_error {
                self.transient_error = Some(message);
            }
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Model picker

    pub fn open_model_picker(&mut self) {
        let current = self
            .available_models
            .iter()
            .position(|m| m == &self.params.model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current));
        self.show_model_picker = true;
    }

    pub fn model_picker_down(&mut self) {
        let len = self.available_models.len();
        if len == 0 {
            return;
        }
        let i = self.model_picker_state.selected().map(|i| (i + 1) % len).unwrap_or(0);
        self.model_picker_state.select(Some(i));
    }

    pub fn model_picker_up(&mut self) {
        let len = self.available_models.len();
        if len == 0 {
            return;
        }
        let i = self
            .model_picker_state
            .selected()
            .map(|i| if i == 0 { len - 1 } else { i - 1 })
            .unwrap_or(0);
        self.model_picker_state.select(Some(i));
    }

    pub fn confirm_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
        {
            self.params.model = model.clone();
        }
        self.show_model_picker = false;
    }

    // Chat scrolling

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Bounded by the last rendered frame; `ui::render_chat` re-clamps.
    pub fn scroll_chat_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.chat_max_scroll);
    }

    /// Pinned to the last line on the next render.
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = u16::MAX;
    }

    pub fn pending_user(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.store().pending_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dattebayo_core::persona::FAILURE_TEXT;
    use dattebayo_core::{ChatMessage, CompletionError};

    struct EchoProvider;

    #[async_trait]
    impl dattebayo_core::CompletionProvider for EchoProvider {
        async fn complete(
            &self,
            transcript: &[ChatMessage],
            params: &RequestParameters,
        ) -> Result<String, CompletionError> {
            let question = &transcript.last().unwrap().content;
            if question == "fail" {
                return Err(CompletionError::Network("connection reset".into()));
            }
            Ok(format!("Dattebayo!! {} ({})", question, params.model))
        }
    }

    async fn settle(app: &mut App) {
        while app.is_busy() {
            tokio::task::yield_now().await;
            app.poll_reply().await;
        }
    }

    #[tokio::test]
    async fn test_submit_and_receive_reply() {
        let mut app = App::with_provider(RequestParameters::new("gpt-4", 0.8), Arc::new(EchoProvider));
        app.input = "ramen?".to_string();
        app.input_cursor = 6;

        app.submit_input();
        assert!(app.is_busy());
        assert!(app.input.is_empty());
        assert_eq!(app.pending_user(), Some("ramen?"));

        settle(&mut app).await;
        assert_eq!(app.history().len(), 1);
        assert_eq!(app.history()[0].assistant, "Dattebayo!! ramen? (gpt-4)");
        assert!(app.transient_error.is_none());
    }

    #[tokio::test]
    async fn test_failure_sets_transient_error_and_clears_on_next_submit() {
        let mut app = App::with_provider(RequestParameters::default(), Arc::new(EchoProvider));
        app.input = "fail".to_string();
        app.submit_input();
        settle(&mut app).await;

        assert_eq!(app.history()[0].assistant, FAILURE_TEXT);
        assert!(app.transient_error.as_deref().unwrap().contains("connection reset"));

        app.input = "again".to_string();
        app.submit_input();
        assert!(app.transient_error.is_none());
        settle(&mut app).await;
        assert_eq!(app.history().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_and_busy_submits_are_ignored() {
        let mut app = App::with_provider(RequestParameters::default(), Arc::new(EchoProvider));
        app.input = "   ".to_string();
        app.submit_input();
        assert!(!app.is_busy());
        assert_eq!(app.input, "   ");

        app.input = "one".to_string();
        app.submit_input();
        app.input = "two".to_string();
        app.submit_input();
        assert_eq!(app.input, "two");

        settle(&mut app).await;
        assert_eq!(app.history().len(), 1);
    }

    #[test]
    fn test_missing_key_prompts_then_quits_on_cancel() {
        let resolver = CredentialResolver::new(None, None);
        let mut app = App::new(Config::new(), resolver, RequestParameters::default()).unwrap();
        assert!(app.show_api_key_input);
        assert!(app.session.is_none());

        app.cancel_api_key();
        assert!(app.should_quit);
    }

    #[test]
    fn test_entered_key_connects_for_session() {
        let resolver = CredentialResolver::new(None, None);
        let mut app = App::new(Config::new(), resolver, RequestParameters::default()).unwrap();

        app.api_key_input = "sk-typed-in".to_string();
        app.submit_api_key().unwrap();

        assert!(!app.show_api_key_input);
        assert!(app.session.is_some());
        assert_eq!(app.key_source, Some(KeySource::Session));
        assert!(app.api_key_input.is_empty());
    }

    #[test]
    fn test_model_picker_wraps_and_confirms() {
        let mut app = App::with_provider(RequestParameters::default(), Arc::new(EchoProvider));
        assert_eq!(app.available_models, OpenAIClient::list_models());
        app.open_model_picker();
        assert_eq!(app.model_picker_state.selected(), Some(0));

        app.model_picker_up();
        assert_eq!(app.model_picker_state.selected(), Some(1));
        app.confirm_model();
        assert_eq!(app.params.model, "gpt-4");
        assert!(!app.show_model_picker);
    }
}
