//! Line-mode surface for terminals where the full-screen UI is unwanted.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use colored::*;
use dattebayo_core::persona::{ASSISTANT_LABEL, BUSY_TEXT, FAN_DISCLAIMER, SUGGESTED_PROMPTS};
use dattebayo_core::turn::run_turn;
use dattebayo_core::{
    CompletionProvider, ConversationStore, DisplaySurface, Exchange, RequestParameters,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

const QUIT_COMMAND: &str = "/quit";

pub struct PlainSurface<R = BufReader<Stdin>> {
    lines: Lines<R>,
    params: RequestParameters,
    rendered: usize,
    finished: bool,
}

impl PlainSurface {
    pub fn stdin(params: RequestParameters) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), params)
    }
}

impl<R: AsyncBufRead + Unpin + Send> PlainSurface<R> {
    pub fn new(reader: R, params: RequestParameters) -> Self {
        Self {
            lines: reader.lines(),
            params,
            rendered: 0,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub async fn read_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read input: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> DisplaySurface for PlainSurface<R> {
    async fn user_input(&mut self) -> Option<String> {
        print!("{} ", "You:".bold().cyan());
        let _ = std::io::stdout().flush();

        match self.read_line().await {
            Some(line) if line.trim() == QUIT_COMMAND => {
                self.finished = true;
                None
            }
            Some(line) => Some(line),
            None => {
                self.finished = true;
                None
            }
        }
    }

    fn selected_model(&self) -> String {
        self.params.model.clone()
    }

    fn selected_temperature(&self) -> f32 {
        self.params.temperature
    }

    fn render_history(&mut self, history: &[Exchange]) {
        for exchange in history.iter().skip(self.rendered) {
            println!("{} {}\n", format!("{}:", ASSISTANT_LABEL).bold().yellow(), exchange.assistant);
        }
        self.rendered = history.len();
    }

    fn render_busy_indicator(&mut self, busy: bool) {
        if busy {
            println!("{}", BUSY_TEXT.dimmed());
        }
    }

    fn render_transient_error(&mut self, message: &str) {
        eprintln!("{}", message.red());
    }
}

/// Ask for a key on stdin when nothing else supplied one.
pub async fn prompt_api_key<R: AsyncBufRead + Unpin + Send>(surface: &mut PlainSurface<R>) -> Result<String> {
    println!(
        "{}",
        "No OPENAI_API_KEY found in the secrets file or environment. Enter it below (only kept for this session)."
            .yellow()
    );
    print!("OpenAI API key: ");
    let _ = std::io::stdout().flush();

    match surface.read_line().await.map(|l| l.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => bail!(dattebayo_core::ChatError::MissingCredential),
    }
}

pub async fn run<R: AsyncBufRead + Unpin + Send>(
    surface: &mut PlainSurface<R>,
    provider: Arc<dyn CompletionProvider>,
) -> Result<ConversationStore> {
    println!("{}", "Naruto-style Chatbot (fan-made, Dattebayo!)".bold().yellow());
    println!("{}", FAN_DISCLAIMER.dimmed());
    println!(
        "{} {}  |  type {} to exit\n",
        "Try:".dimmed(),
        SUGGESTED_PROMPTS.join(" / ").dimmed(),
        QUIT_COMMAND.bold()
    );

    let mut store = ConversationStore::new();
    while !surface.is_finished() {
        run_turn(&mut store, provider.as_ref(), &mut *surface).await;
    }
    Ok(store)
}
