use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use dattebayo_core::{Config, CredentialResolver, OpenAIClient, RequestParameters};
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod plain;
mod tui;
mod ui;

use app::App;
use plain::PlainSurface;

#[derive(Parser)]
#[command(name = "dattebayo")]
#[command(version, about = "Chat with a fan-made Naruto-style assistant, believe it!")]
struct Cli {
    /// Model to use (gpt-3.5-turbo or gpt-4)
    #[arg(short, long)]
    model: Option<String>,

    /// Creativity, 0.0 to 1.2
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Path to config.json (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Line-by-line chat instead of the full-screen UI
    #[arg(long)]
    plain: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // The full-screen UI owns stderr, so logs only go there in plain mode
    let writer = match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None if cli.plain => BoxMakeWriter::new(std::io::stderr),
        None => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_ansi(cli.log_file.is_none())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let defaults = config.request_params();
    let params = RequestParameters::new(
        cli.model.clone().unwrap_or(defaults.model),
        cli.temperature.unwrap_or(defaults.temperature),
    );
    let resolver = CredentialResolver::from_env(config.secrets_path());

    if cli.plain {
        run_plain(config, resolver, params).await
    } else {
        run_tui(config, resolver, params).await
    }
}

async fn run_plain(config: Config, resolver: CredentialResolver, params: RequestParameters) -> Result<()> {
    let mut surface = PlainSurface::stdin(params);

    let (key, source) = match resolver.resolve() {
        Ok(found) => found,
        Err(_) => {
            let entered = plain::prompt_api_key(&mut surface).await?;
            resolver.with_session_key(entered).resolve()?
        }
    };
    info!(source = source.label(), "using API key");

    let client = OpenAIClient::with_options(key, config.api_base(), config.request_timeout())?;
    let store = plain::run(&mut surface, Arc::new(client)).await?;
    info!(turns = store.turn_count(), "session ended");
    Ok(())
}

async fn run_tui(config: Config, resolver: CredentialResolver, params: RequestParameters) -> Result<()> {
    let mut app = App::new(config, resolver, params)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!(turns = app.history().len(), "session ended");
    result
}
