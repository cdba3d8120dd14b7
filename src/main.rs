use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use maxchat_core::{Backend, Config, GenerateClient, Highlighter, Outcome, SessionStore};
use tracing_subscriber::EnvFilter;

mod app;
mod ask;
mod clipboard;
mod handler;
mod highlight;
mod stream;
mod tui;
mod ui;
mod view;

use app::App;
use clipboard::SystemClipboard;
use highlight::SyntectHighlighter;
use tui::EventHandler;

/// Environment variable holding the log filter, e.g. `maxchat=debug`
const LOG_ENV: &str = "MAXCHAT_LOG";

#[derive(Parser)]
#[command(name = "maxchat")]
#[command(about = "Terminal chat with the MaxMovies AI movie and series assistant")]
#[command(version)]
struct Cli {
    /// Generation endpoint (overrides MAXCHAT_ENDPOINT and the config file)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so logs go to a file
    if let Err(e) = init_logging() {
        eprintln!("{}: {}", "Logging disabled".yellow(), e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config");
        Config::new()
    });
    let endpoint = cli.endpoint.unwrap_or_else(|| config.endpoint());
    tracing::info!(%endpoint, "starting");

    let backend: Arc<dyn Backend> = Arc::new(GenerateClient::new(&endpoint));
    let highlighter: Arc<dyn Highlighter> = Arc::new(SyntectHighlighter::new());
    let store = SessionStore::open_default()?;

    match cli.command {
        Some(Commands::Ask { prompt }) => {
            let outcome = ask::run(backend, highlighter, &store, &config, &prompt).await?;
            if matches!(outcome, Outcome::StatusError(_) | Outcome::NetworkFailure) {
                std::process::exit(1);
            }
        }
        None => run_tui(backend, highlighter, store, &config).await?,
    }

    Ok(())
}

async fn run_tui(
    backend: Arc<dyn Backend>,
    highlighter: Arc<dyn Highlighter>,
    store: SessionStore,
    config: &Config,
) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = match App::new(backend, store, config, Box::new(SystemClipboard::default()), events.sender()) {
        Ok(app) => app.with_highlighter(highlighter),
        Err(e) => {
            tui::restore()?;
            return Err(e);
        }
    };

    let result = event_loop(&mut app, &mut terminal, &mut events).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn event_loop(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event)?;

        // Apply everything already queued before the next frame
        while let Some(event) = events.try_next() {
            handler::handle_event(app, event)?;
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("maxchat.log"))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
