mod app;
mod handler;
mod tui;
mod ui;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use askme_core::Config;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "askme")]
#[command(about = "Upload a PDF to your backend and chat about it")]
#[command(version)]
struct Cli {
    /// PDF to select on startup
    file: Option<PathBuf>,

    /// Backend base URL (defaults to the config file, then http://localhost:8000)
    #[arg(long, env = "ASKME_BASE_URL")]
    base_url: Option<String>,

    /// Where to write logs (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::get_config_path().ok();
    let (config, config_error) = match &config_path {
        Some(path) => match Config::load_from(path) {
            Ok(config) => (config, None),
            Err(err) => (Config::new(), Some(err)),
        },
        None => (Config::new(), None),
    };

    let log_path = match cli.log_file.clone() {
        Some(path) => Some(path),
        None => Config::default_log_path().ok(),
    };
    // Logging is best-effort; the UI runs without it
    if let Some(path) = &log_path {
        if let Err(err) = init_logging(path, config.log_level()) {
            eprintln!("askme: logging disabled: {err:#}");
        }
    }

    if let Some(err) = config_error {
        warn!(error = %format!("{err:#}"), "could not read config file, using defaults");
    }

    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    info!(%base_url, "askme starting v{}", env!("CARGO_PKG_VERSION"));

    let mut app = App::new(config, config_path, &base_url);
    if let Some(file) = &cli.file {
        app.session.select_path(file);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    info!("askme exiting");
    Ok(())
}

fn init_logging(path: &Path, default_level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}
