use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use support_chat::handler::handle_event;
use support_chat::tui::{self, EventHandler, Tui};
use support_chat::{ui, App, ChatClient, Config};

#[derive(Parser)]
#[command(name = "support-chat")]
#[command(about = "Chat with a support assistant; replies stream in as they are written")]
#[command(version)]
struct Cli {
    /// Chat endpoint that receives the conversation as JSON
    #[arg(long, env = "SUPPORT_CHAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write logs; the terminal belongs to the UI
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = Some(log_file);
    }
    let config = config.resolved()?;

    if cli.write_config {
        let path = match cli.config {
            Some(path) => path,
            None => Config::default_path()?,
        };
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Some(log_file) = &config.log_file {
        init_logging(log_file)?;
    }
    info!(endpoint = config.endpoint(), "starting support-chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &config).await;
    tui::restore()?;

    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, config: &Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(
        ChatClient::new(config.endpoint()),
        config.greeting(),
        events.sender(),
    );

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handle_event(&mut app, event),
            None => break,
        }
    }

    Ok(())
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
