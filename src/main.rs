mod audio;
mod config;
mod controller;
mod error;
mod logging;
mod model;
mod proxy;
mod view;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reqwest::Client;

use audio::AudioOutput;
use config::{PlayerArgs, ProxyArgs};
use controller::{InputOutcome, PlaybackController};
use error::PlaybackError;
use logging::LogTarget;
use model::TrackResolver;
use view::AppView;

#[derive(Parser)]
#[command(name = "now-playing", version, about = "Play a preview of the last scrobbled track")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Terminal card that toggles a preview of the most recent scrobble
    Player(PlayerArgs),
    /// Serve the identity-hiding history proxy
    Proxy(ProxyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Proxy(args) => {
            if let Err(e) = logging::init_logging(LogTarget::Stdout) {
                eprintln!("Warning: Failed to initialize logging: {}", e);
            }
            proxy::serve(args.into_config()).await
        }
        Command::Player(args) => run_player(args).await,
    }
}

async fn run_player(args: PlayerArgs) -> Result<()> {
    if let Err(e) = logging::init_logging(LogTarget::File) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Now Playing Starting ===");

    let config = args.into_config()?;
    let resolver = TrackResolver::new(&config)?;
    let http = Client::builder().timeout(config.timeout).build()?;

    let controller = PlaybackController::new(Arc::new(resolver), move || open_output(&http));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, controller.clone()).await;
    controller.stop().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Now Playing shutting down");
    Ok(())
}

#[cfg(feature = "playback")]
fn open_output(http: &Client) -> Result<Arc<dyn AudioOutput>, PlaybackError> {
    Ok(Arc::new(audio::RodioOutput::new(http.clone())?))
}

#[cfg(not(feature = "playback"))]
fn open_output(_http: &Client) -> Result<Arc<dyn AudioOutput>, PlaybackError> {
    Ok(Arc::new(audio::UnavailableOutput))
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: PlaybackController,
) -> io::Result<()> {
    loop {
        let playback = controller.snapshot().await;

        terminal.draw(|f| {
            AppView::render(f, &playback);
        })?;

        // Short poll so the progress gauge keeps moving
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if controller.handle_key_event(key) == InputOutcome::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}
