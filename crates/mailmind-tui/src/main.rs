//! mailmind - a terminal front-end for Email Manager IA.
//!
//! Signs in with Microsoft through the backend, keeps the returned bearer
//! credential, and shows the account's connection status.

mod app;
mod ui;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mailmind_core::auth::Session;
use mailmind_core::config::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const USAGE: &str = "\
Usage: mailmind [OPTIONS]

Options:
  --api-url <URL>      Backend base URL (overrides MAILMIND_API_URL)
  --callback <URL>     Complete sign-in with the URL the browser was redirected to
  --logout             Forget the stored session and exit
  -h, --help           Show this help";

#[derive(Debug, Default)]
struct Args {
    api_url: Option<String>,
    callback: Option<String>,
    logout: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-url" => {
                parsed.api_url = Some(args.next().context("--api-url needs a value")?);
            }
            "--callback" => {
                parsed.callback = Some(args.next().context("--callback needs a value")?);
            }
            "--logout" => parsed.logout = true,
            "-h" | "--help" => parsed.help = true,
            other => anyhow::bail!("unknown argument '{}'\n\n{}", other, USAGE),
        }
    }
    Ok(parsed)
}

/// Initialize the tracing subscriber. The terminal belongs to the UI, so
/// logs go to a daily file under the cache directory.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::daily(log_dir, "mailmind.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let log_dir = Config::cache_dir()?.join("logs");
    let _log_guard = init_tracing(&log_dir);
    info!("mailmind starting");

    let config = Config::load()?;

    if args.logout {
        let session = Session::from_boxed(config.open_storage()?);
        session.clear().context("Failed to clear session")?;
        println!("Signed out.");
        return Ok(());
    }

    let api_url = args.api_url.unwrap_or_else(|| config.resolve_api_url());
    let mut app = App::new(&config, api_url)?;
    if let Some(ref location) = args.callback {
        app.arrive(location);
    }
    app.sync_route().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("mailmind shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll with a timeout so deferred navigation shows up promptly
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        return Ok(());
                    }
                    if handle_input(app, key).await? {
                        return Ok(());
                    }
                }
                Event::Paste(text) => app.paste(&text),
                _ => {}
            }
        }

        app.sync_route().await;

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--api-url", "http://localhost:5000/api", "--callback", "/auth/callback?token=t"]).unwrap();
        assert_eq!(parsed.api_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(parsed.callback.as_deref(), Some("/auth/callback?token=t"));
        assert!(!parsed.logout);

        assert!(args(&["--logout"]).unwrap().logout);
        assert!(args(&["-h"]).unwrap().help);
        assert!(args(&["--api-url"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }
}
