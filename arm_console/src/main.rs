// Terminal front end for the arm controller
// Run with: cargo run -p arm_console
// ARM_HOST / ARM_PORT / ARM_RECONNECT_MS pick the controller (try `cargo run -p sim`
// with ARM_HOST=127.0.0.1); the log goes to arm_console.log, filtered by RUST_LOG.

mod app;
mod ui;

use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, Event, EventStream, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::error::Error;
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use arm_link::drivers::{ArmDriver, ArmDriverConfig, CommandSink, DriverEvent};
use arm_link::ArmClient;

const LOG_FILE: &str = "arm_console.log";

fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;
    let config = config_from_env();
    config.validate()?;

    // One thread: UI, driver and jog timer never run in parallel.
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(run(config))
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn config_from_env() -> ArmDriverConfig {
    let defaults = ArmDriverConfig::default();
    let host = std::env::var("ARM_HOST").unwrap_or(defaults.host);
    let port = std::env::var("ARM_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(defaults.port);
    let reconnect_delay_ms = std::env::var("ARM_RECONNECT_MS")
        .ok()
        .and_then(|p| p.parse::<u64>().ok())
        .unwrap_or(defaults.reconnect_delay_ms);
    ArmDriverConfig {
        host,
        port,
        reconnect_delay_ms,
    }
}

async fn run(config: ArmDriverConfig) -> Result<(), Box<dyn Error>> {
    info!("Connecting to {}", config.connection_url());
    let driver = Arc::new(ArmDriver::connect(config).await?);
    let mut events = driver.subscribe();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let release_events = supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(stdout, PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES))?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let sink: Arc<dyn CommandSink> = driver.clone();
    let mut app = App::new(ArmClient::new(sink), release_events);
    let res = run_app(&mut terminal, &mut app, &mut events).await;

    // Restore terminal
    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)?;
    terminal.show_cursor()?;

    driver.shutdown();
    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut broadcast::Receiver<DriverEvent>,
) -> Result<(), Box<dyn Error>> {
    let mut input = EventStream::new();
    // Redraw now and then so the saving marker clears on its own.
    let mut redraw = tokio::time::interval(Duration::from_millis(250));

    loop {
        app.clamp_cursors();
        terminal.draw(|f| ui::draw(f, app))?;
        if app.should_quit {
            break;
        }

        tokio::select! {
            alive = app.client.pump(events) => {
                if !alive {
                    break;
                }
            }
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => app.handle_key(key),
                Some(Ok(Event::FocusLost)) => app.focus_lost(),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = redraw.tick() => {}
        }
    }

    info!("Console closed");
    Ok(())
}
