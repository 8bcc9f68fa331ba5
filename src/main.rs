use mark::app::{App, Flow};
use mark::cli::{self, init_config, run_remote_command};
use mark::config::Config;
use mark::event::{self, BusListener, Event};
use mark::event_handler::EventHandler;
use mark::ipc::RemoteServer;
use mark::llm::StreamingSession;
use mark::logging;
use mark::registry::CommandRegistry;
use mark::ui;

use anyhow::Context;
use crossterm::{
    event::{Event as TermEvent, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = CommandRegistry::builtin();
    let (cli, remote) = cli::parse(&registry);

    let working_dir = std::env::current_dir().context("Failed to read current directory")?;
    let _log_guard = logging::init(logging::debug_enabled(), &working_dir);

    // Subcommands talk to the running instance and exit
    if let Some(remote) = remote {
        return run_remote_command(&registry, &working_dir, &remote).await;
    }

    // Handle --init flag
    if cli.init {
        return init_config(&cli.config);
    }

    let config = Config::load_or_default(&cli.config)?;
    let provider = config.provider.build()?;

    // Remote commands and stream output share one bus
    let (sink, bus) = event::bus(config.bus.capacity);
    let server = RemoteServer::start(&working_dir, sink.clone(), registry)
        .context("Failed to create socket file")?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server.serve());

    let (inbox_tx, inbox_rx) = event::inbox();
    let listener = BusListener::spawn(bus, inbox_tx);

    let streaming = StreamingSession::new(provider, sink);
    let mut app = App::new(&working_dir, streaming).with_sidebar_percent(config.ui.sidebar_percent);
    info!(dir = %working_dir.display(), provider = app.provider_name(), "mark started");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // TUI event loop
    let result = run_app(&mut terminal, &mut app, inbox_rx).await;

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    server_handle.close();
    server_task.abort();
    drop(listener);
    info!("mark stopped");

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    mut inbox: mpsc::Receiver<Event>,
) -> anyhow::Result<()> {
    let mut keys = EventStream::new();

    let size = terminal.size()?;
    app.update(Event::WindowResize {
        width: size.width,
        height: size.height,
    })?;

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // One event per iteration, from the bus listener or the keyboard
        let flow = tokio::select! {
            Some(event) = inbox.recv() => app.update(event)?,
            term_event = keys.next() => match term_event {
                Some(Ok(TermEvent::Key(key))) => {
                    let mut event_handler = EventHandler::new(app);
                    if event_handler.handle_key_event(key)? {
                        Flow::Quit
                    } else {
                        Flow::Continue
                    }
                }
                Some(Ok(TermEvent::Resize(width, height))) => {
                    app.update(Event::WindowResize { width, height })?
                }
                Some(Ok(_)) => Flow::Continue,
                Some(Err(e)) => return Err(e).context("Failed to read terminal input"),
                None => Flow::Quit,
            },
        };

        if flow == Flow::Quit {
            break;
        }
    }

    Ok(())
}
