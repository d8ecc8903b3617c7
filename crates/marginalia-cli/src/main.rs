mod app;
mod geometry;
mod ui;

use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use marginalia_config::{Config, PrefsStore};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;

const TICK: Duration = Duration::from_millis(120);

/// Logs go to a file so they don't draw over the alternate screen.
fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);
    let log_path = env::temp_dir().join("marginalia.log");
    if let Ok(file) = File::create(&log_path) {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    log::info!("marginalia starting up");

    // Determine the document root from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();
    log::info!("Config path: {}", config_path.display());

    let config;
    let from_config;
    if args.len() == 2 {
        config = match Config::load() {
            // Keep configured paging and preview limits, override the root
            Ok(Some(loaded)) => Config {
                root_path: PathBuf::from(&args[1]),
                ..loaded
            },
            _ => Config::new(&args[1]),
        };
        from_config = false;
    } else if args.len() == 1 {
        match Config::load() {
            Ok(Some(loaded)) => {
                config = loaded;
                from_config = true;
            }
            Ok(None) => {
                eprintln!("Error: No document root provided and no config file found");
                eprintln!("Usage: {} <document-root>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <document-root>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [document-root]", args[0]);
        process::exit(1);
    }

    if !config.root_path.is_dir() {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Document root '{}'{} is not a directory",
            config.root_path.display(),
            source
        );
        process::exit(1);
    }

    let prefs = PrefsStore::open_file(config.prefs_path())?;
    let mut app = App::new(config, prefs)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    app.prefs.close();

    if let Err(err) = res {
        println!("{err:?}");
    }
    Ok(())
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::ui(f, app))?;

        // Poll so the comment panel keeps following its anchor between inputs
        if !event::poll(TICK)? {
            app.session.schedule_frame();
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if app.handle_key(key).await? {
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse).await?,
            Event::Resize(..) => app.session.schedule_frame(),
            _ => {}
        }
    }
}
