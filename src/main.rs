//! sleet launcher: terminal setup, the event/render loop, and teardown.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::Event;
use tui::{backend::CrosstermBackend, Terminal};

use sleet::config::Config;
use sleet::executor::DemoExecutor;
use sleet::workspace::Workspace;

#[derive(Parser)]
#[command(name = "sleet")]
#[command(about = "A terminal SQL client with an editable results grid", long_about = None)]
struct Cli {
    /// SQL file to load into the query pane on startup
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // a broken config is reported once and then replaced with defaults
    let (config, config_error) = match Config::load() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e.to_string())),
    };

    let mut workspace = Workspace::new(
        Box::new(DemoExecutor::new()),
        config.database.clone(),
        Config::data_dir(),
    );
    if let Some(error) = config_error {
        workspace.set_status(error);
    }
    if let Some(path) = cli.file {
        match std::fs::read_to_string(&path) {
            Ok(text) => workspace.input.set_text(text),
            Err(e) => workspace.set_status(format!("could not open {}: {}", path.display(), e)),
        }
    }

    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let result = run_loop(&mut workspace, &mut term);

    workspace.final_save();
    let mut out = io::stdout();
    crossterm::queue!(
        out,
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    out.flush()?;
    crossterm::terminal::disable_raw_mode()?;
    result
}

fn run_loop<B: tui::backend::Backend>(
    workspace: &mut Workspace,
    term: &mut Terminal<B>,
) -> anyhow::Result<()> {
    let idle_tick = Duration::from_millis(100);
    let timer_update = Duration::from_millis(333);
    let mut last_timer = Instant::now();
    let mut last_draw = Instant::now();
    let mut dirty = true;

    'main: loop {
        if workspace.poll_bridge() {
            dirty = true;
        }

        let timeout = if workspace.running { timer_update } else { idle_tick };
        if crossterm::event::poll(timeout)? {
            match crossterm::event::read()? {
                Event::Key(k) if workspace.handle_key(k)? => break 'main,
                Event::Key(_) => dirty = true,
                Event::Mouse(m) => {
                    workspace.handle_mouse(m);
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        if workspace.update() {
            dirty = true;
        }
        // keep elapsed timers and the copied-mark fade moving
        if workspace.running && last_timer.elapsed() >= timer_update {
            last_timer = Instant::now();
            dirty = true;
        }

        if dirty && last_draw.elapsed() >= Duration::from_millis(15) {
            workspace.render(term)?;
            last_draw = Instant::now();
            dirty = false;
        }
    }
    Ok(())
}
