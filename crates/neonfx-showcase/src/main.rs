#![forbid(unsafe_code)]

//! NeonFX Showcase binary entry point.

use std::fs;
use std::io;
use std::process;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use neonfx::{EffectsConfig, FxSettings, Preset, Runtime};
use neonfx_showcase::app::{Action, DemoApp};
use neonfx_showcase::cli::Opts;
use neonfx_showcase::logging;
use neonfx_showcase::session::TerminalSession;
use tracing::{info, warn};
use web_time::Instant;

fn main() {
    let parsed = FxSettings::from_env_with_diagnostics();
    let opts = Opts::parse(parsed.settings.preset);

    if let Err(err) = logging::init_file_logging(&opts.log_file) {
        eprintln!(
            "Failed to open log file {}: {err}",
            opts.log_file.display()
        );
    }
    for err in &parsed.errors {
        warn!(error = %err, "ignoring invalid setting");
    }

    if let Err(err) = run(&opts, &parsed.settings) {
        eprintln!("neonfx-showcase: {err}");
        process::exit(1);
    }
}

fn load_config(opts: &Opts, settings: &FxSettings) -> neonfx::Result<(EffectsConfig, String)> {
    let (config, label) = match &opts.preset_file {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            (Preset::from_json(&json)?, path.display().to_string())
        }
        None => (opts.preset.config(), opts.preset.name().to_string()),
    };
    Ok((config.with_settings(settings), label))
}

fn run(opts: &Opts, settings: &FxSettings) -> neonfx::Result<()> {
    let (config, label) = load_config(opts, settings)?;
    info!(preset = %label, settings = %settings, "showcase starting");

    let session = TerminalSession::enter()?;
    let (cols, rows) = session.size()?;
    let mut app = DemoApp::new(Runtime::from_settings(settings), config, label, cols, rows)?;

    let frame = Duration::from_secs(1) / opts.fps;
    let exit_after = (opts.exit_after_ms > 0).then(|| Duration::from_millis(opts.exit_after_ms));
    let started = Instant::now();
    let mut last = started;
    let mut stdout = io::stdout();

    loop {
        app.draw(&mut stdout)?;

        let timeout = (last + frame).saturating_duration_since(Instant::now());
        if let Some(event) = session.next_event(timeout)? {
            match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let action = match key.code {
                        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            Action::Quit
                        }
                        KeyCode::Char(ch) => app.handle_char(ch),
                        KeyCode::Esc => Action::Quit,
                        _ => Action::Continue,
                    };
                    if action == Action::Quit {
                        break;
                    }
                }
                Event::Resize(cols, rows) => app.resize(cols, rows),
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now.duration_since(last));
        last = now;
        if exit_after.is_some_and(|limit| now.duration_since(started) >= limit) {
            info!("exit-after deadline reached");
            break;
        }
    }

    app.shutdown()?;
    drop(session);
    info!("showcase finished");
    Ok(())
}
