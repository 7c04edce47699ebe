use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::DefaultTerminal;
use salesdash::{
    chart_export, report, App, AppConfig, AppEvent, ConfigManager, Dashboard,
    DashboardSettings, Filters, LoadOptions, Theme,
};
use salesdash_cli::{Args, DEFAULT_DATA_PATH};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args, config: AppConfig, path: PathBuf) -> Result<()> {
    let poll_interval = Duration::from_millis(config.performance.event_poll_interval_ms);
    let theme = Theme::from_config(&config.theme).unwrap_or_default();

    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new_with_config(tx.clone(), theme, config).with_args(args);
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(path))?;

    loop {
        if crossterm::event::poll(poll_interval)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// Print the dashboard as text and optionally export its charts, without the terminal UI.
fn run_headless(args: &Args, config: &AppConfig, path: PathBuf) -> Result<()> {
    let options = LoadOptions::from_args_and_config(args, config);
    let settings = DashboardSettings::from_args_and_config(args, config);
    let dashboard = Dashboard::load(&path, &options, settings);
    let filters = Filters::from_args(args, dashboard.bounds());
    let view = dashboard.render(&filters);

    if args.report || args.export_dir.is_none() {
        let stdout = std::io::stdout();
        report::write_report(&view, &mut stdout.lock())?;
    }

    let export_dir = args.export_dir.clone().or_else(|| config.export.dir.clone());
    if let Some(dir) = export_dir {
        let written =
            chart_export::export_view(&view, &dir, config.export.width, config.export.height)?;
        for path in written {
            println!("wrote {}", path.display());
        }
    }

    for notice in view.notices.iter().filter(|n| n.is_error()) {
        warn!(message = %notice.message, "dashboard notice");
    }
    Ok(())
}

fn init_logging(args: &Args, config: &AppConfig, headless: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    // The terminal UI owns stdout and stderr, so log only to a file
    let Some(log_file) = args.log_file.clone().or_else(|| config.logging.file.clone()) else {
        return Ok(());
    };
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| eyre!("Could not open log file {}: {}", log_file.display(), e))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(salesdash::APP_NAME) {
            Ok(manager) => match manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Wrote default configuration to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn data_path(args: &Args, config: &AppConfig) -> PathBuf {
    args.path
        .clone()
        .or_else(|| config.data.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let mut config = match AppConfig::load(salesdash::APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    if args.debug {
        config.debug.enabled = true;
    }

    let headless = args.report || args.export_dir.is_some();
    init_logging(&args, &config, headless)?;

    let path = data_path(&args, &config);
    info!(path = %path.display(), headless, "starting");

    if headless {
        return run_headless(&args, &config, path);
    }

    let terminal = ratatui::init();
    let result = run(terminal, &args, config, path);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
