//! winsync - headless window group member
//!
//! CLI entry point: run an instance, inspect the shared list, or reset it.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, trace, warn};

use sharedstore::{DirStore, MemoryHub};
use winsync::cli::{Cli, Command, OutputFormat, parse_meta};
use winsync::{
    Clock, Config, FileShapeSource, InstanceId, SharedStateStore, Shape, ShapeSource, SystemClock, WindowManager,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("winsync")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Several instances usually run at once; one file each
    let log_path = log_dir.join(format!("winsync-{}.log", std::process::id()));
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?}, file: {})", level, log_path.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(path) = cli.store {
        config.store.path = path;
    }
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            x,
            y,
            w,
            h,
            id,
            meta,
            shape_file,
            clear,
            ticks,
        } => {
            let opts = RunOptions {
                shape: Shape::new(x, y, w, h),
                id: id.map(InstanceId::new),
                meta,
                shape_file,
                clear,
                ticks,
            };
            cmd_run(&config, opts).await
        }
        Command::List { format } => cmd_list(&config, format),
        Command::Clear => cmd_clear(&config),
    }
}

struct RunOptions {
    shape: Shape,
    id: Option<InstanceId>,
    meta: Vec<String>,
    shape_file: Option<PathBuf>,
    clear: bool,
    ticks: Option<u64>,
}

fn open_store(config: &Config) -> Result<SharedStateStore> {
    let kv = DirStore::open(&config.store.path)
        .context(format!("Failed to open shared store at {}", config.store.path.display()))?;
    Ok(SharedStateStore::new(kv, config.store.key.as_str())?)
}

async fn cmd_run(config: &Config, opts: RunOptions) -> Result<()> {
    let meta = parse_meta(&opts.meta)?;

    let store = match open_store(config) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Shared store unavailable, running single-instance");
            eprintln!("{} {:#}; running single-instance", "!".yellow(), e);
            SharedStateStore::new(MemoryHub::new().handle(), config.store.key.as_str())?
        }
    };

    let initial = opts.shape;
    let mut file_source = opts.shape_file.map(|path| FileShapeSource::new(path, initial));
    let source = move || match file_source.as_mut() {
        Some(source) => source.current_shape(),
        None => initial,
    };

    let mut wm = WindowManager::new(store, config.heartbeat.policy(), source);
    if let Some(id) = opts.id {
        wm = wm.with_id(id);
    }

    if opts.clear {
        wm.clear_shared_state().context("Failed to clear shared state")?;
        println!("{} Cleared shared state", "✓".green());
    }

    // Installed before joining so a stop request never skips the departure
    let terminate = terminate_signal()?;
    tokio::pin!(terminate);

    let windows_changed = Rc::new(Cell::new(false));
    let flag = Rc::clone(&windows_changed);
    wm.set_win_change_callback(move || flag.set(true));
    wm.set_win_shape_change_callback(|easing| debug!(easing, "Own window moved"));
    wm.on_external_change(|| trace!("Peer wrote the shared list"));

    let id = wm.init(meta);
    println!(
        "{} Joined as {} ({} ms heartbeat, {} ms ttl)",
        "✓".green(),
        id.to_string().cyan(),
        config.heartbeat.interval_ms,
        wm.policy().ttl_millis()
    );
    print_windows(&wm);
    windows_changed.set(false);

    let mut interval = tokio::time::interval(config.heartbeat.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut count = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = wm.update();

                if let Some((old_id, new_id)) = report.rotated {
                    println!("{} Pruned as {}, rejoined as {}", "!".yellow(), old_id, new_id.to_string().cyan());
                }
                if let Some(change) = &report.topology {
                    println!("{} {}", "~".blue(), change);
                }
                if windows_changed.replace(false) {
                    print_windows(&wm);
                }

                count += 1;
                if let Some(limit) = opts.ticks
                    && count >= limit
                {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = &mut terminate => {
                info!("SIGTERM received");
                break;
            }
        }
    }

    match wm.depart() {
        Ok(()) => println!("{} Left the group", "✓".green()),
        Err(e) => warn!(error = %e, "Departure write failed, peers will prune us"),
    }
    Ok(())
}

#[cfg(unix)]
fn terminate_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    Ok(async move {
        sigterm.recv().await;
    })
}

#[cfg(not(unix))]
fn terminate_signal() -> Result<impl Future<Output = ()>> {
    Ok(std::future::pending())
}

fn print_windows(wm: &WindowManager) {
    let own = wm.id();
    for (i, win) in wm.get_windows().iter().enumerate() {
        let (cx, cy) = win.shape.center();
        let marker = if Some(win.id) == own { "*" } else { " " };
        println!(
            "  {}[{}] {} {} center=({:.0},{:.0}) {}",
            marker,
            i,
            win.id.to_string().cyan(),
            win.shape,
            cx,
            cy,
            serde_json::Value::Object(win.meta_data.clone()).to_string().dimmed()
        );
    }
}

fn cmd_list(config: &Config, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let snapshot = store.try_read().context("Failed to read shared state")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        OutputFormat::Text => {
            if snapshot.is_empty() {
                println!("No windows found");
                return Ok(());
            }
            let now = SystemClock.now_millis();
            let ttl = config.heartbeat.policy().ttl_millis();
            for win in &snapshot {
                let age = format!("{}ms", win.age(now));
                let age = if win.is_stale(now, ttl) {
                    format!("{} (stale)", age).red()
                } else {
                    age.green()
                };
                println!("{} {} {}", win.id.to_string().cyan(), win.shape, age);
            }
        }
    }
    Ok(())
}

fn cmd_clear(config: &Config) -> Result<()> {
    let mut store = open_store(config)?;
    store.clear().context("Failed to clear shared state")?;
    println!("{} Cleared shared state at {}", "✓".green(), config.store.path.display());
    Ok(())
}
