mod config;
mod event;
mod foreground;
mod gameinfo;
mod handler;
mod icon;
mod ignore_list;
mod paths;
mod replay_monitor;
mod status;

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::replay_monitor::ReplayMonitor;

const USAGE: &str = "usage: replay-gameinfo-daemon [--once <recording> | --version]";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── Command line ──────────────────────────────────────────────────────────
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {}
        Some("--version") => {
            println!("replay-gameinfo-daemon v{}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Some("--once") => match args.get(1) {
            Some(recording) => {
                run_once(PathBuf::from(recording)).await;
                return;
            }
            None => {
                eprintln!("{USAGE}");
                std::process::exit(2);
            }
        },
        Some(other) => {
            eprintln!("Unknown argument: {other}\n{USAGE}");
            std::process::exit(2);
        }
    }

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        log::error!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let mut config = load_config(&config_path);

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = status::DaemonStatus::new();
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::DaemonEvent::Shutdown).await;
            }
        });
    }

    log::info!("replay-gameinfo-daemon v{} started", env!("CARGO_PKG_VERSION"));

    let mut monitor = register(&config.watch, &event_tx, &mut current_status);
    status::write_status(&status_path, &current_status);

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::DaemonEvent::ReplaySaved(recording, window) => {
                log::debug!(
                    "Foreground at save: {:?} ({:?})",
                    window.title,
                    window.exe_path
                );

                current_status.record_replay(&recording);
                status::write_status(&status_path, &current_status);

                // Fire-and-forget: the handler logs its own failures.
                drop(handler::spawn(recording, window, config.output.clone()));
            }

            event::DaemonEvent::ConfigReloaded(new_config) => {
                log::info!("Config reloaded");
                let watch_changed = new_config.watch != config.watch;
                monitor = apply_reload(monitor, &config, &new_config, &event_tx, &mut current_status).await;
                if watch_changed {
                    status::write_status(&status_path, &current_status);
                }
                config = new_config;
            }

            event::DaemonEvent::Shutdown => {
                log::info!("Shutting down");
                if let Some(m) = monitor.take() {
                    m.stop().await;
                }
                current_status.state = status::DaemonState::Idle;
                current_status.watch_dir = None;
                status::write_status(&status_path, &current_status);
                break;
            }
        }
    }
}

/// Loads the config, falling back to defaults (and logging why) on error.
fn load_config(path: &std::path::Path) -> config::Config {
    config::load_or_default(path).unwrap_or_else(|e| {
        log::error!("Config error (using defaults): {e:#}");
        config::Config::default()
    })
}

/// Starts a replay monitor for `watch` and reflects the result in `current_status`.
/// Returns `None` (leaving the daemon idle) if the directory cannot be watched.
fn register(
    watch: &config::WatchConfig,
    tx: &mpsc::Sender<event::DaemonEvent>,
    current_status: &mut status::DaemonStatus,
) -> Option<ReplayMonitor> {
    match ReplayMonitor::start(watch, tx.clone()) {
        Ok(m) => {
            current_status.state = status::DaemonState::Watching;
            current_status.watch_dir = Some(m.dir().to_string_lossy().into_owned());
            Some(m)
        }
        Err(e) => {
            log::error!("Not watching for replays: {e:#}");
            current_status.state = status::DaemonState::Idle;
            current_status.watch_dir = None;
            None
        }
    }
}

/// Applies a reloaded config to the replay monitor. The monitor is kept when
/// `[watch]` is unchanged; otherwise the old one is stopped before a new one
/// is registered.
async fn apply_reload(
    monitor: Option<ReplayMonitor>,
    old: &config::Config,
    new: &config::Config,
    tx: &mpsc::Sender<event::DaemonEvent>,
    current_status: &mut status::DaemonStatus,
) -> Option<ReplayMonitor> {
    if new.watch == old.watch {
        return monitor;
    }
    if let Some(m) = monitor {
        m.stop().await;
    }
    register(&new.watch, tx, current_status)
}

/// Handles a single recording as if its save had just been signalled.
async fn run_once(recording: PathBuf) {
    let config = load_config(&paths::config_file_path());
    let window = foreground::capture();
    if let Err(e) = handler::spawn(recording, window, config.output).await {
        log::error!("Replay handler task failed: {e}");
    }
}
