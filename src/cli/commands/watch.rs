//! Watch command: console mode.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;

use crate::config::Settings;
use crate::monitor::Monitor;
use crate::persistence::default_export_filename;
use crate::utils::validate_directory;
use crate::watcher::{NotifyFactory, RecursiveWatchManager, WatchControl};

/// How long to wait for the worker to drain after the watcher is closed.
///
/// Advisory only: the runtime still joins a stuck blocking worker on exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct WatchOptions {
    pub paths: Vec<PathBuf>,
    pub no_aggregate: bool,
    pub max_events: Option<u64>,
    pub duration: Option<u64>,
    pub export: Option<PathBuf>,
    pub rebuild_on_remove: bool,
}

/// Roots from the command line, then from config, then the current directory.
fn resolve_roots(settings: &Settings, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if !paths.is_empty() {
        paths
    } else if !settings.watch.roots.is_empty() {
        settings.watch.roots.clone()
    } else {
        vec![PathBuf::from(".")]
    }
}

/// Export target: a directory gets a timestamped file inside it.
fn export_path(target: PathBuf) -> PathBuf {
    if target.is_dir() {
        target.join(default_export_filename(Local::now()))
    } else {
        target
    }
}

/// Run watch command - print every change until Ctrl-C or the duration ends.
pub async fn run_watch(settings: &Settings, options: WatchOptions) -> anyhow::Result<()> {
    let roots = resolve_roots(settings, options.paths);
    for root in &roots {
        validate_directory(root)
            .with_context(|| format!("Invalid directory: {}", root.display()))?;
    }

    let mut events_config = settings.events.clone();
    if options.no_aggregate {
        events_config.aggregate = false;
    }
    if let Some(max_events) = options.max_events {
        events_config.max_events = usize::try_from(max_events).unwrap_or(usize::MAX);
    }
    let rebuild = options.rebuild_on_remove || settings.watch.rebuild_on_remove;

    let (factory, notifications) = NotifyFactory::channel();
    let manager = RecursiveWatchManager::with_roots(factory, &roots)
        .context("Failed to start watching")?
        .with_rebuild_on_remove(rebuild);
    let watcher: Arc<dyn WatchControl> = Arc::new(manager);
    let monitor = Arc::new(Monitor::new(watcher, &events_config));

    eprintln!("{}", monitor.status_line());
    eprintln!("Press Ctrl+C to stop");

    let color = is_terminal::is_terminal(std::io::stdout());
    let worker = {
        let monitor = monitor.clone();
        tokio::task::spawn_blocking(move || {
            monitor.run(notifications, |entry| println!("{}", entry.render(color)));
        })
    };

    match options.duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl+C")?;
                }
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?,
    }

    // Closing forgets the roots, so capture the summary first.
    let summary = monitor.status_line();
    monitor.close().context("Failed to close watcher")?;
    match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
        Ok(joined) => joined.context("Event worker failed")?,
        Err(_) => tracing::warn!("[watch] event worker did not stop in time"),
    }
    eprintln!("{summary}");

    if let Some(target) = options.export {
        let path = export_path(target);
        let count = monitor
            .export_json(&path)
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        eprintln!("Exported {count} events to {}", path.display());
    }

    Ok(())
}
