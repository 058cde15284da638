//! End-to-end watching through the real notify backend.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use treewatch::config::EventsConfig;
use treewatch::{Monitor, NotifyFactory, Operation, RecursiveWatchManager, WatchControl};

const TIMEOUT: Duration = Duration::from_secs(10);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    condition()
}

fn saw(monitor: &Monitor, name: &str) -> bool {
    monitor
        .events()
        .iter()
        .any(|e| e.path.file_name() == Some(name.as_ref()))
}

#[test]
fn test_new_subdirectory_is_followed() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    std::fs::create_dir(root.join("existing")).unwrap();

    let (factory, notifications) = NotifyFactory::channel();
    let manager = RecursiveWatchManager::with_roots(factory, [&root]).unwrap();
    assert_eq!(manager.watched_count(), 2);

    let watcher: Arc<dyn WatchControl> = Arc::new(manager);
    let monitor = Arc::new(Monitor::new(watcher, &EventsConfig::default()));
    let worker = {
        let monitor = monitor.clone();
        thread::spawn(move || monitor.run(notifications, |_| {}))
    };

    let sub = root.join("fresh");
    std::fs::create_dir(&sub).unwrap();
    assert!(wait_until(|| monitor.is_watching(&sub)));

    std::fs::write(sub.join("inner.txt"), "hello").unwrap();
    assert!(wait_until(|| saw(&monitor, "inner.txt")));

    std::fs::write(root.join("existing").join("old.txt"), "x").unwrap();
    assert!(wait_until(|| saw(&monitor, "old.txt")));

    let created_dir = monitor
        .events()
        .into_iter()
        .find(|e| e.path == sub && e.operation == Operation::CREATE)
        .expect("directory creation recorded");
    assert!(created_dir.is_dir);

    monitor.close().unwrap();
    worker.join().unwrap();
    assert_eq!(monitor.watched_count(), 0);
}

#[test]
fn test_removed_root_stops_reporting() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let kept = base.join("kept");
    let dropped = base.join("dropped");
    std::fs::create_dir(&kept).unwrap();
    std::fs::create_dir(&dropped).unwrap();

    let (factory, notifications) = NotifyFactory::channel();
    let manager = RecursiveWatchManager::with_roots(factory, [&kept, &dropped]).unwrap();
    let watcher: Arc<dyn WatchControl> = Arc::new(manager);
    let monitor = Arc::new(Monitor::new(watcher, &EventsConfig::default()));
    let worker = {
        let monitor = monitor.clone();
        thread::spawn(move || monitor.run(notifications, |_| {}))
    };

    monitor.remove_root(&dropped).unwrap();
    assert!(!monitor.is_watching(&dropped));
    assert_eq!(monitor.roots(), vec![kept.clone()]);

    std::fs::write(dropped.join("ignored.txt"), "x").unwrap();
    std::fs::write(kept.join("seen.txt"), "x").unwrap();
    assert!(wait_until(|| saw(&monitor, "seen.txt")));
    // Give a stray notification for the dropped root time to arrive.
    thread::sleep(Duration::from_millis(200));
    assert!(!saw(&monitor, "ignored.txt"));

    monitor.close().unwrap();
    worker.join().unwrap();
}

#[test]
fn test_close_releases_worker_without_events() {
    let temp = TempDir::new().unwrap();
    let (factory, notifications) = NotifyFactory::channel();
    let manager = RecursiveWatchManager::with_roots(factory, [temp.path()]).unwrap();
    let watcher: Arc<dyn WatchControl> = Arc::new(manager);
    let monitor = Arc::new(Monitor::new(watcher, &EventsConfig::default()));
    let worker = {
        let monitor = monitor.clone();
        thread::spawn(move || monitor.run(notifications, |_| {}))
    };

    monitor.close().unwrap();
    worker.join().unwrap();
    assert_eq!(monitor.event_count(), 0);
    assert!(monitor.add_root(Path::new("/")).is_err());
}
