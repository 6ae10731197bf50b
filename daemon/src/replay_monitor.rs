/// Replay monitor: turns filesystem activity in the replay directory into
/// [`DaemonEvent::ReplaySaved`] notifications.
///
/// The recording application writes a replay over a short burst of create /
/// modify events. The foreground window is captured on the first event for a
/// new replay file, which is as close to the save trigger as the filesystem
/// lets us get. The file counts as saved once it has then gone
/// [`WatchConfig::effective_settle_ms`] without further events, and the
/// snapshot from the first event travels with the notification. Each path is
/// announced at most once while it exists; deleting or renaming it away
/// resets that.
///
/// Starting a monitor registers the handler with the host; [`ReplayMonitor::stop`]
/// unregisters it.
use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant};

use crate::config::{WatchConfig, MIN_SETTLE_MS};
use crate::event::DaemonEvent;
use crate::foreground::{self, ForegroundWindow};

/// Upper bound on remembered announced paths; the oldest are dropped first.
pub const MAX_ANNOUNCED: usize = 256;

/// Returns `true` if `path` looks like a replay written by the recording application.
pub fn is_replay_file(path: &Path, watch: &WatchConfig) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if !name.starts_with(watch.file_prefix.as_str()) {
        return false;
    }
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            watch.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        }
        None => false,
    }
}

/// A replay file that is still being written.
#[derive(Debug)]
struct Pending {
    last_event: Instant,
    /// Foreground window at the file's first event.
    window: ForegroundWindow,
}

/// Tracks candidate replay files until they stop changing.
#[derive(Debug)]
pub struct SaveDetector {
    settle: Duration,
    pending: HashMap<PathBuf, Pending>,
    /// Paths already announced, with the time of announcement. Further events
    /// on them are ignored. Bounded by [`MAX_ANNOUNCED`].
    announced: HashMap<PathBuf, Instant>,
}

impl SaveDetector {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: HashMap::new(),
            announced: HashMap::new(),
        }
    }

    /// Records activity on `path` at `now`. `capture` runs only on the first
    /// event for a path; later events just postpone the announcement.
    pub fn observe<F>(&mut self, path: PathBuf, now: Instant, capture: F)
    where
        F: FnOnce() -> ForegroundWindow,
    {
        if self.announced.contains_key(&path) {
            return;
        }
        match self.pending.get_mut(&path) {
            Some(p) => p.last_event = now,
            None => {
                let window = capture();
                self.pending.insert(path, Pending { last_event: now, window });
            }
        }
    }

    /// Drops all state for `path` (it was deleted or renamed away).
    pub fn forget(&mut self, path: &Path) {
        self.pending.remove(path);
        self.announced.remove(path);
    }

    /// Returns every candidate that has been quiet for the settle interval,
    /// sorted by path, together with its first-event snapshot, and marks them
    /// announced.
    pub fn take_settled(&mut self, now: Instant) -> Vec<(PathBuf, ForegroundWindow)> {
        let mut paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_event) >= self.settle)
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();

        let mut settled = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(p) = self.pending.remove(&path) {
                self.announced.insert(path.clone(), now);
                settled.push((path, p.window));
            }
        }
        self.prune_announced();
        settled
    }

    /// Drops the oldest announced entries beyond [`MAX_ANNOUNCED`].
    fn prune_announced(&mut self) {
        if self.announced.len() <= MAX_ANNOUNCED {
            return;
        }
        let mut by_age: Vec<(Instant, PathBuf)> = self
            .announced
            .iter()
            .map(|(path, at)| (*at, path.clone()))
            .collect();
        by_age.sort();
        let excess = self.announced.len() - MAX_ANNOUNCED;
        for (_, path) in by_age.into_iter().take(excess) {
            self.announced.remove(&path);
        }
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn announced_len(&self) -> usize {
        self.announced.len()
    }
}

/// A registered replay monitor.
pub struct ReplayMonitor {
    /// Setting this to `true` signals the watch task to stop.
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    dir: PathBuf,
}

impl ReplayMonitor {
    /// Starts watching `config`'s replay directory, sending `ReplaySaved` events to `tx`.
    ///
    /// Fails if the directory does not exist or cannot be watched.
    pub fn start(config: &WatchConfig, tx: mpsc::Sender<DaemonEvent>) -> Result<Self> {
        let dir = config.resolved_replay_dir();
        if !dir.is_dir() {
            anyhow::bail!("Replay directory does not exist: {}", dir.display());
        }

        let (watch_tx, watch_rx) = mpsc::channel::<notify::Event>(64);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = watch_tx.blocking_send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create replay directory watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let filter = config.clone();
        let settle = Duration::from_millis(config.effective_settle_ms());
        let handle = tokio::spawn(run(watcher, watch_rx, stop_rx, filter, settle, tx));

        log::info!("Watching {} for saved replays", dir.display());
        Ok(Self { stop_tx, handle, dir })
    }

    /// The directory being watched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Signals the watch task to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
        log::info!("Stopped watching {}", self.dir.display());
    }
}

/// Watch loop. Owns `watcher` so the OS watch lives exactly as long as the task.
async fn run(
    _watcher: RecommendedWatcher,
    mut watch_rx: mpsc::Receiver<notify::Event>,
    mut stop_rx: watch::Receiver<bool>,
    filter: WatchConfig,
    settle: Duration,
    tx: mpsc::Sender<DaemonEvent>,
) {
    let mut detector = SaveDetector::new(settle);
    let mut ticker = interval(Duration::from_millis(MIN_SETTLE_MS));

    loop {
        tokio::select! {
            event = watch_rx.recv() => {
                let Some(event) = event else { break };
                apply_event(&mut detector, &event, &filter, Instant::now(), foreground::capture);
            }
            _ = ticker.tick() => {
                for (path, window) in detector.take_settled(Instant::now()) {
                    if !path.is_file() {
                        continue;
                    }
                    log::info!("Replay buffer saved: {}", path.display());
                    if tx.send(DaemonEvent::ReplaySaved(path, window)).await.is_err() {
                        return;
                    }
                }
            }
            _ = stop_rx.changed() => break,
        }
    }
}

/// Feeds one filesystem event into the detector. `capture` snapshots the
/// foreground window for replay files seen for the first time.
fn apply_event<F>(
    detector: &mut SaveDetector,
    event: &notify::Event,
    filter: &WatchConfig,
    now: Instant,
    capture: F,
) where
    F: Fn() -> ForegroundWindow,
{
    use notify::EventKind;

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            for path in event.paths.iter().filter(|p| is_replay_file(p, filter)) {
                // Renames report both ends; the old name no longer exists.
                if path.exists() {
                    detector.observe(path.clone(), now, &capture);
                } else {
                    detector.forget(path);
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                detector.forget(path);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> WatchConfig {
        WatchConfig::default()
    }

    fn no_window() -> ForegroundWindow {
        ForegroundWindow::default()
    }

    fn window(title: &str, exe: &str) -> ForegroundWindow {
        ForegroundWindow {
            title: title.to_string(),
            exe_path: Some(PathBuf::from(exe)),
        }
    }

    // ── is_replay_file ────────────────────────────────────────────────────────

    #[test]
    fn replay_file_matches_prefix_and_extension() {
        assert!(is_replay_file(Path::new("D:/v/Replay 2024-05-01 20-11-04.mkv"), &filter()));
        assert!(is_replay_file(Path::new("D:/v/Replay 2024-05-01 20-11-04.MP4"), &filter()));
    }

    #[test]
    fn replay_file_rejects_other_prefixes() {
        assert!(!is_replay_file(Path::new("D:/v/2024-05-01 20-11-04.mkv"), &filter()));
    }

    #[test]
    fn replay_file_rejects_unknown_extensions() {
        assert!(!is_replay_file(Path::new("D:/v/Replay 1.txt"), &filter()));
        assert!(!is_replay_file(Path::new("D:/v/Replay 1.mkv.gameinfo"), &filter()));
        assert!(!is_replay_file(Path::new("D:/v/Replay"), &filter()));
    }

    #[test]
    fn empty_prefix_matches_any_name() {
        let f = WatchConfig {
            file_prefix: String::new(),
            ..WatchConfig::default()
        };
        assert!(is_replay_file(Path::new("D:/v/anything.mkv"), &f));
    }

    // ── SaveDetector ──────────────────────────────────────────────────────────

    #[test]
    fn detector_waits_for_settle_interval() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(1000));
        d.observe(PathBuf::from("a.mkv"), start, no_window);

        assert!(d.take_settled(start + Duration::from_millis(999)).is_empty());
        assert_eq!(
            d.take_settled(start + Duration::from_millis(1000)),
            vec![(PathBuf::from("a.mkv"), ForegroundWindow::default())]
        );
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn further_activity_postpones_announcement() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(1000));
        d.observe(PathBuf::from("a.mkv"), start, no_window);
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(800), no_window);

        assert!(d.take_settled(start + Duration::from_millis(1500)).is_empty());
        assert_eq!(d.take_settled(start + Duration::from_millis(1800)).len(), 1);
    }

    #[test]
    fn path_is_announced_only_once() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(100));
        d.observe(PathBuf::from("a.mkv"), start, no_window);
        assert_eq!(d.take_settled(start + Duration::from_millis(100)).len(), 1);

        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(200), no_window);
        assert!(d.take_settled(start + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn forget_allows_reannouncement() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(100));
        d.observe(PathBuf::from("a.mkv"), start, no_window);
        d.take_settled(start + Duration::from_millis(100));

        d.forget(Path::new("a.mkv"));
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(200), no_window);
        assert_eq!(d.take_settled(start + Duration::from_millis(300)).len(), 1);
    }

    #[test]
    fn settled_paths_are_sorted() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(10));
        d.observe(PathBuf::from("c.mkv"), start, no_window);
        d.observe(PathBuf::from("a.mkv"), start, no_window);
        d.observe(PathBuf::from("b.mkv"), start, no_window);

        let settled: Vec<PathBuf> = d
            .take_settled(start + Duration::from_millis(10))
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(
            settled,
            vec![PathBuf::from("a.mkv"), PathBuf::from("b.mkv"), PathBuf::from("c.mkv")]
        );
    }

    #[test]
    fn first_event_snapshot_is_delivered() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(1000));
        let game = window("Rocket League", "C:/Games/RocketLeague.exe");
        let desktop = window("Untitled - Notepad", "C:/Windows/notepad.exe");

        d.observe(PathBuf::from("a.mkv"), start, || game.clone());
        // User alt-tabs while the replay is still being written.
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(500), || desktop.clone());
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(900), || desktop.clone());

        let settled = d.take_settled(start + Duration::from_millis(1900));
        assert_eq!(settled, vec![(PathBuf::from("a.mkv"), game)]);
    }

    #[test]
    fn capture_runs_once_per_replay() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(100));
        let calls = std::cell::Cell::new(0);
        let capture = || {
            calls.set(calls.get() + 1);
            ForegroundWindow::default()
        };

        d.observe(PathBuf::from("a.mkv"), start, capture);
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(50), capture);
        d.take_settled(start + Duration::from_millis(150));
        d.observe(PathBuf::from("a.mkv"), start + Duration::from_millis(200), capture);

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn announced_paths_are_bounded() {
        let start = Instant::now();
        let mut d = SaveDetector::new(Duration::from_millis(10));
        for i in 0..MAX_ANNOUNCED + 20 {
            let at = start + Duration::from_millis(i as u64 * 20);
            d.observe(PathBuf::from(format!("Replay {i:04}.mkv")), at, no_window);
            assert_eq!(d.take_settled(at + Duration::from_millis(10)).len(), 1);
        }
        assert_eq!(d.announced_len(), MAX_ANNOUNCED);

        // The oldest entries were dropped; the newest is still remembered.
        let newest = PathBuf::from(format!("Replay {:04}.mkv", MAX_ANNOUNCED + 19));
        let later = start + Duration::from_secs(60);
        d.observe(newest, later, no_window);
        assert_eq!(d.pending_len(), 0);
        d.observe(PathBuf::from("Replay 0000.mkv"), later, no_window);
        assert_eq!(d.pending_len(), 1);
    }

    #[test]
    fn apply_event_captures_window_for_new_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Replay 1.mkv");
        std::fs::write(&path, b"x").unwrap();

        let mut d = SaveDetector::new(Duration::from_millis(10));
        let start = Instant::now();
        let create = notify::Event::new(notify::EventKind::Create(notify::event::CreateKind::File))
            .add_path(path.clone());
        apply_event(&mut d, &create, &filter(), start, || window("Game", "C:/Games/Game.exe"));

        let settled = d.take_settled(start + Duration::from_millis(10));
        assert_eq!(settled, vec![(path, window("Game", "C:/Games/Game.exe"))]);
    }

    // ── apply_event ───────────────────────────────────────────────────────────

    #[test]
    fn apply_event_ignores_non_replay_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"x").unwrap();

        let mut d = SaveDetector::new(Duration::from_millis(10));
        let event = notify::Event::new(notify::EventKind::Create(notify::event::CreateKind::File))
            .add_path(path);
        apply_event(&mut d, &event, &filter(), Instant::now(), no_window);
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn apply_event_remove_forgets_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Replay 1.mkv");
        std::fs::write(&path, b"x").unwrap();

        let mut d = SaveDetector::new(Duration::from_millis(10));
        let create = notify::Event::new(notify::EventKind::Create(notify::event::CreateKind::File))
            .add_path(path.clone());
        apply_event(&mut d, &create, &filter(), Instant::now(), no_window);
        assert_eq!(d.pending_len(), 1);

        let remove = notify::Event::new(notify::EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(path);
        apply_event(&mut d, &remove, &filter(), Instant::now(), no_window);
        assert_eq!(d.pending_len(), 0);
    }

    // ── ReplayMonitor ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig {
            replay_dir: dir.path().join("missing").to_string_lossy().into_owned(),
            ..WatchConfig::default()
        };
        let (tx, _rx) = mpsc::channel(8);
        assert!(ReplayMonitor::start(&config, tx).is_err());
    }

    #[tokio::test]
    async fn monitor_reports_new_replay_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = WatchConfig {
            replay_dir: dir.path().to_string_lossy().into_owned(),
            settle_ms: MIN_SETTLE_MS,
            ..WatchConfig::default()
        };
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = ReplayMonitor::start(&config, tx).unwrap();

        let replay = dir.path().join("Replay 2024-05-01 20-11-04.mkv");
        std::fs::write(&replay, b"not really a video").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"x").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for ReplaySaved")
            .expect("channel closed");
        match event {
            DaemonEvent::ReplaySaved(path, _) => {
                assert_eq!(path.file_name(), replay.file_name());
            }
            _ => panic!("expected ReplaySaved"),
        }

        // No second announcement for the same file.
        let again = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
        assert!(again.is_err());

        monitor.stop().await;
    }
}
