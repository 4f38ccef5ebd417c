/// Change notifier — watches one directory tree and streams change events.
///
/// A single OS-level recursive watch (inotify, FSEvents, ...) via `notify`
/// feeds a bounded crossbeam channel. The watcher callback never blocks:
/// when the queue is full the newest event is dropped and counted.
///
/// # Usage
///
/// ```ignore
/// let notifier = ChangeNotifier::new(settings);
/// notifier.start(&home)?;
/// for record in notifier.subscribe() {
///     println!("{}", record.to_json()?);
/// }
/// ```
///
/// # Delivery
///
/// Every subscriber reads from the same queue, so with several subscribers
/// each event reaches exactly one of them. Delivery is best-effort.
pub mod event;
pub mod filter;

pub use event::{affected_root, ChangeEvent, ChangeKind, StreamRecord, CONNECTED_MESSAGE};
pub use filter::NoiseFilter;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::Result;

/// How often an idle subscriber re-checks the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub watch_root: PathBuf,
    pub keepalive: Duration,
    pub queue_capacity: usize,
    pub affected_root_depth: usize,
    pub filter: NoiseFilter,
}

impl NotifierSettings {
    /// Settings from the engine config; unset paths fall back to `home`
    /// and `recovery_dir`.
    pub fn from_config(config: &EngineConfig, home: &Path, recovery_dir: &Path) -> Self {
        Self {
            watch_root: config
                .watch_root
                .clone()
                .unwrap_or_else(|| home.to_path_buf()),
            keepalive: config.keepalive(),
            queue_capacity: config.event_queue_capacity,
            affected_root_depth: config.affected_root_depth,
            filter: NoiseFilter::new(Some(recovery_dir), &config.extra_noise_patterns),
        }
    }
}

/// State shared between the notifier, the watcher callback and emitters.
struct Shared {
    tx: Sender<ChangeEvent>,
    dropped: AtomicU64,
    watch_root: RwLock<PathBuf>,
    depth: usize,
    filter: NoiseFilter,
}

impl Shared {
    fn enqueue(&self, event: ChangeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    "Event queue full; dropped {:?} for {} ({dropped} dropped so far)",
                    event.kind,
                    event.path.display()
                );
            }
            // The notifier owns a receiver, so the channel outlives every sender.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn emit(&self, kind: ChangeKind, path: PathBuf) {
        let root = self.watch_root.read().clone();
        self.enqueue(ChangeEvent::new(kind, path, &root, self.depth));
    }

    fn handle_raw(&self, event: Event) {
        let Some((kind, path)) = map_event(event) else {
            return;
        };
        if self.filter.is_noise(&path) {
            return;
        }
        self.emit(kind, path);
    }
}

/// Map a raw watcher event to a change kind and the path it concerns.
///
/// Renames report the destination; the source half of a split rename and
/// the combined two-path form (which duplicates the destination event) are
/// ignored. Content modifications and accesses are not changes in layout.
fn map_event(mut event: Event) -> Option<(ChangeKind, PathBuf)> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
            ChangeKind::Moved
        }
        _ => return None,
    };
    event.paths.pop().map(|path| (kind, path))
}

/// Cloneable handle for publishing synthetic events (e.g. after a deletion).
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl EventEmitter {
    pub fn emit(&self, kind: ChangeKind, path: impl Into<PathBuf>) {
        self.shared.emit(kind, path.into());
    }
}

pub struct ChangeNotifier {
    shared: Arc<Shared>,
    rx: Receiver<ChangeEvent>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    stopped: Arc<AtomicBool>,
    keepalive: Duration,
    default_root: PathBuf,
}

impl ChangeNotifier {
    pub fn new(settings: NotifierSettings) -> Self {
        let (tx, rx) = bounded(settings.queue_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                tx,
                dropped: AtomicU64::new(0),
                watch_root: RwLock::new(settings.watch_root.clone()),
                depth: settings.affected_root_depth,
                filter: settings.filter,
            }),
            rx,
            watcher: Mutex::new(None),
            stopped: Arc::new(AtomicBool::new(false)),
            keepalive: settings.keepalive,
            default_root: settings.watch_root,
        }
    }

    /// Root watched by [`ChangeNotifier::start_default`].
    pub fn default_root(&self) -> &Path {
        &self.default_root
    }

    /// Start watching the configured root.
    pub fn start_default(&self) -> Result<()> {
        let root = self.default_root.clone();
        self.start(&root)
    }

    /// Start a recursive watch on `watch_root`. A no-op while already running.
    pub fn start(&self, watch_root: &Path) -> Result<()> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            debug!("Watcher already running");
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => shared.handle_raw(event),
            Err(err) => warn!("Watcher error: {err}"),
        })?;
        watcher.watch(watch_root, RecursiveMode::Recursive)?;

        *self.shared.watch_root.write() = watch_root.to_path_buf();
        self.stopped.store(false, Ordering::Relaxed);
        *slot = Some(watcher);
        info!("Watching {} for changes", watch_root.display());
        Ok(())
    }

    /// Stop watching. Subscribers drain what is queued and then end.
    pub fn stop(&self) {
        let previous = self.watcher.lock().take();
        self.stopped.store(true, Ordering::Relaxed);
        if previous.is_some() {
            info!("Watcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Publish a synthetic event through the same queue as watcher events.
    pub fn emit(&self, kind: ChangeKind, path: impl Into<PathBuf>) {
        self.shared.emit(kind, path.into());
    }

    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of events dropped because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// A new subscription: a `Connected` record, then changes, with a
    /// `Keepalive` after each idle keepalive period.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.rx.clone(),
            stopped: Arc::clone(&self.stopped),
            keepalive: self.keepalive,
            connected_sent: false,
            last_record: Instant::now(),
        }
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocking iterator over one subscription.
pub struct EventStream {
    rx: Receiver<ChangeEvent>,
    stopped: Arc<AtomicBool>,
    keepalive: Duration,
    connected_sent: bool,
    last_record: Instant,
}

impl Iterator for EventStream {
    type Item = StreamRecord;

    fn next(&mut self) -> Option<StreamRecord> {
        if !self.connected_sent {
            self.connected_sent = true;
            self.last_record = Instant::now();
            return Some(StreamRecord::connected());
        }

        loop {
            let until_keepalive = self.keepalive.saturating_sub(self.last_record.elapsed());
            match self.rx.recv_timeout(until_keepalive.min(STOP_POLL_INTERVAL)) {
                Ok(event) => {
                    self.last_record = Instant::now();
                    return Some(StreamRecord::Change(event));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stopped.load(Ordering::Relaxed) && self.rx.is_empty() {
                        return None;
                    }
                    if self.last_record.elapsed() >= self.keepalive {
                        self.last_record = Instant::now();
                        return Some(StreamRecord::Keepalive);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn settings(capacity: usize, keepalive: Duration) -> NotifierSettings {
        NotifierSettings {
            watch_root: PathBuf::from("/home/u"),
            keepalive,
            queue_capacity: capacity,
            affected_root_depth: 2,
            filter: NoiseFilter::default(),
        }
    }

    fn raw(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn raw_events_map_to_change_kinds() {
        let created = map_event(raw(EventKind::Create(CreateKind::File), &["/a"]));
        assert_eq!(created, Some((ChangeKind::Created, PathBuf::from("/a"))));

        let removed = map_event(raw(EventKind::Remove(RemoveKind::Any), &["/b"]));
        assert_eq!(removed, Some((ChangeKind::Deleted, PathBuf::from("/b"))));

        let renamed = map_event(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/c"],
        ));
        assert_eq!(renamed, Some((ChangeKind::Moved, PathBuf::from("/c"))));

        assert!(map_event(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/old"]
        ))
        .is_none());
        assert!(map_event(raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d"]
        ))
        .is_none());
    }

    #[test]
    fn subscription_starts_with_connected_then_changes() {
        let notifier = ChangeNotifier::new(settings(8, Duration::from_secs(20)));
        notifier.emit(ChangeKind::Deleted, "/home/u/Downloads/big.iso");

        let mut stream = notifier.subscribe();
        assert_eq!(stream.next(), Some(StreamRecord::connected()));
        match stream.next() {
            Some(StreamRecord::Change(event)) => {
                assert_eq!(event.kind, ChangeKind::Deleted);
                assert_eq!(event.affected_root, PathBuf::from("/home/u/Downloads"));
            }
            other => panic!("expected a change, got {other:?}"),
        }
    }

    #[test]
    fn idle_subscription_gets_keepalive() {
        let notifier = ChangeNotifier::new(settings(8, Duration::from_millis(50)));
        let mut stream = notifier.subscribe();
        assert_eq!(stream.next(), Some(StreamRecord::connected()));
        let started = Instant::now();
        assert_eq!(stream.next(), Some(StreamRecord::Keepalive));
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let notifier = ChangeNotifier::new(settings(2, Duration::from_secs(20)));
        for i in 0..5 {
            notifier.emit(ChangeKind::Created, format!("/home/u/f{i}"));
        }
        assert_eq!(notifier.dropped_events(), 3);

        let mut stream = notifier.subscribe();
        stream.next();
        let first = stream.next();
        assert!(matches!(
            first,
            Some(StreamRecord::Change(ref e)) if e.path == Path::new("/home/u/f0")
        ));
    }

    #[test]
    fn noisy_raw_events_are_filtered() {
        let notifier = ChangeNotifier::new(settings(8, Duration::from_secs(20)));
        notifier.shared.handle_raw(raw(
            EventKind::Create(CreateKind::File),
            &["/home/u/Library/Caches/x"],
        ));
        notifier
            .shared
            .handle_raw(raw(EventKind::Create(CreateKind::File), &["/home/u/keep.txt"]));
        assert_eq!(notifier.rx.len(), 1);
    }

    #[test]
    fn stopped_stream_drains_then_ends() {
        let notifier = ChangeNotifier::new(settings(8, Duration::from_secs(20)));
        notifier.emit(ChangeKind::Created, "/home/u/a");
        notifier.stop();

        let records: Vec<StreamRecord> = notifier.subscribe().collect();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1], StreamRecord::Change(_)));
    }
}
