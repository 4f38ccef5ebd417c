/// Live change-notification test against the platform watcher.
///
/// Creates a file inside a watched temporary directory and waits (bounded)
/// for the matching `created` record to arrive on a subscription.
use std::fs;
use std::time::{Duration, Instant};

use spacelens_core::monitor::{ChangeKind, ChangeNotifier, NoiseFilter, NotifierSettings, StreamRecord};
use tempfile::TempDir;

fn notifier(root: &std::path::Path) -> ChangeNotifier {
    ChangeNotifier::new(NotifierSettings {
        watch_root: root.to_path_buf(),
        keepalive: Duration::from_secs(1),
        queue_capacity: 64,
        affected_root_depth: 2,
        filter: NoiseFilter::default(),
    })
}

#[test]
fn created_file_is_streamed() {
    let dir = TempDir::new().unwrap();
    let notifier = notifier(dir.path());
    notifier.start_default().unwrap();
    assert!(notifier.is_running());

    let mut stream = notifier.subscribe();
    assert!(matches!(stream.next(), Some(StreamRecord::Connected { .. })));

    // Give the backend a moment to register the watch.
    std::thread::sleep(Duration::from_millis(200));
    fs::write(dir.path().join("fresh.txt"), b"new").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = false;
    while Instant::now() < deadline {
        match stream.next() {
            Some(StreamRecord::Change(event))
                if event.kind == ChangeKind::Created && event.path.ends_with("fresh.txt") =>
            {
                let json = StreamRecord::Change(event).to_json().unwrap();
                assert!(json.contains(r#""type":"created""#));
                seen = true;
                break;
            }
            Some(_) => continue,
            None => break,
        }
    }
    notifier.stop();
    assert!(seen, "no created event for fresh.txt");
    assert!(!notifier.is_running());
}

#[test]
fn noisy_paths_are_not_streamed() {
    let dir = TempDir::new().unwrap();
    let notifier = notifier(dir.path());
    notifier.start_default().unwrap();
    let mut stream = notifier.subscribe();
    stream.next();

    std::thread::sleep(Duration::from_millis(200));
    fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
    fs::write(dir.path().join("node_modules/pkg/index.js"), b"x").unwrap();
    // A sentinel outside the noisy folder marks the end of the burst.
    fs::write(dir.path().join("done.txt"), b"x").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        match stream.next() {
            Some(StreamRecord::Change(event)) => {
                assert!(
                    !event.path.to_string_lossy().contains("/node_modules/"),
                    "noise leaked: {}",
                    event.path.display()
                );
                if event.path.ends_with("done.txt") {
                    break;
                }
            }
            Some(_) => continue,
            None => break,
        }
    }
    notifier.stop();
}
