/// Change events and the records a subscriber stream carries.
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

/// Message carried by the first record of every subscription.
pub const CONNECTED_MESSAGE: &str = "Live updates active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Deleted,
    Moved,
}

/// One filesystem change, already mapped and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub path: PathBuf,
    /// Shallow ancestor a consumer should refresh.
    #[serde(rename = "root")]
    pub affected_root: PathBuf,
    pub observed_at: DateTime<Local>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: PathBuf, watch_root: &Path, depth: usize) -> Self {
        let affected_root = affected_root(watch_root, &path, depth);
        Self {
            kind,
            path,
            affected_root,
            observed_at: Local::now(),
        }
    }
}

/// Ancestor of `path` at `depth` levels below and including `watch_root`
/// (the watch root itself is depth 1).
///
/// Paths too shallow to have such a proper ancestor map to the watch root.
/// Paths outside the watch root map to their parent directory.
pub fn affected_root(watch_root: &Path, path: &Path, depth: usize) -> PathBuf {
    let Ok(relative) = path.strip_prefix(watch_root) else {
        return path.parent().unwrap_or(path).to_path_buf();
    };
    let keep = depth.saturating_sub(1);
    let components: Vec<Component<'_>> = relative.components().collect();
    if keep == 0 || components.len() <= keep {
        return watch_root.to_path_buf();
    }
    components[..keep]
        .iter()
        .fold(watch_root.to_path_buf(), |acc, c| acc.join(c))
}

/// One item of a subscription stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    /// Always the first record.
    Connected { message: String },
    Change(ChangeEvent),
    /// Sent after an idle period so transports keep the connection open.
    Keepalive,
}

impl StreamRecord {
    pub fn connected() -> Self {
        Self::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    /// Serialize to a single-line JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StatusRecord<'a> {
    Connected { message: &'a str },
    Keepalive,
}

// Changes serialize with their kind as `type`, so all records share one
// flat `{"type": ...}` layout.
impl Serialize for StreamRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Connected { message } => StatusRecord::Connected { message }.serialize(serializer),
            Self::Change(event) => event.serialize(serializer),
            Self::Keepalive => StatusRecord::Keepalive.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affected_root_uses_first_component_under_root() {
        let home = Path::new("/home/u");
        assert_eq!(
            affected_root(home, Path::new("/home/u/Documents/report.pdf"), 2),
            PathBuf::from("/home/u/Documents")
        );
        assert_eq!(
            affected_root(home, Path::new("/home/u/Documents/a/b/c.txt"), 2),
            PathBuf::from("/home/u/Documents")
        );
    }

    #[test]
    fn shallow_paths_map_to_watch_root() {
        let home = Path::new("/home/u");
        assert_eq!(affected_root(home, Path::new("/home/u/notes.txt"), 2), home);
        assert_eq!(affected_root(home, home, 2), home);
        assert_eq!(affected_root(home, Path::new("/home/u/a/b"), 1), home);
    }

    #[test]
    fn deeper_setting_keeps_more_components() {
        let home = Path::new("/home/u");
        assert_eq!(
            affected_root(home, Path::new("/home/u/a/b/c.txt"), 3),
            PathBuf::from("/home/u/a/b")
        );
        assert_eq!(affected_root(home, Path::new("/home/u/a/b"), 3), home);
    }

    #[test]
    fn outside_paths_map_to_parent() {
        assert_eq!(
            affected_root(Path::new("/home/u"), Path::new("/srv/data/file"), 2),
            PathBuf::from("/srv/data")
        );
    }

    #[test]
    fn records_share_a_flat_type_layout() {
        let connected = serde_json::to_value(StreamRecord::connected()).unwrap();
        assert_eq!(connected["type"], "connected");
        assert_eq!(connected["message"], CONNECTED_MESSAGE);

        let keepalive = serde_json::to_value(StreamRecord::Keepalive).unwrap();
        assert_eq!(keepalive, serde_json::json!({ "type": "keepalive" }));

        let event = ChangeEvent::new(
            ChangeKind::Deleted,
            PathBuf::from("/home/u/Downloads/x.zip"),
            Path::new("/home/u"),
            2,
        );
        let change = serde_json::to_value(StreamRecord::Change(event)).unwrap();
        assert_eq!(change["type"], "deleted");
        assert_eq!(change["path"], "/home/u/Downloads/x.zip");
        assert_eq!(change["root"], "/home/u/Downloads");
        assert!(change.get("observedAt").is_some());
    }
}
