//! A single scanned filesystem entry and its (bounded) subtree.
//!
//! Nodes are built bottom-up by the tree scanner and sealed into their
//! parent; nothing mutates a node after that. Directory sizes always equal
//! the sum of their children once the synthetic gap/truncation children are
//! counted, so a consumer never has to guess where bytes went.
use std::cmp::Ordering;
use std::path::Path;

use compact_str::CompactString;
use serde::Serialize;

/// Extension recorded for files that have none.
pub const NO_EXTENSION: &str = "none";

/// Classification of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
    /// Synthetic child holding bytes that exist on disk but could not be
    /// enumerated (access denied).
    ProtectedGap,
    /// Synthetic child holding the children folded away by the fanout limit.
    Truncated,
}

impl NodeKind {
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::ProtectedGap | Self::Truncated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: CompactString,
    pub absolute_path: String,
    /// Physical (block-rounded) bytes on disk.
    pub size_bytes: u64,
    pub kind: NodeKind,
    /// Lowercased extension without the dot, or [`NO_EXTENSION`]. Files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<CompactString>,
    pub children: Vec<Node>,
    /// `true` when the entry has content that was not materialised here
    /// (collapsed at the depth limit, unreadable, or truncated).
    pub has_more_children: bool,
    /// For `Truncated`: number of folded children.
    /// For `ProtectedGap`: number of subdirectories that could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
}

impl Node {
    /// Leaf for a regular file or a symlink (measured as the link itself).
    pub fn file(path: &Path, size_bytes: u64) -> Self {
        let name = entry_name(path);
        let extension = Some(extension_of(&name));
        Self {
            name,
            absolute_path: path.to_string_lossy().into_owned(),
            size_bytes,
            kind: NodeKind::File,
            extension,
            children: Vec::new(),
            has_more_children: false,
            item_count: None,
        }
    }

    /// A fully materialised directory. `children` must already be final.
    pub fn directory(path: &Path, children: Vec<Node>, has_more_children: bool) -> Self {
        let size_bytes = children.iter().map(|c| c.size_bytes).sum();
        Self {
            name: entry_name(path),
            absolute_path: path.to_string_lossy().into_owned(),
            size_bytes,
            kind: NodeKind::Directory,
            extension: None,
            children,
            has_more_children,
            item_count: None,
        }
    }

    /// A directory represented by its total size only.
    pub fn collapsed_directory(path: &Path, size_bytes: u64) -> Self {
        Self {
            name: entry_name(path),
            absolute_path: path.to_string_lossy().into_owned(),
            size_bytes,
            kind: NodeKind::Directory,
            extension: None,
            children: Vec::new(),
            has_more_children: true,
            item_count: None,
        }
    }

    pub fn protected_gap(parent: &Path, gap_bytes: u64, restricted: u64) -> Self {
        Self {
            name: CompactString::new(format!("Protected data ({restricted} restricted)")),
            absolute_path: parent.to_string_lossy().into_owned(),
            size_bytes: gap_bytes,
            kind: NodeKind::ProtectedGap,
            extension: None,
            children: Vec::new(),
            has_more_children: false,
            item_count: Some(restricted),
        }
    }

    pub fn truncated(parent: &Path, folded_bytes: u64, folded_count: u64) -> Self {
        Self {
            name: CompactString::new(format!("{folded_count} more items")),
            absolute_path: parent.to_string_lossy().into_owned(),
            size_bytes: folded_bytes,
            kind: NodeKind::Truncated,
            extension: None,
            children: Vec::new(),
            has_more_children: false,
            item_count: Some(folded_count),
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Sum of the direct children's sizes.
    pub fn children_size(&self) -> u64 {
        self.children.iter().map(|c| c.size_bytes).sum()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Display order: directories first, then size descending, then name.
pub fn display_order(a: &Node, b: &Node) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then(b.size_bytes.cmp(&a.size_bytes))
        .then_with(|| a.name.cmp(&b.name))
}

/// Selection order used by truncation: size descending, directories first
/// among equals, then name.
pub fn size_order(a: &Node, b: &Node) -> Ordering {
    b.size_bytes
        .cmp(&a.size_bytes)
        .then(b.is_dir().cmp(&a.is_dir()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Lowercased extension of a file name, or [`NO_EXTENSION`].
///
/// Dotfiles such as `.bashrc` have no extension.
pub fn extension_of(name: &str) -> CompactString {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => CompactString::new(ext.to_ascii_lowercase()),
        _ => CompactString::new(NO_EXTENSION),
    }
}

fn entry_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        // "/" and similar roots have no file name component.
        None => CompactString::new(path.to_string_lossy()),
    }
}
