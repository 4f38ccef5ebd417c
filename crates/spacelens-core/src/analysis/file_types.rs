/// Storage categories and extension-based classification.
///
/// Groups files into the broad categories used by the storage breakdown
/// (Apps, Documents, Archives, System Data, the OS footprint, Other).
use serde::Serialize;

/// Broad storage categories for the disk breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StorageCategory {
    Apps,
    Documents,
    Archives,
    SystemData,
    OperatingSystem,
    Other,
}

impl StorageCategory {
    /// Every category that can hold scanned content, in table order.
    pub const SCANNED: [StorageCategory; 5] = [
        Self::Apps,
        Self::Documents,
        Self::Archives,
        Self::SystemData,
        Self::Other,
    ];

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Apps => "Apps",
            Self::Documents => "Documents",
            Self::Archives => "Archives",
            Self::SystemData => "System Data",
            Self::OperatingSystem => {
                if cfg!(target_os = "macos") {
                    "macOS"
                } else {
                    "Operating System"
                }
            }
            Self::Other => "Other",
        }
    }

    /// Colour token handed to renderers, as a CSS hex string.
    pub fn color_token(self) -> &'static str {
        match self {
            Self::Apps => "#ec4899",
            Self::Documents => "#f97316",
            Self::Archives => "#22c55e",
            Self::SystemData => "#8b5cf6",
            Self::OperatingSystem => "#3b82f6",
            Self::Other => "#06b6d4",
        }
    }

    /// Categories listed in a breakdown even when empty.
    pub fn always_listed(self) -> bool {
        matches!(
            self,
            Self::Apps | Self::Documents | Self::SystemData | Self::Other
        )
    }
}

/// Categorise a file extension (without the dot) into a storage category.
///
/// Extensions are lowercased into a fixed-size stack buffer rather than an
/// allocated `String`; anything longer than 16 bytes is `Other`.
pub fn categorise_extension(ext: &str) -> StorageCategory {
    let bytes = ext.as_bytes();
    if bytes.len() > 16 {
        return StorageCategory::Other;
    }

    let mut lower = [0u8; 16];
    for (dest, &src) in lower.iter_mut().zip(bytes.iter()) {
        *dest = src.to_ascii_lowercase();
    }
    let lower_str = match std::str::from_utf8(&lower[..bytes.len()]) {
        Ok(s) => s,
        Err(_) => return StorageCategory::Other,
    };

    match lower_str {
        "app" | "dmg" | "pkg" | "ipa" => StorageCategory::Apps,
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "rtf" | "pages"
        | "numbers" | "keynote" | "csv" | "odt" | "ods" | "odp" => StorageCategory::Documents,
        "zip" | "tar" | "gz" | "rar" | "7z" | "bz2" | "xz" | "tgz" | "iso" => {
            StorageCategory::Archives
        }
        _ => StorageCategory::Other,
    }
}

/// Categorise a file by its name.
pub fn categorise_file_name(name: &str) -> StorageCategory {
    match std::path::Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => categorise_extension(ext),
        None => StorageCategory::Other,
    }
}
