/// Platform-specific functionality — volume usage, well-known locations,
/// and permission checks.

pub mod locations;
pub mod permissions;
pub mod volume;

pub use locations::{browse_roots, default_recovery_dir, home_dir, RootEntry};
pub use permissions::{check_permissions, is_superuser, PermissionReport};
pub use volume::{volume_usage, VolumeUsage};
