/// Spacelens Core — sizing, scanning, categorisation, deletion and change
/// notification.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (CLI, TUI,
/// an HTTP bridge).
///
/// # Modules
///
/// - [`model`] — Scan result tree and size formatting.
/// - [`scanner`] — Tiered size probe and bounded tree scanner.
/// - [`cache`] — TTL result cache for completed scans.
/// - [`analysis`] — Category breakdown and cleanup targets.
/// - [`delete`] — Guarded permanent and recoverable deletion.
/// - [`monitor`] — Live change notifications via the OS watch API.
/// - [`platform`] — Volume usage, well-known locations, permission checks.
/// - [`service`] — The [`StorageService`] facade wiring it all together.
pub mod analysis;
pub mod cache;
pub mod config;
pub mod delete;
pub mod error;
pub mod model;
pub mod monitor;
pub mod platform;
pub mod scanner;
pub mod service;

pub use config::EngineConfig;
pub use error::{DiskError, Result};
pub use service::{DiskInfo, StorageService};
