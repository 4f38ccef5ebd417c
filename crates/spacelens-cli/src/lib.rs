/// Spacelens CLI — command-line front end over [`StorageService`].
///
/// Every command prints JSON on stdout (scans can also be rendered as an
/// indented tree or CSV); logs go to stderr.
///
/// # Exit codes
///
/// | code | meaning                                   |
/// |------|-------------------------------------------|
/// | 0    | success (including partial deletions)     |
/// | 1    | unexpected failure                        |
/// | 2    | invalid input (missing / not a directory) |
/// | 3    | deletion target is a protected path       |
/// | 4    | deletion removed nothing                  |
pub mod output;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use spacelens_core::delete::{DeletionOutcome, DeletionStatus};
use spacelens_core::{DiskError, EngineConfig, StorageService};
use tracing::info;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INPUT_ERROR: u8 = 2;
pub const EXIT_PROTECTED_PATH: u8 = 3;
pub const EXIT_FULL_DENIAL: u8 = 4;

#[derive(Debug, Parser)]
#[command(name = "spacelens", version)]
#[command(about = "Storage usage analyser with accurate on-disk sizes and safe cleanup")]
pub struct Cli {
    /// JSON configuration file; omitted fields use defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory into a size tree.
    Scan {
        path: PathBuf,
        /// Levels to materialise (1-10).
        #[arg(long)]
        depth: Option<u32>,
        /// Children kept per directory before the rest is folded.
        #[arg(long)]
        fanout: Option<usize>,
        #[arg(long, value_enum, default_value_t = ScanFormat::Json)]
        format: ScanFormat,
    },
    /// Volume totals and the storage category breakdown.
    DiskInfo,
    /// Move a path to the trash, or remove it with --permanent.
    Delete {
        path: PathBuf,
        #[arg(long)]
        permanent: bool,
    },
    /// Stream filesystem change events as JSON lines.
    Watch {
        /// Directory to watch instead of the configured root.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Sizes of caches, logs, trash and downloads.
    CleanTargets,
    /// Suggested scan roots.
    Roots,
    /// Report full-disk-access and superuser status.
    CheckPermissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanFormat {
    Json,
    Tree,
    Csv,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteReport<'a> {
    path: &'a Path,
    permanent: bool,
    status: DeletionStatus,
    #[serde(flatten)]
    outcome: &'a DeletionOutcome,
}

/// Execute the parsed command.
pub fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let service = StorageService::new(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Command::Scan {
            path,
            depth,
            fanout,
            format,
        } => {
            let node = service.scan(path, *depth, *fanout)?;
            match format {
                ScanFormat::Json => output::write_json(&mut out, &*node)?,
                ScanFormat::Tree => output::write_tree(&mut out, &node)?,
                ScanFormat::Csv => output::write_csv(&mut out, &node)?,
            }
        }
        Command::DiskInfo => output::write_json(&mut out, &service.disk_info()?)?,
        Command::Delete { path, permanent } => {
            let outcome = service.delete(path, *permanent)?;
            let status = outcome.status();
            output::write_json(
                &mut out,
                &DeleteReport {
                    path,
                    permanent: *permanent,
                    status,
                    outcome: &outcome,
                },
            )?;
            if status == DeletionStatus::FullDenial {
                return Ok(ExitCode::from(EXIT_FULL_DENIAL));
            }
        }
        Command::Watch { root } => watch(&service, root.as_deref(), &mut out)?,
        Command::CleanTargets => output::write_json(&mut out, &service.clean_targets())?,
        Command::Roots => output::write_json(&mut out, &service.roots())?,
        Command::CheckPermissions => output::write_json(&mut out, &service.check_permissions())?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Print stream records until the watcher stops or stdout goes away.
fn watch<W: Write>(service: &StorageService, root: Option<&Path>, out: &mut W) -> anyhow::Result<()> {
    let notifier = service.notifier();
    match root {
        Some(root) => notifier.start(root)?,
        None => service.start_watching()?,
    }
    info!("Streaming change events; interrupt to stop");
    for record in notifier.subscribe() {
        writeln!(out, "{}", record.to_json()?)?;
        out.flush()?;
    }
    Ok(())
}

/// Exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DiskError>() {
        Some(e) if e.is_input_error() => EXIT_INPUT_ERROR,
        Some(DiskError::ProtectedPath(_)) => EXIT_PROTECTED_PATH,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_with_options() {
        let cli = Cli::try_parse_from([
            "spacelens", "scan", "/data", "--depth", "3", "--fanout", "20", "--format", "csv",
        ])
        .unwrap();
        match cli.command {
            Command::Scan {
                path,
                depth,
                fanout,
                format,
            } => {
                assert_eq!(path, PathBuf::from("/data"));
                assert_eq!(depth, Some(3));
                assert_eq!(fanout, Some(20));
                assert_eq!(format, ScanFormat::Csv);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "spacelens", "delete", "/tmp/x", "--permanent", "-v", "--config", "c.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Command::Delete { permanent: true, .. }));
    }

    #[test]
    fn scan_defaults_to_json() {
        let cli = Cli::try_parse_from(["spacelens", "scan", "."]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Scan {
                format: ScanFormat::Json,
                depth: None,
                ..
            }
        ));
    }

    #[test]
    fn errors_map_to_exit_codes() {
        let input = anyhow::Error::from(DiskError::NotFound("/nope".into()));
        assert_eq!(exit_code(&input), EXIT_INPUT_ERROR);

        let protected =
            anyhow::Error::from(DiskError::ProtectedPath("/".into())).context("deleting");
        assert_eq!(exit_code(&protected), EXIT_PROTECTED_PATH);

        let other = anyhow::anyhow!("boom");
        assert_eq!(exit_code(&other), EXIT_FAILURE);
    }

    #[test]
    fn delete_report_flattens_outcome() {
        let outcome = DeletionOutcome::from_remaining(3, vec![PathBuf::from("/x/locked")]);
        let report = DeleteReport {
            path: Path::new("/x"),
            permanent: true,
            status: outcome.status(),
            outcome: &outcome,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["deletedCount"], 2);
        assert_eq!(json["skippedPaths"][0], "/x/locked");
    }
}
