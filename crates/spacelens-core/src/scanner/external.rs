//! Helper-process invocation with a hard timeout.
//!
//! Used by the disk-usage and shell-query size tiers and by bulk removal.
//! A helper that is missing, hangs past its deadline, or prints nothing
//! usable is reported as a [`ToolFailure`]; callers treat that as "this
//! tier did not apply" and move on.
use std::ffi::OsStr;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("helper `{program}` could not be started: {source}")]
    Missing {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("helper `{program}` timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("helper `{program}` produced unusable output: {output:?}")]
    Unparseable { program: String, output: String },
}

/// What a finished helper left behind.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
}

/// Run `argv` plus `extra` trailing arguments, killing it at `timeout`.
///
/// stderr is discarded; stdout is drained on a side thread so a chatty
/// helper cannot block on a full pipe while we poll for exit.
pub fn run<S: AsRef<OsStr>>(
    argv: &[String],
    extra: &[S],
    timeout: Duration,
) -> Result<ToolOutput, ToolFailure> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ToolFailure::Missing {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        });
    };

    let mut child = Command::new(program)
        .args(args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ToolFailure::Missing {
            program: program.clone(),
            source,
        })?;

    let mut stdout_pipe = child.stdout.take();
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // A grandchild may still hold the pipe open; leave the
                // reader detached instead of blocking on it. It returns
                // once the last holder closes the pipe.
                drop(reader);
                debug!("Helper {program} killed after {timeout:?}");
                return Err(ToolFailure::TimedOut {
                    program: program.clone(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                drop(reader);
                return Err(ToolFailure::Missing {
                    program: program.clone(),
                    source,
                });
            }
        }
    };

    let stdout = reader.join().unwrap_or_default();
    Ok(ToolOutput { status, stdout })
}

/// Parse disk-usage output: the first token is a KiB count.
///
/// `du` exits non-zero when parts of the tree are unreadable but still
/// prints its best total, so the exit status is deliberately not checked.
pub fn parse_kib_total(program: &str, output: &str) -> Result<u64, ToolFailure> {
    output
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<u64>().ok())
        .map(|kib| kib.saturating_mul(1024))
        .ok_or_else(|| ToolFailure::Unparseable {
            program: program.to_string(),
            output: output.trim().to_string(),
        })
}

/// Parse a byte count printed by a desktop-shell query. Accepts plain
/// integers and the floating-point form AppleScript uses for large values.
pub fn parse_byte_count(program: &str, output: &str) -> Result<u64, ToolFailure> {
    let trimmed = output.trim();
    let parsed = trimmed.parse::<u64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
    });
    parsed.ok_or_else(|| ToolFailure::Unparseable {
        program: program.to_string(),
        output: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into(), "sh".into()]
    }

    #[test]
    fn captures_stdout_and_trailing_args() {
        let out = run(&sh("echo \"$1\""), &["hello"], Duration::from_secs(10)).unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn missing_program_is_reported() {
        let argv = vec!["spacelens-no-such-helper".to_string()];
        let err = run::<&str>(&argv, &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ToolFailure::Missing { .. }));
    }

    #[test]
    fn hung_helper_is_killed() {
        let started = Instant::now();
        let err = run::<&str>(&sh("sleep 5"), &[], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ToolFailure::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_does_not_wait_for_a_grandchild_holding_stdout() {
        let started = Instant::now();
        let err = run::<&str>(&sh("sleep 3 & wait"), &[], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ToolFailure::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn kib_total_parses_first_token() {
        assert_eq!(parse_kib_total("du", "12\t/some/path\n").unwrap(), 12 * 1024);
        assert!(parse_kib_total("du", "").is_err());
        assert!(parse_kib_total("du", "du: cannot read").is_err());
    }

    #[test]
    fn byte_count_accepts_float_notation() {
        assert_eq!(parse_byte_count("osascript", "4096\n").unwrap(), 4096);
        assert_eq!(parse_byte_count("osascript", "1.5E+3").unwrap(), 1500);
        assert!(parse_byte_count("osascript", "missing value").is_err());
    }
}
