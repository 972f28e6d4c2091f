//! Tracing setup for the three docsift binaries.
//!
//! Each binary picks a console stream and a default level. The HTTP server logs to stdout. The
//! MCP server and the CLI log to stderr because stdout carries JSON-RPC frames or command
//! output. The HTTP and MCP servers also append to a log file (`DOCSIFT_LOG_FILE`, default
//! `logs/docsift.log`); setting the variable to `off` disables the file layer.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "DOCSIFT_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_NAME: &str = "docsift.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Console {
    Stdout,
    Stderr,
}

/// Where file logs go, resolved from `DOCSIFT_LOG_FILE`.
#[derive(Debug, PartialEq, Eq)]
enum FileTarget {
    Disabled,
    Default,
    Path(PathBuf),
}

impl FileTarget {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Default,
            Some(value) if value.eq_ignore_ascii_case("off") => Self::Disabled,
            Some(path) => Self::Path(PathBuf::from(path)),
        }
    }
}

/// Tracing for the HTTP server: compact stdout plus the log file, `info` by default.
///
/// `RUST_LOG` overrides the level. Calling this more than once leaves the first subscriber in
/// place.
pub fn init_tracing() {
    install(Console::Stdout, "info", true);
}

/// Tracing for the stdio MCP server: stderr plus the log file, so stdout stays protocol-only.
pub fn init_mcp_tracing() {
    install(Console::Stderr, "info", true);
}

/// Stderr-only tracing at `warn` for the CLI, whose stdout carries JSON results.
pub fn init_cli_tracing() {
    install(Console::Stderr, "warn", false);
}

fn install(console: Console, default_level: &str, with_file: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console_layer = match console {
        Console::Stdout => fmt::layer().with_target(false).compact().boxed(),
        Console::Stderr => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .boxed(),
    };
    let file_layer = with_file.then(file_writer).flatten().map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Non-blocking writer for the configured log file, or `None` when disabled or unopenable.
fn file_writer() -> Option<NonBlocking> {
    let target = FileTarget::from_env_value(std::env::var(LOG_FILE_ENV).ok().as_deref());
    let (non_blocking, guard) = match target {
        FileTarget::Disabled => return None,
        FileTarget::Path(path) => {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                Ok(file) => tracing_appender::non_blocking(file),
                Err(err) => {
                    eprintln!("Failed to open log file {}: {err}", path.display());
                    return None;
                }
            }
        }
        FileTarget::Default => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create {DEFAULT_LOG_DIR} directory: {err}");
                return None;
            }
            tracing_appender::non_blocking(tracing_appender::rolling::never(
                DEFAULT_LOG_DIR,
                DEFAULT_LOG_NAME,
            ))
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_blank_uses_default_file() {
        assert_eq!(FileTarget::from_env_value(None), FileTarget::Default);
        assert_eq!(FileTarget::from_env_value(Some("  ")), FileTarget::Default);
    }

    #[test]
    fn off_disables_file_logging() {
        assert_eq!(FileTarget::from_env_value(Some("OFF")), FileTarget::Disabled);
    }

    #[test]
    fn explicit_path_is_kept() {
        assert_eq!(
            FileTarget::from_env_value(Some("/var/log/docsift.log")),
            FileTarget::Path(PathBuf::from("/var/log/docsift.log"))
        );
    }
}
