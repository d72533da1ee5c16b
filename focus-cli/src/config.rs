//! CLI-facing configuration helpers.
//!
//! Unlike the teacher crate this CLI has no TOML configuration file layer:
//! every command's flags and defaults are pinned by the external interface
//! (see the CLI command table), so a config file format would only
//! duplicate what `clap` already validates. `LoggingConfig` below is the
//! one piece of session-wide configuration the CLI still needs, since it is
//! shared by every subcommand and is not itself part of the stable flag
//! surface.

use std::path::PathBuf;

/// Where and how structured log events are rendered.
///
/// Defaults to stderr so that commands which emit a payload on stdout
/// (`simplerx`, `receiver`, `videorx`) keep that stream free of anything
/// but the bytes being decoded.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub target: LogTarget,
    pub file_path: Option<PathBuf>,
    pub format: LogFormat,
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Stderr,
            file_path: None,
            format: LogFormat::Pretty,
            level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
