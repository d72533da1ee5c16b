//! Structured logging infrastructure for the FOCUS pipeline.
//!
//! Provides an in-process log collector that can be queried by both the
//! CLI and tests, independent of whichever global logging facade the
//! binary crate wires up.

use std::fmt;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to record.
    pub level: LogLevel,

    /// Per-subsystem toggles.
    pub enable_mapping: bool,
    pub enable_phy: bool,
    pub enable_link: bool,
    pub enable_worker: bool,

    /// Maximum number of log entries to keep (for memory management).
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_mapping: true,
            enable_phy: true,
            enable_link: true,
            enable_worker: true,
            max_entries: 1000,
        }
    }
}

impl LogConfig {
    /// Verbose logging for debugging.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            max_entries: 5000,
            ..Default::default()
        }
    }

    /// Quiet logging for production.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_mapping: false,
            enable_phy: false,
            enable_link: false,
            enable_worker: false,
            max_entries: 100,
        }
    }

    /// Disable all logging.
    pub fn disabled() -> Self {
        Self {
            level: LogLevel::Error,
            enable_mapping: false,
            enable_phy: false,
            enable_link: false,
            enable_worker: false,
            max_entries: 0,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger that collects structured log entries for a decode/encode session.
#[derive(Debug, Clone)]
pub struct PipelineLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl PipelineLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(1000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Log a message at the specified level.
    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "MAPPING" | "SPECTRUM" => self.config.enable_mapping,
            "PHY" | "FFT" | "FRAMER" => self.config.enable_phy,
            "LINK" | "RS" => self.config.enable_link,
            "WORKER" => self.config.enable_worker,
            _ => true,
        };

        if !enabled {
            return;
        }

        let entry = LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        };

        if self.config.max_entries > 0 {
            if self.entries.len() >= self.config.max_entries {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        #[cfg(any(test, debug_assertions))]
        {
            eprintln!("[{}] {}: {}", level, subsystem, message);
        }
    }

    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn error(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, subsystem, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.subsystem == subsystem)
            .collect()
    }

    pub fn entries_at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level >= level).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for PipelineLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for PipelineLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.entries {
            writeln!(f, "[{}] {}: {}", e.level, e.subsystem, e.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_level() {
        let config = LogConfig {
            level: LogLevel::Info,
            ..Default::default()
        };
        let mut logger = PipelineLogger::new(config);

        logger.trace("MAPPING", "trace message");
        logger.debug("MAPPING", "debug message");
        logger.info("MAPPING", "info message");
        logger.warn("MAPPING", "warn message");

        assert_eq!(logger.entries().len(), 2);
    }

    #[test]
    fn filters_by_subsystem() {
        let config = LogConfig {
            level: LogLevel::Debug,
            enable_mapping: false,
            ..Default::default()
        };
        let mut logger = PipelineLogger::new(config);

        logger.info("MAPPING", "mapping message");
        logger.info("LINK", "link message");

        assert_eq!(logger.entries().len(), 1);
        assert_eq!(logger.entries()[0].subsystem, "LINK");
    }

    #[test]
    fn respects_max_entries() {
        let config = LogConfig {
            level: LogLevel::Debug,
            max_entries: 3,
            ..Default::default()
        };
        let mut logger = PipelineLogger::new(config);

        logger.info("WORKER", "message 1");
        logger.info("WORKER", "message 2");
        logger.info("WORKER", "message 3");
        logger.info("WORKER", "message 4");

        assert_eq!(logger.entries().len(), 3);
        assert!(logger.entries()[0].message.contains("message 2"));
    }
}
