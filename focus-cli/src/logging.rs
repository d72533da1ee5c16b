//! Structured logging for CLI session events and decode telemetry.

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Structured log event types emitted over the course of a CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// Periodic decode-throughput sample (`videorx`, `receiver`).
    Telemetry(TelemetryEvent),

    /// Per-frame decode outcome.
    FrameDecode(FrameDecodeEvent),

    /// End-of-run summary.
    Statistics(StatisticsEvent),

    Info { message: String },
    Warn { message: String },
    Error { message: String, details: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: DateTime<Utc>,
    pub frames_decoded: usize,
    pub frames_located: usize,
    pub fragments_recovered: usize,
    pub fragments_total: usize,
    pub frames_per_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDecodeEvent {
    pub timestamp: DateTime<Utc>,
    pub frame_index: usize,
    pub status: String,
    pub fragments_recovered: usize,
    pub fragments_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub frames_total: usize,
    pub frames_located: usize,
    pub fragments_recovered: usize,
    pub fragments_total: usize,
}

/// Logger that renders `LogEvent`s as JSON, logfmt, or human-readable text.
pub struct StructuredLogger {
    config: LoggingConfig,
    writer: Box<dyn Write + Send>,
    start_time: DateTime<Utc>,
}

impl StructuredLogger {
    pub fn new(config: LoggingConfig) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match &config.target {
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or_else(|| color_eyre::eyre::eyre!("file path required for file logging"))?;
                Box::new(BufWriter::new(File::create(path)?))
            }
        };

        Ok(Self {
            config,
            writer,
            start_time: Utc::now(),
        })
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let output = match self.config.format {
            LogFormat::Json => self.format_json(&event)?,
            LogFormat::Logfmt => self.format_logfmt(&event),
            LogFormat::Pretty => self.format_pretty(&event),
        };

        writeln!(self.writer, "{output}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn format_json(&self, event: &LogEvent) -> Result<String> {
        Ok(serde_json::to_string(event)?)
    }

    fn format_logfmt(&self, event: &LogEvent) -> String {
        let ts = Utc::now().to_rfc3339();
        match event {
            LogEvent::Telemetry(t) => format!(
                "ts=\"{ts}\" type=telemetry frames={} located={} fragments={}/{} rate={:.1}fps",
                t.frames_decoded, t.frames_located, t.fragments_recovered, t.fragments_total, t.frames_per_sec
            ),
            LogEvent::FrameDecode(f) => format!(
                "ts=\"{ts}\" type=frame_decode frame={} status={} fragments={}/{}",
                f.frame_index, f.status, f.fragments_recovered, f.fragments_total
            ),
            LogEvent::Statistics(s) => format!(
                "ts=\"{ts}\" type=statistics duration_secs={:.2} frames={} located={} fragments={}/{}",
                s.duration_secs, s.frames_total, s.frames_located, s.fragments_recovered, s.fragments_total
            ),
            LogEvent::Info { message } => format!("ts=\"{ts}\" level=info msg=\"{message}\""),
            LogEvent::Warn { message } => format!("ts=\"{ts}\" level=warn msg=\"{message}\""),
            LogEvent::Error { message, details } => match details {
                Some(d) => format!("ts=\"{ts}\" level=error msg=\"{message}\" details=\"{d}\""),
                None => format!("ts=\"{ts}\" level=error msg=\"{message}\""),
            },
        }
    }

    fn format_pretty(&self, event: &LogEvent) -> String {
        let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        match event {
            LogEvent::Telemetry(t) => format!(
                "[{ts}] TELEMETRY: frames={} located={} fragments={}/{} rate={:.1} fps",
                t.frames_decoded, t.frames_located, t.fragments_recovered, t.fragments_total, t.frames_per_sec
            ),
            LogEvent::FrameDecode(f) => format!(
                "[{ts}] FRAME[{}]: {} | fragments {}/{}",
                f.frame_index, f.status, f.fragments_recovered, f.fragments_total
            ),
            LogEvent::Statistics(s) => format!(
                "[{ts}] STATISTICS ({:.2}s): frames={} located={} fragments={}/{}",
                s.duration_secs, s.frames_total, s.frames_located, s.fragments_recovered, s.fragments_total
            ),
            LogEvent::Info { message } => format!("[{ts}] INFO: {message}"),
            LogEvent::Warn { message } => format!("[{ts}] WARN: {message}"),
            LogEvent::Error { message, details } => match details {
                Some(d) => format!("[{ts}] ERROR: {message} | {d}"),
                None => format!("[{ts}] ERROR: {message}"),
            },
        }
    }

    pub fn elapsed(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}
