//! Telemetry sampling: turns a stream of per-frame decode outcomes into
//! periodic throughput samples and an end-of-run summary.

use crate::logging::{StatisticsEvent, TelemetryEvent};
use chrono::Utc;
use focus_core::receiver::DecodeOutcome;
use std::time::Instant;

/// Accumulates decode outcomes and emits `TelemetryEvent`s on a fixed
/// wall-clock interval.
pub struct TelemetryAggregator {
    frames_total: usize,
    frames_located: usize,
    fragments_recovered: usize,
    fragments_total: usize,
    start_time: Instant,
    last_sample_time: Instant,
    sample_interval_secs: f64,
}

impl TelemetryAggregator {
    pub fn new(sample_interval_secs: f64) -> Self {
        let now = Instant::now();
        Self {
            frames_total: 0,
            frames_located: 0,
            fragments_recovered: 0,
            fragments_total: 0,
            start_time: now,
            last_sample_time: now,
            sample_interval_secs,
        }
    }

    /// Folds one frame's decode outcome into the running totals.
    pub fn record(&mut self, outcome: &DecodeOutcome) {
        self.frames_total += 1;
        if outcome.is_found() {
            self.frames_located += 1;
        }
        let fragments = outcome.fragments();
        self.fragments_total += fragments.len();
        self.fragments_recovered += fragments.iter().filter(|f| f.is_some()).count();
    }

    pub fn should_sample(&self) -> bool {
        self.last_sample_time.elapsed().as_secs_f64() >= self.sample_interval_secs
    }

    /// Produces a throughput sample if the sampling interval has elapsed,
    /// resetting the interval timer. Returns `None` otherwise.
    pub fn sample(&mut self) -> Option<TelemetryEvent> {
        if !self.should_sample() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let frames_per_sec = if elapsed > 0.0 {
            self.frames_total as f64 / elapsed
        } else {
            0.0
        };

        let event = TelemetryEvent {
            timestamp: Utc::now(),
            frames_decoded: self.frames_total,
            frames_located: self.frames_located,
            fragments_recovered: self.fragments_recovered,
            fragments_total: self.fragments_total,
            frames_per_sec,
        };

        self.last_sample_time = Instant::now();
        Some(event)
    }

    pub fn elapsed(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Final summary for the whole run.
    pub fn statistics(&self) -> StatisticsEvent {
        StatisticsEvent {
            timestamp: Utc::now(),
            duration_secs: self.elapsed(),
            frames_total: self.frames_total,
            frames_located: self.frames_located,
            fragments_recovered: self.fragments_recovered,
            fragments_total: self.fragments_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(nfragments: usize, nrecovered: usize) -> DecodeOutcome {
        let fragments = (0..nfragments)
            .map(|i| if i < nrecovered { Some(vec![0u8]) } else { None })
            .collect();
        DecodeOutcome::Decoded {
            fragments,
            corners: [(0.0, 0.0); 4],
            symbols: Vec::new(),
            coded_fragments: Vec::new(),
        }
    }

    #[test]
    fn records_recovered_and_missing_fragments() {
        let mut agg = TelemetryAggregator::new(1.0);
        agg.record(&decoded(4, 3));
        agg.record(&DecodeOutcome::NotFound);

        let stats = agg.statistics();
        assert_eq!(stats.frames_total, 2);
        assert_eq!(stats.frames_located, 1);
        assert_eq!(stats.fragments_total, 4);
        assert_eq!(stats.fragments_recovered, 3);
    }

    #[test]
    fn sample_is_none_before_interval_elapses() {
        let mut agg = TelemetryAggregator::new(60.0);
        agg.record(&decoded(1, 1));
        assert!(agg.sample().is_none());
    }
}
