//! Turns a decode outcome into a structured log event.

use crate::logging::FrameDecodeEvent;
use chrono::Utc;
use focus_core::receiver::DecodeOutcome;

pub fn describe_outcome(frame_index: usize, outcome: &DecodeOutcome) -> FrameDecodeEvent {
    let fragments = outcome.fragments();
    let fragments_recovered = fragments.iter().filter(|f| f.is_some()).count();
    let fragments_total = fragments.len();
    let status = if outcome.is_found() { "found" } else { "notfound" };

    FrameDecodeEvent {
        timestamp: Utc::now(),
        frame_index,
        status: status.to_string(),
        fragments_recovered,
        fragments_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_reports_zero_fragments() {
        let event = describe_outcome(3, &DecodeOutcome::NotFound);
        assert_eq!(event.status, "notfound");
        assert_eq!(event.fragments_total, 0);
        assert_eq!(event.fragments_recovered, 0);
    }

    #[test]
    fn decoded_counts_recovered_fragments() {
        let outcome = DecodeOutcome::Decoded {
            fragments: vec![Some(vec![1]), None, Some(vec![2])],
            corners: [(0.0, 0.0); 4],
            symbols: Vec::new(),
            coded_fragments: Vec::new(),
        };
        let event = describe_outcome(5, &outcome);
        assert_eq!(event.status, "found");
        assert_eq!(event.fragments_total, 3);
        assert_eq!(event.fragments_recovered, 2);
        assert_eq!(event.frame_index, 5);
    }
}
