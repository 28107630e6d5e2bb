// src/run_log/usage.rs
//! Token and timing summary of a run log.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::TIMESTAMP_FORMAT;
use crate::extraction::bookkeeping::TokenUsage;
use crate::extraction::events::{parse_events, Role};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    /// Metadata events carrying both token counters.
    pub calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub timestamps: usize,
    /// Gaps between consecutive markers.
    pub intervals: usize,
    /// Whole seconds between the first and last timestamp marker.
    pub total_seconds: Option<i64>,
    /// Mean gap between consecutive markers, in seconds.
    pub mean_seconds: Option<f64>,
}

impl UsageSummary {
    /// Folds another log's summary into this one.
    pub fn merge(&mut self, other: &UsageSummary) {
        let weighted = |s: &UsageSummary| s.mean_seconds.map(|m| (m, s.intervals as f64));
        self.mean_seconds = match (weighted(&*self), weighted(other)) {
            (Some((a, n)), Some((b, m))) => Some((a * n + b * m) / (n + m)),
            (a, b) => a.or(b).map(|(mean, _)| mean),
        };
        self.total_seconds = match (self.total_seconds, other.total_seconds) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.calls += other.calls;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.timestamps += other.timestamps;
        self.intervals += other.intervals;
    }
}

/// Timestamp markers found in `log`, in order.
pub fn timestamps(log: &str) -> Vec<NaiveDateTime> {
    log.lines()
        .filter_map(|line| {
            let open = line.find('[')?;
            let close = open + line[open..].find(']')?;
            NaiveDateTime::parse_from_str(&line[open + 1..close], TIMESTAMP_FORMAT).ok()
        })
        .collect()
}

/// Sums token counters over all metadata events and measures the gaps
/// between timestamp markers. Durations need at least two markers.
pub fn summarize_log(log: &str) -> UsageSummary {
    let mut summary = UsageSummary::default();

    for event in parse_events(log).iter().filter(|e| e.role == Role::Metadata) {
        if let Some((prompt, completion)) = TokenUsage::from_content(&event.content).complete() {
            summary.calls += 1;
            summary.prompt_tokens += prompt;
            summary.completion_tokens += completion;
        }
    }

    let stamps = timestamps(log);
    summary.timestamps = stamps.len();
    if stamps.len() >= 2 {
        let total: Duration = stamps.windows(2).map(|w| w[1] - w[0]).sum();
        summary.intervals = stamps.len() - 1;
        summary.total_seconds = Some(total.num_seconds());
        summary.mean_seconds = Some(total.num_milliseconds() as f64 / 1000.0 / summary.intervals as f64);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "[2024-11-03_T09-00-00]\n\
{'role': 'assistant', 'content': 'ok'}\n\
{'role': 'metadata', 'content': 'Country, USA, Usage_Prompt_Tokens, 489, Usage_Completion_Tokens, 185'}\n\
[2024-11-03_T09-00-30]\n\
{'role': 'metadata', 'content': 'Country, Chile, Usage_Prompt_Tokens, 11, Usage_Completion_Tokens, 4'}\n\
{'role': 'metadata', 'content': 'Country, Peru, Usage_Prompt_Tokens, , Usage_Completion_Tokens, '}\n\
[2024-11-03_T09-01-30]\n";

    #[test]
    fn test_summarize_tokens_and_durations() {
        let summary = summarize_log(LOG);
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.prompt_tokens, 500);
        assert_eq!(summary.completion_tokens, 189);
        assert_eq!(summary.timestamps, 3);
        assert_eq!(summary.total_seconds, Some(90));
        assert_eq!(summary.mean_seconds, Some(45.0));
    }

    #[test]
    fn test_single_timestamp_has_no_durations() {
        let summary = summarize_log("[2024-11-03_T09-00-00]\n");
        assert_eq!(summary.timestamps, 1);
        assert_eq!(summary.total_seconds, None);
        assert_eq!(summary.mean_seconds, None);
    }

    #[test]
    fn test_merge_weights_means_by_gap_count() {
        let mut total = summarize_log(LOG);
        let other = summarize_log("[2024-11-03_T10-00-00]\n[2024-11-03_T10-00-15]\n");
        total.merge(&other);
        assert_eq!(total.timestamps, 5);
        assert_eq!(total.total_seconds, Some(105));
        assert_eq!(total.mean_seconds, Some(35.0));
    }
}
