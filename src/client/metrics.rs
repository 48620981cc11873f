//! Client-local call statistics

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;

/// Latencies kept for the running average
pub const LATENCY_WINDOW: usize = 100;

/// One completed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub at: DateTime<Utc>,
    pub success: bool,
    pub latency: Duration,
}

/// Success and latency statistics owned by one client session
#[derive(Debug, Clone, Default)]
pub struct CallMetrics {
    total: u64,
    successful: u64,
    failed: u64,
    history: VecDeque<CallRecord>,
}

impl CallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, success: bool, latency: Duration) {
        self.record_call_at(Utc::now(), success, latency);
    }

    pub fn record_call_at(&mut self, at: DateTime<Utc>, success: bool, latency: Duration) {
        self.total += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }

        self.history.push_back(CallRecord { at, success, latency });
        while self.history.len() > LATENCY_WINDOW {
            self.history.pop_front();
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn successful(&self) -> u64 {
        self.successful
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Percentage of successful calls, 0 when nothing was recorded
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    /// Mean latency over the last `LATENCY_WINDOW` calls
    pub fn average_latency(&self) -> Option<Duration> {
        if self.history.is_empty() {
            return None;
        }
        let sum: Duration = self.history.iter().map(|record| record.latency).sum();
        Some(sum / self.history.len() as u32)
    }

    /// Failure percentage among calls recorded since `since`
    pub fn error_rate_since(&self, since: DateTime<Utc>) -> f64 {
        let recent: Vec<_> = self.history.iter().filter(|record| record.at >= since).collect();
        if recent.is_empty() {
            return 0.0;
        }
        let failed = recent.iter().filter(|record| !record.success).count();
        failed as f64 / recent.len() as f64 * 100.0
    }

    pub fn history(&self) -> impl Iterator<Item = &CallRecord> {
        self.history.iter()
    }
}
