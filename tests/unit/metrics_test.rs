//! Unit tests for client-side call metrics

use byteplus_image_gateway::client::metrics::LATENCY_WINDOW;
use byteplus_image_gateway::client::CallMetrics;
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;

#[test]
fn test_empty_metrics() {
    let metrics = CallMetrics::new();
    assert_eq!(metrics.total(), 0);
    assert_eq!(metrics.success_rate(), 0.0);
    assert_eq!(metrics.average_latency(), None);
    assert_eq!(metrics.error_rate_since(Utc::now()), 0.0);
}

#[test]
fn test_counts_and_success_rate() {
    let mut metrics = CallMetrics::new();
    metrics.record_call(true, Duration::from_millis(100));
    metrics.record_call(true, Duration::from_millis(300));
    metrics.record_call(false, Duration::from_millis(200));
    metrics.record_call(true, Duration::from_millis(400));

    assert_eq!(metrics.total(), 4);
    assert_eq!(metrics.successful(), 3);
    assert_eq!(metrics.failed(), 1);
    assert_eq!(metrics.success_rate(), 75.0);
    assert_eq!(metrics.average_latency(), Some(Duration::from_millis(250)));
}

#[test]
fn test_latency_window_is_bounded() {
    let mut metrics = CallMetrics::new();
    for _ in 0..LATENCY_WINDOW {
        metrics.record_call(true, Duration::from_secs(10));
    }
    for _ in 0..LATENCY_WINDOW {
        metrics.record_call(true, Duration::from_secs(2));
    }

    assert_eq!(metrics.total(), (LATENCY_WINDOW * 2) as u64);
    assert_eq!(metrics.history().count(), LATENCY_WINDOW);
    assert_eq!(metrics.average_latency(), Some(Duration::from_secs(2)));
}

#[test]
fn test_error_rate_only_counts_recent_calls() {
    let now = Utc::now();
    let mut metrics = CallMetrics::new();
    metrics.record_call_at(now - ChronoDuration::hours(2), false, Duration::from_secs(1));
    metrics.record_call_at(now - ChronoDuration::hours(2), false, Duration::from_secs(1));
    metrics.record_call_at(now - ChronoDuration::minutes(5), true, Duration::from_secs(1));
    metrics.record_call_at(now - ChronoDuration::minutes(1), false, Duration::from_secs(1));

    assert_eq!(metrics.error_rate_since(now - ChronoDuration::hours(1)), 50.0);
    assert_eq!(metrics.error_rate_since(now - ChronoDuration::hours(3)), 75.0);
    assert_eq!(metrics.error_rate_since(now), 0.0);
}
