//! Concurrent burst against one endpoint to observe throttling.

use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use tracing::Instrument;

use shopprobe_common::{BurstConfig, ProbeRequest, ProbeStatus};

use crate::client::ProbeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstVerdict {
    ThrottlingObserved,
    /// No 429 over the whole burst: the protective behaviour is missing.
    ThrottlingAbsent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstReport {
    pub requests: usize,
    pub workers: usize,
    pub accepted: usize,
    pub throttled: usize,
    pub other: usize,
    pub transport_failures: usize,
    pub elapsed: Duration,
}

impl BurstReport {
    /// Count statuses. Order is irrelevant.
    pub fn tally(statuses: impl IntoIterator<Item = ProbeStatus>) -> Self {
        let mut report = BurstReport::default();
        for status in statuses {
            report.requests += 1;
            match status {
                ProbeStatus::OK => report.accepted += 1,
                ProbeStatus::TOO_MANY_REQUESTS => report.throttled += 1,
                ProbeStatus::TransportFailure => report.transport_failures += 1,
                ProbeStatus::Http(_) => report.other += 1,
            }
        }
        report
    }

    pub fn verdict(&self) -> BurstVerdict {
        if self.throttled > 0 {
            BurstVerdict::ThrottlingObserved
        } else {
            BurstVerdict::ThrottlingAbsent
        }
    }
}

/// Send `requests` GETs with at most `workers` in flight, then count.
pub async fn run_burst(client: &ProbeClient, config: &BurstConfig) -> BurstReport {
    let span = tracing::info_span!(
        "burst",
        target = %config.target,
        requests = config.requests,
        workers = config.workers
    );
    async {
        if config.requests <= config.throttle_threshold {
            tracing::warn!(
                threshold = config.throttle_threshold,
                "request count does not exceed the throttling threshold, a 429 is not guaranteed"
            );
        }

        let start = Instant::now();
        let statuses: Vec<ProbeStatus> = stream::iter(0..config.requests)
            .map(|_| {
                let req = ProbeRequest::get(config.target.clone());
                async move { client.send(req).await.status }
            })
            .buffer_unordered(config.workers.max(1))
            .collect()
            .await;

        let mut report = BurstReport::tally(statuses);
        report.workers = config.workers;
        report.elapsed = start.elapsed();
        tracing::info!(
            accepted = report.accepted,
            throttled = report.throttled,
            failures = report.transport_failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "burst finished"
        );
        report
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{closed_port_url, MockOptions, MockStorefront};

    #[test]
    fn test_tally() {
        let statuses = [
            ProbeStatus::Http(429),
            ProbeStatus::OK,
            ProbeStatus::TransportFailure,
            ProbeStatus::Http(503),
            ProbeStatus::OK,
        ];
        let r = BurstReport::tally(statuses);
        assert_eq!(r.requests, 5);
        assert_eq!(r.accepted, 2);
        assert_eq!(r.throttled, 1);
        assert_eq!(r.other, 1);
        assert_eq!(r.transport_failures, 1);
        assert_eq!(r.verdict(), BurstVerdict::ThrottlingObserved);
    }

    #[test]
    fn test_no_429_is_absent() {
        let r = BurstReport::tally(vec![ProbeStatus::OK; 120]);
        assert_eq!(r.verdict(), BurstVerdict::ThrottlingAbsent);
    }

    #[tokio::test]
    async fn test_burst_observes_throttling() {
        let mock = MockStorefront::start_with(MockOptions {
            health_limit: Some(5),
            ..MockOptions::default()
        })
        .await;
        let client = ProbeClient::new(None).unwrap();
        let config = BurstConfig {
            target: format!("{}/api/auth/health", mock.base_url()),
            requests: 12,
            workers: 4,
            throttle_threshold: 5,
        };

        let r = run_burst(&client, &config).await;
        assert_eq!(r.requests, 12);
        assert_eq!(r.accepted, 5);
        assert_eq!(r.throttled, 7);
        assert_eq!(r.verdict(), BurstVerdict::ThrottlingObserved);
    }

    #[tokio::test]
    async fn test_unlimited_endpoint_reports_absent() {
        let mock = MockStorefront::start().await;
        let client = ProbeClient::new(None).unwrap();
        let config = BurstConfig {
            target: format!("{}/api/auth/health", mock.base_url()),
            requests: 20,
            workers: 5,
            throttle_threshold: 10,
        };

        let r = run_burst(&client, &config).await;
        assert_eq!(r.accepted, 20);
        assert_eq!(r.verdict(), BurstVerdict::ThrottlingAbsent);
    }

    #[tokio::test]
    async fn test_transport_failures_do_not_abort_batch() {
        let client = ProbeClient::new(None).unwrap();
        let config = BurstConfig {
            target: closed_port_url().await,
            requests: 8,
            workers: 3,
            throttle_threshold: 100,
        };

        let r = run_burst(&client, &config).await;
        assert_eq!(r.requests, 8);
        assert_eq!(r.transport_failures, 8);
        assert_eq!(r.verdict(), BurstVerdict::ThrottlingAbsent);
    }
}
