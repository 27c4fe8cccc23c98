//! Latency heuristic for a read-through cache on the remote side.
//!
//! Two identical reads back to back: a faster second call hints at a cache
//! hit. Network jitter can defeat this, so a slower second call is only a
//! warning.

use std::time::Duration;

use shopprobe_common::{ProbeRequest, ProbeStatus};

use crate::client::ProbeClient;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheVerdict {
    Faster { speedup: f64 },
    Inconclusive,
    /// First call did not return 200; no comparison was made.
    Unreachable { status: ProbeStatus },
    /// Second call did not return 200; its latency says nothing about a cache.
    SecondReadFailed { status: ProbeStatus },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheReport {
    pub target: String,
    pub first: Option<Duration>,
    pub second: Option<Duration>,
    pub verdict: CacheVerdict,
}

pub fn classify(first: Duration, second: Duration) -> CacheVerdict {
    if second < first {
        let speedup = if second.is_zero() {
            f64::INFINITY
        } else {
            first.as_secs_f64() / second.as_secs_f64()
        };
        CacheVerdict::Faster { speedup }
    } else {
        CacheVerdict::Inconclusive
    }
}

pub async fn run_cache_probe(client: &ProbeClient, target: &str) -> CacheReport {
    let first = client.send(ProbeRequest::get(target)).await;
    tracing::info!(latency_ms = first.latency_ms(), status = %first.status, "first read");
    if first.status != ProbeStatus::OK {
        return CacheReport {
            target: target.to_string(),
            first: Some(first.latency),
            second: None,
            verdict: CacheVerdict::Unreachable {
                status: first.status,
            },
        };
    }

    let second = client.send(ProbeRequest::get(target)).await;
    tracing::info!(latency_ms = second.latency_ms(), status = %second.status, "second read");
    let verdict = if second.status == ProbeStatus::OK {
        classify(first.latency, second.latency)
    } else {
        CacheVerdict::SecondReadFailed {
            status: second.status,
        }
    };

    CacheReport {
        target: target.to_string(),
        first: Some(first.latency),
        second: Some(second.latency),
        verdict,
    }
}
