use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::{Client, RequestBuilder};

use shopprobe_common::{ProbeRequest, ProbeResult, ProbeStatus};

pub fn auth(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(t) => builder.bearer_auth(t),
        None => builder,
    }
}

/// Thin wrapper over `reqwest::Client` that times each call and never fails:
/// transport errors come back as `ProbeStatus::TransportFailure`.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    http: Client,
}

impl ProbeClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(3));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    pub async fn send(&self, req: ProbeRequest) -> ProbeResult {
        let url = req.url.clone();
        let mut builder = auth(
            self.http.request(req.method, &req.url),
            req.bearer.as_deref(),
        );
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let resp = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error=%e, %url, "request failed");
                return ProbeResult::transport_failure(start.elapsed(), e.to_string());
            }
        };
        let status = resp.status().as_u16();
        let text = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(error=%e, %url, "failed to read response body");
                return ProbeResult::transport_failure(start.elapsed(), e.to_string());
            }
        };
        let latency = start.elapsed();

        tracing::trace!(%url, status, latency_ms = latency.as_millis() as u64, "probe done");

        ProbeResult {
            status: ProbeStatus::Http(status),
            latency,
            json: serde_json::from_str(&text).ok(),
            text,
        }
    }
}
