//! Sequential runner for dependent HTTP steps.
//!
//! Each step is sent, its status compared with what it declared, and the
//! first unexpected outcome ends the run. There is no retry and no rollback of
//! whatever the earlier steps already changed on the remote side.

use serde_json::Value;
use tracing::Instrument;

use shopprobe_common::{ProbeError, ProbeRequest, ProbeResult, ProbeStatus, Result};

use crate::client::ProbeClient;
use crate::output;

/// Status a step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Status(u16),
    /// Any HTTP status. Transport failures are still fatal.
    AnyStatus,
}

impl Expect {
    fn accepts(self, status: ProbeStatus) -> bool {
        match (self, status) {
            (_, ProbeStatus::TransportFailure) => false,
            (Expect::Status(code), s) => s.is(code),
            (Expect::AnyStatus, ProbeStatus::Http(_)) => true,
        }
    }

    /// Detail printed next to the pass marker of an accepted step.
    fn pass_detail(self, status: ProbeStatus) -> String {
        match self {
            Expect::Status(_) => String::new(),
            Expect::AnyStatus => format!("accepted (HTTP {status})"),
        }
    }
}

#[derive(Debug)]
pub struct Step {
    pub name: String,
    pub request: ProbeRequest,
    pub expect: Expect,
}

impl Step {
    pub fn new(name: impl Into<String>, request: ProbeRequest, expect: Expect) -> Self {
        Self {
            name: name.into(),
            request,
            expect,
        }
    }
}

pub struct ScenarioRunner<'a> {
    client: &'a ProbeClient,
    completed: usize,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(client: &'a ProbeClient) -> Self {
        Self {
            client,
            completed: 0,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Run one step, printing a progress line before and a marker after.
    pub async fn run(&mut self, step: Step) -> Result<ProbeResult> {
        let Step {
            name,
            request,
            expect,
        } = step;
        let span = tracing::info_span!("step", name = %name, index = self.completed);
        async move {
            output::print_action(&name);
            let url = request.url.clone();
            let result = self.client.send(request).await;
            tracing::debug!(status=%result.status, latency_ms = result.latency_ms(), "step response");

            if expect.accepts(result.status) {
                self.completed += 1;
                output::print_pass(&expect.pass_detail(result.status));
                return Ok(result);
            }

            match (expect, result.status) {
                (_, ProbeStatus::TransportFailure) => {
                    output::print_fail(&format!("FAILED: {}", result.text));
                    Err(ProbeError::Transport {
                        url,
                        reason: result.text,
                    })
                }
                (Expect::Status(expected), actual) => {
                    let body = result.body_for_report();
                    output::print_unexpected_status(expected, &actual.to_string(), &body);
                    Err(ProbeError::UnexpectedStatus {
                        step: name,
                        expected,
                        actual: actual.to_string(),
                        body,
                    })
                }
                // AnyStatus accepts every Http status.
                (Expect::AnyStatus, ProbeStatus::Http(_)) => Ok(result),
            }
        }
        .instrument(span)
        .await
    }
}

/// The parsed body, or `null` when the response was not JSON so extraction
/// fails with a shape error rather than a panic.
pub fn body(result: &ProbeResult) -> &Value {
    result.json.as_ref().unwrap_or(&Value::Null)
}
