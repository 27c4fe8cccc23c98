//! Checks for effects the storefront applies asynchronously after checkout.
//!
//! The stock decrement travels through a message queue, so nothing is visible
//! right after the checkout response. The verifier waits the settle delay and
//! then polls with exponential backoff. A value that stays at its pre-checkout
//! baseline ends as [`Outcome::TimedOut`]; any other wrong value ends as
//! [`Outcome::Mismatch`] immediately. Neither aborts the run.

use std::future::Future;

use serde_json::Value;
use tracing::Instrument;

use shopprobe_common::{
    join_url, ProbeConfig, ProbeRequest, ProbeStatus, Result, SessionContext, SettleConfig,
};

use crate::client::ProbeClient;
use crate::output;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Confirmed { observed: String },
    Mismatch { expected: String, observed: String },
    TimedOut { attempts: u32, last_observed: String },
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub name: String,
    pub outcome: Outcome,
    /// Printed next to a failed outcome.
    pub hint: Option<String>,
}

impl Assertion {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// One reading of downstream state.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The post-condition holds.
    Expected(String),
    /// Still the pre-trigger value (or unreadable); worth polling again.
    Pending(String),
    /// Wrong in a way more waiting will not fix.
    Unexpected(String),
}

/// Poll `observe` until it reports [`Observation::Expected`], the attempts
/// budget runs out, or an unexpected value shows up.
pub async fn poll_until<F, Fut>(settle: &SettleConfig, expected: &str, mut observe: F) -> Outcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Observation>,
{
    let mut delays = settle.backoff_delays();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let last = match observe().await {
            Observation::Expected(observed) => return Outcome::Confirmed { observed },
            Observation::Unexpected(observed) => {
                return Outcome::Mismatch {
                    expected: expected.to_string(),
                    observed,
                }
            }
            Observation::Pending(observed) => observed,
        };
        match delays.next() {
            Some(delay) => {
                tracing::debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, last = %last, "post-condition not visible yet");
                tokio::time::sleep(delay).await;
            }
            None => {
                return Outcome::TimedOut {
                    attempts,
                    last_observed: last,
                }
            }
        }
    }
}

/// Classify a stock reading against the purchase.
pub fn classify_stock(observed: Option<i64>, initial: i64, expected: i64) -> Observation {
    match observed {
        Some(v) if v == expected => Observation::Expected(format!("{initial} -> {v}")),
        Some(v) if v == initial => Observation::Pending(v.to_string()),
        Some(v) => Observation::Unexpected(v.to_string()),
        None => Observation::Pending("no stockQuantity".to_string()),
    }
}

/// Integral stock count; `8` and `8.0` read the same, `7.5` reads as nothing.
pub fn stock_reading(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Order history is either a bare list or a page with `content`.
fn history_entries(body: &Value) -> Option<&Vec<Value>> {
    body.as_array()
        .or_else(|| body.get("content").and_then(Value::as_array))
}

/// Look for the order by its id, or by its display number.
pub fn find_order<'a>(
    history: &'a Value,
    order_id: &shopprobe_common::EntityId,
    order_number: Option<&str>,
) -> Option<&'a Value> {
    history_entries(history)?.iter().find(|o| {
        let by_id = o.get("id").is_some_and(|v| order_id.matches(v));
        let by_number = o
            .get("orderNumber")
            .and_then(Value::as_str)
            .is_some_and(|n| n == order_id.as_str() || Some(n) == order_number);
        by_id || by_number
    })
}

fn describe_history(history: &Value) -> String {
    match history_entries(history) {
        Some(entries) => {
            let ids: Vec<String> = entries
                .iter()
                .map(|o| o.get("id").map(Value::to_string).unwrap_or_else(|| "?".to_string()))
                .collect();
            format!("history ids [{}]", ids.join(", "))
        }
        None => "unrecognized history body".to_string(),
    }
}

/// Settle, then check stock and order history. Both assertions always run.
pub async fn verify_effects(
    client: &ProbeClient,
    config: &ProbeConfig,
    ctx: &SessionContext,
) -> Result<Vec<Assertion>> {
    let token = ctx.token()?.to_string();
    let product_id = ctx.product_id()?.clone();
    let order_id = ctx.order_id()?.clone();
    let order_number = ctx.order_number().map(str::to_string);
    let purchase = ctx.purchase()?;
    let settle = &config.settle;

    output::print_action(&format!(
        "Waiting {} ms for asynchronous events to propagate",
        settle.settle_ms
    ));
    tokio::time::sleep(settle.settle_delay()).await;

    let initial = i64::from(purchase.initial_stock);
    let expected = purchase.expected_stock();
    output::print_action(&format!("Checking stock for product {product_id}"));
    let stock_url = join_url(&config.services.product_url, product_id.as_str());
    let stock = poll_until(settle, &expected.to_string(), || {
        let req = ProbeRequest::get(stock_url.clone()).bearer(token.clone());
        async move {
            let r = client.send(req).await;
            if r.status != ProbeStatus::OK {
                return Observation::Pending(format!("HTTP {}", r.status));
            }
            let observed = r
                .json
                .as_ref()
                .and_then(|b| b.get("stockQuantity"))
                .and_then(stock_reading);
            classify_stock(observed, initial, expected)
        }
    })
    .instrument(tracing::info_span!("verify_stock", product = %product_id))
    .await;
    let stock = Assertion::new("Stock update", stock).with_hint(
        "if it stays at the initial value, the stock consumer of the order event did not run",
    );
    output::print_assertion(&stock);

    output::print_action("Checking user order history");
    let order_url = config.services.order_url.clone();
    let wanted = &order_id;
    let wanted_number = order_number.as_deref();
    let order = poll_until(settle, &format!("order {order_id} in history"), move || {
        let req = ProbeRequest::get(order_url.clone()).bearer(token.clone());
        async move {
            let r = client.send(req).await;
            let Some(history) = r.json.as_ref().filter(|_| r.status == ProbeStatus::OK) else {
                return Observation::Pending(format!("HTTP {}", r.status));
            };
            match find_order(history, wanted, wanted_number) {
                Some(o) => Observation::Expected(format!(
                    "ID={} Status={}",
                    o.get("id").map(Value::to_string).unwrap_or_default(),
                    o.get("status").and_then(Value::as_str).unwrap_or("?")
                )),
                None => Observation::Pending(describe_history(history)),
            }
        }
    })
    .instrument(tracing::info_span!("verify_order", order = %order_id))
    .await;
    let order = Assertion::new("Order in history", order);
    output::print_assertion(&order);

    Ok(vec![stock, order])
}
