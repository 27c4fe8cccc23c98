use std::time::Duration;

use crate::burst::{BurstReport, BurstVerdict};
use crate::cache::{CacheReport, CacheVerdict};
use crate::verify::{Assertion, Outcome};

pub fn print_section(title: &str) {
    println!("\n{:=<60}", "");
    println!("🔹 {title}");
    println!("{:=<60}", "");
}

pub fn print_action(message: &str) {
    println!("{message}...");
}

pub fn print_pass(detail: &str) {
    if detail.is_empty() {
        println!("✅ SUCCESS");
    } else {
        println!("✅ {detail}");
    }
}

pub fn print_fail(detail: &str) {
    println!("❌ {detail}");
}

pub fn print_warn(detail: &str) {
    println!("⚠️ {detail}");
}

pub fn print_unexpected_status(expected: u16, actual: &str, body: &str) {
    println!("❌ FAILED: Expected {expected}, got {actual}");
    if !body.is_empty() {
        println!("Response: {body}");
    }
}

pub fn print_assertion(a: &Assertion) {
    match &a.outcome {
        Outcome::Confirmed { observed } => println!("✅ {}: {observed}", a.name),
        Outcome::Mismatch { expected, observed } => {
            println!("❌ {}: expected {expected}, got {observed}", a.name)
        }
        Outcome::TimedOut {
            attempts,
            last_observed,
        } => {
            println!(
                "❌ {}: timed out waiting for propagation after {attempts} check(s), last saw {last_observed}",
                a.name
            );
        }
    }
    if let Some(hint) = &a.hint {
        if !a.outcome.is_confirmed() {
            println!("   ({hint})");
        }
    }
}

pub fn print_burst_report(report: &BurstReport) {
    println!("\n📊 RESULTS ({:.2}s):", secs(report.elapsed));
    println!("  {:<32} {:>6}", "Successful (200 OK)", report.accepted);
    println!("  {:<32} {:>6}", "Blocked (429 Too Many Requests)", report.throttled);
    println!("  {:<32} {:>6}", "Other status", report.other);
    println!("  {:<32} {:>6}", "Transport failures", report.transport_failures);
    println!();
    match report.verdict() {
        BurstVerdict::ThrottlingObserved => {
            println!("🎉 RATE LIMITING IS WORKING! The API rejected excess requests.")
        }
        BurstVerdict::ThrottlingAbsent => println!(
            "❌ RATE LIMITING ABSENT. {} requests sent, none rejected with 429.",
            report.requests
        ),
    }
}

pub fn print_cache_report(report: &CacheReport) {
    if let Some(first) = report.first {
        println!("1️⃣ First call:  {:.2} ms", ms(first));
    }
    if let Some(second) = report.second {
        println!("2️⃣ Second call: {:.2} ms", ms(second));
    }
    match &report.verdict {
        CacheVerdict::Faster { speedup } => {
            println!("✅ CACHE WORKING! Speedup: {speedup:.1}x faster")
        }
        CacheVerdict::Inconclusive => {
            print_warn("CACHE MIGHT NOT BE WORKING (or network latency variation)")
        }
        CacheVerdict::Unreachable { status } => {
            print_fail(&format!("API not reachable (first call returned {status})"))
        }
        CacheVerdict::SecondReadFailed { status } => {
            print_fail(&format!("Second call returned {status}; no cache comparison made"))
        }
    }
}

pub fn print_summary(assertions: &[Assertion]) {
    let failed = assertions
        .iter()
        .filter(|a| !a.outcome.is_confirmed())
        .count();
    println!();
    if failed == 0 {
        println!("🎉 ALL CHECKS PASSED ({} assertions)", assertions.len());
    } else {
        println!(
            "⚠️ CHAIN COMPLETED WITH {failed} FAILED ASSERTION(S) out of {}",
            assertions.len()
        );
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}
