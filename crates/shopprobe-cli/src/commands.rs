//! Subcommand dispatch and the process exit status.

use anyhow::Result;

use shopprobe_common::ProbeConfig;

use crate::args::{Args, Command};
use crate::burst::run_burst;
use crate::cache::run_cache_probe;
use crate::client::ProbeClient;
use crate::config::build_config;
use crate::dump::{dump_to_file, DumpOptions};
use crate::output::{self, print_burst_report, print_cache_report};
use crate::storefront::StorefrontChain;

/// The chain ran to the end; failed assertions do not change this.
pub const EXIT_OK: u8 = 0;
/// The dependent chain stopped early.
pub const EXIT_CHAIN_ABORTED: u8 = 1;
/// Configuration and I/O problems.
pub const EXIT_ERROR: u8 = 2;

/// Build the configuration, run the command and map the result to an exit
/// status.
pub async fn execute(args: Args) -> u8 {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error=%e, "invalid configuration");
            eprintln!("error: {e:#}");
            return EXIT_ERROR;
        }
    };
    match run(args.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error=%e, "probe run failed");
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    }
}

pub async fn run(command: Command, config: &ProbeConfig) -> Result<u8> {
    match command {
        Command::Chain => {
            let client = ProbeClient::new(config.request_timeout())?;
            Ok(chain_exit_code(run_chain(&client, config).await))
        }
        Command::Burst { .. } => {
            let client = ProbeClient::new(config.request_timeout())?;
            burst(&client, config).await;
            Ok(EXIT_OK)
        }
        Command::Cache { .. } => {
            let client = ProbeClient::new(config.request_timeout())?;
            cache(&client, config).await;
            Ok(EXIT_OK)
        }
        Command::All => {
            let client = ProbeClient::new(config.request_timeout())?;
            if !run_chain(&client, config).await {
                return Ok(EXIT_CHAIN_ABORTED);
            }
            burst(&client, config).await;
            cache(&client, config).await;
            Ok(EXIT_OK)
        }
        Command::Dump { output, roots } => {
            let stats = dump_to_file(&roots, &DumpOptions::default(), &output)?;
            println!(
                "Dump complete to {} ({} files, {} skipped, {} unreadable)",
                output.display(),
                stats.written,
                stats.skipped_large,
                stats.unreadable
            );
            Ok(EXIT_OK)
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(EXIT_OK)
        }
    }
}

pub fn chain_exit_code(completed: bool) -> u8 {
    if completed {
        EXIT_OK
    } else {
        EXIT_CHAIN_ABORTED
    }
}

/// Returns whether the chain ran to the end.
pub async fn run_chain(client: &ProbeClient, config: &ProbeConfig) -> bool {
    let email = config.account.email_for(chrono::Utc::now().timestamp());
    match StorefrontChain::new(client, config, email).run().await {
        Ok(report) => {
            let failed = report
                .assertions
                .iter()
                .filter(|a| !a.outcome.is_confirmed())
                .count();
            tracing::info!(
                email = %report.email,
                steps = report.steps,
                failed_assertions = failed,
                "storefront chain completed"
            );
            true
        }
        Err(e) => {
            tracing::error!(error=%e, "storefront chain aborted");
            output::print_fail(&format!("Chain aborted: {e}"));
            false
        }
    }
}

async fn burst(client: &ProbeClient, config: &ProbeConfig) {
    output::print_section(&format!(
        "TESTING RATE LIMITING: {} requests to {} ({} workers)",
        config.burst.requests, config.burst.target, config.burst.workers
    ));
    let report = run_burst(client, &config.burst).await;
    print_burst_report(&report);
}

async fn cache(client: &ProbeClient, config: &ProbeConfig) {
    let target = config.cache_target();
    output::print_section(&format!("TESTING CACHE PERFORMANCE: {target}"));
    let report = run_cache_probe(client, &target).await;
    print_cache_report(&report);
}
