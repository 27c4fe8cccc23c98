use anyhow::Result;

use shopprobe_common::{join_url, ProbeConfig, ServiceUrls};

use crate::args::{AccountArgs, Args, BurstArgs, CatalogArgs, Command, ServiceArgs, SettleArgs};

/// Effective configuration: file (or defaults), then flags/env on top, then
/// the subcommand's own flags.
pub fn build_config(args: &Args) -> Result<ProbeConfig> {
    let mut config = match &args.config {
        Some(path) => ProbeConfig::from_file(path)?,
        None => ProbeConfig::default(),
    };

    apply_services(&mut config, &args.services);
    apply_account(&mut config, &args.account);
    apply_catalog(&mut config, &args.catalog);
    apply_settle(&mut config, &args.settle);
    apply_burst(&mut config, &args.burst);
    if let Some(t) = &args.cache_target {
        config.cache.target = Some(t.clone());
    }
    if args.request_timeout_ms.is_some() {
        config.request_timeout_ms = args.request_timeout_ms;
    }

    match &args.command {
        Command::Burst {
            target,
            requests,
            workers,
        } => {
            set(&mut config.burst.target, target.clone());
            set(&mut config.burst.requests, *requests);
            set(&mut config.burst.workers, *workers);
        }
        Command::Cache { target: Some(t) } => config.cache.target = Some(t.clone()),
        _ => {}
    }

    config.validate()?;
    Ok(config)
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn apply_services(config: &mut ProbeConfig, args: &ServiceArgs) {
    let urls = &mut config.services;
    if let Some(base) = &args.base_url {
        *urls = ServiceUrls::single_host(base);
        config.burst.target = join_url(&urls.auth_url, "health");
    }
    set(&mut urls.auth_url, args.auth_url.clone());
    set(&mut urls.product_url, args.product_url.clone());
    set(&mut urls.category_url, args.category_url.clone());
    set(&mut urls.cart_url, args.cart_url.clone());
    set(&mut urls.order_url, args.order_url.clone());
}

fn apply_account(config: &mut ProbeConfig, args: &AccountArgs) {
    let account = &mut config.account;
    set(&mut account.email_prefix, args.email_prefix.clone());
    set(&mut account.email_domain, args.email_domain.clone());
    set(&mut account.password, args.password.clone());
    set(&mut account.display_name, args.display_name.clone());
}

fn apply_catalog(config: &mut ProbeConfig, args: &CatalogArgs) {
    let catalog = &mut config.catalog;
    set(&mut catalog.price, args.price);
    set(&mut catalog.initial_stock, args.initial_stock);
    set(&mut catalog.quantity, args.quantity);
    set(&mut catalog.category_name, args.category_name.clone());
    set(&mut catalog.product_name, args.product_name.clone());
    set(&mut catalog.shipping_address, args.shipping_address.clone());
    set(&mut catalog.payment_method, args.payment_method.clone());
}

fn apply_settle(config: &mut ProbeConfig, args: &SettleArgs) {
    let settle = &mut config.settle;
    set(&mut settle.settle_ms, args.settle_ms);
    set(&mut settle.poll_attempts, args.poll_attempts);
    set(&mut settle.backoff_initial_ms, args.backoff_initial_ms);
    set(&mut settle.backoff_max_ms, args.backoff_max_ms);
}

fn apply_burst(config: &mut ProbeConfig, args: &BurstArgs) {
    let burst = &mut config.burst;
    set(&mut burst.target, args.burst_target.clone());
    set(&mut burst.requests, args.burst_requests);
    set(&mut burst.workers, args.burst_workers);
    set(&mut burst.throttle_threshold, args.throttle_threshold);
}
