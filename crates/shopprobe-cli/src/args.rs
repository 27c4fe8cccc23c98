use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "shopprobe")]
#[command(about = "HTTP probes for the storefront services", long_about = None)]
pub struct Args {
    /// JSON file with a full or partial probe configuration
    #[arg(long, env = "SHOPPROBE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub services: ServiceArgs,

    #[command(flatten)]
    pub account: AccountArgs,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    #[command(flatten)]
    pub settle: SettleArgs,

    #[command(flatten)]
    pub burst: BurstArgs,

    /// Endpoint read twice by the cache probe
    #[arg(long, env = "SHOPPROBE_CACHE_TARGET", global = true)]
    pub cache_target: Option<String>,

    /// Per-request timeout (ms); unset means no timeout
    #[arg(long, env = "SHOPPROBE_REQUEST_TIMEOUT_MS", global = true)]
    pub request_timeout_ms: Option<u64>,

    /// OTLP endpoint for exporting probe spans
    #[arg(long, env = "SHOPPROBE_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint
    #[arg(long, env = "SHOPPROBE_OTLP_TOKEN", global = true)]
    pub otlp_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Default, ClapArgs)]
pub struct ServiceArgs {
    /// Serve every service from one host (`{base}/api/...`)
    #[arg(long, env = "SHOPPROBE_BASE_URL", global = true)]
    pub base_url: Option<String>,

    #[arg(long, env = "SHOPPROBE_AUTH_URL", global = true)]
    pub auth_url: Option<String>,

    #[arg(long, env = "SHOPPROBE_PRODUCT_URL", global = true)]
    pub product_url: Option<String>,

    #[arg(long, env = "SHOPPROBE_CATEGORY_URL", global = true)]
    pub category_url: Option<String>,

    #[arg(long, env = "SHOPPROBE_CART_URL", global = true)]
    pub cart_url: Option<String>,

    #[arg(long, env = "SHOPPROBE_ORDER_URL", global = true)]
    pub order_url: Option<String>,
}

#[derive(Debug, Default, ClapArgs)]
pub struct AccountArgs {
    /// Local part before the per-run timestamp
    #[arg(long, env = "SHOPPROBE_EMAIL_PREFIX", global = true)]
    pub email_prefix: Option<String>,

    #[arg(long, env = "SHOPPROBE_EMAIL_DOMAIN", global = true)]
    pub email_domain: Option<String>,

    #[arg(long, env = "SHOPPROBE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "SHOPPROBE_DISPLAY_NAME", global = true)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, ClapArgs)]
pub struct CatalogArgs {
    /// Unit price of the created product
    #[arg(long, env = "SHOPPROBE_PRICE", global = true)]
    pub price: Option<f64>,

    #[arg(long, env = "SHOPPROBE_INITIAL_STOCK", global = true)]
    pub initial_stock: Option<u32>,

    /// Units put in the cart
    #[arg(long, env = "SHOPPROBE_QUANTITY", global = true)]
    pub quantity: Option<u32>,

    #[arg(long, env = "SHOPPROBE_CATEGORY_NAME", global = true)]
    pub category_name: Option<String>,

    #[arg(long, env = "SHOPPROBE_PRODUCT_NAME", global = true)]
    pub product_name: Option<String>,

    #[arg(long, env = "SHOPPROBE_SHIPPING_ADDRESS", global = true)]
    pub shipping_address: Option<String>,

    #[arg(long, env = "SHOPPROBE_PAYMENT_METHOD", global = true)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, ClapArgs)]
pub struct SettleArgs {
    /// Settle delay before checking asynchronous effects (ms)
    #[arg(long, env = "SHOPPROBE_SETTLE_MS", global = true)]
    pub settle_ms: Option<u64>,

    /// Re-polls after the first check (0 = single check)
    #[arg(long, env = "SHOPPROBE_POLL_ATTEMPTS", global = true)]
    pub poll_attempts: Option<u32>,

    #[arg(long, env = "SHOPPROBE_BACKOFF_INITIAL_MS", global = true)]
    pub backoff_initial_ms: Option<u64>,

    #[arg(long, env = "SHOPPROBE_BACKOFF_MAX_MS", global = true)]
    pub backoff_max_ms: Option<u64>,
}

/// Burst settings honored by both `burst` and `all`.
#[derive(Debug, Default, ClapArgs)]
pub struct BurstArgs {
    #[arg(long, env = "SHOPPROBE_BURST_TARGET", global = true)]
    pub burst_target: Option<String>,

    #[arg(long, env = "SHOPPROBE_BURST_REQUESTS", global = true)]
    pub burst_requests: Option<usize>,

    #[arg(long, env = "SHOPPROBE_BURST_WORKERS", global = true)]
    pub burst_workers: Option<usize>,

    /// Requests per window the limiter is expected to allow
    #[arg(long, env = "SHOPPROBE_THROTTLE_THRESHOLD", global = true)]
    pub throttle_threshold: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register, buy a product, then verify stock and order history
    Chain,
    /// Fire a concurrent burst at one endpoint and count 429s
    Burst {
        /// Endpoint to hit (overrides --burst-target)
        #[arg(long)]
        target: Option<String>,
        /// Total requests (overrides --burst-requests)
        #[arg(long)]
        requests: Option<usize>,
        /// Requests in flight at once (overrides --burst-workers)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Time two identical reads to detect a cache
    Cache {
        /// Endpoint to read (overrides --cache-target)
        #[arg(long)]
        target: Option<String>,
    },
    /// Chain, then burst, then cache
    All,
    /// Concatenate source trees into one markdown file
    Dump {
        /// Output markdown file
        #[arg(long, short)]
        output: PathBuf,
        /// Directories to walk
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Print the effective configuration as JSON
    Config,
}
