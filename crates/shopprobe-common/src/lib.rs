pub mod config;
pub mod error;
pub mod extract;
pub mod probe;
pub mod session;

pub use config::{
    join_url, to_cents, AccountConfig, BurstConfig, CacheConfig, CatalogConfig, ProbeConfig,
    ServiceUrls, SettleConfig,
};
pub use error::{ConfigError, ProbeError, Result};
pub use extract::{EntityId, Extractor, KeyPath};
pub use probe::{ProbeRequest, ProbeResult, ProbeStatus};
pub use session::{Purchase, SessionContext};

pub mod telemetry;
