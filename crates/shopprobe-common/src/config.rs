use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Everything a probe run needs, passed explicitly into each harness function.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub services: ServiceUrls,
    pub account: AccountConfig,
    pub catalog: CatalogConfig,
    pub burst: BurstConfig,
    pub cache: CacheConfig,
    pub settle: SettleConfig,
    /// Per-request timeout. Unset means the HTTP client default (none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

/// Base URLs of the storefront services under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceUrls {
    pub auth_url: String,
    pub product_url: String,
    pub category_url: String,
    pub cart_url: String,
    pub order_url: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:8081/api/auth".to_string(),
            product_url: "http://localhost:8082/api/products".to_string(),
            category_url: "http://localhost:8082/api/categories".to_string(),
            cart_url: "http://localhost:8085/api/cart".to_string(),
            order_url: "http://localhost:8083/api/orders".to_string(),
        }
    }
}

impl ServiceUrls {
    /// All services reachable at one base, with the platform's usual path layout.
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/api/auth"),
            product_url: format!("{base}/api/products"),
            category_url: format!("{base}/api/categories"),
            cart_url: format!("{base}/api/cart"),
            order_url: format!("{base}/api/orders"),
        }
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountConfig {
    pub email_prefix: String,
    pub email_domain: String,
    pub password: String,
    pub display_name: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            email_prefix: "testUser".to_string(),
            email_domain: "example.com".to_string(),
            password: "password123".to_string(),
            display_name: "Test User".to_string(),
        }
    }
}

impl AccountConfig {
    /// A fresh address per run so re-runs never collide.
    pub fn email_for(&self, unix_seconds: i64) -> String {
        format!("{}_{unix_seconds}@{}", self.email_prefix, self.email_domain)
    }
}

/// What the chain creates and buys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub category_name: String,
    pub category_description: String,
    pub product_name: String,
    pub product_description: String,
    pub image_url: String,
    pub price: f64,
    pub initial_stock: u32,
    pub quantity: u32,
    pub shipping_address: String,
    pub payment_method: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            category_name: "Electronics".to_string(),
            category_description: "Tech gadgets".to_string(),
            product_name: "Gaming Laptop".to_string(),
            product_description: "High end laptop".to_string(),
            image_url: "url1.jpg".to_string(),
            price: 1500.00,
            initial_stock: 10,
            quantity: 2,
            shipping_address: "123 Test St, Paris".to_string(),
            payment_method: "CREDIT_CARD".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Expected cart total in minor units (cents), P x Q. `None` on overflow.
    pub fn checked_total_cents(&self) -> Option<i64> {
        to_cents(self.price).checked_mul(i64::from(self.quantity))
    }

    /// Expected cart total in minor units (cents), P x Q.
    pub fn expected_total_cents(&self) -> i64 {
        self.checked_total_cents().unwrap_or(i64::MAX)
    }
}

/// Round a monetary amount to whole cents.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BurstConfig {
    pub target: String,
    pub requests: usize,
    pub workers: usize,
    /// Requests per window the remote limiter is expected to allow.
    pub throttle_threshold: usize,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:8081/api/auth/health".to_string(),
            requests: 120,
            workers: 10,
            throttle_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Defaults to the first product page when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SettleConfig {
    pub settle_ms: u64,
    /// Extra polls after the first check. Zero means a single check.
    pub poll_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            settle_ms: 5_000,
            poll_attempts: 5,
            backoff_initial_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

impl SettleConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Delay before each re-poll: initial, doubled each time, capped.
    pub fn backoff_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.poll_attempts).map(move |i| {
            let factor = 1u64.checked_shl(i).unwrap_or(u64::MAX);
            let ms = self
                .backoff_initial_ms
                .saturating_mul(factor)
                .min(self.backoff_max_ms);
            Duration::from_millis(ms)
        })
    }
}

impl ProbeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file_err = |reason: String| ConfigError::File {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| file_err(e.to_string()))
    }

    pub fn cache_target(&self) -> String {
        match &self.cache.target {
            Some(t) => t.clone(),
            None => format!("{}?page=0&size=10", self.services.product_url),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("auth_url", &self.services.auth_url),
            ("product_url", &self.services.product_url),
            ("category_url", &self.services.category_url),
            ("cart_url", &self.services.cart_url),
            ("order_url", &self.services.order_url),
            ("burst.target", &self.burst.target),
        ];
        for (name, value) in urls {
            check_url(name, value)?;
        }
        if let Some(target) = &self.cache.target {
            check_url("cache.target", target)?;
        }

        if self.burst.requests == 0 {
            return Err(ConfigError::Zero("burst.requests"));
        }
        if self.burst.workers == 0 {
            return Err(ConfigError::Zero("burst.workers"));
        }
        if self.catalog.quantity == 0 {
            return Err(ConfigError::Zero("catalog.quantity"));
        }
        if !(self.catalog.price.is_finite() && self.catalog.price > 0.0) {
            return Err(ConfigError::Zero("catalog.price"));
        }
        if self.catalog.checked_total_cents().is_none() {
            return Err(ConfigError::TotalOutOfRange {
                price: self.catalog.price,
                quantity: self.catalog.quantity,
            });
        }
        if self.catalog.quantity > self.catalog.initial_stock {
            return Err(ConfigError::QuantityExceedsStock {
                quantity: self.catalog.quantity,
                stock: self.catalog.initial_stock,
            });
        }
        Ok(())
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    };
    let uri: http::Uri = value.parse().map_err(|_| invalid())?;
    match (uri.scheme_str(), uri.authority()) {
        (Some("http" | "https"), Some(_)) => Ok(()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        ProbeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_expected_total_is_exact() {
        let c = CatalogConfig::default();
        assert_eq!(c.expected_total_cents(), 300_000);
        assert_eq!(to_cents(3000.00), 300_000);
        assert_eq!(to_cents(0.1 + 0.2), 30);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let s = SettleConfig {
            settle_ms: 0,
            poll_attempts: 6,
            backoff_initial_ms: 500,
            backoff_max_ms: 4_000,
        };
        let delays: Vec<u64> = s.backoff_delays().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 4_000, 4_000]);

        let none = SettleConfig {
            poll_attempts: 0,
            ..SettleConfig::default()
        };
        assert_eq!(none.backoff_delays().count(), 0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut c = ProbeConfig::default();
        c.burst.workers = 0;
        assert_eq!(c.validate(), Err(ConfigError::Zero("burst.workers")));

        let mut c = ProbeConfig::default();
        c.catalog.quantity = 11;
        assert_eq!(
            c.validate(),
            Err(ConfigError::QuantityExceedsStock {
                quantity: 11,
                stock: 10
            })
        );

        let mut c = ProbeConfig::default();
        c.services.cart_url = "localhost:8085/api/cart".to_string();
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidUrl { name: "cart_url", .. })
        ));
    }

    #[test]
    fn test_huge_price_is_rejected_not_overflowed() {
        let mut c = ProbeConfig::default();
        c.catalog.price = 1e17;
        assert!(c.catalog.checked_total_cents().is_none());
        assert_eq!(c.catalog.expected_total_cents(), i64::MAX);
        assert_eq!(
            c.validate(),
            Err(ConfigError::TotalOutOfRange {
                price: 1e17,
                quantity: 2
            })
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let c: ProbeConfig =
            serde_json::from_str(r#"{"burst": {"requests": 300}, "settle": {"settle_ms": 10}}"#)
                .unwrap();
        assert_eq!(c.burst.requests, 300);
        assert_eq!(c.burst.workers, 10);
        assert_eq!(c.settle.settle_ms, 10);
        assert_eq!(c.settle.poll_attempts, 5);
        assert_eq!(c.services, ServiceUrls::default());
    }

    #[test]
    fn test_cache_target_and_urls() {
        let c = ProbeConfig::default();
        assert_eq!(
            c.cache_target(),
            "http://localhost:8082/api/products?page=0&size=10"
        );
        assert_eq!(join_url("http://h/api/cart/", "/items"), "http://h/api/cart/items");
        assert_eq!(join_url("http://h/api/cart", ""), "http://h/api/cart");

        let s = ServiceUrls::single_host("http://127.0.0.1:9000/");
        assert_eq!(s.order_url, "http://127.0.0.1:9000/api/orders");
    }

    #[test]
    fn test_email_is_unique_per_second() {
        let a = AccountConfig::default();
        assert_eq!(a.email_for(1700000000), "testUser_1700000000@example.com");
    }
}
