//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the unlock gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, TLS, body limits).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Blockchain RPC settings.
    pub blockchain: BlockchainConfig,

    /// On-chain purchase crediting settings.
    pub credits: CreditsConfig,

    /// Chapter pricing (hot-reloadable).
    pub pricing: PricingConfig,

    /// Wallet authentication settings.
    pub auth: AuthConfig,

    /// Rate limiting for the auth endpoints.
    pub rate_limit: RateLimitConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Snapshot persistence and background job settings.
    pub storage: StorageConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_body_size: 64 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Blockchain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required before a purchase counts.
    pub confirmation_blocks: u32,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            confirmation_blocks: 3,
        }
    }
}

/// On-chain purchase crediting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CreditsConfig {
    /// Enable on-chain purchase verification.
    pub enabled: bool,

    /// Address of the purchase contract whose events credit accounts.
    pub contract_address: String,

    /// Credit packages sold by the contract, keyed by on-chain package id.
    pub packages: Vec<PackageConfig>,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            contract_address: String::new(),
            packages: vec![
                PackageConfig { id: 1, credits: 100 },
                PackageConfig { id: 2, credits: 300 },
                PackageConfig { id: 3, credits: 625 },
            ],
        }
    }
}

/// A purchasable credit package.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageConfig {
    /// On-chain package id. Id 0 is reserved for raw-amount purchases.
    pub id: u8,

    /// Credits granted when this package is purchased.
    pub credits: u64,
}

/// Chapter pricing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Cost in credits for chapters without an override.
    pub default_chapter_cost: u64,

    /// Per-chapter cost overrides.
    #[serde(default)]
    pub overrides: Vec<ChapterPriceConfig>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_chapter_cost: 5,
            overrides: Vec::new(),
        }
    }
}

impl PricingConfig {
    /// Cost in credits for a chapter, honoring overrides.
    pub fn cost_of(&self, chapter_id: u64) -> u64 {
        self.overrides
            .iter()
            .find(|price| price.chapter_id == chapter_id)
            .map(|price| price.cost)
            .unwrap_or(self.default_chapter_cost)
    }
}

/// Cost override for a single chapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChapterPriceConfig {
    /// Chapter identifier.
    pub chapter_id: u64,

    /// Cost in credits.
    pub cost: u64,
}

/// Wallet authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Domain string embedded in the sign-in message.
    pub domain: String,

    /// Nonce validity window in seconds.
    pub nonce_ttl_secs: u64,

    /// Session validity window in seconds.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "inkgate.local".to_string(),
            nonce_ttl_secs: 300,
            session_ttl_secs: 24 * 3600,
        }
    }
}

/// Rate limiting configuration for the auth endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 5,
            burst_size: 10,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Snapshot persistence and background job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for JSON snapshot files. None disables persistence.
    pub snapshot_dir: Option<String>,

    /// Interval between periodic snapshots in seconds.
    pub snapshot_interval_secs: u64,

    /// Interval between ledger reconciliation passes in seconds.
    pub reconcile_interval_secs: u64,

    /// Interval between nonce/session expiry sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            snapshot_interval_secs: 60,
            reconcile_interval_secs: 24 * 3600,
            sweep_interval_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.blockchain.confirmation_blocks, 3);
        assert!(!config.credits.enabled);
        assert_eq!(config.pricing.default_chapter_cost, 5);
        assert_eq!(config.auth.nonce_ttl_secs, 300);
    }

    #[test]
    fn test_minimal_toml() {
        let config: GateConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [credits]
            enabled = true
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [[pricing.overrides]]
            chapter_id = 12
            cost = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(config.credits.enabled);
        assert_eq!(config.pricing.overrides[0].cost, 8);
        // Untouched sections fall back to defaults
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.credits.packages.len(), 3);

        assert_eq!(config.pricing.cost_of(12), 8);
        assert_eq!(config.pricing.cost_of(13), 5);
    }
}
