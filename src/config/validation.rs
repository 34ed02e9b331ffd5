//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//! - Detect conflicting package/pricing entries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::GateConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut check_addr = |field: &str, value: &str| {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: field.to_string(),
                message: format!("'{}' is not a valid socket address", value),
            });
        }
    };

    check_addr("listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_addr("observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_addr("admin.bind_address", &config.admin.bind_address);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.credits.enabled {
        if config.blockchain.rpc_url.parse::<url::Url>().is_err() {
            errors.push(ValidationError {
                field: "blockchain.rpc_url".to_string(),
                message: format!("'{}' is not a valid URL", config.blockchain.rpc_url),
            });
        }
        if config.credits.contract_address.parse::<Address>().is_err() {
            errors.push(ValidationError {
                field: "credits.contract_address".to_string(),
                message: "not a valid contract address".to_string(),
            });
        }
    }

    let mut package_ids = HashSet::new();
    for package in &config.credits.packages {
        if package.id == 0 {
            errors.push(ValidationError {
                field: "credits.packages".to_string(),
                message: "package id 0 is reserved for raw-amount purchases".to_string(),
            });
        }
        if package.credits == 0 {
            errors.push(ValidationError {
                field: "credits.packages".to_string(),
                message: format!("package {} grants zero credits", package.id),
            });
        }
        if !package_ids.insert(package.id) {
            errors.push(ValidationError {
                field: "credits.packages".to_string(),
                message: format!("duplicate package id {}", package.id),
            });
        }
    }

    let mut override_ids = HashSet::new();
    for price in &config.pricing.overrides {
        if !override_ids.insert(price.chapter_id) {
            errors.push(ValidationError {
                field: "pricing.overrides".to_string(),
                message: format!("duplicate override for chapter {}", price.chapter_id),
            });
        }
    }

    if config.auth.nonce_ttl_secs == 0 {
        errors.push(ValidationError {
            field: "auth.nonce_ttl_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.auth.session_ttl_secs == 0 {
        errors.push(ValidationError {
            field: "auth.session_ttl_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
