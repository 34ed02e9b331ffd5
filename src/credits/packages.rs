//! Credit package table.
//!
//! Packages are a closed table from config; the on-chain event carries the
//! package id and the table decides the credits, never the other way round.

use std::collections::HashMap;

use crate::config::schema::PackageConfig;

/// Lookup table from on-chain package id to credits granted.
#[derive(Debug, Clone)]
pub struct PackageTable {
    by_id: HashMap<u8, u64>,
}

impl PackageTable {
    pub fn from_config(packages: &[PackageConfig]) -> Self {
        let by_id = packages.iter().map(|p| (p.id, p.credits)).collect();
        Self { by_id }
    }

    /// Credits for a package id, if it exists.
    pub fn credits_for(&self, package_id: u8) -> Option<u64> {
        self.by_id.get(&package_id).copied()
    }

    /// Number of configured packages.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
